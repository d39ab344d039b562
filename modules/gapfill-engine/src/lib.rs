pub mod analysis;
pub mod apply;
pub mod audit;
pub mod dedup;
pub mod export;
pub mod matcher;
pub mod persist;
pub mod pipeline;
pub mod resolver;
pub mod similarity;
pub mod summary;

pub use apply::apply_batch;
pub use audit::{run_audit, AuditReport};
pub use dedup::deduplicate;
pub use matcher::{BipartiteMatcher, MatchOutcome};
pub use persist::{PersistStats, RelationshipPersister};
pub use pipeline::{plan, GapFiller, SpecOutcome, Stage};
pub use resolver::AdaptiveResolver;
pub use similarity::EmbeddingError;
pub use summary::RunSummary;
