pub mod audit;
pub mod client;
pub mod error;
#[cfg(feature = "test-support")]
pub mod memory;
pub mod migrate;
pub mod reader;
#[cfg(feature = "test-utils")]
pub mod testutil;
pub mod traits;
pub mod writer;

pub use client::GraphClient;
pub use error::GraphError;
pub use traits::{AuditProbe, CandidateFetcher, RelationshipStore};

pub use neo4rs::query;
