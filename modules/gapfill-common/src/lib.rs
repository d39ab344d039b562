pub mod catalog;
pub mod config;
pub mod error;
pub mod ident;
pub mod types;

pub use config::{Credentials, GapFillConfig, GraphSettings, MatchingConfig, RunConfig};
pub use error::GapFillError;
pub use ident::cypher_identifier;
pub use types::{Connection, EmbeddedNode, NodeRef, PassType, Phase, RelationshipSpec};
