use std::time::Duration;

use thiserror::Error;

use gapfill_common::GapFillError;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    #[error("Graph call timed out after {0:?}")]
    Timeout(Duration),

    #[error("No {source_label}:{source_id} or {target_label}:{target_id} version at or before {year}")]
    EndpointMissing {
        source_label: String,
        source_id: String,
        target_label: String,
        target_id: String,
        year: i64,
    },

    #[error("Graph store error: {0}")]
    Store(String),

    #[error(transparent)]
    Invalid(#[from] GapFillError),
}
