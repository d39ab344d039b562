// Trait seams between the matching engine and the graph store.
//
// CandidateFetcher: read nodes carrying embeddings for one (label, year, level).
// RelationshipStore: upsert one gap-filled edge under the persistence rule.
// AuditProbe: read-only orphan/bastard counts for the acceptance audit.
//
// GraphClient implements all three against Neo4j; MemoryGraph (test-support)
// implements them in memory so the engine can be tested without Docker.

use async_trait::async_trait;

use gapfill_common::catalog::LinkAssertion;
use gapfill_common::{Connection, EmbeddedNode};

use crate::error::GraphError;

#[async_trait]
pub trait CandidateFetcher: Send + Sync {
    /// All nodes of `label` in `year` at `level` with a non-null embedding.
    async fn fetch_candidates(
        &self,
        label: &str,
        year: i64,
        level: &str,
    ) -> Result<Vec<EmbeddedNode>, GraphError>;
}

#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Idempotently create the edge described by `connection`, resolving each
    /// endpoint to its latest version with `year <= connection.year`.
    async fn upsert_relationship(&self, connection: &Connection) -> Result<(), GraphError>;
}

#[async_trait]
pub trait AuditProbe: Send + Sync {
    /// Source nodes lacking the expected outgoing edge.
    async fn count_orphans(&self, link: &LinkAssertion) -> Result<u64, GraphError>;

    /// Target nodes lacking the expected incoming edge.
    async fn count_bastards(&self, link: &LinkAssertion) -> Result<u64, GraphError>;

    /// Total (nodes, relationships) in the store, for the report header.
    async fn graph_totals(&self) -> Result<(u64, u64), GraphError>;
}
