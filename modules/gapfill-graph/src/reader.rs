use async_trait::async_trait;
use neo4rs::{query, Row};
use tracing::debug;

use gapfill_common::{cypher_identifier, EmbeddedNode};

use crate::error::GraphError;
use crate::traits::CandidateFetcher;
use crate::GraphClient;

#[async_trait]
impl CandidateFetcher for GraphClient {
    async fn fetch_candidates(
        &self,
        label: &str,
        year: i64,
        level: &str,
    ) -> Result<Vec<EmbeddedNode>, GraphError> {
        let label = cypher_identifier(label)?;
        let q = query(&format!(
            "MATCH (n:{label})
             WHERE n.embedding IS NOT NULL AND n.year = $year AND n.level = $level
             RETURN n.id AS id, n.name AS name, n.year AS year, n.level AS level,
                    n.embedding AS embedding
             ORDER BY id"
        ))
        .param("year", year)
        .param("level", level);

        let nodes = self
            .timed(async {
                let mut nodes = Vec::new();
                let mut stream = self.graph.execute(q).await?;
                while let Some(row) = stream.next().await? {
                    if let Some(node) = node_from_row(label, &row) {
                        nodes.push(node);
                    }
                }
                Ok(nodes)
            })
            .await?;

        debug!(label, year, level, count = nodes.len(), "Fetched candidates");
        Ok(nodes)
    }
}

/// Decode one candidate row. Rows without an id are skipped; an empty
/// embedding is kept so strict matching can report it.
fn node_from_row(label: &str, row: &Row) -> Option<EmbeddedNode> {
    // Ids are usually strings ("1.2.3") but some labels store them as integers.
    let id: String = row
        .get::<String>("id")
        .ok()
        .or_else(|| row.get::<i64>("id").ok().map(|i| i.to_string()))?;
    let embedding: Vec<f64> = row.get("embedding").unwrap_or_default();
    if id.is_empty() {
        return None;
    }

    Some(EmbeddedNode {
        label: label.to_string(),
        id,
        name: row.get("name").unwrap_or_default(),
        year: row.get("year").unwrap_or_default(),
        level: row.get("level").unwrap_or_default(),
        embedding,
    })
}
