use async_trait::async_trait;
use neo4rs::query;

use gapfill_common::{cypher_identifier, Connection};

use crate::error::GraphError;
use crate::traits::RelationshipStore;
use crate::GraphClient;

/// Cypher for one gap-filled edge.
///
/// Each endpoint resolves to its latest version with `year <= $year`: a node
/// is only re-versioned in years where its data changed, so an older version
/// is still current. MERGE keeps repeated applies from duplicating the edge.
pub fn upsert_cypher(connection: &Connection) -> Result<String, GraphError> {
    let source = cypher_identifier(&connection.source_label)?;
    let target = cypher_identifier(&connection.target_label)?;
    let rel = cypher_identifier(&connection.rel_type)?;

    Ok(format!(
        "MATCH (s:{source} {{id: $source_id}})
         WHERE s.year <= $year
         WITH s ORDER BY s.year DESC LIMIT 1
         MATCH (t:{target} {{id: $target_id}})
         WHERE t.year <= $year
         WITH s, t ORDER BY t.year DESC LIMIT 1
         MERGE (s)-[r:{rel}]->(t)
         SET r.similarity = $similarity,
             r.threshold_used = $threshold_used,
             r.pass_type = $pass_type,
             r.effective_year = $year,
             r.gap_filled = true,
             r.gap_filled_at = datetime()
         RETURN count(r) AS created"
    ))
}

#[async_trait]
impl RelationshipStore for GraphClient {
    async fn upsert_relationship(&self, connection: &Connection) -> Result<(), GraphError> {
        let q = query(&upsert_cypher(connection)?)
            .param("source_id", connection.source_id.as_str())
            .param("target_id", connection.target_id.as_str())
            .param("year", connection.year)
            .param("similarity", connection.similarity)
            .param("threshold_used", connection.threshold_used)
            .param("pass_type", connection.pass_type.as_str());

        let created = self
            .timed(async {
                let mut stream = self.graph.execute(q).await?;
                let mut created = 0i64;
                if let Some(row) = stream.next().await? {
                    created = row.get("created").unwrap_or(0);
                }
                Ok(created)
            })
            .await?;

        if created == 0 {
            return Err(GraphError::EndpointMissing {
                source_label: connection.source_label.clone(),
                source_id: connection.source_id.clone(),
                target_label: connection.target_label.clone(),
                target_id: connection.target_id.clone(),
                year: connection.year,
            });
        }
        Ok(())
    }
}
