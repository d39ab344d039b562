use async_trait::async_trait;
use neo4rs::query;

use gapfill_common::catalog::LinkAssertion;
use gapfill_common::cypher_identifier;

use crate::error::GraphError;
use crate::traits::AuditProbe;
use crate::GraphClient;

/// `(v:A OR v:B)` for a set of labels.
fn label_predicate(var: &str, labels: &[&str]) -> Result<String, GraphError> {
    let parts = labels
        .iter()
        .map(|l| cypher_identifier(l).map(|l| format!("{var}:{l}")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", parts.join(" OR ")))
}

/// `:R1|R2` for a set of relationship types.
fn rel_pattern(rel_types: &[&str]) -> Result<String, GraphError> {
    let parts = rel_types
        .iter()
        .map(|r| cypher_identifier(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(":{}", parts.join("|")))
}

/// Count source nodes with no outgoing expected edge.
pub fn orphan_cypher(link: &LinkAssertion) -> Result<String, GraphError> {
    let sources = label_predicate("n", link.source_labels)?;
    let targets = label_predicate("m", link.target_labels)?;
    let rels = rel_pattern(link.rel_types)?;
    Ok(format!(
        "MATCH (n) WHERE {sources} AND n.level = $source_level
           AND NOT EXISTS {{ MATCH (n)-[{rels}]->(m) WHERE {targets} AND m.level = $target_level }}
         RETURN count(n) AS c"
    ))
}

/// Count target nodes with no incoming expected edge.
pub fn bastard_cypher(link: &LinkAssertion) -> Result<String, GraphError> {
    let sources = label_predicate("m", link.source_labels)?;
    let targets = label_predicate("n", link.target_labels)?;
    let rels = rel_pattern(link.rel_types)?;
    Ok(format!(
        "MATCH (n) WHERE {targets} AND n.level = $target_level
           AND NOT EXISTS {{ MATCH (m)-[{rels}]->(n) WHERE {sources} AND m.level = $source_level }}
         RETURN count(n) AS c"
    ))
}

impl GraphClient {
    async fn count(&self, cypher: &str, link: &LinkAssertion) -> Result<u64, GraphError> {
        let q = query(cypher)
            .param("source_level", link.source_level)
            .param("target_level", link.target_level);
        self.scalar(q).await
    }

    async fn scalar(&self, q: neo4rs::Query) -> Result<u64, GraphError> {
        self.timed(async {
            let mut stream = self.graph.execute(q).await?;
            let mut c = 0i64;
            if let Some(row) = stream.next().await? {
                c = row.get("c").unwrap_or(0);
            }
            Ok(c.max(0) as u64)
        })
        .await
    }
}

#[async_trait]
impl AuditProbe for GraphClient {
    async fn count_orphans(&self, link: &LinkAssertion) -> Result<u64, GraphError> {
        self.count(&orphan_cypher(link)?, link).await
    }

    async fn count_bastards(&self, link: &LinkAssertion) -> Result<u64, GraphError> {
        self.count(&bastard_cypher(link)?, link).await
    }

    async fn graph_totals(&self) -> Result<(u64, u64), GraphError> {
        let nodes = self.scalar(query("MATCH (n) RETURN count(n) AS c")).await?;
        let rels = self.scalar(query("MATCH ()-[r]->() RETURN count(r) AS c")).await?;
        Ok((nodes, rels))
    }
}
