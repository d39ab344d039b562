use neo4rs::query;
use tracing::info;

use gapfill_common::catalog::catalog_labels;
use gapfill_common::cypher_identifier;

use crate::error::GraphError;
use crate::GraphClient;

/// Index statements backing the candidate read and the persistence lookup.
pub fn index_statements() -> Result<Vec<String>, GraphError> {
    let mut statements = Vec::new();
    for label in catalog_labels() {
        let label = cypher_identifier(label)?;
        let slug = label.to_lowercase();
        statements.push(format!(
            "CREATE INDEX gapfill_{slug}_id_year IF NOT EXISTS FOR (n:{label}) ON (n.id, n.year)"
        ));
        statements.push(format!(
            "CREATE INDEX gapfill_{slug}_year_level IF NOT EXISTS FOR (n:{label}) ON (n.year, n.level)"
        ));
    }
    Ok(statements)
}

/// Run idempotent schema migrations for every catalog label.
pub async fn migrate(client: &GraphClient) -> Result<usize, GraphError> {
    info!("Running schema migrations...");

    let statements = index_statements()?;
    for statement in &statements {
        client.timed(client.graph.run(query(statement))).await?;
    }

    info!(indexes = statements.len(), "Schema migrations complete");
    Ok(statements.len())
}
