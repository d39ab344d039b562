use std::future::Future;
use std::time::Duration;

use neo4rs::{query, ConfigBuilder, Graph};

use gapfill_common::{Credentials, GraphSettings};

use crate::error::GraphError;

/// Thin wrapper around neo4rs::Graph providing connection setup and a
/// per-call timeout.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
    pub(crate) timeout: Duration,
}

impl GraphClient {
    /// Connect to Neo4j using the configured settings and env credentials.
    pub async fn connect(
        settings: &GraphSettings,
        credentials: &Credentials,
    ) -> Result<Self, GraphError> {
        let mut builder = ConfigBuilder::default()
            .uri(settings.uri.as_str())
            .user(settings.user.as_str())
            .password(credentials.password.as_str())
            .fetch_size(settings.fetch_size)
            .max_connections(settings.max_connections);
        if let Some(db) = settings.database.as_deref() {
            builder = builder.db(db);
        }
        let config = builder.build()?;

        let timeout = Duration::from_secs(settings.query_timeout_secs);
        let graph = tokio::time::timeout(timeout, Graph::connect(config))
            .await
            .map_err(|_| GraphError::Timeout(timeout))??;
        Ok(Self { graph, timeout })
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Round-trip a trivial query. Used to fail fast on an unreachable store.
    pub async fn ping(&self) -> Result<(), GraphError> {
        self.timed(async {
            let mut stream = self.graph.execute(query("RETURN 1 AS ping")).await?;
            while stream.next().await?.is_some() {}
            Ok(())
        })
        .await
    }

    /// Run `fut` under the configured per-call timeout.
    pub(crate) async fn timed<T, F>(&self, fut: F) -> Result<T, GraphError>
    where
        F: Future<Output = Result<T, neo4rs::Error>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| GraphError::Timeout(self.timeout))?
            .map_err(GraphError::from)
    }
}
