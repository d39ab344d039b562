//! Bounded-concurrency persistence of resolved connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info};

use gapfill_common::Connection;
use gapfill_graph::RelationshipStore;

/// One connection that could not be written.
#[derive(Debug, Clone, Serialize)]
pub struct WriteFailure {
    pub source_id: String,
    pub target_id: String,
    pub rel_type: String,
    pub year: i64,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PersistStats {
    pub attempted: usize,
    pub created: usize,
    pub failed: usize,
    pub failures: Vec<WriteFailure>,
}

/// Lock per endpoint node so no two in-flight writes touch the same node.
/// Entries only live while some write holds or waits on them.
#[derive(Default)]
struct NodeLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held endpoint locks; releasing prunes entries nobody else wants.
struct NodeLease<'a> {
    table: &'a NodeLocks,
    keys: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for NodeLease<'_> {
    fn drop(&mut self) {
        self.guards.clear();
        self.table.prune(&self.keys);
    }
}

impl NodeLocks {
    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.table().entry(key.to_string()).or_default().clone()
    }

    /// Acquire both endpoint locks, always in key order.
    async fn acquire(&self, connection: &Connection) -> NodeLease<'_> {
        let mut keys = vec![
            format!("{}:{}", connection.source_label, connection.source_id),
            format!("{}:{}", connection.target_label, connection.target_id),
        ];
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.handle(key).lock_owned().await);
        }
        NodeLease {
            table: self,
            keys,
            guards,
        }
    }

    /// Drop entries whose only reference is the table itself.
    fn prune(&self, keys: &[String]) {
        let mut table = self.table();
        for key in keys {
            if table.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                table.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

/// Writes connections through a [`RelationshipStore`], shared across every
/// spec of a run so the lock table and progress counter are global.
pub struct RelationshipPersister<S: ?Sized> {
    store: Arc<S>,
    locks: NodeLocks,
    max_in_flight: usize,
    progress_every: usize,
    written: AtomicUsize,
}

impl<S> RelationshipPersister<S>
where
    S: RelationshipStore + ?Sized,
{
    pub fn new(store: Arc<S>, max_in_flight: usize, progress_every: usize) -> Self {
        Self {
            store,
            locks: NodeLocks::default(),
            max_in_flight: max_in_flight.max(1),
            progress_every: progress_every.max(1),
            written: AtomicUsize::new(0),
        }
    }

    /// Total connections attempted through this persister.
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    /// Write every connection. Individual failures are logged and tallied,
    /// never returned.
    pub async fn persist(&self, connections: &[Connection]) -> PersistStats {
        let total = connections.len();
        let results: Vec<_> = stream::iter(connections)
            .map(|connection| async move {
                let result = {
                    let _lease = self.locks.acquire(connection).await;
                    self.store.upsert_relationship(connection).await
                };

                let done = self.written.fetch_add(1, Ordering::Relaxed) + 1;
                if done % self.progress_every == 0 {
                    info!(persisted = done, batch_total = total, "Persist progress");
                }
                (connection, result)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut stats = PersistStats {
            attempted: total,
            ..Default::default()
        };
        for (connection, result) in results {
            match result {
                Ok(()) => stats.created += 1,
                Err(e) => {
                    error!(
                        source_id = connection.source_id.as_str(),
                        target_id = connection.target_id.as_str(),
                        rel_type = connection.rel_type.as_str(),
                        year = connection.year,
                        error = %e,
                        "Failed to persist connection"
                    );
                    stats.failed += 1;
                    stats.failures.push(WriteFailure {
                        source_id: connection.source_id.clone(),
                        target_id: connection.target_id.clone(),
                        rel_type: connection.rel_type.clone(),
                        year: connection.year,
                        error: e.to_string(),
                    });
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gapfill_common::{EmbeddedNode, PassType};
    use gapfill_graph::memory::MemoryGraph;

    fn hub_graph(spokes: usize) -> Arc<MemoryGraph> {
        let graph = MemoryGraph::with_write_delay(Duration::from_millis(2));
        let add = |label: &str, id: String| {
            graph.add_node(EmbeddedNode {
                label: label.to_string(),
                id,
                name: String::new(),
                year: 2025,
                level: "L1".to_string(),
                embedding: vec![1.0],
            })
        };
        add("SectorObjective", "Hub".to_string());
        for i in 0..spokes {
            add("SectorPolicyTool", format!("T{i}"));
        }
        Arc::new(graph)
    }

    fn spoke(i: usize) -> Connection {
        Connection {
            source_id: "Hub".to_string(),
            source_label: "SectorObjective".to_string(),
            target_id: format!("T{i}"),
            target_label: "SectorPolicyTool".to_string(),
            rel_type: "REALIZED_VIA".to_string(),
            similarity: 0.9,
            threshold_used: 0.5,
            pass_type: PassType::Forward,
            year: 2025,
        }
    }

    #[tokio::test]
    async fn lock_table_is_empty_once_writes_finish() {
        let graph = hub_graph(10);
        let persister = RelationshipPersister::new(graph.clone(), 4, 500);
        let batch: Vec<_> = (0..10).map(spoke).collect();

        let stats = persister.persist(&batch).await;

        assert_eq!(stats.created, 10);
        assert_eq!(persister.locks.len(), 0);
        assert_eq!(graph.max_in_flight_per_node(), 1);
    }

    #[tokio::test]
    async fn failed_writes_release_their_locks() {
        let graph = hub_graph(2);
        graph.fail_writes_for("T1");
        let persister = RelationshipPersister::new(graph, 2, 500);

        let stats = persister.persist(&[spoke(0), spoke(1), spoke(7)]).await;

        assert_eq!((stats.created, stats.failed), (1, 2));
        assert_eq!(stats.failures.len(), 2);
        assert_eq!(persister.locks.len(), 0);
    }

    #[tokio::test]
    async fn progress_counter_spans_batches() {
        let graph = hub_graph(3);
        let persister = RelationshipPersister::new(graph, 1, 2);
        persister.persist(&[spoke(0), spoke(1)]).await;
        persister.persist(&[spoke(2)]).await;
        assert_eq!(persister.written(), 3);
    }
}
