//! In-memory graph store for tests: no Neo4j, no Docker.
//!
//! Mirrors the Cypher semantics of [`GraphClient`](crate::GraphClient): candidate
//! reads filter on label/year/level with a present embedding, writes resolve
//! endpoints by the persistence rule and MERGE on (source, type, target).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use gapfill_common::catalog::LinkAssertion;
use gapfill_common::{Connection, EmbeddedNode, PassType};

use crate::error::GraphError;
use crate::traits::{AuditProbe, CandidateFetcher, RelationshipStore};

#[derive(Debug, Clone)]
struct StoredNode {
    label: String,
    id: String,
    name: String,
    year: i64,
    level: String,
    embedding: Option<Vec<f64>>,
}

/// Edge identity: (source node index, rel type, target node index).
type EdgeKey = (usize, String, usize);

/// Properties set on a gap-filled edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeProps {
    pub similarity: f64,
    pub threshold_used: f64,
    pub pass_type: PassType,
    pub effective_year: i64,
    pub gap_filled: bool,
    /// Year of the node versions the edge was attached to.
    pub source_year: i64,
    pub target_year: i64,
}

#[derive(Default)]
struct Inner {
    nodes: Vec<StoredNode>,
    edges: HashMap<EdgeKey, Option<EdgeProps>>,
    fetches: usize,
    failing_ids: HashSet<String>,
    in_flight: HashMap<usize, usize>,
    max_in_flight_per_node: usize,
}

#[derive(Default)]
pub struct MemoryGraph {
    inner: Mutex<Inner>,
    write_delay: Option<Duration>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep inside every write so overlapping writes become observable.
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            inner: Mutex::default(),
            write_delay: Some(delay),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_node(&self, node: EmbeddedNode) {
        self.lock().nodes.push(StoredNode {
            label: node.label,
            id: node.id,
            name: node.name,
            year: node.year,
            level: node.level,
            embedding: Some(node.embedding),
        });
    }

    /// A node with no embedding property: invisible to candidate reads but
    /// still resolvable as an edge endpoint.
    pub fn add_node_without_embedding(&self, label: &str, id: &str, year: i64, level: &str) {
        self.lock().nodes.push(StoredNode {
            label: label.to_string(),
            id: id.to_string(),
            name: id.to_string(),
            year,
            level: level.to_string(),
            embedding: None,
        });
    }

    /// An authoritative (non gap-filled) edge between exact node versions.
    pub fn add_edge(
        &self,
        source: (&str, &str, i64),
        rel_type: &str,
        target: (&str, &str, i64),
    ) -> Result<(), GraphError> {
        let mut inner = self.lock();
        let find = |inner: &Inner, (label, id, year): (&str, &str, i64)| {
            inner
                .nodes
                .iter()
                .position(|n| n.label == label && n.id == id && n.year == year)
                .ok_or_else(|| GraphError::Store(format!("no node {label}:{id}@{year}")))
        };
        let s = find(&*inner, source)?;
        let t = find(&*inner, target)?;
        inner.edges.entry((s, rel_type.to_string(), t)).or_insert(None);
        Ok(())
    }

    /// Make every write touching a node with this id fail.
    pub fn fail_writes_for(&self, id: &str) {
        self.lock().failing_ids.insert(id.to_string());
    }

    pub fn edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    pub fn gap_filled_count(&self) -> usize {
        self.lock().edges.values().filter(|p| p.is_some()).count()
    }

    /// Number of candidate reads served so far.
    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    /// Highest number of concurrent writes observed touching one node.
    pub fn max_in_flight_per_node(&self) -> usize {
        self.lock().max_in_flight_per_node
    }

    /// Properties of the gap-filled edge between the given ids, if any.
    pub fn edge(&self, source_id: &str, rel_type: &str, target_id: &str) -> Option<EdgeProps> {
        let inner = self.lock();
        inner.edges.iter().find_map(|((s, rel, t), props)| {
            let matches = inner.nodes[*s].id == source_id
                && rel == rel_type
                && inner.nodes[*t].id == target_id;
            if matches {
                props.clone()
            } else {
                None
            }
        })
    }

    /// Latest version of `label:id` with `year <= at_or_before`.
    fn resolve(inner: &Inner, label: &str, id: &str, at_or_before: i64) -> Option<usize> {
        inner
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.label == label && n.id == id && n.year <= at_or_before)
            .max_by_key(|(_, n)| n.year)
            .map(|(i, _)| i)
    }

    fn has_edge(
        inner: &Inner,
        from: usize,
        rel_types: &[&str],
        to_labels: &[&str],
        to_level: &str,
        outgoing: bool,
    ) -> bool {
        inner.edges.keys().any(|(s, rel, t)| {
            let (this, other) = if outgoing { (*s, *t) } else { (*t, *s) };
            if this != from || !rel_types.contains(&rel.as_str()) {
                return false;
            }
            let other = &inner.nodes[other];
            to_labels.contains(&other.label.as_str()) && other.level == to_level
        })
    }

    fn enter(&self, nodes: [usize; 2]) {
        let mut inner = self.lock();
        for n in nodes {
            let count = inner.in_flight.entry(n).or_insert(0);
            *count += 1;
            let observed = *count;
            inner.max_in_flight_per_node = inner.max_in_flight_per_node.max(observed);
        }
    }

    fn leave(&self, nodes: [usize; 2]) {
        let mut inner = self.lock();
        for n in nodes {
            if let Some(count) = inner.in_flight.get_mut(&n) {
                *count = count.saturating_sub(1);
            }
        }
    }
}

#[async_trait]
impl CandidateFetcher for MemoryGraph {
    async fn fetch_candidates(
        &self,
        label: &str,
        year: i64,
        level: &str,
    ) -> Result<Vec<EmbeddedNode>, GraphError> {
        let mut inner = self.lock();
        inner.fetches += 1;
        let mut nodes: Vec<EmbeddedNode> = inner
            .nodes
            .iter()
            .filter(|n| n.label == label && n.year == year && n.level == level)
            .filter_map(|n| {
                n.embedding.as_ref().map(|embedding| EmbeddedNode {
                    label: n.label.clone(),
                    id: n.id.clone(),
                    name: n.name.clone(),
                    year: n.year,
                    level: n.level.clone(),
                    embedding: embedding.clone(),
                })
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }
}

#[async_trait]
impl RelationshipStore for MemoryGraph {
    async fn upsert_relationship(&self, connection: &Connection) -> Result<(), GraphError> {
        let endpoints = {
            let inner = self.lock();
            if inner.failing_ids.contains(&connection.source_id)
                || inner.failing_ids.contains(&connection.target_id)
            {
                return Err(GraphError::Store(format!(
                    "injected failure for {} -> {}",
                    connection.source_id, connection.target_id
                )));
            }
            let s = Self::resolve(
                &inner,
                &connection.source_label,
                &connection.source_id,
                connection.year,
            );
            let t = Self::resolve(
                &inner,
                &connection.target_label,
                &connection.target_id,
                connection.year,
            );
            s.zip(t)
        };

        let Some((s, t)) = endpoints else {
            return Err(GraphError::EndpointMissing {
                source_label: connection.source_label.clone(),
                source_id: connection.source_id.clone(),
                target_label: connection.target_label.clone(),
                target_id: connection.target_id.clone(),
                year: connection.year,
            });
        };

        self.enter([s, t]);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        let props = EdgeProps {
            similarity: connection.similarity,
            threshold_used: connection.threshold_used,
            pass_type: connection.pass_type,
            effective_year: connection.year,
            gap_filled: true,
            source_year: inner.nodes[s].year,
            target_year: inner.nodes[t].year,
        };
        inner
            .edges
            .insert((s, connection.rel_type.clone(), t), Some(props));
        drop(inner);

        self.leave([s, t]);
        Ok(())
    }
}

#[async_trait]
impl AuditProbe for MemoryGraph {
    async fn count_orphans(&self, link: &LinkAssertion) -> Result<u64, GraphError> {
        let inner = self.lock();
        let count = inner
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                link.source_labels.contains(&n.label.as_str()) && n.level == link.source_level
            })
            .filter(|(i, _)| {
                !Self::has_edge(&inner, *i, link.rel_types, link.target_labels, link.target_level, true)
            })
            .count();
        Ok(count as u64)
    }

    async fn count_bastards(&self, link: &LinkAssertion) -> Result<u64, GraphError> {
        let inner = self.lock();
        let count = inner
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                link.target_labels.contains(&n.label.as_str()) && n.level == link.target_level
            })
            .filter(|(i, _)| {
                !Self::has_edge(&inner, *i, link.rel_types, link.source_labels, link.source_level, false)
            })
            .count();
        Ok(count as u64)
    }

    async fn graph_totals(&self) -> Result<(u64, u64), GraphError> {
        let inner = self.lock();
        Ok((inner.nodes.len() as u64, inner.edges.len() as u64))
    }
}
