//! Single-best-match passes between a source set and a target set.

use std::cmp::Ordering;

use gapfill_common::{Connection, EmbeddedNode, PassType, RelationshipSpec};

use crate::similarity;

/// Result of one pass: the connections found and the nodes left without a partner.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub connections: Vec<Connection>,
    /// Orphans after a forward pass, bastards after a backward pass.
    pub unmatched: Vec<EmbeddedNode>,
}

fn is_self(a: &EmbeddedNode, b: &EmbeddedNode) -> bool {
    a.id == b.id && a.label == b.label
}

/// Highest-scoring candidate for `node`, ignoring any threshold.
///
/// Equal scores resolve to the lower id so the result does not depend on
/// candidate order. Returns `None` when every candidate is `node` itself.
pub fn best_candidate<'c>(
    node: &EmbeddedNode,
    candidates: &'c [EmbeddedNode],
) -> Option<(&'c EmbeddedNode, f64)> {
    candidates
        .iter()
        .filter(|c| !is_self(node, c))
        .map(|c| (c, similarity::score(&node.embedding, &c.embedding)))
        .max_by(|(a, sa), (b, sb)| match sa.total_cmp(sb) {
            Ordering::Equal => b.id.cmp(&a.id),
            other => other,
        })
}

/// Best candidate scoring at least `threshold`.
pub fn best_match<'c>(
    node: &EmbeddedNode,
    candidates: &'c [EmbeddedNode],
    threshold: f64,
) -> Option<(&'c EmbeddedNode, f64)> {
    best_candidate(node, candidates).filter(|(_, score)| *score >= threshold)
}

/// Build a connection from oriented endpoints.
pub(crate) fn connect(
    spec: &RelationshipSpec,
    year: i64,
    source: &EmbeddedNode,
    target: &EmbeddedNode,
    similarity: f64,
    threshold_used: f64,
    pass_type: PassType,
) -> Connection {
    Connection {
        source_id: source.id.clone(),
        source_label: spec.source_label.clone(),
        target_id: target.id.clone(),
        target_label: spec.target_label.clone(),
        rel_type: spec.rel_type.clone(),
        similarity,
        threshold_used,
        pass_type,
        year,
    }
}

/// Forward and backward passes for one spec in one year.
pub struct BipartiteMatcher<'a> {
    spec: &'a RelationshipSpec,
    year: i64,
}

impl<'a> BipartiteMatcher<'a> {
    pub fn new(spec: &'a RelationshipSpec, year: i64) -> Self {
        Self { spec, year }
    }

    /// Each source keeps its best target. At most one connection per source.
    pub fn forward(
        &self,
        sources: &[EmbeddedNode],
        targets: &[EmbeddedNode],
        threshold: f64,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        for source in sources {
            match best_match(source, targets, threshold) {
                Some((target, score)) => outcome.connections.push(connect(
                    self.spec,
                    self.year,
                    source,
                    target,
                    score,
                    threshold,
                    PassType::Forward,
                )),
                None => outcome.unmatched.push(source.clone()),
            }
        }
        outcome
    }

    /// Each target keeps its best source. At most one connection per target.
    pub fn backward(
        &self,
        sources: &[EmbeddedNode],
        targets: &[EmbeddedNode],
        threshold: f64,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        for target in targets {
            match best_match(target, sources, threshold) {
                Some((source, score)) => outcome.connections.push(connect(
                    self.spec,
                    self.year,
                    source,
                    target,
                    score,
                    threshold,
                    PassType::Backward,
                )),
                None => outcome.unmatched.push(target.clone()),
            }
        }
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gapfill_common::Phase;
    use std::collections::HashSet;

    pub(crate) fn node(label: &str, id: &str, embedding: &[f64]) -> EmbeddedNode {
        EmbeddedNode {
            label: label.to_string(),
            id: id.to_string(),
            name: format!("{id} name"),
            year: 2025,
            level: "L1".to_string(),
            embedding: embedding.to_vec(),
        }
    }

    pub(crate) fn spec(source: &str, target: &str, rel: &str) -> RelationshipSpec {
        RelationshipSpec {
            phase: Phase::SectorValueChain,
            source_label: source.to_string(),
            target_label: target.to_string(),
            rel_type: rel.to_string(),
            source_level: "L1".to_string(),
            target_level: "L1".to_string(),
            initial_threshold: 0.5,
        }
    }

    #[test]
    fn orthogonal_sets_match_one_to_one() {
        let spec = spec("Objective", "PolicyTool", "REALIZED_VIA");
        let sources = vec![node("Objective", "A", &[1.0, 0.0]), node("Objective", "B", &[0.0, 1.0])];
        let targets = vec![node("PolicyTool", "X", &[1.0, 0.0]), node("PolicyTool", "Y", &[0.0, 1.0])];

        let out = BipartiteMatcher::new(&spec, 2025).forward(&sources, &targets, 0.9);

        assert!(out.unmatched.is_empty());
        let pairs: Vec<_> = out
            .connections
            .iter()
            .map(|c| (c.source_id.as_str(), c.target_id.as_str(), c.similarity))
            .collect();
        assert_eq!(pairs, vec![("A", "X", 1.0), ("B", "Y", 1.0)]);
        assert!(out.connections.iter().all(|c| c.pass_type == PassType::Forward));
        assert!(out.connections.iter().all(|c| c.threshold_used == 0.9));
    }

    #[test]
    fn forward_never_emits_two_connections_per_source() {
        let spec = spec("Sector", "Department", "HAS_DEPT");
        let sources = vec![node("Sector", "S1", &[1.0, 0.1]), node("Sector", "S2", &[0.9, 0.2])];
        let targets = vec![
            node("Department", "D1", &[1.0, 0.0]),
            node("Department", "D2", &[1.0, 0.05]),
            node("Department", "D3", &[0.8, 0.3]),
        ];

        let out = BipartiteMatcher::new(&spec, 2025).forward(&sources, &targets, 0.1);
        let ids: HashSet<_> = out.connections.iter().map(|c| c.source_id.clone()).collect();
        assert_eq!(ids.len(), out.connections.len());
        assert_eq!(out.connections.len(), 2);
    }

    #[test]
    fn backward_never_emits_two_connections_per_target() {
        let spec = spec("Sector", "Department", "HAS_DEPT");
        let sources = vec![node("Sector", "S1", &[1.0, 0.0]), node("Sector", "S2", &[0.0, 1.0])];
        let targets = vec![
            node("Department", "D1", &[1.0, 0.1]),
            node("Department", "D2", &[0.9, 0.0]),
            node("Department", "D3", &[0.1, 1.0]),
        ];

        let out = BipartiteMatcher::new(&spec, 2025).backward(&sources, &targets, 0.5);
        let ids: HashSet<_> = out.connections.iter().map(|c| c.target_id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(out.connections.len(), 3);
        assert!(out.connections.iter().all(|c| c.pass_type == PassType::Backward));
        // Orientation stays source -> target.
        let d3 = out.connections.iter().find(|c| c.target_id == "D3").unwrap();
        assert_eq!(d3.source_id, "S2");
        assert_eq!(d3.source_label, "Sector");
    }

    #[test]
    fn below_threshold_sources_become_orphans() {
        let spec = spec("Objective", "PolicyTool", "REALIZED_VIA");
        let sources = vec![node("Objective", "C", &[1.0, 0.0])];
        let targets = vec![node("PolicyTool", "X", &[0.0, 1.0])];

        let out = BipartiteMatcher::new(&spec, 2025).forward(&sources, &targets, 0.5);
        assert!(out.connections.is_empty());
        assert_eq!(out.unmatched.len(), 1);
        assert_eq!(out.unmatched[0].id, "C");
    }

    #[test]
    fn reflexive_specs_skip_self_matches() {
        let spec = spec("Capability", "Capability", "ROLE_COLLABORATION");
        let caps = vec![
            node("Capability", "C1", &[1.0, 0.0]),
            node("Capability", "C2", &[0.7, 0.7]),
        ];

        let out = BipartiteMatcher::new(&spec, 2025).forward(&caps, &caps, 0.1);
        assert!(out.connections.iter().all(|c| c.source_id != c.target_id));
        assert_eq!(out.connections.len(), 2);
    }

    #[test]
    fn same_id_under_different_labels_is_not_a_self_match() {
        let spec = spec("Risk", "Capability", "MONITORED_BY");
        let sources = vec![node("Risk", "1.1", &[1.0, 0.0])];
        let targets = vec![node("Capability", "1.1", &[1.0, 0.0])];

        let out = BipartiteMatcher::new(&spec, 2025).forward(&sources, &targets, 0.9);
        assert_eq!(out.connections.len(), 1);
    }

    #[test]
    fn ties_resolve_to_lowest_id_regardless_of_order() {
        let source = node("Objective", "A", &[1.0, 0.0]);
        let forward = vec![
            node("PolicyTool", "T2", &[2.0, 0.0]),
            node("PolicyTool", "T1", &[1.0, 0.0]),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let (a, _) = best_candidate(&source, &forward).unwrap();
        let (b, _) = best_candidate(&source, &reversed).unwrap();
        assert_eq!(a.id, "T1");
        assert_eq!(b.id, "T1");
    }

    #[test]
    fn malformed_embeddings_never_match() {
        let source = node("Objective", "A", &[1.0, 0.0]);
        let targets = vec![
            node("PolicyTool", "Empty", &[]),
            node("PolicyTool", "Short", &[1.0]),
            node("PolicyTool", "Zero", &[0.0, 0.0]),
        ];
        assert!(best_match(&source, &targets, 0.01).is_none());
    }
}
