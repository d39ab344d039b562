//! Adaptive threshold relaxation for nodes a fixed-threshold pass left unmatched.

use tracing::{debug, info, warn};

use gapfill_common::config::effective_ladder;
use gapfill_common::{Connection, EmbeddedNode, MatchingConfig, NodeRef, PassType, RelationshipSpec};

use crate::matcher::{best_candidate, connect};
use crate::similarity;

/// Connections recovered by relaxation plus the nodes nothing could rescue.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub connections: Vec<Connection>,
    pub unresolved: Vec<NodeRef>,
}

pub struct AdaptiveResolver {
    steps: Vec<f64>,
    floor: f64,
}

impl AdaptiveResolver {
    pub fn new(ladder: Vec<f64>, floor: f64) -> Self {
        Self {
            steps: effective_ladder(&ladder, floor),
            floor,
        }
    }

    pub fn from_config(matching: &MatchingConfig) -> Self {
        Self::new(matching.ladder.clone(), matching.floor)
    }

    /// Steps actually tried: the ladder down to the floor, ending at the floor.
    pub fn steps(&self) -> impl Iterator<Item = f64> + '_ {
        self.steps.iter().copied()
    }

    /// First step at which a node whose best candidate scores `best` would match.
    ///
    /// Every step sees the same best candidate, so walking the ladder against
    /// that single score gives the same answer as rescanning per step.
    fn first_step(&self, best: f64) -> Option<f64> {
        self.steps().find(|t| best >= *t)
    }

    /// Relax orphans (sources without a target) against all targets.
    pub fn resolve_orphans(
        &self,
        spec: &RelationshipSpec,
        year: i64,
        orphans: &[EmbeddedNode],
        targets: &[EmbeddedNode],
    ) -> Resolution {
        let resolution = self.resolve(orphans, targets, "orphan", |node, partner, score, step| {
            connect(spec, year, node, partner, score, step, PassType::ForwardAdaptive)
        });
        info!(
            spec = %spec,
            year,
            resolved = resolution.connections.len(),
            unresolved = resolution.unresolved.len(),
            "Orphan resolution complete"
        );
        resolution
    }

    /// Relax bastards (targets without a source) against all sources.
    pub fn resolve_bastards(
        &self,
        spec: &RelationshipSpec,
        year: i64,
        bastards: &[EmbeddedNode],
        sources: &[EmbeddedNode],
    ) -> Resolution {
        let resolution = self.resolve(bastards, sources, "bastard", |node, partner, score, step| {
            connect(spec, year, partner, node, score, step, PassType::BackwardAdaptive)
        });
        info!(
            spec = %spec,
            year,
            resolved = resolution.connections.len(),
            unresolved = resolution.unresolved.len(),
            "Bastard resolution complete"
        );
        resolution
    }

    fn resolve<F>(
        &self,
        unmatched: &[EmbeddedNode],
        candidates: &[EmbeddedNode],
        kind: &str,
        build: F,
    ) -> Resolution
    where
        F: Fn(&EmbeddedNode, &EmbeddedNode, f64, f64) -> Connection,
    {
        let mut resolution = Resolution::default();
        for node in unmatched {
            let found = best_candidate(node, candidates)
                .and_then(|(partner, score)| self.first_step(score).map(|step| (partner, score, step)));

            match found {
                Some((partner, score, step)) => {
                    debug!(kind, id = node.id.as_str(), partner = partner.id.as_str(), score, step, "Resolved");
                    resolution.connections.push(build(node, partner, score, step));
                }
                None => {
                    match similarity::validate(&node.embedding, None) {
                        Ok(()) => warn!(kind, node = %node.node_ref(), floor = self.floor, "Unresolved after adaptive search"),
                        Err(e) => warn!(kind, node = %node.node_ref(), error = %e, "Unresolved, invalid embedding"),
                    }
                    resolution.unresolved.push(node.node_ref());
                }
            }
        }
        resolution
    }
}
