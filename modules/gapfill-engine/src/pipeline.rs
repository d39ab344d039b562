//! Per spec, per year orchestration of fetch, match, resolve, dedup and persist.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use gapfill_common::{
    Connection, EmbeddedNode, MatchingConfig, NodeRef, Phase, RelationshipSpec,
};
use gapfill_graph::{CandidateFetcher, GraphError, RelationshipStore};

use crate::dedup::deduplicate;
use crate::matcher::BipartiteMatcher;
use crate::persist::{PersistStats, RelationshipPersister};
use crate::resolver::AdaptiveResolver;
use crate::similarity;

/// Processing stages of one spec/year task, in the only order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Init,
    ForwardPass,
    BackwardPass,
    OrphanResolution,
    BastardResolution,
    Deduplicate,
    Persist,
    Done,
}

struct StageTracker<'a> {
    spec: &'a RelationshipSpec,
    year: i64,
    trace: Vec<Stage>,
}

impl<'a> StageTracker<'a> {
    fn new(spec: &'a RelationshipSpec, year: i64) -> Self {
        Self {
            spec,
            year,
            trace: vec![Stage::Init],
        }
    }

    fn advance(&mut self, next: Stage) {
        let current = self.trace.last().copied().unwrap_or(Stage::Init);
        debug_assert!(next > current, "stage {next:?} after {current:?}");
        debug!(spec = %self.spec, year = self.year, stage = ?next, "Stage");
        self.trace.push(next);
    }
}

/// A node excluded before matching because its embedding is unusable.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidNode {
    pub node: NodeRef,
    pub error: String,
}

/// Everything one spec/year task produced.
#[derive(Debug, Clone)]
pub struct SpecOutcome {
    pub spec: RelationshipSpec,
    pub year: i64,
    pub sources: usize,
    pub targets: usize,
    pub forward_matches: usize,
    pub backward_matches: usize,
    /// Sources left unmatched by the forward pass.
    pub orphans: usize,
    /// Targets left unmatched by the backward pass.
    pub bastards: usize,
    pub adaptive_matches: usize,
    /// Final deduplicated connections.
    pub connections: Vec<Connection>,
    pub unresolved_orphans: Vec<NodeRef>,
    pub unresolved_bastards: Vec<NodeRef>,
    pub invalid: Vec<InvalidNode>,
    pub persisted: Option<PersistStats>,
    pub stages: Vec<Stage>,
}

/// (spec, year) tasks for a run, year-major, filtered by phase when any are given.
pub fn plan(catalog: &[RelationshipSpec], years: &[i64], phases: &[Phase]) -> Vec<(RelationshipSpec, i64)> {
    years
        .iter()
        .flat_map(|year| {
            catalog
                .iter()
                .filter(|spec| phases.is_empty() || phases.contains(&spec.phase))
                .map(move |spec| (spec.clone(), *year))
        })
        .collect()
}

pub struct GapFiller {
    fetcher: Arc<dyn CandidateFetcher>,
    resolver: AdaptiveResolver,
    strict_embeddings: bool,
    dimensions: Option<usize>,
    persister: Option<Arc<RelationshipPersister<dyn RelationshipStore>>>,
}

impl GapFiller {
    pub fn new(fetcher: Arc<dyn CandidateFetcher>, matching: &MatchingConfig) -> Self {
        Self {
            fetcher,
            resolver: AdaptiveResolver::from_config(matching),
            strict_embeddings: matching.strict_embeddings,
            dimensions: matching.dimensions,
            persister: None,
        }
    }

    /// Persist each spec's connections as soon as it is deduplicated.
    pub fn with_persister(mut self, persister: Arc<RelationshipPersister<dyn RelationshipStore>>) -> Self {
        self.persister = Some(persister);
        self
    }

    /// Run every task with at most `max_concurrent` in flight. Outcomes come
    /// back in task order. The first graph read failure aborts the run.
    pub async fn run(
        &self,
        tasks: Vec<(RelationshipSpec, i64)>,
        max_concurrent: usize,
    ) -> Result<Vec<SpecOutcome>, GraphError> {
        info!(tasks = tasks.len(), max_concurrent, "Starting gap-filling run");
        stream::iter(tasks)
            .map(|(spec, year)| async move { self.process_spec(&spec, year).await })
            .buffered(max_concurrent.max(1))
            .try_collect()
            .await
    }

    pub async fn process_spec(
        &self,
        spec: &RelationshipSpec,
        year: i64,
    ) -> Result<SpecOutcome, GraphError> {
        let mut tracker = StageTracker::new(spec, year);

        let sources = self
            .fetcher
            .fetch_candidates(&spec.source_label, year, &spec.source_level)
            .await?;
        let targets = if spec.is_reflexive() && spec.source_level == spec.target_level {
            sources.clone()
        } else {
            self.fetcher
                .fetch_candidates(&spec.target_label, year, &spec.target_level)
                .await?
        };

        let mut invalid = Vec::new();
        let sources = self.screen(sources, &mut invalid);
        let targets = self.screen(targets, &mut invalid);
        if spec.is_reflexive() {
            // Both sides saw the same nodes.
            invalid.sort_by(|a, b| a.node.id.cmp(&b.node.id));
            invalid.dedup_by(|a, b| a.node == b.node);
        }

        info!(
            spec = %spec,
            year,
            sources = sources.len(),
            targets = targets.len(),
            threshold = spec.initial_threshold,
            "Processing spec"
        );

        let matcher = BipartiteMatcher::new(spec, year);

        tracker.advance(Stage::ForwardPass);
        let forward = matcher.forward(&sources, &targets, spec.initial_threshold);

        tracker.advance(Stage::BackwardPass);
        let backward = matcher.backward(&sources, &targets, spec.initial_threshold);

        tracker.advance(Stage::OrphanResolution);
        let orphans = self
            .resolver
            .resolve_orphans(spec, year, &forward.unmatched, &targets);

        tracker.advance(Stage::BastardResolution);
        let bastards = self
            .resolver
            .resolve_bastards(spec, year, &backward.unmatched, &sources);

        let forward_matches = forward.connections.len();
        let backward_matches = backward.connections.len();
        let adaptive_matches = orphans.connections.len() + bastards.connections.len();

        tracker.advance(Stage::Deduplicate);
        let connections = deduplicate(
            forward
                .connections
                .into_iter()
                .chain(backward.connections)
                .chain(orphans.connections)
                .chain(bastards.connections),
        );

        let persisted = match &self.persister {
            Some(persister) => {
                tracker.advance(Stage::Persist);
                Some(persister.persist(&connections).await)
            }
            None => None,
        };

        tracker.advance(Stage::Done);
        info!(
            spec = %spec,
            year,
            forward = forward_matches,
            backward = backward_matches,
            adaptive = adaptive_matches,
            connections = connections.len(),
            unresolved = orphans.unresolved.len() + bastards.unresolved.len(),
            "Spec complete"
        );

        Ok(SpecOutcome {
            spec: spec.clone(),
            year,
            sources: sources.len(),
            targets: targets.len(),
            forward_matches,
            backward_matches,
            orphans: forward.unmatched.len(),
            bastards: backward.unmatched.len(),
            adaptive_matches,
            connections,
            unresolved_orphans: orphans.unresolved,
            unresolved_bastards: bastards.unresolved,
            invalid,
            persisted,
            stages: tracker.trace,
        })
    }

    /// In strict mode drop nodes whose embedding fails validation.
    fn screen(&self, nodes: Vec<EmbeddedNode>, invalid: &mut Vec<InvalidNode>) -> Vec<EmbeddedNode> {
        if !self.strict_embeddings {
            return nodes;
        }
        nodes
            .into_iter()
            .filter(|node| match similarity::validate(&node.embedding, self.dimensions) {
                Ok(()) => true,
                Err(e) => {
                    warn!(node = %node.node_ref(), error = %e, "Excluding node with invalid embedding");
                    invalid.push(InvalidNode {
                        node: node.node_ref(),
                        error: e.to_string(),
                    });
                    false
                }
            })
            .collect()
    }
}
