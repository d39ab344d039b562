use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use gapfill_common::NodeRef;

use crate::pipeline::{InvalidNode, SpecOutcome};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub specs: usize,
    pub connections: usize,
    /// Connections only found by threshold relaxation.
    pub adaptive_connections: usize,
    pub unresolved_orphans: usize,
    pub unresolved_bastards: usize,
    pub invalid_embeddings: usize,
    pub persisted: usize,
    pub persist_failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedNode {
    pub rel_type: String,
    pub year: i64,
    pub side: &'static str,
    pub node: NodeRef,
}

/// Machine-readable record of one run, written next to the CSV.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub years: Vec<i64>,
    pub specs_processed: usize,
    pub total_connections: usize,
    pub by_phase: BTreeMap<String, PhaseSummary>,
    pub by_pass_type: BTreeMap<String, usize>,
    pub by_rel_type: BTreeMap<String, usize>,
    pub unresolved: Vec<UnresolvedNode>,
    pub invalid: Vec<InvalidNode>,
    pub csv_path: Option<String>,
}

impl RunSummary {
    pub fn from_outcomes(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        outcomes: &[SpecOutcome],
    ) -> Self {
        let mut years: Vec<i64> = outcomes.iter().map(|o| o.year).collect();
        years.sort_unstable();
        years.dedup();

        let mut by_phase: BTreeMap<String, PhaseSummary> = BTreeMap::new();
        let mut by_pass_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_rel_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut unresolved = Vec::new();
        let mut invalid = Vec::new();

        for outcome in outcomes {
            let phase = by_phase.entry(outcome.spec.phase.to_string()).or_default();
            phase.specs += 1;
            phase.connections += outcome.connections.len();
            phase.unresolved_orphans += outcome.unresolved_orphans.len();
            phase.unresolved_bastards += outcome.unresolved_bastards.len();
            phase.invalid_embeddings += outcome.invalid.len();
            if let Some(stats) = &outcome.persisted {
                phase.persisted += stats.created;
                phase.persist_failed += stats.failed;
            }

            phase.adaptive_connections += outcome
                .connections
                .iter()
                .filter(|c| c.pass_type.is_adaptive())
                .count();

            for c in &outcome.connections {
                *by_pass_type.entry(c.pass_type.to_string()).or_default() += 1;
                *by_rel_type.entry(c.rel_type.clone()).or_default() += 1;
            }

            let sides = [
                ("orphan", &outcome.unresolved_orphans),
                ("bastard", &outcome.unresolved_bastards),
            ];
            for (side, nodes) in sides {
                unresolved.extend(nodes.iter().map(|node| UnresolvedNode {
                    rel_type: outcome.spec.rel_type.clone(),
                    year: outcome.year,
                    side,
                    node: node.clone(),
                }));
            }
            invalid.extend(outcome.invalid.iter().cloned());
        }

        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            years,
            specs_processed: outcomes.len(),
            total_connections: outcomes.iter().map(|o| o.connections.len()).sum(),
            by_phase,
            by_pass_type,
            by_rel_type,
            unresolved,
            invalid,
            csv_path: None,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run summary: {}", path.display()))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}: {} specs, {} connections", self.run_id, self.specs_processed, self.total_connections)?;
        writeln!(f, "By phase:")?;
        for (phase, s) in &self.by_phase {
            writeln!(
                f,
                "  {phase:<24} connections={:<6} adaptive={:<5} unresolved={}/{} invalid={} persisted={} failed={}",
                s.connections,
                s.adaptive_connections,
                s.unresolved_orphans,
                s.unresolved_bastards,
                s.invalid_embeddings,
                s.persisted,
                s.persist_failed
            )?;
        }
        writeln!(f, "By pass type:")?;
        for (pass, n) in &self.by_pass_type {
            writeln!(f, "  {pass:<20} {n}")?;
        }
        writeln!(f, "By relationship type:")?;
        for (rel, n) in &self.by_rel_type {
            writeln!(f, "  {rel:<24} {n}")?;
        }
        Ok(())
    }
}
