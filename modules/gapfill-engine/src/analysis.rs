//! Best-score distributions, used to pick starting thresholds.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use gapfill_common::{EmbeddedNode, RelationshipSpec};
use gapfill_graph::{CandidateFetcher, GraphError};

use crate::matcher::best_candidate;

pub const COVERAGE_THRESHOLDS: [f64; 6] = [0.85, 0.75, 0.60, 0.50, 0.40, 0.35];

/// How many sources would match at a given threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub threshold: f64,
    pub matched: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDistribution {
    pub count: usize,
    pub max: f64,
    pub p90: f64,
    pub p75: f64,
    pub median: f64,
    pub average: f64,
    pub min: f64,
    pub coverage: Vec<Coverage>,
}

impl ScoreDistribution {
    /// Summarise best scores. Percentiles index into the descending-sorted
    /// list: p90 at `n / 10`, p75 at `n / 4`, median at `n / 2`.
    pub fn from_scores(mut scores: Vec<f64>) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        scores.sort_by(|a, b| b.total_cmp(a));
        let n = scores.len();
        let at = |fraction: f64| scores[((n as f64 * fraction) as usize).min(n - 1)];

        let coverage = COVERAGE_THRESHOLDS
            .iter()
            .map(|&threshold| {
                let matched = scores.iter().filter(|s| **s >= threshold).count();
                Coverage {
                    threshold,
                    matched,
                    percent: matched as f64 * 100.0 / n as f64,
                }
            })
            .collect();

        Some(Self {
            count: n,
            max: scores[0],
            p90: at(0.10),
            p75: at(0.25),
            median: scores[n / 2],
            average: scores.iter().sum::<f64>() / n as f64,
            min: scores[n - 1],
            coverage,
        })
    }
}

/// Best score per source over all targets, threshold ignored. Sources whose
/// only candidate is themselves contribute nothing.
pub fn best_scores(sources: &[EmbeddedNode], targets: &[EmbeddedNode]) -> Vec<f64> {
    sources
        .iter()
        .filter_map(|s| best_candidate(s, targets).map(|(_, score)| score))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecAnalysis {
    pub spec: RelationshipSpec,
    pub year: i64,
    pub sources: usize,
    pub targets: usize,
    pub distribution: ScoreDistribution,
}

/// Fetch both sides for `spec` in `year` and summarise. `None` when either
/// side has no embedded nodes.
pub async fn analyze_spec(
    fetcher: &dyn CandidateFetcher,
    spec: &RelationshipSpec,
    year: i64,
) -> Result<Option<SpecAnalysis>, GraphError> {
    let sources = fetcher
        .fetch_candidates(&spec.source_label, year, &spec.source_level)
        .await?;
    let targets = fetcher
        .fetch_candidates(&spec.target_label, year, &spec.target_level)
        .await?;
    if sources.is_empty() || targets.is_empty() {
        warn!(spec = %spec, year, sources = sources.len(), targets = targets.len(), "Insufficient data for analysis");
        return Ok(None);
    }

    Ok(ScoreDistribution::from_scores(best_scores(&sources, &targets)).map(|distribution| {
        SpecAnalysis {
            spec: spec.clone(),
            year,
            sources: sources.len(),
            targets: targets.len(),
            distribution,
        }
    }))
}

impl fmt::Display for SpecAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.distribution;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "{} [{}] threshold {:.2}", self.spec, self.year, self.spec.initial_threshold)?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "  Sources: {}  Targets: {}", self.sources, self.targets)?;
        writeln!(f, "  Max:     {:.4}", d.max)?;
        writeln!(f, "  P90:     {:.4}", d.p90)?;
        writeln!(f, "  P75:     {:.4}", d.p75)?;
        writeln!(f, "  Median:  {:.4}", d.median)?;
        writeln!(f, "  Average: {:.4}", d.average)?;
        writeln!(f, "  Min:     {:.4}", d.min)?;
        for c in &d.coverage {
            writeln!(
                f,
                "  Threshold {:.2}: {}/{} ({:.1}%) matches",
                c.threshold, c.matched, d.count, c.percent
            )?;
        }
        Ok(())
    }
}
