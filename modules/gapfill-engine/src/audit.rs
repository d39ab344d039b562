//! Orphan/bastard acceptance audit over the expected-link catalog.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use gapfill_common::catalog::LinkAssertion;
use gapfill_graph::{AuditProbe, GraphError};

const RULE: usize = 75;

/// A per-link count, or the error that prevented it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Count {
    Value(u64),
    Error(String),
}

impl Count {
    fn value(&self) -> u64 {
        match self {
            Count::Value(v) => *v,
            Count::Error(_) => 0,
        }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Count::Value(v) => v.to_string(),
            Count::Error(e) => format!("ERR:{}", e.chars().take(30).collect::<String>()),
        };
        f.pad(&text)
    }
}

impl From<Result<u64, GraphError>> for Count {
    fn from(result: Result<u64, GraphError>) -> Self {
        match result {
            Ok(v) => Count::Value(v),
            Err(e) => Count::Error(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkCount {
    pub chain: &'static str,
    pub description: &'static str,
    pub orphans: Count,
    pub bastards: Count,
}

impl LinkCount {
    pub fn needs_attention(&self) -> bool {
        self.orphans.value() > 0 || self.bastards.value() > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub nodes: u64,
    pub relationships: u64,
    pub links: Vec<LinkCount>,
}

impl AuditReport {
    /// Sum of orphan and bastard counts over links that reported a number.
    pub fn totals(&self) -> (u64, u64) {
        self.links.iter().fold((0, 0), |(o, b), l| {
            (o + l.orphans.value(), b + l.bastards.value())
        })
    }

    pub fn has_gaps(&self) -> bool {
        let (o, b) = self.totals();
        o > 0 || b > 0
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE);
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "  ORPHAN / BASTARD REPORT ({} nodes, {} rels)",
            self.nodes, self.relationships
        )?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;
        writeln!(f, "{:<52} {:>8} {:>9}", "LINK", "ORPHANS", "BASTARDS")?;
        writeln!(f, "{}", "-".repeat(RULE))?;

        let mut current_chain = "";
        for link in &self.links {
            if link.chain != current_chain {
                current_chain = link.chain;
                writeln!(f)?;
            }
            let label = format!("{}: {}", link.chain, link.description);
            let flag = if link.needs_attention() { " <<<" } else { "" };
            writeln!(f, "  {label:<50} {:>8} {:>9}{flag}", link.orphans, link.bastards)?;
        }

        let (orphans, bastards) = self.totals();
        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "  {:<50} {orphans:>8} {bastards:>9}", "TOTALS")?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;
        write!(f, "  <<< = has orphans or bastards that need attention")
    }
}

/// Run every assertion. A failing per-link query is reported in its row;
/// failing to read the graph totals aborts the audit.
pub async fn run_audit<P>(probe: &P, links: &[LinkAssertion]) -> Result<AuditReport, GraphError>
where
    P: AuditProbe + ?Sized,
{
    let (nodes, relationships) = probe.graph_totals().await?;
    info!(nodes, relationships, links = links.len(), "Starting audit");

    let mut counts = Vec::with_capacity(links.len());
    for link in links {
        let orphans = Count::from(probe.count_orphans(link).await);
        let bastards = Count::from(probe.count_bastards(link).await);
        for count in [&orphans, &bastards] {
            if let Count::Error(e) = count {
                warn!(chain = link.chain, link = link.description, error = e.as_str(), "Audit query failed");
            }
        }
        counts.push(LinkCount {
            chain: link.chain,
            description: link.description,
            orphans,
            bastards,
        });
    }

    let report = AuditReport {
        nodes,
        relationships,
        links: counts,
    };
    let (orphans, bastards) = report.totals();
    info!(orphans, bastards, "Audit complete");
    Ok(report)
}
