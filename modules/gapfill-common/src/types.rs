use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GapFillError;

// --- Nodes ---

/// A graph node carrying a pre-computed embedding, scoped to one year and level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedNode {
    pub label: String,
    pub id: String,
    pub name: String,
    pub year: i64,
    pub level: String,
    pub embedding: Vec<f64>,
}

impl EmbeddedNode {
    /// Identity of the node without its payload, for logging and reporting.
    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            label: self.label.clone(),
            id: self.id.clone(),
            name: self.name.clone(),
            year: self.year,
            level: self.level.clone(),
        }
    }
}

/// Lightweight identity of a node that ended a pass without a partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: String,
    pub id: String,
    pub name: String,
    pub year: i64,
    pub level: String,
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({}, {} {})", self.label, self.id, self.name, self.level, self.year)
    }
}

// --- Relationship specs ---

/// Ordered stage of the domain value chain a relationship spec belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SectorValueChain,
    StrategicInitiatives,
    StrategicPriorities,
    BuildOversight,
    SustainableOperations,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::SectorValueChain,
        Phase::StrategicInitiatives,
        Phase::StrategicPriorities,
        Phase::BuildOversight,
        Phase::SustainableOperations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::SectorValueChain => "sector_value_chain",
            Phase::StrategicInitiatives => "strategic_initiatives",
            Phase::StrategicPriorities => "strategic_priorities",
            Phase::BuildOversight => "build_oversight",
            Phase::SustainableOperations => "sustainable_operations",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = GapFillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| GapFillError::Validation(format!("unknown phase: {s}")))
    }
}

/// One directed semantic link the pipeline is responsible for completing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    pub phase: Phase,
    pub source_label: String,
    pub target_label: String,
    pub rel_type: String,
    pub source_level: String,
    pub target_level: String,
    pub initial_threshold: f64,
}

impl RelationshipSpec {
    /// True when the relation links a label to itself and self-matches must be skipped.
    pub fn is_reflexive(&self) -> bool {
        self.source_label == self.target_label
    }
}

impl fmt::Display for RelationshipSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) -[:{}]-> {}({})",
            self.source_label, self.source_level, self.rel_type, self.target_label, self.target_level
        )
    }
}

// --- Connections ---

/// Which matching pass discovered a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassType {
    Forward,
    Backward,
    ForwardAdaptive,
    BackwardAdaptive,
}

impl PassType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassType::Forward => "forward",
            PassType::Backward => "backward",
            PassType::ForwardAdaptive => "forward_adaptive",
            PassType::BackwardAdaptive => "backward_adaptive",
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, PassType::ForwardAdaptive | PassType::BackwardAdaptive)
    }
}

impl fmt::Display for PassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassType {
    type Err = GapFillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(PassType::Forward),
            "backward" => Ok(PassType::Backward),
            "forward_adaptive" => Ok(PassType::ForwardAdaptive),
            "backward_adaptive" => Ok(PassType::BackwardAdaptive),
            other => Err(GapFillError::Validation(format!("unknown pass type: {other}"))),
        }
    }
}

/// A candidate or confirmed gap-filled edge. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source_id: String,
    pub source_label: String,
    pub target_id: String,
    pub target_label: String,
    pub rel_type: String,
    pub similarity: f64,
    pub threshold_used: f64,
    pub pass_type: PassType,
    pub year: i64,
}

impl Connection {
    /// Deduplication identity. Deliberately excludes `rel_type`.
    pub fn pair_key(&self) -> (&str, &str) {
        (self.source_id.as_str(), self.target_id.as_str())
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -[:{}]-> {}:{} (sim={:.3}, threshold={:.2}, {}, {})",
            self.source_label,
            self.source_id,
            self.rel_type,
            self.target_label,
            self.target_id,
            self.similarity,
            self.threshold_used,
            self.pass_type,
            self.year
        )
    }
}
