//! Fixed workload definitions: which relationships the gap-filler completes,
//! and which links the auditor expects to exist afterwards.

use crate::types::{Phase, RelationshipSpec};

/// Years processed by a full run unless configured otherwise.
pub const DEFAULT_YEARS: [i64; 5] = [2025, 2026, 2027, 2028, 2029];

/// Initial threshold for rel types not listed in [`DEFAULT_THRESHOLDS`].
pub const DEFAULT_THRESHOLD: f64 = 0.50;

/// Descending threshold ladder for adaptive resolution.
pub const DEFAULT_LADDER: [f64; 7] = [0.50, 0.45, 0.40, 0.35, 0.30, 0.25, 0.20];

/// Adaptive resolution never accepts a match below this score.
pub const DEFAULT_FLOOR: f64 = 0.20;

/// Per-rel-type starting thresholds, tuned from observed score ranges.
pub const DEFAULT_THRESHOLDS: &[(&str, f64)] = &[
    // Sector value chain
    ("REFERS_TO", 0.40),
    ("APPLIED_ON", 0.45),
    ("TRIGGERS_EVENT", 0.60),
    ("MEASURED_BY", 0.50),
    ("AGGREGATES_TO", 0.50),
    ("REALIZED_VIA", 0.50),
    // Strategic initiatives
    ("SETS_PRIORITIES", 0.50),
    ("ROLE_GAPS", 0.50),
    ("KNOWLEDGE_GAPS", 0.50),
    ("AUTOMATION_GAPS", 0.50),
    ("GAPS_SCOPE", 0.50),
    ("ADOPTION_RISKS", 0.50),
    // Strategic priorities
    ("CASCADED_VIA", 0.50),
    ("SETS_TARGETS", 0.50),
    // Build oversight
    ("INCREASE_ADOPTION", 0.50),
    ("CLOSE_GAPS", 0.50),
    ("MONITORED_BY", 0.50),
    ("INFORMS", 0.50),
    ("GOVERNED_BY", 0.50),
    // Sustainable operations
    ("MONITORS_FOR", 0.50),
    ("APPLY", 0.50),
    ("AUTOMATION", 0.50),
    ("DEPENDS_ON", 0.50),
];

/// Built-in starting threshold for a rel type, if it has a tuned one.
pub fn tuned_threshold(rel_type: &str) -> Option<f64> {
    DEFAULT_THRESHOLDS
        .iter()
        .find(|(rt, _)| *rt == rel_type)
        .map(|(_, t)| *t)
}

pub fn default_threshold(rel_type: &str) -> f64 {
    tuned_threshold(rel_type).unwrap_or(DEFAULT_THRESHOLD)
}

// (phase, source_label, target_label, rel_type, source_level, target_level)
type SpecRow = (Phase, &'static str, &'static str, &'static str, &'static str, &'static str);

const RELATIONSHIPS: &[SpecRow] = &[
    (Phase::SectorValueChain, "SectorObjective", "SectorPolicyTool", "REALIZED_VIA", "L1", "L1"),
    (Phase::SectorValueChain, "SectorPolicyTool", "SectorAdminRecord", "REFERS_TO", "L1", "L1"),
    (Phase::SectorValueChain, "SectorAdminRecord", "SectorBusiness", "APPLIED_ON", "L1", "L1"),
    (Phase::SectorValueChain, "SectorAdminRecord", "SectorCitizen", "APPLIED_ON", "L1", "L1"),
    (Phase::SectorValueChain, "SectorAdminRecord", "SectorGovEntity", "APPLIED_ON", "L1", "L1"),
    (Phase::SectorValueChain, "SectorBusiness", "SectorDataTransaction", "TRIGGERS_EVENT", "L1", "L1"),
    (Phase::SectorValueChain, "SectorCitizen", "SectorDataTransaction", "TRIGGERS_EVENT", "L1", "L1"),
    (Phase::SectorValueChain, "SectorGovEntity", "SectorDataTransaction", "TRIGGERS_EVENT", "L1", "L1"),
    (Phase::SectorValueChain, "SectorDataTransaction", "SectorPerformance", "MEASURED_BY", "L1", "L1"),
    (Phase::SectorValueChain, "SectorPerformance", "SectorObjective", "AGGREGATES_TO", "L1", "L1"),
    (Phase::StrategicInitiatives, "SectorPolicyTool", "EntityCapability", "SETS_PRIORITIES", "L1", "L1"),
    (Phase::StrategicInitiatives, "EntityCapability", "EntityOrgUnit", "ROLE_GAPS", "L3", "L3"),
    (Phase::StrategicInitiatives, "EntityCapability", "EntityProcess", "KNOWLEDGE_GAPS", "L3", "L3"),
    (Phase::StrategicInitiatives, "EntityCapability", "EntityITSystem", "AUTOMATION_GAPS", "L3", "L3"),
    (Phase::StrategicInitiatives, "EntityOrgUnit", "EntityProject", "GAPS_SCOPE", "L3", "L3"),
    (Phase::StrategicInitiatives, "EntityProcess", "EntityProject", "GAPS_SCOPE", "L3", "L3"),
    (Phase::StrategicInitiatives, "EntityITSystem", "EntityProject", "GAPS_SCOPE", "L3", "L3"),
    (Phase::StrategicInitiatives, "EntityProject", "EntityChangeAdoption", "ADOPTION_RISKS", "L3", "L3"),
    (Phase::StrategicPriorities, "SectorObjective", "SectorPerformance", "CASCADED_VIA", "L1", "L1"),
    (Phase::StrategicPriorities, "SectorPerformance", "EntityCapability", "SETS_TARGETS", "L2", "L2"),
    (Phase::StrategicPriorities, "SectorPerformance", "EntityCapability", "SETS_TARGETS", "L1", "L1"),
    (Phase::StrategicPriorities, "SectorPerformance", "EntityCapability", "SETS_TARGETS", "L3", "L3"),
    (Phase::BuildOversight, "EntityChangeAdoption", "EntityProject", "INCREASE_ADOPTION", "L3", "L3"),
    (Phase::BuildOversight, "EntityProject", "EntityOrgUnit", "CLOSE_GAPS", "L3", "L3"),
    (Phase::BuildOversight, "EntityProject", "EntityProcess", "CLOSE_GAPS", "L3", "L3"),
    (Phase::BuildOversight, "EntityProject", "EntityITSystem", "CLOSE_GAPS", "L3", "L3"),
    (Phase::BuildOversight, "EntityCapability", "EntityRisk", "MONITORED_BY", "L3", "L3"),
    (Phase::BuildOversight, "EntityRisk", "SectorPolicyTool", "INFORMS", "L2", "L2"),
    (Phase::BuildOversight, "EntityRisk", "SectorPerformance", "INFORMS", "L2", "L2"),
    (Phase::BuildOversight, "SectorPolicyTool", "SectorObjective", "GOVERNED_BY", "L1", "L1"),
    (Phase::SustainableOperations, "EntityCultureHealth", "EntityOrgUnit", "MONITORS_FOR", "L3", "L3"),
    (Phase::SustainableOperations, "EntityOrgUnit", "EntityProcess", "APPLY", "L3", "L3"),
    (Phase::SustainableOperations, "EntityProcess", "EntityITSystem", "AUTOMATION", "L3", "L3"),
    (Phase::SustainableOperations, "EntityITSystem", "EntityVendor", "DEPENDS_ON", "L3", "L3"),
];

/// Build the relationship catalog, resolving each spec's starting threshold
/// through `threshold_for`.
pub fn relationship_catalog(threshold_for: impl Fn(&str) -> f64) -> Vec<RelationshipSpec> {
    RELATIONSHIPS
        .iter()
        .map(|&(phase, source, target, rel, source_level, target_level)| RelationshipSpec {
            phase,
            source_label: source.to_string(),
            target_label: target.to_string(),
            rel_type: rel.to_string(),
            source_level: source_level.to_string(),
            target_level: target_level.to_string(),
            initial_threshold: threshold_for(rel),
        })
        .collect()
}

/// Every label that participates in the relationship catalog, sorted and unique.
pub fn catalog_labels() -> Vec<&'static str> {
    let mut labels: Vec<&'static str> = RELATIONSHIPS
        .iter()
        .flat_map(|&(_, source, target, ..)| [source, target])
        .collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

// --- Audit assertions ---

/// An expected link checked by the orphan/bastard audit.
///
/// A source node is an orphan when it has no outgoing edge of any of
/// `rel_types` to a node carrying one of `target_labels` at `target_level`.
/// A target node is a bastard when the mirror condition holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkAssertion {
    /// Short code of the domain chain, e.g. `SVC`.
    pub chain: &'static str,
    pub description: &'static str,
    pub source_labels: &'static [&'static str],
    pub target_labels: &'static [&'static str],
    pub rel_types: &'static [&'static str],
    pub source_level: &'static str,
    pub target_level: &'static str,
}

const STAKEHOLDERS: &[&str] = &["SectorBusiness", "SectorCitizen", "SectorGovEntity"];
const GAP_NODES: &[&str] = &["EntityOrgUnit", "EntityProcess", "EntityITSystem"];
const GAP_RELS: &[&str] = &["ROLE_GAPS", "KNOWLEDGE_GAPS", "AUTOMATION_GAPS"];

const fn link(
    chain: &'static str,
    description: &'static str,
    source_labels: &'static [&'static str],
    rel_types: &'static [&'static str],
    target_labels: &'static [&'static str],
    source_level: &'static str,
    target_level: &'static str,
) -> LinkAssertion {
    LinkAssertion {
        chain,
        description,
        source_labels,
        target_labels,
        rel_types,
        source_level,
        target_level,
    }
}

pub const AUDIT_LINKS: &[LinkAssertion] = &[
    // Sector value chain
    link("SVC", "Objective L1 -REALIZED_VIA-> PolicyTool L1", &["SectorObjective"], &["REALIZED_VIA"], &["SectorPolicyTool"], "L1", "L1"),
    link("SVC", "PolicyTool L1 -REFERS_TO-> AdminRecord L1", &["SectorPolicyTool"], &["REFERS_TO"], &["SectorAdminRecord"], "L1", "L1"),
    link("SVC", "AdminRecord L1 -APPLIED_ON-> Stakeholder L1", &["SectorAdminRecord"], &["APPLIED_ON"], STAKEHOLDERS, "L1", "L1"),
    link("SVC", "Stakeholder L1 -TRIGGERS_EVENT-> DataTx L1", STAKEHOLDERS, &["TRIGGERS_EVENT"], &["SectorDataTransaction"], "L1", "L1"),
    link("SVC", "DataTx L1 -MEASURED_BY-> Performance L1", &["SectorDataTransaction"], &["MEASURED_BY"], &["SectorPerformance"], "L1", "L1"),
    link("SVC", "Performance L1 -AGGREGATES_TO-> Objective L1", &["SectorPerformance"], &["AGGREGATES_TO"], &["SectorObjective"], "L1", "L1"),
    // Strategic initiatives
    link("SSI", "PolicyTool L1 -PARENT_OF-> PolicyTool L2", &["SectorPolicyTool"], &["PARENT_OF"], &["SectorPolicyTool"], "L1", "L2"),
    link("SSI", "PolicyTool L2 -SETS_PRIORITIES-> Capability L2", &["SectorPolicyTool"], &["SETS_PRIORITIES"], &["EntityCapability"], "L2", "L2"),
    link("SSI", "Capability L2 -PARENT_OF-> Capability L3", &["EntityCapability"], &["PARENT_OF"], &["EntityCapability"], "L2", "L3"),
    link("SSI", "Cap L3 -GAPS-> OrgUnit/Process/IT L3", &["EntityCapability"], GAP_RELS, GAP_NODES, "L3", "L3"),
    link("SSI", "Gap L3 -GAPS_SCOPE-> Project L3", GAP_NODES, &["GAPS_SCOPE"], &["EntityProject"], "L3", "L3"),
    link("SSI", "Project L3 -ADOPTION_RISKS-> ChangeAdopt L3", &["EntityProject"], &["ADOPTION_RISKS"], &["EntityChangeAdoption"], "L3", "L3"),
    // Strategic priorities
    link("SSP", "Objective L1 -CASCADED_VIA-> Performance L1", &["SectorObjective"], &["CASCADED_VIA"], &["SectorPerformance"], "L1", "L1"),
    link("SSP", "Performance L1 -PARENT_OF-> Performance L2", &["SectorPerformance"], &["PARENT_OF"], &["SectorPerformance"], "L1", "L2"),
    link("SSP", "Performance L2 -SETS_TARGETS-> Capability L2", &["SectorPerformance"], &["SETS_TARGETS"], &["EntityCapability"], "L2", "L2"),
    // Build oversight
    link("BO", "ChangeAdopt L3 -INCREASE_ADOPTION-> Project L3", &["EntityChangeAdoption"], &["INCREASE_ADOPTION"], &["EntityProject"], "L3", "L3"),
    link("BO", "Project L3 -CLOSE_GAPS-> Gap L3", &["EntityProject"], &["CLOSE_GAPS"], GAP_NODES, "L3", "L3"),
    link("BO", "Gap L3 -GAP_STATUS-> Capability L3", GAP_NODES, &["GAP_STATUS"], &["EntityCapability"], "L3", "L3"),
    link("BO", "Capability L3 -MONITORED_BY-> Risk L3", &["EntityCapability"], &["MONITORED_BY"], &["EntityRisk"], "L3", "L3"),
    link("BO", "Risk L2 -PARENT_OF-> Risk L3", &["EntityRisk"], &["PARENT_OF"], &["EntityRisk"], "L2", "L3"),
    link("BO", "Risk L2 -INFORMS-> PolicyTool L2", &["EntityRisk"], &["INFORMS"], &["SectorPolicyTool"], "L2", "L2"),
    link("BO", "PolicyTool L1 -GOVERNED_BY-> Objective L1", &["SectorPolicyTool"], &["GOVERNED_BY"], &["SectorObjective"], "L1", "L1"),
    // Operate oversight
    link("OO", "Capability L3 -MONITORED_BY-> Risk L3", &["EntityCapability"], &["MONITORED_BY"], &["EntityRisk"], "L3", "L3"),
    link("OO", "Risk L2 -PARENT_OF-> Risk L3", &["EntityRisk"], &["PARENT_OF"], &["EntityRisk"], "L2", "L3"),
    link("OO", "Risk L2 -INFORMS-> Performance L2", &["EntityRisk"], &["INFORMS"], &["SectorPerformance"], "L2", "L2"),
    link("OO", "Performance L1 -PARENT_OF-> Performance L2", &["SectorPerformance"], &["PARENT_OF"], &["SectorPerformance"], "L1", "L2"),
    link("OO", "Performance L1 -AGGREGATES_TO-> Objective L1", &["SectorPerformance"], &["AGGREGATES_TO"], &["SectorObjective"], "L1", "L1"),
    // Sustainable operations
    link("SO", "CultureHealth L3 -MONITORS_FOR-> OrgUnit L3", &["EntityCultureHealth"], &["MONITORS_FOR"], &["EntityOrgUnit"], "L3", "L3"),
    link("SO", "OrgUnit L3 -APPLY-> Process L3", &["EntityOrgUnit"], &["APPLY"], &["EntityProcess"], "L3", "L3"),
    link("SO", "Process L3 -AUTOMATION-> ITSystem L3", &["EntityProcess"], &["AUTOMATION"], &["EntityITSystem"], "L3", "L3"),
    link("SO", "ITSystem L3 -DEPENDS_ON-> Vendor L3", &["EntityITSystem"], &["DEPENDS_ON"], &["EntityVendor"], "L3", "L3"),
    // Integrated oversight
    link("IO", "PolicyTool L2 -SETS_PRIORITIES-> Capability L2", &["SectorPolicyTool"], &["SETS_PRIORITIES"], &["EntityCapability"], "L2", "L2"),
    link("IO", "Cap L3 -GAPS-> OrgUnit/Process/IT L3", &["EntityCapability"], GAP_RELS, GAP_NODES, "L3", "L3"),
    link("IO", "Risk L3 -MONITORED_BY-> Cap L3", &["EntityRisk"], &["MONITORED_BY"], &["EntityCapability"], "L3", "L3"),
    link("IO", "Risk L2 -PARENT_OF-> Risk L3", &["EntityRisk"], &["PARENT_OF"], &["EntityRisk"], "L2", "L3"),
    link("IO", "Risk L2 -INFORMS-> Performance L2", &["EntityRisk"], &["INFORMS"], &["SectorPerformance"], "L2", "L2"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::cypher_identifier;

    #[test]
    fn catalog_uses_tuned_thresholds() {
        let specs = relationship_catalog(default_threshold);
        assert_eq!(specs.len(), RELATIONSHIPS.len());

        let refers = specs.iter().find(|s| s.rel_type == "REFERS_TO").unwrap();
        assert_eq!(refers.initial_threshold, 0.40);
        let triggers = specs.iter().find(|s| s.rel_type == "TRIGGERS_EVENT").unwrap();
        assert_eq!(triggers.initial_threshold, 0.60);
    }

    #[test]
    fn unknown_rel_type_falls_back_to_default() {
        assert_eq!(default_threshold("NOT_A_REL"), DEFAULT_THRESHOLD);
    }

    #[test]
    fn every_catalog_identifier_is_cypher_safe() {
        for spec in relationship_catalog(default_threshold) {
            cypher_identifier(&spec.source_label).unwrap();
            cypher_identifier(&spec.target_label).unwrap();
            cypher_identifier(&spec.rel_type).unwrap();
        }
        for link in AUDIT_LINKS {
            for id in link.source_labels.iter().chain(link.target_labels).chain(link.rel_types) {
                cypher_identifier(id).unwrap();
            }
        }
    }

    #[test]
    fn ladder_is_descending_and_ends_at_floor() {
        assert!(DEFAULT_LADDER.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(DEFAULT_LADDER.last().copied(), Some(DEFAULT_FLOOR));
    }

    #[test]
    fn catalog_labels_are_unique() {
        let labels = catalog_labels();
        assert!(labels.contains(&"EntityVendor"));
        assert!(labels.windows(2).all(|w| w[0] < w[1]));
    }
}
