use std::sync::Arc;

use gapfill_common::{EmbeddedNode, MatchingConfig, PassType, Phase, RelationshipSpec};
use gapfill_engine::{plan, GapFiller, RelationshipPersister, Stage};
use gapfill_graph::memory::MemoryGraph;
use gapfill_graph::RelationshipStore;

fn node(label: &str, id: &str, year: i64, level: &str, embedding: &[f64]) -> EmbeddedNode {
    EmbeddedNode {
        label: label.to_string(),
        id: id.to_string(),
        name: format!("{label} {id}"),
        year,
        level: level.to_string(),
        embedding: embedding.to_vec(),
    }
}

fn spec(source: &str, target: &str, rel: &str, threshold: f64) -> RelationshipSpec {
    RelationshipSpec {
        phase: Phase::SectorValueChain,
        source_label: source.to_string(),
        target_label: target.to_string(),
        rel_type: rel.to_string(),
        source_level: "L1".to_string(),
        target_level: "L1".to_string(),
        initial_threshold: threshold,
    }
}

fn matching() -> MatchingConfig {
    MatchingConfig {
        ladder: vec![0.5, 0.4, 0.3, 0.2],
        floor: 0.2,
        ..Default::default()
    }
}

fn objectives_and_tools() -> Arc<MemoryGraph> {
    let graph = MemoryGraph::new();
    graph.add_node(node("SectorObjective", "A", 2025, "L1", &[1.0, 0.0]));
    graph.add_node(node("SectorObjective", "B", 2025, "L1", &[0.0, 1.0]));
    graph.add_node(node("SectorPolicyTool", "X", 2025, "L1", &[1.0, 0.0]));
    graph.add_node(node("SectorPolicyTool", "Y", 2025, "L1", &[0.0, 1.0]));
    Arc::new(graph)
}

#[tokio::test]
async fn exact_matches_need_no_relaxation() {
    let graph = objectives_and_tools();
    let filler = GapFiller::new(graph.clone(), &matching());
    let spec = spec("SectorObjective", "SectorPolicyTool", "REALIZED_VIA", 0.9);

    let outcome = filler.process_spec(&spec, 2025).await.unwrap();

    assert_eq!(outcome.forward_matches, 2);
    assert_eq!(outcome.backward_matches, 2);
    assert_eq!(outcome.orphans, 0);
    assert_eq!(outcome.bastards, 0);
    assert_eq!(outcome.adaptive_matches, 0);

    let pairs: Vec<_> = outcome
        .connections
        .iter()
        .map(|c| (c.source_id.as_str(), c.target_id.as_str(), c.similarity))
        .collect();
    assert_eq!(pairs, vec![("A", "X", 1.0), ("B", "Y", 1.0)]);
    // Forward candidates are seen first and equal scores keep the first.
    assert!(outcome.connections.iter().all(|c| c.pass_type == PassType::Forward));
    assert!(outcome.persisted.is_none());
}

#[tokio::test]
async fn stages_run_in_order_and_persist_only_when_configured() {
    let graph = objectives_and_tools();
    let spec = spec("SectorObjective", "SectorPolicyTool", "REALIZED_VIA", 0.9);

    let dry = GapFiller::new(graph.clone(), &matching());
    let outcome = dry.process_spec(&spec, 2025).await.unwrap();
    assert_eq!(
        outcome.stages,
        vec![
            Stage::Init,
            Stage::ForwardPass,
            Stage::BackwardPass,
            Stage::OrphanResolution,
            Stage::BastardResolution,
            Stage::Deduplicate,
            Stage::Done,
        ]
    );

    let store: Arc<dyn RelationshipStore> = graph.clone();
    let wet = GapFiller::new(graph.clone(), &matching())
        .with_persister(Arc::new(RelationshipPersister::new(store, 4, 500)));
    let outcome = wet.process_spec(&spec, 2025).await.unwrap();
    assert!(outcome.stages.contains(&Stage::Persist));
    let stats = outcome.persisted.unwrap();
    assert_eq!((stats.created, stats.failed), (2, 0));
    assert_eq!(graph.gap_filled_count(), 2);
}

#[tokio::test]
async fn orthogonal_orphan_is_reported_not_failed() {
    let graph = MemoryGraph::new();
    graph.add_node(node("SectorObjective", "C", 2025, "L1", &[1.0, 0.0]));
    graph.add_node(node("SectorPolicyTool", "X", 2025, "L1", &[0.0, 1.0]));
    let filler = GapFiller::new(Arc::new(graph), &matching());

    let outcome = filler
        .process_spec(&spec("SectorObjective", "SectorPolicyTool", "REALIZED_VIA", 0.5), 2025)
        .await
        .unwrap();

    assert!(outcome.connections.is_empty());
    assert_eq!(outcome.unresolved_orphans.len(), 1);
    assert_eq!(outcome.unresolved_orphans[0].id, "C");
    assert_eq!(outcome.unresolved_bastards.len(), 1);
    assert_eq!(outcome.unresolved_bastards[0].id, "X");
}

#[tokio::test]
async fn relaxed_matches_carry_the_ladder_step() {
    let graph = MemoryGraph::new();
    graph.add_node(node("SectorObjective", "A", 2025, "L1", &[1.0, 0.0]));
    // cos(A, X) = 0.35
    graph.add_node(node("SectorPolicyTool", "X", 2025, "L1", &[0.35, (1.0f64 - 0.35 * 0.35).sqrt()]));
    let filler = GapFiller::new(Arc::new(graph), &matching());

    let outcome = filler
        .process_spec(&spec("SectorObjective", "SectorPolicyTool", "REALIZED_VIA", 0.6), 2025)
        .await
        .unwrap();

    assert_eq!(outcome.orphans, 1);
    assert_eq!(outcome.bastards, 1);
    assert_eq!(outcome.adaptive_matches, 2);
    // Both adaptive passes found the same pair; dedup leaves one.
    assert_eq!(outcome.connections.len(), 1);
    let c = &outcome.connections[0];
    assert_eq!(c.pass_type, PassType::ForwardAdaptive);
    assert_eq!(c.threshold_used, 0.3);
    assert!(outcome.unresolved_orphans.is_empty());
}

#[tokio::test]
async fn matching_is_scoped_to_year_and_level() {
    let graph = MemoryGraph::new();
    graph.add_node(node("SectorObjective", "A", 2025, "L1", &[1.0, 0.0]));
    graph.add_node(node("SectorPolicyTool", "X26", 2026, "L1", &[1.0, 0.0]));
    graph.add_node(node("SectorPolicyTool", "XL2", 2025, "L2", &[1.0, 0.0]));
    let filler = GapFiller::new(Arc::new(graph), &matching());

    let outcome = filler
        .process_spec(&spec("SectorObjective", "SectorPolicyTool", "REALIZED_VIA", 0.5), 2025)
        .await
        .unwrap();
    assert_eq!(outcome.targets, 0);
    assert!(outcome.connections.is_empty());
}

#[tokio::test]
async fn reflexive_spec_fetches_once_and_never_self_links() {
    let graph = Arc::new(MemoryGraph::new());
    graph.add_node(node("EntityCapability", "C1", 2025, "L1", &[1.0, 0.1]));
    graph.add_node(node("EntityCapability", "C2", 2025, "L1", &[0.9, 0.2]));
    let filler = GapFiller::new(graph.clone(), &matching());

    let outcome = filler
        .process_spec(&spec("EntityCapability", "EntityCapability", "ROLE_COLLABORATION", 0.5), 2025)
        .await
        .unwrap();

    assert_eq!(graph.fetch_count(), 1);
    assert!(!outcome.connections.is_empty());
    assert!(outcome.connections.iter().all(|c| c.source_id != c.target_id));
}

#[tokio::test]
async fn strict_mode_reports_invalid_embeddings_separately() {
    let graph = MemoryGraph::new();
    graph.add_node(node("SectorObjective", "A", 2025, "L1", &[1.0, 0.0]));
    graph.add_node(node("SectorObjective", "Zero", 2025, "L1", &[0.0, 0.0]));
    graph.add_node(node("SectorObjective", "Short", 2025, "L1", &[1.0]));
    graph.add_node(node("SectorPolicyTool", "X", 2025, "L1", &[1.0, 0.0]));
    let graph = Arc::new(graph);
    let spec = spec("SectorObjective", "SectorPolicyTool", "REALIZED_VIA", 0.5);

    let lenient = GapFiller::new(graph.clone(), &matching());
    let outcome = lenient.process_spec(&spec, 2025).await.unwrap();
    assert!(outcome.invalid.is_empty());
    assert_eq!(outcome.unresolved_orphans.len(), 2);

    let strict = MatchingConfig {
        strict_embeddings: true,
        dimensions: Some(2),
        ..matching()
    };
    let outcome = GapFiller::new(graph, &strict).process_spec(&spec, 2025).await.unwrap();
    let mut invalid: Vec<_> = outcome.invalid.iter().map(|i| i.node.id.as_str()).collect();
    invalid.sort();
    assert_eq!(invalid, vec!["Short", "Zero"]);
    assert!(outcome.unresolved_orphans.is_empty());
    assert_eq!(outcome.sources, 1);
    assert_eq!(outcome.connections.len(), 1);
}

#[tokio::test]
async fn concurrent_run_returns_outcomes_in_plan_order() {
    let graph = MemoryGraph::new();
    for year in [2025, 2026] {
        graph.add_node(node("SectorObjective", "A", year, "L1", &[1.0, 0.0]));
        graph.add_node(node("SectorPolicyTool", "X", year, "L1", &[1.0, 0.0]));
        graph.add_node(node("SectorAdminRecord", "R", year, "L1", &[0.9, 0.1]));
    }
    let graph = Arc::new(graph);
    let catalog = vec![
        spec("SectorObjective", "SectorPolicyTool", "REALIZED_VIA", 0.5),
        spec("SectorPolicyTool", "SectorAdminRecord", "REFERS_TO", 0.5),
    ];
    let tasks = plan(&catalog, &[2025, 2026], &[]);

    let sequential = GapFiller::new(graph.clone(), &matching())
        .run(tasks.clone(), 1)
        .await
        .unwrap();
    let concurrent = GapFiller::new(graph, &matching()).run(tasks, 4).await.unwrap();

    let key = |o: &gapfill_engine::SpecOutcome| (o.spec.rel_type.clone(), o.year, o.connections.clone());
    assert_eq!(
        sequential.iter().map(key).collect::<Vec<_>>(),
        concurrent.iter().map(key).collect::<Vec<_>>()
    );
    assert_eq!(
        sequential.iter().map(|o| o.year).collect::<Vec<_>>(),
        vec![2025, 2025, 2026, 2026]
    );
}
