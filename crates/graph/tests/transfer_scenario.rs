use graph_contract::{
    mermaid, GraphContext, GraphEdge, GraphNode, MermaidOptions, FlowDirection, SourceRef,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;

const NODE_A: &str = "2f0c7a4e-8d61-4c0b-9a57-0d3e1c9b7f21";
const NODE_B: &str = "9b1d5e32-47aa-4f8e-b6c3-5e2a7d0f1c84";
const EDGE: &str = "c4e8f1a0-3b27-4d96-8e15-a7f2c0d9b363";
const ROW: &str = "71a3d9c2-e5b4-4f07-9c68-2b1e0a5f3d97";

fn build_context() -> GraphContext {
    let source = SourceRef::new(
        "cjm-transcription-plugin-voxtral-hf",
        "transcriptions",
        ROW,
        "timestamp:00:10-00:20",
    );

    let node_a = GraphNode::new(NODE_A, "Person")
        .expect("valid node")
        .with_property("name", "Sun Tzu")
        .with_property("era", "Ancient China")
        .with_source(source);

    let node_b = GraphNode::new(NODE_B, "Concept")
        .expect("valid node")
        .with_property("name", "The Art of War")
        .with_property("importance", "Vital");

    let edge = GraphEdge::new(EDGE, NODE_A, NODE_B, "AUTHORED")
        .expect("valid edge")
        .with_property("confidence", 1.0);

    GraphContext::new(vec![node_a, node_b], vec![edge])
        .expect("unique ids")
        .with_metadata("created_by", "test_script")
}

#[test]
fn temp_file_round_trip_and_diagram() {
    let original = build_context();

    let file = original.to_temp_file().expect("temp file");

    let raw: Value = serde_json::from_slice(&fs::read(file.path()).unwrap()).unwrap();
    assert_eq!(raw["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(raw["edges"].as_array().map(Vec::len), Some(1));

    let loaded = GraphContext::from_file(file.path()).expect("load");
    assert_eq!(loaded.node_count(), original.node_count());
    assert_eq!(loaded.edge_count(), 1);

    let loaded_a = loaded.node(NODE_A).expect("node a present");
    assert_eq!(loaded_a.label(), "Person");
    assert_eq!(loaded_a.property("name"), Some(&json!("Sun Tzu")));
    assert_eq!(loaded_a.sources().len(), 1);

    let loaded_ref = &loaded_a.sources()[0];
    assert_eq!(loaded_ref.plugin_name(), "cjm-transcription-plugin-voxtral-hf");
    assert_eq!(loaded_ref.segment_slice(), "timestamp:00:10-00:20");

    let loaded_edge = &loaded.edges()[0];
    assert_eq!(loaded_edge.source_id(), NODE_A);
    assert_eq!(loaded_edge.target_id(), NODE_B);
    assert_eq!(loaded_edge.relation_type(), "AUTHORED");

    assert_eq!(loaded, original);

    let diagram = mermaid::context_to_mermaid(&loaded, "LR", None).expect("render");
    assert!(diagram.contains("graph LR"));
    assert!(diagram.contains("Sun Tzu"));
    assert!(diagram.contains("|AUTHORED|"));

    file.cleanup().expect("cleanup");
}

#[test]
fn order_survives_round_trip() {
    let nodes: Vec<GraphNode> = (0..20)
        .rev()
        .map(|i| GraphNode::new(format!("node-{i:02}"), "Item").unwrap().with_property("rank", i))
        .collect();
    let edges: Vec<GraphEdge> = (1..20)
        .map(|i| {
            GraphEdge::new(
                format!("edge-{i:02}"),
                format!("node-{i:02}"),
                format!("node-{:02}", i - 1),
                "NEXT",
            )
            .unwrap()
        })
        .collect();
    let ctx = GraphContext::new(nodes, edges).unwrap();

    let copy = GraphContext::from_bytes(&ctx.to_pretty_bytes().unwrap()).unwrap();

    let ids = |c: &GraphContext| c.nodes().iter().map(|n| n.id().to_string()).collect::<Vec<_>>();
    assert_eq!(ids(&copy), ids(&ctx));
    assert_eq!(copy.nodes()[0].id(), "node-19");
    assert_eq!(copy, ctx);
}

#[test]
fn rendering_does_not_touch_the_context() {
    let ctx = build_context();
    let before = ctx.to_bytes().unwrap();

    let mut colors = BTreeMap::new();
    colors.insert("Person".to_string(), "#f9f".to_string());
    let options = MermaidOptions {
        direction: FlowDirection::LeftRight,
        node_colors: colors,
        ..Default::default()
    };
    let first = mermaid::render(&ctx, &options).unwrap();
    let second = mermaid::render(&ctx, &options).unwrap();

    assert_eq!(first, second);
    assert_eq!(ctx.to_bytes().unwrap(), before);
}
