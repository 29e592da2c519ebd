use anyhow::{anyhow, Context, Result};
use graph_contract::{
    mermaid, GraphContext, GraphPlugin, MergeStrategy, MermaidOptions, SourceRef,
};
use graph_memory_store::{MemoryGraphStore, MemoryStoreConfig};
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

fn load(path: &Path) -> Result<GraphContext> {
    GraphContext::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Pretty JSON for stdout, or write to `out` and return nothing
fn emit(ctx: &GraphContext, out: Option<&Path>) -> Result<String> {
    let bytes = ctx.to_pretty_bytes()?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
            Ok(String::new())
        }
        None => Ok(String::from_utf8(bytes)?),
    }
}

pub fn validate(path: &Path) -> Result<String> {
    let ctx = load(path)?;
    Ok(format!(
        "ok: {} nodes, {} edges",
        ctx.node_count(),
        ctx.edge_count()
    ))
}

pub fn inspect(path: &Path) -> Result<String> {
    let ctx = load(path)?;
    let node_ids: HashSet<&str> = ctx.nodes().iter().map(|n| n.id()).collect();
    let dangling = ctx
        .edges()
        .iter()
        .filter(|e| !node_ids.contains(e.source_id()) || !node_ids.contains(e.target_id()))
        .count();
    let sources: HashSet<&SourceRef> = ctx.nodes().iter().flat_map(|n| n.sources()).collect();

    let summary = json!({
        "nodes": ctx.node_count(),
        "edges": ctx.edge_count(),
        "labels": ctx.labels(),
        "relation_types": ctx.relation_types(),
        "distinct_sources": sources.len(),
        "dangling_edges": dangling,
        "metadata": ctx.metadata(),
    });
    Ok(serde_json::to_string_pretty(&summary)?)
}

pub fn render(path: &Path, direction: &str, colors: &[String], name_property: &str) -> Result<String> {
    let ctx = load(path)?;
    let mut options = MermaidOptions::new(direction.parse()?).with_name_property(name_property);
    for pair in colors {
        let (label, color) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid --color '{pair}', expected LABEL=COLOR"))?;
        options = options.with_color(label.trim(), color.trim());
    }
    Ok(mermaid::render(&ctx, &options)?)
}

pub fn subgraph(
    path: &Path,
    node_id: &str,
    depth: usize,
    labels: &[String],
    out: Option<&Path>,
) -> Result<String> {
    let ctx = load(path)?;
    let store = MemoryGraphStore::with_config(MemoryStoreConfig::default())?;
    store.import_graph(&ctx, MergeStrategy::Overwrite)?;

    if store.get_node(node_id)?.is_none() {
        return Err(anyhow!("Node '{node_id}' not found in {}", path.display()));
    }

    let filter = (!labels.is_empty()).then_some(labels);
    let sub = store.get_context(node_id, depth, filter)?;
    log::debug!(
        "Subgraph of {node_id} at depth {depth}: {} nodes, {} edges",
        sub.node_count(),
        sub.edge_count()
    );
    emit(&sub, out)
}

pub fn merge(files: &[PathBuf], strategy: MergeStrategy, out: Option<&Path>) -> Result<String> {
    let store = MemoryGraphStore::with_config(MemoryStoreConfig::default())?;
    for path in files {
        let ctx = load(path)?;
        let summary = store
            .import_graph(&ctx, strategy)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        log::info!("{}: {}", path.display(), summary.to_json()?);
    }

    let merged = store
        .export_graph(None)?
        .with_metadata("merge_strategy", strategy.as_str())
        .with_metadata("merged_files", files.len());
    emit(&merged, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_contract::{GraphEdge, GraphNode};
    use tempfile::tempdir;

    fn write_sample(dir: &Path) -> PathBuf {
        let ctx = GraphContext::new(
            vec![
                GraphNode::new("a", "Person")
                    .unwrap()
                    .with_property("name", "Sun Tzu")
                    .with_source(SourceRef::new("asr", "t", "r", "s")),
                GraphNode::new("b", "Concept").unwrap(),
            ],
            vec![
                GraphEdge::new("ab", "a", "b", "AUTHORED").unwrap(),
                GraphEdge::new("ax", "a", "x", "MENTIONS").unwrap(),
            ],
        )
        .unwrap();
        let path = dir.join("sample.json");
        ctx.write_to(&path).unwrap();
        path
    }

    #[test]
    fn inspect_counts_dangling_edges() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        let summary: serde_json::Value = serde_json::from_str(&inspect(&path).unwrap()).unwrap();
        assert_eq!(summary["nodes"], 2);
        assert_eq!(summary["dangling_edges"], 1);
        assert_eq!(summary["distinct_sources"], 1);
        assert_eq!(summary["labels"], json!(["Person", "Concept"]));
    }

    #[test]
    fn render_rejects_malformed_colour_pair() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        assert!(render(&path, "LR", &["Person".to_string()], "name").is_err());
        let text = render(&path, "LR", &["Person=#f9f".to_string()], "name").unwrap();
        assert!(text.contains("classDef cls_Person fill:#f9f"));
    }

    #[test]
    fn subgraph_of_unknown_node_fails() {
        let dir = tempdir().unwrap();
        let path = write_sample(dir.path());
        assert!(subgraph(&path, "zz", 1, &[], None).is_err());
    }
}
