//! Durable byte form of a [`GraphContext`] and file-based hand-off between
//! processes that cannot share memory.
//!
//! The encoding is a UTF-8 JSON object with the keys `nodes`, `edges` and
//! `metadata`. Every record key is always written, empty containers included,
//! so readers see one stable schema.

use crate::context::GraphContext;
use crate::error::{GraphError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const TEMP_PREFIX: &str = "graph-context-";
const TEMP_SUFFIX: &str = ".json";

impl GraphContext {
    /// Compact JSON encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Indented JSON encoding, same schema as [`GraphContext::to_bytes`]
    pub fn to_pretty_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode a context produced by [`GraphContext::to_bytes`].
    ///
    /// Fails with a deserialization error when `nodes` or `edges` is missing,
    /// when a record lacks a required field, or when a record breaks an
    /// invariant (empty id, duplicate id). Unknown keys are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| GraphError::deserialization(e.to_string()))
    }

    /// Write the compact encoding to `path`, replacing any existing file
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = fs::File::create(path)?;
        file.write_all(&self.to_bytes()?)?;
        file.sync_all()?;
        log::debug!(
            "Wrote graph context ({} nodes, {} edges) to {}",
            self.node_count(),
            self.edge_count(),
            path.display()
        );
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let ctx = Self::from_bytes(&bytes)?;
        log::debug!(
            "Loaded graph context ({} nodes, {} edges) from {}",
            ctx.node_count(),
            ctx.edge_count(),
            path.display()
        );
        Ok(ctx)
    }

    /// Write the context to a fresh temp file and hand back its path.
    ///
    /// The file is fully written and closed before this returns. The caller owns
    /// it: nothing here deletes it, use [`TransferFile::cleanup`] or prefer
    /// [`GraphContext::with_temp_file`].
    pub fn to_temp_file(&self) -> Result<TransferFile> {
        let file = self.write_named_temp()?;
        let (handle, path) = file.keep().map_err(|e| GraphError::Io(e.error))?;
        drop(handle);
        log::debug!("Graph context handed off via {}", path.display());
        Ok(TransferFile { path })
    }

    /// Scoped variant of [`GraphContext::to_temp_file`].
    ///
    /// The temp file exists only while `f` runs and is removed on every exit
    /// path, including an error from `f` or a panic.
    pub fn with_temp_file<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Path) -> std::result::Result<T, E>,
        E: From<GraphError>,
    {
        let temp_path = self.write_named_temp()?.into_temp_path();
        let result = f(&temp_path);
        if let Err(err) = temp_path.close() {
            log::warn!("Failed to remove graph context temp file: {err}");
        }
        result
    }

    fn write_named_temp(&self) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile()?;
        file.write_all(&self.to_bytes()?)?;
        file.flush()?;
        file.as_file().sync_all()?;
        Ok(file)
    }
}

/// Caller-owned transfer file produced by [`GraphContext::to_temp_file`].
///
/// Dropping the handle leaves the file in place, so the path can outlive this
/// process. Call [`TransferFile::cleanup`] once the consumer is done.
#[derive(Debug)]
pub struct TransferFile {
    path: PathBuf,
}

impl TransferFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Give up the cleanup obligation and keep only the path
    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Load the context back from this file
    pub fn load(&self) -> Result<GraphContext> {
        GraphContext::from_file(&self.path)
    }

    /// Remove the file. A file already removed by someone else is not an error.
    pub fn cleanup(self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{GraphEdge, GraphNode, SourceRef};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> GraphContext {
        let a = GraphNode::new("a", "Person")
            .unwrap()
            .with_property("name", "Sun Tzu")
            .with_property("tags", json!(["strategist", {"nested": true}]))
            .with_source(SourceRef::new("asr", "transcriptions", "r1", "timestamp:00:10-00:20"));
        let b = GraphNode::new("b", "Concept").unwrap();
        let e = GraphEdge::new("e1", "a", "b", "AUTHORED")
            .unwrap()
            .with_property("confidence", 1.0);
        GraphContext::new(vec![a, b], vec![e])
            .unwrap()
            .with_metadata("created_by", "unit-test")
    }

    #[test]
    fn bytes_round_trip_preserves_everything() {
        let ctx = sample();
        let loaded = GraphContext::from_bytes(&ctx.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded, ctx);
    }

    #[test]
    fn encoding_always_writes_every_key() {
        let ctx = GraphContext::new(vec![GraphNode::new("x", "Thing").unwrap()], vec![]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&ctx.to_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "nodes": [{"id": "x", "label": "Thing", "properties": {}, "sources": []}],
                "edges": [],
                "metadata": {}
            })
        );
    }

    #[test]
    fn missing_top_level_key_is_a_deserialization_error() {
        let err = GraphContext::from_bytes(br#"{"nodes": []}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
        assert!(err.to_string().contains("edges"), "{err}");

        let err = GraphContext::from_bytes(br#"{"edges": []}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
    }

    #[test]
    fn missing_record_field_is_a_deserialization_error() {
        let payload = br#"{"nodes": [{"id": "a"}], "edges": []}"#;
        assert_eq!(
            GraphContext::from_bytes(payload).unwrap_err().kind(),
            ErrorKind::Deserialization
        );

        let payload = br#"{"nodes": [], "edges": [{"id": "e", "source_id": "a", "relation_type": "R"}]}"#;
        assert_eq!(
            GraphContext::from_bytes(payload).unwrap_err().kind(),
            ErrorKind::Deserialization
        );

        let payload = br#"{"nodes": [{"id": "a", "label": "L", "sources": [{"plugin_name": "p", "table_name": "t", "row_id": "r"}]}], "edges": []}"#;
        assert_eq!(
            GraphContext::from_bytes(payload).unwrap_err().kind(),
            ErrorKind::Deserialization
        );
    }

    #[test]
    fn duplicate_ids_in_payload_fail_as_deserialization() {
        let payload = br#"{"nodes": [{"id": "a", "label": "L"}, {"id": "a", "label": "M"}], "edges": []}"#;
        assert_eq!(
            GraphContext::from_bytes(payload).unwrap_err().kind(),
            ErrorKind::Deserialization
        );
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let payload = br#"{
            "schema": 7,
            "nodes": [{"id": "a", "label": "L", "color": "red"}],
            "edges": [],
            "metadata": {"k": "v"}
        }"#;
        let ctx = GraphContext::from_bytes(payload).unwrap();
        assert_eq!(ctx.node_count(), 1);
        assert_eq!(ctx.metadata().get("k"), Some(&json!("v")));
    }

    #[test]
    fn temp_file_is_complete_and_left_for_the_caller() {
        let ctx = sample();
        let file = ctx.to_temp_file().unwrap();
        let path = file.path().to_path_buf();
        assert!(path.extension().is_some_and(|ext| ext == "json"));

        let loaded = GraphContext::from_file(&path).unwrap();
        assert_eq!(loaded, ctx);

        file.cleanup().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn dropping_transfer_file_keeps_it_on_disk() {
        let ctx = sample();
        let path = {
            let file = ctx.to_temp_file().unwrap();
            file.path().to_path_buf()
        };
        assert!(path.exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn scoped_temp_file_is_removed_on_error() {
        let ctx = sample();
        let mut seen = None;
        let result: Result<()> = ctx.with_temp_file(|path| {
            seen = Some(path.to_path_buf());
            assert_eq!(GraphContext::from_file(path)?.node_count(), 2);
            Err(GraphError::backend("consumer failed"))
        });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Backend);
        let seen = seen.unwrap();
        assert!(!seen.exists());
    }

    #[test]
    fn scoped_temp_file_is_removed_on_panic() {
        let ctx = sample();
        let mut seen = None;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<()> = ctx.with_temp_file(|path| {
                seen = Some(path.to_path_buf());
                panic!("consumer panicked");
            });
        }));
        assert!(outcome.is_err());
        let seen = seen.unwrap();
        assert!(!seen.exists());
    }

    #[test]
    fn awkward_floats_survive_the_round_trip() {
        let values = [
            1.0715660391465826e-75,
            -1.81996730402717e-179,
            -1.603964615428183e143,
            0.1 + 0.2,
            f64::MIN_POSITIVE,
            f64::MAX,
        ];
        let nodes = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                GraphNode::new(format!("n{i}"), "Measure")
                    .unwrap()
                    .with_property("value", *v)
            })
            .collect();
        let ctx = GraphContext::new(nodes, Vec::new()).unwrap();
        let loaded = GraphContext::from_bytes(&ctx.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded, ctx);
        for (node, v) in loaded.nodes().iter().zip(values) {
            assert_eq!(node.property("value").and_then(|p| p.as_f64()), Some(v));
        }
    }

    #[test]
    fn reading_a_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GraphContext::from_file(dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn write_to_then_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let ctx = sample();
        ctx.write_to(&path).unwrap();
        assert_eq!(GraphContext::from_file(&path).unwrap(), ctx);
    }
}
