//! In-memory output management
//!
//! The compiler never touches the disk. Each class unit is written through an
//! [`OutputWriter`] that commits its bytes to the [`MemoryFileManager`] when it
//! is dropped. A manager lives for one compile call and is emptied when the
//! call ends, whichever way it ends.

use std::io::{self, Write};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// Class unit buffers produced by one compile call, keyed by type name
#[derive(Debug, Clone, Default)]
pub struct CompiledArtifact {
    units: FxHashMap<String, Vec<u8>>,
}

impl CompiledArtifact {
    /// Add a unit; returns the previous buffer for that name, if any
    pub fn insert(&mut self, type_name: impl Into<String>, bytes: Vec<u8>) -> Option<Vec<u8>> {
        self.units.insert(type_name.into(), bytes)
    }

    pub fn get(&self, type_name: &str) -> Option<&[u8]> {
        self.units.get(type_name).map(Vec::as_slice)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.units.contains_key(type_name)
    }

    /// Sorted type names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.units.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn into_units(self) -> FxHashMap<String, Vec<u8>> {
        self.units
    }
}

#[derive(Default)]
struct Outputs {
    committed: FxHashMap<String, Vec<u8>>,
    open: FxHashSet<String>,
}

/// Call-scoped store of compiler outputs
#[derive(Default)]
pub struct MemoryFileManager {
    outputs: Mutex<Outputs>,
}

impl MemoryFileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a writer for a type; fails if the name was already claimed
    pub fn open_output(&self, type_name: &str) -> Option<OutputWriter<'_>> {
        let mut outputs = self.outputs.lock();
        if outputs.committed.contains_key(type_name) || !outputs.open.insert(type_name.to_string()) {
            return None;
        }
        Some(OutputWriter {
            manager: self,
            type_name: type_name.to_string(),
            buffer: Vec::new(),
        })
    }

    fn commit(&self, type_name: String, bytes: Vec<u8>) {
        let mut outputs = self.outputs.lock();
        outputs.open.remove(&type_name);
        trace!(type_name = %type_name, bytes = bytes.len(), "committed output");
        outputs.committed.insert(type_name, bytes);
    }

    /// Names of committed outputs, sorted
    pub fn committed(&self) -> Vec<String> {
        let mut names: Vec<String> = self.outputs.lock().committed.keys().cloned().collect();
        names.sort();
        names
    }

    /// Move every committed output into an artifact, leaving the manager empty
    pub fn take_artifact(&self) -> CompiledArtifact {
        let mut outputs = self.outputs.lock();
        outputs.open.clear();
        CompiledArtifact {
            units: std::mem::take(&mut outputs.committed),
        }
    }

    pub fn clear(&self) {
        let mut outputs = self.outputs.lock();
        outputs.committed.clear();
        outputs.open.clear();
    }
}

impl Drop for MemoryFileManager {
    fn drop(&mut self) {
        let outputs = self.outputs.get_mut();
        if !outputs.committed.is_empty() {
            trace!(discarded = outputs.committed.len(), "discarding uncollected outputs");
        }
        outputs.committed.clear();
        outputs.open.clear();
    }
}

/// Buffer for one class unit; commits to its manager on drop
pub struct OutputWriter<'m> {
    manager: &'m MemoryFileManager,
    type_name: String,
    buffer: Vec<u8>,
}

impl OutputWriter<'_> {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl Write for OutputWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for OutputWriter<'_> {
    fn drop(&mut self) {
        let bytes = std::mem::take(&mut self.buffer);
        self.manager.commit(std::mem::take(&mut self.type_name), bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_commits_on_drop() {
        let manager = MemoryFileManager::new();
        {
            let mut writer = manager.open_output("demo.A").unwrap();
            writer.write_all(b"abc").unwrap();
            assert!(manager.committed().is_empty());
        }
        assert_eq!(manager.committed(), vec!["demo.A".to_string()]);

        let artifact = manager.take_artifact();
        assert_eq!(artifact.get("demo.A"), Some(&b"abc"[..]));
        assert!(manager.committed().is_empty());
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let manager = MemoryFileManager::new();
        let first = manager.open_output("demo.A");
        assert!(first.is_some());
        assert!(manager.open_output("demo.A").is_none());
        drop(first);
        assert!(manager.open_output("demo.A").is_none());
    }

    #[test]
    fn test_artifact_names_sorted() {
        let mut artifact = CompiledArtifact::default();
        artifact.insert("b.B", vec![1]);
        artifact.insert("a.A", vec![2]);
        assert_eq!(artifact.names(), vec!["a.A".to_string(), "b.B".to_string()]);
        assert_eq!(artifact.len(), 2);
        assert!(artifact.contains("a.A"));
    }
}
