//! Constant pool for class units

use rustc_hash::FxHashMap;

use super::encoder::{BytecodeReader, BytecodeWriter, DecodeError};

/// String constant pool
///
/// Holds literal strings, type names, member names and method descriptors.
/// Strings added through [`ConstantPool::intern`] are deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// String constants
    pub strings: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string constant and return its index
    pub fn add_string(&mut self, s: String) -> u32 {
        let index = self.strings.len() as u32;
        self.index.entry(s.clone()).or_insert(index);
        self.strings.push(s);
        index
    }

    /// Return the index of `s`, adding it if it is not present yet
    pub fn intern(&mut self, s: &str) -> u32 {
        match self.index.get(s) {
            Some(&index) => index,
            None => self.add_string(s.to_string()),
        }
    }

    /// Get a string constant by index
    pub fn get_string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(|s| s.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Encode the constant pool to binary format
    ///
    /// Format:
    /// - String count (u32)
    /// - For each string: length (u32) + UTF-8 bytes
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.strings.len() as u32);
        for s in &self.strings {
            writer.emit_string(s);
        }
    }

    /// Decode the constant pool from binary format
    pub fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let mut pool = ConstantPool::new();
        let count = reader.read_u32()? as usize;
        pool.strings.reserve(count.min(reader.remaining()));
        for _ in 0..count {
            let s = reader.read_string()?;
            pool.add_string(s);
        }
        Ok(pool)
    }
}
