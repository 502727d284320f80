//! Class unit format
//!
//! One class unit holds exactly one compiled class. Layout:
//! - Header: magic (4 bytes) + version (u32) + flags (u32) + checksum (u32)
//! - Constant pool
//! - Class name, access flags, superclass, interfaces
//! - Field table
//! - Constructor table
//! - Method table
//! - Static initializer (if flags indicate)
//! - Metadata

use super::constants::ConstantPool;
use super::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use thiserror::Error;

/// Magic number for Veil class units: "VEIL"
pub const MAGIC: [u8; 4] = *b"VEIL";

/// Current class unit version
pub const VERSION: u32 = 1;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 16;

/// Name used for constructor code bodies
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name used for the static initializer code body
pub const STATIC_INIT_NAME: &str = "<clinit>";

/// Class unit encoding/decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected VEIL, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Bytes left over after the metadata section
    #[error("{0} trailing bytes after class unit")]
    TrailingBytes(usize),
}

/// Unit flags
pub mod flags {
    /// Unit carries a static initializer body
    pub const HAS_STATIC_INIT: u32 = 1 << 0;
}

/// Access flags for classes, fields and code bodies
pub mod access {
    pub const PUBLIC: u16 = 1 << 0;
    pub const PRIVATE: u16 = 1 << 1;
    pub const PROTECTED: u16 = 1 << 2;
    pub const STATIC: u16 = 1 << 3;
    pub const FINAL: u16 = 1 << 4;
    pub const ABSTRACT: u16 = 1 << 5;
    pub const INTERFACE: u16 = 1 << 6;
}

/// A compiled class
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Magic number (must be "VEIL")
    pub magic: [u8; 4],
    /// Format version
    pub version: u32,
    /// Unit flags, see [`flags`]
    pub flags: u32,
    /// String constant pool shared by every code body
    pub constants: ConstantPool,
    /// Fully qualified class name
    pub name: String,
    /// Access flags, see [`access`]
    pub access: u16,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDef>,
    pub constructors: Vec<CodeDef>,
    pub methods: Vec<CodeDef>,
    pub static_init: Option<CodeDef>,
    pub metadata: Metadata,
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    /// Canonical type text
    pub type_name: String,
    pub access: u16,
}

impl FieldDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_string(&self.type_name);
        writer.emit_u16(self.access);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: reader.read_string()?,
            type_name: reader.read_string()?,
            access: reader.read_u16()?,
        })
    }
}

/// Exception table entry
///
/// Covers the half-open code range `start..end`. An empty catch list
/// catches everything. Entries are searched in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerEntry {
    pub start: u32,
    pub end: u32,
    pub handler: u32,
    /// Constant pool indices of the caught type names
    pub catch_types: Vec<u32>,
}

impl HandlerEntry {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u32(self.start);
        writer.emit_u32(self.end);
        writer.emit_u32(self.handler);
        writer.emit_u32(self.catch_types.len() as u32);
        for &ty in &self.catch_types {
            writer.emit_u32(ty);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let start = reader.read_u32()?;
        let end = reader.read_u32()?;
        let handler = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        let mut catch_types = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            catch_types.push(reader.read_u32()?);
        }
        Ok(Self {
            start,
            end,
            handler,
            catch_types,
        })
    }
}

/// A method, constructor or static initializer body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeDef {
    pub name: String,
    /// Canonical parameter type texts
    pub params: Vec<String>,
    /// Canonical return type text
    pub return_type: String,
    pub access: u16,
    /// Number of local slots, including `this` and parameters
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub handlers: Vec<HandlerEntry>,
}

impl CodeDef {
    /// Method descriptor text, e.g. `(String,int)void`
    pub fn descriptor(&self) -> String {
        format!("({}){}", self.params.join(","), self.return_type)
    }

    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access & access::ABSTRACT != 0
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u32(self.params.len() as u32);
        for param in &self.params {
            writer.emit_string(param);
        }
        writer.emit_string(&self.return_type);
        writer.emit_u16(self.access);
        writer.emit_u16(self.max_locals);
        writer.emit_bytes(&self.code);
        writer.emit_u32(self.handlers.len() as u32);
        for handler in &self.handlers {
            handler.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let param_count = reader.read_u32()? as usize;
        let mut params = Vec::with_capacity(param_count.min(reader.remaining()));
        for _ in 0..param_count {
            params.push(reader.read_string()?);
        }
        let return_type = reader.read_string()?;
        let access = reader.read_u16()?;
        let max_locals = reader.read_u16()?;
        let code = reader.read_blob()?;
        let handler_count = reader.read_u32()? as usize;
        let mut handlers = Vec::with_capacity(handler_count.min(reader.remaining()));
        for _ in 0..handler_count {
            handlers.push(HandlerEntry::decode(reader)?);
        }
        Ok(Self {
            name,
            params,
            return_type,
            access,
            max_locals,
            code,
            handlers,
        })
    }
}

/// Unit metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Source file the class was compiled from
    pub source_file: Option<String>,
}

impl Metadata {
    fn encode(&self, writer: &mut BytecodeWriter) {
        match &self.source_file {
            Some(path) => {
                writer.emit_u8(1);
                writer.emit_string(path);
            }
            None => writer.emit_u8(0),
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let source_file = if reader.read_u8()? != 0 {
            Some(reader.read_string()?)
        } else {
            None
        };
        Ok(Self { source_file })
    }
}

fn encode_optional_string(writer: &mut BytecodeWriter, value: Option<&str>) {
    match value {
        Some(s) => {
            writer.emit_u8(1);
            writer.emit_string(s);
        }
        None => writer.emit_u8(0),
    }
}

fn decode_optional_string(reader: &mut BytecodeReader<'_>) -> Result<Option<String>, DecodeError> {
    if reader.read_u8()? != 0 {
        Ok(Some(reader.read_string()?))
    } else {
        Ok(None)
    }
}

impl ClassFile {
    /// Create an empty class unit
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            constants: ConstantPool::new(),
            name: name.into(),
            access: 0,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            static_init: None,
            metadata: Metadata::default(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.access & access::INTERFACE != 0
    }

    /// Every code body in the unit, static initializer last
    pub fn code_bodies(&self) -> impl Iterator<Item = &CodeDef> {
        self.constructors
            .iter()
            .chain(self.methods.iter())
            .chain(self.static_init.iter())
    }

    /// Encode the unit to its binary form
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();

        let mut flags = self.flags & !flags::HAS_STATIC_INIT;
        if self.static_init.is_some() {
            flags |= flags::HAS_STATIC_INIT;
        }

        writer.buffer.extend_from_slice(&self.magic);
        writer.emit_u32(self.version);
        writer.emit_u32(flags);
        let checksum_offset = writer.reserve_u32();

        self.constants.encode(&mut writer);

        writer.emit_string(&self.name);
        writer.emit_u16(self.access);
        encode_optional_string(&mut writer, self.superclass.as_deref());
        writer.emit_u32(self.interfaces.len() as u32);
        for iface in &self.interfaces {
            writer.emit_string(iface);
        }

        writer.emit_u32(self.fields.len() as u32);
        for field in &self.fields {
            field.encode(&mut writer);
        }

        writer.emit_u32(self.constructors.len() as u32);
        for ctor in &self.constructors {
            ctor.encode(&mut writer);
        }

        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            method.encode(&mut writer);
        }

        if let Some(init) = &self.static_init {
            init.encode(&mut writer);
        }

        self.metadata.encode(&mut writer);

        // CRC32 of everything after the header
        let checksum = crc32fast::hash(&writer.buffer[HEADER_SIZE..]);
        writer.patch_u32(checksum_offset, checksum);

        writer.into_bytes()
    }

    /// Decode a unit from its binary form
    pub fn decode(data: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = BytecodeReader::new(data);

        let raw_magic = reader.read_bytes(4)?;
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&raw_magic);
        if magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ClassFileError::UnsupportedVersion(version));
        }

        let flags = reader.read_u32()?;
        let stored_checksum = reader.read_u32()?;

        let calculated_checksum = crc32fast::hash(&data[HEADER_SIZE..]);
        if stored_checksum != calculated_checksum {
            return Err(ClassFileError::ChecksumMismatch {
                expected: stored_checksum,
                actual: calculated_checksum,
            });
        }

        let constants = ConstantPool::decode(&mut reader)?;

        let name = reader.read_string()?;
        let access = reader.read_u16()?;
        let superclass = decode_optional_string(&mut reader)?;
        let iface_count = reader.read_u32()? as usize;
        let mut interfaces = Vec::with_capacity(iface_count.min(reader.remaining()));
        for _ in 0..iface_count {
            interfaces.push(reader.read_string()?);
        }

        let field_count = reader.read_u32()? as usize;
        let mut fields = Vec::with_capacity(field_count.min(reader.remaining()));
        for _ in 0..field_count {
            fields.push(FieldDef::decode(&mut reader)?);
        }

        let ctor_count = reader.read_u32()? as usize;
        let mut constructors = Vec::with_capacity(ctor_count.min(reader.remaining()));
        for _ in 0..ctor_count {
            constructors.push(CodeDef::decode(&mut reader)?);
        }

        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(method_count.min(reader.remaining()));
        for _ in 0..method_count {
            methods.push(CodeDef::decode(&mut reader)?);
        }

        let static_init = if flags & flags::HAS_STATIC_INIT != 0 {
            Some(CodeDef::decode(&mut reader)?)
        } else {
            None
        };

        let metadata = Metadata::decode(&mut reader)?;

        if reader.has_more() {
            return Err(ClassFileError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            magic,
            version,
            flags,
            constants,
            name,
            access,
            superclass,
            interfaces,
            fields,
            constructors,
            methods,
            static_init,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_unit() -> ClassFile {
        let mut unit = ClassFile::new("demo.$Proxy0");
        unit.access = access::PUBLIC | access::FINAL;
        unit.superclass = Some("veil.ProxyBase".to_string());
        unit.interfaces.push("demo.Subject".to_string());
        unit.fields.push(FieldDef {
            name: "doOperation0".to_string(),
            type_name: "veil.Method".to_string(),
            access: access::PRIVATE | access::STATIC,
        });

        let mut writer = BytecodeWriter::new();
        writer.emit_return_void();
        let catch_type = unit.constants.intern("Throwable");
        unit.methods.push(CodeDef {
            name: "doOperation".to_string(),
            params: vec!["String".to_string()],
            return_type: "void".to_string(),
            access: access::PUBLIC | access::FINAL,
            max_locals: 2,
            code: writer.into_bytes(),
            handlers: vec![HandlerEntry {
                start: 0,
                end: 1,
                handler: 0,
                catch_types: vec![catch_type],
            }],
        });
        unit.static_init = Some(CodeDef {
            name: STATIC_INIT_NAME.to_string(),
            params: Vec::new(),
            return_type: "void".to_string(),
            access: access::STATIC,
            max_locals: 0,
            code: vec![0x71],
            handlers: Vec::new(),
        });
        unit.metadata.source_file = Some("$Proxy0.veil".to_string());
        unit
    }

    #[test]
    fn test_unit_encoding() {
        let unit = sample_unit();
        let bytes = unit.encode();
        assert_eq!(&bytes[..4], b"VEIL");

        let decoded = ClassFile::decode(&bytes).unwrap();
        assert_eq!(decoded.name, "demo.$Proxy0");
        assert_eq!(decoded.superclass.as_deref(), Some("veil.ProxyBase"));
        assert_eq!(decoded.interfaces, vec!["demo.Subject".to_string()]);
        assert_eq!(decoded.fields, unit.fields);
        assert_eq!(decoded.methods, unit.methods);
        assert_eq!(decoded.methods[0].descriptor(), "(String)void");
        assert!(decoded.static_init.is_some());
        assert_eq!(decoded.flags & flags::HAS_STATIC_INIT, flags::HAS_STATIC_INIT);
        assert_eq!(decoded.metadata.source_file.as_deref(), Some("$Proxy0.veil"));
        assert_eq!(decoded.code_bodies().count(), 2);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = sample_unit().encode();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            ClassFile::decode(&bytes),
            Err(ClassFileError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = sample_unit().encode();
        bytes[0] = b'X';
        assert!(matches!(
            ClassFile::decode(&bytes),
            Err(ClassFileError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = sample_unit().encode();
        bytes[4] = 9;
        assert_eq!(
            ClassFile::decode(&bytes).unwrap_err(),
            ClassFileError::UnsupportedVersion(9)
        );
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            ClassFile::decode(b"VEI"),
            Err(ClassFileError::DecodeError(DecodeError::UnexpectedEnd(0)))
        ));
    }
}
