//! Binary module image format
//!
//! Layout:
//! - Header: magic (4 bytes) + version (u32) + flags (u32) + crc32 (u32) + checksum (32 bytes SHA-256)
//! - Payload: JSON-encoded module contents
//!
//! Both checksums cover the payload only. All integers are little-endian.

use crate::compiler::metadata::ClassDef;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

/// Magic number for module images: "TFMB"
pub const MAGIC: [u8; 4] = *b"TFMB";

/// Current image version
pub const VERSION: u32 = 1;

/// Size of the fixed header in bytes
pub const HEADER_LEN: usize = 48;

/// Module flags
pub mod flags {
    /// Dynamically loadable library (the only output kind)
    pub const LIBRARY: u32 = 0x1;
    /// Built-in core library image
    pub const CORE: u32 = 0x2;
}

/// Module encoding/decoding errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module image is truncated ({0} bytes)")]
    Truncated(usize),

    #[error("Invalid magic number: expected TFMB, got {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("SHA-256 mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Invalid module payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A module this image was compiled against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Module name inside the referenced image
    pub name: String,
    /// Location the reference was resolved from
    pub location: String,
}

/// A compiled module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleImage {
    pub name: String,
    #[serde(skip)]
    pub flags: u32,
    pub dependencies: Vec<Dependency>,
    /// Namespaces this module contributes (including empty ones)
    pub namespaces: Vec<String>,
    pub classes: Vec<ClassDef>,
}

impl ModuleImage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: flags::LIBRARY,
            dependencies: Vec::new(),
            namespaces: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn find_class(&self, qualified_name: &str) -> Option<&ClassDef> {
        self.classes
            .iter()
            .find(|c| c.qualified_name() == qualified_name)
    }

    pub fn is_core(&self) -> bool {
        self.flags & flags::CORE != 0
    }

    /// Encode to the binary image format
    pub fn encode(&self) -> Result<Vec<u8>, ModuleError> {
        let payload = serde_json::to_vec(self)?;
        let crc32 = crc32fast::hash(&payload);
        let hash: [u8; 32] = Sha256::digest(&payload).into();

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&self.flags.to_le_bytes());
        bytes.extend_from_slice(&crc32.to_le_bytes());
        bytes.extend_from_slice(&hash);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode and verify a binary image
    pub fn decode(data: &[u8]) -> Result<Self, ModuleError> {
        if data.len() < HEADER_LEN {
            return Err(ModuleError::Truncated(data.len()));
        }

        let magic: [u8; 4] = [data[0], data[1], data[2], data[3]];
        if magic != MAGIC {
            return Err(ModuleError::InvalidMagic(magic));
        }

        let version = read_u32(data, 4);
        if version != VERSION {
            return Err(ModuleError::UnsupportedVersion(version));
        }

        let flags = read_u32(data, 8);
        let stored_crc32 = read_u32(data, 12);
        let stored_sha256 = &data[16..HEADER_LEN];
        let payload = &data[HEADER_LEN..];

        let calculated_crc32 = crc32fast::hash(payload);
        if stored_crc32 != calculated_crc32 {
            return Err(ModuleError::ChecksumMismatch {
                expected: stored_crc32,
                actual: calculated_crc32,
            });
        }

        let calculated_sha256 = Sha256::digest(payload);
        if stored_sha256 != calculated_sha256.as_slice() {
            return Err(ModuleError::HashMismatch {
                expected: hex::encode(stored_sha256),
                actual: hex::encode(calculated_sha256),
            });
        }

        let mut image: ModuleImage = serde_json::from_slice(payload)?;
        image.flags = flags;
        Ok(image)
    }

    /// Read and decode an image file.
    pub fn read_from(path: &Path) -> Result<Self, ModuleError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Encode and write an image file.
    pub fn write_to(&self, path: &Path) -> Result<(), ModuleError> {
        std::fs::write(path, self.encode()?)?;
        Ok(())
    }
}

/// Hex SHA-256 of an encoded image's payload, as stored in its header.
pub fn content_hash(data: &[u8]) -> Option<String> {
    (data.len() >= HEADER_LEN).then(|| hex::encode(&data[16..HEADER_LEN]))
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
