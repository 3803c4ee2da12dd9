//! Content addresses using MD5.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Hash digest size in bytes (MD5 produces 128-bit hashes).
pub const HASH_SIZE: usize = 16;

/// Suffix marking an address that names a directory manifest.
pub const DIR_SUFFIX: &str = ".dir";

/// A 16-byte MD5 digest of an exact byte stream.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a hex string (32 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(Error::invalid_hash(format!(
                "Expected {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes =
            hex::decode(hex_str).map_err(|e| Error::invalid_hash(format!("Invalid hex: {}", e)))?;

        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&bytes);
        Ok(Hash(hash))
    }

    /// Convert to lowercase hex string (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Hash raw bytes.
    pub fn hash_bytes(data: &[u8]) -> Self {
        Hash(md5::compute(data).0)
    }

    /// Hash data from a reader without buffering it whole.
    pub fn hash_reader<R: Read>(reader: R) -> Result<Self> {
        Self::hash_reader_counted(reader).map(|(hash, _)| hash)
    }

    /// Hash data from a reader, also returning the number of bytes consumed.
    pub fn hash_reader_counted<R: Read>(mut reader: R) -> Result<(Self, u64)> {
        let mut context = md5::Context::new();
        let len = std::io::copy(&mut reader, &mut context)?;
        Ok((Hash(context.compute().0), len))
    }

    /// Hash a file.
    pub fn hash_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::io_at(path, e))?;
        Self::hash_reader(file)
    }

    /// The string form used when this hash names a directory manifest.
    pub fn as_directory_tag(&self) -> String {
        format!("{}{}", self.to_hex(), DIR_SUFFIX)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The key of a stored object: a hash, possibly tagged as a directory manifest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    hash: Hash,
    directory: bool,
}

impl Address {
    /// Address of a plain file object.
    pub fn file(hash: Hash) -> Self {
        Self {
            hash,
            directory: false,
        }
    }

    /// Address of a directory manifest object.
    pub fn directory(hash: Hash) -> Self {
        Self {
            hash,
            directory: true,
        }
    }

    /// Parse `<hex>` or `<hex>.dir`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.strip_suffix(DIR_SUFFIX) {
            Some(hex) => Ok(Self::directory(Hash::from_hex(hex)?)),
            None => Ok(Self::file(Hash::from_hex(s)?)),
        }
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }

    /// Full string form, including the directory tag when present.
    pub fn to_key(&self) -> String {
        if self.directory {
            self.hash.as_directory_tag()
        } else {
            self.hash.to_hex()
        }
    }

    /// Get the first 2 characters (for directory sharding).
    pub fn prefix(&self) -> String {
        let key = self.to_key();
        key[..2].to_string()
    }

    /// Get the remaining characters, tag included (for filename).
    pub fn suffix(&self) -> String {
        let key = self.to_key();
        key[2..].to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_key())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_key())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
