//! Per-device AES key table.
//!
//! Keys are kept in a TOML table mapping a 4-hex-digit serial to a 32-hex-digit
//! AES-128 key:
//!
//! ```toml
//! "00ca" = "f1597d0ee9178be2e8c650097db265b3"
//! "01dc" = "b940afdba21b8e5c21813b6fbb2f9442"
//! ```
//!
//! [`KeyStore`] holds the active table behind a lock so it can be swapped at
//! runtime without interrupting decoding.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::KeyError;

/// Length of an AES-128 key in bytes.
pub const KEY_LEN: usize = 16;

/// An AES-128 device key.
pub type DeviceKey = [u8; KEY_LEN];

/// Serial to key mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTable {
    keys: HashMap<String, DeviceKey>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(serial, hex key)` pairs.
    pub fn from_entries<I, S, K>(entries: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = (S, K)>,
        S: AsRef<str>,
        K: AsRef<str>,
    {
        let mut table = Self::new();
        for (serial, key) in entries {
            table.insert_hex(serial.as_ref(), key.as_ref())?;
        }
        Ok(table)
    }

    /// Parse a TOML key table.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        let entries: BTreeMap<String, String> = toml::from_str(text)?;
        Self::from_entries(entries)
    }

    /// Read and parse a TOML key table file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Validate and insert one entry, replacing any existing key.
    pub fn insert_hex(&mut self, serial: &str, key: &str) -> Result<(), KeyError> {
        if !is_serial(serial) {
            return Err(KeyError::InvalidSerial(serial.to_string()));
        }
        let bytes = hex::decode(key).map_err(|e| KeyError::InvalidKey {
            serial: serial.to_string(),
            reason: e.to_string(),
        })?;
        let key: DeviceKey = bytes.try_into().map_err(|b: Vec<u8>| KeyError::InvalidKey {
            serial: serial.to_string(),
            reason: format!("expected {KEY_LEN} bytes, got {}", b.len()),
        })?;
        self.keys.insert(serial.to_string(), key);
        Ok(())
    }

    /// Overlay `other` onto this table; its entries win.
    pub fn merge(&mut self, other: KeyTable) {
        self.keys.extend(other.keys);
    }

    pub fn get(&self, serial: &str) -> Option<&DeviceKey> {
        self.keys.get(serial)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Serials in ascending order.
    pub fn serials(&self) -> Vec<&str> {
        let mut serials: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        serials.sort_unstable();
        serials
    }
}

fn is_serial(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// The active key table, replaceable at runtime.
#[derive(Debug)]
pub struct KeyStore {
    active: RwLock<Arc<KeyTable>>,
    inline: KeyTable,
    file: Option<PathBuf>,
}

impl KeyStore {
    /// A store serving a fixed table.
    pub fn new(table: KeyTable) -> Self {
        Self {
            active: RwLock::new(Arc::new(table.clone())),
            inline: table,
            file: None,
        }
    }

    /// A store serving `inline` overlaid with the entries of `path`.
    ///
    /// [`KeyStore::reload`] re-reads the file.
    pub fn with_file(inline: KeyTable, path: impl Into<PathBuf>) -> Result<Self, KeyError> {
        let path = path.into();
        let mut table = inline.clone();
        table.merge(KeyTable::load(&path)?);
        Ok(Self {
            active: RwLock::new(Arc::new(table)),
            inline,
            file: Some(path),
        })
    }

    /// Copy of the key for `serial`.
    pub fn lookup(&self, serial: &str) -> Option<DeviceKey> {
        self.active.read().get(serial).copied()
    }

    /// The table currently in use.
    pub fn snapshot(&self) -> Arc<KeyTable> {
        self.active.read().clone()
    }

    /// Swap in a new table.
    pub fn replace(&self, table: KeyTable) {
        *self.active.write() = Arc::new(table);
    }

    /// Re-read the key file and swap it in. Returns the new table size.
    ///
    /// On error the previous table stays active.
    pub fn reload(&self) -> Result<usize, KeyError> {
        let Some(path) = &self.file else {
            return Ok(self.snapshot().len());
        };
        let mut table = self.inline.clone();
        table.merge(KeyTable::load(path)?);
        let len = table.len();
        self.replace(table);
        Ok(len)
    }
}
