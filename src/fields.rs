//! Process-wide cache of struct field tables.
//!
//! The first time a struct type is decoded, its declared field names are turned into a
//! [`Fields`] table and kept for the life of the process. Later decodes resolve incoming map
//! keys against the table: a key no longer than the longest field name is read into a stack
//! buffer and, when it names a field, handed to serde as the table's `&'static str`. Known keys
//! cost no allocation; only unknown keys are copied out.
//!
//! Encoding does not use the cache. serde's derived `Serialize` already walks the serialized
//! fields in declaration order, under their wire names, at compile time.
//!
//! The cache is shared between threads behind a `RwLock`. Two threads racing to build the same
//! table both build it, and whichever inserts first wins; the tables are identical either way.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Field names of one struct type, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fields {
    names: Vec<&'static str>,
    index: HashMap<&'static str, usize>,
    longest: usize,
}

impl Fields {
    /// Build a table from a declared field list. A repeated name keeps its first position.
    pub fn new(declared: &'static [&'static str]) -> Self {
        let mut index = HashMap::with_capacity(declared.len());
        for (i, name) in declared.iter().enumerate() {
            index.entry(*name).or_insert(i);
        }
        Self {
            names: declared.to_vec(),
            index,
            longest: declared.iter().map(|n| n.len()).max().unwrap_or(0),
        }
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Byte length of the longest field name. Longer keys can't name a field.
    pub fn longest(&self) -> usize {
        self.longest
    }

    /// Position of the field whose name is exactly `key`.
    pub fn position(&self, key: &[u8]) -> Option<usize> {
        let key = std::str::from_utf8(key).ok()?;
        self.index.get(key).copied()
    }

    /// Canonical name for the field whose name is exactly `key`.
    pub fn resolve(&self, key: &[u8]) -> Option<&'static str> {
        self.position(key).map(|i| self.names[i])
    }

    /// Name of the field at position `i`.
    pub fn name(&self, i: usize) -> Option<&'static str> {
        self.names.get(i).copied()
    }

    fn matches(&self, declared: &[&'static str]) -> bool {
        self.names.as_slice() == declared
    }
}

type Cache = RwLock<HashMap<&'static str, Arc<Fields>>>;

fn cache() -> &'static Cache {
    static CACHE: OnceLock<Cache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Fetch the cached table for a type name, if one has been built.
pub fn lookup(type_name: &str) -> Option<Arc<Fields>> {
    let cache = cache().read().unwrap_or_else(|e| e.into_inner());
    cache.get(type_name).cloned()
}

/// Fetch the table for a type, building and caching it on first use.
///
/// Tables are keyed by type name. If a different type with the same name was cached first, a
/// fresh table is returned for this call and the cache is left alone.
pub fn fields_of(type_name: &'static str, declared: &'static [&'static str]) -> Arc<Fields> {
    if let Some(fields) = lookup(type_name) {
        if fields.matches(declared) {
            return fields;
        }
        log::trace!("field cache: {} has more than one shape, not caching", type_name);
        return Arc::new(Fields::new(declared));
    }

    let built = Arc::new(Fields::new(declared));
    let mut cache = cache().write().unwrap_or_else(|e| e.into_inner());
    let fields = cache.entry(type_name).or_insert_with(|| {
        log::trace!("field cache: {} fields for {}", declared.len(), type_name);
        built.clone()
    });
    if fields.matches(declared) {
        fields.clone()
    } else {
        built
    }
}
