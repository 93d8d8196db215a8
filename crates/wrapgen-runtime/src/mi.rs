//! Multiple-inheritance offset tables.
//!
//! A class with several bases has ancestors whose subobjects start at
//! non-zero offsets from the most derived object. Generated `mi_init`
//! functions compute those offsets from a live object; the table is the
//! same for every object of the type, so it is computed once and cached.

use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Terminator of the table handed to generated code.
pub const OFFSET_TABLE_END: isize = -1;

/// Per-type cache of base subobject offsets.
#[derive(Debug, Default, Clone)]
pub struct MiOffsetCache {
    tables: FxHashMap<String, Arc<[isize]>>,
}

impl MiOffsetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The offset table of `class`, computing it on first use.
    pub fn offsets(&mut self, class: &str, compute: impl FnOnce() -> Vec<isize>) -> Arc<[isize]> {
        if let Some(table) = self.tables.get(class) {
            return Arc::clone(table);
        }
        let table: Arc<[isize]> = normalize(compute()).into();
        tracing::debug!(class, offsets = ?table, "cached multiple inheritance offsets");
        self.tables.insert(class.to_string(), Arc::clone(&table));
        table
    }

    pub fn get(&self, class: &str) -> Option<Arc<[isize]>> {
        self.tables.get(class).cloned()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Distinct non-zero offsets in ascending order.
pub fn normalize(mut offsets: Vec<isize>) -> Vec<isize> {
    offsets.retain(|offset| *offset != 0);
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

/// The table with its end marker, as laid out for generated code.
pub fn terminated(table: &[isize]) -> Vec<isize> {
    let mut out = Vec::with_capacity(table.len() + 1);
    out.extend_from_slice(table);
    out.push(OFFSET_TABLE_END);
    out
}
