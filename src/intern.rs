//! String interning for identifiers, literals, and field/proc names.
//!
//! Every `Reference` that addresses a field, an `SrcField`, or an `SrcProc`
//! carries a `StringId` rather than a raw name, so bytecode never repeats a
//! byte-for-byte string. Interning is content-based: two calls to `intern`
//! with byte-identical strings always return the same id.

use ahash::AHashMap;

/// Index into a `StringTable`.
///
/// A `u32` keeps references small (payloads in bytecode are encoded as
/// little-endian `i32`s per the reference table in the data model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct StringId(u32);

impl StringId {
    #[must_use]
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Ordered, deduplicated table of interned strings.
///
/// Private to one `ObjectTree` (per §5, interning is not shared across
/// compilations).
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct StringTable {
    strings: Vec<String>,
    index: AHashMap<String, StringId>,
}

impl StringTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning the id for it. Idempotent: interning the same
    /// content twice returns the same id without growing the table.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = StringId(u32::try_from(self.strings.len()).expect("string table exceeds u32 capacity"));
        self.strings.push(s.to_owned());
        self.index.insert(s.to_owned(), id);
        id
    }

    #[must_use]
    pub fn get(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// All interned strings in id order, for serialization into the final
    /// artifact (§6.5).
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut table = StringTable::new();
        let a = table.intern("hello");
        let b = table.intern("hello");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let mut table = StringTable::new();
        let a = table.intern("foo");
        let b = table.intern("bar");
        assert_ne!(a, b);
        assert_eq!(table.get(a), "foo");
        assert_eq!(table.get(b), "bar");
    }
}
