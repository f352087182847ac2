//! Closed lookup tables from command-line identifiers to values.

use crate::error::{Error, Result};

/// A fixed mapping from names to values of `T`.
///
/// Lookups are exact (case-sensitive) and fail with [`Error::UnknownIdentifier`].
#[derive(Debug)]
pub struct Registry<T: 'static> {
    kind: &'static str,
    entries: &'static [(&'static str, T)],
}

impl<T: Copy> Registry<T> {
    pub const fn new(kind: &'static str, entries: &'static [(&'static str, T)]) -> Self {
        Self { kind, entries }
    }

    pub fn lookup(&self, name: &str) -> Result<T> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| Error::UnknownIdentifier {
                kind: self.kind,
                name: name.to_owned(),
                expected: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Name registered for `value`.
    pub fn name_of(&self, value: T) -> Option<&'static str>
    where
        T: PartialEq,
    {
        self.entries
            .iter()
            .find(|(_, entry)| *entry == value)
            .map(|(name, _)| *name)
    }
}
