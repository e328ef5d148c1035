use std::collections::HashMap;

use crate::value::CellValue;

/// Header-derived mapping from column name to zero-based position.
///
/// Built once from a header snapshot and never refreshed. When two header cells
/// carry the same name the later column wins and the earlier one becomes
/// unaddressable by name. Blank header cells still count toward the width but
/// have no name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn from_header(header: &[CellValue]) -> Self {
        let names: Vec<String> = header.iter().map(ToString::to_string).collect();
        let mut positions = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if !name.is_empty() {
                positions.insert(name.clone(), idx);
            }
        }
        Self { names, positions }
    }

    /// Number of physical columns, including blank and shadowed ones.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Header names in physical order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Addressable `(name, position)` pairs in physical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.names
            .iter()
            .enumerate()
            .filter(|(idx, name)| self.positions.get(name.as_str()) == Some(idx))
            .map(|(idx, name)| (name.as_str(), idx))
    }

    /// Positions whose name is shadowed by a later column with the same name.
    pub fn shadowed(&self) -> Vec<(usize, &str)> {
        self.names
            .iter()
            .enumerate()
            .filter(|(idx, name)| {
                !name.is_empty() && self.positions.get(name.as_str()) != Some(idx)
            })
            .map(|(idx, name)| (idx, name.as_str()))
            .collect()
    }
}
