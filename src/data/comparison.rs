use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::normalize::NormalizedTable;

/// Column names present in every non-empty table of a batch.
///
/// Backed by an ordered set, so iteration is lexicographic regardless of the order the
/// tables were uploaded in. An empty set means nothing can be compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSet(BTreeSet<String>);

impl ComparisonSet {
    /// Intersects the columns of every table. Tables without rows contribute nothing
    /// and are left out of the intersection.
    pub fn resolve<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = &'a NormalizedTable>,
    {
        let set = tables
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.column_names().into_iter().collect::<BTreeSet<_>>())
            .reduce(|acc, cols| acc.intersection(&cols).cloned().collect())
            .unwrap_or_default();
        Self(set)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Keeps the requested columns that are comparable, in request order, without repeats.
    pub fn select<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        requested
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| self.contains(c) && seen.insert(c.to_string()))
            .map(str::to_string)
            .collect()
    }
}

impl<'a> IntoIterator for &'a ComparisonSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
