use serde::Serialize;
use std::collections::HashMap;

/// Mapping from each distinct input label to its canonical label.
///
/// Entries iterate in first-occurrence order. Every canonical label is itself
/// a key that maps to itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalMapping {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub label: String,
    pub canonical: String,
}

impl CanonicalMapping {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub(crate) fn insert_new(&mut self, label: String, canonical: String) {
        debug_assert!(!self.index.contains_key(&label));
        self.index.insert(label.clone(), self.entries.len());
        self.entries.push((label, canonical));
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.index
            .get(label)
            .map(|&position| self.entries[position].1.as_str())
    }

    /// Canonical form of `label`, or `label` itself when it was never seen.
    pub fn resolve<'a>(&'a self, label: &'a str) -> &'a str {
        self.get(label).unwrap_or(label)
    }

    /// Substitutes every label with its canonical form.
    pub fn apply<'a, I>(&'a self, labels: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels.into_iter().map(|label| self.resolve(label)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(label, canonical)| (label.as_str(), canonical.as_str()))
    }

    /// Representatives in the order their clusters were opened.
    pub fn representatives(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(label, canonical)| label == canonical)
            .map(|(label, _)| label)
    }

    pub fn cluster_count(&self) -> usize {
        self.representatives().count()
    }

    /// Labels that were folded into another representative.
    pub fn corrections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(label, canonical)| label != canonical)
    }

    pub fn entries(&self) -> Vec<MappingEntry> {
        self.iter()
            .map(|(label, canonical)| MappingEntry {
                label: label.to_string(),
                canonical: canonical.to_string(),
            })
            .collect()
    }
}
