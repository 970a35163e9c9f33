//! World whitelist and per-world extraction counts.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use crate::error::{FetchError, FetchResult};

/// Ordered set of top-level directory names eligible for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldFilter {
    names: Vec<String>,
}

impl WorldFilter {
    /// Build a filter from world names.
    ///
    /// A single trailing `/` is trimmed and duplicates collapse. Empty names,
    /// `.`/`..` and names containing a path separator are rejected.
    pub fn new<I, S>(names: I) -> FetchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let raw = name.as_ref();
            let trimmed = raw.strip_suffix('/').unwrap_or(raw);
            if trimmed.is_empty()
                || trimmed == "."
                || trimmed == ".."
                || trimmed.contains('/')
                || trimmed.contains('\\')
            {
                return Err(FetchError::InvalidFilter(raw.to_string()));
            }
            if !out.iter().any(|n| n == trimmed) {
                out.push(trimmed.to_string());
            }
        }
        Ok(Self { names: out })
    }

    /// The world names, in the order given.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether no world was selected.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The world an entry belongs to, if any.
    ///
    /// `entry` must already be normalized. It matches a world when it equals
    /// the name or is nested under it (`world`, `world/`, `world/region/r.mca`).
    pub fn matching_world(&self, entry: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|world| match entry.strip_prefix(world.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            })
            .map(String::as_str)
    }

    /// The world a resolved destination lies in.
    ///
    /// `relative` is the destination relative to the extraction root; its
    /// first component must be one of the names.
    pub fn resolved_world(&self, relative: &Path) -> Option<&str> {
        let first = match relative.components().next()? {
            Component::Normal(name) => name.to_str()?,
            _ => return None,
        };
        self.names
            .iter()
            .find(|world| world.as_str() == first)
            .map(String::as_str)
    }
}

/// Count of regular files written per world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionTally {
    counts: BTreeMap<String, usize>,
}

impl ExtractionTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one file written for `world`.
    pub fn record(&mut self, world: &str) {
        *self.counts.entry(world.to_string()).or_insert(0) += 1;
    }

    /// Files written for `world`.
    pub fn count(&self, world: &str) -> usize {
        self.counts.get(world).copied().unwrap_or(0)
    }

    /// Files written across all worlds.
    pub fn total_files(&self) -> usize {
        self.counts.values().sum()
    }

    /// Worlds from `filter` that produced no files.
    pub fn missing<'a>(&self, filter: &'a WorldFilter) -> Vec<&'a str> {
        filter
            .names()
            .iter()
            .filter(|w| self.count(w) == 0)
            .map(String::as_str)
            .collect()
    }
}
