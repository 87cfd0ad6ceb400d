use std::collections::{BTreeMap, BTreeSet};

use crate::{FailureKey, Outcome};

/// Which bucket a settled target ended up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    Success,
    NotFound,
    Other(FailureKey),
}

/// Accumulated outcomes of one run.
///
/// Every recorded URL lives in exactly one bucket. Recording a URL a second
/// time moves it to the new bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    success: BTreeSet<String>,
    not_found: BTreeSet<String>,
    other: BTreeMap<FailureKey, BTreeSet<String>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: &str, outcome: &Outcome) {
        self.forget(url);
        match outcome {
            Outcome::Success => {
                self.success.insert(url.to_string());
            }
            Outcome::NotFound => {
                self.not_found.insert(url.to_string());
            }
            Outcome::Failed(key) => {
                self.other
                    .entry(key.clone())
                    .or_default()
                    .insert(url.to_string());
            }
        }
    }

    pub fn success(&self) -> &BTreeSet<String> {
        &self.success
    }

    pub fn not_found(&self) -> &BTreeSet<String> {
        &self.not_found
    }

    pub fn other(&self) -> &BTreeMap<FailureKey, BTreeSet<String>> {
        &self.other
    }

    pub fn bucket_of(&self, url: &str) -> Option<Bucket> {
        if self.success.contains(url) {
            return Some(Bucket::Success);
        }
        if self.not_found.contains(url) {
            return Some(Bucket::NotFound);
        }
        self.other
            .iter()
            .find(|(_, urls)| urls.contains(url))
            .map(|(key, _)| Bucket::Other(key.clone()))
    }

    /// Number of URLs across all buckets.
    pub fn settled_count(&self) -> usize {
        self.success.len()
            + self.not_found.len()
            + self.other.values().map(BTreeSet::len).sum::<usize>()
    }

    fn forget(&mut self, url: &str) {
        self.success.remove(url);
        self.not_found.remove(url);
        self.other.retain(|_, urls| {
            urls.remove(url);
            !urls.is_empty()
        });
    }
}
