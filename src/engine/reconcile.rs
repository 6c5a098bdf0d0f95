use std::collections::HashMap;

use crate::probe::{Category, Evidence};

/// Running winner per category over an ordered evidence stream.
///
/// A later offer replaces the incumbent only with strictly greater
/// confidence, so on a tie the earlier probe keeps the category.
#[derive(Debug, Default)]
pub struct BestEvidence {
    best: HashMap<Category, Evidence>,
}

impl BestEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `evidence` became the new winner.
    pub fn offer(&mut self, evidence: Evidence) -> bool {
        match self.best.get(&evidence.category) {
            Some(current) if evidence.confidence <= current.confidence => false,
            _ => {
                self.best.insert(evidence.category, evidence);
                true
            }
        }
    }

    pub fn get(&self, category: Category) -> Option<&Evidence> {
        self.best.get(&category)
    }

    pub fn value(&self, category: Category) -> Option<&str> {
        self.get(category).map(|e| e.value.as_str())
    }
}

impl FromIterator<Evidence> for BestEvidence {
    fn from_iter<I: IntoIterator<Item = Evidence>>(iter: I) -> Self {
        let mut best = Self::new();
        for evidence in iter {
            best.offer(evidence);
        }
        best
    }
}
