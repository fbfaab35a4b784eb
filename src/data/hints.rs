use std::{collections::HashMap, sync::Arc};

use super::outcome::HintOutcome;

/// Read access to the outcomes an algorithm generated, by request.
pub trait HintSet: Send + Sync {
    /// Name of the algorithm that produced the hints.
    fn name(&self) -> &str;

    /// The outcomes generated for one request, in generation order.
    fn outcomes(&self, request_id: &str) -> Vec<Arc<HintOutcome>>;
}

/// A hint set held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHintSet {
    /// Algorithm name.
    name:     String,
    /// request id -> outcomes.
    outcomes: HashMap<String, Vec<Arc<HintOutcome>>>,
}

impl MemoryHintSet {
    /// Creates an empty hint set for the named algorithm.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:     name.into(),
            outcomes: HashMap::new(),
        }
    }

    /// Adds one outcome.
    pub fn add(&mut self, outcome: HintOutcome) {
        self.outcomes
            .entry(outcome.request_id.clone())
            .or_default()
            .push(Arc::new(outcome));
    }

    /// Adds every outcome.
    pub fn with_outcomes(mut self, outcomes: impl IntoIterator<Item = HintOutcome>) -> Self {
        for outcome in outcomes {
            self.add(outcome);
        }
        self
    }

    /// Total number of outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.values().map(Vec::len).sum()
    }

    /// Whether no outcome was generated at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HintSet for MemoryHintSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn outcomes(&self, request_id: &str) -> Vec<Arc<HintOutcome>> {
        self.outcomes.get(request_id).cloned().unwrap_or_default()
    }
}
