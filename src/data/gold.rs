use std::{collections::BTreeMap, sync::Arc};

use itertools::Itertools;

use super::tutor::TutorHint;
use crate::{config::RatingConfig, tree::Ast};

/// Read access to the tutor-authored hints, grouped by assignment and
/// request.
pub trait GoldStandard: Send + Sync {
    /// Every assignment with at least one tutor hint, in a stable order.
    fn assignment_ids(&self) -> Vec<String>;

    /// Every request of an assignment, in a stable order.
    fn request_ids(&self, assignment_id: &str) -> Vec<String>;

    /// The tutor hints written for one request.
    fn valid_hints(&self, assignment_id: &str, request_id: &str) -> Vec<Arc<TutorHint>>;

    /// The student's state at the time of the request.
    fn request_node(&self, assignment_id: &str, request_id: &str) -> Option<Arc<Ast>> {
        self.valid_hints(assignment_id, request_id)
            .first()
            .map(|hint| Arc::clone(&hint.from))
    }
}

/// A gold standard held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGoldStandard {
    /// assignment id -> request id -> hints, in insertion order.
    map: BTreeMap<String, BTreeMap<String, Vec<Arc<TutorHint>>>>,
}

impl MemoryGoldStandard {
    /// Groups `hints` by assignment and request.
    pub fn new(hints: impl IntoIterator<Item = TutorHint>) -> Self {
        Self::from_shared(hints.into_iter().map(Arc::new))
    }

    /// Same as [`MemoryGoldStandard::new`] for hints that are already shared.
    pub fn from_shared(hints: impl IntoIterator<Item = Arc<TutorHint>>) -> Self {
        let mut standard = Self::default();
        for hint in hints {
            standard.add(hint);
        }
        standard
    }

    /// Adds one hint.
    pub fn add(&mut self, hint: Arc<TutorHint>) {
        self.map
            .entry(hint.assignment_id.clone())
            .or_default()
            .entry(hint.request_id.clone())
            .or_default()
            .push(hint);
    }

    /// Every hint, grouped by assignment then request.
    pub fn hints(&self) -> impl Iterator<Item = &Arc<TutorHint>> {
        self.map.values().flat_map(|requests| requests.values().flatten())
    }

    /// Number of hints across all assignments.
    pub fn len(&self) -> usize {
        self.hints().count()
    }

    /// Whether there are no hints at all.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Combines several gold standards into one.
    pub fn merge<'a>(standards: impl IntoIterator<Item = &'a MemoryGoldStandard>) -> Self {
        Self::from_shared(
            standards
                .into_iter()
                .flat_map(|standard| standard.hints().cloned().collect_vec()),
        )
    }

    /// A gold standard restricted to one assignment.
    pub fn filter_for_assignment(&self, assignment_id: &str) -> Self {
        Self::from_shared(
            self.hints()
                .filter(|hint| hint.assignment_id == assignment_id)
                .cloned(),
        )
    }

    /// Pretty prints the state of every request, assignment by assignment.
    pub fn render_request_nodes(&self, config: &dyn RatingConfig) -> String {
        let is_body_type = |t: &str| config.is_body_type(t);
        let mut out = String::new();
        for assignment_id in self.assignment_ids() {
            out.push_str(&format!(" ============= {assignment_id} ============= \n"));
            for request_id in self.request_ids(&assignment_id) {
                let Some(from) = self.request_node(&assignment_id, &request_id) else {
                    continue;
                };
                out.push_str(&format!("{request_id}\n"));
                out.push_str(&from.pretty_print(true, &is_body_type));
                out.push_str("\n----------------\n");
            }
        }
        out
    }
}

impl GoldStandard for MemoryGoldStandard {
    fn assignment_ids(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    fn request_ids(&self, assignment_id: &str) -> Vec<String> {
        self.map
            .get(assignment_id)
            .map(|requests| requests.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn valid_hints(&self, assignment_id: &str, request_id: &str) -> Vec<Arc<TutorHint>> {
        self.map
            .get(assignment_id)
            .and_then(|requests| requests.get(request_id))
            .cloned()
            .unwrap_or_default()
    }
}
