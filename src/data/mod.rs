#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// The tutor-authored gold standard.
pub mod gold;
/// Algorithm hint sets.
pub mod hints;
/// Algorithm-generated hint outcomes.
pub mod outcome;
/// Tutor hints and their classifications.
pub mod tutor;

pub use gold::{GoldStandard, MemoryGoldStandard};
pub use hints::{HintSet, MemoryHintSet};
pub use outcome::HintOutcome;
pub use tutor::{Priority, TutorHint, Validity, sort_by_priority};
