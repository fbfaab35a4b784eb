//! # hint-rating
//!
//! Rates automatically generated "next edit" programming hints against a
//! gold standard of hints written by human tutors.
//!
//! Programs are trees ([`tree::Ast`]). A tutor hint and an algorithm's hint
//! both describe a transition from the student's current program to a
//! suggested one. Outcomes are matched to tutor hints after normalization
//! ([`normalize`]), fully when the canonical trees are equal and partially
//! when the outcome's edits ([`edits`]) are a subset of a tutor hint's.
//! Ratings are then aggregated per request and per assignment ([`rating`]).

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// What the rater needs to know about a programming environment
pub mod config;
/// Reading gold standards and hint sets from JSON datasets
pub mod dataset;
/// For tutor hints, algorithm outcomes, and the lookups over them
pub mod data;
/// Structural edits between two trees
pub mod edits;
/// Everything that can go wrong while rating
pub mod error;
/// Matching outcomes to tutor hints
pub mod matching;
/// Canonicalizing trees before comparison
pub mod normalize;
/// Aggregating ratings and running a rating pass
pub mod rating;
/// Flattening ratings into rows and tables
pub mod report;
/// The tree model and its serialized forms
pub mod tree;

pub use config::{RatingConfig, RatingSettings};
pub use error::{RatingError, Result};
pub use matching::{HintRating, MatchType};
pub use rating::{HintRatingSet, Rater, RatingOptions, RequestRating, rate};
pub use tree::Ast;
