#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Matching an algorithm's outcomes to the tutor hints of the same request.
//!
//! An outcome fully matches a tutor hint when both canonical trees are
//! equal, and partially matches one when its edits are a subset of the
//! hint's edits.

use std::{collections::HashSet, fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    config::RatingConfig,
    data::{HintOutcome, Priority, TutorHint, Validity, sort_by_priority},
    edits::{Edit, EditExtractor, render_edits_comparison},
    error::{RatingError, Result},
    normalize::{normalize_new_values_to, prune_new_nodes_to},
    tree::{
        Ast,
        diff::{RenderOptions, diff},
    },
};

/// How closely an outcome corresponds to a tutor hint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum MatchType {
    /// No tutor hint corresponds.
    #[default]
    None,
    /// The outcome conveys part of a tutor hint.
    Partial,
    /// The outcome is a tutor hint, up to normalization and pruning.
    Full,
}

impl MatchType {
    /// Every match type, weakest first.
    pub const ALL: [MatchType; 3] = [MatchType::None, MatchType::Partial, MatchType::Full];

    /// Whether this match is `other` or stronger.
    pub fn is_at_least(self, other: MatchType) -> bool {
        self >= other
    }
}

impl Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The verdict for one outcome.
#[derive(Debug, Clone)]
pub struct HintRating {
    /// The rated outcome.
    pub outcome:    Arc<HintOutcome>,
    /// The tutor hint it matched, if any.
    pub matched:    Option<Arc<TutorHint>>,
    /// How closely it matched.
    pub match_type: MatchType,
}

impl HintRating {
    /// A rating for an outcome that matched nothing.
    pub fn unmatched(outcome: Arc<HintOutcome>) -> Self {
        Self {
            outcome,
            matched: None,
            match_type: MatchType::None,
        }
    }

    /// A rating for an outcome that matched `hint`.
    pub fn matched(outcome: Arc<HintOutcome>, hint: Arc<TutorHint>, match_type: MatchType) -> Self {
        Self {
            outcome,
            matched: Some(hint),
            match_type,
        }
    }

    /// Validity of the matched hint, `NoTutors` when unmatched.
    pub fn validity(&self) -> Validity {
        self.matched
            .as_ref()
            .map_or(Validity::NoTutors, |hint| hint.validity)
    }

    /// Priority of the matched hint.
    pub fn priority(&self) -> Option<Priority> {
        self.matched.as_ref().and_then(|hint| hint.priority)
    }

    /// Whether the matched hint was marked as too soon.
    pub fn is_too_soon(&self) -> bool {
        self.matched.as_ref().is_some_and(|hint| hint.is_too_soon())
    }
}

impl Display for HintRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {}: {} - {}",
            self.outcome.assignment_id,
            self.outcome.request_id,
            self.outcome.weight(),
            self.match_type
        )
    }
}

/// A tutor hint with the canonical forms used for matching.
#[derive(Debug, Clone)]
pub struct TutorCandidate {
    /// The hint.
    pub hint:   Arc<TutorHint>,
    /// Its *to* tree with new values normalized.
    normalized: Ast,
    /// `normalized`, additionally pruned.
    pruned:     Ast,
    /// Edits from the request state to `normalized`.
    edits:      HashSet<Edit>,
}

impl TutorCandidate {
    /// Edits from the request state to the normalized hint.
    pub fn edits(&self) -> &HashSet<Edit> {
        &self.edits
    }

    /// The normalized and pruned *to* tree.
    pub fn pruned(&self) -> &Ast {
        &self.pruned
    }
}

/// Matches the outcomes of one request against that request's tutor hints.
pub struct RequestMatcher<'a> {
    /// The request state shared by every hint.
    from:       Arc<Ast>,
    /// Type semantics.
    config:     &'a dyn RatingConfig,
    /// Edit extraction.
    extractor:  EditExtractor,
    /// Tutor hints, highest priority first.
    candidates: Vec<TutorCandidate>,
}

impl<'a> RequestMatcher<'a> {
    /// Prepares every hint of a request. Returns `None` when there are no
    /// hints to match against.
    pub fn new(valid_hints: &[Arc<TutorHint>], config: &'a dyn RatingConfig) -> Option<Self> {
        let from = Arc::clone(&valid_hints.first()?.from);
        let extractor = EditExtractor::new();
        let mut hints = valid_hints.to_vec();
        sort_by_priority(&mut hints);

        let candidates = hints
            .into_iter()
            .map(|hint| {
                let normalized = normalize_new_values_to(&from, &hint.to, config);
                let edits = extractor.get_edits(&from, &normalized);
                let mut pruned = normalized.copy();
                prune_new_nodes_to(&from, &mut pruned, config, &extractor);
                TutorCandidate {
                    hint,
                    normalized,
                    pruned,
                    edits,
                }
            })
            .collect();

        Some(Self {
            from,
            config,
            extractor,
            candidates,
        })
    }

    /// The request state.
    pub fn from(&self) -> &Arc<Ast> {
        &self.from
    }

    /// The prepared hints, highest priority first.
    pub fn candidates(&self) -> &[TutorCandidate] {
        &self.candidates
    }

    /// Renders a diff for diagnostics.
    fn render(&self, left: &Ast, right: &Ast, context: Option<usize>) -> String {
        let options = RenderOptions {
            context,
            ..RenderOptions::plain()
        };
        diff(left, right, self.config, options)
    }

    /// The first tutor hint, in priority order, that the outcome equals after
    /// normalization and pruning.
    ///
    /// Fails if an outcome identical to a tutor hint does not normalize to
    /// the same tree.
    pub fn find_full_match(&self, outcome: &Arc<HintOutcome>) -> Result<Option<HintRating>> {
        let mut outcome_node = normalize_new_values_to(&self.from, &outcome.result, self.config);
        prune_new_nodes_to(&self.from, &mut outcome_node, self.config, &self.extractor);

        for candidate in &self.candidates {
            if outcome_node == candidate.pruned {
                return Ok(Some(HintRating::matched(
                    Arc::clone(outcome),
                    Arc::clone(&candidate.hint),
                    MatchType::Full,
                )));
            }

            if outcome.result == candidate.hint.to {
                let diagnostics = format!(
                    "Matching hint:\n{}\nDifference in normalized nodes:\n{}\nTutor \
                     normalizing:\n{}\nOutcome normalizing:\n{}",
                    self.render(&candidate.hint.from, &outcome.result, None),
                    self.render(&candidate.pruned, &outcome_node, Some(2)),
                    self.render(&candidate.hint.to, &candidate.pruned, Some(2)),
                    self.render(&outcome.result, &outcome_node, Some(2)),
                );
                tracing::error!(
                    outcome = %outcome.id,
                    hint = candidate.hint.hint_id,
                    "normalized trees differ for identical hints"
                );
                return Err(RatingError::Inconsistent {
                    message: "Normalized nodes should be equal if nodes are equal!".into(),
                    diagnostics,
                });
            }
        }
        Ok(None)
    }

    /// The first tutor hint, in priority order, whose edits contain all of
    /// the outcome's edits.
    ///
    /// The outcome is only normalized here, not pruned. An outcome without
    /// edits matches nothing, and an overlap made only of deletions is not a
    /// partial match, since it conveys nothing constructive. Fails if the
    /// edits are identical, since the full match pass should have caught
    /// that.
    pub fn find_partial_match(&self, outcome: &Arc<HintOutcome>) -> Result<HintRating> {
        let outcome_node = normalize_new_values_to(&self.from, &outcome.result, self.config);
        let outcome_edits = self.extractor.get_edits(&self.from, &outcome_node);
        if outcome_edits.is_empty() {
            return Ok(HintRating::unmatched(Arc::clone(outcome)));
        }

        for candidate in &self.candidates {
            if candidate.edits.is_empty() {
                continue;
            }
            let overlap: Vec<&Edit> = candidate.edits.intersection(&outcome_edits).collect();
            if overlap.len() != outcome_edits.len() {
                continue;
            }

            if overlap.len() == candidate.edits.len() {
                let diagnostics = format!(
                    "Tutor hint:\n{}\nAlg hint:\n{}\n{}",
                    self.render(&self.from, &candidate.normalized, None),
                    self.render(&self.from, &outcome_node, None),
                    render_edits_comparison(&candidate.edits, &outcome_edits, "Tutor Hint", "Alg Hint"),
                );
                tracing::error!(
                    outcome = %outcome.id,
                    hint = candidate.hint.hint_id,
                    "identical edit sets without a full match"
                );
                return Err(RatingError::Inconsistent {
                    message: "Edits should not match if hint outcomes did not!".into(),
                    diagnostics,
                });
            }

            if overlap.iter().all(|edit| edit.is_deletion()) {
                tracing::debug!(
                    outcome = %outcome.id,
                    hint = candidate.hint.hint_id,
                    "overlap is only deletions, not a partial match"
                );
                return Ok(HintRating::unmatched(Arc::clone(outcome)));
            }

            return Ok(HintRating::matched(
                Arc::clone(outcome),
                Arc::clone(&candidate.hint),
                MatchType::Partial,
            ));
        }

        Ok(HintRating::unmatched(Arc::clone(outcome)))
    }

    /// Rates every outcome of the request.
    ///
    /// All full matches are resolved before any partial match is attempted,
    /// so an outcome that only overlaps a tutor hint cannot take it from an
    /// outcome that reproduces it exactly. Ratings come back in input order
    /// within each pass.
    pub fn rate_outcomes(&self, outcomes: &[Arc<HintOutcome>]) -> Result<Vec<HintRating>> {
        let mut ratings = Vec::with_capacity(outcomes.len());
        let mut unmatched = Vec::new();

        for outcome in outcomes {
            match self.find_full_match(outcome)? {
                Some(rating) => ratings.push(rating),
                None => unmatched.push(outcome),
            }
        }
        for outcome in unmatched {
            ratings.push(self.find_partial_match(outcome)?);
        }

        Ok(ratings)
    }
}

/// Looks for a tutor hint the outcome fully matches. See
/// [`RequestMatcher::find_full_match`].
pub fn find_matching_edit(
    valid_hints: &[Arc<TutorHint>],
    outcome: &Arc<HintOutcome>,
    config: &dyn RatingConfig,
) -> Result<Option<HintRating>> {
    match RequestMatcher::new(valid_hints, config) {
        Some(matcher) => matcher.find_full_match(outcome),
        None => Ok(None),
    }
}

/// Looks for a tutor hint the outcome partially matches. See
/// [`RequestMatcher::find_partial_match`].
pub fn find_partially_matching_edit(
    valid_hints: &[Arc<TutorHint>],
    outcome: &Arc<HintOutcome>,
    config: &dyn RatingConfig,
) -> Result<HintRating> {
    match RequestMatcher::new(valid_hints, config) {
        Some(matcher) => matcher.find_partial_match(outcome),
        None => Ok(HintRating::unmatched(Arc::clone(outcome))),
    }
}
