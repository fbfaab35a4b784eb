#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Rating an algorithm's hint set against the gold standard, and
//! aggregating the verdicts into coverage and priority scores.

use std::{cmp::Ordering, fmt::Display, sync::Arc};

use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::{
    config::RatingConfig,
    data::{GoldStandard, HintSet, Validity},
    error::Result,
    matching::{HintRating, MatchType, RequestMatcher},
    tree::{
        Ast,
        diff::{RenderOptions, diff},
    },
};

/// Match types that count towards coverage, strongest first.
const COUNTED_MATCHES: [MatchType; 2] = [MatchType::Full, MatchType::Partial];

/// Validity tiers that count towards coverage, lowest first.
fn counted_validities() -> impl Iterator<Item = Validity> {
    Validity::ALL.into_iter().filter(|v| *v != Validity::NoTutors)
}

/// Column labels for [`RequestRating::validity_array`], in the same order.
pub fn validity_labels() -> Vec<String> {
    counted_validities()
        .flat_map(|validity| {
            COUNTED_MATCHES
                .iter()
                .map(move |match_type| format!("{validity}_{match_type}"))
        })
        .collect()
}

/// Formats a validity array the way summaries show it.
fn format_array(values: &[f64]) -> String {
    format!("[{}]", values.iter().map(|v| format!("{v:.2}")).join(", "))
}

/// Every verdict for one hint request.
#[derive(Debug, Clone)]
pub struct RequestRating {
    /// The assignment the request belongs to.
    pub assignment_id: String,
    /// The request.
    pub request_id:    String,
    /// The student's state at the time of the request.
    pub from:          Arc<Ast>,
    /// Ratings, matched ones first in tutor priority order.
    ratings:           Vec<HintRating>,
}

impl RequestRating {
    /// Collects ratings for a request and sorts them.
    pub fn new(
        assignment_id: impl Into<String>,
        request_id: impl Into<String>,
        from: Arc<Ast>,
        ratings: Vec<HintRating>,
    ) -> Self {
        let mut rating = Self {
            assignment_id: assignment_id.into(),
            request_id: request_id.into(),
            from,
            ratings,
        };
        rating.sort();
        rating
    }

    /// The ratings, matched ones first in tutor priority order.
    pub fn ratings(&self) -> &[HintRating] {
        &self.ratings
    }

    /// Number of rated outcomes.
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    /// Whether the algorithm generated nothing for this request.
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Orders matched ratings by the priority of their tutor hint, keeping
    /// unmatched ratings last in their original order.
    fn sort(&mut self) {
        self.ratings
            .sort_by(|a, b| match (&a.matched, &b.matched) {
                (Some(a), Some(b)) => a.priority_order(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
    }

    /// Sum of outcome weights.
    pub fn total_weight(&self) -> f64 {
        self.ratings.iter().map(|r| r.outcome.weight()).sum()
    }

    /// Weight, or count when `use_weights` is off, of the outcomes matched
    /// at least as `min_match` to a hint of at least `min_validity`. Matches
    /// to hints marked too soon never count.
    pub fn validity_weight(&self, min_match: MatchType, min_validity: Validity, use_weights: bool) -> f64 {
        self.ratings
            .iter()
            .filter(|r| !r.is_too_soon())
            .filter(|r| r.match_type.is_at_least(min_match) && r.validity().is_at_least(min_validity))
            .map(|r| if use_weights { r.outcome.weight() } else { 1.0 })
            .sum()
    }

    /// Share of outcome weight covered, per counted validity tier and match
    /// type, in the order of [`validity_labels`]. All zeros for an empty
    /// request.
    pub fn validity_array(&self) -> Vec<f64> {
        let total = self.total_weight();
        counted_validities()
            .flat_map(|validity| COUNTED_MATCHES.iter().map(move |m| (validity, *m)))
            .map(|(validity, match_type)| {
                if total > 0.0 {
                    self.validity_weight(match_type, validity, true) / total
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Weight-normalized sum of the priority points of matched tutor hints.
    /// Only full matches count unless `count_partial` is set.
    pub fn priority_score(&self, count_partial: bool) -> f64 {
        let total = self.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        let minimum = if count_partial {
            MatchType::Partial
        } else {
            MatchType::Full
        };
        let score: f64 = self
            .ratings
            .iter()
            .filter(|r| r.match_type.is_at_least(minimum))
            .filter_map(|r| r.priority().map(|p| r.outcome.weight() * p.points()))
            .sum();
        score / total
    }

    /// One line summary: coverage then priority scores.
    pub fn summary_line(&self) -> String {
        format!(
            "{}: {}v / {:.3} ({:.3})p",
            self.request_id,
            format_array(&self.validity_array()),
            self.priority_score(false),
            self.priority_score(true)
        )
    }

    /// Lists every rated outcome with its diff, grouped by match type, with
    /// outcomes matching "too soon" hints in their own section.
    pub fn render_ratings(&self, config: &dyn RatingConfig, options: RenderOptions) -> String {
        let is_body_type = |t: &str| config.is_body_type(t);
        let mut out = format!(
            "=-=-=-=-=-=-=-=-=-=-=-= {} ({}) =-=-=-=-=-=-=-=-=-=-=-=\n{}\n",
            self.request_id,
            self.assignment_id,
            self.from.pretty_print(true, &is_body_type)
        );

        let mut section = |title: &str, ratings: Vec<&HintRating>| {
            if ratings.is_empty() {
                return;
            }
            out.push_str(&format!(" ==== {title} ==== \n"));
            for rating in ratings {
                let matched = rating
                    .matched
                    .as_ref()
                    .map(|hint| format!(" -> tutor hint {} ({}, {:?})", hint.hint_id, hint.validity, hint.priority))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "Hint {} (weight {:.3}){matched}\n{}\n",
                    rating.outcome.id,
                    rating.outcome.weight(),
                    diff(&self.from, &rating.outcome.result, config, options)
                ));
            }
        };

        for match_type in MatchType::ALL.into_iter().rev() {
            section(
                &match_type.to_string(),
                self.ratings
                    .iter()
                    .filter(|r| r.match_type == match_type && !r.is_too_soon())
                    .collect(),
            );
        }
        section("Too Soon", self.ratings.iter().filter(|r| r.is_too_soon()).collect());
        out
    }
}

/// Averages over the rated requests of one assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSummary {
    /// The assignment.
    pub assignment_id:    String,
    /// Number of rated requests averaged.
    pub requests:         usize,
    /// Mean validity array.
    pub validity:         Vec<f64>,
    /// Mean priority score over full matches.
    pub priority_full:    f64,
    /// Mean priority score over full and partial matches.
    pub priority_partial: f64,
}

impl Display for AssignmentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TOTAL {} ({} requests): {}v / {:.3} ({:.3})p",
            self.assignment_id,
            self.requests,
            format_array(&self.validity),
            self.priority_full,
            self.priority_partial
        )
    }
}

/// Every request rating produced for one algorithm.
#[derive(Debug, Clone, Default)]
pub struct HintRatingSet {
    /// Name of the rated algorithm.
    pub name:     String,
    /// Request ratings in gold standard order.
    pub requests: Vec<RequestRating>,
}

impl HintRatingSet {
    /// An empty set for the named algorithm.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name:     name.into(),
            requests: Vec::new(),
        }
    }

    /// Adds a request rating.
    pub fn push(&mut self, request: RequestRating) {
        self.requests.push(request);
    }

    /// The request ratings of one assignment.
    pub fn for_assignment<'a>(&'a self, assignment_id: &'a str) -> impl Iterator<Item = &'a RequestRating> {
        self.requests
            .iter()
            .filter(move |r| r.assignment_id == assignment_id)
    }

    /// Means over the requests of one assignment, `None` if none were rated.
    pub fn assignment_summary(&self, assignment_id: &str) -> Option<AssignmentSummary> {
        let requests: Vec<&RequestRating> = self.for_assignment(assignment_id).collect();
        if requests.is_empty() {
            return None;
        }
        let count = requests.len() as f64;

        let mut validity = vec![0.0; validity_labels().len()];
        for request in &requests {
            for (sum, value) in validity.iter_mut().zip(request.validity_array()) {
                *sum += value;
            }
        }
        validity.iter_mut().for_each(|v| *v /= count);

        Some(AssignmentSummary {
            assignment_id: assignment_id.to_string(),
            requests: requests.len(),
            validity,
            priority_full: requests.iter().map(|r| r.priority_score(false)).sum::<f64>() / count,
            priority_partial: requests.iter().map(|r| r.priority_score(true)).sum::<f64>() / count,
        })
    }

    /// Summaries for every assignment, in the order first seen.
    pub fn summaries(&self) -> Vec<AssignmentSummary> {
        self.requests
            .iter()
            .map(|r| r.assignment_id.as_str())
            .unique()
            .filter_map(|a| self.assignment_summary(a))
            .collect()
    }
}

/// Options for a rating run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct RatingOptions {
    /// Log every rating with its diff.
    #[builder(default)]
    pub debug:    bool,
    /// Rate the requests of an assignment in parallel.
    #[builder(default = true)]
    pub parallel: bool,
}

impl Default for RatingOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Rates hint sets against a gold standard.
#[derive(TypedBuilder)]
pub struct Rater<'a> {
    /// Type semantics of the programming environment.
    config:  &'a dyn RatingConfig,
    /// Run options.
    #[builder(default)]
    options: RatingOptions,
}

impl Rater<'_> {
    /// Rates one request. Returns `None` when no tutor hint for it reaches the
    /// required validity.
    pub fn rate_request(
        &self,
        standard: &dyn GoldStandard,
        hint_set: &dyn HintSet,
        assignment_id: &str,
        request_id: &str,
    ) -> Result<Option<RequestRating>> {
        let hints = standard.valid_hints(assignment_id, request_id);
        let required = self.config.highest_required_validity();
        if !hints.iter().any(|h| h.validity.is_at_least(required)) {
            debug!(request = request_id, %required, "skipping request without a valid enough hint");
            return Ok(None);
        }
        let Some(matcher) = RequestMatcher::new(&hints, self.config) else {
            return Ok(None);
        };

        let outcomes = hint_set.outcomes(request_id);
        if outcomes.is_empty() {
            warn!(request = request_id, algorithm = hint_set.name(), "no hints generated");
        }
        let ratings = matcher.rate_outcomes(&outcomes)?;

        Ok(Some(RequestRating::new(
            assignment_id,
            request_id,
            Arc::clone(matcher.from()),
            ratings,
        )))
    }

    /// Rates every request of the gold standard, assignment by assignment.
    pub fn rate(&self, standard: &dyn GoldStandard, hint_set: &dyn HintSet) -> Result<HintRatingSet> {
        let mut set = HintRatingSet::new(hint_set.name());

        for assignment_id in standard.assignment_ids() {
            info!(assignment = %assignment_id, algorithm = hint_set.name(), "rating");
            let request_ids = standard.request_ids(&assignment_id);
            let rate_one =
                |request_id: &String| self.rate_request(standard, hint_set, &assignment_id, request_id);

            let rated: Vec<Option<RequestRating>> = if self.options.parallel {
                request_ids.par_iter().map(rate_one).collect::<Result<_>>()?
            } else {
                request_ids.iter().map(rate_one).collect::<Result<_>>()?
            };

            for request in rated.into_iter().flatten() {
                info!("{}", request.summary_line());
                if self.options.debug {
                    info!("\n{}", request.render_ratings(self.config, RenderOptions::plain()));
                }
                set.push(request);
            }

            if let Some(summary) = set.assignment_summary(&assignment_id) {
                info!("{summary}");
            }
        }

        Ok(set)
    }
}

/// Rates `hint_set` against `standard` with default options.
pub fn rate(
    standard: &dyn GoldStandard,
    hint_set: &dyn HintSet,
    config: &dyn RatingConfig,
) -> Result<HintRatingSet> {
    Rater::builder().config(config).build().rate(standard, hint_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RatingSettings,
        data::{HintOutcome, MemoryGoldStandard, MemoryHintSet, Priority, TutorHint},
    };

    const FROM: &str = r#"{"type":"script","id":"s","children":{"0":{"type":"move","id":"m"}}}"#;
    const TURN: &str =
        r#"{"type":"script","id":"s","children":{"0":{"type":"move","id":"m"},"1":{"type":"turn"}}}"#;
    const SAY: &str =
        r#"{"type":"script","id":"s","children":{"0":{"type":"move","id":"m"},"1":{"type":"say"}}}"#;
    const EMPTY: &str = r#"{"type":"script","id":"s"}"#;

    fn tree(source: &str) -> Ast {
        Ast::parse(source).expect("tree")
    }

    fn tutor(request: &str, hint_id: i64, to: &str, validity: Validity, priority: Priority) -> TutorHint {
        TutorHint::builder()
            .hint_id(hint_id)
            .request_id(request)
            .assignment_id("a")
            .from(Arc::new(tree(FROM)))
            .to(tree(to))
            .validity(validity)
            .priority(priority)
            .build()
    }

    fn outcome(request: &str, id: &str, weight: f64, result: &str) -> HintOutcome {
        HintOutcome::builder()
            .id(id)
            .assignment_id("a")
            .request_id(request)
            .weight(weight)
            .result(tree(result))
            .build()
    }

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-9
    }

    fn rate_one(hint: TutorHint, outcomes: Vec<HintOutcome>) -> RequestRating {
        let standard = MemoryGoldStandard::new([hint]);
        let hints = MemoryHintSet::new("alg").with_outcomes(outcomes);
        let set = rate(&standard, &hints, &RatingSettings::snap()).expect("rating");
        set.requests.into_iter().next().expect("one request")
    }

    #[test]
    fn coverage_is_weight_normalized() {
        let request = rate_one(
            tutor("r", 1, TURN, Validity::MultipleTutors, Priority::High),
            vec![
                outcome("r", "match", 3.0, TURN),
                outcome("r", "other", 1.0, SAY),
                outcome("r", "delete", 1.0, EMPTY),
            ],
        );
        assert!(close(request.total_weight(), 5.0));
        assert!(close(
            request.validity_weight(MatchType::Full, Validity::MultipleTutors, true) / request.total_weight(),
            3.0 / 5.0
        ));
        assert!(close(
            request.validity_weight(MatchType::Full, Validity::MultipleTutors, false),
            1.0
        ));

        let array = request.validity_array();
        assert_eq!(array.len(), validity_labels().len());
        assert!(close(array[0], 0.6));
        assert!(close(array[3], 0.6));
        assert!(close(array[4], 0.0));
        assert!(close(request.priority_score(false), 3.0 * 2.0 / 5.0));
    }

    #[test]
    fn hints_differing_in_fresh_ids_rate_without_error() {
        let with_id = |id: &str| {
            format!(r#"{{"type":"script","id":"s","children":{{"0":{{"type":"move","id":"m"}},"1":{{"type":"turn","id":"{id}"}}}}}}"#)
        };
        let standard = MemoryGoldStandard::new([tutor(
            "r",
            1,
            &with_id("tutor-7"),
            Validity::MultipleTutors,
            Priority::High,
        )]);
        let hints = MemoryHintSet::new("alg").with_outcomes([outcome("r", "o", 1.0, &with_id("alg-42"))]);
        let set = rate(&standard, &hints, &RatingSettings::snap()).expect("rating");
        assert_eq!(set.requests[0].ratings()[0].match_type, MatchType::Full);
    }

    #[test]
    fn matched_ratings_come_first() {
        let request = rate_one(
            tutor("r", 1, TURN, Validity::MultipleTutors, Priority::High),
            vec![outcome("r", "other", 1.0, SAY), outcome("r", "match", 1.0, TURN)],
        );
        let ids: Vec<_> = request.ratings().iter().map(|r| r.outcome.id.as_str()).collect();
        assert_eq!(ids, ["match", "other"]);
    }

    #[test]
    fn too_soon_matches_do_not_count() {
        let request = rate_one(
            tutor("r", 1, TURN, Validity::Consensus, Priority::TooSoon),
            vec![outcome("r", "match", 1.0, TURN)],
        );
        assert_eq!(request.ratings()[0].match_type, MatchType::Full);
        assert!(request.validity_array().iter().all(|v| *v == 0.0));
        assert!(close(request.priority_score(true), 0.0));
    }

    #[test]
    fn empty_requests_score_zero() {
        let request = rate_one(tutor("r", 1, TURN, Validity::MultipleTutors, Priority::High), vec![]);
        assert!(request.is_empty());
        assert!(request.validity_array().iter().all(|v| *v == 0.0));
        assert!(close(request.priority_score(false), 0.0));
    }

    #[test]
    fn requests_below_required_validity_are_skipped() {
        let standard = MemoryGoldStandard::new([tutor("r", 1, TURN, Validity::OneTutor, Priority::High)]);
        let hints = MemoryHintSet::new("alg").with_outcomes([outcome("r", "o", 1.0, TURN)]);
        let set = rate(&standard, &hints, &RatingSettings::snap()).expect("rating");
        assert!(set.requests.is_empty());
        assert!(set.assignment_summary("a").is_none());
    }

    #[test]
    fn summaries_average_over_an_assignment() {
        let standard = MemoryGoldStandard::new([
            tutor("r1", 1, TURN, Validity::MultipleTutors, Priority::Highest),
            tutor("r2", 2, TURN, Validity::MultipleTutors, Priority::Highest),
        ]);
        let hints = MemoryHintSet::new("alg").with_outcomes([
            outcome("r1", "hit", 1.0, TURN),
            outcome("r2", "miss", 1.0, SAY),
        ]);

        let sequential = Rater::builder()
            .config(&RatingSettings::snap())
            .options(RatingOptions::builder().parallel(false).build())
            .build()
            .rate(&standard, &hints)
            .expect("rating");
        let parallel = rate(&standard, &hints, &RatingSettings::snap()).expect("rating");

        let summary = parallel.assignment_summary("a").expect("summary");
        assert_eq!(summary.requests, 2);
        assert!(close(summary.validity[0], 0.5));
        assert!(close(summary.priority_full, 1.5));
        assert_eq!(sequential.summaries(), parallel.summaries());
    }
}
