#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Flattens ratings into rows for JSON output and summary tables.

use std::{collections::BTreeMap, path::Path};

use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, object::Rows},
};

use crate::{
    config::RatingConfig,
    data::Validity,
    error::{RatingError, Result},
    matching::MatchType,
    rating::{HintRatingSet, RequestRating, validity_labels},
    tree::diff::{ColorStyle, RenderOptions},
};

/// One row per rated outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRow {
    /// The rated algorithm.
    pub algorithm:     String,
    /// Assignment of the request.
    pub assignment_id: String,
    /// The request.
    pub request_id:    String,
    /// Outcome id, empty for the placeholder row of an empty request.
    pub hint_id:       String,
    /// Position in the sorted request rating.
    pub order:         usize,
    /// Outcome weight.
    pub weight:        f64,
    /// Outcome weight over the request's total weight.
    pub weight_norm:   f64,
    /// Id of the matched tutor hint.
    pub match_id:      Option<i64>,
    /// Validity code of the matched tutor hint.
    pub validity:      Option<u8>,
    /// Priority code of the matched tutor hint.
    pub priority:      Option<u8>,
    /// How the outcome matched.
    #[serde(rename = "type")]
    pub match_type:    MatchType,
    /// The outcome tree as JSON.
    pub outcome:       String,
    /// The suggested edit as HTML markup.
    pub diff:          String,
    /// Debugging properties, keyed `p_<name>`.
    #[serde(flatten)]
    pub properties:    BTreeMap<String, String>,
}

impl HintRow {
    /// The rows for every outcome of a request, or a single placeholder row
    /// when the algorithm generated nothing.
    pub fn for_request(algorithm: &str, request: &RequestRating, config: &dyn RatingConfig) -> Vec<Self> {
        if request.is_empty() {
            return vec![Self {
                algorithm:     algorithm.to_string(),
                assignment_id: request.assignment_id.clone(),
                request_id:    request.request_id.clone(),
                hint_id:       String::new(),
                order:         0,
                weight:        1.0,
                weight_norm:   1.0,
                match_id:      None,
                validity:      None,
                priority:      None,
                match_type:    MatchType::None,
                outcome:       String::new(),
                diff:          String::new(),
                properties:    BTreeMap::new(),
            }];
        }

        let total = request.total_weight();
        let options = RenderOptions::plain().with_style(ColorStyle::Html);
        request
            .ratings()
            .iter()
            .enumerate()
            .map(|(order, rating)| {
                let outcome = &rating.outcome;
                Self {
                    algorithm: algorithm.to_string(),
                    assignment_id: request.assignment_id.clone(),
                    request_id: request.request_id.clone(),
                    hint_id: outcome.id.clone(),
                    order,
                    weight: outcome.weight(),
                    weight_norm: if total > 0.0 { outcome.weight() / total } else { 0.0 },
                    match_id: rating.matched.as_ref().map(|hint| hint.hint_id),
                    validity: rating.matched.as_ref().map(|hint| hint.validity.value()),
                    priority: rating.priority().map(|p| p.value()),
                    match_type: rating.match_type,
                    outcome: outcome.result.to_json_string(),
                    diff: outcome.result_diff(&request.from, config, options),
                    properties: outcome
                        .properties
                        .iter()
                        .map(|(key, value)| (format!("p_{key}"), value.clone()))
                        .collect(),
                }
            })
            .collect()
    }
}

/// One row per rated request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRow {
    /// The rated algorithm.
    pub algorithm:        String,
    /// Assignment of the request.
    pub assignment_id:    String,
    /// The request.
    pub request_id:       String,
    /// Sum of outcome weights.
    pub total_weight:     f64,
    /// Number of outcomes.
    pub total_count:      usize,
    /// Priority score over full matches.
    pub priority_full:    f64,
    /// Priority score over full and partial matches.
    pub priority_partial: f64,
    /// Coverage per `<Validity>_<MatchType>` column, with its
    /// `_validWeight` and `_validCount`.
    #[serde(flatten)]
    pub scores:           BTreeMap<String, f64>,
}

impl RequestRow {
    /// Flattens one request rating.
    pub fn new(algorithm: &str, request: &RequestRating) -> Self {
        let mut scores = BTreeMap::new();
        let labels = validity_labels();
        let fractions = request.validity_array();
        let pairs = Validity::ALL
            .into_iter()
            .filter(|v| *v != Validity::NoTutors)
            .flat_map(|v| [MatchType::Full, MatchType::Partial].map(|m| (v, m)));

        for ((label, fraction), (validity, match_type)) in labels.into_iter().zip(fractions).zip(pairs) {
            scores.insert(
                format!("{label}_validWeight"),
                request.validity_weight(match_type, validity, true),
            );
            scores.insert(
                format!("{label}_validCount"),
                request.validity_weight(match_type, validity, false),
            );
            scores.insert(label, fraction);
        }

        Self {
            algorithm: algorithm.to_string(),
            assignment_id: request.assignment_id.clone(),
            request_id: request.request_id.clone(),
            total_weight: request.total_weight(),
            total_count: request.len(),
            priority_full: request.priority_score(false),
            priority_partial: request.priority_score(true),
            scores,
        }
    }
}

/// Every hint row of a rating set.
pub fn hint_rows(set: &HintRatingSet, config: &dyn RatingConfig) -> Vec<HintRow> {
    set.requests
        .iter()
        .flat_map(|request| HintRow::for_request(&set.name, request, config))
        .collect()
}

/// Every request row of a rating set.
pub fn request_rows(set: &HintRatingSet) -> Vec<RequestRow> {
    set.requests
        .iter()
        .map(|request| RequestRow::new(&set.name, request))
        .collect()
}

/// A line of the summary table.
#[derive(Tabled, Clone, Debug)]
struct SummaryRow {
    /// Rated algorithm.
    #[tabled(rename = "Algorithm")]
    algorithm:        String,
    /// Assignment.
    #[tabled(rename = "Assignment")]
    assignment:       String,
    /// Requests averaged.
    #[tabled(rename = "Requests")]
    requests:         usize,
    /// Mean coverage array.
    #[tabled(rename = "Coverage")]
    coverage:         String,
    /// Mean full-match priority.
    #[tabled(rename = "Priority (full)")]
    priority_full:    String,
    /// Mean full and partial priority.
    #[tabled(rename = "Priority (partial)")]
    priority_partial: String,
}

/// Renders per-assignment means for every rating set.
pub fn summary_table(sets: &[HintRatingSet]) -> String {
    let rows: Vec<SummaryRow> = sets
        .iter()
        .flat_map(|set| {
            set.summaries().into_iter().map(|summary| SummaryRow {
                algorithm:        set.name.clone(),
                assignment:       summary.assignment_id,
                requests:         summary.requests,
                coverage:         summary
                    .validity
                    .iter()
                    .map(|v| format!("{v:.2}"))
                    .collect::<Vec<_>>()
                    .join(" "),
                priority_full:    format!("{:.3}", summary.priority_full),
                priority_partial: format!("{:.3}", summary.priority_partial),
            })
        })
        .collect();

    Table::new(&rows)
        .with(Panel::header(format!("Coverage columns: {}", validity_labels().join(" "))))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// Writes rows as a pretty printed JSON array.
pub fn write_json<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(rows).map_err(|source| RatingError::Json {
        what: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| RatingError::Io {
        path: path.display().to_string(),
        source,
    })
}
