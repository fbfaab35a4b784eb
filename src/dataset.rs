#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Loads a gold standard and algorithm hint sets from one JSON document:
//!
//! ```json
//! { "goldStandard": [ { "assignmentId": "...", "requestId": "...", "hintId": 1,
//!                       "validity": ["OneTutor"], "priority": 2,
//!                       "from": { ... }, "to": { ... } } ],
//!   "algorithms":   [ { "name": "...", "outcomes": [ { "id": "...", "assignmentId": "...",
//!                       "requestId": "...", "weight": 1.0, "result": { ... } } ] } ] }
//! ```
//!
//! Trees are either embedded objects or JSON-encoded strings. A gold row
//! may omit `from`, in which case the previous row's tree is reused as long
//! as it belongs to the same request.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    data::{HintOutcome, MemoryGoldStandard, MemoryHintSet, Priority, TutorHint, Validity},
    error::{RatingError, Result},
    tree::Ast,
};

/// A gold standard row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldRecord {
    /// Assignment of the request.
    pub assignment_id: String,
    /// The request.
    pub request_id:    String,
    /// Hint id.
    pub hint_id:       i64,
    /// Dataset year.
    #[serde(default)]
    pub year:          String,
    /// Author, when known.
    #[serde(default)]
    pub tutor:         Option<String>,
    /// Every validity flag annotated for the hint.
    #[serde(default)]
    pub validity:      Vec<Validity>,
    /// Priority code, 1 to 4.
    #[serde(default)]
    pub priority:      Option<i64>,
    /// The request state, on the first row of a request.
    #[serde(default)]
    pub from:          Option<Value>,
    /// The tutor's suggested state.
    pub to:            Value,
}

/// An outcome row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    /// Outcome id.
    pub id:            String,
    /// Assignment of the request.
    pub assignment_id: String,
    /// The request.
    pub request_id:    String,
    /// Relative confidence.
    #[serde(default = "default_weight")]
    pub weight:        f64,
    /// The suggested state.
    pub result:        Value,
    /// Debugging properties; non-string values are kept as JSON text.
    #[serde(default)]
    pub properties:    BTreeMap<String, Value>,
}

/// Outcomes default to equal weight.
fn default_weight() -> f64 {
    1.0
}

/// One algorithm's outcomes.
#[derive(Debug, Clone, Deserialize)]
pub struct AlgorithmRecord {
    /// Algorithm name.
    pub name:     String,
    /// Generated outcomes.
    #[serde(default)]
    pub outcomes: Vec<OutcomeRecord>,
}

/// A whole dataset file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Tutor hints.
    #[serde(default)]
    pub gold_standard: Vec<GoldRecord>,
    /// Rated algorithms.
    #[serde(default)]
    pub algorithms:    Vec<AlgorithmRecord>,
}

/// Parses a tree given as an object or as JSON text.
fn tree_from_value(value: &Value) -> Result<Ast> {
    match value {
        Value::String(source) => Ast::parse(source),
        other => Ast::from_json(other),
    }
}

impl Dataset {
    /// Parses a dataset document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|source| RatingError::Json {
            what: "dataset".into(),
            source,
        })
    }

    /// Reads a dataset file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| RatingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    /// Builds the gold standard. Rows of one request share one `from` tree.
    pub fn gold_standard(&self) -> Result<MemoryGoldStandard> {
        let mut standard = MemoryGoldStandard::default();
        let mut last_from: Option<(String, String, Arc<Ast>)> = None;

        for record in &self.gold_standard {
            let from = match &record.from {
                Some(value) if !value.is_null() => {
                    let tree = Arc::new(tree_from_value(value)?);
                    last_from = Some((
                        record.assignment_id.clone(),
                        record.request_id.clone(),
                        Arc::clone(&tree),
                    ));
                    tree
                }
                _ => match &last_from {
                    Some((assignment, request, tree))
                        if *assignment == record.assignment_id && *request == record.request_id =>
                    {
                        Arc::clone(tree)
                    }
                    _ => {
                        return Err(RatingError::missing(
                            "from",
                            format!(
                                "gold standard hint {} ({}/{})",
                                record.hint_id, record.assignment_id, record.request_id
                            ),
                        ));
                    }
                },
            };

            let mut hint = TutorHint::builder()
                .hint_id(record.hint_id)
                .request_id(record.request_id.clone())
                .assignment_id(record.assignment_id.clone())
                .year(record.year.clone())
                .from(from)
                .to(tree_from_value(&record.to)?)
                .validity(Validity::highest_of(record.validity.iter().copied()))
                .build();
            if let Some(tutor) = &record.tutor {
                hint.tutor = tutor.clone();
            }
            hint.priority = record.priority.map(Priority::from_int).transpose()?;
            standard.add(Arc::new(hint));
        }

        Ok(standard)
    }

    /// Builds one hint set per algorithm.
    pub fn hint_sets(&self) -> Result<Vec<MemoryHintSet>> {
        self.algorithms
            .iter()
            .map(|algorithm| {
                let mut set = MemoryHintSet::new(algorithm.name.clone());
                for record in &algorithm.outcomes {
                    let properties = record
                        .properties
                        .iter()
                        .map(|(key, value)| {
                            let text = match value {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            (key.clone(), text)
                        })
                        .collect();
                    set.add(
                        HintOutcome::builder()
                            .id(record.id.clone())
                            .assignment_id(record.assignment_id.clone())
                            .request_id(record.request_id.clone())
                            .weight(record.weight)
                            .result(tree_from_value(&record.result)?)
                            .properties(properties)
                            .build(),
                    );
                }
                Ok(set)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GoldStandard, HintSet};

    #[test]
    fn later_rows_reuse_the_request_state() {
        let dataset = Dataset::from_json_str(
            r#"{"goldStandard":[
                {"assignmentId":"a","requestId":"r","hintId":1,"validity":["OneTutor","MultipleTutors"],
                 "priority":1,"from":{"type":"script"},"to":"{\"type\":\"script\",\"children\":{\"0\":{\"type\":\"move\"}}}"},
                {"assignmentId":"a","requestId":"r","hintId":2,"to":{"type":"script"}}]}"#,
        )
        .expect("dataset");
        let standard = dataset.gold_standard().expect("gold standard");
        let hints = standard.valid_hints("a", "r");
        assert_eq!(hints.len(), 2);
        assert!(Arc::ptr_eq(&hints[0].from, &hints[1].from));
        assert_eq!(hints[0].validity, Validity::MultipleTutors);
        assert_eq!(hints[0].priority, Some(Priority::Highest));
        assert_eq!(hints[1].priority, None);
        assert_eq!(hints[0].to.size(), 2);
    }

    #[test]
    fn missing_from_fails_fast() {
        let dataset = Dataset::from_json_str(
            r#"{"goldStandard":[{"assignmentId":"a","requestId":"r","hintId":1,"to":{"type":"script"}}]}"#,
        )
        .expect("dataset");
        assert!(matches!(
            dataset.gold_standard(),
            Err(RatingError::MissingField { field, .. }) if field == "from"
        ));
    }

    #[test]
    fn malformed_trees_echo_their_input() {
        let dataset = Dataset::from_json_str(
            r#"{"algorithms":[{"name":"alg","outcomes":[
                {"id":"o","assignmentId":"a","requestId":"r","result":"{not json"}]}]}"#,
        )
        .expect("dataset");
        match dataset.hint_sets() {
            Err(RatingError::MalformedTree { input, .. }) => assert_eq!(input, "{not json"),
            other => panic!("expected a malformed tree, got {other:?}"),
        }
    }

    #[test]
    fn outcomes_keep_weights_and_properties() {
        let dataset = Dataset::from_json_str(
            r#"{"algorithms":[{"name":"alg","outcomes":[
                {"id":"o","assignmentId":"a","requestId":"r","weight":2.5,
                 "result":{"type":"script"},"properties":{"cost":4,"kind":"insert"}}]}]}"#,
        )
        .expect("dataset");
        let sets = dataset.hint_sets().expect("hint sets");
        let outcomes = sets[0].outcomes("r");
        assert_eq!(sets[0].name(), "alg");
        assert_eq!(outcomes[0].weight, 2.5);
        assert_eq!(outcomes[0].properties["cost"], "4");
        assert_eq!(outcomes[0].properties["kind"], "insert");
    }
}
