use std::collections::BTreeMap;

use typed_builder::TypedBuilder;

use crate::{
    config::RatingConfig,
    tree::{
        Ast,
        diff::{self, RenderOptions},
    },
};

/// One hint produced by the algorithm being rated.
#[derive(Debug, Clone, TypedBuilder)]
pub struct HintOutcome {
    /// Identifier of the outcome within its hint set.
    #[builder(setter(into))]
    pub id:            String,
    /// The assignment the request belongs to.
    #[builder(setter(into))]
    pub assignment_id: String,
    /// The hint request the outcome answers.
    #[builder(setter(into))]
    pub request_id:    String,
    /// Relative confidence of the algorithm in this outcome.
    #[builder(default = 1.0)]
    pub weight:        f64,
    /// The state the algorithm suggests moving to.
    pub result:        Ast,
    /// Free-form debugging values reported alongside the outcome.
    #[builder(default)]
    pub properties:    BTreeMap<String, String>,
}

impl HintOutcome {
    /// Relative confidence of the algorithm in this outcome.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Renders the suggested edit as a diff against the request state.
    pub fn result_diff(&self, from: &Ast, config: &dyn RatingConfig, options: RenderOptions) -> String {
        diff::diff(from, &self.result, config, options)
    }
}
