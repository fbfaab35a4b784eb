#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    data::Validity,
    error::{RatingError, Result},
};

/// Environment variable naming the preset used when nothing else is given.
pub const PRESET_ENV: &str = "HINT_RATING_PRESET";

/// The semantic questions the rater asks about a programming environment.
pub trait RatingConfig: Send + Sync {
    /// Whether a node of this type carries no meaning once it has no
    /// children, so it can be pruned.
    fn trim_if_childless(&self, node_type: &str) -> bool;

    /// Whether a childless node of this type is attached automatically when
    /// its parent is created, so it can be pruned under newly added parents.
    fn trim_if_parent_is_added(&self, node_type: &str) -> bool;

    /// Whether new numeric literals keep their exact value instead of being
    /// normalized away.
    fn use_specific_numeric_literals(&self) -> bool;

    /// The validity tier at least one tutor hint must reach for a request to
    /// be rated.
    fn highest_required_validity(&self) -> Validity;

    /// Whether children of this type are listed on separate lines when
    /// pretty printing.
    fn is_body_type(&self, _node_type: &str) -> bool {
        false
    }
}

/// Converts a list of type names into an owned set.
fn type_set(types: &[&str]) -> BTreeSet<String> {
    types.iter().map(|t| t.to_string()).collect()
}

/// A [`RatingConfig`] driven by explicit lists of node types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default, rename_all = "camelCase")]
pub struct RatingSettings {
    /// Name shown in logs.
    #[builder(default, setter(into))]
    pub name:                          String,
    /// Types pruned when childless.
    #[builder(default, setter(transform = |types: &[&str]| type_set(types)))]
    pub trim_if_childless:             BTreeSet<String>,
    /// Types pruned under newly added parents.
    #[builder(default, setter(transform = |types: &[&str]| type_set(types)))]
    pub trim_if_parent_is_added:       BTreeSet<String>,
    /// Keep the exact value of new numeric literals.
    #[builder(default)]
    pub use_specific_numeric_literals: bool,
    /// Minimum tier for a request to be rated.
    #[builder(default = Validity::MultipleTutors)]
    pub highest_required_validity:     Validity,
    /// Types printed with one child per line.
    #[builder(default, setter(transform = |types: &[&str]| type_set(types)))]
    pub body_types:                    BTreeSet<String>,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RatingSettings {
    /// Settings for block-based programs: empty scripts mean nothing and
    /// literal slots come with every new block.
    pub fn snap() -> Self {
        Self::builder()
            .name("snap")
            .trim_if_childless(&["script"])
            .trim_if_parent_is_added(&["literal"])
            .body_types(&["script"])
            .build()
    }

    /// Settings for Python programs: empty wrappers are meaningless and
    /// expression contexts are attached to every new name.
    pub fn python() -> Self {
        Self::builder()
            .name("python")
            .trim_if_childless(&["list", "Expr"])
            .trim_if_parent_is_added(&["Load", "Store", "Del", "Param"])
            .use_specific_numeric_literals(true)
            .body_types(&["Module", "list"])
            .build()
    }

    /// Looks up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "snap" | "isnap" => Some(Self::snap()),
            "python" | "itap" => Some(Self::python()),
            _ => None,
        }
    }

    /// The preset named by [`PRESET_ENV`], or `snap` when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(PRESET_ENV) {
            Ok(name) => Self::preset(&name).ok_or_else(|| RatingError::InvalidValue {
                field: PRESET_ENV.into(),
                value: name,
            }),
            Err(_) => Ok(Self::snap()),
        }
    }

    /// Parses settings from JSON. Omitted fields take their defaults.
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| RatingError::InvalidValue {
            field: "settings".into(),
            value: e.to_string(),
        })
    }

    /// Reads settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| RatingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&source)
    }
}

impl RatingConfig for RatingSettings {
    fn trim_if_childless(&self, node_type: &str) -> bool {
        self.trim_if_childless.contains(node_type)
    }

    fn trim_if_parent_is_added(&self, node_type: &str) -> bool {
        self.trim_if_parent_is_added.contains(node_type)
    }

    fn use_specific_numeric_literals(&self) -> bool {
        self.use_specific_numeric_literals
    }

    fn highest_required_validity(&self) -> Validity {
        self.highest_required_validity
    }

    fn is_body_type(&self, node_type: &str) -> bool {
        self.body_types.contains(node_type)
    }
}
