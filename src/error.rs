#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// An enum to represent everything that can go wrong while rating hints.
#[derive(thiserror::Error, Debug)]
pub enum RatingError {
    /// A serialized tree could not be parsed. The raw input is kept so the
    /// operator can see exactly what was rejected.
    #[error("Could not parse tree ({reason}).\nInput:\n```\n{input}\n```")]
    MalformedTree {
        /// What was wrong with the input.
        reason: String,
        /// The raw serialized input.
        input:  String,
    },
    /// A record was missing a field that has no sensible default.
    #[error("Missing required field `{field}` in {record}")]
    MissingField {
        /// Name of the missing field.
        field:  String,
        /// Description of the record the field was expected in.
        record: String,
    },
    /// A field was present but its value could not be interpreted.
    #[error("Invalid value `{value}` for `{field}`")]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// The rejected value.
        value: String,
    },
    /// The matching logic contradicted itself. This is a defect in the rater,
    /// never a property of the input, so rating stops here.
    #[error("Inconsistent rating: {message}\n{diagnostics}")]
    Inconsistent {
        /// Which check failed.
        message:     String,
        /// Rendered diffs of the trees involved.
        diagnostics: String,
    },
    /// A JSON document did not have the expected shape.
    #[error("Invalid JSON in {what}: {source}")]
    Json {
        /// What was being read.
        what:   String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path being read or written.
        path:   String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl RatingError {
    /// Builds a [`RatingError::MalformedTree`] from a reason and the raw input.
    pub fn malformed(reason: impl Into<String>, input: impl Into<String>) -> Self {
        Self::MalformedTree {
            reason: reason.into(),
            input:  input.into(),
        }
    }

    /// Builds a [`RatingError::MissingField`].
    pub fn missing(field: impl Into<String>, record: impl Into<String>) -> Self {
        Self::MissingField {
            field:  field.into(),
            record: record.into(),
        }
    }
}

/// Convenience alias used across the library.
pub type Result<T, E = RatingError> = std::result::Result<T, E>;
