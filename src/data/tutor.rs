use std::{cmp::Ordering, fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    config::RatingConfig,
    error::{RatingError, Result},
    tree::{
        Ast,
        diff::{self, RenderOptions},
    },
};

/// How strongly the tutors endorsed a hint, as an ordered tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Validity {
    /// No tutor endorsed the hint.
    #[default]
    NoTutors,
    /// Exactly one tutor endorsed the hint.
    OneTutor,
    /// More than one tutor endorsed the hint.
    MultipleTutors,
    /// All tutors agreed on the hint.
    Consensus,
}

impl Validity {
    /// Every tier, lowest first.
    pub const ALL: [Validity; 4] = [
        Validity::NoTutors,
        Validity::OneTutor,
        Validity::MultipleTutors,
        Validity::Consensus,
    ];

    /// The numeric code used in gold standard files.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Parses the numeric code used in gold standard files.
    pub fn from_int(value: i64) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| RatingError::InvalidValue {
                field: "validity".into(),
                value: value.to_string(),
            })
    }

    /// Whether this tier is `other` or better.
    pub fn is_at_least(self, other: Validity) -> bool {
        self >= other
    }

    /// The highest tier among annotated flags, `NoTutors` when there are
    /// none.
    pub fn highest_of(flags: impl IntoIterator<Item = Validity>) -> Validity {
        flags.into_iter().max().unwrap_or_default()
    }
}

impl Display for Validity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// How urgently a tutor hint should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Should be shown first.
    Highest,
    /// Important, but not the most pressing.
    High,
    /// Useful, not urgent.
    Normal,
    /// Correct, but the student is not ready for it yet.
    TooSoon,
}

impl Priority {
    /// The numeric code used in gold standard files.
    pub fn value(self) -> u8 {
        match self {
            Priority::Highest => 1,
            Priority::High => 2,
            Priority::Normal => 3,
            Priority::TooSoon => 4,
        }
    }

    /// Parses the numeric code used in gold standard files.
    pub fn from_int(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Priority::Highest),
            2 => Ok(Priority::High),
            3 => Ok(Priority::Normal),
            4 => Ok(Priority::TooSoon),
            _ => Err(RatingError::InvalidValue {
                field: "priority".into(),
                value: value.to_string(),
            }),
        }
    }

    /// Score contributed by an outcome matching a hint of this priority.
    pub fn points(self) -> f64 {
        match self {
            Priority::Highest => 3.0,
            Priority::High => 2.0,
            Priority::Normal => 1.0,
            Priority::TooSoon => 0.0,
        }
    }

    /// Whether this is the "too soon" marker.
    pub fn is_too_soon(self) -> bool {
        self == Priority::TooSoon
    }

    /// Rank used when ordering hints; higher shows first.
    fn rank(self) -> u8 {
        4 - self.value()
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A transition from a student's program state written by a human tutor.
#[derive(Debug, Clone, TypedBuilder)]
pub struct TutorHint {
    /// Identifier of the hint, unique within a gold standard.
    pub hint_id:       i64,
    /// The hint request this hint answers.
    #[builder(setter(into))]
    pub request_id:    String,
    /// The assignment the request belongs to.
    #[builder(setter(into))]
    pub assignment_id: String,
    /// Who wrote the hint.
    #[builder(default = "consensus".to_string(), setter(into))]
    pub tutor:         String,
    /// Dataset year, kept for reporting.
    #[builder(default, setter(into))]
    pub year:          String,
    /// The student's state at the time of the request, shared by every hint
    /// for that request.
    pub from:          Arc<Ast>,
    /// The state the tutor suggests moving to.
    pub to:            Ast,
    /// Endorsement tier.
    #[builder(default)]
    pub validity:      Validity,
    /// Urgency, when the tutors assigned one.
    #[builder(default, setter(strip_option))]
    pub priority:      Option<Priority>,
}

impl TutorHint {
    /// Whether tutors marked this hint as shown too early.
    pub fn is_too_soon(&self) -> bool {
        self.priority.is_some_and(Priority::is_too_soon)
    }

    /// Orders hints so that the more urgent, better endorsed one comes first,
    /// falling back to the lower hint id.
    pub fn priority_order(&self, other: &TutorHint) -> Ordering {
        other
            .priority
            .map(Priority::rank)
            .cmp(&self.priority.map(Priority::rank))
            .then_with(|| other.validity.cmp(&self.validity))
            .then_with(|| self.hint_id.cmp(&other.hint_id))
    }

    /// Renders the tutor's edit as a diff against the request state.
    pub fn to_diff(&self, config: &dyn RatingConfig, options: RenderOptions) -> String {
        diff::diff(&self.from, &self.to, config, options)
    }
}

/// Sorts hints so the highest priority hint comes first.
pub fn sort_by_priority(hints: &mut [Arc<TutorHint>]) {
    hints.sort_by(|a, b| a.priority_order(b));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(hint_id: i64, validity: Validity, priority: Option<Priority>) -> Arc<TutorHint> {
        let from = Arc::new(Ast::new("script", None, None));
        let builder = TutorHint::builder()
            .hint_id(hint_id)
            .request_id("r")
            .assignment_id("a")
            .from(from)
            .to(Ast::new("script", None, None))
            .validity(validity);
        Arc::new(match priority {
            Some(p) => builder.priority(p).build(),
            None => builder.build(),
        })
    }

    #[test]
    fn priority_sort_is_independent_of_input_order() {
        let mut forward = vec![
            hint(1, Validity::Consensus, Some(Priority::Normal)),
            hint(2, Validity::OneTutor, Some(Priority::Highest)),
            hint(3, Validity::MultipleTutors, Some(Priority::Highest)),
            hint(4, Validity::Consensus, None),
            hint(5, Validity::Consensus, Some(Priority::TooSoon)),
        ];
        let mut backward: Vec<_> = forward.iter().rev().cloned().collect();
        sort_by_priority(&mut forward);
        sort_by_priority(&mut backward);

        let ids = |hints: &[Arc<TutorHint>]| hints.iter().map(|h| h.hint_id).collect::<Vec<_>>();
        assert_eq!(ids(&forward), [3, 2, 1, 5, 4]);
        assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn validity_codes() {
        assert_eq!(Validity::from_int(2).expect("valid"), Validity::MultipleTutors);
        assert!(Validity::from_int(7).is_err());
        assert!(Validity::Consensus.is_at_least(Validity::MultipleTutors));
        assert!(!Validity::OneTutor.is_at_least(Validity::MultipleTutors));
        assert_eq!(
            Validity::highest_of([Validity::OneTutor, Validity::MultipleTutors]),
            Validity::MultipleTutors
        );
        assert_eq!(Validity::highest_of([]), Validity::NoTutors);
    }

    #[test]
    fn priority_codes_and_points() {
        assert_eq!(Priority::from_int(4).expect("valid"), Priority::TooSoon);
        assert!(Priority::from_int(0).is_err());
        assert_eq!(Priority::Highest.points(), 3.0);
        assert_eq!(Priority::TooSoon.points(), 0.0);
    }
}
