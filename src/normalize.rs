#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Canonical forms for hint outcomes.
//!
//! Two hints are "the same hint" when their *to* trees are equal after
//! [`normalize_new_values_to`] and [`prune_new_nodes_to`], both relative to
//! the same *from* tree.

use std::{cmp::Reverse, collections::HashSet};

use crate::{
    config::RatingConfig,
    edits::EditExtractor,
    tree::{Ast, EMPTY_TYPE, NodeIx},
};

/// Whether a value reads as a number.
fn is_numeric(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

/// Returns a copy of `to` in which every value that appears nowhere in
/// `from` is cleared, so fresh names chosen by different authors compare
/// equal. New numeric literals keep their value when the config asks for
/// specific numeric literals. The root keeps its value.
///
/// Values are compared without regard to node type, since different types
/// share values (a variable and its declaration, for instance).
///
/// Ids that appear nowhere in `from` are cleared as well, root included:
/// each tool numbers the blocks it creates on its own.
pub fn normalize_new_values_to(from: &Ast, to: &Ast, config: &dyn RatingConfig) -> Ast {
    let mut to = to.copy();
    let used = from.values();
    let known_ids: HashSet<&str> = from.preorder().into_iter().filter_map(|ix| from.id(ix)).collect();

    for ix in to.preorder() {
        if to.id(ix).is_some_and(|id| !known_ids.contains(id)) {
            to.set_id(ix, None);
        }
        if to.parent(ix).is_none() {
            continue;
        }
        let normalize = match to.value(ix) {
            Some(value) if !used.contains(&Some(value)) => {
                !(config.use_specific_numeric_literals() && is_numeric(value))
            }
            _ => false,
        };
        if normalize {
            to.set_value(ix, None);
        }
    }

    to
}

/// Removes childless children of `node` whose type satisfies `condition`.
fn prune_immediate_children(to: &mut Ast, node: NodeIx, condition: impl Fn(&str) -> bool) {
    let mut i = 0;
    while i < to.children(node).len() {
        let child = to.children(node)[i];
        if condition(to.node_type(child)) && to.children(child).is_empty() {
            to.remove_child(node, i);
        } else {
            i += 1;
        }
    }
}

/// Prunes `to` in place, relative to `from`.
///
/// First, children are visited before their parents and placeholder nodes
/// are removed, along with childless nodes the config marks as meaningless
/// without children. Then every node inserted or renamed relative to `from`,
/// deepest first, loses the childless immediate children the config marks
/// as automatically attached to new parents.
pub fn prune_new_nodes_to(from: &Ast, to: &mut Ast, config: &dyn RatingConfig, extractor: &EditExtractor) {
    let mut nodes = to.preorder();
    nodes.reverse();
    for ix in nodes {
        if to.parent(ix).is_none() {
            continue;
        }
        let placeholder = to.has_type(ix, EMPTY_TYPE);
        let empty = to.children(ix).is_empty() && config.trim_if_childless(to.node_type(ix));
        if placeholder || empty {
            to.detach(ix);
        }
    }

    let mut added = extractor.inserted_and_renamed_nodes(from, to);
    added.sort_by_key(|&ix| Reverse(to.depth(ix)));
    for ix in added {
        if to.parent(ix).is_none() {
            continue;
        }
        prune_immediate_children(to, ix, |t| config.trim_if_parent_is_added(t));
    }
}

/// Normalizes then prunes a copy of `to`.
pub fn normalize_and_prune(
    from: &Ast,
    to: &Ast,
    config: &dyn RatingConfig,
    extractor: &EditExtractor,
) -> Ast {
    let mut normalized = normalize_new_values_to(from, to, config);
    prune_new_nodes_to(from, &mut normalized, config, extractor);
    normalized
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::RatingSettings;

    fn parse(source: &str) -> Ast {
        Ast::parse(source).expect("tree")
    }

    const FROM: &str = r#"{"type":"script","children":{"0":{"type":"var","value":"count"}}}"#;

    #[test]
    fn new_values_are_cleared() {
        let from = parse(FROM);
        let to = parse(
            r#"{"type":"script","children":{"0":{"type":"var","value":"count"},
                "1":{"type":"var","value":"x"},"2":{"type":"literal","value":"5"}}}"#,
        );
        let normalized = normalize_new_values_to(&from, &to, &RatingSettings::snap());
        let values: Vec<_> = normalized
            .preorder()
            .into_iter()
            .map(|ix| normalized.value(ix))
            .collect();
        assert_eq!(values, [None, Some("count"), None, None]);

        let python = normalize_new_values_to(&from, &to, &RatingSettings::python());
        let literal = python.children(python.root())[2];
        assert_eq!(python.value(literal), Some("5"));
        assert_eq!(python.relations(python.root()), ["0", "1", "2"]);
    }

    #[test]
    fn different_fresh_names_normalize_equal() {
        let from = parse(FROM);
        let with_x = parse(r#"{"type":"script","children":{"0":{"type":"var","value":"count"},"1":{"type":"var","value":"x"}}}"#);
        let with_y = parse(r#"{"type":"script","children":{"0":{"type":"var","value":"count"},"1":{"type":"var","value":"y"}}}"#);
        let config = RatingSettings::snap();
        assert_eq!(
            normalize_new_values_to(&from, &with_x, &config),
            normalize_new_values_to(&from, &with_y, &config)
        );
    }

    #[test]
    fn fresh_ids_are_cleared() {
        let from = parse(r#"{"type":"script","id":"s","children":{"0":{"type":"move","id":"m"}}}"#);
        let to = parse(
            r#"{"type":"script","id":"s2","children":{"0":{"type":"move","id":"m"},
                "1":{"type":"turn","id":"alg-42"}}}"#,
        );
        let normalized = normalize_new_values_to(&from, &to, &RatingSettings::snap());
        let ids: Vec<_> = normalized
            .preorder()
            .into_iter()
            .map(|ix| normalized.id(ix))
            .collect();
        assert_eq!(ids, [None, Some("m"), None]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let from = parse(FROM);
        let to = parse(
            r#"{"type":"script","children":{"0":{"type":"var","value":"count"},
                "1":{"type":"if","value":"cond","children":{"0":{"type":"var","value":"z"}}}}}"#,
        );
        let config = RatingSettings::snap();
        let once = normalize_new_values_to(&from, &to, &config);
        let twice = normalize_new_values_to(&from, &once, &config);
        assert_eq!(once, twice);
    }

    #[test]
    fn prunes_placeholders_and_empty_containers() {
        let from = parse(r#"{"type":"sprite"}"#);
        let mut to = parse(
            r#"{"type":"sprite","children":{"0":null,"1":{"type":"script"},
                "2":{"type":"script","children":{"0":{"type":"move"}}}}}"#,
        );
        let before = to.size();
        prune_new_nodes_to(&from, &mut to, &RatingSettings::snap(), &EditExtractor::new());
        assert!(to.size() <= before);
        assert_eq!(to.relations(to.root()), ["2"]);
        assert_eq!(to.size(), 3);
    }

    #[test]
    fn prunes_default_children_of_added_nodes_only() {
        let from = parse(
            r#"{"type":"script","children":{"0":{"type":"move","children":{"0":{"type":"literal","value":"10"}}}}}"#,
        );
        let mut to = parse(
            r#"{"type":"script","children":{
                "0":{"type":"move","children":{"0":{"type":"literal","value":"10"}}},
                "1":{"type":"turn","children":{"0":{"type":"literal"},"1":{"type":"var","value":"a"}}}}}"#,
        );
        prune_new_nodes_to(&from, &mut to, &RatingSettings::snap(), &EditExtractor::new());

        let root = to.root();
        let kept_move = to.children(root)[0];
        assert_eq!(to.children(kept_move).len(), 1);
        let turn = to.children(root)[1];
        assert_eq!(to.children(turn).len(), 1);
        assert_eq!(to.node_type(to.children(turn)[0]), "var");
    }

    #[test]
    fn pruning_keeps_nodes_with_children() {
        let from = parse(r#"{"type":"sprite"}"#);
        let mut to = parse(
            r#"{"type":"sprite","children":{"0":{"type":"script","children":{"0":{"type":"literal",
                "children":{"0":{"type":"x"}}}}}}}"#,
        );
        let before = to.size();
        prune_new_nodes_to(&from, &mut to, &RatingSettings::snap(), &EditExtractor::new());
        assert_eq!(to.size(), before);
    }
}
