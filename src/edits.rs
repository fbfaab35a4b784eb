#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Structural edits between two versions of a tree.
//!
//! Nodes of the *to* tree are paired with nodes of the *from* tree first by
//! id, then, for nodes without ids, by relation label under an already
//! paired parent. Whatever stays unpaired in *to* was inserted, whatever
//! stays unpaired in *from* was deleted, and paired nodes whose type or value
//! changed were renamed. A node paired by id but found under a different
//! parent or relation counts as deleted and inserted again; its children keep
//! their pairing.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use itertools::Itertools;

use crate::tree::{Ast, NodeIx};

/// How a node of the *from* tree is referred to by edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    /// By its stable id.
    Id(String),
    /// By the relation labels leading to it from the root.
    Path(Vec<String>),
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKey::Id(id) => write!(f, "#{id}"),
            NodeKey::Path(path) => write!(f, "/{}", path.join("/")),
        }
    }
}

/// Where an inserted node was attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Anchor {
    /// Under a node that already existed in the *from* tree.
    Existing(NodeKey),
    /// Under a node that was itself inserted.
    Inserted {
        /// Where the inserted parent was attached.
        parent:    Box<Anchor>,
        /// The parent's relation label.
        relation:  String,
        /// The parent's type.
        node_type: String,
        /// The parent's value.
        value:     Option<String>,
    },
}

impl Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anchor::Existing(key) => write!(f, "{key}"),
            Anchor::Inserted {
                parent,
                relation,
                node_type,
                ..
            } => write!(f, "{parent}/{relation}:{node_type}"),
        }
    }
}

/// An atomic difference between two trees, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Edit {
    /// A node present only in the *to* tree.
    Insertion {
        /// Where it was attached.
        parent:    Anchor,
        /// Its relation label under that parent.
        relation:  String,
        /// Its type.
        node_type: String,
        /// Its value.
        value:     Option<String>,
        /// Its id.
        id:        Option<String>,
    },
    /// A node present only in the *from* tree.
    Deletion {
        /// The removed node.
        node:      NodeKey,
        /// Its type.
        node_type: String,
        /// Its value.
        value:     Option<String>,
    },
    /// A node kept in place whose type, value or id changed.
    Rename {
        /// The changed node.
        node:      NodeKey,
        /// Its new type.
        node_type: String,
        /// Its new value.
        value:     Option<String>,
        /// Its new id.
        id:        Option<String>,
    },
}

impl Edit {
    /// Whether this edit removes a node.
    pub fn is_deletion(&self) -> bool {
        matches!(self, Edit::Deletion { .. })
    }

    /// Type of the node the edit is about.
    pub fn node_type(&self) -> &str {
        match self {
            Edit::Insertion { node_type, .. }
            | Edit::Deletion { node_type, .. }
            | Edit::Rename { node_type, .. } => node_type,
        }
    }
}

impl Display for Edit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = |value: &Option<String>| value.as_deref().map(|v| format!("[{v}]")).unwrap_or_default();
        match self {
            Edit::Insertion {
                parent,
                relation,
                node_type,
                value,
                ..
            } => write!(f, "insert {node_type}{} at {parent}/{relation}", shown(value)),
            Edit::Deletion {
                node,
                node_type,
                value,
            } => write!(f, "delete {node_type}{} at {node}", shown(value)),
            Edit::Rename {
                node,
                node_type,
                value,
                ..
            } => write!(f, "rename {node} to {node_type}{}", shown(value)),
        }
    }
}

/// Pairing between the nodes of a *from* and a *to* tree.
struct Correspondence {
    /// to node -> from node.
    to_from:   HashMap<NodeIx, NodeIx>,
    /// from nodes that were paired.
    paired:    HashSet<NodeIx>,
    /// to nodes paired by id but attached elsewhere.
    relocated: HashSet<NodeIx>,
}

impl Correspondence {
    /// Pairs the nodes of `to` with the nodes of `from`.
    fn build(from: &Ast, to: &Ast) -> Self {
        let by_id: HashMap<&str, NodeIx> = from
            .preorder()
            .into_iter()
            .filter_map(|ix| from.id(ix).map(|id| (id, ix)))
            .collect();

        let mut pairing = Self {
            to_from:   HashMap::new(),
            paired:    HashSet::new(),
            relocated: HashSet::new(),
        };
        pairing.pair(from.root(), to.root());

        // Pre-order guarantees a parent is settled before its children.
        for ix in to.preorder().into_iter().skip(1) {
            if let Some(&source) = to.id(ix).and_then(|id| by_id.get(id)) {
                if pairing.paired.contains(&source) {
                    continue;
                }
                pairing.pair(source, ix);
                if !pairing.same_place(from, source, to, ix) {
                    pairing.relocated.insert(ix);
                }
                continue;
            }

            let candidate = to
                .parent(ix)
                .and_then(|parent| pairing.to_from.get(&parent).copied())
                .zip(to.relation(ix))
                .and_then(|(from_parent, relation)| from.child_by_relation(from_parent, relation));
            if let Some(source) = candidate {
                if from.id(source).is_none()
                    && to.id(ix).is_none()
                    && from.node_type(source) == to.node_type(ix)
                    && !pairing.paired.contains(&source)
                {
                    pairing.pair(source, ix);
                }
            }
        }
        pairing
    }

    /// Records that `to_ix` corresponds to `from_ix`.
    fn pair(&mut self, from_ix: NodeIx, to_ix: NodeIx) {
        self.to_from.insert(to_ix, from_ix);
        self.paired.insert(from_ix);
    }

    /// Whether a node paired by id sits under the counterpart of its old
    /// parent with the same relation label.
    fn same_place(&self, from: &Ast, source: NodeIx, to: &Ast, ix: NodeIx) -> bool {
        let parent_matches = match (from.parent(source), to.parent(ix)) {
            (Some(old), Some(new)) => self.to_from.get(&new) == Some(&old),
            (None, None) => true,
            _ => false,
        };
        parent_matches && from.relation(source) == to.relation(ix)
    }
}

/// Extracts edit sets between trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditExtractor;

impl EditExtractor {
    /// Creates an extractor.
    pub fn new() -> Self {
        Self
    }

    /// How edits refer to a node of the *from* tree.
    fn key(from: &Ast, ix: NodeIx) -> NodeKey {
        match from.id(ix) {
            Some(id) => NodeKey::Id(id.to_string()),
            None => NodeKey::Path(from.relation_path(ix)),
        }
    }

    /// The edits that turn `from` into `to`.
    pub fn get_edits(&self, from: &Ast, to: &Ast) -> HashSet<Edit> {
        let pairing = Correspondence::build(from, to);
        let mut edits = HashSet::new();
        let mut anchors: HashMap<NodeIx, Anchor> = HashMap::new();

        for ix in to.preorder() {
            let node_type = to.node_type(ix).to_string();
            let value = to.value(ix).map(str::to_string);
            let id = to.id(ix).map(str::to_string);
            let paired = pairing.to_from.get(&ix).copied();

            if let Some(source) = paired {
                let key = Self::key(from, source);
                let changed = from.node_type(source) != node_type
                    || from.value(source) != value.as_deref()
                    || from.id(source) != id.as_deref();
                if changed && !pairing.relocated.contains(&ix) {
                    edits.insert(Edit::Rename {
                        node:      key.clone(),
                        node_type: node_type.clone(),
                        value:     value.clone(),
                        id:        id.clone(),
                    });
                }
                anchors.insert(ix, Anchor::Existing(key));
            }

            let inserted = paired.is_none() || pairing.relocated.contains(&ix);
            let (Some(parent), Some(relation)) = (to.parent(ix), to.relation(ix)) else {
                continue;
            };
            if !inserted {
                continue;
            }
            if let Some(source) = paired {
                edits.insert(Edit::Deletion {
                    node:      Self::key(from, source),
                    node_type: from.node_type(source).to_string(),
                    value:     from.value(source).map(str::to_string),
                });
            }

            let Some(parent_anchor) = anchors.get(&parent).cloned() else {
                continue;
            };
            if paired.is_none() {
                anchors.insert(
                    ix,
                    Anchor::Inserted {
                        parent:    Box::new(parent_anchor.clone()),
                        relation:  relation.to_string(),
                        node_type: node_type.clone(),
                        value:     value.clone(),
                    },
                );
            }
            edits.insert(Edit::Insertion {
                parent: parent_anchor,
                relation: relation.to_string(),
                node_type,
                value,
                id,
            });
        }

        for ix in from.preorder() {
            if !pairing.paired.contains(&ix) {
                edits.insert(Edit::Deletion {
                    node:      Self::key(from, ix),
                    node_type: from.node_type(ix).to_string(),
                    value:     from.value(ix).map(str::to_string),
                });
            }
        }

        edits
    }

    /// Nodes of `to` that were inserted or renamed relative to `from`.
    pub fn inserted_and_renamed_nodes(&self, from: &Ast, to: &Ast) -> Vec<NodeIx> {
        let pairing = Correspondence::build(from, to);
        to.preorder()
            .into_iter()
            .filter(|ix| match pairing.to_from.get(ix) {
                None => true,
                Some(&source) => {
                    pairing.relocated.contains(ix)
                        || from.node_type(source) != to.node_type(*ix)
                        || from.value(source) != to.value(*ix)
                }
            })
            .collect()
    }
}

/// Lists two edit sets side by side: shared edits first, then those unique
/// to each side.
pub fn render_edits_comparison(
    left: &HashSet<Edit>,
    right: &HashSet<Edit>,
    left_label: &str,
    right_label: &str,
) -> String {
    let mut out = String::new();
    let mut section = |title: String, edits: Vec<&Edit>| {
        out.push_str(&format!("{title}:\n"));
        for edit in edits {
            out.push_str(&format!("  {edit}\n"));
        }
    };
    section("Both".to_string(), left.intersection(right).sorted().collect());
    section(format!("{left_label} only"), left.difference(right).sorted().collect());
    section(format!("{right_label} only"), right.difference(left).sorted().collect());
    out
}
