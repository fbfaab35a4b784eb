#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The program-state tree shared by every stage of rating.
//!
//! Nodes live in an index-based arena owned by [`Ast`]. Handles ([`NodeIx`])
//! are only meaningful for the tree that produced them. Children are an
//! ordered list, and each child carries a relation label that is unique
//! among its siblings. Detaching a node leaves it in the arena, unreachable
//! from the root; [`Ast::copy`] compacts the reachable part again.

/// Rendered diffs between two trees.
pub mod diff;
/// The nested JSON wire format.
pub mod json;
/// Human-readable tree rendering.
pub mod pretty;

use std::{
    collections::HashSet,
    hash::{DefaultHasher, Hash, Hasher},
};

/// Node type used for explicit `null` children in serialized trees. Such
/// nodes are placeholders and are always pruned before matching.
pub const EMPTY_TYPE: &str = "null";

/// A handle to a node inside one [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIx(usize);

/// Storage for a single node.
#[derive(Debug, Clone)]
struct Slot {
    /// Category tag, never empty.
    node_type: String,
    /// Optional literal payload.
    value:     Option<String>,
    /// Optional stable identifier.
    id:        Option<String>,
    /// Owning node, `None` for the root and for detached nodes.
    parent:    Option<NodeIx>,
    /// Ordered children.
    children:  Vec<NodeIx>,
    /// Relation label of each child, parallel to `children`.
    relations: Vec<String>,
}

impl Slot {
    /// A fresh node without parent or children.
    fn new(node_type: String, value: Option<String>, id: Option<String>) -> Self {
        Self {
            node_type,
            value,
            id,
            parent: None,
            children: Vec::new(),
            relations: Vec::new(),
        }
    }
}

/// An abstract syntax tree of a program state.
#[derive(Debug, Clone)]
pub struct Ast {
    /// Every node ever created in this tree, attached or not.
    slots: Vec<Slot>,
    /// The root node.
    root:  NodeIx,
}

impl Ast {
    /// Creates a tree consisting of a single root node.
    pub fn new(node_type: impl Into<String>, value: Option<String>, id: Option<String>) -> Self {
        Self {
            slots: vec![Slot::new(node_type.into(), value, id)],
            root:  NodeIx(0),
        }
    }

    /// Creates a detached node in this tree's arena. Attach it with one of
    /// the `*_child` methods.
    pub fn create(
        &mut self,
        node_type: impl Into<String>,
        value: Option<String>,
        id: Option<String>,
    ) -> NodeIx {
        self.slots.push(Slot::new(node_type.into(), value, id));
        NodeIx(self.slots.len() - 1)
    }

    /// The root node.
    pub fn root(&self) -> NodeIx {
        self.root
    }

    /// Looks up the storage for `ix`.
    fn slot(&self, ix: NodeIx) -> &Slot {
        &self.slots[ix.0]
    }

    /// Mutable lookup of the storage for `ix`.
    fn slot_mut(&mut self, ix: NodeIx) -> &mut Slot {
        &mut self.slots[ix.0]
    }

    /// The node's type tag.
    pub fn node_type(&self, ix: NodeIx) -> &str {
        &self.slot(ix).node_type
    }

    /// Whether the node has the given type.
    pub fn has_type(&self, ix: NodeIx, node_type: &str) -> bool {
        self.slot(ix).node_type == node_type
    }

    /// The node's literal value, if any.
    pub fn value(&self, ix: NodeIx) -> Option<&str> {
        self.slot(ix).value.as_deref()
    }

    /// The node's stable identifier, if any.
    pub fn id(&self, ix: NodeIx) -> Option<&str> {
        self.slot(ix).id.as_deref()
    }

    /// Replaces the node's value.
    pub fn set_value(&mut self, ix: NodeIx, value: Option<String>) {
        self.slot_mut(ix).value = value;
    }

    /// Replaces the node's identifier.
    pub fn set_id(&mut self, ix: NodeIx, id: Option<String>) {
        self.slot_mut(ix).id = id;
    }

    /// The node that owns `ix`.
    pub fn parent(&self, ix: NodeIx) -> Option<NodeIx> {
        self.slot(ix).parent
    }

    /// The node's children, in order.
    pub fn children(&self, ix: NodeIx) -> &[NodeIx] {
        &self.slot(ix).children
    }

    /// The relation labels of the node's children, parallel to
    /// [`Ast::children`].
    pub fn relations(&self, ix: NodeIx) -> &[String] {
        &self.slot(ix).relations
    }

    /// Position of `ix` among its parent's children.
    pub fn index(&self, ix: NodeIx) -> Option<usize> {
        let parent = self.parent(ix)?;
        self.children(parent).iter().position(|&c| c == ix)
    }

    /// Relation label of `ix` within its parent.
    pub fn relation(&self, ix: NodeIx) -> Option<&str> {
        let parent = self.parent(ix)?;
        let index = self.index(ix)?;
        Some(self.relations(parent)[index].as_str())
    }

    /// The child of `ix` under the given relation label.
    pub fn child_by_relation(&self, ix: NodeIx, relation: &str) -> Option<NodeIx> {
        let slot = self.slot(ix);
        slot.relations
            .iter()
            .position(|r| r == relation)
            .map(|i| slot.children[i])
    }

    /// Number of ancestors between `ix` and the top of its tree.
    pub fn depth(&self, ix: NodeIx) -> usize {
        let mut depth = 0;
        let mut current = ix;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Labels of the relations from the root down to `ix`.
    pub fn relation_path(&self, ix: NodeIx) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = ix;
        while let Some(relation) = self.relation(current) {
            path.push(relation.to_string());
            current = self.parent(current).unwrap_or(current);
        }
        path.reverse();
        path
    }

    /// Inserts `child` at `index` under `relation`.
    ///
    /// Returns `false` without touching the tree if `relation` is already used
    /// by a sibling, or if `child` is already attached somewhere. An `index`
    /// past the end appends.
    pub fn insert_child(
        &mut self,
        parent: NodeIx,
        index: usize,
        relation: impl Into<String>,
        child: NodeIx,
    ) -> bool {
        let relation = relation.into();
        if child == parent || child == self.root || self.slot(child).parent.is_some() {
            return false;
        }
        if self.slot(parent).relations.contains(&relation) {
            return false;
        }
        let slot = self.slot_mut(parent);
        let index = index.min(slot.children.len());
        slot.children.insert(index, child);
        slot.relations.insert(index, relation);
        self.slot_mut(child).parent = Some(parent);
        true
    }

    /// Appends `child` under `relation`. See [`Ast::insert_child`].
    pub fn add_child(&mut self, parent: NodeIx, relation: impl Into<String>, child: NodeIx) -> bool {
        let index = self.children(parent).len();
        self.insert_child(parent, index, relation, child)
    }

    /// Appends `child` under a label synthesized from its position.
    pub fn push_child(&mut self, parent: NodeIx, child: NodeIx) -> bool {
        let index = self.children(parent).len();
        self.insert_child_at(parent, index, child)
    }

    /// Inserts `child` at `index` under a label synthesized from its
    /// position. The label skips numbers that siblings already use.
    pub fn insert_child_at(&mut self, parent: NodeIx, index: usize, child: NodeIx) -> bool {
        let relation = self.free_relation(parent, index);
        self.insert_child(parent, index, relation, child)
    }

    /// First positional label at or after `start` not taken by a child of
    /// `parent`.
    fn free_relation(&self, parent: NodeIx, start: usize) -> String {
        let relations = self.relations(parent);
        let mut n = start.max(relations.len());
        while relations.iter().any(|r| *r == n.to_string()) {
            n += 1;
        }
        n.to_string()
    }

    /// Detaches and returns the child at `index`.
    pub fn remove_child(&mut self, parent: NodeIx, index: usize) -> Option<NodeIx> {
        let slot = self.slot_mut(parent);
        if index >= slot.children.len() {
            return None;
        }
        let child = slot.children.remove(index);
        slot.relations.remove(index);
        self.slot_mut(child).parent = None;
        Some(child)
    }

    /// Detaches `ix` from its parent, if it has one.
    pub fn detach(&mut self, ix: NodeIx) -> bool {
        match (self.parent(ix), self.index(ix)) {
            (Some(parent), Some(index)) => self.remove_child(parent, index).is_some(),
            _ => false,
        }
    }

    /// Detaches every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeIx) {
        let children = std::mem::take(&mut self.slot_mut(parent).children);
        self.slot_mut(parent).relations.clear();
        for child in children {
            self.slot_mut(child).parent = None;
        }
    }

    /// Copies the subtree of `other` rooted at `source` into this tree and
    /// appends it under `parent` with `relation`. Returns the new node, or
    /// `None` if the relation is taken.
    pub fn graft(
        &mut self,
        parent: NodeIx,
        relation: impl Into<String>,
        other: &Ast,
        source: NodeIx,
    ) -> Option<NodeIx> {
        let relation = relation.into();
        if self.relations(parent).contains(&relation) {
            return None;
        }
        let copied = self.copy_from(other, source);
        self.add_child(parent, relation, copied).then_some(copied)
    }

    /// Recursively copies `source` from `other` into this arena, detached.
    fn copy_from(&mut self, other: &Ast, source: NodeIx) -> NodeIx {
        let slot = other.slot(source);
        let ix = self.create(slot.node_type.clone(), slot.value.clone(), slot.id.clone());
        for (child, relation) in slot.children.iter().zip(&slot.relations) {
            let copied = self.copy_from(other, *child);
            self.add_child(ix, relation.clone(), copied);
        }
        ix
    }

    /// A fully independent copy of the reachable tree, preserving relation
    /// labels and ids.
    pub fn copy(&self) -> Ast {
        self.subtree(self.root)
    }

    /// A new tree holding a copy of the subtree rooted at `ix`.
    pub fn subtree(&self, ix: NodeIx) -> Ast {
        let slot = self.slot(ix);
        let mut copy = Ast::new(slot.node_type.clone(), slot.value.clone(), slot.id.clone());
        let root = copy.root();
        for (child, relation) in slot.children.iter().zip(&slot.relations) {
            let copied = copy.copy_from(self, *child);
            copy.add_child(root, relation.clone(), copied);
        }
        copy
    }

    /// Gives every node without an id the id `prefix` followed by a counter,
    /// in pre-order.
    pub fn auto_id(&mut self, prefix: &str) {
        let mut next = 0usize;
        for ix in self.preorder() {
            let slot = self.slot_mut(ix);
            if slot.id.is_none() {
                slot.id = Some(format!("{prefix}{next}"));
                next += 1;
            }
        }
    }

    /// Reachable nodes in pre-order.
    pub fn preorder(&self) -> Vec<NodeIx> {
        self.preorder_from(self.root)
    }

    /// Nodes of the subtree rooted at `ix` in pre-order.
    pub fn preorder_from(&self, ix: NodeIx) -> Vec<NodeIx> {
        let mut order = Vec::new();
        let mut stack = vec![ix];
        while let Some(next) = stack.pop() {
            order.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        order
    }

    /// Calls `action` on every reachable node, parents before children.
    pub fn recurse(&self, mut action: impl FnMut(NodeIx)) {
        for ix in self.preorder() {
            action(ix);
        }
    }

    /// Number of reachable nodes.
    pub fn size(&self) -> usize {
        self.preorder().len()
    }

    /// Every value used anywhere in the tree.
    pub fn values(&self) -> HashSet<Option<&str>> {
        self.preorder().into_iter().map(|ix| self.value(ix)).collect()
    }

    /// Whether the subtree at `a` in `self` equals the subtree at `b` in
    /// `other`, comparing type, value, id, relation labels and children.
    pub fn subtree_eq(&self, a: NodeIx, other: &Ast, b: NodeIx) -> bool {
        let (left, right) = (self.slot(a), other.slot(b));
        left.node_type == right.node_type
            && left.value == right.value
            && left.id == right.id
            && left.relations == right.relations
            && left.children.len() == right.children.len()
            && left
                .children
                .iter()
                .zip(&right.children)
                .all(|(&x, &y)| self.subtree_eq(x, other, y))
    }

    /// Feeds the subtree at `ix` into `state`.
    fn hash_subtree<H: Hasher>(&self, ix: NodeIx, state: &mut H) {
        let slot = self.slot(ix);
        slot.node_type.hash(state);
        slot.value.hash(state);
        slot.id.hash(state);
        state.write_usize(slot.children.len());
        for &child in &slot.children {
            self.hash_subtree(child, state);
        }
        slot.relations.hash(state);
    }

    /// A deterministic structural hash, stable across runs.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for Ast {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

impl Eq for Ast {}

/// Hash based on reachable structure, consistent with `PartialEq`
impl Hash for Ast {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_subtree(self.root, state);
    }
}

impl std::fmt::Display for Ast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Ast {
        let mut ast = Ast::new("script", None, Some("s".into()));
        let root = ast.root();
        let call = ast.create("call", Some("move".into()), None);
        ast.push_child(root, call);
        let literal = ast.create("literal", Some("10".into()), None);
        ast.push_child(call, literal);
        ast
    }

    #[test]
    fn add_child_rejects_taken_relation() {
        let mut ast = script();
        let root = ast.root();
        let extra = ast.create("call", None, None);
        assert!(!ast.add_child(root, "0", extra));
        assert_eq!(ast.children(root).len(), 1);
        assert_eq!(ast.parent(extra), None);
        assert!(ast.add_child(root, "next", extra));
        assert_eq!(ast.parent(extra), Some(root));
        assert_eq!(ast.relation(extra), Some("next"));
    }

    #[test]
    fn synthesized_labels_skip_explicit_ones() {
        let mut ast = Ast::new("block", None, None);
        let root = ast.root();
        let a = ast.create("a", None, None);
        let b = ast.create("b", None, None);
        let c = ast.create("c", None, None);
        assert!(ast.add_child(root, "1", a));
        assert!(ast.push_child(root, b));
        assert!(ast.push_child(root, c));
        assert_eq!(ast.relations(root), ["1", "2", "3"]);
    }

    #[test]
    fn remove_child_clears_parent() {
        let mut ast = script();
        let root = ast.root();
        let call = ast.children(root)[0];
        assert_eq!(ast.remove_child(root, 0), Some(call));
        assert_eq!(ast.parent(call), None);
        assert_eq!(ast.size(), 1);
        assert_eq!(ast.remove_child(root, 0), None);
    }

    #[test]
    fn copy_is_independent_and_equal() {
        let original = script();
        let mut copy = original.copy();
        assert_eq!(copy, original);
        assert_eq!(copy.structural_hash(), original.structural_hash());

        let call = copy.children(copy.root())[0];
        copy.set_value(call, Some("turn".into()));
        assert_ne!(copy, original);
        assert_eq!(original.value(original.children(original.root())[0]), Some("move"));
    }

    #[test]
    fn equality_includes_relations_and_ids() {
        let a = script();
        let mut b = Ast::new("script", None, Some("s".into()));
        let root = b.root();
        let call = b.create("call", Some("move".into()), None);
        b.add_child(root, "first", call);
        let literal = b.create("literal", Some("10".into()), None);
        b.push_child(call, literal);
        assert_ne!(a, b);

        let mut c = script();
        c.set_id(c.root(), None);
        assert_ne!(a, c);
    }

    #[test]
    fn auto_id_fills_missing_ids_in_preorder() {
        let mut ast = script();
        ast.auto_id("n");
        let ids: Vec<_> = ast.preorder().into_iter().map(|ix| ast.id(ix)).collect();
        assert_eq!(ids, [Some("s"), Some("n0"), Some("n1")]);
    }

    #[test]
    fn depth_and_paths() {
        let ast = script();
        let call = ast.children(ast.root())[0];
        let literal = ast.children(call)[0];
        assert_eq!(ast.depth(literal), 2);
        assert_eq!(ast.relation_path(literal), ["0", "0"]);
        assert!(ast.relation_path(ast.root()).is_empty());
    }

    #[test]
    fn detached_nodes_are_not_reachable() {
        let mut ast = script();
        let root = ast.root();
        ast.clear_children(root);
        assert_eq!(ast.preorder(), vec![root]);
        assert_eq!(ast.copy().size(), 1);
    }
}
