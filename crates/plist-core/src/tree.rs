//! Property list tree: an arena of nodes with parent back-references.
//!
//! The tree is an index-based arena. Each node lives in a slot of the arena
//! and is addressed by a stable [`NodeId`]; parent links are plain indices, so
//! there are no reference cycles to manage. Released subtrees return their
//! slots to a free list for reuse.
//!
//! # Ownership rules
//!
//! - A node has at most one parent. Attaching an already-attached node fails
//!   with [`PlistError::AlreadyAttached`]; the node stays where it was.
//! - Detaching (`dict_pop`, `array_pop`) hands the subtree back to the caller,
//!   who must re-attach or [`Tree::free`] it.
//! - `Key` nodes exist only as direct children of a `Dict`; the public attach
//!   operations reject them as values.
//!
//! Deep copy and release both walk iteratively, so arbitrarily deep trees do
//! not risk the call stack.

use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::error::{PlistError, Result};
use crate::types::Kind;

/// Index of a node within its [`Tree`].
///
/// Ids are stable for the lifetime of the node. After [`Tree::free`] the slot
/// may be recycled for a later node; operations on a stale id of a vacant slot
/// fail with [`PlistError::InvalidArgument`] rather than panicking, but a
/// recycled id is indistinguishable from the node now occupying the slot, so
/// callers must not hold ids across a release of the node they name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The typed payload of a node, one variant per kind.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Ordered mapping; children are `Key` nodes, names unique.
    Dict { keys: Vec<NodeId> },
    /// Named slot inside a `Dict`; owns the entry name and the value node.
    Key { name: String, value: Option<NodeId> },
    /// Ordered sequence of nodes.
    Array { elems: Vec<NodeId> },
    /// Owned byte buffer.
    Data(Vec<u8>),
    /// Calendar time with an explicit UTC offset.
    Date(DateTime<FixedOffset>),
    /// Owned UTF-8 text, already unescaped.
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

#[derive(Debug)]
struct NodeData {
    parent: Option<NodeId>,
    payload: Payload,
}

/// Arena holding property list nodes.
///
/// A tree may contain several disconnected roots at once: freshly constructed
/// nodes are parentless until attached, and detached subtrees stay in the
/// arena until re-attached or freed.
#[derive(Debug, Default)]
pub struct Tree {
    slots: Vec<Option<NodeData>>,
    vacant: Vec<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// Construct a fresh, parentless node from a payload.
    pub(crate) fn new_node(&mut self, payload: Payload) -> NodeId {
        let data = NodeData {
            parent: None,
            payload,
        };
        match self.vacant.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(data);
                id
            }
            None => {
                let id = NodeId::new(self.slots.len());
                self.slots.push(Some(data));
                id
            }
        }
    }

    /// New empty dictionary.
    pub fn new_dict(&mut self) -> NodeId {
        self.new_node(Payload::Dict { keys: Vec::new() })
    }

    /// New empty array.
    pub fn new_array(&mut self) -> NodeId {
        self.new_node(Payload::Array { elems: Vec::new() })
    }

    /// New data node owning a copy of `bytes`.
    pub fn new_data(&mut self, bytes: &[u8]) -> NodeId {
        self.new_node(Payload::Data(bytes.to_vec()))
    }

    /// New date node.
    pub fn new_date(&mut self, when: DateTime<FixedOffset>) -> NodeId {
        self.new_node(Payload::Date(when))
    }

    /// New string node owning a copy of `text`.
    pub fn new_string(&mut self, text: &str) -> NodeId {
        self.new_node(Payload::String(text.to_owned()))
    }

    /// New string node rendered from format arguments.
    ///
    /// Equivalent to formatting first and then calling [`Tree::new_string`]:
    /// `tree.new_format(format_args!("{}:{}", host, port))`.
    pub fn new_format(&mut self, args: fmt::Arguments<'_>) -> NodeId {
        self.new_node(Payload::String(args.to_string()))
    }

    /// New integer node.
    pub fn new_integer(&mut self, value: i64) -> NodeId {
        self.new_node(Payload::Integer(value))
    }

    /// New real node.
    pub fn new_real(&mut self, value: f64) -> NodeId {
        self.new_node(Payload::Real(value))
    }

    /// New boolean node.
    pub fn new_boolean(&mut self, value: bool) -> NodeId {
        self.new_node(Payload::Boolean(value))
    }

    /// New parentless key wrapper. Keys only ever live under a dictionary,
    /// so this stays crate-internal; the parser and `dict_set` are the two
    /// producers.
    pub(crate) fn new_key(&mut self, name: String) -> NodeId {
        self.new_node(Payload::Key { name, value: None })
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.slots.get(id.index())?.as_ref()
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    fn payload_mut(&mut self, id: NodeId) -> Option<&mut Payload> {
        self.data_mut(id).map(|d| &mut d.payload)
    }

    /// The payload of a live node, or `None` for a vacant slot.
    pub fn payload(&self, id: NodeId) -> Option<&Payload> {
        self.data(id).map(|d| &d.payload)
    }

    /// The kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<Kind> {
        Some(match self.data(id)?.payload {
            Payload::Dict { .. } => Kind::Dict,
            Payload::Key { .. } => Kind::Key,
            Payload::Array { .. } => Kind::Array,
            Payload::Data(_) => Kind::Data,
            Payload::Date(_) => Kind::Date,
            Payload::String(_) => Kind::String,
            Payload::Integer(_) => Kind::Integer,
            Payload::Real(_) => Kind::Real,
            Payload::Boolean(_) => Kind::Boolean,
        })
    }

    /// The parent of a node, if attached.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id)?.parent
    }

    /// Number of entries in a dictionary or elements in an array.
    pub fn count(&self, id: NodeId) -> Option<usize> {
        match &self.data(id)?.payload {
            Payload::Dict { keys } => Some(keys.len()),
            Payload::Array { elems } => Some(elems.len()),
            _ => None,
        }
    }

    /// Children of a dictionary (its keys) or an array (its elements), in
    /// insertion order. Empty for every other kind.
    ///
    /// The borrow rules prevent mutating the tree while iterating, so the
    /// container cannot change under the iterator.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let list: &[NodeId] = match self.data(id).map(|d| &d.payload) {
            Some(Payload::Dict { keys }) => keys,
            Some(Payload::Array { elems }) => elems,
            _ => &[],
        };
        list.iter().copied()
    }

    pub fn string_value(&self, id: NodeId) -> Option<&str> {
        match &self.data(id)?.payload {
            Payload::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer_value(&self, id: NodeId) -> Option<i64> {
        match self.data(id)?.payload {
            Payload::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn real_value(&self, id: NodeId) -> Option<f64> {
        match self.data(id)?.payload {
            Payload::Real(v) => Some(v),
            _ => None,
        }
    }

    pub fn boolean_value(&self, id: NodeId) -> Option<bool> {
        match self.data(id)?.payload {
            Payload::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn data_value(&self, id: NodeId) -> Option<&[u8]> {
        match &self.data(id)?.payload {
            Payload::Data(b) => Some(b),
            _ => None,
        }
    }

    pub fn date_value(&self, id: NodeId) -> Option<DateTime<FixedOffset>> {
        match self.data(id)?.payload {
            Payload::Date(d) => Some(d),
            _ => None,
        }
    }

    /// The entry name of a key node.
    pub fn key_name(&self, id: NodeId) -> Option<&str> {
        match &self.data(id)?.payload {
            Payload::Key { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The value node of a key node.
    pub fn key_value(&self, id: NodeId) -> Option<NodeId> {
        match self.data(id)?.payload {
            Payload::Key { value, .. } => value,
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Attachment plumbing
    // ------------------------------------------------------------------

    /// Validate that `value` can be attached under `container`.
    fn check_attach(&self, container: NodeId, value: NodeId) -> Result<()> {
        let data = self.data(value).ok_or(PlistError::InvalidArgument)?;
        if matches!(data.payload, Payload::Key { .. }) {
            return Err(PlistError::InvalidKind);
        }
        if data.parent.is_some() {
            return Err(PlistError::AlreadyAttached);
        }
        // Refuse attaching a node somewhere inside its own subtree.
        let mut walk = Some(container);
        while let Some(id) = walk {
            if id == value {
                return Err(PlistError::InvalidArgument);
            }
            walk = self.parent(id);
        }
        Ok(())
    }

    /// Link an already-validated parentless child under `parent`.
    pub(crate) fn adopt(&mut self, parent: NodeId, child: NodeId) {
        if let Some(d) = self.data_mut(child) {
            d.parent = Some(parent);
        }
        match self.payload_mut(parent) {
            Some(Payload::Dict { keys }) => keys.push(child),
            Some(Payload::Array { elems }) => elems.push(child),
            Some(Payload::Key { value, .. }) => *value = Some(child),
            _ => {}
        }
    }

    /// Unlink a node from its parent, leaving it a detached root.
    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.data(node).and_then(|d| d.parent) else {
            return;
        };
        match self.payload_mut(parent) {
            Some(Payload::Dict { keys }) => keys.retain(|&k| k != node),
            Some(Payload::Array { elems }) => elems.retain(|&e| e != node),
            Some(Payload::Key { value, .. }) => {
                if *value == Some(node) {
                    *value = None;
                }
            }
            _ => {}
        }
        if let Some(d) = self.data_mut(node) {
            d.parent = None;
        }
    }

    // ------------------------------------------------------------------
    // Dictionaries
    // ------------------------------------------------------------------

    fn expect_dict(&self, dict: NodeId) -> Result<()> {
        match self.data(dict).map(|d| &d.payload) {
            Some(Payload::Dict { .. }) => Ok(()),
            Some(_) => Err(PlistError::InvalidKind),
            None => Err(PlistError::InvalidArgument),
        }
    }

    /// Find the key node with the given name.
    fn dict_find(&self, dict: NodeId, name: &str) -> Option<NodeId> {
        match &self.data(dict)?.payload {
            Payload::Dict { keys } => keys
                .iter()
                .copied()
                .find(|&k| self.key_name(k) == Some(name)),
            _ => None,
        }
    }

    /// Set `name` to `value`, replacing (and releasing) any previous entry.
    ///
    /// On success the dictionary owns `value`. Modeled on the Python
    /// `d[key] = value` operation.
    pub fn dict_set(&mut self, dict: NodeId, name: &str, value: NodeId) -> Result<()> {
        self.expect_dict(dict)?;
        self.check_attach(dict, value)?;
        if let Some(old) = self.dict_find(dict, name) {
            self.free(old);
        }
        let key = self.new_key(name.to_owned());
        self.adopt(dict, key);
        self.adopt(key, value);
        Ok(())
    }

    /// Detach and return the value stored under `name`, releasing the key
    /// wrapper. The caller owns the returned subtree.
    pub fn dict_pop(&mut self, dict: NodeId, name: &str) -> Result<NodeId> {
        self.expect_dict(dict)?;
        let key = self.dict_find(dict, name).ok_or(PlistError::NotFound)?;
        let value = self.key_value(key).ok_or(PlistError::NotFound)?;
        if let Some(Payload::Dict { keys }) = self.payload_mut(dict) {
            keys.retain(|&k| k != key);
        }
        if let Some(d) = self.data_mut(value) {
            d.parent = None;
        }
        self.release_slot(key);
        Ok(value)
    }

    /// Remove the entry under `name` and release its value.
    pub fn dict_del(&mut self, dict: NodeId, name: &str) -> Result<()> {
        let value = self.dict_pop(dict, name)?;
        self.free(value);
        Ok(())
    }

    /// Whether the dictionary has an entry under `name`.
    pub fn dict_has(&self, dict: NodeId, name: &str) -> bool {
        self.dict_find(dict, name).is_some()
    }

    /// The value stored under `name`, without detaching it.
    pub fn dict_get(&self, dict: NodeId, name: &str) -> Option<NodeId> {
        self.dict_find(dict, name).and_then(|k| self.key_value(k))
    }

    /// Merge entries from `other` into `dict`, deep-copying each contributed
    /// key and replacing same-named entries. Modeled on the Python
    /// `d.update(other)` method: `other` may be a dictionary, a single key,
    /// or an array whose elements are all keys.
    ///
    /// The copies are staged before anything is committed, so on error the
    /// destination dictionary is unchanged.
    pub fn dict_update(&mut self, dict: NodeId, other: NodeId) -> Result<()> {
        self.expect_dict(dict)?;
        let contributed: Vec<NodeId> = match &self.data(other).ok_or(PlistError::InvalidArgument)?.payload {
            Payload::Dict { keys } => keys.clone(),
            Payload::Key { .. } => vec![other],
            Payload::Array { elems } => {
                let elems = elems.clone();
                for &e in &elems {
                    if self.kind(e) != Some(Kind::Key) {
                        return Err(PlistError::InvalidKind);
                    }
                }
                elems
            }
            _ => return Err(PlistError::InvalidKind),
        };

        let mut staged = Vec::with_capacity(contributed.len());
        for src in contributed {
            match self.deep_copy(src) {
                Ok(copy) => staged.push(copy),
                Err(err) => {
                    for id in staged {
                        self.free(id);
                    }
                    return Err(err);
                }
            }
        }

        for key in staged {
            let Some(name) = self.key_name(key).map(str::to_owned) else {
                continue;
            };
            if let Some(old) = self.dict_find(dict, &name) {
                self.free(old);
            }
            self.adopt(dict, key);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    fn expect_array(&self, array: NodeId) -> Result<usize> {
        match self.data(array).map(|d| &d.payload) {
            Some(Payload::Array { elems }) => Ok(elems.len()),
            Some(_) => Err(PlistError::InvalidKind),
            None => Err(PlistError::InvalidArgument),
        }
    }

    /// Append `value` to the end of the array.
    pub fn array_append(&mut self, array: NodeId, value: NodeId) -> Result<()> {
        let count = self.expect_array(array)?;
        self.array_insert(array, count, value)
    }

    /// Insert `value` at `loc`. A location of exactly the element count is an
    /// append; anything beyond fails with [`PlistError::OutOfRange`].
    pub fn array_insert(&mut self, array: NodeId, loc: usize, value: NodeId) -> Result<()> {
        let count = self.expect_array(array)?;
        if loc > count {
            return Err(PlistError::OutOfRange);
        }
        self.check_attach(array, value)?;
        if let Some(d) = self.data_mut(value) {
            d.parent = Some(array);
        }
        if let Some(Payload::Array { elems }) = self.payload_mut(array) {
            elems.insert(loc, value);
        }
        Ok(())
    }

    /// Detach and return the element at `loc`. The caller owns the subtree.
    pub fn array_pop(&mut self, array: NodeId, loc: usize) -> Result<NodeId> {
        let count = self.expect_array(array)?;
        if loc >= count {
            return Err(PlistError::OutOfRange);
        }
        let value = match self.payload_mut(array) {
            Some(Payload::Array { elems }) => elems.remove(loc),
            _ => return Err(PlistError::InvalidKind),
        };
        if let Some(d) = self.data_mut(value) {
            d.parent = None;
        }
        Ok(value)
    }

    /// Remove and release the element at `loc`.
    pub fn array_del(&mut self, array: NodeId, loc: usize) -> Result<()> {
        let value = self.array_pop(array, loc)?;
        self.free(value);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Copy, release, comparison
    // ------------------------------------------------------------------

    /// Clone a node's payload with its child links emptied out.
    fn clone_shell(&mut self, src: NodeId) -> Result<NodeId> {
        let payload = match &self.data(src).ok_or(PlistError::InvalidArgument)?.payload {
            Payload::Dict { .. } => Payload::Dict { keys: Vec::new() },
            Payload::Key { name, .. } => Payload::Key {
                name: name.clone(),
                value: None,
            },
            Payload::Array { .. } => Payload::Array { elems: Vec::new() },
            Payload::Data(bytes) => Payload::Data(bytes.clone()),
            Payload::Date(when) => Payload::Date(*when),
            Payload::String(text) => Payload::String(text.clone()),
            Payload::Integer(v) => Payload::Integer(*v),
            Payload::Real(v) => Payload::Real(*v),
            Payload::Boolean(v) => Payload::Boolean(*v),
        };
        Ok(self.new_node(payload))
    }

    /// Push `src`'s children on the frontier in reverse, so they are visited
    /// (and appended under `dst`) in insertion order.
    fn push_copy_frontier(&self, src: NodeId, dst: NodeId, frontier: &mut Vec<(NodeId, NodeId)>) {
        match self.data(src).map(|d| &d.payload) {
            Some(Payload::Dict { keys }) => {
                frontier.extend(keys.iter().rev().map(|&k| (k, dst)));
            }
            Some(Payload::Array { elems }) => {
                frontier.extend(elems.iter().rev().map(|&e| (e, dst)));
            }
            Some(Payload::Key { value: Some(v), .. }) => frontier.push((*v, dst)),
            _ => {}
        }
    }

    /// Deep-copy the subtree rooted at `src`, returning a parentless,
    /// storage-disjoint duplicate.
    ///
    /// The walk is an iterative pre-order descent with an explicit frontier
    /// of `(source child, destination parent)` pairs; depth never touches the
    /// call stack.
    pub fn deep_copy(&mut self, src: NodeId) -> Result<NodeId> {
        let root = self.clone_shell(src)?;
        let mut frontier = Vec::new();
        self.push_copy_frontier(src, root, &mut frontier);
        while let Some((child, dst_parent)) = frontier.pop() {
            let copy = self.clone_shell(child)?;
            self.adopt(dst_parent, copy);
            self.push_copy_frontier(child, copy, &mut frontier);
        }
        Ok(root)
    }

    fn release_slot(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            if slot.take().is_some() {
                self.vacant.push(id);
            }
        }
    }

    /// Detach `node` from its parent and release the whole subtree.
    ///
    /// Releasing walks a worklist rather than recursing, so arbitrarily deep
    /// trees are safe. A vacant id is a no-op.
    pub fn free(&mut self, node: NodeId) {
        if self.data(node).is_none() {
            return;
        }
        self.detach(node);
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            let Some(slot) = self.slots.get_mut(id.index()) else {
                continue;
            };
            let Some(data) = slot.take() else {
                continue;
            };
            match data.payload {
                Payload::Dict { keys } => pending.extend(keys),
                Payload::Array { elems } => pending.extend(elems),
                Payload::Key {
                    value: Some(v), ..
                } => pending.push(v),
                _ => {}
            }
            self.vacant.push(id);
        }
    }

    /// Structural equality of two subtrees, possibly across trees: same
    /// kinds, same payloads, same child order, entry for entry.
    pub fn subtree_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        let mut pending = vec![(a, b)];
        while let Some((x, y)) = pending.pop() {
            let (Some(dx), Some(dy)) = (self.data(x), other.data(y)) else {
                return false;
            };
            match (&dx.payload, &dy.payload) {
                (Payload::Dict { keys: ka }, Payload::Dict { keys: kb }) => {
                    if ka.len() != kb.len() {
                        return false;
                    }
                    pending.extend(ka.iter().copied().zip(kb.iter().copied()));
                }
                (
                    Payload::Key {
                        name: na,
                        value: va,
                    },
                    Payload::Key {
                        name: nb,
                        value: vb,
                    },
                ) => {
                    if na != nb {
                        return false;
                    }
                    match (va, vb) {
                        (Some(x), Some(y)) => pending.push((*x, *y)),
                        (None, None) => {}
                        _ => return false,
                    }
                }
                (Payload::Array { elems: ea }, Payload::Array { elems: eb }) => {
                    if ea.len() != eb.len() {
                        return false;
                    }
                    pending.extend(ea.iter().copied().zip(eb.iter().copied()));
                }
                (Payload::Data(ba), Payload::Data(bb)) => {
                    if ba != bb {
                        return false;
                    }
                }
                (Payload::Date(da), Payload::Date(db)) => {
                    if da != db {
                        return false;
                    }
                }
                (Payload::String(sa), Payload::String(sb)) => {
                    if sa != sb {
                        return false;
                    }
                }
                (Payload::Integer(ia), Payload::Integer(ib)) => {
                    if ia != ib {
                        return false;
                    }
                }
                (Payload::Real(ra), Payload::Real(rb)) => {
                    if ra != rb {
                        return false;
                    }
                }
                (Payload::Boolean(ba), Payload::Boolean(bb)) => {
                    if ba != bb {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }
}
