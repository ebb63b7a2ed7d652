//! In-memory document - an arena of nodes implementing [`Host`].
//!
//! Nodes live in a slot arena. Replacing a node frees its whole subtree and
//! drops every listener registered inside it; the freed slots are handed out
//! again by later builds. Each slot carries a generation that is bumped on
//! free, so a handle to a removed node never aliases the node that reuses its
//! slot. Stale handles report [`HostError::Detached`] or are ignored.
//!
//! Focus is held in a signal so hosts embedding the document can react to it.

use std::collections::HashMap;
use std::fmt;

use spark_signals::{Signal, signal};
use tracing::trace;

use crate::error::HostError;
use crate::markup::{self, Attribute, ElementFlags, Node};
use crate::pipeline::Host;
use crate::state::Listener;
use crate::types::MOUNT_ATTR;

// =============================================================================
// Node Storage
// =============================================================================

/// Handle to a node in a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct ElementData {
    name: String,
    attrs: Vec<Attribute>,
    flags: ElementFlags,
    /// Live form value, separate from the `value` attribute.
    value: String,
}

#[derive(Debug)]
enum NodeKind {
    Root,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

// =============================================================================
// Document
// =============================================================================

/// Headless document.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    focused: Signal<Option<NodeId>>,
    listeners: HashMap<(NodeId, String), Vec<Listener>>,
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            focused: signal(None),
            listeners: HashMap::new(),
        };
        doc.root = doc.alloc(NodeKind::Root);
        doc
    }

    /// A document holding `markup`.
    pub fn parse(markup: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        for node in markup::parse_fragment(markup) {
            let id = doc.build(&node);
            doc.append(root, id);
        }
        doc
    }

    /// A document holding only an empty mount point.
    pub fn with_mount_point() -> Self {
        Self::parse(&format!("<div {MOUNT_ATTR}></div>"))
    }

    /// Number of live nodes, detached text and the document root included.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    // -------------------------------------------------------------------------
    // Building
    // -------------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.data = Some(data);
                NodeId { index, generation: slot.generation }
            }
            None => {
                self.slots.push(Slot { generation: 0, data: Some(data) });
                NodeId { index: self.slots.len() - 1, generation: 0 }
            }
        }
    }

    /// Free every slot in the subtree rooted at `node`.
    fn release(&mut self, node: NodeId) {
        for id in self.subtree(node) {
            let slot = &mut self.slots[id.index];
            slot.data = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
    }

    fn append(&mut self, parent: NodeId, child: NodeId) {
        if let Some(data) = self.data_mut(child) {
            data.parent = Some(parent);
        }
        if let Some(data) = self.data_mut(parent) {
            data.children.push(child);
        }
    }

    fn build(&mut self, node: &Node) -> NodeId {
        match node {
            Node::Text(text) => self.alloc(NodeKind::Text(text.clone())),
            Node::Comment(body) => self.alloc(NodeKind::Comment(body.clone())),
            Node::Element(element) => {
                let value = match element.name.as_str() {
                    "textarea" => text_of(&element.children),
                    _ => element.attr("value").unwrap_or_default().to_string(),
                };
                let id = self.alloc(NodeKind::Element(ElementData {
                    name: element.name.clone(),
                    attrs: element.attrs.clone(),
                    flags: element.flags,
                    value,
                }));
                for child in &element.children {
                    let child_id = self.build(child);
                    self.append(id, child_id);
                }
                id
            }
        }
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    fn data(&self, node: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(node.index)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.data.as_ref()
    }

    fn data_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(node.index)?;
        if slot.generation != node.generation {
            return None;
        }
        slot.data.as_mut()
    }

    fn child_ids(&self, node: NodeId) -> &[NodeId] {
        self.data(node).map(|data| data.children.as_slice()).unwrap_or(&[])
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.data(node)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.data_mut(node)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Whether `node` is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.data(current).and_then(|data| data.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Attached elements in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    fn collect_elements(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.child_ids(node) {
            if self.element(child).is_some() {
                out.push(child);
                self.collect_elements(child, out);
            }
        }
    }

    /// First attached element matching `predicate`, in document order.
    fn find(&self, predicate: impl Fn(&ElementData) -> bool) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.child_ids(self.root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(el) = self.element(id) else {
                continue;
            };
            if predicate(el) {
                return Some(id);
            }
            stack.extend(self.child_ids(id).iter().rev().copied());
        }
        None
    }

    /// Element with the given `id` attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.query("id", id)
    }

    /// Attached elements with the given tag name, in document order.
    pub fn elements_by_tag(&self, name: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(|el| el.name.eq_ignore_ascii_case(name)))
            .collect()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.name.as_str())
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// Markup of the whole document.
    pub fn html(&self) -> String {
        let mut out = String::new();
        for &child in self.child_ids(self.root) {
            self.write(child, &mut out);
        }
        out
    }

    /// Markup of `node`, the node itself included.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write(node, &mut out);
        out
    }

    /// Concatenated text below `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_text(node, &mut out);
        out
    }

    fn write(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.data(node) else {
            return;
        };
        match &data.kind {
            NodeKind::Root => {}
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(body) => {
                out.push_str("<!--");
                out.push_str(body);
                out.push_str("-->");
            }
            NodeKind::Element(el) => {
                markup::write_open_tag(&el.name, &el.attrs, el.flags, out);
                if el.flags.intersects(ElementFlags::VOID | ElementFlags::SELF_CLOSING) {
                    return;
                }
                for &child in &data.children {
                    self.write(child, out);
                }
                markup::write_close_tag(&el.name, out);
            }
        }
    }

    fn write_text(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.data(node) else {
            return;
        };
        if let NodeKind::Text(text) = &data.kind {
            out.push_str(text);
        }
        for &child in &data.children {
            self.write_text(child, out);
        }
    }

    // -------------------------------------------------------------------------
    // Mutation helpers
    // -------------------------------------------------------------------------

    /// Every node in the subtree rooted at `node`.
    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = vec![node];
        let mut index = 0;
        while index < out.len() {
            out.extend(self.child_ids(out[index]).iter().copied());
            index += 1;
        }
        out
    }

    /// Remove `node` and free its subtree, dropping listeners and focus held
    /// inside it. The caller unhooks it from its parent's children.
    fn unlink(&mut self, node: NodeId) {
        let removed = self.subtree(node);
        self.listeners.retain(|(owner, _), _| !removed.contains(owner));
        if self.focused.get().is_some_and(|focused| removed.contains(&focused)) {
            self.focused.set(None);
        }
        self.release(node);
    }

    /// Drop focus.
    pub fn blur(&mut self) {
        self.focused.set(None);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("focused", &self.focused.get())
            .field("html", &self.html())
            .finish()
    }
}

fn text_of(nodes: &[Node]) -> String {
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Host
// =============================================================================

impl Host for Document {
    type Node = NodeId;

    fn mount(&mut self, markup: &str) -> Result<NodeId, HostError> {
        let point = self
            .find(|el| el.attrs.iter().any(|a| a.name == MOUNT_ATTR))
            .ok_or(HostError::MountPointMissing(MOUNT_ATTR))?;
        self.replace(&point, markup)
    }

    fn replace(&mut self, node: &NodeId, markup: &str) -> Result<NodeId, HostError> {
        let node = *node;
        if !self.is_connected(node) {
            return Err(HostError::Detached);
        }
        let Some(parent) = self.data(node).and_then(|data| data.parent) else {
            return Err(HostError::Detached);
        };
        let position = self
            .child_ids(parent)
            .iter()
            .position(|&child| child == node)
            .ok_or(HostError::Detached)?;

        let parsed = markup::parse_fragment(markup);
        let fresh: Vec<NodeId> = parsed.iter().map(|parsed| self.build(parsed)).collect();
        let Some(&first_element) = fresh.iter().find(|&&id| self.element(id).is_some()) else {
            for id in fresh {
                self.release(id);
            }
            return Err(HostError::Markup(format!("no element in {markup:?}")));
        };

        self.unlink(node);
        for &id in &fresh {
            if let Some(data) = self.data_mut(id) {
                data.parent = Some(parent);
            }
        }
        if let Some(data) = self.data_mut(parent) {
            data.children.splice(position..=position, fresh.iter().copied());
        }

        trace!(old = ?node, new = ?first_element, nodes = self.node_count(), "node replaced");
        Ok(first_element)
    }

    fn query(&self, attr: &str, value: &str) -> Option<NodeId> {
        self.find(|el| {
            el.attrs
                .iter()
                .any(|a| a.name == attr && a.value.as_deref().unwrap_or("") == value)
        })
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.child_ids(*node)
            .iter()
            .copied()
            .filter(|&child| self.element(child).is_some())
            .collect()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.data(*node).and_then(|data| data.parent)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.element(*node)?
            .attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.clone().unwrap_or_default())
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(*node) else {
            return;
        };
        match el.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = Some(value.to_string()),
            None => el.attrs.push(Attribute {
                name: name.to_string(),
                value: Some(value.to_string()),
            }),
        }
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        if let Some(el) = self.element_mut(*node) {
            el.attrs.retain(|a| a.name != name);
        }
    }

    fn value(&self, node: &NodeId) -> String {
        self.element(*node)
            .map(|el| el.value.clone())
            .unwrap_or_default()
    }

    fn set_value(&mut self, node: &NodeId, value: &str) {
        if let Some(el) = self.element_mut(*node) {
            el.value = value.to_string();
        }
    }

    fn add_listener(&mut self, node: &NodeId, event: &str, listener: Listener) {
        if self.element(*node).is_none() {
            return;
        }
        let list = self.listeners.entry((*node, event.to_string())).or_default();
        if !list.contains(&listener) {
            list.push(listener);
        }
    }

    fn remove_listener(&mut self, node: &NodeId, event: &str, listener: &Listener) {
        let key = (*node, event.to_string());
        if let Some(list) = self.listeners.get_mut(&key) {
            list.retain(|l| l != listener);
            if list.is_empty() {
                self.listeners.remove(&key);
            }
        }
    }

    fn listeners(&self, node: &NodeId, event: &str) -> Vec<Listener> {
        self.listeners
            .get(&(*node, event.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn focused(&self) -> Option<NodeId> {
        self.focused.get()
    }

    fn focus(&mut self, node: &NodeId) -> bool {
        if self.element(*node).is_none() || !self.is_connected(*node) {
            return false;
        }
        self.focused.set(Some(*node));
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
