//! Arena-backed [`ContentTree`] used by shells without a live rendering
//! surface and by the test suites.
//!
//! Nodes are never freed: removing a node only detaches it, so stale
//! [`NodeId`]s stay valid (and harmless) for the rest of the tree's life.

use std::borrow::Cow;
use std::cell::Cell;
use std::fmt::Write as _;

use super::{ContentTree, Geometry, NodeKind, VerticalSpacing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
struct NodeSlot {
    kind: NodeKind,
    tag: String,
    text: Option<String>,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    style: Vec<(String, String)>,
    geometry: Geometry,
    spacing: VerticalSpacing,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeSlot {
    fn new(kind: NodeKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            text: None,
            attributes: Vec::new(),
            classes: Vec::new(),
            style: Vec::new(),
            geometry: Geometry::default(),
            spacing: VerticalSpacing::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn detached_copy(&self) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTree {
    nodes: Vec<NodeSlot>,
    root: NodeId,
    geometry_reads: Cell<usize>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for MemoryTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.nodes == other.nodes
    }
}

impl MemoryTree {
    /// Creates a tree holding only an empty `body` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeSlot::new(NodeKind::Container, "body")],
            root: NodeId(0),
            geometry_reads: Cell::new(0),
        }
    }

    fn slot(&self, node: NodeId) -> &NodeSlot {
        &self.nodes[node.0]
    }

    fn slot_mut(&mut self, node: NodeId) -> &mut NodeSlot {
        &mut self.nodes[node.0]
    }

    fn push_slot(&mut self, slot: NodeSlot) -> NodeId {
        self.nodes.push(slot);
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str, kind: NodeKind) -> NodeId {
        let node = self.push_slot(NodeSlot::new(kind, tag));
        self.append_child(parent, node);
        node
    }

    pub fn append_text(&mut self, parent: NodeId, content: &str) -> NodeId {
        let mut slot = NodeSlot::new(NodeKind::Text, "#text");
        slot.text = Some(content.to_string());
        let node = self.push_slot(slot);
        self.append_child(parent, node);
        node
    }

    /// Appends a node the walks treat as opaque (comment, script, style).
    pub fn append_opaque(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.append_element(parent, tag, NodeKind::Unknown)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if name == "class" {
            let slot = self.slot_mut(node);
            slot.classes = value.split_whitespace().map(str::to_string).collect();
            return;
        }

        let attributes = &mut self.slot_mut(node).attributes;
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn set_geometry(&mut self, node: NodeId, geometry: Geometry) {
        self.slot_mut(node).geometry = geometry;
    }

    pub fn set_spacing(&mut self, node: NodeId, spacing: VerticalSpacing) {
        self.slot_mut(node).spacing = spacing;
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.slot(node).tag
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.slot(node)
            .style
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        while let Some(parent) = self.slot(current).parent {
            current = parent;
        }
        current == self.root
    }

    /// Number of geometry reads served since creation.
    pub fn geometry_reads(&self) -> usize {
        self.geometry_reads.get()
    }

    /// Attached text nodes of `node`'s subtree concatenated in document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let slot = self.slot(current);
            if let Some(text) = &slot.text {
                out.push_str(text);
            }
            stack.extend(slot.children.iter().rev().copied());
        }
        out
    }

    /// Serializes the subtree as markup. Geometry is not included.
    pub fn to_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        let slot = self.slot(node);
        if slot.kind == NodeKind::Text {
            out.push_str(slot.text.as_deref().unwrap_or_default());
            return;
        }

        let _ = write!(out, "<{}", slot.tag);
        if !slot.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", slot.classes.join(" "));
        }
        for (name, value) in &slot.attributes {
            let _ = write!(out, " {name}=\"{value}\"");
        }
        if !slot.style.is_empty() {
            let declarations: Vec<String> = slot
                .style
                .iter()
                .map(|(property, value)| format!("{property}: {value}"))
                .collect();
            let _ = write!(out, " style=\"{}\"", declarations.join("; "));
        }
        out.push('>');
        for child in &slot.children {
            self.write_markup(*child, out);
        }
        let _ = write!(out, "</{}>", slot.tag);
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.slot_mut(node).parent.take() {
            self.slot_mut(parent).children.retain(|child| *child != node);
        }
    }
}

fn parse_px(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").trim().parse().ok()
}

impl ContentTree for MemoryTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.slot(node).children.clone()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node).parent
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.slot(node).kind
    }

    fn geometry(&self, node: NodeId) -> Geometry {
        self.geometry_reads.set(self.geometry_reads.get() + 1);
        self.slot(node).geometry
    }

    fn vertical_spacing(&self, node: NodeId) -> VerticalSpacing {
        let mut spacing = self.slot(node).spacing;
        let overrides = [
            ("padding-top", &mut spacing.padding_top),
            ("padding-bottom", &mut spacing.padding_bottom),
            ("margin-top", &mut spacing.margin_top),
            ("margin-bottom", &mut spacing.margin_bottom),
        ];
        for (property, field) in overrides {
            if let Some(value) = self.style(node, property).and_then(parse_px) {
                *field = value;
            }
        }
        spacing
    }

    fn text(&self, node: NodeId) -> Option<Cow<'_, str>> {
        self.slot(node).text.as_deref().map(Cow::Borrowed)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let slot = self.slot(node);
        if name == "class" {
            return (!slot.classes.is_empty()).then(|| slot.classes.join(" "));
        }
        slot.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn has_class(&self, node: NodeId, name: &str) -> bool {
        self.slot(node).classes.iter().any(|class| class == name)
    }

    fn create_container(&mut self) -> NodeId {
        self.push_slot(NodeSlot::new(NodeKind::Container, "div"))
    }

    fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        let copy = self.slot(node).detached_copy();
        let top = self.push_slot(copy);

        let mut pending: Vec<(NodeId, NodeId)> = self
            .slot(node)
            .children
            .iter()
            .rev()
            .map(|child| (*child, top))
            .collect();

        while let Some((source, target_parent)) = pending.pop() {
            let copy = self.slot(source).detached_copy();
            let cloned = self.push_slot(copy);
            self.append_child(target_parent, cloned);
            pending.extend(
                self.slot(source)
                    .children
                    .iter()
                    .rev()
                    .map(|child| (*child, cloned)),
            );
        }

        top
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.slot_mut(child).parent = Some(parent);
        self.slot_mut(parent).children.push(child);
    }

    fn insert_before(&mut self, reference: NodeId, new_node: NodeId) {
        let Some(parent) = self.slot(reference).parent else {
            log::warn!("insert_before on detached reference {reference:?}");
            return;
        };
        self.detach(new_node);
        let siblings = &mut self.slot_mut(parent).children;
        let index = siblings
            .iter()
            .position(|sibling| *sibling == reference)
            .unwrap_or(siblings.len());
        siblings.insert(index, new_node);
        self.slot_mut(new_node).parent = Some(parent);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let style = &mut self.slot_mut(node).style;
        match style.iter_mut().find(|(key, _)| key == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => style.push((property.to_string(), value.to_string())),
        }
    }

    fn add_class(&mut self, node: NodeId, name: &str) {
        if !self.has_class(node, name) {
            self.slot_mut(node).classes.push(name.to_string());
        }
    }

    fn remove_class(&mut self, node: NodeId, name: &str) {
        self.slot_mut(node).classes.retain(|class| class != name);
    }
}
