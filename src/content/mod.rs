//! The boundary between the pager and whatever owns the rendered tree.
//!
//! The pager never owns content nodes. It is written against [`ContentTree`],
//! a capability interface over a host rendering surface: a read-only view of
//! the rendered tree and its geometry, plus the handful of mutations the
//! normalizer and table flattener need. Node handles are only held for the
//! duration of one pass because the host is free to reflow (and invalidate
//! every geometry value) between calls.

use std::borrow::Cow;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{PagerError, Result};

pub mod flow;
pub mod html;
pub mod memory;

pub use memory::{MemoryTree, NodeId};

/// Identifier carried by a section boundary marker.
pub type SectionId = i64;

/// Class marking nodes the normalizer must leave alone.
pub const IGNORE_CLASS: &str = "reader-ignore";
pub const SECTION_START_CLASS: &str = "reader-section-start";
pub const SECTION_END_CLASS: &str = "reader-section-end";
pub const SECTION_ID_ATTR: &str = "data-section-id";

/// Element classification as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Any generic block or inline element.
    Container,
    TableRoot,
    /// `thead`, `tbody` or `tfoot`.
    TableSection,
    Row,
    Cell,
    Anchor,
    /// Images, inline SVG and other replaced media.
    Image,
    Rule,
    Break,
    SectionBoundary(SectionId),
    Text,
    /// Nodes with neither content nor layout (comments, scripts, styles).
    Unknown,
}

impl NodeKind {
    pub fn is_element(&self) -> bool {
        !matches!(self, NodeKind::Text | NodeKind::Unknown)
    }
}

/// Layout box of a node in CSS pixels, relative to the paginated root.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Computed vertical padding and margin of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VerticalSpacing {
    pub padding_top: f64,
    pub padding_bottom: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
}

impl VerticalSpacing {
    pub fn padding(&self) -> f64 {
        self.padding_top + self.padding_bottom
    }

    pub fn margin(&self) -> f64 {
        self.margin_top + self.margin_bottom
    }
}

/// Content-box size of the paginated region.
///
/// Constructing one is the only place a zero or negative width can be
/// rejected; every pass downstream divides by it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: f64,
    height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(PagerError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// Capability interface over the host's rendered tree.
///
/// Every geometry read may force the host to reflow, so callers batch reads
/// before mutating and cache values they need more than once.
pub trait ContentTree {
    type Node: Copy + Eq + Hash + Debug;

    /// The paginated root container (the document body).
    fn root(&self) -> Self::Node;

    /// All child nodes in document order, text nodes included.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn kind(&self, node: Self::Node) -> NodeKind;

    fn geometry(&self, node: Self::Node) -> Geometry;

    fn vertical_spacing(&self, node: Self::Node) -> VerticalSpacing;

    /// Character data of a text node; `None` for elements.
    fn text(&self, node: Self::Node) -> Option<Cow<'_, str>>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<String>;

    fn has_attribute(&self, node: Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn has_class(&self, node: Self::Node, name: &str) -> bool;

    /// Creates a detached generic container.
    fn create_container(&mut self) -> Self::Node;

    /// Deep, content-preserving copy of `node`, detached from the tree.
    fn clone_subtree(&mut self, node: Self::Node) -> Self::Node;

    /// Appends `child` as the last child of `parent`, detaching it first.
    fn append_child(&mut self, parent: Self::Node, child: Self::Node);

    /// Inserts `new_node` immediately before `reference`, detaching it first.
    fn insert_before(&mut self, reference: Self::Node, new_node: Self::Node);

    /// Detaches `node` (and its subtree) from its parent.
    fn remove(&mut self, node: Self::Node);

    fn set_style(&mut self, node: Self::Node, property: &str, value: &str);

    fn add_class(&mut self, node: Self::Node, name: &str);

    fn remove_class(&mut self, node: Self::Node, name: &str);

    /// Children that are elements, the equivalent of a DOM `children`
    /// collection.
    fn element_children(&self, node: Self::Node) -> Vec<Self::Node> {
        self.children(node)
            .into_iter()
            .filter(|child| self.kind(*child).is_element())
            .collect()
    }

    /// True if one of the node's direct children is a text node holding
    /// anything besides whitespace.
    fn contains_direct_text(&self, node: Self::Node) -> bool {
        self.children(node).into_iter().any(|child| {
            self.kind(child) == NodeKind::Text
                && self
                    .text(child)
                    .is_some_and(|text| !text.trim().is_empty())
        })
    }
}
