//! Geometry-independent reading positions.
//!
//! A position is the number of non-whitespace text units that precede it in
//! document order, plus the id of the last section boundary crossed. Nothing
//! is indexed ahead of time: every query replays the same depth-first walk
//! over the live tree, so the answer always reflects the current layout.

use std::fmt;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::content::{ContentTree, Geometry, NodeKind, SectionId, Viewport};
use crate::pages::page_of_edge;

/// A reading position that survives reflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteAddress {
    pub byte_count: usize,
    /// Last boundary marker crossed; `None` before the first one. Stored as
    /// `-1` on disk.
    #[serde(with = "section_sentinel")]
    pub section_id: Option<SectionId>,
}

impl ByteAddress {
    pub fn new(byte_count: usize, section_id: Option<SectionId>) -> Self {
        Self {
            byte_count,
            section_id,
        }
    }
}

impl fmt::Display for ByteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.section_id {
            Some(section) => write!(f, "{}@{}", self.byte_count, section),
            None => write!(f, "{}@-", self.byte_count),
        }
    }
}

mod section_sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::content::SectionId;

    pub fn serialize<S: Serializer>(
        value: &Option<SectionId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.unwrap_or(-1))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SectionId>, D::Error> {
        let raw = SectionId::deserialize(deserializer)?;
        Ok((raw >= 0).then_some(raw))
    }
}

/// One text run as seen by the walk.
struct RunVisit<N> {
    owner: N,
    length: usize,
    bytes_before: usize,
    section_id: Option<SectionId>,
}

impl<N> RunVisit<N> {
    fn bytes_after(&self) -> usize {
        self.bytes_before + self.length
    }
}

/// Length of a text run in address units, zero for whitespace-only text.
pub fn run_length(text: &str) -> usize {
    text.trim().chars().count()
}

/// Depth-first document-order walk over text runs, tracking accumulated
/// length and the current section. Stops when `visit` breaks.
fn walk_runs<T, R, F>(tree: &T, mut visit: F) -> Option<R>
where
    T: ContentTree,
    F: FnMut(&RunVisit<T::Node>) -> ControlFlow<R>,
{
    let mut stack: Vec<T::Node> = tree.children(tree.root()).into_iter().rev().collect();
    let mut bytes = 0;
    let mut section_id = None;

    while let Some(node) = stack.pop() {
        match tree.kind(node) {
            NodeKind::Text => {
                let length = tree.text(node).map_or(0, |text| run_length(&text));
                if length == 0 {
                    continue;
                }
                let Some(owner) = tree.parent(node) else {
                    continue;
                };

                let run = RunVisit {
                    owner,
                    length,
                    bytes_before: bytes,
                    section_id,
                };
                if let ControlFlow::Break(found) = visit(&run) {
                    return Some(found);
                }
                bytes = run.bytes_after();
            }
            NodeKind::Unknown => {
                log::trace!("address walk skipping opaque node {node:?}");
            }
            kind => {
                if let NodeKind::SectionBoundary(id) = kind {
                    section_id = Some(id);
                }
                stack.extend(tree.children(node).into_iter().rev());
            }
        }
    }

    None
}

/// Remembers the geometry of the last owner read; consecutive runs usually
/// share one.
struct OwnerGeometry<'t, T: ContentTree> {
    tree: &'t T,
    last: Option<(T::Node, Geometry)>,
}

impl<'t, T: ContentTree> OwnerGeometry<'t, T> {
    fn new(tree: &'t T) -> Self {
        Self { tree, last: None }
    }

    fn get(&mut self, owner: T::Node) -> Geometry {
        match self.last {
            Some((node, geometry)) if node == owner => geometry,
            _ => {
                let geometry = self.tree.geometry(owner);
                self.last = Some((owner, geometry));
                geometry
            }
        }
    }
}

/// Address of the first text run whose container starts past
/// `scroll_offset`, or `None` when no run does.
pub fn current_address<T: ContentTree>(tree: &T, scroll_offset: f64) -> Option<ByteAddress> {
    let mut geometry = OwnerGeometry::new(tree);
    let address = walk_runs(tree, |run| {
        if scroll_offset - geometry.get(run.owner).left < 0.0 {
            ControlFlow::Break(ByteAddress::new(run.bytes_before, run.section_id))
        } else {
            ControlFlow::Continue(())
        }
    });
    log::trace!("current address at {scroll_offset}: {address:?}");
    address
}

/// Page holding the text run that contains `address`.
pub fn page_for_address<T: ContentTree>(
    tree: &T,
    address: usize,
    viewport: Viewport,
) -> Option<usize> {
    let width = viewport.width();
    walk_runs(tree, |run| {
        if run.bytes_after() > address {
            let owner = tree.geometry(run.owner);
            ControlFlow::Break(page_of_edge(owner.right(), width))
        } else {
            ControlFlow::Continue(())
        }
    })
}

/// Element owning the text run that contains `address`.
pub fn element_for_address<T: ContentTree>(tree: &T, address: usize) -> Option<T::Node> {
    walk_runs(tree, |run| {
        if run.bytes_after() > address {
            ControlFlow::Break(run.owner)
        } else {
            ControlFlow::Continue(())
        }
    })
}

/// Total address units in the tree.
pub fn total_length<T: ContentTree>(tree: &T) -> usize {
    let mut total = 0;
    walk_runs::<T, (), _>(tree, |run| {
        total = run.bytes_after();
        ControlFlow::Continue(())
    });
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{MemoryTree, NodeId};

    fn block(tree: &mut MemoryTree, text: &str, left: f64) -> NodeId {
        let root = tree.root();
        let p = tree.append_element(root, "p", NodeKind::Container);
        tree.append_text(p, text);
        tree.set_geometry(p, Geometry::new(left, 0.0, 1000.0, 20.0));
        p
    }

    fn marker(tree: &mut MemoryTree, id: SectionId) -> NodeId {
        let root = tree.root();
        tree.append_element(root, "div", NodeKind::SectionBoundary(id))
    }

    #[test]
    fn test_section_crossing() {
        let mut tree = MemoryTree::new();
        block(&mut tree, "Hello", 0.0);
        marker(&mut tree, 7);
        block(&mut tree, "World", 1000.0);

        assert_eq!(
            current_address(&tree, 500.0),
            Some(ByteAddress::new(5, Some(7)))
        );
    }

    #[test]
    fn test_before_first_marker_has_no_section() {
        let mut tree = MemoryTree::new();
        block(&mut tree, "Hello", 0.0);
        block(&mut tree, "World", 1000.0);

        assert_eq!(current_address(&tree, 500.0), Some(ByteAddress::new(5, None)));
        // A run sitting exactly at the scroll offset is not "past" it.
        assert_eq!(current_address(&tree, 1000.0), None);
    }

    #[test]
    fn test_negative_scroll_hits_first_run() {
        let mut tree = MemoryTree::new();
        block(&mut tree, "Hello", 0.0);
        assert_eq!(current_address(&tree, -1.0), Some(ByteAddress::new(0, None)));
    }

    #[test]
    fn test_empty_or_whitespace_content_is_not_found() {
        let mut tree = MemoryTree::new();
        assert_eq!(current_address(&tree, 0.0), None);
        assert_eq!(element_for_address(&tree, 0), None);

        block(&mut tree, "  \n\t ", 100.0);
        assert_eq!(current_address(&tree, 0.0), None);
        assert_eq!(total_length(&tree), 0);
    }

    #[test]
    fn test_element_for_address_uses_strict_threshold() {
        let mut tree = MemoryTree::new();
        let first = block(&mut tree, "abc", 0.0);
        let second = block(&mut tree, "  defg  ", 1000.0);

        assert_eq!(element_for_address(&tree, 0), Some(first));
        assert_eq!(element_for_address(&tree, 2), Some(first));
        assert_eq!(element_for_address(&tree, 3), Some(second));
        assert_eq!(element_for_address(&tree, 6), Some(second));
        assert_eq!(element_for_address(&tree, 7), None);
        assert_eq!(total_length(&tree), 7);
    }

    #[test]
    fn test_page_for_address() {
        let mut tree = MemoryTree::new();
        block(&mut tree, "abc", 0.0);
        block(&mut tree, "def", 2000.0);
        let viewport = Viewport::new(1000.0, 800.0).unwrap();

        assert_eq!(page_for_address(&tree, 1, viewport), Some(1));
        assert_eq!(page_for_address(&tree, 4, viewport), Some(3));
        assert_eq!(page_for_address(&tree, 99, viewport), None);
    }

    #[test]
    fn test_nested_runs_and_opaque_nodes() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let p = tree.append_element(root, "p", NodeKind::Container);
        tree.set_geometry(p, Geometry::new(0.0, 0.0, 1000.0, 20.0));
        tree.append_text(p, "ab");
        let em = tree.append_element(p, "em", NodeKind::Container);
        tree.set_geometry(em, Geometry::new(1000.0, 0.0, 1000.0, 20.0));
        tree.append_text(em, "cd");
        tree.append_opaque(p, "script");
        tree.append_text(p, "ef");

        assert_eq!(element_for_address(&tree, 2), Some(em));
        assert_eq!(element_for_address(&tree, 4), Some(p));
        assert_eq!(current_address(&tree, 500.0), Some(ByteAddress::new(2, None)));
    }

    #[test]
    fn test_round_trip_through_element() {
        let mut tree = MemoryTree::new();
        let mut blocks = Vec::new();
        for (i, text) in ["one", "two", "three", "four"].iter().enumerate() {
            if i == 2 {
                marker(&mut tree, 1);
            }
            blocks.push(block(&mut tree, text, i as f64 * 1000.0));
        }

        for (i, expected) in blocks.iter().enumerate().skip(1) {
            let scroll = i as f64 * 1000.0 - 1.0;
            let address = current_address(&tree, scroll).unwrap();
            assert_eq!(element_for_address(&tree, address.byte_count), Some(*expected));
        }
    }

    #[test]
    fn test_owner_geometry_is_read_once_per_owner() {
        let mut tree = MemoryTree::new();
        let p = block(&mut tree, "one", 0.0);
        tree.append_text(p, "two");
        tree.append_text(p, "three");
        block(&mut tree, "four", 1000.0);

        current_address(&tree, 500.0);
        assert_eq!(tree.geometry_reads(), 2);
    }

    #[test]
    fn test_serialized_sentinel() {
        let json = serde_json::to_string(&ByteAddress::new(12, None)).unwrap();
        assert_eq!(json, r#"{"byte_count":12,"section_id":-1}"#);

        let parsed: ByteAddress = serde_json::from_str(r#"{"byte_count":3,"section_id":4}"#).unwrap();
        assert_eq!(parsed, ByteAddress::new(3, Some(4)));

        let before: ByteAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(before.section_id, None);
        assert_eq!(before.to_string(), "12@-");
    }
}
