//! Section boundary markers within an assembled document.

use crate::content::{
    ContentTree, NodeKind, SECTION_END_CLASS, SECTION_START_CLASS, SectionId, Viewport,
};
use crate::pages::page_of_edge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEdge {
    Start,
    End,
    /// A boundary without a start/end class.
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMarker<N> {
    pub node: N,
    pub section_id: SectionId,
    pub edge: MarkerEdge,
}

/// All boundary markers in document order.
pub fn markers<T: ContentTree>(tree: &T) -> Vec<SectionMarker<T::Node>> {
    let mut found = Vec::new();
    let mut stack: Vec<T::Node> = tree.children(tree.root()).into_iter().rev().collect();

    while let Some(node) = stack.pop() {
        match tree.kind(node) {
            NodeKind::Text | NodeKind::Unknown => continue,
            NodeKind::SectionBoundary(section_id) => {
                let edge = if tree.has_class(node, SECTION_START_CLASS) {
                    MarkerEdge::Start
                } else if tree.has_class(node, SECTION_END_CLASS) {
                    MarkerEdge::End
                } else {
                    MarkerEdge::Bare
                };
                found.push(SectionMarker {
                    node,
                    section_id,
                    edge,
                });
            }
            _ => {}
        }
        stack.extend(tree.children(node).into_iter().rev());
    }

    found
}

/// Ids of the sections present, in document order, without repeats.
pub fn section_ids<T: ContentTree>(tree: &T) -> Vec<SectionId> {
    let mut ids: Vec<SectionId> = Vec::new();
    for marker in markers(tree) {
        if !ids.contains(&marker.section_id) {
            ids.push(marker.section_id);
        }
    }
    ids
}

/// The node a scroll display jumps to for `section_id`: its start marker,
/// or the first bare boundary with that id.
pub fn find_section_start<T: ContentTree>(tree: &T, section_id: SectionId) -> Option<T::Node> {
    markers(tree)
        .into_iter()
        .find(|marker| marker.section_id == section_id && marker.edge != MarkerEdge::End)
        .map(|marker| marker.node)
}

/// Page a section opens on, counted the way [`crate::address::page_for_address`]
/// counts.
pub fn section_start_page<T: ContentTree>(
    tree: &T,
    section_id: SectionId,
    viewport: Viewport,
) -> Option<usize> {
    let marker = find_section_start(tree, section_id)?;
    Some(page_of_edge(tree.geometry(marker).right(), viewport.width()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Geometry;
    use crate::content::html::{Chapter, SectionAssembler};

    #[test]
    fn test_markers_from_assembled_chapters() {
        let mut assembler = SectionAssembler::new();
        for (id, body) in [(2, "<p>a</p>"), (5, "<p>b</p>")] {
            assembler.push_chapter(&Chapter::new(id, body)).unwrap();
        }
        let tree = assembler.finish();

        let found = markers(&tree);
        let edges: Vec<(SectionId, MarkerEdge)> =
            found.iter().map(|m| (m.section_id, m.edge)).collect();
        assert_eq!(
            edges,
            vec![
                (2, MarkerEdge::Start),
                (2, MarkerEdge::End),
                (5, MarkerEdge::Start),
                (5, MarkerEdge::End),
            ]
        );
        assert_eq!(section_ids(&tree), vec![2, 5]);
        assert_eq!(find_section_start(&tree, 5), Some(found[2].node));
        assert_eq!(find_section_start(&tree, 9), None);
    }

    #[test]
    fn test_section_start_page() {
        let mut tree = crate::content::MemoryTree::new();
        let root = tree.root();
        let bare = tree.append_element(root, "div", NodeKind::SectionBoundary(3));
        tree.set_geometry(bare, Geometry::new(1200.0, 0.0, 600.0, 0.0));
        let viewport = Viewport::new(600.0, 800.0).unwrap();

        assert_eq!(markers(&tree)[0].edge, MarkerEdge::Bare);
        assert_eq!(section_start_page(&tree, 3, viewport), Some(3));
        assert_eq!(section_start_page(&tree, 4, viewport), None);
    }
}
