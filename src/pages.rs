//! Page count of a horizontally paginated body.
//!
//! Pages are viewport-wide columns laid side by side, so the trailing edge of
//! the last block divided by the viewport width recovers how many columns the
//! content occupies.

use crate::content::{ContentTree, Viewport};

/// Number of pages the current layout spans, never less than one.
pub fn count_pages<T: ContentTree>(tree: &T, viewport: Viewport) -> usize {
    let Some(last) = tree.element_children(tree.root()).pop() else {
        return 1;
    };

    let geometry = tree.geometry(last);
    page_of_edge(geometry.right(), viewport.width()).max(1)
}

/// Scroll-mode equivalent of [`count_pages`]: screens of viewport height.
pub fn count_pages_vertical<T: ContentTree>(tree: &T, viewport: Viewport) -> usize {
    let Some(last) = tree.element_children(tree.root()).pop() else {
        return 1;
    };

    let geometry = tree.geometry(last);
    page_of_edge(geometry.bottom(), viewport.height()).max(1)
}

/// Column index of a trailing edge, rounding half away from zero.
pub(crate) fn page_of_edge(edge: f64, extent: f64) -> usize {
    (edge / extent).round().abs() as usize
}
