//! Conditions freshly loaded content for column pagination.
//!
//! Top-level blocks that only wrap other blocks (no text of their own, no
//! border, nothing special about them) are unwrapped so their children can
//! break across columns individually. Single-column tables are flattened.
//! Optionally, oversized vertical padding/margins are shrunk and media is
//! capped at the viewport height.
//!
//! Geometry reads can force the host to reflow, so every step reads what it
//! needs for its decision first and only then mutates.

use crate::content::{ContentTree, IGNORE_CLASS, NodeKind, Viewport};
use crate::flatten::flatten_and_replace;

/// Inline width applied to columns produced by table flattening.
pub const FLATTENED_COLUMN_WIDTH: &str = "50%";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    pub unwrap_wrappers: bool,
    pub flatten_tables: bool,
    /// Only unwrap elements wider than the viewport. Costs one geometry read
    /// per top-level element, so it is off unless asked for.
    pub overflow_check: bool,
    pub clamp_media: bool,
    pub max_vertical_spacing: Option<f64>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            unwrap_wrappers: true,
            flatten_tables: true,
            overflow_check: false,
            clamp_media: true,
            max_vertical_spacing: None,
        }
    }
}

/// What a normalization pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub unwrapped: usize,
    pub tables_flattened: usize,
    pub spacing_shrunk: usize,
    pub media_clamped: usize,
}

impl NormalizeReport {
    pub fn changed_structure(&self) -> bool {
        self.unwrapped > 0 || self.tables_flattened > 0
    }
}

/// Whether `element` is a plain wrapper the normalizer may unwrap.
///
/// Elements with exactly one element child are never unwrapped here; that
/// shape is left for the table flattener to judge.
pub fn can_flatten<T: ContentTree>(
    tree: &T,
    element: T::Node,
    viewport: Viewport,
    options: &NormalizeOptions,
) -> bool {
    let plain = !tree.has_class(element, IGNORE_CLASS)
        && !tree.has_attribute(element, "border")
        && !matches!(
            tree.kind(element),
            NodeKind::TableRoot
                | NodeKind::Rule
                | NodeKind::Break
                | NodeKind::Image
                | NodeKind::SectionBoundary(_)
        )
        && tree.element_children(element).len() != 1;

    if plain && options.overflow_check {
        return tree.geometry(element).width > viewport.width();
    }
    plain
}

/// Enum of the single structural action chosen for one top-level element.
enum Step {
    Unwrap,
    TryFlatten,
}

/// Normalizes the root's top-level elements in place.
pub fn normalize<T: ContentTree>(
    tree: &mut T,
    viewport: Viewport,
    options: &NormalizeOptions,
) -> NormalizeReport {
    let root = tree.root();
    let mut report = NormalizeReport::default();
    let mut index = 0;

    loop {
        let Some(element) = tree.element_children(root).get(index).copied() else {
            break;
        };

        // Reads first: everything below may invalidate geometry.
        let step = if options.unwrap_wrappers
            && can_flatten(tree, element, viewport, options)
            && !tree.contains_direct_text(element)
        {
            Step::Unwrap
        } else {
            Step::TryFlatten
        };

        match step {
            Step::Unwrap => {
                for child in tree.children(element) {
                    tree.insert_before(element, child);
                }
                tree.remove(element);
                report.unwrapped += 1;
                log::trace!("unwrapped top-level element {element:?}");
                // The first hoisted child now sits at `index`.
                continue;
            }
            Step::TryFlatten if options.flatten_tables => {
                let columns = flatten_and_replace(tree, element);
                if !columns.is_empty() {
                    for column in &columns {
                        tree.set_style(*column, "width", FLATTENED_COLUMN_WIDTH);
                    }
                    report.tables_flattened += 1;
                    continue;
                }
            }
            Step::TryFlatten => {}
        }

        if let Some(max) = options.max_vertical_spacing {
            if shrink_vertical_margins(tree, element, max) {
                report.spacing_shrunk += 1;
            }
        }
        index += 1;
    }

    log::debug!("normalize pass: {report:?}");
    report
}

/// Caps combined vertical padding and margin of `node` at `max`, splitting
/// what remains evenly between top and bottom. Padding is kept in preference
/// to margin. Returns whether anything was rewritten.
pub fn shrink_vertical_margins<T: ContentTree>(tree: &mut T, node: T::Node, max: f64) -> bool {
    let spacing = tree.vertical_spacing(node);
    let padding = spacing.padding();
    let margin = spacing.margin();

    if padding + margin <= max {
        return false;
    }

    let (padding, margin) = if padding > max {
        (max, 0.0)
    } else {
        (padding, (max - padding).max(0.0))
    };

    let half_padding = format!("{}px", padding / 2.0);
    let half_margin = format!("{}px", margin / 2.0);
    tree.set_style(node, "padding-top", &half_padding);
    tree.set_style(node, "padding-bottom", &half_padding);
    tree.set_style(node, "margin-top", &half_margin);
    tree.set_style(node, "margin-bottom", &half_margin);
    true
}

/// Stops media from overflowing a page: every image-like node gets a
/// `max-height` of the viewport height. Returns how many nodes were touched.
pub fn clamp_media_height<T: ContentTree>(tree: &mut T, viewport: Viewport) -> usize {
    let mut media = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(node) = stack.pop() {
        match tree.kind(node) {
            NodeKind::Image => media.push(node),
            NodeKind::Unknown | NodeKind::Text => {}
            _ => stack.extend(tree.children(node).into_iter().rev()),
        }
    }

    let max_height = format!("{}px", viewport.height());
    for node in &media {
        tree.set_style(*node, "max-height", &max_height);
    }
    media.len()
}

/// The load-time conditioning pass: clamp media, then normalize.
///
/// Running it twice is the same as running it once.
pub fn normalize_and_flatten<T: ContentTree>(
    tree: &mut T,
    viewport: Viewport,
    options: &NormalizeOptions,
) -> NormalizeReport {
    let media_clamped = if options.clamp_media {
        clamp_media_height(tree, viewport)
    } else {
        0
    };

    NormalizeReport {
        media_clamped,
        ..normalize(tree, viewport, options)
    }
}
