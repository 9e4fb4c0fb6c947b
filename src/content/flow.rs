//! A crude multi-column flow that stands in for a real rendering engine.
//!
//! Text is measured with a fixed advance per character and broken into lines
//! of `column_width`; lines stack until the column is full, then continue at
//! the top of the next column, `column_width + column_gap` to the right.
//! That is enough to give every node the kind of geometry a browser reports
//! for a horizontally paginated body: the left offset of the column the node
//! starts in, the column width and the height it consumes.

use super::memory::{MemoryTree, NodeId};
use super::{ContentTree, Geometry, NodeKind, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowLayout {
    pub column_width: f64,
    pub column_height: f64,
    pub column_gap: f64,
    pub line_height: f64,
    pub char_width: f64,
    pub media_height: f64,
}

impl FlowLayout {
    /// One column per viewport, as in single-page display.
    pub fn for_viewport(viewport: Viewport, column_gap: f64) -> Self {
        Self {
            column_width: viewport.width(),
            column_height: viewport.height(),
            column_gap,
            line_height: 20.0,
            char_width: 8.0,
            media_height: viewport.height() / 2.0,
        }
    }

    /// A single endless column, as in scroll display.
    pub fn continuous(mut self) -> Self {
        self.column_height = f64::INFINITY;
        self
    }

    pub fn with_metrics(mut self, line_height: f64, char_width: f64) -> Self {
        self.line_height = line_height;
        self.char_width = char_width;
        self
    }

    fn stride(&self) -> f64 {
        self.column_width + self.column_gap
    }

    fn lines_for(&self, text: &str) -> usize {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return 0;
        }
        let chars_per_line = ((self.column_width / self.char_width).floor() as usize).max(1);
        trimmed.chars().count().div_ceil(chars_per_line)
    }

    /// Lays out every attached node and returns the number of columns used.
    pub fn apply(&self, tree: &mut MemoryTree) -> usize {
        let mut cursor = Cursor::default();
        let mut open: Vec<(NodeId, Option<Cursor>)> = Vec::new();
        let mut placed: Vec<(NodeId, Geometry)> = Vec::new();

        let root = tree.root();
        let mut stack: Vec<(NodeId, bool)> = tree
            .children(root)
            .into_iter()
            .rev()
            .map(|child| (child, false))
            .collect();

        while let Some((node, exiting)) = stack.pop() {
            if exiting {
                if let Some((_, start)) = open.pop() {
                    placed.push((node, self.geometry_between(start.unwrap_or(cursor), cursor)));
                }
                continue;
            }

            match tree.kind(node) {
                NodeKind::Unknown | NodeKind::SectionBoundary(_) => {
                    placed.push((node, self.geometry_between(cursor, cursor)));
                }
                NodeKind::Text => {
                    let lines = tree.text(node).map_or(0, |text| self.lines_for(&text));
                    let start = (lines > 0).then(|| {
                        let start = self.advance(&mut cursor, self.line_height, &mut open);
                        for _ in 1..lines {
                            self.advance(&mut cursor, self.line_height, &mut open);
                        }
                        start
                    });
                    placed.push((node, self.geometry_between(start.unwrap_or(cursor), cursor)));
                }
                kind => {
                    open.push((node, None));
                    match kind {
                        NodeKind::Image => {
                            let height = self.media_height.min(self.column_height);
                            self.advance(&mut cursor, height, &mut open);
                        }
                        NodeKind::Rule | NodeKind::Break => {
                            self.advance(&mut cursor, self.line_height, &mut open);
                        }
                        _ => {}
                    }
                    stack.push((node, true));
                    stack.extend(
                        tree.children(node)
                            .into_iter()
                            .rev()
                            .map(|child| (child, false)),
                    );
                }
            }
        }

        let columns = if cursor.y > 0.0 {
            cursor.column + 1
        } else {
            cursor.column.max(1)
        };
        for (node, geometry) in placed {
            tree.set_geometry(node, geometry);
        }
        let height = if self.column_height.is_finite() {
            self.column_height
        } else {
            cursor.y
        };
        tree.set_geometry(
            root,
            Geometry::new(
                0.0,
                0.0,
                columns as f64 * self.stride() - self.column_gap,
                height,
            ),
        );
        log::debug!("flow layout placed content in {columns} columns");
        columns
    }

    /// Consumes `height` at the cursor, breaking to the next column when it
    /// doesn't fit, and returns where the consumed block starts.
    fn advance(
        &self,
        cursor: &mut Cursor,
        height: f64,
        open: &mut [(NodeId, Option<Cursor>)],
    ) -> Cursor {
        if cursor.y > 0.0 && cursor.y + height > self.column_height {
            cursor.column += 1;
            cursor.y = 0.0;
        }
        let start = *cursor;
        for (_, element_start) in open.iter_mut() {
            element_start.get_or_insert(start);
        }
        cursor.y += height;
        start
    }

    fn geometry_between(&self, start: Cursor, end: Cursor) -> Geometry {
        let spanned = end.column.saturating_sub(start.column);
        let carried = if spanned == 0 {
            0.0
        } else {
            spanned as f64 * self.column_height
        };
        Geometry::new(
            start.column as f64 * self.stride(),
            start.y,
            self.column_width,
            end.y - start.y + carried,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Cursor {
    column: usize,
    y: f64,
}
