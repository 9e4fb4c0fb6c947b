//! Turns single-column "tables" into plain column containers.
//!
//! Publishers often lay out vertical lists (glossaries, footnote blocks,
//! poetry) as a table whose rows each hold one cell. Inside a paginated
//! column such a table can't break across pages, so it is replaced by one
//! container per row. Genuine tables (any row with several cells) are left
//! exactly as they are.
//!
//! Horizontal lists (one row, many cells) are not handled.

use crate::content::{ContentTree, NodeKind};

/// Column containers built from a matching table, in row order. Empty when
/// the table didn't match.
pub type FlattenResult<N> = Vec<N>;

/// Builds detached column containers for a single-column table.
///
/// The shape of the whole table is validated before anything is created, so
/// a table that doesn't match leaves the tree exactly as it was.
pub fn flatten<T: ContentTree>(tree: &mut T, table: T::Node) -> FlattenResult<T::Node> {
    let Some(cells) = single_column_cells(tree, table) else {
        return Vec::new();
    };

    let mut columns = Vec::with_capacity(cells.len());
    for cell in cells {
        let column = tree.create_container();
        for child in tree.children(cell) {
            let copy = tree.clone_subtree(child);
            tree.append_child(column, copy);
        }
        columns.push(column);
    }
    columns
}

/// Flattens `table` and splices the columns into its place.
pub fn flatten_and_replace<T: ContentTree>(
    tree: &mut T,
    table: T::Node,
) -> FlattenResult<T::Node> {
    let columns = flatten(tree, table);
    if columns.is_empty() {
        return columns;
    }

    for column in &columns {
        tree.insert_before(table, *column);
    }
    tree.remove(table);
    log::debug!(
        "flattened table {table:?} into {} columns",
        columns.len()
    );
    columns
}

/// The one cell of every row, or `None` when `table` isn't a single-column
/// table. Read-only.
fn single_column_cells<T: ContentTree>(tree: &T, table: T::Node) -> Option<Vec<T::Node>> {
    if tree.kind(table) != NodeKind::TableRoot {
        return None;
    }

    let rows = row_container(tree, table)?;
    if rows.len() == 1 {
        log::trace!("table {table:?} has a single row, leaving it alone");
        return None;
    }

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        if tree.kind(row) != NodeKind::Row {
            log::debug!("skipping {:?} inside table {table:?}", tree.kind(row));
            continue;
        }

        // Every element child counts, header cells and stray markup included.
        match tree.element_children(row).as_slice() {
            [cell] => cells.push(*cell),
            [] => continue,
            _ => {
                log::trace!("table {table:?} has a multi-cell row, leaving it alone");
                return None;
            }
        }
    }

    (!cells.is_empty()).then_some(cells)
}

/// Element children of the node holding the rows: the lone `thead`/`tbody`/
/// `tfoot`, or the table itself when it holds rows directly.
fn row_container<T: ContentTree>(tree: &T, table: T::Node) -> Option<Vec<T::Node>> {
    let children = tree.element_children(table);

    if let [section] = children.as_slice() {
        if tree.kind(*section) == NodeKind::TableSection {
            return Some(tree.element_children(*section));
        }
    }

    let all_rows =
        !children.is_empty() && children.iter().all(|child| tree.kind(*child) == NodeKind::Row);
    all_rows.then_some(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{MemoryTree, NodeId};

    fn table_with_rows(tree: &mut MemoryTree, rows: &[&[&str]], with_body: bool) -> NodeId {
        let root = tree.root();
        let table = tree.append_element(root, "table", NodeKind::TableRoot);
        let container = if with_body {
            tree.append_element(table, "tbody", NodeKind::TableSection)
        } else {
            table
        };
        for cells in rows {
            let tr = tree.append_element(container, "tr", NodeKind::Row);
            tree.append_text(tr, "\n  ");
            for text in *cells {
                let td = tree.append_element(tr, "td", NodeKind::Cell);
                tree.append_text(td, text);
            }
        }
        table
    }

    #[test]
    fn test_flattens_single_column_body() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let before = tree.append_element(root, "p", NodeKind::Container);
        let table = table_with_rows(&mut tree, &[&["A"], &["B"], &["C"]], true);
        let after = tree.append_element(root, "p", NodeKind::Container);

        let columns = flatten_and_replace(&mut tree, table);
        assert_eq!(columns.len(), 3);

        let texts: Vec<String> = columns.iter().map(|c| tree.text_content(*c)).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);

        assert!(!tree.is_attached(table));
        let mut expected = vec![before];
        expected.extend(columns.iter().copied());
        expected.push(after);
        assert_eq!(tree.children(root), expected);
    }

    #[test]
    fn test_flattens_rows_without_section() {
        let mut tree = MemoryTree::new();
        let table = table_with_rows(&mut tree, &[&["one"], &["two"]], false);
        let columns = flatten_and_replace(&mut tree, table);
        assert_eq!(columns.len(), 2);
        assert_eq!(tree.text_content(columns[1]), "two");
    }

    #[test]
    fn test_multi_cell_row_leaves_tree_untouched() {
        let mut tree = MemoryTree::new();
        let table = table_with_rows(&mut tree, &[&["A"], &["B", "B2"], &["C"]], true);
        let snapshot = tree.clone();

        let columns = flatten_and_replace(&mut tree, table);
        assert!(columns.is_empty());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_single_row_is_not_a_list() {
        let mut tree = MemoryTree::new();
        let table = table_with_rows(&mut tree, &[&["only"]], true);
        let snapshot = tree.clone();

        assert!(flatten_and_replace(&mut tree, table).is_empty());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let mut tree = MemoryTree::new();
        let table = table_with_rows(&mut tree, &[&["A"], &[], &["C"]], true);
        let columns = flatten_and_replace(&mut tree, table);
        assert_eq!(columns.len(), 2);
        assert_eq!(tree.text_content(columns[1]), "C");
    }

    #[test]
    fn test_multiple_sections_are_a_real_table() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let table = tree.append_element(root, "table", NodeKind::TableRoot);
        for _ in 0..2 {
            let body = tree.append_element(table, "tbody", NodeKind::TableSection);
            for text in ["x", "y"] {
                let tr = tree.append_element(body, "tr", NodeKind::Row);
                let td = tree.append_element(tr, "td", NodeKind::Cell);
                tree.append_text(td, text);
            }
        }
        let snapshot = tree.clone();

        assert!(flatten(&mut tree, table).is_empty());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_non_tables_do_not_match() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let div = tree.append_element(root, "div", NodeKind::Container);
        tree.append_text(div, "text");
        let snapshot = tree.clone();

        assert!(flatten(&mut tree, div).is_empty());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_cell_content_is_cloned_in_order() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let table = tree.append_element(root, "table", NodeKind::TableRoot);
        for word in ["first", "second"] {
            let tr = tree.append_element(table, "tr", NodeKind::Row);
            let td = tree.append_element(tr, "td", NodeKind::Cell);
            let strong = tree.append_element(td, "strong", NodeKind::Container);
            tree.append_text(strong, word);
            tree.append_text(td, " tail");
        }

        let columns = flatten(&mut tree, table);
        assert_eq!(
            tree.to_markup(columns[0]),
            "<div><strong>first</strong> tail</div>"
        );
        // flatten alone doesn't splice anything in.
        assert!(tree.is_attached(table));
        assert!(!tree.is_attached(columns[0]));
    }

    #[test]
    fn test_header_cell_makes_a_two_column_row() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let table = tree.append_element(root, "table", NodeKind::TableRoot);
        for (term, definition) in [("Term1", "Def1"), ("Term2", "Def2")] {
            let tr = tree.append_element(table, "tr", NodeKind::Row);
            let th = tree.append_element(tr, "th", NodeKind::Cell);
            tree.append_text(th, term);
            let td = tree.append_element(tr, "td", NodeKind::Cell);
            tree.append_text(td, definition);
        }
        let snapshot = tree.clone();

        assert!(flatten_and_replace(&mut tree, table).is_empty());
        assert_eq!(tree, snapshot);
        assert_eq!(tree.text_content(root), "Term1Def1Term2Def2");
    }

    #[test]
    fn test_unclassified_sibling_of_a_cell_aborts() {
        let mut tree = MemoryTree::new();
        let table = table_with_rows(&mut tree, &[&["A"], &["B"]], true);
        let body = tree.element_children(table)[0];
        let second_row = tree.element_children(body)[1];
        let extra = tree.append_element(second_row, "span", NodeKind::Container);
        tree.append_text(extra, "kept");
        let snapshot = tree.clone();

        assert!(flatten_and_replace(&mut tree, table).is_empty());
        assert_eq!(tree, snapshot);
    }
}
