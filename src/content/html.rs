//! Builds a [`MemoryTree`] out of chapter markup.
//!
//! A reader section is several chapters poured into one document. Each
//! chapter is framed by a pair of boundary markers carrying its section id so
//! addresses can tell which chapter a text run belongs to.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;

use super::memory::{MemoryTree, NodeId};
use super::{
    ContentTree, IGNORE_CLASS, NodeKind, SECTION_END_CLASS, SECTION_ID_ATTR,
    SECTION_START_CLASS, SectionId,
};
use crate::error::{PagerError, Result};

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z-]+)\s*:\s*([^;]+)").expect("declaration regex is valid")
});

/// One chapter's body markup and the id its boundary markers carry.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub section_id: SectionId,
    pub html: String,
}

impl Chapter {
    pub fn new(section_id: SectionId, html: impl Into<String>) -> Self {
        Self {
            section_id,
            html: html.into(),
        }
    }
}

/// Maps a tag name (and the attributes that matter) to a node kind.
pub fn classify(tag: &str, section_id: Option<&str>) -> NodeKind {
    match tag {
        "table" => NodeKind::TableRoot,
        "thead" | "tbody" | "tfoot" => NodeKind::TableSection,
        "tr" => NodeKind::Row,
        "td" | "th" => NodeKind::Cell,
        "a" => NodeKind::Anchor,
        "img" | "svg" | "image" | "picture" | "video" | "canvas" => NodeKind::Image,
        "hr" => NodeKind::Rule,
        "br" => NodeKind::Break,
        "script" | "style" | "head" | "template" | "noscript" | "title" | "meta"
        | "link" => NodeKind::Unknown,
        "div" => match section_id.and_then(|id| id.trim().parse::<SectionId>().ok()) {
            Some(id) => NodeKind::SectionBoundary(id),
            None => NodeKind::Container,
        },
        _ => NodeKind::Container,
    }
}

pub struct SectionAssembler {
    tree: MemoryTree,
    chapters: usize,
}

impl Default for SectionAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionAssembler {
    pub fn new() -> Self {
        Self {
            tree: MemoryTree::new(),
            chapters: 0,
        }
    }

    /// Appends a chapter framed by its start and end markers.
    pub fn push_chapter(&mut self, chapter: &Chapter) -> Result<()> {
        let dom = parse_markup(&chapter.html)?;
        let root = self.tree.root();

        self.push_marker(chapter.section_id, SECTION_START_CLASS, "start");
        if let Some(body) = find_body(&dom.document) {
            for child in body.children.borrow().iter() {
                convert_node(child, &mut self.tree, root);
            }
        } else {
            log::warn!(
                "chapter {} has no body, only markers were inserted",
                chapter.section_id
            );
        }
        self.push_marker(chapter.section_id, SECTION_END_CLASS, "end");

        self.chapters += 1;
        log::debug!(
            "assembled chapter {} ({} chapters so far)",
            chapter.section_id,
            self.chapters
        );
        Ok(())
    }

    fn push_marker(&mut self, section_id: SectionId, edge_class: &str, edge: &str) {
        let root = self.tree.root();
        let marker = self
            .tree
            .append_element(root, "div", NodeKind::SectionBoundary(section_id));
        self.tree
            .set_attribute(marker, SECTION_ID_ATTR, &section_id.to_string());
        self.tree.add_class(marker, IGNORE_CLASS);
        self.tree.add_class(marker, edge_class);
        self.tree
            .set_attribute(marker, "id", &format!("section-{section_id}-{edge}"));
    }

    pub fn finish(self) -> MemoryTree {
        self.tree
    }
}

/// Parses a single document (no section markers) into a tree.
pub fn parse_document_tree(html: &str) -> Result<MemoryTree> {
    let dom = parse_markup(html)?;
    let mut tree = MemoryTree::new();
    let root = tree.root();
    if let Some(body) = find_body(&dom.document) {
        for child in body.children.borrow().iter() {
            convert_node(child, &mut tree, root);
        }
    }
    Ok(tree)
}

fn parse_markup(html: &str) -> Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| PagerError::content(format!("failed to parse markup: {e}")))
}

fn find_body(node: &Handle) -> Option<Handle> {
    let mut stack = vec![node.clone()];
    while let Some(current) = stack.pop() {
        if let NodeData::Element { ref name, .. } = current.data {
            if name.local.as_ref() == "body" {
                return Some(current);
            }
        }
        stack.extend(current.children.borrow().iter().rev().cloned());
    }
    None
}

fn attribute_value(attrs: &RefCell<Vec<html5ever::Attribute>>, name: &str) -> Option<String> {
    attrs
        .borrow()
        .iter()
        .find(|attr| attr.name.local.as_ref() == name)
        .map(|attr| attr.value.to_string())
}

fn convert_node(node: &Rc<markup5ever_rcdom::Node>, tree: &mut MemoryTree, parent: NodeId) {
    match node.data {
        NodeData::Text { ref contents } => {
            tree.append_text(parent, &contents.borrow());
        }
        NodeData::Element {
            ref name,
            ref attrs,
            ..
        } => {
            let tag = name.local.as_ref();
            let kind = classify(tag, attribute_value(attrs, SECTION_ID_ATTR).as_deref());
            let element = tree.append_element(parent, tag, kind);

            for attr in attrs.borrow().iter() {
                let attr_name = attr.name.local.as_ref();
                if attr_name == "style" {
                    for caps in DECLARATION_RE.captures_iter(&attr.value) {
                        tree.set_style(
                            element,
                            &caps[1].to_ascii_lowercase(),
                            caps[2].trim(),
                        );
                    }
                } else {
                    tree.set_attribute(element, attr_name, &attr.value);
                }
            }

            // Opaque nodes keep no children; nothing downstream looks inside.
            if kind != NodeKind::Unknown {
                for child in node.children.borrow().iter() {
                    convert_node(child, tree, element);
                }
            }
        }
        NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {
            tree.append_opaque(parent, "#comment");
        }
        NodeData::Document | NodeData::Doctype { .. } => {
            for child in node.children.borrow().iter() {
                convert_node(child, tree, parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tags() {
        assert_eq!(classify("table", None), NodeKind::TableRoot);
        assert_eq!(classify("tbody", None), NodeKind::TableSection);
        assert_eq!(classify("td", None), NodeKind::Cell);
        assert_eq!(classify("th", None), NodeKind::Cell);
        assert_eq!(classify("svg", None), NodeKind::Image);
        assert_eq!(classify("div", Some("12")), NodeKind::SectionBoundary(12));
        assert_eq!(classify("div", Some("twelve")), NodeKind::Container);
        assert_eq!(classify("script", None), NodeKind::Unknown);
    }

    #[test]
    fn test_parse_document_tree() {
        let tree = parse_document_tree(
            "<p>One <a href=\"ch2.xhtml#x\">link</a></p><!-- note --><hr><script>var x;</script>",
        )
        .unwrap();
        let root = tree.root();
        let children = tree.children(root);
        assert_eq!(children.len(), 4);
        assert_eq!(tree.kind(children[0]), NodeKind::Container);
        assert_eq!(tree.kind(children[1]), NodeKind::Unknown);
        assert_eq!(tree.kind(children[2]), NodeKind::Rule);
        assert_eq!(tree.kind(children[3]), NodeKind::Unknown);
        assert!(tree.children(children[3]).is_empty());

        let anchor = tree.children(children[0])[1];
        assert_eq!(tree.kind(anchor), NodeKind::Anchor);
        assert_eq!(tree.attribute(anchor, "href").as_deref(), Some("ch2.xhtml#x"));
    }

    #[test]
    fn test_chapters_are_framed_by_markers() {
        let mut assembler = SectionAssembler::new();
        assembler
            .push_chapter(&Chapter::new(3, "<p>Hello</p>"))
            .unwrap();
        assembler
            .push_chapter(&Chapter::new(4, "<p>World</p>"))
            .unwrap();
        let tree = assembler.finish();

        let kinds: Vec<NodeKind> = tree
            .children(tree.root())
            .into_iter()
            .map(|child| tree.kind(child))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::SectionBoundary(3),
                NodeKind::Container,
                NodeKind::SectionBoundary(3),
                NodeKind::SectionBoundary(4),
                NodeKind::Container,
                NodeKind::SectionBoundary(4),
            ]
        );

        let start = tree.children(tree.root())[0];
        assert!(tree.has_class(start, IGNORE_CLASS));
        assert!(tree.has_class(start, SECTION_START_CLASS));
        assert_eq!(tree.attribute(start, "id").as_deref(), Some("section-3-start"));
    }

    #[test]
    fn test_inline_spacing_is_read() {
        let tree =
            parse_document_tree("<div style=\"margin-top: 24px; padding-bottom:6.5px\">x</div>")
                .unwrap();
        let div = tree.children(tree.root())[0];
        let spacing = tree.vertical_spacing(div);
        assert_eq!(spacing.margin_top, 24.0);
        assert_eq!(spacing.padding_bottom, 6.5);
        assert_eq!(spacing.padding_top, 0.0);
    }

    #[test]
    fn test_header_table_survives_normalization() {
        let mut tree = parse_document_tree(
            "<table><tr><th>Term1</th><td>Def1</td></tr><tr><th>Term2</th><td>Def2</td></tr></table>",
        )
        .unwrap();
        let viewport = crate::content::Viewport::new(600.0, 800.0).unwrap();
        let report = crate::normalize::normalize_and_flatten(
            &mut tree,
            viewport,
            &crate::normalize::NormalizeOptions::default(),
        );

        assert_eq!(report.tables_flattened, 0);
        let root = tree.root();
        assert_eq!(tree.text_content(root), "Term1Def1Term2Def2");
    }
}
