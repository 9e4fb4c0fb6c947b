//! Anchors and the raw targets a shell needs to route link clicks.
//!
//! The pager doesn't resolve links. It finds every anchor with an `href`,
//! and pairs the raw target with the hash of the section it was clicked in;
//! routing that pair is the shell's job.

use crate::content::{ContentTree, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor<N> {
    pub node: N,
    pub href: String,
}

/// What a shell receives when a link is activated: `(section, target)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub section: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Has a URI scheme; leaves the book.
    External,
    /// `#fragment` inside the current document.
    InternalAnchor,
    /// Another document of the book, optionally with a fragment.
    InternalSection,
}

impl LinkKind {
    pub fn classify(href: &str) -> Self {
        let href = href.trim();
        if href.starts_with('#') {
            return LinkKind::InternalAnchor;
        }
        let has_scheme = href
            .split_once(':')
            .is_some_and(|(scheme, _)| {
                !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            });
        if has_scheme {
            LinkKind::External
        } else {
            LinkKind::InternalSection
        }
    }
}

impl<N> Anchor<N> {
    pub fn kind(&self) -> LinkKind {
        LinkKind::classify(&self.href)
    }

    /// Fragment part of the target, without the `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.href
            .split_once('#')
            .map(|(_, fragment)| fragment)
            .filter(|fragment| !fragment.is_empty())
    }

    pub fn navigation(&self, section_hash: &str) -> NavigationRequest {
        NavigationRequest {
            section: section_hash.to_string(),
            target: self.href.clone(),
        }
    }
}

/// Every anchor carrying an `href`, in document order.
pub fn anchors<T: ContentTree>(tree: &T) -> Vec<Anchor<T::Node>> {
    let mut found = Vec::new();
    let mut stack: Vec<T::Node> = tree.children(tree.root()).into_iter().rev().collect();

    while let Some(node) = stack.pop() {
        match tree.kind(node) {
            NodeKind::Text | NodeKind::Unknown => continue,
            NodeKind::Anchor => {
                if let Some(href) = tree.attribute(node, "href") {
                    found.push(Anchor { node, href });
                }
            }
            _ => {}
        }
        stack.extend(tree.children(node).into_iter().rev());
    }

    found
}

/// Normalizes an href for comparison with a document path: relative
/// prefixes, the `OEBPS/` directory and the fragment are dropped.
pub fn normalize_href(href: &str) -> String {
    let normalized = href
        .trim_start_matches("../")
        .trim_start_matches("./")
        .trim_start_matches("OEBPS/");

    match normalized.find('#') {
        Some(fragment_pos) => normalized[..fragment_pos].to_string(),
        None => normalized.to_string(),
    }
}
