//! Display modes and page navigation state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::ContentTree;

/// Class tags applied to the root for each display mode.
pub const DISPLAY_TAGS: [&str; 3] = ["single-page", "double-page", "scrolling-page"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Single,
    #[default]
    Double,
    Scroll,
}

impl DisplayMode {
    pub fn tag(&self) -> &'static str {
        match self {
            DisplayMode::Single => DISPLAY_TAGS[0],
            DisplayMode::Double => DISPLAY_TAGS[1],
            DisplayMode::Scroll => DISPLAY_TAGS[2],
        }
    }

    /// Pages visible at once.
    pub fn pages_per_view(&self) -> usize {
        match self {
            DisplayMode::Double => 2,
            DisplayMode::Single | DisplayMode::Scroll => 1,
        }
    }

    /// Decodes the stored numeric form. Unknown values yield `None`.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DisplayMode::Single),
            1 => Some(DisplayMode::Double),
            2 => Some(DisplayMode::Scroll),
            _ => None,
        }
    }

    pub fn is_scroll(&self) -> bool {
        matches!(self, DisplayMode::Scroll)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayMode::Single => "single",
            DisplayMode::Double => "double",
            DisplayMode::Scroll => "scroll",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDisplayMode(pub String);

impl fmt::Display for UnknownDisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown display mode: {}", self.0)
    }
}

impl std::error::Error for UnknownDisplayMode {}

impl FromStr for DisplayMode {
    type Err = UnknownDisplayMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "single-page" => Ok(DisplayMode::Single),
            "double" | "double-page" => Ok(DisplayMode::Double),
            "scroll" | "scrolling-page" => Ok(DisplayMode::Scroll),
            _ => Err(UnknownDisplayMode(s.to_string())),
        }
    }
}

/// Puts exactly one display tag on the root.
///
/// `None` stands for a mode value that couldn't be recognised: every tag is
/// cleared and none is added.
pub fn set_display_mode<T: ContentTree>(tree: &mut T, mode: Option<DisplayMode>) {
    let root = tree.root();
    for tag in DISPLAY_TAGS {
        tree.remove_class(root, tag);
    }

    match mode {
        Some(mode) => tree.add_class(root, mode.tag()),
        None => log::warn!("unrecognised display mode, root left without a display tag"),
    }
}

/// Reading direction for page turns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMovement {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Position within a paginated section.
///
/// `offset` counts pages in reading order; `viewing_page` maps it onto the
/// physical column, which is mirrored for right-to-left reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    offset: usize,
    count: usize,
    movement: PageMovement,
}

impl PageCursor {
    pub fn new(count: usize, movement: PageMovement) -> Self {
        Self {
            offset: 0,
            count: count.max(1),
            movement,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_count(&self) -> usize {
        self.count
    }

    /// Layout changed; keep the offset in range.
    pub fn set_page_count(&mut self, count: usize) {
        self.count = count.max(1);
        self.offset = self.offset.min(self.count - 1);
    }

    pub fn set_page(&mut self, index: usize) -> bool {
        if index >= self.count {
            return false;
        }
        self.offset = index;
        true
    }

    pub fn next_page(&mut self) -> bool {
        match self.movement {
            PageMovement::LeftToRight if self.offset + 1 < self.count => {
                self.set_page(self.offset + 1)
            }
            PageMovement::RightToLeft if self.offset != 0 => self.set_page(self.offset - 1),
            _ => false,
        }
    }

    pub fn previous_page(&mut self) -> bool {
        match self.movement {
            PageMovement::LeftToRight if self.offset != 0 => self.set_page(self.offset - 1),
            PageMovement::RightToLeft if self.offset + 1 < self.count => {
                self.set_page(self.offset + 1)
            }
            _ => false,
        }
    }

    pub fn set_last_page(&mut self) {
        self.offset = self.count - 1;
    }

    /// Physical column currently shown.
    pub fn viewing_page(&self) -> usize {
        match self.movement {
            PageMovement::LeftToRight => self.offset,
            PageMovement::RightToLeft => (self.count - self.offset).saturating_sub(1),
        }
    }
}

/// Shifts the root so `page` is in view. Each page is one viewport width
/// plus `gap` pixels of column gap to the right of the previous one.
pub fn apply_page_offset<T: ContentTree>(tree: &mut T, page: usize, gap: f64) {
    let root = tree.root();
    tree.set_style(root, "transition", "left 0.5s ease 0s");
    tree.set_style(
        root,
        "left",
        &format!("calc(-{}% - {}px)", 100 * page, page as f64 * gap),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryTree;

    #[test]
    fn test_exactly_one_tag() {
        let mut tree = MemoryTree::new();
        let root = tree.root();

        set_display_mode(&mut tree, Some(DisplayMode::Single));
        set_display_mode(&mut tree, Some(DisplayMode::Scroll));
        assert!(tree.has_class(root, "scrolling-page"));
        assert!(!tree.has_class(root, "single-page"));
        assert!(!tree.has_class(root, "double-page"));

        set_display_mode(&mut tree, Some(DisplayMode::Scroll));
        assert_eq!(tree.attribute(root, "class").as_deref(), Some("scrolling-page"));
    }

    #[test]
    fn test_unknown_mode_clears_tags() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        tree.add_class(root, "keep-me");
        set_display_mode(&mut tree, Some(DisplayMode::Double));

        set_display_mode(&mut tree, DisplayMode::from_u8(9));
        assert_eq!(tree.attribute(root, "class").as_deref(), Some("keep-me"));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Double".parse::<DisplayMode>(), Ok(DisplayMode::Double));
        assert_eq!("scrolling-page".parse::<DisplayMode>(), Ok(DisplayMode::Scroll));
        assert!("sideways".parse::<DisplayMode>().is_err());
        assert_eq!(DisplayMode::from_u8(0), Some(DisplayMode::Single));
        assert_eq!(DisplayMode::Double.pages_per_view(), 2);
    }

    #[test]
    fn test_cursor_left_to_right() {
        let mut cursor = PageCursor::new(3, PageMovement::LeftToRight);
        assert!(!cursor.previous_page());
        assert!(cursor.next_page());
        assert!(cursor.next_page());
        assert!(!cursor.next_page());
        assert_eq!(cursor.viewing_page(), 2);
        assert!(!cursor.set_page(3));
    }

    #[test]
    fn test_cursor_right_to_left_is_mirrored() {
        let mut cursor = PageCursor::new(4, PageMovement::RightToLeft);
        assert_eq!(cursor.viewing_page(), 3);
        assert!(!cursor.next_page());
        assert!(cursor.previous_page());
        assert_eq!(cursor.offset(), 1);
        assert_eq!(cursor.viewing_page(), 2);
        cursor.set_last_page();
        assert_eq!(cursor.viewing_page(), 0);
    }

    #[test]
    fn test_cursor_clamps_on_relayout() {
        let mut cursor = PageCursor::new(10, PageMovement::LeftToRight);
        cursor.set_last_page();
        cursor.set_page_count(4);
        assert_eq!(cursor.offset(), 3);
        cursor.set_page_count(0);
        assert_eq!(cursor.page_count(), 1);
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn test_page_offset_style() {
        let mut tree = MemoryTree::new();
        apply_page_offset(&mut tree, 3, 10.0);
        let root = tree.root();
        assert_eq!(tree.style(root, "left"), Some("calc(-300% - 30px)"));
    }
}
