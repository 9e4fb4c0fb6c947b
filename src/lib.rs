pub mod address;
pub mod content;
pub mod display;
pub mod error;
pub mod flatten;
pub mod links;
pub mod normalize;
pub mod pages;
pub mod progress;
pub mod sections;
pub mod settings;

pub use address::{ByteAddress, current_address, element_for_address, page_for_address};
pub use content::{ContentTree, Geometry, MemoryTree, NodeId, NodeKind, SectionId, Viewport};
pub use display::{DisplayMode, PageCursor, PageMovement, set_display_mode};
pub use error::{PagerError, Result};
pub use flatten::{flatten, flatten_and_replace};
pub use normalize::{NormalizeOptions, NormalizeReport, normalize, normalize_and_flatten};
pub use pages::{count_pages, count_pages_vertical};
