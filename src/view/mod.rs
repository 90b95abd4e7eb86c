//! The view layer: which lines are shown and how they land on screen rows.
//!
//! [`VisibilityMap`] hides and shows line ranges, [`ScreenLineMapper`] maps
//! visible lines (split by soft wrap) onto the window of screen rows and
//! [`ChunkCache`] holds the token runs the renderer draws for each row.
//! [`DisplayManager`] ties them together for one view.

pub mod chunk;
pub mod display;
pub mod screen;
pub mod visibility;
pub mod wrap;

pub use chunk::{Chunk, ChunkCache};
pub use display::{DisplayEvent, DisplayManager, RenderRow};
pub use screen::{LayoutSource, ScreenLineMapper, ScreenRow};
pub use visibility::VisibilityMap;
pub use wrap::{Subregion, subregions};
