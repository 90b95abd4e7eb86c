//! Text storage.
//!
//! [`ContentStore`] is the rope-backed character store every other layer
//! reads line text from. All offsets are char offsets.
//!
//! ```
//! use textflow::text::ContentStore;
//!
//! let mut store = ContentStore::with_text("Hello\nworld");
//! let event = store.insert(5, ",\nbig").unwrap();
//! assert_eq!(event.line_delta, 1);
//! assert_eq!(store.line_count(), 3);
//! assert_eq!(store.line(1).unwrap(), "big");
//! ```

mod content;
mod rope;

pub use content::{ContentStore, LineSource};
pub use rope::RopeWrapper;
