pub mod common;
pub mod diff;
pub mod edit;
pub mod editor_context;
pub mod entity;
pub mod merge_queue;
pub mod revision;

pub use common::*;
pub use diff::*;
pub use edit::*;
pub use editor_context::*;
pub use entity::*;
pub use merge_queue::*;
pub use revision::*;
