//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the catalog, selection,
//! search dialog and the latest playback snapshot.

mod dialog;
mod model;

pub use dialog::SearchDialog;
pub use model::*;
