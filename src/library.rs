//! Library: track descriptors, the filesystem scan, persisted adjustments and
//! the merged catalog built from them.

mod catalog;
mod model;
mod scan;
mod store;

pub use catalog::Catalog;
pub use model::{Locator, Track, TrackId};
pub use store::AdjustmentStore;

#[cfg(test)]
mod tests;
