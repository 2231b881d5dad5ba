//! Global vertex renumbering.

mod renumberer;

pub use renumberer::GlobalRenumberer;
