//! LSP feature providers (inlay hints, hover, tooltips)

pub mod hover;
pub mod inlay_hints;
pub mod tooltip;
