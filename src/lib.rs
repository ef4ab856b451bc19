//! npmdesc LSP - registry descriptions for package.json dependencies
//!
//! This crate provides a Language Server Protocol implementation that
//! annotates each dependency declared in a `package.json` with a badge and
//! a popover describing the package, fetched from the npm registry.

pub mod auth;
pub mod backend;
pub mod config;
pub mod events;
pub mod markers;
pub mod parsers;
pub mod providers;
pub mod registries;
pub mod store;
pub mod utils;
