#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod chrome;
pub mod comments;
pub mod config;
pub mod data;
pub mod feed;
pub mod scroll;
pub mod toggle;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
