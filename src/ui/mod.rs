//! View consumers: terminal dashboard and headless JSON snapshots
//!
//! Consumers only ever see owned `DashboardSnapshot`s.

pub mod headless;
pub mod layout;
pub mod renderer;
pub mod terminal;

pub use headless::run_headless;
pub use terminal::run_ui;
