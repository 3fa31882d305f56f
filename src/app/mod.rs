//! # Interactive Workbench
//!
//! The console front end: numbered menus over the audio and video operation
//! sets and the two merge components, with validated file path prompts.

pub mod menu;
pub mod prompt;

pub use menu::App;
pub use prompt::{Console, MediaKind};
