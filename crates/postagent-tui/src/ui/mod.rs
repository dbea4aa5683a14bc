//! Terminal UI module using ratatui.
//!
//! - `render`: Frame layout, chrome and overlays
//! - `pages`: Body of each routed page
//! - `input`: Keyboard event handling
//! - `styles`: Color schemes and text styling

pub mod input;
pub mod pages;
pub mod render;
pub mod styles;
