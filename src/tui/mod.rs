//! TUI module for the interactive portfolio.
//!
//! Organized along FP/Unix boundaries:
//! - `state`: Pure data types (App, Action, Effect)
//! - `update`: Pure transitions
//! - `view`: Pure rendering
//! - `theme`: Palette and per-session style bindings
//! - `keys`: Raw input bytes to key events
//! - `run`: Effects (session loop, terminal lifecycle, browser opener)

pub mod keys;
pub mod run;
pub mod state;
pub mod theme;
pub mod update;
pub mod view;
