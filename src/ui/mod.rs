//! UI rendering module for the terminal converter
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components.

pub mod converter;
pub mod help_overlay;

pub use converter::render as render_converter;
pub use help_overlay::render as render_help_overlay;

use ratatui::Frame;

use crate::app::App;

/// Renders the converter screen, with the help overlay on top when requested
pub fn render_ui(frame: &mut Frame, app: &App) {
    render_converter(frame, app);
    if app.show_help {
        render_help_overlay(frame);
    }
}
