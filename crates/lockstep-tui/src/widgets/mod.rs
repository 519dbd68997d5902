mod pane;
mod status_bar;

pub use pane::PaneWidget;
pub use status_bar::StatusBarWidget;
