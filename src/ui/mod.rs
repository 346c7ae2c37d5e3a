//! Text rendering for the terminal front end

mod files_panel;

pub use files_panel::{render_files_panel, render_session};
