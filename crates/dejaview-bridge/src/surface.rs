//! Collaborator Interfaces
//!
//! The rendering surface and the host window are supplied by the embedding
//! application. The bridge only needs load-state notifications from the
//! surface and a handful of window operations.

use std::path::{Path, PathBuf};

use rquickjs::Context;

/// Load states reported by a rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Idle, nothing requested yet.
    Ready,
    Scheduled,
    /// The document is loading and its script scope exists.
    Running,
    Succeeded,
    Cancelled,
    Failed,
}

/// What a surface should load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    /// A page on disk.
    Page(PathBuf),
    /// Inline markup.
    Markup(String),
}

/// Receives load-state transitions, on the interface thread.
///
/// Surfaces must not call this from inside `Context::with`.
pub trait LoadListener {
    fn on_load_state(&mut self, state: LoadState, context: &Context);
}

/// The embedded rendering surface.
pub trait RenderingSurface {
    /// Show or suppress the surface's default context menu.
    fn set_context_menu_enabled(&mut self, enabled: bool);

    /// The script global scope owned by this surface.
    fn context(&self) -> &Context;

    /// Load `entry`, reporting every transition to `listener`.
    fn load(&mut self, entry: &EntryContent, listener: &mut dyn LoadListener);
}

/// The window hosting the surface.
pub trait HostWindow {
    fn show(&self);

    fn minimize(&self);

    fn set_title(&self, title: &str);

    fn set_size(&self, width: f64, height: f64);

    fn set_icon(&self, icon: &Path) -> std::io::Result<()>;

    /// Ask the host to shut down. The host decides when the bridge closes.
    fn request_close(&self);

    fn close_requested(&self) -> bool;
}
