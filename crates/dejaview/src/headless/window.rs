//! Headless host window.
//!
//! Keeps the window state a desktop shell would display and logs every change.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use dejaview_bridge::HostWindow;

#[derive(Debug)]
pub struct HeadlessWindow {
    visible: Cell<bool>,
    minimized: Cell<bool>,
    title: RefCell<String>,
    size: Cell<(f64, f64)>,
    icon: RefCell<Option<PathBuf>>,
    close_requested: Cell<bool>,
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self {
            visible: Cell::new(false),
            minimized: Cell::new(false),
            title: RefCell::new(String::new()),
            size: Cell::new((0.0, 0.0)),
            icon: RefCell::new(None),
            close_requested: Cell::new(false),
        }
    }
}

impl HeadlessWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized.get()
    }

    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }

    pub fn size(&self) -> (f64, f64) {
        self.size.get()
    }

    pub fn icon(&self) -> Option<PathBuf> {
        self.icon.borrow().clone()
    }
}

impl HostWindow for HeadlessWindow {
    fn show(&self) {
        self.visible.set(true);
        self.minimized.set(false);
        info!(title = %self.title.borrow(), "window shown");
    }

    fn minimize(&self) {
        self.minimized.set(true);
        debug!("window minimized");
    }

    fn set_title(&self, title: &str) {
        *self.title.borrow_mut() = title.to_string();
    }

    fn set_size(&self, width: f64, height: f64) {
        self.size.set((width, height));
    }

    /// The icon has to be readable; its contents are not decoded.
    fn set_icon(&self, icon: &Path) -> std::io::Result<()> {
        let bytes = fs::metadata(icon)?.len();
        debug!(icon = %icon.display(), bytes, "window icon set");
        *self.icon.borrow_mut() = Some(icon.to_path_buf());
        Ok(())
    }

    fn request_close(&self) {
        if !self.close_requested.replace(true) {
            info!("window close requested");
        }
    }

    fn close_requested(&self) -> bool {
        self.close_requested.get()
    }
}
