//! DeJaView
//!
//! Hosts a page in a rendering surface and bridges a native API object into
//! its scripts.
//!
//! # Architecture
//!
//! - [`config`]: layered configuration and command line
//! - [`headless`]: script-only surface and in-memory window
//! - [`app`]: launch sequence around a [`dejaview_bridge::Bridge`]
//! - [`shell`]: the interface thread that owns all of the above
//! - [`api`]: the demo method set bound as `_api`

pub mod api;
pub mod app;
pub mod config;
pub mod dialogs;
pub mod headless;
pub mod resources;
pub mod shell;

pub use api::DemoApi;
pub use app::{AppError, Dejaview, Hooks};
pub use config::{Args, ConfigError, DejaviewConfig};
pub use shell::{InterfaceHandle, ShellError, spawn_interface, spawn_interface_with};
