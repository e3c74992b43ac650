//! Headless collaborators: a script-only rendering surface and an in-memory
//! host window.

pub mod markup;
mod surface;
mod window;

pub use surface::{HeadlessSurface, SurfaceError};
pub use window::HeadlessWindow;
