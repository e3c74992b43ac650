//! Headless rendering surface backed by a QuickJS runtime.
//!
//! Loads a page by running its `<script>` elements in document order against
//! one global scope. There is no layout or DOM; the scope is the only part of
//! a page the bridge touches.

use std::fs;
use std::path::{Path, PathBuf};

use rquickjs::context::EvalOptions;
use rquickjs::{Context, Runtime};
use tracing::{debug, error, info, warn};

use dejaview_bridge::{BridgeError, EntryContent, LoadListener, LoadState, RenderingSurface};

use super::markup;

/// Errors from creating the surface.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Failed to create script engine: {0}")]
    Engine(#[from] rquickjs::Error),
}

/// A surface that only runs scripts.
pub struct HeadlessSurface {
    runtime: Runtime,
    context: Context,
    context_menu_enabled: bool,
    loaded: Option<EntryContent>,
}

impl HeadlessSurface {
    pub fn new() -> Result<Self, SurfaceError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        Ok(Self {
            runtime,
            context,
            context_menu_enabled: true,
            loaded: None,
        })
    }

    pub fn context_menu_enabled(&self) -> bool {
        self.context_menu_enabled
    }

    /// The entry most recently handed to [`RenderingSurface::load`].
    pub fn loaded(&self) -> Option<&EntryContent> {
        self.loaded.as_ref()
    }

    /// Run queued promise jobs until none are left. Returns how many ran.
    pub fn drain_jobs(&self) -> usize {
        let mut executed = 0;
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => executed += 1,
                Ok(false) => break,
                Err(_) => {
                    executed += 1;
                    self.context.with(|ctx| {
                        let err = BridgeError::from_js(&ctx, rquickjs::Error::Exception);
                        warn!("uncaught error in pending job: {}", err);
                    });
                }
            }
        }
        executed
    }

    /// Evaluate one page script as a classic, non-strict script.
    ///
    /// Errors are logged; a page with a broken script still loads.
    fn run_script(&self, name: &str, source: &str) -> bool {
        self.context.with(|ctx| {
            let mut options = EvalOptions::default();
            options.global = true;
            options.strict = false;

            match ctx.eval_with_options::<(), _>(source, options) {
                Ok(()) => true,
                Err(e) => {
                    let err = BridgeError::from_js(&ctx, e);
                    warn!(script = name, "uncaught error in page script: {}", err);
                    false
                }
            }
        })
    }

    fn read_document(entry: &EntryContent) -> std::io::Result<(String, Option<PathBuf>)> {
        match entry {
            EntryContent::Markup(markup) => Ok((markup.clone(), None)),
            EntryContent::Page(path) => {
                let document = fs::read_to_string(path)?;
                Ok((document, path.parent().map(Path::to_path_buf)))
            }
        }
    }

    fn script_source(base: Option<&Path>, src: &str) -> std::io::Result<(String, String)> {
        if src.contains("://") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "remote scripts are not loaded",
            ));
        }
        let path = match base {
            Some(base) => base.join(src),
            None => PathBuf::from(src),
        };
        let source = fs::read_to_string(&path)?;
        Ok((path.display().to_string(), source))
    }
}

impl RenderingSurface for HeadlessSurface {
    fn set_context_menu_enabled(&mut self, enabled: bool) {
        self.context_menu_enabled = enabled;
    }

    fn context(&self) -> &Context {
        &self.context
    }

    fn load(&mut self, entry: &EntryContent, listener: &mut dyn LoadListener) {
        listener.on_load_state(LoadState::Scheduled, &self.context);

        let (document, base) = match Self::read_document(entry) {
            Ok(read) => read,
            Err(e) => {
                error!(?entry, "failed to read entry page: {}", e);
                listener.on_load_state(LoadState::Failed, &self.context);
                return;
            }
        };
        self.loaded = Some(entry.clone());

        listener.on_load_state(LoadState::Running, &self.context);

        let mut ran = 0;
        for (index, script) in markup::scripts(&document).into_iter().enumerate() {
            if !script.is_javascript() {
                debug!(kind = ?script.kind, "skipping non-script element");
                continue;
            }

            let (name, source) = match &script.src {
                Some(src) => match Self::script_source(base.as_deref(), src) {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        warn!(src = %src, "failed to load script: {}", e);
                        continue;
                    }
                },
                None => (format!("inline script #{}", index), script.source),
            };

            self.run_script(&name, &source);
            self.drain_jobs();
            ran += 1;
        }

        info!(scripts = ran, "page loaded");
        listener.on_load_state(LoadState::Succeeded, &self.context);
    }
}
