//! Application Assembly
//!
//! Wires configuration, the headless collaborators and the bridge together,
//! in launch order: window title and size, icon, context menu, bridge, entry
//! load.

use std::rc::Rc;

use tracing::{debug, info, warn};

use dejaview_bridge::{
    Bridge, BridgeError, BridgeState, ConsoleProxy, ConsoleSink, ExitProcess, HostWindow,
    Marshaller, NativeApi, ProcessControl, RenderingSurface, ScriptScope, StdoutSink, Style,
    TracingSink,
};

use crate::config::{ConfigError, ConsoleOutput, DejaviewConfig};
use crate::headless::{HeadlessSurface, HeadlessWindow, SurfaceError};
use crate::resources::Resources;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Process-facing capabilities the bridge is given.
pub struct Hooks {
    pub console: Rc<dyn ConsoleSink>,
    pub process: Rc<dyn ProcessControl>,
    pub style: Style,
}

impl Hooks {
    pub fn from_config(config: &DejaviewConfig) -> Self {
        let console: Rc<dyn ConsoleSink> = match config.console {
            ConsoleOutput::Stdout => Rc::new(StdoutSink),
            ConsoleOutput::Tracing => Rc::new(TracingSink),
        };
        Self {
            console,
            process: Rc::new(ExitProcess),
            style: config.style(),
        }
    }
}

/// One launched page with its bridge.
pub struct Dejaview<A: NativeApi> {
    surface: HeadlessSurface,
    window: Rc<HeadlessWindow>,
    bridge: Bridge<A>,
    style: Style,
    marshaller: Marshaller,
}

impl<A: NativeApi> Dejaview<A> {
    /// Launch and load the configured entry.
    ///
    /// A load failure does not return an error: the bridge hands it to
    /// [`ProcessControl`], and the returned app is in [`BridgeState::Failed`]
    /// if the process is still alive.
    pub fn open(config: &DejaviewConfig, api: A, hooks: Hooks) -> Result<Self, AppError> {
        let binding = config.binding_name()?;
        let resources = Resources::from_config(config);

        let window = Rc::new(HeadlessWindow::new());
        window.set_title(&config.title);
        window.set_size(config.width, config.height);

        if let Some(icon) = resources.icon(&config.icon_relative_path) {
            if let Err(e) = window.set_icon(&icon) {
                warn!(icon = %icon.display(), "failed to load window icon: {}", e);
            }
        }

        let mut surface = HeadlessSurface::new()?;
        if config.disable_right_click {
            surface.set_context_menu_enabled(false);
        }

        let console = ConsoleProxy::new(hooks.console, hooks.style);
        let mut bridge = Bridge::new(binding, api, window.clone(), console, hooks.process);

        let entry = resources.entry(&config.page_relative_path);
        debug!(?entry, "loading entry");
        surface.load(&entry, &mut bridge);
        info!(state = ?bridge.state(), "launch finished");

        Ok(Self {
            surface,
            window,
            bridge,
            style: hooks.style,
            marshaller: Marshaller::default(),
        })
    }

    pub fn state(&self) -> BridgeState {
        self.bridge.state()
    }

    pub fn window(&self) -> &Rc<HeadlessWindow> {
        &self.window
    }

    pub fn surface(&self) -> &HeadlessSurface {
        &self.surface
    }

    pub fn api(&self) -> &Rc<A> {
        self.bridge.api()
    }

    pub fn close_requested(&self) -> bool {
        self.window.close_requested()
    }

    /// Evaluate `source` in the page scope and render the result.
    pub fn eval(&self, source: &str) -> Result<String, BridgeError> {
        if self.state().is_terminal() {
            return Err(BridgeError::NotAttached);
        }

        let rendered = self.with_scope(|scope| -> Result<String, BridgeError> {
            let value = scope.eval(source)?;
            let value = self.marshaller.classify(scope.ctx(), value);
            value.render(&scope, self.style)
        });
        self.pump();
        rendered
    }

    /// Run `f` against the page scope.
    ///
    /// Works in any state, but once the bridge is terminal every API method
    /// throws, even through a reference the page kept.
    pub fn with_scope<R, F>(&self, f: F) -> R
    where
        F: for<'js> FnOnce(ScriptScope<'js>) -> R,
    {
        self.surface.context().with(|ctx| f(ScriptScope::new(ctx)))
    }

    /// Run queued promise jobs.
    pub fn pump(&self) -> usize {
        self.surface.drain_jobs()
    }

    /// Host-initiated shutdown.
    pub fn close(&mut self) {
        self.bridge.close();
    }
}
