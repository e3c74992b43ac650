//! Bridge Lifecycle
//!
//! Drives the attach of a [`NativeApi`] into the script scope from the
//! surface's load-state transitions:
//!
//! ```text
//! Unloaded --Running--> Attaching --ok--> Attached --Succeeded--> Ready
//!     \______________________ Failed ______________________/  => Failed
//! host shutdown => Closed
//! ```
//!
//! `Failed` and `Closed` are terminal. Reaching either removes the binding, and
//! every exposed method throws from then on, including through references the
//! page kept.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use rquickjs::function::{Rest, This};
use rquickjs::{Context, Ctx, Function, Object, Value};
use tracing::{debug, error, info, warn};

use crate::api::{BridgeHost, NativeApi};
use crate::console::ConsoleProxy;
use crate::error::{BridgeError, BridgeResult};
use crate::scope::ScriptScope;
use crate::surface::{HostWindow, LoadListener, LoadState};

/// Default global name of the API object.
pub const DEFAULT_BINDING_NAME: &str = "_api";

// ─────────────────────────────────────────────────────────────────────────────
// Binding Name
// ─────────────────────────────────────────────────────────────────────────────

/// A validated global identifier for the API object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingName(Rc<str>);

impl BindingName {
    pub fn new(name: impl AsRef<str>) -> BridgeResult<Self> {
        let name = name.as_ref();
        let mut chars = name.chars();

        let Some(first) = chars.next() else {
            return Err(BridgeError::EmptyBindingName);
        };
        let starts_ok = first.is_alphabetic() || first == '_' || first == '$';
        if !starts_ok || !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            return Err(BridgeError::InvalidBindingName(name.to_string()));
        }
        if name == "console" {
            return Err(BridgeError::ReservedBindingName(name.to_string()));
        }

        Ok(Self(Rc::from(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BindingName {
    fn default() -> Self {
        Self(Rc::from(DEFAULT_BINDING_NAME))
    }
}

impl fmt::Display for BindingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State & Process Control
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a [`Bridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeState {
    Unloaded,
    Attaching,
    Attached,
    Ready,
    Failed,
    Closed,
}

impl BridgeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BridgeState::Failed | BridgeState::Closed)
    }
}

/// Ends the process after an unrecoverable load failure.
pub trait ProcessControl {
    fn terminate(&self, code: i32);
}

/// Exits the process for real.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitProcess;

impl ProcessControl for ExitProcess {
    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Exit status used when the surface fails to load.
pub const LOAD_FAILURE_EXIT_CODE: i32 = 0;

// ─────────────────────────────────────────────────────────────────────────────
// Bridge
// ─────────────────────────────────────────────────────────────────────────────

/// The binding between one native API object and one script scope.
pub struct Bridge<A: NativeApi> {
    binding: BindingName,
    api: Rc<A>,
    window: Rc<dyn HostWindow>,
    console: ConsoleProxy,
    process: Rc<dyn ProcessControl>,
    context: Option<Context>,
    attached: Rc<Cell<bool>>,
    state: BridgeState,
}

impl<A: NativeApi> Bridge<A> {
    pub fn new(
        binding: BindingName,
        api: A,
        window: Rc<dyn HostWindow>,
        console: ConsoleProxy,
        process: Rc<dyn ProcessControl>,
    ) -> Self {
        Self {
            binding,
            api: Rc::new(api),
            window,
            console,
            process,
            context: None,
            attached: Rc::new(Cell::new(false)),
            state: BridgeState::Unloaded,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn binding(&self) -> &BindingName {
        &self.binding
    }

    pub fn api(&self) -> &Rc<A> {
        &self.api
    }

    /// Host-initiated shutdown.
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.detach();
        self.state = BridgeState::Closed;
        info!(binding = %self.binding, "bridge closed");
    }

    fn attach(&self, context: &Context) -> BridgeResult<()> {
        self.api.init(BridgeHost::new(
            Rc::clone(&self.window),
            context.clone(),
            self.binding.clone(),
        ));

        self.attached.set(true);

        context.with(|ctx| {
            let scope = ScriptScope::new(ctx.clone());
            let exposed = Object::new(ctx.clone()).map_err(|e| BridgeError::from_js(&ctx, e))?;
            Rc::clone(&self.api)
                .expose(&ctx, &exposed)
                .map_err(|e| BridgeError::from_js(&ctx, e))?;
            let target = guard(&ctx, &exposed, &self.attached).map_err(|e| BridgeError::from_js(&ctx, e))?;

            scope.bind(self.binding.as_str(), target)?;
            debug!(binding = %self.binding, "API object bound");

            self.console.install(&scope)
        })
    }

    fn detach(&self) {
        self.attached.set(false);
        self.api.release();
        let Some(context) = &self.context else {
            return;
        };
        context.with(|ctx| {
            if let Err(e) = ScriptScope::new(ctx).unbind(self.binding.as_str()) {
                warn!(binding = %self.binding, "failed to remove API binding: {}", e);
            }
        });
    }

    fn fail(&mut self, reason: &str) {
        self.detach();
        self.state = BridgeState::Failed;
        error!("Failed to initialize browser: {}", reason);
        self.process.terminate(LOAD_FAILURE_EXIT_CODE);
    }
}

impl<A: NativeApi> Drop for Bridge<A> {
    fn drop(&mut self) {
        // terminal states already released in `detach`
        if !self.state.is_terminal() {
            self.attached.set(false);
            self.api.release();
        }
    }
}

/// Copy `exposed` onto a fresh object with every method wrapped so that it
/// throws [`BridgeError::NotAttached`] once `attached` is cleared.
fn guard<'js>(
    ctx: &Ctx<'js>,
    exposed: &Object<'js>,
    attached: &Rc<Cell<bool>>,
) -> rquickjs::Result<Object<'js>> {
    let target = Object::new(ctx.clone())?;

    for entry in exposed.props::<String, Value<'js>>() {
        let (name, value) = entry?;
        let Some(method) = value.as_function().cloned() else {
            target.set(name, value)?;
            continue;
        };

        let attached = Rc::clone(attached);
        let guarded = Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, this: This<Value<'js>>, args: Rest<Value<'js>>| -> rquickjs::Result<Value<'js>> {
                if !attached.get() {
                    return Err(BridgeError::NotAttached.throw(&ctx));
                }
                method.call((this, args))
            },
        )?
        .with_name(&name)?;
        target.set(name, guarded)?;
    }

    Ok(target)
}

impl<A: NativeApi> LoadListener for Bridge<A> {
    fn on_load_state(&mut self, state: LoadState, context: &Context) {
        if self.state.is_terminal() {
            debug!(?state, bridge = ?self.state, "ignoring load state after terminal state");
            return;
        }

        match state {
            LoadState::Running => {
                if self.state != BridgeState::Unloaded {
                    debug!(bridge = ?self.state, "surface running again, bridge already attached");
                    return;
                }
                self.state = BridgeState::Attaching;
                self.context = Some(context.clone());

                match self.attach(context) {
                    Ok(()) => {
                        self.state = BridgeState::Attached;
                        info!(binding = %self.binding, "native API attached");
                    }
                    Err(e) => self.fail(&e.to_string()),
                }
            }
            LoadState::Succeeded => {
                if self.state == BridgeState::Attached {
                    self.state = BridgeState::Ready;
                    self.window.show();
                    info!("surface ready");
                } else {
                    warn!(bridge = ?self.state, "surface succeeded without an attached bridge");
                }
            }
            LoadState::Failed => self.fail("the rendering surface failed to load"),
            LoadState::Ready | LoadState::Scheduled | LoadState::Cancelled => {
                debug!(?state, "load state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::path::Path;

    use rquickjs::{Ctx, Function, Runtime};

    use crate::callback::CallbackHandle;
    use crate::console::{BufferedSink, ConsoleLevel};
    use crate::style::Style;

    #[derive(Default)]
    struct TestWindow {
        shown: Cell<u32>,
        close: Cell<bool>,
    }

    impl HostWindow for TestWindow {
        fn show(&self) {
            self.shown.set(self.shown.get() + 1);
        }
        fn minimize(&self) {}
        fn set_title(&self, _title: &str) {}
        fn set_size(&self, _width: f64, _height: f64) {}
        fn set_icon(&self, _icon: &Path) -> std::io::Result<()> {
            Ok(())
        }
        fn request_close(&self) {
            self.close.set(true);
        }
        fn close_requested(&self) -> bool {
            self.close.get()
        }
    }

    #[derive(Default)]
    struct RecordingExit {
        codes: RefCell<Vec<i32>>,
    }

    impl ProcessControl for RecordingExit {
        fn terminate(&self, code: i32) {
            self.codes.borrow_mut().push(code);
        }
    }

    #[derive(Default)]
    struct TestApi {
        inits: Cell<u32>,
        releases: Cell<u32>,
    }

    impl NativeApi for TestApi {
        fn init(&self, _host: BridgeHost) {
            self.inits.set(self.inits.get() + 1);
        }

        fn release(&self) {
            self.releases.set(self.releases.get() + 1);
        }

        fn expose<'js>(self: Rc<Self>, ctx: &Ctx<'js>, target: &Object<'js>) -> rquickjs::Result<()> {
            target.set(
                "helloWorld",
                Function::new(ctx.clone(), || "Hello World".to_string())?,
            )?;
            target.set(
                "adderCallback",
                Function::new(
                    ctx.clone(),
                    |ctx: Ctx<'js>, x: i32, y: i32, callback: CallbackHandle<'js>| -> rquickjs::Result<()> {
                        let sum = i64::from(x) + i64::from(y);
                        callback
                            .invoke(&ctx, &[serde_json::json!(sum)])
                            .map_err(|e| e.throw(&ctx))
                    },
                )?,
            )?;
            Ok(())
        }
    }

    struct Fixture {
        _runtime: Runtime,
        context: Context,
        window: Rc<TestWindow>,
        exit: Rc<RecordingExit>,
        sink: BufferedSink,
        bridge: Bridge<TestApi>,
    }

    fn fixture(binding: &str) -> Fixture {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        let window = Rc::new(TestWindow::default());
        let exit = Rc::new(RecordingExit::default());
        let sink = BufferedSink::new();
        let bridge = Bridge::new(
            BindingName::new(binding).unwrap(),
            TestApi::default(),
            window.clone(),
            ConsoleProxy::new(Rc::new(sink.clone()), Style::Plain),
            exit.clone(),
        );
        Fixture {
            _runtime: runtime,
            context,
            window,
            exit,
            sink,
            bridge,
        }
    }

    #[test]
    fn test_binding_name_validation() {
        assert_eq!(BindingName::default().as_str(), "_api");
        assert!(BindingName::new("backend").is_ok());
        assert!(BindingName::new("$b2").is_ok());
        assert!(matches!(BindingName::new(""), Err(BridgeError::EmptyBindingName)));
        assert!(matches!(BindingName::new("2fast"), Err(BridgeError::InvalidBindingName(_))));
        assert!(matches!(BindingName::new("my api"), Err(BridgeError::InvalidBindingName(_))));
        assert!(matches!(BindingName::new("console"), Err(BridgeError::ReservedBindingName(_))));
    }

    #[test]
    fn test_happy_path() {
        let mut f = fixture("_api");
        assert_eq!(f.bridge.state(), BridgeState::Unloaded);

        f.bridge.on_load_state(LoadState::Scheduled, &f.context);
        assert_eq!(f.bridge.state(), BridgeState::Unloaded);

        f.bridge.on_load_state(LoadState::Running, &f.context);
        assert_eq!(f.bridge.state(), BridgeState::Attached);
        assert_eq!(f.bridge.api().inits.get(), 1);
        assert_eq!(f.window.shown.get(), 0);

        f.bridge.on_load_state(LoadState::Succeeded, &f.context);
        assert_eq!(f.bridge.state(), BridgeState::Ready);
        assert_eq!(f.window.shown.get(), 1);

        f.context.with(|ctx| {
            let hello: String = ctx.eval("_api.helloWorld()").unwrap();
            assert_eq!(hello, "Hello World");

            let _: () = ctx
                .eval("globalThis.calls = []; _api.adderCallback(1, 2, function () { calls.push(Array.from(arguments)); })")
                .unwrap();
            let calls: String = ctx.eval("JSON.stringify(calls)").unwrap();
            assert_eq!(calls, "[[3]]");

            let _: () = ctx.eval("console.log('bar')").unwrap();
        });

        assert_eq!(f.sink.lines(), vec![(ConsoleLevel::Log, "=> \"bar\"".to_string())]);
        assert!(f.exit.codes.borrow().is_empty());
    }

    #[test]
    fn test_never_reenters_attaching() {
        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Running, &f.context);
        f.bridge.on_load_state(LoadState::Running, &f.context);
        assert_eq!(f.bridge.state(), BridgeState::Attached);
        assert_eq!(f.bridge.api().inits.get(), 1);

        f.bridge.on_load_state(LoadState::Succeeded, &f.context);
        f.bridge.on_load_state(LoadState::Running, &f.context);
        assert_eq!(f.bridge.state(), BridgeState::Ready);
        assert_eq!(f.bridge.api().inits.get(), 1);
    }

    #[test]
    fn test_custom_binding_name() {
        let mut f = fixture("backend");
        f.bridge.on_load_state(LoadState::Running, &f.context);

        f.context.with(|ctx| {
            let hello: String = ctx.eval("backend.helloWorld()").unwrap();
            assert_eq!(hello, "Hello World");
            let missing: bool = ctx.eval("typeof _api === 'undefined'").unwrap();
            assert!(missing);
        });
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Running, &f.context);
        f.bridge.on_load_state(LoadState::Failed, &f.context);

        assert_eq!(f.bridge.state(), BridgeState::Failed);
        assert_eq!(*f.exit.codes.borrow(), vec![LOAD_FAILURE_EXIT_CODE]);

        f.bridge.on_load_state(LoadState::Succeeded, &f.context);
        f.bridge.close();
        assert_eq!(f.bridge.state(), BridgeState::Failed);
        assert_eq!(f.window.shown.get(), 0);
        assert_eq!(f.exit.codes.borrow().len(), 1);

        f.context.with(|ctx| {
            let gone: bool = ctx.eval("typeof _api === 'undefined'").unwrap();
            assert!(gone);
        });
    }

    #[test]
    fn test_failure_before_running() {
        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Scheduled, &f.context);
        f.bridge.on_load_state(LoadState::Failed, &f.context);

        assert_eq!(f.bridge.state(), BridgeState::Failed);
        assert_eq!(f.bridge.api().inits.get(), 0);
        assert_eq!(f.exit.codes.borrow().len(), 1);
    }

    #[test]
    fn test_close_is_terminal() {
        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Running, &f.context);
        f.bridge.on_load_state(LoadState::Succeeded, &f.context);
        f.bridge.close();
        assert_eq!(f.bridge.state(), BridgeState::Closed);
        assert_eq!(f.bridge.api().releases.get(), 1);

        f.bridge.on_load_state(LoadState::Failed, &f.context);
        assert_eq!(f.bridge.state(), BridgeState::Closed);
        assert!(f.exit.codes.borrow().is_empty());

        f.context.with(|ctx| {
            let result: rquickjs::Result<String> = ctx.eval("_api.helloWorld()");
            assert!(result.is_err());
            let _ = ctx.catch();
        });
    }

    #[test]
    fn test_kept_reference_is_inert_after_close() {
        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Running, &f.context);
        f.bridge.on_load_state(LoadState::Succeeded, &f.context);

        f.context.with(|ctx| {
            let _: Value = ctx.eval("globalThis.keep = _api; globalThis.r = 'unset';").unwrap();
            let hello: String = ctx.eval("keep.helloWorld()").unwrap();
            assert_eq!(hello, "Hello World");
        });

        f.bridge.close();

        f.context.with(|ctx| {
            let message: String = ctx
                .eval("try { keep.helloWorld(); 'called' } catch (e) { e.message }")
                .unwrap();
            assert!(message.contains("not attached"));

            let _: Value = ctx
                .eval("try { keep.adderCallback(1, 2, v => { r = v; }); } catch (e) {}")
                .unwrap();
            let r: String = ctx.eval("String(r)").unwrap();
            assert_eq!(r, "unset");
        });
    }

    #[test]
    fn test_kept_reference_is_inert_after_failure() {
        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Running, &f.context);
        f.context.with(|ctx| {
            let _: Value = ctx.eval("globalThis.keep = _api;").unwrap();
        });
        f.bridge.on_load_state(LoadState::Failed, &f.context);

        f.context.with(|ctx| {
            let threw: bool = ctx
                .eval("try { keep.helloWorld(); false } catch (e) { true }")
                .unwrap();
            assert!(threw);
        });
    }

    #[test]
    fn test_release_once() {
        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Running, &f.context);
        f.bridge.close();
        let api = Rc::clone(f.bridge.api());
        drop(f);
        assert_eq!(api.releases.get(), 1);

        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Running, &f.context);
        let api = Rc::clone(f.bridge.api());
        drop(f);
        assert_eq!(api.releases.get(), 1);
    }

    #[test]
    fn test_succeeded_without_attach_stays_hidden() {
        let mut f = fixture("_api");
        f.bridge.on_load_state(LoadState::Succeeded, &f.context);
        assert_eq!(f.bridge.state(), BridgeState::Unloaded);
        assert_eq!(f.window.shown.get(), 0);
    }
}
