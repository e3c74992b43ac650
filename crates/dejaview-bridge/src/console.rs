//! Console Proxy
//!
//! Replaces the scope's `console` with native-backed methods. Each of the four
//! severities reads exactly one argument, renders it through the marshaller
//! and hands a finished line to a [`ConsoleSink`].

use std::cell::RefCell;
use std::rc::Rc;

use rquickjs::function::Opt;
use rquickjs::{Ctx, Function, Object, Value};

use crate::error::{BridgeError, BridgeResult};
use crate::scope::ScriptScope;
use crate::style::{BLUE, CLEAR, GREEN, RED, RED_BG, Style, WHITE, YELLOW, YELLOW_BG};
use crate::value::{Marshaller, ScriptValue};

// ─────────────────────────────────────────────────────────────────────────────
// Levels & Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Severity of an intercepted console call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    pub const ALL: [ConsoleLevel; 4] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Warn,
        ConsoleLevel::Error,
    ];

    /// Name of the method on the script `console` object.
    pub fn method_name(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
        }
    }

    /// Line prefix. Warnings and errors use inverted backgrounds.
    pub fn marker(self, style: Style) -> String {
        match (self, style) {
            (ConsoleLevel::Log, Style::Ansi) => format!("{GREEN}=>{CLEAR}"),
            (ConsoleLevel::Info, Style::Ansi) => format!("{BLUE}?>{CLEAR}"),
            (ConsoleLevel::Warn, Style::Ansi) => format!("{YELLOW_BG}{WHITE}!{CLEAR}{YELLOW}>{CLEAR}"),
            (ConsoleLevel::Error, Style::Ansi) => format!("{RED_BG}{WHITE}x{CLEAR}{RED}>{CLEAR}"),
            (ConsoleLevel::Log, Style::Plain) => "=>".to_string(),
            (ConsoleLevel::Info, Style::Plain) => "?>".to_string(),
            (ConsoleLevel::Warn, Style::Plain) => "!>".to_string(),
            (ConsoleLevel::Error, Style::Plain) => "x>".to_string(),
        }
    }
}

/// One intercepted console call. Formatted and dropped immediately.
#[derive(Debug)]
pub struct ConsoleMessage<'js> {
    pub level: ConsoleLevel,
    pub value: ScriptValue<'js>,
}

impl<'js> ConsoleMessage<'js> {
    pub fn new(level: ConsoleLevel, value: ScriptValue<'js>) -> Self {
        Self { level, value }
    }

    pub fn format(&self, scope: &ScriptScope<'js>, style: Style) -> BridgeResult<String> {
        let rendered = self.value.render(scope, style)?;
        Ok(format!("{} {}", self.level.marker(style), rendered))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sinks
// ─────────────────────────────────────────────────────────────────────────────

/// Where finished console lines go.
pub trait ConsoleSink {
    fn write_line(&self, level: ConsoleLevel, line: &str);
}

/// Prints every line to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ConsoleSink for StdoutSink {
    fn write_line(&self, _level: ConsoleLevel, line: &str) {
        println!("{}", line);
    }
}

/// Forwards lines into the `tracing` stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn write_line(&self, level: ConsoleLevel, line: &str) {
        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => {
                tracing::info!(target: "dejaview::console", "{}", line)
            }
            ConsoleLevel::Warn => tracing::warn!(target: "dejaview::console", "{}", line),
            ConsoleLevel::Error => tracing::error!(target: "dejaview::console", "{}", line),
        }
    }
}

/// Keeps lines in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferedSink {
    lines: Rc<RefCell<Vec<(ConsoleLevel, String)>>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(ConsoleLevel, String)> {
        self.lines.borrow().clone()
    }

    pub fn take(&self) -> Vec<(ConsoleLevel, String)> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }
}

impl ConsoleSink for BufferedSink {
    fn write_line(&self, level: ConsoleLevel, line: &str) {
        self.lines.borrow_mut().push((level, line.to_string()));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Proxy
// ─────────────────────────────────────────────────────────────────────────────

/// Installs the native-backed `console` into a scope.
#[derive(Clone)]
pub struct ConsoleProxy {
    sink: Rc<dyn ConsoleSink>,
    style: Style,
    marshaller: Marshaller,
}

impl ConsoleProxy {
    pub fn new(sink: Rc<dyn ConsoleSink>, style: Style) -> Self {
        Self {
            sink,
            style,
            marshaller: Marshaller::default(),
        }
    }

    pub fn with_marshaller(mut self, marshaller: Marshaller) -> Self {
        self.marshaller = marshaller;
        self
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// Replace the scope's `console` object.
    pub fn install<'js>(&self, scope: &ScriptScope<'js>) -> BridgeResult<()> {
        let ctx = scope.ctx();
        let console = Object::new(ctx.clone()).map_err(|e| BridgeError::from_js(ctx, e))?;

        for level in ConsoleLevel::ALL {
            let method = self
                .method(ctx, level)
                .map_err(|e| BridgeError::from_js(ctx, e))?;
            console
                .set(level.method_name(), method)
                .map_err(|e| BridgeError::from_js(ctx, e))?;
        }

        scope.bind("console", console)?;
        tracing::debug!("console proxy installed");
        Ok(())
    }

    fn method<'js>(&self, ctx: &Ctx<'js>, level: ConsoleLevel) -> rquickjs::Result<Function<'js>> {
        let sink = Rc::clone(&self.sink);
        let style = self.style;
        let marshaller = self.marshaller.clone();

        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, arg: Opt<Value<'js>>| -> rquickjs::Result<()> {
                let value = match arg.0 {
                    Some(value) => marshaller.classify(&ctx, value),
                    None => ScriptValue::Null,
                };
                let scope = ScriptScope::new(ctx.clone());

                match ConsoleMessage::new(level, value).format(&scope, style) {
                    Ok(line) => {
                        sink.write_line(level, &line);
                        Ok(())
                    }
                    Err(err) => {
                        tracing::warn!("console.{} could not format its argument: {}", level.method_name(), err);
                        Err(err.throw(&ctx))
                    }
                }
            },
        )?
        .with_name(level.method_name())
    }
}
