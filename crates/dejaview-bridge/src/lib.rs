//! DeJaView Host–Script Bridge
//!
//! Exposes a native API object to script code running inside an embedded
//! rendering surface, and routes the script's console output back into the
//! native process.
//!
//! # Architecture
//!
//! - [`value`]: classifies script values into a closed [`ScriptValue`] set and
//!   renders them for diagnostics
//! - [`callback`]: lets native methods call back into script functions
//! - [`console`]: replaces the script `console` with native-backed methods
//! - [`lifecycle`]: attaches the API once the surface reports a script scope,
//!   and reacts to success, failure and shutdown
//!
//! Everything here runs on the interface thread, the single thread that owns
//! the surface and its QuickJS context. None of the script-facing types are
//! `Send`.

pub mod api;
pub mod callback;
pub mod console;
mod error;
pub mod lifecycle;
pub mod scope;
pub mod style;
pub mod surface;
pub mod value;

pub use api::{BridgeHost, NativeApi};
pub use callback::{CallbackHandle, RetainedCallback};
pub use console::{
    BufferedSink, ConsoleLevel, ConsoleMessage, ConsoleProxy, ConsoleSink, StdoutSink, TracingSink,
};
pub use error::{BridgeError, BridgeResult};
pub use lifecycle::{
    BindingName, Bridge, BridgeState, DEFAULT_BINDING_NAME, ExitProcess, LOAD_FAILURE_EXIT_CODE,
    ProcessControl,
};
pub use scope::ScriptScope;
pub use style::Style;
pub use surface::{EntryContent, HostWindow, LoadListener, LoadState, RenderingSurface};
pub use value::{ApplyMemberProbe, CallableProbe, EngineProbe, Marshaller, ScriptValue, ValueTag, to_script};

/// Re-exported so embedders write their API against the same engine version.
pub use rquickjs;
