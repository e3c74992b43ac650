//! Error types for the host–script bridge.

use rquickjs::convert::Coerced;
use rquickjs::{Ctx, Exception};

/// Errors that can occur while attaching, marshalling or invoking.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Binding name must not be empty")]
    EmptyBindingName,

    #[error("Binding name is not a valid identifier: {0}")]
    InvalidBindingName(String),

    #[error("Binding name is reserved by the bridge: {0}")]
    ReservedBindingName(String),

    #[error("Native API is not attached to a script scope")]
    NotAttached,

    #[error("Failed to serialize value: {0}")]
    Serialization(String),

    #[error("JavaScript error: {0}")]
    JavaScript(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] rquickjs::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Convert an engine error, taking the pending exception out of `ctx`.
    ///
    /// The exception is cleared so the scope stays usable afterwards.
    pub fn from_js(ctx: &Ctx<'_>, err: rquickjs::Error) -> Self {
        if !matches!(err, rquickjs::Error::Exception) {
            return BridgeError::Runtime(err);
        }

        let thrown = ctx.catch();
        let message = match thrown.as_exception() {
            Some(exception) => exception
                .message()
                .unwrap_or_else(|| "uncaught exception".to_string()),
            None => thrown
                .get::<Coerced<String>>()
                .map(|text| text.0)
                .unwrap_or_else(|_| format!("uncaught {}", thrown.type_name())),
        };
        BridgeError::JavaScript(message)
    }

    /// Raise this error as a script `Error` so the calling script can catch it.
    pub fn throw(self, ctx: &Ctx<'_>) -> rquickjs::Error {
        let message = match self {
            BridgeError::JavaScript(message) => message,
            other => other.to_string(),
        };
        Exception::throw_message(ctx, &message)
    }
}
