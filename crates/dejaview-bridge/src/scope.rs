//! Script Global Scope
//!
//! The shared mutable resource of the bridge. In the normal flow it is written
//! twice (the API binding and the console replacement) and otherwise only read
//! or invoked.

use rquickjs::function::This;
use rquickjs::{Ctx, Function, IntoJs, Object, Value};

use crate::error::{BridgeError, BridgeResult};

/// Borrowed view of the global execution context.
#[derive(Clone)]
pub struct ScriptScope<'js> {
    ctx: Ctx<'js>,
}

impl<'js> ScriptScope<'js> {
    pub fn new(ctx: Ctx<'js>) -> Self {
        Self { ctx }
    }

    pub fn ctx(&self) -> &Ctx<'js> {
        &self.ctx
    }

    /// The global object (`globalThis`).
    pub fn globals(&self) -> Object<'js> {
        self.ctx.globals()
    }

    /// Make `value` reachable from script under `name`.
    pub fn bind<V: IntoJs<'js>>(&self, name: &str, value: V) -> BridgeResult<()> {
        self.globals()
            .set(name, value)
            .map_err(|e| BridgeError::from_js(&self.ctx, e))
    }

    /// Remove a global binding. Removing a missing name is not an error.
    pub fn unbind(&self, name: &str) -> BridgeResult<()> {
        self.globals()
            .remove(name)
            .map_err(|e| BridgeError::from_js(&self.ctx, e))
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.globals().contains_key(name).unwrap_or(false)
    }

    /// Serialize a value with the scope's own `JSON.stringify`.
    pub fn stringify(&self, value: &Value<'js>) -> BridgeResult<String> {
        let json: Object<'js> = self
            .globals()
            .get("JSON")
            .map_err(|e| BridgeError::from_js(&self.ctx, e))?;
        let stringify: Function<'js> = json
            .get("stringify")
            .map_err(|e| BridgeError::from_js(&self.ctx, e))?;

        let output: Value<'js> = stringify
            .call((This(json.clone()), value.clone()))
            .map_err(|e| match BridgeError::from_js(&self.ctx, e) {
                BridgeError::JavaScript(message) => BridgeError::Serialization(message),
                other => other,
            })?;

        match output.as_string() {
            Some(text) => text
                .to_string()
                .map_err(|e| BridgeError::from_js(&self.ctx, e)),
            None => Err(BridgeError::Serialization(format!(
                "{} has no JSON representation",
                value.type_name()
            ))),
        }
    }

    /// Evaluate script source in this scope.
    pub fn eval(&self, source: &str) -> BridgeResult<Value<'js>> {
        self.ctx
            .eval::<Value<'js>, _>(source)
            .map_err(|e| BridgeError::from_js(&self.ctx, e))
    }
}
