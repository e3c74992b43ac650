//! Callback Invocation
//!
//! Native methods answer script callers by invoking a function the caller
//! passed in. The invocation is fire-and-forget: the return value of the
//! script function is ignored.

use rquickjs::function::{Rest, This};
use rquickjs::{Ctx, FromJs, Function, Persistent, Value};

use crate::error::{BridgeError, BridgeResult};
use crate::value::{Marshaller, ScriptValue, to_script};

/// A script function a native method may call back into.
#[derive(Debug, Clone)]
pub struct CallbackHandle<'js> {
    function: Function<'js>,
}

impl<'js> CallbackHandle<'js> {
    pub fn new(function: Function<'js>) -> Self {
        Self { function }
    }

    /// Only `Function` values make a handle.
    pub fn from_script_value(value: ScriptValue<'js>) -> Option<Self> {
        match value {
            ScriptValue::Function(function) => Some(Self::new(function)),
            _ => None,
        }
    }

    pub fn function(&self) -> &Function<'js> {
        &self.function
    }

    /// Call the function with `this = null` and `args` in order.
    pub fn invoke(&self, ctx: &Ctx<'js>, args: &[serde_json::Value]) -> BridgeResult<()> {
        let mut marshalled = Vec::with_capacity(args.len());
        for arg in args {
            marshalled.push(to_script(ctx, arg).map_err(|e| BridgeError::from_js(ctx, e))?);
        }

        tracing::trace!(args = args.len(), "invoking script callback");
        self.function
            .call::<_, ()>((This(Value::new_null(ctx.clone())), Rest(marshalled)))
            .map_err(|e| BridgeError::from_js(ctx, e))
    }

    /// Keep the function alive past the native call that received it.
    pub fn retain(self, ctx: &Ctx<'js>) -> RetainedCallback {
        RetainedCallback {
            function: Persistent::save(ctx, self.function),
        }
    }
}

impl<'js> FromJs<'js> for CallbackHandle<'js> {
    fn from_js(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Self> {
        let type_name = value.type_name();
        let classified = Marshaller::default().classify(ctx, value);
        Self::from_script_value(classified)
            .ok_or_else(|| rquickjs::Error::new_from_js(type_name, "function"))
    }
}

/// A callback detached from any script lifetime.
///
/// Still bound to the interface thread; restore it there before invoking.
#[derive(Clone)]
pub struct RetainedCallback {
    function: Persistent<Function<'static>>,
}

impl RetainedCallback {
    pub fn restore<'js>(self, ctx: &Ctx<'js>) -> BridgeResult<CallbackHandle<'js>> {
        self.function
            .restore(ctx)
            .map(CallbackHandle::new)
            .map_err(|e| BridgeError::from_js(ctx, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};
    use serde_json::json;

    #[test]
    fn test_invoke_preserves_order_and_count() {
        let runtime = Runtime::new().unwrap();
        let ctx = Context::full(&runtime).unwrap();

        ctx.with(|ctx| {
            let function: Function = ctx
                .eval("globalThis.seen = []; (function () { seen.push(Array.from(arguments)); })")
                .unwrap();
            let handle = CallbackHandle::new(function);

            handle.invoke(&ctx, &[json!(1), json!(2)]).unwrap();
            handle.invoke(&ctx, &[]).unwrap();
            handle.invoke(&ctx, &[json!("a"), json!(null), json!(true)]).unwrap();

            let seen: String = ctx.eval("JSON.stringify(seen)").unwrap();
            assert_eq!(seen, r#"[[1,2],[],["a",null,true]]"#);
        });
    }

    #[test]
    fn test_invoke_this_is_null() {
        let runtime = Runtime::new().unwrap();
        let ctx = Context::full(&runtime).unwrap();

        ctx.with(|ctx| {
            let function: Function = ctx
                .eval("(function () { 'use strict'; globalThis.receiver = this; })")
                .unwrap();
            CallbackHandle::new(function).invoke(&ctx, &[]).unwrap();

            let is_null: bool = ctx.eval("receiver === null").unwrap();
            assert!(is_null);
        });
    }

    #[test]
    fn test_invoke_reports_exceptions() {
        let runtime = Runtime::new().unwrap();
        let ctx = Context::full(&runtime).unwrap();

        ctx.with(|ctx| {
            let function: Function = ctx.eval("(() => { throw new Error('callback failed'); })").unwrap();
            let err = CallbackHandle::new(function).invoke(&ctx, &[json!(3)]).unwrap_err();
            match err {
                BridgeError::JavaScript(message) => assert_eq!(message, "callback failed"),
                other => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    fn test_from_js_rejects_non_functions() {
        let runtime = Runtime::new().unwrap();
        let ctx = Context::full(&runtime).unwrap();

        ctx.with(|ctx| {
            let value: Value = ctx.eval("({ foo: 1 })").unwrap();
            assert!(CallbackHandle::from_js(&ctx, value).is_err());

            let value: Value = ctx.eval("(x => x)").unwrap();
            assert!(CallbackHandle::from_js(&ctx, value).is_ok());
        });
    }

    #[test]
    fn test_retained_callback_restores() {
        let runtime = Runtime::new().unwrap();
        let ctx = Context::full(&runtime).unwrap();

        let retained = ctx.with(|ctx| {
            let function: Function = ctx.eval("(v => { globalThis.later = v; })").unwrap();
            CallbackHandle::new(function).retain(&ctx)
        });

        ctx.with(|ctx| {
            let handle = retained.restore(&ctx).unwrap();
            handle.invoke(&ctx, &[json!("answered")]).unwrap();
            let later: String = ctx.eval("later").unwrap();
            assert_eq!(later, "answered");
        });
    }
}
