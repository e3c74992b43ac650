//! Value Marshalling
//!
//! Every value that crosses from script into native code is classified once
//! into a [`ScriptValue`]. Call sites match on the tag instead of probing the
//! engine value again.

use std::rc::Rc;

use rquickjs::convert::Coerced;
use rquickjs::{Array, Ctx, Function, Object, Value};

use crate::error::{BridgeError, BridgeResult};
use crate::scope::ScriptScope;
use crate::style::Style;

// ─────────────────────────────────────────────────────────────────────────────
// Script Values
// ─────────────────────────────────────────────────────────────────────────────

/// Fieldless view of a [`ScriptValue`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Null,
    Boolean,
    Number,
    String,
    Function,
    Object,
}

/// A classified value from the script side of the bridge.
#[derive(Debug, Clone)]
pub enum ScriptValue<'js> {
    /// `null` or `undefined`.
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// A callable reference.
    Function(Function<'js>),
    /// Any other structured reference.
    Object(Object<'js>),
}

impl<'js> ScriptValue<'js> {
    pub fn tag(&self) -> ValueTag {
        match self {
            ScriptValue::Null => ValueTag::Null,
            ScriptValue::Boolean(_) => ValueTag::Boolean,
            ScriptValue::Number(_) => ValueTag::Number,
            ScriptValue::String(_) => ValueTag::String,
            ScriptValue::Function(_) => ValueTag::Function,
            ScriptValue::Object(_) => ValueTag::Object,
        }
    }

    /// Render the value for a diagnostic line.
    ///
    /// Objects are serialized by the scope's own `JSON.stringify`; a failure
    /// there is returned, never replaced by placeholder text.
    pub fn render(&self, scope: &ScriptScope<'js>, style: Style) -> BridgeResult<String> {
        match self {
            ScriptValue::Null => Ok("null".to_string()),
            ScriptValue::Boolean(flag) => Ok(flag.to_string()),
            ScriptValue::Number(number) => Ok(format_number(*number)),
            ScriptValue::String(text) => Ok(style.quote(text)),
            ScriptValue::Function(function) => function
                .clone()
                .into_value()
                .get::<Coerced<String>>()
                .map(|source| source.0)
                .map_err(|e| BridgeError::from_js(scope.ctx(), e)),
            ScriptValue::Object(object) => scope.stringify(&object.clone().into_value()),
        }
    }
}

/// Format a number the way the script engine prints it (`Number.prototype.toString`).
pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        // covers -0
        return "0".to_string();
    }

    // shortest round-trip digits, as `d.ddde<exp>`
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let sign = if e < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{sign}{}", e.abs())
        } else {
            format!("{lead}.{rest}e{sign}{}", e.abs())
        }
    };

    if value < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callable Probes
// ─────────────────────────────────────────────────────────────────────────────

/// Decides whether a script object is a function.
///
/// Kept separate from classification so a different engine can plug in its
/// own reflective mechanism.
pub trait CallableProbe {
    fn is_callable<'js>(&self, ctx: &Ctx<'js>, object: &Object<'js>) -> bool;
}

/// Treats an object as callable when it carries a callable `apply` member.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyMemberProbe;

impl CallableProbe for ApplyMemberProbe {
    fn is_callable<'js>(&self, ctx: &Ctx<'js>, object: &Object<'js>) -> bool {
        match object.get::<_, Value<'js>>("apply") {
            Ok(member) => member.is_function(),
            Err(_) => {
                // a throwing getter leaves an exception pending
                let _ = ctx.catch();
                false
            }
        }
    }
}

/// Asks the engine directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineProbe;

impl CallableProbe for EngineProbe {
    fn is_callable<'js>(&self, _ctx: &Ctx<'js>, object: &Object<'js>) -> bool {
        object.clone().into_value().is_function()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Marshaller
// ─────────────────────────────────────────────────────────────────────────────

/// Classifies engine values into [`ScriptValue`]s.
#[derive(Clone)]
pub struct Marshaller {
    probe: Rc<dyn CallableProbe>,
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new(ApplyMemberProbe)
    }
}

impl Marshaller {
    pub fn new(probe: impl CallableProbe + 'static) -> Self {
        Self {
            probe: Rc::new(probe),
        }
    }

    /// Classify a value. Total: every engine value gets exactly one tag.
    pub fn classify<'js>(&self, ctx: &Ctx<'js>, value: Value<'js>) -> ScriptValue<'js> {
        if value.is_null() || value.is_undefined() {
            return ScriptValue::Null;
        }

        if let Some(text) = value.as_string() {
            return match text.to_string() {
                Ok(text) => ScriptValue::String(text),
                Err(_) => coerce(ctx, &value),
            };
        }

        if let Some(object) = value.as_object() {
            if !self.probe.is_callable(ctx, object) {
                return ScriptValue::Object(object.clone());
            }
            return match value.clone().into_function() {
                Some(function) => ScriptValue::Function(function),
                None => {
                    tracing::debug!("callable-looking object is not a function, keeping it as an object");
                    ScriptValue::Object(object.clone())
                }
            };
        }

        if let Some(flag) = value.as_bool() {
            return ScriptValue::Boolean(flag);
        }

        if let Some(number) = value.as_number() {
            return ScriptValue::Number(number);
        }

        coerce(ctx, &value)
    }
}

/// Fallback for kinds outside the closed set (symbols, big integers, ...).
fn coerce<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> ScriptValue<'js> {
    match value.get::<Coerced<String>>() {
        Ok(text) => ScriptValue::String(text.0),
        Err(_) => {
            let _ = ctx.catch();
            ScriptValue::String(format!("[{}]", value.type_name()))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native to Script
// ─────────────────────────────────────────────────────────────────────────────

/// Convert a native argument into a script value.
pub fn to_script<'js>(ctx: &Ctx<'js>, json: &serde_json::Value) -> rquickjs::Result<Value<'js>> {
    match json {
        serde_json::Value::Null => Ok(Value::new_null(ctx.clone())),
        serde_json::Value::Bool(b) => Ok(Value::new_bool(ctx.clone(), *b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Ok(Value::new_int(ctx.clone(), i))
            } else {
                Ok(Value::new_float(ctx.clone(), n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        serde_json::Value::String(s) => {
            Ok(rquickjs::String::from_str(ctx.clone(), s)?.into_value())
        }
        serde_json::Value::Array(arr) => {
            let js_arr = Array::new(ctx.clone())?;
            for (i, item) in arr.iter().enumerate() {
                js_arr.set(i, to_script(ctx, item)?)?;
            }
            Ok(js_arr.into_value())
        }
        serde_json::Value::Object(obj) => {
            let js_obj = Object::new(ctx.clone())?;
            for (key, val) in obj {
                js_obj.set(key.as_str(), to_script(ctx, val)?)?;
            }
            Ok(js_obj.into_value())
        }
    }
}
