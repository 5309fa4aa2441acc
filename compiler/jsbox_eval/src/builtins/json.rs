//! `JSON.parse` and `JSON.stringify` via `serde_json`.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use super::methods;
use crate::errors::{syntax_error, type_error, EvalError, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{Args, Obj, ObjId, ObjectKind, Value};

/// Largest integer `f64` represents exactly; integral numbers up to this
/// magnitude print without a fractional part.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub(super) fn install(realm: &mut Realm) {
    let json = realm.new_object();
    methods(realm, &json, &[("parse", 2, parse), ("stringify", 3, stringify)]);
    realm.add_global("JSON", json);
}

fn parse(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let text = args.get(0).to_js_string();
    let parsed: serde_json::Value = serde_json::from_str(&text)
        .map_err(|err| syntax_error(format!("Unexpected token in JSON: {err}")))?;
    let value = from_json(interp, parsed)?;
    let reviver = args.get(1);
    if !reviver.is_callable() {
        return Ok(value);
    }
    let root = interp.realm().new_object();
    root.set("", value)?;
    revive(interp, &reviver, &root, "")
}

fn from_json(interp: &Interp, json: serde_json::Value) -> EvalResult {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::from(s),
        serde_json::Value::Array(items) => {
            let items = items
                .into_iter()
                .map(|item| from_json(interp, item))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Object(interp.realm().new_array(items))
        }
        serde_json::Value::Object(map) => {
            let obj = interp.realm().new_object();
            for (key, value) in map {
                obj.set(&key, from_json(interp, value)?)?;
            }
            Value::Object(obj)
        }
    })
}

/// Post-order walk calling the reviver for every key; `undefined` results
/// delete the key.
fn revive(interp: &Interp, reviver: &Value, holder: &Obj, key: &str) -> EvalResult {
    let value = holder.get(key);
    if let Value::Object(obj) = &value {
        for child in obj.own_keys() {
            let revived = revive(interp, reviver, obj, &child)?;
            if matches!(revived, Value::Undefined) {
                obj.delete(&child);
            } else {
                obj.set(&child, revived)?;
            }
        }
    }
    interp.call(
        reviver,
        Value::Object(holder.clone()),
        &[Value::from(key), value],
    )
}

enum Replacer {
    None,
    Function(Value),
    Keys(Vec<std::rc::Rc<str>>),
}

fn stringify(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let replacer = match args.get(1) {
        f if f.is_callable() => Replacer::Function(f),
        Value::Object(obj) if obj.is_array() => Replacer::Keys(
            obj.array_items()
                .unwrap_or_default()
                .iter()
                .filter(|v| matches!(v, Value::String(_) | Value::Number(_)))
                .map(Value::to_js_string)
                .collect(),
        ),
        _ => Replacer::None,
    };
    let indent = match args.get(2) {
        Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    let holder = interp.realm().new_object();
    let value = args.get(0);
    holder.set("", value.clone())?;
    let mut stack = Vec::new();
    let Some(json) = to_json(interp, &replacer, &holder, "", value, &mut stack)? else {
        return Ok(Value::Undefined);
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut out = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
        json.serialize(&mut ser)
            .map(|()| String::from_utf8_lossy(&out).into_owned())
    };
    text.map(Value::from)
        .map_err(|err| type_error(format!("JSON serialization failed: {err}")))
}

fn to_json(
    interp: &Interp,
    replacer: &Replacer,
    holder: &Obj,
    key: &str,
    value: Value,
    stack: &mut Vec<ObjId>,
) -> Result<Option<serde_json::Value>, EvalError> {
    let value = match replacer {
        Replacer::Function(f) => interp.call(
            f,
            Value::Object(holder.clone()),
            &[Value::from(key), value],
        )?,
        _ => value,
    };
    let value = match value {
        Value::Object(obj) => {
            let unboxed = match &obj.borrow().kind {
                ObjectKind::Boxed(inner) => Some(inner.clone()),
                _ => None,
            };
            unboxed.unwrap_or(Value::Object(obj))
        }
        other => other,
    };
    Ok(Some(match value {
        Value::Undefined => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Number(n) => number(n),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Object(obj) if obj.is_callable() => return Ok(None),
        Value::Object(obj) => {
            if stack.contains(&obj.id()) {
                return Err(type_error("Converting circular structure to JSON"));
            }
            stack.push(obj.id());
            let json = if let Some(items) = obj.array_items() {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    let item = to_json(interp, replacer, &obj, &i.to_string(), item, stack)?;
                    out.push(item.unwrap_or(serde_json::Value::Null));
                }
                serde_json::Value::Array(out)
            } else {
                let keys = match replacer {
                    Replacer::Keys(keys) => keys
                        .iter()
                        .filter(|key| obj.has_own(key))
                        .cloned()
                        .collect(),
                    _ => obj.own_keys(),
                };
                let mut map = serde_json::Map::new();
                for key in keys {
                    let item = obj.get_own(&key).unwrap_or_default();
                    if let Some(item) = to_json(interp, replacer, &obj, &key, item, stack)? {
                        map.insert(key.to_string(), item);
                    }
                }
                serde_json::Value::Object(map)
            };
            stack.pop();
            json
        }
    }))
}

fn number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}
