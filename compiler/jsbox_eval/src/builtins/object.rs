//! `Object` and `Object.prototype`.

use super::{constructor, describe, methods, this_object};
use crate::errors::{type_error, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{Args, Obj, ObjectKind, Value};

pub(super) fn install(realm: &mut Realm) {
    let proto = realm.intrinsics().object_prototype.clone();
    let ctor = constructor(realm, "Object", 1, &proto, object);
    methods(
        realm,
        &ctor,
        &[
            ("keys", 1, keys),
            ("values", 1, values),
            ("entries", 1, entries),
            ("assign", 2, assign),
            ("freeze", 1, freeze),
            ("isFrozen", 1, is_frozen),
            ("create", 2, create),
            ("getPrototypeOf", 1, get_prototype_of),
            ("fromEntries", 1, from_entries),
            ("hasOwn", 2, has_own),
        ],
    );
    methods(
        realm,
        &proto,
        &[
            ("hasOwnProperty", 1, has_own_property),
            ("isPrototypeOf", 1, is_prototype_of),
            ("toString", 0, to_string),
            ("valueOf", 0, value_of),
        ],
    );
    realm.add_global("Object", ctor);
}

/// `ToObject`: wrap primitives, reject `null`/`undefined`.
pub(super) fn to_object(interp: &Interp, value: &Value) -> Result<Obj, crate::EvalError> {
    match value {
        Value::Object(obj) => Ok(obj.clone()),
        Value::Undefined | Value::Null => Err(type_error(format!(
            "Cannot convert {} to object",
            value.to_js_string()
        ))),
        primitive => Ok(Obj::with_kind(
            ObjectKind::Boxed(primitive.clone()),
            interp.realm().prototype_of(primitive),
        )),
    }
}

fn object(interp: &Interp, args: &Args<'_>) -> EvalResult {
    match args.get(0) {
        Value::Undefined | Value::Null => Ok(Value::Object(interp.realm().new_object())),
        value => to_object(interp, &value).map(Value::Object),
    }
}

fn keys(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = to_object(interp, &args.get(0))?;
    let keys = obj.own_keys().into_iter().map(Value::String).collect();
    Ok(Value::Object(interp.realm().new_array(keys)))
}

fn values(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = to_object(interp, &args.get(0))?;
    let values = obj
        .own_keys()
        .iter()
        .map(|key| obj.get_own(key).unwrap_or_default())
        .collect();
    Ok(Value::Object(interp.realm().new_array(values)))
}

fn entries(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let realm = interp.realm();
    let obj = to_object(interp, &args.get(0))?;
    let entries = obj
        .own_keys()
        .into_iter()
        .map(|key| {
            let value = obj.get_own(&key).unwrap_or_default();
            Value::Object(realm.new_array(vec![Value::String(key), value]))
        })
        .collect();
    Ok(Value::Object(realm.new_array(entries)))
}

fn assign(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let target = to_object(interp, &args.get(0))?;
    for source in args.rest(1) {
        let Value::Object(source) = source else {
            continue;
        };
        for key in source.own_keys() {
            let value = source.get_own(&key).unwrap_or_default();
            interp.set_member(&target, key, value)?;
        }
    }
    Ok(Value::Object(target))
}

fn freeze(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let value = args.get(0);
    if let Value::Object(obj) = &value {
        interp.ensure_freezable(obj)?;
        obj.borrow_mut().frozen = true;
    }
    Ok(value)
}

fn is_frozen(_: &Interp, args: &Args<'_>) -> EvalResult {
    Ok(Value::Bool(match args.get(0) {
        Value::Object(obj) => obj.borrow().frozen,
        _ => true,
    }))
}

fn create(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let proto = match args.get(0) {
        Value::Null => None,
        Value::Object(proto) => Some(proto),
        other => {
            return Err(type_error(format!(
                "Object prototype may only be an Object or null: {}",
                describe(&other)
            )))
        }
    };
    let obj = Obj::with_kind(ObjectKind::Ordinary, proto);
    if let Value::Object(props) = args.get(1) {
        for key in props.own_keys() {
            if let Some(Value::Object(descriptor)) = props.get_own(&key) {
                interp.set_member(&obj, key, descriptor.get("value"))?;
            }
        }
    }
    Ok(Value::Object(obj))
}

fn get_prototype_of(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = to_object(interp, &args.get(0))?;
    Ok(obj.proto().map_or(Value::Null, Value::Object))
}

fn from_entries(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = interp.realm().new_object();
    let Some(entries) = args.get(0).as_object().and_then(Obj::array_items) else {
        return Err(type_error("Object.fromEntries requires an array of entries"));
    };
    for entry in entries {
        let pair = entry
            .as_object()
            .and_then(Obj::array_items)
            .ok_or_else(|| type_error("Iterator value is not an entry object"))?;
        let key = pair.first().cloned().unwrap_or_default().to_property_key();
        let value = pair.get(1).cloned().unwrap_or_default();
        interp.set_member(&obj, key, value)?;
    }
    Ok(Value::Object(obj))
}

fn has_own(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = to_object(interp, &args.get(0))?;
    Ok(Value::Bool(obj.has_own(&args.get(1).to_property_key())))
}

fn has_own_property(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let obj = to_object(interp, &args.this)?;
    Ok(Value::Bool(obj.has_own(&args.get(0).to_property_key())))
}

fn is_prototype_of(_: &Interp, args: &Args<'_>) -> EvalResult {
    let proto = this_object(args, "Object.prototype.isPrototypeOf")?;
    Ok(Value::Bool(match args.get(0) {
        Value::Object(obj) => obj.inherits_from(proto),
        _ => false,
    }))
}

fn to_string(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let tag = match &args.this {
        Value::Undefined => "Undefined".into(),
        Value::Null => "Null".into(),
        Value::Object(obj) if obj.is_array() => "Array".into(),
        Value::Object(obj) if obj.is_callable() => "Function".into(),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Error => "Error".into(),
            ObjectKind::RegExp(_) => "RegExp".into(),
            ObjectKind::Global => "SandboxGlobal".into(),
            _ => "Object".into(),
        },
        primitive => interp
            .realm()
            .prototype_of(primitive)
            .map_or_else(|| "Object".into(), |proto| interp.realm().type_name(&proto)),
    };
    Ok(Value::from(format!("[object {tag}]")))
}

fn value_of(interp: &Interp, args: &Args<'_>) -> EvalResult {
    to_object(interp, &args.this).map(Value::Object)
}
