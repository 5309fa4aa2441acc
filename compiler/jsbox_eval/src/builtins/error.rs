//! `Error` and its native subclasses.

use super::{constructor, methods, this_object};
use crate::errors::EvalResult;
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{error_to_string, Args, Obj, ObjectKind, Value};

pub(super) fn install(realm: &mut Realm) {
    let intrinsics = realm.intrinsics();
    let families = [
        ("Error", intrinsics.error_prototype.clone(), error as super::Native),
        ("TypeError", intrinsics.type_error_prototype.clone(), type_error),
        ("ReferenceError", intrinsics.reference_error_prototype.clone(), reference_error),
        ("SyntaxError", intrinsics.syntax_error_prototype.clone(), syntax_error),
        ("RangeError", intrinsics.range_error_prototype.clone(), range_error),
    ];
    for (name, proto, func) in families {
        let ctor = constructor(realm, name, 1, &proto, func);
        proto.define("name", name);
        proto.define("message", "");
        realm.add_global(name, ctor);
    }
    let proto = realm.intrinsics().error_prototype.clone();
    methods(realm, &proto, &[("toString", 0, to_string)]);
}

fn create(interp: &Interp, name: &str, args: &Args<'_>) -> EvalResult {
    let proto = interp.realm().intrinsics().error_prototype_for(name).clone();
    let error = Obj::with_kind(ObjectKind::Error, Some(proto));
    match args.get(0) {
        Value::Undefined => {}
        message => error.set("message", message.to_js_string())?,
    }
    Ok(Value::Object(error))
}

fn error(interp: &Interp, args: &Args<'_>) -> EvalResult {
    create(interp, "Error", args)
}

fn type_error(interp: &Interp, args: &Args<'_>) -> EvalResult {
    create(interp, "TypeError", args)
}

fn reference_error(interp: &Interp, args: &Args<'_>) -> EvalResult {
    create(interp, "ReferenceError", args)
}

fn syntax_error(interp: &Interp, args: &Args<'_>) -> EvalResult {
    create(interp, "SyntaxError", args)
}

fn range_error(interp: &Interp, args: &Args<'_>) -> EvalResult {
    create(interp, "RangeError", args)
}

fn to_string(_: &Interp, args: &Args<'_>) -> EvalResult {
    let error = this_object(args, "Error.prototype.toString")?;
    Ok(Value::from(error_to_string(error)))
}
