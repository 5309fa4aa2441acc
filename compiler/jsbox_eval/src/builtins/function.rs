//! `Function`, `Function.prototype` and the sandboxed stand-in.

use std::rc::Rc;

use jsbox_ir::Node;

use super::{methods, this_object};
use crate::errors::{not_a_function, syntax_error, type_error, EvalResult};
use crate::interpreter::Interp;
use crate::realm::Realm;
use crate::value::{Args, BoundFunction, Callable, NativeFn, Value};

pub(super) fn install(realm: &mut Realm) {
    let proto = realm.intrinsics().function_prototype.clone();
    methods(
        realm,
        &proto,
        &[
            ("call", 1, call),
            ("apply", 2, apply),
            ("bind", 1, bind),
            ("toString", 0, to_string),
        ],
    );
    for ctor in [
        realm.intrinsics().function_constructor.clone(),
        realm.intrinsics().sandboxed_function.clone(),
    ] {
        ctor.define("prototype", proto.clone());
    }
    let constructor = realm.intrinsics().function_constructor.clone();
    proto.define("constructor", constructor.clone());
    proto.define("name", "");
    proto.define("length", 0.0);
    realm.add_global("Function", constructor);
}

/// The `Function` constructor proper: the new function's `this` is left
/// unbound.
pub(crate) fn unrestricted() -> NativeFn {
    Rc::new(|interp: &Interp, args: &Args<'_>| compile_function(interp, args, false))
}

/// The stand-in handed to sandboxes: an unbound `this` inside the new
/// function resolves to the calling sandbox's global object.
pub(crate) fn sandboxed() -> NativeFn {
    Rc::new(|interp: &Interp, args: &Args<'_>| compile_function(interp, args, true))
}

/// `Function(p1, p2, ..., body)`: compile with the sandbox's own parser into
/// a closure over the sandbox's root scope.
fn compile_function(interp: &Interp, args: &Args<'_>, global_this: bool) -> EvalResult {
    let (body, params) = match args.values.split_last() {
        Some((body, params)) => (body.to_js_string(), params),
        None => ("".into(), &[][..]),
    };
    let params: Vec<String> = params.iter().map(|p| p.to_js_string().to_string()).collect();
    let source = format!("(function anonymous({}) {{\n{body}\n}})", params.join(","));
    let program = jsbox_parse::compile_with(&source, interp.parse_options())?;
    let def = match &*program.body {
        [Node::Function(def)] => Rc::clone(def),
        _ => return Err(syntax_error("Invalid function body")),
    };
    tracing::debug!(params = params.len(), global_this, "compiled function from string");
    interp.create_function(&def, interp.root(), global_this)
}

fn call(interp: &Interp, args: &Args<'_>) -> EvalResult {
    interp.call(&args.this, args.get(0), args.rest(1))
}

fn apply(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let list = match args.get(1) {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Object(obj) => obj
            .array_items()
            .ok_or_else(|| type_error("CreateListFromArrayLike called on non-array"))?,
        _ => return Err(type_error("CreateListFromArrayLike called on non-object")),
    };
    interp.call(&args.this, args.get(0), &list)
}

fn bind(interp: &Interp, args: &Args<'_>) -> EvalResult {
    let target = this_object(args, "Function.prototype.bind")?;
    if !target.is_callable() {
        return Err(not_a_function("Bind target"));
    }
    let name = format!("bound {}", target.get("name").to_js_string());
    let length = (target.get("length").to_number() - (args.len().saturating_sub(1)) as f64).max(0.0);
    let bound = Callable::Bound(Rc::new(BoundFunction {
        target: target.clone(),
        this: args.get(0),
        args: args.rest(1).to_vec(),
    }));
    let function = interp.realm().function_object(bound, &name, length as usize);
    interp.caps().register_function(&function);
    Ok(Value::Object(function))
}

fn to_string(_: &Interp, args: &Args<'_>) -> EvalResult {
    match &args.this {
        this @ Value::Object(obj) if obj.is_callable() => Ok(Value::from(this.to_js_string())),
        _ => Err(type_error("Function.prototype.toString requires that 'this' be a Function")),
    }
}
