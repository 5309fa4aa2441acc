//! Calls, construction and closure creation.

use std::rc::Rc;

use jsbox_ir::{DeclKind, FunctionBody, FunctionDef, FunctionKind};

use super::{AsyncDriver, Closure, Interp, SyncDriver};
use crate::builtins;
use crate::capabilities::Change;
use crate::errors::{
    async_forbidden, calls_forbidden, construction_denied, creation_forbidden, not_a_constructor,
    not_a_function, EvalError, EvalErrorKind, EvalResult,
};
use crate::scope::Scope;
use crate::value::promise;
use crate::value::{Args, Callable, Obj, ObjectKind, Value};

impl Interp {
    /// Call `callee` with `this` and `args`.
    pub fn call(&self, callee: &Value, this: Value, args: &[Value]) -> EvalResult {
        if self.caps().calls_forbidden() {
            return Err(calls_forbidden());
        }
        let Some((function, callable)) = callable_of(callee) else {
            return Err(not_a_function(&callee.to_js_string()));
        };
        if let Some(method) = self.realm().array_mutator(function) {
            self.announce_array_change(method, &this, args);
        }
        match callable {
            Callable::Native(native) => (native.func)(self, &Args::new(this, args)),
            Callable::Bound(bound) => {
                let mut all = bound.args.clone();
                all.extend_from_slice(args);
                self.call(&Value::Object(bound.target.clone()), bound.this.clone(), &all)
            }
            Callable::Sandbox(closure) => call_closure(function, &closure, this, args),
        }
    }

    /// Tell change subscribers of an array what a mutating method is about
    /// to do to it.
    fn announce_array_change(&self, method: &'static str, this: &Value, args: &[Value]) {
        let Value::Object(target) = this else {
            return;
        };
        if !self.caps().has_change_subscribers(target) {
            return;
        }
        if let Some(items) = target.array_items() {
            let change = builtins::change_record(method, &items, args);
            self.caps().fire_set(target, &Change::Array(change));
        }
    }

    /// `new callee(...args)`.
    ///
    /// Only whitelisted globals and functions the sandbox created itself may
    /// be constructed.
    pub fn construct(&self, callee: &Value, args: &[Value]) -> EvalResult {
        if self.caps().calls_forbidden() {
            return Err(calls_forbidden());
        }
        let Some((ctor, callable)) = callable_of(callee) else {
            return Err(not_a_constructor(&callee.to_js_string()));
        };
        let name = ctor.get("name").to_js_string();
        let caps = self.caps();
        if !caps.is_global_object(ctor) && !caps.is_sandbox_function(ctor) {
            tracing::debug!(name = %name, "construction denied");
            return Err(construction_denied(&name));
        }
        match callable {
            Callable::Native(native) if native.constructor => (native.func)(
                self,
                &Args {
                    this: Value::Undefined,
                    values: args,
                    construct: true,
                },
            ),
            Callable::Native(_) => Err(not_a_constructor(&name)),
            Callable::Bound(bound) => {
                let mut all = bound.args.clone();
                all.extend_from_slice(args);
                self.construct(&Value::Object(bound.target.clone()), &all)
            }
            Callable::Sandbox(closure) => {
                if closure.def.kind == FunctionKind::Arrow || closure.def.is_async {
                    return Err(not_a_constructor(&name));
                }
                let proto = match ctor.get("prototype") {
                    Value::Object(proto) => proto,
                    _ => self.realm().intrinsics().object_prototype.clone(),
                };
                let instance = Obj::with_kind(ObjectKind::Ordinary, Some(proto));
                let result = call_closure(ctor, &closure, Value::Object(instance.clone()), args)?;
                match result {
                    object @ Value::Object(_) => Ok(object),
                    _ => Ok(Value::Object(instance)),
                }
            }
        }
    }

    /// Evaluate a function literal into a function object closed over
    /// `scope`.
    pub fn create_function(
        &self,
        def: &Rc<FunctionDef>,
        scope: &Scope,
        global_this: bool,
    ) -> EvalResult {
        let caps = self.caps();
        if caps.creation_forbidden() {
            return Err(creation_forbidden());
        }
        if def.is_async && !caps.has_prototype(&self.realm().intrinsics().promise_prototype) {
            return Err(async_forbidden());
        }
        let closure = Rc::new(Closure {
            def: Rc::clone(def),
            scope: scope.clone(),
            interp: self.clone(),
            global_this,
        });
        let length = def.params.iter().filter(|p| !p.rest).count();
        let name = def.name.as_deref().unwrap_or("");
        let function = self
            .realm()
            .function_object(Callable::Sandbox(closure), name, length);
        if def.kind != FunctionKind::Arrow && !def.is_async {
            let proto = self.realm().new_object();
            proto.set("constructor", function.clone())?;
            caps.register_function(&proto);
            function.set("prototype", proto)?;
        }
        caps.register_function(&function);
        Ok(Value::Object(function))
    }

    /// The value a sandbox `catch` binding receives for `err`.
    ///
    /// Capability errors are reported without detail.
    pub fn error_value(&self, err: &EvalError) -> Value {
        let realm = self.realm();
        match &err.kind {
            EvalErrorKind::Thrown(value) => value.clone(),
            EvalErrorKind::Capability => {
                Value::Object(realm.new_error("Error", "Operation not permitted"))
            }
            kind => Value::Object(realm.new_error(kind.js_name().unwrap_or("Error"), &err.message)),
        }
    }
}

fn callable_of(value: &Value) -> Option<(&Obj, Callable)> {
    let Value::Object(obj) = value else {
        return None;
    };
    obj.callable().map(|callable| (obj, callable))
}

/// Run a sandbox closure's body.
#[tracing::instrument(level = "trace", skip_all, fields(name = closure.name().unwrap_or("anonymous")))]
fn call_closure(function: &Obj, closure: &Rc<Closure>, this: Value, args: &[Value]) -> EvalResult {
    let interp = &closure.interp;
    let def = &closure.def;
    let body = match &def.body {
        FunctionBody::Parsed(body) => Rc::clone(body),
        FunctionBody::Deferred(deferred) => deferred.get_or_parse(jsbox_parse::parse_deferred)?,
    };

    let this = match def.kind {
        FunctionKind::Arrow => None,
        _ if closure.global_this && this.is_nullish() => Some(Value::Object(interp.global().clone())),
        _ => Some(this),
    };
    let scope = closure.scope.function_child(this);
    if def.kind == FunctionKind::Expression {
        if let Some(name) = &def.name {
            scope.declare(name, DeclKind::Var, Some(Value::Object(function.clone())))?;
        }
    }
    for (index, param) in def.params.iter().enumerate() {
        let value = if param.rest {
            let rest = args.get(index..).unwrap_or_default().to_vec();
            Value::Object(interp.realm().new_array(rest))
        } else {
            args.get(index).cloned().unwrap_or_default()
        };
        scope.declare(&param.name, DeclKind::Var, Some(value))?;
    }

    if def.is_async {
        let (promise, _) = interp.realm().new_promise();
        let driver = AsyncDriver::new(interp.clone());
        promise::start(
            &promise,
            Box::pin(async move { driver.run_function(&body, &scope).await }),
        );
        return Ok(Value::Object(promise));
    }
    SyncDriver::new(interp).run_function(&body, &scope)
}
