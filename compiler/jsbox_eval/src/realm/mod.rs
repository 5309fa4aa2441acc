//! Intrinsic objects.
//!
//! A [`Realm`] owns every built-in prototype and constructor. It is the
//! explicit prototype registry the capability checks consult: it knows
//! which prototype a primitive inherits from, whether a property is own or
//! inherited (and from where), and which type name to report for a
//! prototype in errors and audit reports.
//!
//! A realm is immutable once built and can back any number of executions;
//! each execution gets its own global object from [`Realm::new_global`].

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::builtins;
use crate::errors::{cannot_read, EvalResult};
use crate::value::promise::{PromiseHandle, PromiseState};
use crate::value::{
    array_index, Args, Callable, NativeFn, NativeFunction, Obj, ObjId, ObjectKind, Value,
};

/// Built-in prototypes and the constructors capability policy refers to.
pub struct Intrinsics {
    pub object_prototype: Obj,
    pub function_prototype: Obj,
    pub array_prototype: Obj,
    pub string_prototype: Obj,
    pub number_prototype: Obj,
    pub boolean_prototype: Obj,
    pub error_prototype: Obj,
    pub type_error_prototype: Obj,
    pub reference_error_prototype: Obj,
    pub syntax_error_prototype: Obj,
    pub range_error_prototype: Obj,
    pub regexp_prototype: Obj,
    pub promise_prototype: Obj,
    /// Prototype of every sandbox global object.
    pub global_prototype: Obj,
    /// The unrestricted `Function` constructor.
    pub function_constructor: Obj,
    /// The `Function` stand-in that compiles into the calling sandbox.
    pub sandboxed_function: Obj,
}

impl Intrinsics {
    pub fn prototypes(&self) -> [&Obj; 14] {
        [
            &self.object_prototype,
            &self.function_prototype,
            &self.array_prototype,
            &self.string_prototype,
            &self.number_prototype,
            &self.boolean_prototype,
            &self.error_prototype,
            &self.type_error_prototype,
            &self.reference_error_prototype,
            &self.syntax_error_prototype,
            &self.range_error_prototype,
            &self.regexp_prototype,
            &self.promise_prototype,
            &self.global_prototype,
        ]
    }

    /// Prototype for errors called `name`.
    pub fn error_prototype_for(&self, name: &str) -> &Obj {
        match name {
            "TypeError" => &self.type_error_prototype,
            "ReferenceError" => &self.reference_error_prototype,
            "SyntaxError" => &self.syntax_error_prototype,
            "RangeError" => &self.range_error_prototype,
            _ => &self.error_prototype,
        }
    }
}

pub struct Realm {
    intrinsics: Intrinsics,
    type_names: FxHashMap<ObjId, Rc<str>>,
    array_mutators: FxHashMap<ObjId, &'static str>,
    globals: Vec<(Rc<str>, Value)>,
}

impl Realm {
    pub fn new() -> Self {
        let object_prototype = Obj::with_kind(ObjectKind::Ordinary, None);
        let function_prototype = Obj::with_kind(
            ObjectKind::Function(Callable::Native(NativeFunction {
                name: "".into(),
                func: Rc::new(|_: &crate::Interp, _: &Args<'_>| Ok(Value::Undefined)),
                constructor: false,
            })),
            Some(object_prototype.clone()),
        );
        let ordinary = |proto: &Obj| Obj::with_kind(ObjectKind::Ordinary, Some(proto.clone()));
        let error_prototype = ordinary(&object_prototype);

        let function_constructor =
            native_function(&function_prototype, "Function", 1, true, builtins::function::unrestricted());
        let sandboxed_function =
            native_function(&function_prototype, "Function", 1, true, builtins::function::sandboxed());

        let intrinsics = Intrinsics {
            array_prototype: ordinary(&object_prototype),
            string_prototype: ordinary(&object_prototype),
            number_prototype: ordinary(&object_prototype),
            boolean_prototype: ordinary(&object_prototype),
            type_error_prototype: ordinary(&error_prototype),
            reference_error_prototype: ordinary(&error_prototype),
            syntax_error_prototype: ordinary(&error_prototype),
            range_error_prototype: ordinary(&error_prototype),
            regexp_prototype: ordinary(&object_prototype),
            promise_prototype: ordinary(&object_prototype),
            global_prototype: ordinary(&object_prototype),
            error_prototype,
            object_prototype,
            function_prototype,
            function_constructor,
            sandboxed_function,
        };

        let type_names = [
            (&intrinsics.object_prototype, "Object"),
            (&intrinsics.function_prototype, "Function"),
            (&intrinsics.array_prototype, "Array"),
            (&intrinsics.string_prototype, "String"),
            (&intrinsics.number_prototype, "Number"),
            (&intrinsics.boolean_prototype, "Boolean"),
            (&intrinsics.error_prototype, "Error"),
            (&intrinsics.type_error_prototype, "TypeError"),
            (&intrinsics.reference_error_prototype, "ReferenceError"),
            (&intrinsics.syntax_error_prototype, "SyntaxError"),
            (&intrinsics.range_error_prototype, "RangeError"),
            (&intrinsics.regexp_prototype, "RegExp"),
            (&intrinsics.promise_prototype, "Promise"),
            (&intrinsics.global_prototype, "SandboxGlobal"),
        ]
        .into_iter()
        .map(|(proto, name)| (proto.id(), Rc::from(name)))
        .collect();

        let mut realm = Realm {
            intrinsics,
            type_names,
            array_mutators: FxHashMap::default(),
            globals: Vec::new(),
        };
        builtins::install(&mut realm);
        tracing::debug!(globals = realm.globals.len(), "realm initialised");
        realm
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// The globals every sandbox sees under standard capabilities.
    pub fn standard_globals(&self) -> &[(Rc<str>, Value)] {
        &self.globals
    }

    pub(crate) fn add_global(&mut self, name: &str, value: impl Into<Value>) {
        self.globals.push((name.into(), value.into()));
    }

    pub(crate) fn register_array_mutator(&mut self, function: &Obj, method: &'static str) {
        self.array_mutators.insert(function.id(), method);
    }

    /// Name of the mutating `Array.prototype` method `function` is, if any.
    pub fn array_mutator(&self, function: &Obj) -> Option<&'static str> {
        self.array_mutators.get(&function.id()).copied()
    }

    /// Type name reported for members inherited from `proto`.
    pub fn type_name(&self, proto: &Obj) -> Rc<str> {
        if let Some(name) = self.type_names.get(&proto.id()) {
            return Rc::clone(name);
        }
        if let Some(Value::Object(constructor)) = proto.get_own("constructor") {
            if let Some(Value::String(name)) = constructor.get_own("name") {
                if !name.is_empty() {
                    return name;
                }
            }
        }
        "Object".into()
    }

    /// Prototype a value inherits from.
    pub fn prototype_of(&self, value: &Value) -> Option<Obj> {
        match value {
            Value::Undefined | Value::Null => None,
            Value::Bool(_) => Some(self.intrinsics.boolean_prototype.clone()),
            Value::Number(_) => Some(self.intrinsics.number_prototype.clone()),
            Value::String(_) => Some(self.intrinsics.string_prototype.clone()),
            Value::Object(obj) => obj.proto(),
        }
    }

    /// Find `key` on `value`. Returns the value and, when inherited, the
    /// prototype that owns it.
    pub fn lookup(&self, value: &Value, key: &str) -> Option<(Value, Option<Obj>)> {
        match value {
            Value::Object(obj) => obj.lookup(key),
            Value::String(s) => {
                if key == "length" {
                    return Some((Value::from(s.chars().count()), None));
                }
                if let Some(ch) = array_index(key).and_then(|i| s.chars().nth(i)) {
                    return Some((Value::from(ch.to_string()), None));
                }
                inherited(&self.intrinsics.string_prototype, key)
            }
            Value::Number(_) => inherited(&self.intrinsics.number_prototype, key),
            Value::Bool(_) => inherited(&self.intrinsics.boolean_prototype, key),
            Value::Undefined | Value::Null => None,
        }
    }

    /// Read `key` from `value` with no capability checks.
    pub fn get(&self, value: &Value, key: &str) -> EvalResult {
        if value.is_nullish() {
            return Err(cannot_read(key, &value.to_js_string()));
        }
        Ok(self.lookup(value, key).map(|(v, _)| v).unwrap_or_default())
    }

    /// A fresh sandbox global object.
    pub fn new_global(&self) -> Obj {
        Obj::with_kind(ObjectKind::Global, Some(self.intrinsics.global_prototype.clone()))
    }

    pub fn new_object(&self) -> Obj {
        Obj::with_kind(ObjectKind::Ordinary, Some(self.intrinsics.object_prototype.clone()))
    }

    pub fn new_array(&self, items: Vec<Value>) -> Obj {
        Obj::with_kind(ObjectKind::Array(items), Some(self.intrinsics.array_prototype.clone()))
    }

    /// An error object whose prototype matches `name`.
    pub fn new_error(&self, name: &str, message: &str) -> Obj {
        let proto = self.intrinsics.error_prototype_for(name);
        let error = Obj::with_kind(ObjectKind::Error, Some(proto.clone()));
        error.define("message", message);
        if proto.ptr_eq(&self.intrinsics.error_prototype) && name != "Error" {
            error.define("name", name);
        }
        error
    }

    /// A pending promise and the handle that settles it.
    pub fn new_promise(&self) -> (Obj, PromiseHandle) {
        let promise = Obj::with_kind(
            ObjectKind::Promise(Rc::new(std::cell::RefCell::new(PromiseState::new()))),
            Some(self.intrinsics.promise_prototype.clone()),
        );
        (promise.clone(), PromiseHandle::new(promise))
    }

    /// A host function callable from the sandbox.
    pub fn native_function(
        &self,
        name: &str,
        length: u32,
        func: impl Fn(&crate::Interp, &Args<'_>) -> EvalResult + 'static,
    ) -> Obj {
        native_function(&self.intrinsics.function_prototype, name, length, false, Rc::new(func))
    }

    /// Wrap a callable in a function object with `name` and `length`.
    pub(crate) fn function_object(&self, callable: Callable, name: &str, length: usize) -> Obj {
        function_object(&self.intrinsics.function_prototype, callable, name, length)
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let globals: Vec<&str> = self.globals.iter().map(|(name, _)| &**name).collect();
        f.debug_struct("Realm")
            .field("globals", &globals)
            .field("named_prototypes", &self.type_names.len())
            .field("array_mutators", &self.array_mutators.len())
            .finish_non_exhaustive()
    }
}

fn inherited(proto: &Obj, key: &str) -> Option<(Value, Option<Obj>)> {
    if let Some(value) = proto.get_own(key) {
        return Some((value, Some(proto.clone())));
    }
    proto.lookup(key)
}

pub(crate) fn function_object(function_prototype: &Obj, callable: Callable, name: &str, length: usize) -> Obj {
    let function = Obj::with_kind(ObjectKind::Function(callable), Some(function_prototype.clone()));
    function.define("name", name);
    function.define("length", length);
    function
}

pub(crate) fn native_function(
    function_prototype: &Obj,
    name: &str,
    length: u32,
    constructor: bool,
    func: NativeFn,
) -> Obj {
    let callable = Callable::Native(NativeFunction {
        name: name.into(),
        func,
        constructor,
    });
    function_object(function_prototype, callable, name, length as usize)
}

#[cfg(test)]
mod tests;
