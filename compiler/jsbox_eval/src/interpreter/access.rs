//! Property access under the capability policy.
//!
//! Reads resolve to a [`Prop`] first. Resolution is where prototype
//! whitelisting happens: a member found on a prototype is only reachable if
//! that prototype (and, for narrowed rules, that member) is allowed. Writes
//! go through `assign_check`, which refuses to touch globals, whitelisted
//! prototypes, host functions, frozen objects and primitives, and never lets
//! an own property shadow an inherited method.

use std::rc::Rc;

use super::Interp;
use crate::capabilities::Change;
use crate::errors::{
    cannot_read, capability_denied, const_assignment, frozen_assignment, frozen_global,
    global_write, not_defined, primitive_assignment, prototype_override, EvalError,
};
use crate::prop::{Operand, Prop, PropFlags};
use crate::value::{Obj, Value};

impl Interp {
    /// Resolve `object[key]` to a reference.
    pub fn member(&self, object: Value, key: Rc<str>) -> Result<Prop, EvalError> {
        if object.is_nullish() {
            return Err(cannot_read(&key, &object.to_js_string()));
        }
        let caps = self.caps();
        let mut flags = PropFlags::empty();
        if let Value::Object(obj) = &object {
            if obj.ptr_eq(self.global()) && caps.is_global_name(&key) {
                caps.record_global(&key);
                flags |= PropFlags::GLOBAL;
            }
            flags |= self.object_flags(obj);
        }

        if let Some((_, Some(owner))) = self.realm().lookup(&object, &key) {
            let type_name = self.realm().type_name(&owner);
            caps.record_prototype(&type_name, &key);
            if !caps.prototype_allows(&owner, &key) {
                let member = format!("{type_name}.{key}");
                tracing::debug!(member = %member, "prototype member denied");
                return Err(capability_denied(&member));
            }
        }
        Ok(Prop::Member { object, key, flags })
    }

    /// Objects the sandbox may read but never modify: whitelisted globals,
    /// whitelisted prototypes and functions it did not create.
    fn object_flags(&self, obj: &Obj) -> PropFlags {
        let caps = self.caps();
        let read_only = caps.is_global_object(obj)
            || caps.has_prototype(obj)
            || (obj.is_callable() && !caps.is_sandbox_function(obj));
        if read_only {
            PropFlags::GLOBAL
        } else {
            PropFlags::empty()
        }
    }

    /// Read the value an operand refers to.
    pub fn deref(&self, operand: Operand) -> Result<Value, EvalError> {
        match operand {
            Operand::Value(value) => Ok(value),
            Operand::Optional => Ok(Value::Undefined),
            Operand::Prop(prop) => self.read(&prop),
        }
    }

    /// Read through a reference, applying value replacements.
    pub fn read(&self, prop: &Prop) -> Result<Value, EvalError> {
        match prop {
            Prop::Unresolved(key) => Err(not_defined(key)),
            Prop::Binding { scope, key, .. } => scope.read(key).ok_or_else(|| not_defined(key)),
            Prop::Member { object, key, .. } => {
                let value = self.realm().get(object, key)?;
                if let Value::Object(obj) = object {
                    self.caps().fire_get(obj, key);
                }
                Ok(self.caps().replacement(&value).unwrap_or(value))
            }
        }
    }

    /// Store `value` through a reference.
    pub fn assign(&self, prop: &Prop, value: Value) -> Result<(), EvalError> {
        match prop {
            Prop::Unresolved(key) => Err(not_defined(key)),
            Prop::Binding { flags, key, .. } if flags.contains(PropFlags::CONST) => {
                Err(const_assignment(key))
            }
            Prop::Binding { scope, key, .. } => scope.write(key, value),
            Prop::Member { object, key, flags } => {
                let obj = self.assign_check(object, key, *flags)?;
                let change = if obj.has_own(key) {
                    Change::Replace(Rc::clone(key))
                } else {
                    Change::Create(Rc::clone(key))
                };
                self.caps().fire_set(obj, &change);
                obj.borrow_mut().set_own(Rc::clone(key), value)
            }
        }
    }

    /// `delete` through a reference.
    pub fn delete(&self, prop: &Prop) -> Result<bool, EvalError> {
        match prop {
            Prop::Unresolved(_) => Ok(true),
            Prop::Binding { .. } => Ok(false),
            Prop::Member { object, key, flags } => {
                let obj = self.assign_check(object, key, *flags)?;
                if !obj.has_own(key) {
                    return Ok(true);
                }
                self.caps().fire_set(obj, &Change::Delete(Rc::clone(key)));
                Ok(obj.borrow_mut().delete_own(key))
            }
        }
    }

    /// Assign `obj[key] = value` on behalf of a native, with the same checks
    /// a script assignment gets.
    pub fn set_member(&self, obj: &Obj, key: Rc<str>, value: Value) -> Result<(), EvalError> {
        let prop = self.member(Value::Object(obj.clone()), key)?;
        self.assign(&prop, value)
    }

    /// Fail unless `obj[key]` may be modified. Natives that mutate their
    /// receiver in place call this before touching it.
    pub fn ensure_writable(&self, obj: &Obj, key: &str) -> Result<(), EvalError> {
        let object = Value::Object(obj.clone());
        self.assign_check(&object, key, self.object_flags(obj))
            .map(|_| ())
    }

    /// Fail unless `obj` belongs to the sandbox and may be frozen.
    pub fn ensure_freezable(&self, obj: &Obj) -> Result<(), EvalError> {
        if self.object_flags(obj).contains(PropFlags::GLOBAL) {
            tracing::debug!("freeze of a global object denied");
            return Err(frozen_global());
        }
        Ok(())
    }

    fn assign_check<'v>(
        &self,
        object: &'v Value,
        key: &str,
        flags: PropFlags,
    ) -> Result<&'v Obj, EvalError> {
        let Value::Object(obj) = object else {
            return Err(primitive_assignment(key));
        };
        if flags.contains(PropFlags::CONST) {
            return Err(const_assignment(key));
        }
        if flags.contains(PropFlags::GLOBAL) {
            tracing::debug!(key, "write to global object denied");
            return Err(global_write(key));
        }
        if !obj.has_own(key) {
            if let Some((inherited, Some(_))) = obj.lookup(key) {
                if inherited.is_callable() {
                    tracing::debug!(key, "prototype method override denied");
                    return Err(prototype_override(key));
                }
            }
        }
        if obj.borrow().frozen {
            return Err(frozen_assignment(key));
        }
        Ok(obj)
    }
}
