//! Lexical scopes.
//!
//! A [`Scope`] is a parent-linked record of bindings. Blocks, loop
//! iterations and function calls each open one; closures keep their
//! defining chain alive by holding a handle to it. Function scopes are the
//! boundary `var` declarations stop at, and the ones that carry `this`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use jsbox_ir::DeclKind;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{already_declared, const_assignment, global_write, not_defined, EvalError};
use crate::prop::{Prop, PropFlags};
use crate::value::{Obj, Value};

#[derive(Clone, Debug)]
struct Binding {
    value: Value,
    kind: DeclKind,
}

struct ScopeData {
    parent: Option<Scope>,
    bindings: FxHashMap<Rc<str>, Binding>,
    /// Keys that resolve to properties of this scope's `this` object.
    globals: FxHashSet<Rc<str>>,
    /// `Some` on function scopes that bind their own `this`.
    this: Option<Value>,
    /// Stops `var` hoisting.
    function: bool,
    /// Top-level lexical scope of a program, whose `var`s live further up.
    program: bool,
}

/// Shared handle to one scope record.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
    fn from_data(data: ScopeData) -> Self {
        Scope(Rc::new(RefCell::new(data)))
    }

    /// The outermost scope: `this` is the sandbox global object and every
    /// key in `globals` resolves to one of its properties.
    pub fn root(global: &Obj, globals: impl IntoIterator<Item = Rc<str>>) -> Self {
        Scope::from_data(ScopeData {
            parent: None,
            bindings: FxHashMap::default(),
            globals: globals.into_iter().collect(),
            this: Some(Value::Object(global.clone())),
            function: true,
            program: false,
        })
    }

    /// A block scope.
    #[must_use]
    pub fn child(&self) -> Self {
        Scope::from_data(ScopeData {
            parent: Some(self.clone()),
            bindings: FxHashMap::default(),
            globals: FxHashSet::default(),
            this: None,
            function: false,
            program: false,
        })
    }

    /// The scope a program's top-level statements run in.
    #[must_use]
    pub fn program_child(&self) -> Self {
        let scope = self.child();
        scope.0.borrow_mut().program = true;
        scope
    }

    /// A function scope. Arrows pass `None` and see their parent's `this`.
    #[must_use]
    pub fn function_child(&self, this: Option<Value>) -> Self {
        Scope::from_data(ScopeData {
            parent: Some(self.clone()),
            bindings: FxHashMap::default(),
            globals: FxHashSet::default(),
            this,
            function: true,
            program: false,
        })
    }

    /// A block scope pre-populated with `let` bindings.
    #[must_use]
    pub fn with_bindings(&self, bindings: impl IntoIterator<Item = (Rc<str>, Value)>) -> Self {
        let scope = self.child();
        scope.0.borrow_mut().bindings.extend(
            bindings
                .into_iter()
                .map(|(key, value)| (key, Binding { value, kind: DeclKind::Let })),
        );
        scope
    }

    /// A sibling of this scope holding a copy of its bindings, used to give
    /// each loop iteration its own `let` variables.
    #[must_use]
    pub fn fork(&self) -> Self {
        let data = self.0.borrow();
        Scope::from_data(ScopeData {
            parent: data.parent.clone(),
            bindings: data.bindings.clone(),
            globals: data.globals.clone(),
            this: data.this.clone(),
            function: data.function,
            program: data.program,
        })
    }

    /// Resolve `key` along the chain.
    pub fn get(&self, key: &str) -> Prop {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let data = scope.0.borrow();
            if let Some((name, binding)) = data.bindings.get_key_value(key) {
                let mut flags = PropFlags::VARIABLE;
                if binding.kind == DeclKind::Const {
                    flags |= PropFlags::CONST;
                }
                return Prop::Binding {
                    scope: scope.clone(),
                    key: Rc::clone(name),
                    flags,
                };
            }
            if let Some(name) = data.globals.get(key) {
                return Prop::Member {
                    object: data.this.clone().unwrap_or_default(),
                    key: Rc::clone(name),
                    flags: PropFlags::GLOBAL | PropFlags::VARIABLE,
                };
            }
            current = data.parent.clone();
        }
        Prop::Unresolved(key.into())
    }

    /// `this` of the nearest function scope that binds one.
    pub fn this_value(&self) -> Value {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let data = scope.0.borrow();
            if let Some(this) = &data.this {
                return this.clone();
            }
            current = data.parent.clone();
        }
        Value::Undefined
    }

    /// Declare `key`.
    ///
    /// `var` binds in the nearest function scope and may be repeated, but
    /// not over a `let`/`const` of any scope it hoists through. `let`/`const`
    /// bind here and may not collide with an existing binding of this scope,
    /// nor at program level with a top-level `var`.
    pub fn declare(&self, key: &str, kind: DeclKind, value: Option<Value>) -> Result<(), EvalError> {
        if kind == DeclKind::Var {
            let target = self.var_scope(key)?;
            let mut data = target.0.borrow_mut();
            match data.bindings.get_mut(key) {
                Some(existing) if existing.kind != DeclKind::Var => return Err(already_declared(key)),
                Some(existing) => {
                    if let Some(value) = value {
                        existing.value = value;
                    }
                }
                None => {
                    data.bindings.insert(
                        key.into(),
                        Binding {
                            value: value.unwrap_or_default(),
                            kind,
                        },
                    );
                }
            }
            return Ok(());
        }

        let program_var = {
            let data = self.0.borrow();
            data.program
                && data.parent.as_ref().is_some_and(|parent| {
                    let vars = parent.function_scope();
                    let vars = vars.0.borrow();
                    vars.bindings.get(key).is_some_and(|b| b.kind == DeclKind::Var)
                })
        };
        let mut data = self.0.borrow_mut();
        if program_var || data.bindings.contains_key(key) {
            return Err(already_declared(key));
        }
        data.globals.remove(key);
        data.bindings.insert(
            key.into(),
            Binding {
                value: value.unwrap_or_default(),
                kind,
            },
        );
        Ok(())
    }

    /// Bind a hoisted function declaration in this scope, replacing any
    /// earlier declaration of the same name.
    pub fn declare_function(&self, key: &str, value: Value) -> Result<(), EvalError> {
        let mut data = self.0.borrow_mut();
        match data.bindings.get_mut(key) {
            Some(existing) if existing.kind != DeclKind::Var => Err(already_declared(key)),
            Some(existing) => {
                existing.value = value;
                Ok(())
            }
            None => {
                data.bindings.insert(
                    key.into(),
                    Binding {
                        value,
                        kind: DeclKind::Var,
                    },
                );
                Ok(())
            }
        }
    }

    /// Value of a binding owned by this scope record.
    pub fn read(&self, key: &str) -> Option<Value> {
        self.0.borrow().bindings.get(key).map(|b| b.value.clone())
    }

    /// Overwrite a binding owned by this scope record.
    pub(crate) fn write(&self, key: &str, value: Value) -> Result<(), EvalError> {
        match self.0.borrow_mut().bindings.get_mut(key) {
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => Err(not_defined(key)),
        }
    }

    /// Assign to an existing binding found along the chain.
    pub fn set(&self, key: &str, value: Value) -> Result<(), EvalError> {
        match self.get(key) {
            Prop::Unresolved(_) => Err(not_defined(key)),
            Prop::Binding { flags, .. } if flags.contains(PropFlags::CONST) => {
                Err(const_assignment(key))
            }
            Prop::Binding { scope, key, .. } => scope.write(&key, value),
            Prop::Member { key, .. } => Err(global_write(&key)),
        }
    }

    /// Function scope a `var key` lands in, refusing to hoist through a
    /// lexical binding of the same name.
    fn var_scope(&self, key: &str) -> Result<Scope, EvalError> {
        let mut current = self.clone();
        loop {
            let parent = {
                let data = current.0.borrow();
                if data.bindings.get(key).is_some_and(|b| b.kind != DeclKind::Var) {
                    return Err(already_declared(key));
                }
                if data.function {
                    return Ok(current.clone());
                }
                data.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Ok(current),
            }
        }
    }

    fn function_scope(&self) -> Scope {
        let mut current = self.clone();
        loop {
            let parent = {
                let data = current.0.borrow();
                if data.function {
                    return current.clone();
                }
                data.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(data) = self.0.try_borrow() else {
            return f.write_str("Scope(<borrowed>)");
        };
        let mut keys: Vec<&str> = data.bindings.keys().map(|k| &**k).collect();
        keys.sort_unstable();
        f.debug_struct("Scope")
            .field("bindings", &keys)
            .field("function", &data.function)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
