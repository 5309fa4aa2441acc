//! Tree-walking interpreter.
//!
//! # Architecture
//!
//! [`Interp`] is the per-execution context: realm, capabilities, operator
//! table, the sandbox global object and the root scope. It owns every
//! operation that crosses the capability boundary:
//!
//! - `access` - member resolution, dereferencing, assignment and deletion
//! - `call` - calls, construction and closure creation
//!
//! Node evaluation is done by two drivers that share one [`OpTable`]:
//!
//! - [`SyncDriver`] recurses on the native stack and never suspends; an
//!   `await` on a promise that cannot settle immediately is an error
//! - [`AsyncDriver`] evaluates through boxed futures and suspends at `await`
//!
//! Both implement [`Evaluator`], which routes every operator through the
//! table. Node kinds with their own control flow (loops, `switch`, `try`,
//! calls into closures) are written once per driver; everything they have
//! in common lives in `shared`.
//!
//! # Closures
//!
//! A sandbox closure captures the [`Interp`] it was created by, so calling
//! it later (from a native callback, a promise reaction or another
//! execution) evaluates its body under the capabilities it was born with.

mod access;
mod async_driver;
mod call;
pub mod ops;
mod shared;
mod sync_driver;

use std::rc::Rc;

use jsbox_ir::{FunctionDef, Opcode};
use jsbox_parse::ParseOptions;

use crate::capabilities::Capabilities;
use crate::errors::EvalError;
use crate::prop::{Operand, Prop};
use crate::realm::Realm;
use crate::scope::Scope;
use crate::value::{Obj, Value};

pub use async_driver::AsyncDriver;
pub use ops::{OpArgs, OpHandler, OpTable};
pub use sync_driver::SyncDriver;

struct InterpState {
    realm: Rc<Realm>,
    caps: Capabilities,
    ops: OpTable,
    options: ParseOptions,
    global: Obj,
    root: Scope,
}

/// Shared handle to one execution context.
#[derive(Clone)]
pub struct Interp(Rc<InterpState>);

impl Interp {
    /// A fresh execution context with its own global object. Every global
    /// the capabilities allow becomes an own property of that object and a
    /// name the root scope resolves to it.
    pub fn new(realm: Rc<Realm>, caps: Capabilities, ops: OpTable, options: ParseOptions) -> Self {
        let global = realm.new_global();
        for (name, value) in caps.globals() {
            global.define(name, value.clone());
        }
        let root = Scope::root(&global, caps.globals().iter().map(|(name, _)| Rc::clone(name)));
        Interp(Rc::new(InterpState {
            realm,
            caps,
            ops,
            options,
            global,
            root,
        }))
    }

    pub fn realm(&self) -> &Rc<Realm> {
        &self.0.realm
    }

    pub fn caps(&self) -> &Capabilities {
        &self.0.caps
    }

    pub fn ops(&self) -> &OpTable {
        &self.0.ops
    }

    pub fn parse_options(&self) -> ParseOptions {
        self.0.options
    }

    /// The sandbox global object, top-level `this`.
    pub fn global(&self) -> &Obj {
        &self.0.global
    }

    pub fn root(&self) -> &Scope {
        &self.0.root
    }

    /// Count one evaluation step.
    #[inline]
    pub fn tick(&self) -> Result<(), EvalError> {
        self.0.caps.tick()
    }

    /// Resolve an identifier, recording whitelisted globals for audit.
    pub fn resolve(&self, scope: &Scope, name: &str) -> Prop {
        let prop = scope.get(name);
        if let Prop::Member { key, .. } = &prop {
            self.0.caps.record_global(key);
        }
        prop
    }

    pub fn ptr_eq(&self, other: &Interp) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Interp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interp")
            .field("caps", &self.0.caps)
            .field("options", &self.0.options)
            .finish_non_exhaustive()
    }
}

/// A function literal closed over its defining scope.
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub scope: Scope,
    pub interp: Interp,
    /// Unbound `this` resolves to the sandbox global object.
    pub global_this: bool,
}

impl Closure {
    pub fn name(&self) -> Option<&str> {
        self.def.name.as_deref()
    }
}

/// What both drivers share: routing operators through the table and
/// turning references into values.
pub trait Evaluator {
    fn interp(&self) -> &Interp;

    fn deref(&self, operand: Operand) -> Result<Value, EvalError> {
        self.interp().deref(operand)
    }

    /// Dispatch `op` through the interpreter's operator table.
    fn apply(&self, op: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
        let interp = self.interp();
        interp.ops().handler(op)(interp, op, args)
    }
}
