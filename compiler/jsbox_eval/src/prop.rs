//! Deferred references.
//!
//! Reading and assigning share one representation: an operand that names a
//! storage location evaluates to a [`Prop`], which readers dereference and
//! writers use as the mutation target after the capability checks have run.

use std::rc::Rc;

use bitflags::bitflags;

use crate::scope::Scope;
use crate::value::Value;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PropFlags: u8 {
        /// A `const` binding.
        const CONST = 1;
        /// A whitelisted global, or a member of an object the sandbox may
        /// read but never modify.
        const GLOBAL = 1 << 1;
        /// Reached through a variable name rather than a member expression.
        const VARIABLE = 1 << 2;
    }
}

/// A storage location.
#[derive(Clone, Debug)]
pub enum Prop {
    /// A name no scope declares.
    Unresolved(Rc<str>),
    /// A scope binding.
    Binding {
        scope: Scope,
        key: Rc<str>,
        flags: PropFlags,
    },
    /// A property of an object or primitive.
    Member {
        object: Value,
        key: Rc<str>,
        flags: PropFlags,
    },
}

impl Prop {
    pub fn key(&self) -> &Rc<str> {
        match self {
            Prop::Unresolved(key) | Prop::Binding { key, .. } | Prop::Member { key, .. } => key,
        }
    }

    pub fn flags(&self) -> PropFlags {
        match self {
            Prop::Unresolved(_) => PropFlags::VARIABLE,
            Prop::Binding { flags, .. } | Prop::Member { flags, .. } => *flags,
        }
    }

    /// The receiver a call through this reference uses as `this`.
    pub fn receiver(&self) -> Value {
        match self {
            Prop::Member { object, flags, .. } if !flags.contains(PropFlags::VARIABLE) => {
                object.clone()
            }
            _ => Value::Undefined,
        }
    }
}

/// Result of evaluating one node.
#[derive(Clone, Debug)]
pub enum Operand {
    Value(Value),
    Prop(Prop),
    /// An optional chain that short-circuited on `null`/`undefined`.
    Optional,
}

impl Operand {
    pub fn undefined() -> Self {
        Operand::Value(Value::Undefined)
    }
}

impl Default for Operand {
    fn default() -> Self {
        Operand::undefined()
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<Prop> for Operand {
    fn from(prop: Prop) -> Self {
        Operand::Prop(prop)
    }
}
