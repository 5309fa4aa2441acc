//! The operator table.
//!
//! One handler per [`Opcode`], shared by both drivers. Drivers evaluate the
//! operands (keeping references unresolved where the operator needs a
//! storage location) and hand them over in [`OpArgs`]; handlers never
//! evaluate nodes themselves, so no handler can suspend.
//!
//! The standard table is built once per process. Extension and testing go
//! through [`OpTable::with_handler`], which returns a modified copy.

use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

use jsbox_ir::Opcode;
use smallvec::SmallVec;

use super::Interp;
use crate::errors::{not_a_function, type_error, EvalError};
use crate::operators;
use crate::prop::{Operand, Prop};
use crate::value::Value;

/// Operands of one operator application.
///
/// - binary operators: `left` is the left value, `right` the right value
/// - unary, update and `delete`: `left` is the operand, unresolved for
///   `typeof`, `delete` and updates
/// - assignments: `left` is the target reference, `right` the new value
/// - member access: `left` is the object, `right` the property key
/// - calls: `left` is the callee reference, `right` its value, `args` the
///   spread argument list
/// - `new`: `right` is the constructor, `args` the argument list
#[derive(Clone, Debug, Default)]
pub struct OpArgs {
    pub left: Operand,
    pub right: Value,
    pub args: SmallVec<[Value; 4]>,
}

impl OpArgs {
    pub fn new(left: impl Into<Operand>, right: Value) -> Self {
        OpArgs {
            left: left.into(),
            right,
            args: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: SmallVec<[Value; 4]>) -> Self {
        self.args = args;
        self
    }
}

pub type OpHandler = fn(&Interp, Opcode, OpArgs) -> Result<Operand, EvalError>;

/// Handlers indexed by [`Opcode::index`].
#[derive(Clone)]
pub struct OpTable {
    handlers: [OpHandler; Opcode::COUNT],
}

impl OpTable {
    /// The table every execution uses unless told otherwise.
    pub fn standard() -> &'static OpTable {
        static STANDARD: OnceLock<OpTable> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut handlers = [binary as OpHandler; Opcode::COUNT];
            for op in Opcode::ALL {
                handlers[op.index()] = standard_handler(op);
            }
            OpTable { handlers }
        })
    }

    /// A copy of this table with `op` handled by `handler`.
    #[must_use]
    pub fn with_handler(&self, op: Opcode, handler: OpHandler) -> OpTable {
        let mut table = self.clone();
        table.handlers[op.index()] = handler;
        table
    }

    #[inline]
    pub fn handler(&self, op: Opcode) -> OpHandler {
        self.handlers[op.index()]
    }
}

impl Default for OpTable {
    fn default() -> Self {
        OpTable::standard().clone()
    }
}

impl fmt::Debug for OpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpTable")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

fn standard_handler(op: Opcode) -> OpHandler {
    match op {
        Opcode::In => in_operator,
        Opcode::InstanceOf => instance_of,
        Opcode::Not | Opcode::BitNot | Opcode::Neg | Opcode::Plus | Opcode::Void => unary,
        Opcode::Typeof => type_of,
        Opcode::Delete => delete,
        Opcode::PreInc | Opcode::PreDec | Opcode::PostInc | Opcode::PostDec => update,
        Opcode::Prop | Opcode::PropOptional => member,
        Opcode::Call | Opcode::CallOptional => call,
        Opcode::New => construct,
        op if op == Opcode::Assign || op.compound_base().is_some() => assign,
        _ => binary,
    }
}

fn binary(_: &Interp, op: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    let Operand::Value(left) = args.left else {
        return Err(type_error(format!("'{op}' expects a value operand")));
    };
    operators::binary(op, &left, &args.right).map(Operand::Value)
}

fn in_operator(_: &Interp, _: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    let key = value_of(args.left).to_property_key();
    match &args.right {
        Value::Object(obj) => Ok(Value::Bool(obj.lookup(&key).is_some()).into()),
        other => Err(type_error(format!(
            "Cannot use 'in' operator to search for '{key}' in {}",
            other.to_js_string()
        ))),
    }
}

fn instance_of(_: &Interp, _: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    let Value::Object(ctor) = &args.right else {
        return Err(type_error("Right-hand side of 'instanceof' is not callable"));
    };
    if !ctor.is_callable() {
        return Err(type_error("Right-hand side of 'instanceof' is not callable"));
    }
    let result = match (value_of(args.left), ctor.get("prototype")) {
        (Value::Object(obj), Value::Object(proto)) => obj.inherits_from(&proto),
        _ => false,
    };
    Ok(Value::Bool(result).into())
}

fn unary(_: &Interp, op: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    operators::unary(op, &value_of(args.left)).map(Operand::Value)
}

fn type_of(interp: &Interp, _: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    if matches!(args.left, Operand::Prop(Prop::Unresolved(_))) {
        return Ok(Value::from("undefined").into());
    }
    let value = interp.deref(args.left)?;
    Ok(Value::from(value.type_of()).into())
}

fn delete(interp: &Interp, _: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    match &args.left {
        Operand::Prop(prop) => Ok(Value::Bool(interp.delete(prop)?).into()),
        _ => Ok(Value::Bool(true).into()),
    }
}

fn update(interp: &Interp, op: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    let Operand::Prop(prop) = args.left else {
        return Err(invalid_target());
    };
    let old = interp.read(&prop)?.to_number();
    let new = match op {
        Opcode::PreInc | Opcode::PostInc => old + 1.0,
        _ => old - 1.0,
    };
    interp.assign(&prop, Value::Number(new))?;
    let result = match op {
        Opcode::PostInc | Opcode::PostDec => old,
        _ => new,
    };
    Ok(Value::Number(result).into())
}

fn assign(interp: &Interp, op: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    let Operand::Prop(prop) = args.left else {
        return Err(invalid_target());
    };
    let value = match op.compound_base() {
        Some(base) => operators::binary(base, &interp.read(&prop)?, &args.right)?,
        None => args.right,
    };
    interp.assign(&prop, value.clone())?;
    Ok(value.into())
}

fn member(interp: &Interp, op: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    let object = value_of(args.left);
    if op == Opcode::PropOptional && object.is_nullish() {
        return Ok(Operand::Optional);
    }
    let key = args.right.to_property_key();
    interp.member(object, key).map(Operand::Prop)
}

fn call(interp: &Interp, op: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    let callee = args.right;
    if op == Opcode::CallOptional && callee.is_nullish() {
        return Ok(Operand::Optional);
    }
    let this = match &args.left {
        Operand::Prop(prop) => {
            if !callee.is_callable() {
                return Err(not_a_function(&callee_name(prop)));
            }
            prop.receiver()
        }
        _ => Value::Undefined,
    };
    interp.call(&callee, this, &args.args).map(Operand::Value)
}

fn construct(interp: &Interp, _: Opcode, args: OpArgs) -> Result<Operand, EvalError> {
    interp.construct(&args.right, &args.args).map(Operand::Value)
}

/// `obj.key` / `name`, as the callee appears in error messages.
fn callee_name(prop: &Prop) -> Rc<str> {
    match prop {
        Prop::Member { object: Value::Object(obj), key, .. } if obj.is_array() => {
            format!("array.{key}").into()
        }
        Prop::Member { key, .. } | Prop::Binding { key, .. } | Prop::Unresolved(key) => {
            Rc::clone(key)
        }
    }
}

fn value_of(operand: Operand) -> Value {
    match operand {
        Operand::Value(value) => value,
        Operand::Prop(_) | Operand::Optional => Value::Undefined,
    }
}

#[cold]
fn invalid_target() -> EvalError {
    type_error("Invalid left-hand side in assignment")
}
