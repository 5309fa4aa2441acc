//! Evaluation steps both drivers perform identically.
//!
//! Anything here runs to completion without evaluating a child node, so it
//! is safe to call from either driver.

use std::rc::Rc;

use jsbox_ir::{
    DeclKind, FunctionDef, FunctionKind, Literal, LogicalOp, LoopAction, LoopBinding,
    LoopIteration, Node,
};

use super::Interp;
use crate::builtins;
use crate::errors::{not_iterable, ControlAction, EvalError};
use crate::prop::Operand;
use crate::scope::Scope;
use crate::value::{Obj, Value};

/// Evaluate a node that has no children to evaluate. `None` for every
/// other node.
pub(super) fn leaf(interp: &Interp, node: &Node, scope: &Scope) -> Option<Result<Operand, EvalError>> {
    let value = match node {
        Node::Literal(literal) => literal_value(literal),
        Node::Str(s) => Value::String(Rc::clone(s)),
        Node::Regex(regex) => {
            return Some(
                builtins::new_regexp(interp.realm(), &regex.pattern, &regex.flags)
                    .map(|obj| Value::Object(obj).into()),
            )
        }
        Node::Ident(name) => return Some(Ok(Operand::Prop(interp.resolve(scope, name)))),
        Node::This => scope.this_value(),
        Node::Function(def) => return Some(function(interp, def, scope)),
        Node::Empty => Value::Undefined,
        _ => return None,
    };
    Some(Ok(value.into()))
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
    }
}

/// A function literal. Declarations bind their name in `scope`.
fn function(interp: &Interp, def: &Rc<FunctionDef>, scope: &Scope) -> Result<Operand, EvalError> {
    let value = interp.create_function(def, scope, false)?;
    if def.kind == FunctionKind::Declaration {
        if let Some(name) = &def.name {
            scope.declare_function(name, value)?;
            return Ok(Operand::undefined());
        }
    }
    Ok(value.into())
}

/// Whether a statement's value becomes the completion value of its list.
pub(super) fn has_completion(node: &Node) -> bool {
    match node {
        Node::Declare { .. } | Node::Empty => false,
        Node::Function(def) => def.kind != FunctionKind::Declaration,
        _ => true,
    }
}

/// Whether a logical operator returns its left operand without evaluating
/// the right one.
pub(super) fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.truthy(),
        LogicalOp::Or => left.truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

/// Join template quasis with the interpolated values.
pub(super) fn template(quasis: &[Rc<str>], values: &[Value]) -> Value {
    let mut out = String::new();
    for (index, quasi) in quasis.iter().enumerate() {
        out.push_str(quasi);
        if let Some(value) = values.get(index) {
            out.push_str(&value.to_js_string());
        }
    }
    Value::from(out)
}

/// Expand `...value` into `out`.
pub(super) fn spread_into(value: &Value, out: &mut impl Extend<Value>) -> Result<(), EvalError> {
    match value {
        Value::Object(obj) => match obj.array_items() {
            Some(items) => {
                out.extend(items);
                Ok(())
            }
            None => Err(not_iterable("object")),
        },
        Value::String(s) => {
            out.extend(s.chars().map(|ch| Value::from(ch.to_string())));
            Ok(())
        }
        other => Err(not_iterable(&other.to_js_string())),
    }
}

/// Copy the own enumerable properties of `source` into `target`.
pub(super) fn spread_object(target: &Obj, source: &Value) -> Result<(), EvalError> {
    match source {
        Value::Object(obj) => {
            for key in obj.own_keys() {
                let value = obj.get_own(&key).unwrap_or_default();
                target.set(&key, value)?;
            }
        }
        Value::String(s) => {
            for (index, ch) in s.chars().enumerate() {
                target.set(&index.to_string(), ch.to_string())?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// The values a `for..of` or `for..in` loop visits, taken once before the
/// first iteration. `None` for counted loops.
pub(super) fn loop_values(iteration: LoopIteration, source: &Value) -> Result<Option<Vec<Value>>, EvalError> {
    match iteration {
        LoopIteration::Counted => Ok(None),
        LoopIteration::ForOf => {
            let mut values = Vec::new();
            spread_into(source, &mut values)?;
            Ok(Some(values))
        }
        LoopIteration::ForIn => Ok(Some(match source {
            Value::Object(obj) => obj.own_keys().into_iter().map(Value::String).collect(),
            Value::String(s) => (0..s.chars().count()).map(|i| Value::from(i.to_string())).collect(),
            _ => Vec::new(),
        })),
    }
}

/// Bind one loop value. Declarations go into the iteration's own scope;
/// a bare name assigns to the existing binding.
pub(super) fn bind_loop_value(
    interp: &Interp,
    binding: &LoopBinding,
    scope: &Scope,
    value: Value,
) -> Result<(), EvalError> {
    match binding.kind {
        Some(kind) => scope.declare(&binding.name, kind, Some(value)),
        None => interp.assign(&interp.resolve(scope, &binding.name), value),
    }
}

/// `break` / `continue` as a control action.
pub(super) fn jump(action: LoopAction, label: &Option<Rc<str>>) -> ControlAction {
    match action {
        LoopAction::Break => ControlAction::Break(label.clone()),
        LoopAction::Continue => ControlAction::Continue(label.clone()),
    }
}

/// What a loop does after its body ran.
pub(super) enum LoopStep {
    Next,
    Exit,
    Abrupt(ControlAction),
}

/// Classify the outcome of one loop body run, keeping its value as the
/// loop's completion value.
pub(super) fn loop_step(
    outcome: Result<Value, ControlAction>,
    label: Option<&Rc<str>>,
    last: &mut Value,
) -> LoopStep {
    let targets_loop = |target: &Option<Rc<str>>| match target {
        None => true,
        Some(target) => label.is_some_and(|label| label == target),
    };
    match outcome {
        Ok(value) => {
            *last = value;
            LoopStep::Next
        }
        Err(ControlAction::Break(target)) if targets_loop(&target) => LoopStep::Exit,
        Err(ControlAction::Continue(target)) if targets_loop(&target) => LoopStep::Next,
        Err(other) => LoopStep::Abrupt(other),
    }
}

/// Whether a `break` leaving a `switch` body ends the `switch`.
pub(super) fn breaks_switch(action: &ControlAction, label: Option<&Rc<str>>) -> bool {
    match action {
        ControlAction::Break(None) => true,
        ControlAction::Break(Some(target)) => label.is_some_and(|label| label == target),
        _ => false,
    }
}

/// The scope a `catch` block runs in, with the error bound.
pub(super) fn catch_scope(
    interp: &Interp,
    scope: &Scope,
    param: Option<&Rc<str>>,
    err: &EvalError,
) -> Result<Scope, EvalError> {
    let catch_scope = scope.child();
    if let Some(param) = param {
        catch_scope.declare(param, DeclKind::Let, Some(interp.error_value(err)))?;
    }
    Ok(catch_scope)
}

/// Whether `err` may be handled by a sandbox `catch` clause.
pub(super) fn catches(outcome: &Result<Value, ControlAction>) -> Option<&EvalError> {
    match outcome {
        Err(ControlAction::Error(err)) if err.is_catchable() => Some(err),
        _ => None,
    }
}

/// Outcomes a `finally` block may not replace.
pub(super) fn is_fatal(outcome: &Result<Value, ControlAction>) -> bool {
    matches!(outcome, Err(ControlAction::Error(err)) if !err.is_catchable())
}

/// Turn the outcome of a function body into the call's result.
pub(super) fn function_result(outcome: Result<Value, ControlAction>) -> Result<Value, EvalError> {
    match outcome {
        Ok(_) => Ok(Value::Undefined),
        Err(action) => action.into_error(),
    }
}

/// Turn the outcome of a program into `(value, returned)`.
pub(super) fn program_result(outcome: Result<Value, ControlAction>) -> Result<(Value, bool), EvalError> {
    match outcome {
        Ok(value) => Ok((value, false)),
        Err(ControlAction::Return(value)) => Ok((value, true)),
        Err(action) => action.into_error().map(|value| (value, false)),
    }
}
