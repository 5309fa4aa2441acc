//! The blocking driver.
//!
//! Recurses on the native stack, guarded by `ensure_sufficient_stack`. Every
//! node evaluated costs one tick. `await` only accepts values that are
//! already settled (or settle when their task is polled once); anything else
//! is an error, since this driver has nowhere to suspend to.

use jsbox_ir::{LoopNode, Node, ObjectEntry, ObjectKey, Opcode, SwitchNode, TryNode};
use jsbox_stack::ensure_sufficient_stack;
use smallvec::SmallVec;

use super::shared::{self, LoopStep};
use super::{Evaluator, Interp, OpArgs};
use crate::errors::{illegal_await, syntax_error, thrown, type_error, ControlAction, EvalError};
use crate::prop::Operand;
use crate::scope::Scope;
use crate::value::Value;

type Flow<T> = Result<T, ControlAction>;

pub struct SyncDriver<'a> {
    interp: &'a Interp,
}

impl Evaluator for SyncDriver<'_> {
    fn interp(&self) -> &Interp {
        self.interp
    }
}

impl<'a> SyncDriver<'a> {
    pub fn new(interp: &'a Interp) -> Self {
        SyncDriver { interp }
    }

    /// Run a program body. Returns the completion value and whether it came
    /// from a top-level `return`.
    pub fn run_program(&self, body: &[Node], scope: &Scope) -> Result<(Value, bool), EvalError> {
        shared::program_result(self.statements(body, scope))
    }

    /// Run a function body in its prepared call scope.
    pub fn run_function(&self, body: &[Node], scope: &Scope) -> Result<Value, EvalError> {
        shared::function_result(self.statements(body, scope))
    }

    fn statements(&self, body: &[Node], scope: &Scope) -> Flow<Value> {
        let mut last = Value::Undefined;
        for node in body {
            let value = self.value(node, scope)?;
            if shared::has_completion(node) {
                last = value;
            }
        }
        Ok(last)
    }

    fn value(&self, node: &Node, scope: &Scope) -> Flow<Value> {
        let operand = self.eval(node, scope)?;
        Ok(self.deref(operand)?)
    }

    /// Evaluate `node` to an operand, leaving references unresolved.
    pub fn eval(&self, node: &Node, scope: &Scope) -> Flow<Operand> {
        ensure_sufficient_stack(|| self.eval_node(node, scope))
    }

    fn eval_node(&self, node: &Node, scope: &Scope) -> Flow<Operand> {
        self.interp.tick()?;
        if let Some(result) = shared::leaf(self.interp, node, scope) {
            return Ok(result?);
        }
        let operand = match node {
            Node::Template { quasis, parts } => {
                let values = parts
                    .iter()
                    .map(|part| self.value(part, scope))
                    .collect::<Flow<Vec<_>>>()?;
                shared::template(quasis, &values).into()
            }
            Node::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval(object, scope)?;
                if matches!(object, Operand::Optional) {
                    return Ok(Operand::Optional);
                }
                let object = self.deref(object)?;
                if *optional && object.is_nullish() {
                    return Ok(Operand::Optional);
                }
                let key = self.value(property, scope)?;
                let op = if *optional { Opcode::PropOptional } else { Opcode::Prop };
                self.apply(op, OpArgs::new(object, key))?
            }
            Node::Call {
                callee,
                args,
                optional,
            } => {
                let callee = self.eval(callee, scope)?;
                if matches!(callee, Operand::Optional) {
                    return Ok(Operand::Optional);
                }
                let function = self.deref(callee.clone())?;
                if *optional && function.is_nullish() {
                    return Ok(Operand::Optional);
                }
                let args = self.arguments(args, scope)?;
                let op = if *optional { Opcode::CallOptional } else { Opcode::Call };
                self.apply(op, OpArgs::new(callee, function).with_args(args))?
            }
            Node::New { callee, args } => {
                let ctor = self.value(callee, scope)?;
                let args = self.arguments(args, scope)?;
                self.apply(Opcode::New, OpArgs::new(Operand::undefined(), ctor).with_args(args))?
            }
            Node::Array(items) => {
                let values = self.arguments(items, scope)?;
                Value::Object(self.interp.realm().new_array(values.into_vec())).into()
            }
            Node::Object(entries) => self.object(entries, scope)?,
            Node::Spread(_) => return Err(syntax_error("Unexpected token '...'").into()),
            Node::Unary { op, operand } => {
                let operand = match op {
                    Opcode::Typeof | Opcode::Delete => self.eval(operand, scope)?,
                    _ => self.value(operand, scope)?.into(),
                };
                self.apply(*op, OpArgs::new(operand, Value::Undefined))?
            }
            Node::Update { op, target } => {
                let target = self.eval(target, scope)?;
                self.apply(*op, OpArgs::new(target, Value::Undefined))?
            }
            Node::Binary { op, left, right } => {
                let left = self.value(left, scope)?;
                let right = self.value(right, scope)?;
                self.apply(*op, OpArgs::new(left, right))?
            }
            Node::Logical { op, left, right } => {
                let left = self.value(left, scope)?;
                if shared::short_circuits(*op, &left) {
                    left.into()
                } else {
                    self.value(right, scope)?.into()
                }
            }
            Node::Assign { op, target, value } => {
                let target = self.eval(target, scope)?;
                let value = self.value(value, scope)?;
                self.apply(*op, OpArgs::new(target, value))?
            }
            Node::LogicalAssign { op, target, value } => {
                let Operand::Prop(prop) = self.eval(target, scope)? else {
                    return Err(type_error("Invalid left-hand side in assignment").into());
                };
                let current = self.interp.read(&prop)?;
                if shared::short_circuits(*op, &current) {
                    current.into()
                } else {
                    let value = self.value(value, scope)?;
                    self.interp.assign(&prop, value.clone())?;
                    value.into()
                }
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.value(test, scope)?.truthy() {
                    self.eval(consequent, scope)?
                } else {
                    self.eval(alternate, scope)?
                }
            }
            Node::Sequence(nodes) => {
                let mut last = Operand::undefined();
                for node in nodes {
                    last = self.value(node, scope)?.into();
                }
                last
            }
            Node::Declare { kind, name, value } => {
                let value = match value {
                    Some(node) => Some(self.value(node, scope)?),
                    None => None,
                };
                scope.declare(name, *kind, value)?;
                Operand::undefined()
            }
            Node::Return(value) => {
                let value = match value {
                    Some(node) => self.value(node, scope)?,
                    None => Value::Undefined,
                };
                return Err(ControlAction::Return(value));
            }
            Node::Throw(value) => {
                let value = self.value(value, scope)?;
                return Err(thrown(value).into());
            }
            Node::If {
                test,
                consequent,
                alternate,
            } => {
                if self.value(test, scope)?.truthy() {
                    self.value(consequent, scope)?.into()
                } else if let Some(alternate) = alternate {
                    self.value(alternate, scope)?.into()
                } else {
                    Operand::undefined()
                }
            }
            Node::Block(body) => self.statements(body, &scope.child())?.into(),
            Node::Loop(node) => self.run_loop(node, scope)?.into(),
            Node::LoopAction { action, label } => return Err(shared::jump(*action, label)),
            Node::Switch(node) => self.run_switch(node, scope)?.into(),
            Node::Try(node) => self.run_try(node, scope)?.into(),
            Node::Await(_) => return Err(illegal_await().into()),
            Node::Literal(_)
            | Node::Str(_)
            | Node::Regex(_)
            | Node::Ident(_)
            | Node::This
            | Node::Function(_)
            | Node::Empty => Operand::undefined(),
        };
        Ok(operand)
    }

    /// Evaluate an argument or element list, expanding spreads.
    fn arguments(&self, nodes: &[Node], scope: &Scope) -> Flow<SmallVec<[Value; 4]>> {
        let mut values = SmallVec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Spread(inner) => {
                    let value = self.value(inner, scope)?;
                    shared::spread_into(&value, &mut values)?;
                }
                _ => values.push(self.value(node, scope)?),
            }
        }
        Ok(values)
    }

    fn object(&self, entries: &[ObjectEntry], scope: &Scope) -> Flow<Operand> {
        let obj = self.interp.realm().new_object();
        for entry in entries {
            match entry {
                ObjectEntry::Property(key, value) => {
                    let key = match key {
                        ObjectKey::Static(key) => key.clone(),
                        ObjectKey::Computed(node) => self.value(node, scope)?.to_property_key(),
                    };
                    let value = self.value(value, scope)?;
                    obj.set(&key, value)?;
                }
                ObjectEntry::Spread(node) => {
                    let value = self.value(node, scope)?;
                    shared::spread_object(&obj, &value)?;
                }
            }
        }
        Ok(Value::Object(obj).into())
    }

    fn run_loop(&self, node: &LoopNode, scope: &Scope) -> Flow<Value> {
        let loop_scope = scope.child();
        for init in &node.init {
            self.value(init, &loop_scope)?;
        }
        let values = match &node.iterable {
            Some(iterable) => {
                let source = self.value(iterable, &loop_scope)?;
                shared::loop_values(node.iteration, &source)?
            }
            None => None,
        };

        let mut last = Value::Undefined;
        let mut iteration = loop_scope.fork();
        let mut index = 0;
        loop {
            self.interp.tick()?;
            let body_scope = iteration.child();
            if let Some(values) = &values {
                let Some(value) = values.get(index) else {
                    break;
                };
                index += 1;
                if let Some(binding) = &node.binding {
                    shared::bind_loop_value(self.interp, binding, &body_scope, value.clone())?;
                }
            }
            if node.check_first && !self.condition(node, &iteration)? {
                break;
            }
            let outcome = self.statements(&node.body, &body_scope.child());
            match shared::loop_step(outcome, node.label.as_ref(), &mut last) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Abrupt(action) => return Err(action),
            }
            // Closures from this pass keep their copy; the step updates the next.
            let next = iteration.fork();
            if let Some(step) = &node.step {
                self.value(step, &next)?;
            }
            if !node.check_first && !self.condition(node, &next)? {
                break;
            }
            iteration = next;
        }
        Ok(last)
    }

    fn condition(&self, node: &LoopNode, scope: &Scope) -> Flow<bool> {
        match &node.condition {
            Some(condition) => Ok(self.value(condition, scope)?.truthy()),
            None => Ok(true),
        }
    }

    fn run_switch(&self, node: &SwitchNode, scope: &Scope) -> Flow<Value> {
        let discriminant = self.value(&node.discriminant, scope)?;
        let scope = scope.child();
        let mut start = None;
        for (index, case) in node.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.value(test, &scope)?.strict_equals(&discriminant) {
                    start = Some(index);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| node.cases.iter().position(|c| c.test.is_none())) else {
            return Ok(Value::Undefined);
        };

        let mut last = Value::Undefined;
        for case in &node.cases[start..] {
            match self.statements(&case.body, &scope) {
                Ok(value) => last = value,
                Err(action) if shared::breaks_switch(&action, node.label.as_ref()) => break,
                Err(action) => return Err(action),
            }
        }
        Ok(last)
    }

    fn run_try(&self, node: &TryNode, scope: &Scope) -> Flow<Value> {
        let mut outcome = self.statements(&node.block, &scope.child());
        let handler = match (shared::catches(&outcome), &node.handler) {
            (Some(err), Some(handler)) => Some((
                handler,
                shared::catch_scope(self.interp, scope, node.param.as_ref(), err)?,
            )),
            _ => None,
        };
        if let Some((handler, catch_scope)) = handler {
            outcome = self.statements(handler, &catch_scope);
        }
        if let Some(finalizer) = &node.finalizer {
            if shared::is_fatal(&outcome) {
                return outcome;
            }
            self.statements(finalizer, &scope.child())?;
        }
        outcome
    }
}
