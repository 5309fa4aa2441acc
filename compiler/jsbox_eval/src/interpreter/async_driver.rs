//! The suspending driver.
//!
//! Mirrors [`SyncDriver`](super::SyncDriver) node for node, with every
//! child evaluation a boxed future so that `await` can suspend anywhere in
//! the tree, including inside loops, `switch` and `try`. Apart from
//! `await`, both drivers produce the same results and the same sequence of
//! capability checks, ticks and subscription callbacks.
//!
//! Futures produced here are `!Send`; run them on a current-thread
//! executor.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use jsbox_ir::{LoopNode, Node, ObjectEntry, ObjectKey, Opcode, SwitchNode, TryNode};
use jsbox_stack::ensure_sufficient_stack;
use smallvec::SmallVec;

use super::shared::{self, LoopStep};
use super::{Evaluator, Interp, OpArgs};
use crate::errors::{syntax_error, thrown, type_error, ControlAction, EvalError};
use crate::prop::Operand;
use crate::scope::Scope;
use crate::value::promise::PromiseFuture;
use crate::value::Value;

type Flow<T> = Result<T, ControlAction>;
type Step<'a> = Pin<Box<dyn Future<Output = Flow<Operand>> + 'a>>;

/// Polls a nested evaluation with enough native stack left for it.
struct Guarded<'a>(Step<'a>);

impl Future for Guarded<'_> {
    type Output = Flow<Operand>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let step = &mut self.get_mut().0;
        ensure_sufficient_stack(|| step.as_mut().poll(cx))
    }
}

pub struct AsyncDriver {
    interp: Interp,
}

impl Evaluator for AsyncDriver {
    fn interp(&self) -> &Interp {
        &self.interp
    }
}

impl AsyncDriver {
    pub fn new(interp: Interp) -> Self {
        AsyncDriver { interp }
    }

    /// Run a program body to completion, suspending at each `await` on a
    /// pending promise.
    pub async fn run_program(&self, body: &[Node], scope: &Scope) -> Result<(Value, bool), EvalError> {
        shared::program_result(self.statements(body, scope).await)
    }

    pub async fn run_function(&self, body: &[Node], scope: &Scope) -> Result<Value, EvalError> {
        shared::function_result(self.statements(body, scope).await)
    }

    async fn statements(&self, body: &[Node], scope: &Scope) -> Flow<Value> {
        let mut last = Value::Undefined;
        for node in body {
            let value = self.value(node, scope).await?;
            if shared::has_completion(node) {
                last = value;
            }
        }
        Ok(last)
    }

    async fn value(&self, node: &Node, scope: &Scope) -> Flow<Value> {
        let operand = self.eval(node, scope).await?;
        Ok(self.deref(operand)?)
    }

    /// Evaluate `node` to an operand, leaving references unresolved.
    fn eval<'a>(&'a self, node: &'a Node, scope: &'a Scope) -> Guarded<'a> {
        Guarded(Box::pin(self.eval_node(node, scope)))
    }

    async fn eval_node(&self, node: &Node, scope: &Scope) -> Flow<Operand> {
        let interp = &self.interp;
        interp.tick()?;
        if let Some(result) = shared::leaf(interp, node, scope) {
            return Ok(result?);
        }
        let operand = match node {
            Node::Template { quasis, parts } => {
                let mut values = Vec::with_capacity(parts.len());
                for part in parts {
                    values.push(self.value(part, scope).await?);
                }
                shared::template(quasis, &values).into()
            }
            Node::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval(object, scope).await?;
                if matches!(object, Operand::Optional) {
                    return Ok(Operand::Optional);
                }
                let object = self.deref(object)?;
                if *optional && object.is_nullish() {
                    return Ok(Operand::Optional);
                }
                let key = self.value(property, scope).await?;
                let op = if *optional { Opcode::PropOptional } else { Opcode::Prop };
                self.apply(op, OpArgs::new(object, key))?
            }
            Node::Call {
                callee,
                args,
                optional,
            } => {
                let callee = self.eval(callee, scope).await?;
                if matches!(callee, Operand::Optional) {
                    return Ok(Operand::Optional);
                }
                let function = self.deref(callee.clone())?;
                if *optional && function.is_nullish() {
                    return Ok(Operand::Optional);
                }
                let args = self.arguments(args, scope).await?;
                let op = if *optional { Opcode::CallOptional } else { Opcode::Call };
                self.apply(op, OpArgs::new(callee, function).with_args(args))?
            }
            Node::New { callee, args } => {
                let ctor = self.value(callee, scope).await?;
                let args = self.arguments(args, scope).await?;
                self.apply(Opcode::New, OpArgs::new(Operand::undefined(), ctor).with_args(args))?
            }
            Node::Array(items) => {
                let values = self.arguments(items, scope).await?;
                Value::Object(interp.realm().new_array(values.into_vec())).into()
            }
            Node::Object(entries) => self.object(entries, scope).await?,
            Node::Spread(_) => return Err(syntax_error("Unexpected token '...'").into()),
            Node::Unary { op, operand } => {
                let operand = match op {
                    Opcode::Typeof | Opcode::Delete => self.eval(operand, scope).await?,
                    _ => self.value(operand, scope).await?.into(),
                };
                self.apply(*op, OpArgs::new(operand, Value::Undefined))?
            }
            Node::Update { op, target } => {
                let target = self.eval(target, scope).await?;
                self.apply(*op, OpArgs::new(target, Value::Undefined))?
            }
            Node::Binary { op, left, right } => {
                let left = self.value(left, scope).await?;
                let right = self.value(right, scope).await?;
                self.apply(*op, OpArgs::new(left, right))?
            }
            Node::Logical { op, left, right } => {
                let left = self.value(left, scope).await?;
                if shared::short_circuits(*op, &left) {
                    left.into()
                } else {
                    self.value(right, scope).await?.into()
                }
            }
            Node::Assign { op, target, value } => {
                let target = self.eval(target, scope).await?;
                let value = self.value(value, scope).await?;
                self.apply(*op, OpArgs::new(target, value))?
            }
            Node::LogicalAssign { op, target, value } => {
                let Operand::Prop(prop) = self.eval(target, scope).await? else {
                    return Err(type_error("Invalid left-hand side in assignment").into());
                };
                let current = interp.read(&prop)?;
                if shared::short_circuits(*op, &current) {
                    current.into()
                } else {
                    let value = self.value(value, scope).await?;
                    interp.assign(&prop, value.clone())?;
                    value.into()
                }
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.value(test, scope).await?.truthy() {
                    self.eval(consequent, scope).await?
                } else {
                    self.eval(alternate, scope).await?
                }
            }
            Node::Sequence(nodes) => {
                let mut last = Operand::undefined();
                for node in nodes {
                    last = self.value(node, scope).await?.into();
                }
                last
            }
            Node::Declare { kind, name, value } => {
                let value = match value {
                    Some(node) => Some(self.value(node, scope).await?),
                    None => None,
                };
                scope.declare(name, *kind, value)?;
                Operand::undefined()
            }
            Node::Return(value) => {
                let value = match value {
                    Some(node) => self.value(node, scope).await?,
                    None => Value::Undefined,
                };
                return Err(ControlAction::Return(value));
            }
            Node::Throw(value) => {
                let value = self.value(value, scope).await?;
                return Err(thrown(value).into());
            }
            Node::If {
                test,
                consequent,
                alternate,
            } => {
                if self.value(test, scope).await?.truthy() {
                    self.value(consequent, scope).await?.into()
                } else if let Some(alternate) = alternate {
                    self.value(alternate, scope).await?.into()
                } else {
                    Operand::undefined()
                }
            }
            Node::Block(body) => self.statements(body, &scope.child()).await?.into(),
            Node::Loop(node) => self.run_loop(node, scope).await?.into(),
            Node::LoopAction { action, label } => return Err(shared::jump(*action, label)),
            Node::Switch(node) => self.run_switch(node, scope).await?.into(),
            Node::Try(node) => self.run_try(node, scope).await?.into(),
            Node::Await(value) => match self.value(value, scope).await? {
                Value::Object(obj) if obj.promise().is_some() => {
                    PromiseFuture::new(obj).await?.into()
                }
                other => other.into(),
            },
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

    async fn arguments(&self, nodes: &[Node], scope: &Scope) -> Flow<SmallVec<[Value; 4]>> {
        let mut values = SmallVec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Spread(inner) => {
                    let value = self.value(inner, scope).await?;
                    shared::spread_into(&value, &mut values)?;
                }
                _ => values.push(self.value(node, scope).await?),
            }
        }
        Ok(values)
    }

    async fn object(&self, entries: &[ObjectEntry], scope: &Scope) -> Flow<Operand> {
        let obj = self.interp.realm().new_object();
        for entry in entries {
            match entry {
                ObjectEntry::Property(key, value) => {
                    let key = match key {
                        ObjectKey::Static(key) => key.clone(),
                        ObjectKey::Computed(node) => {
                            self.value(node, scope).await?.to_property_key()
                        }
                    };
                    let value = self.value(value, scope).await?;
                    obj.set(&key, value)?;
                }
                ObjectEntry::Spread(node) => {
                    let value = self.value(node, scope).await?;
                    shared::spread_object(&obj, &value)?;
                }
            }
        }
        Ok(Value::Object(obj).into())
    }

    async fn run_loop(&self, node: &LoopNode, scope: &Scope) -> Flow<Value> {
        let loop_scope = scope.child();
        for init in &node.init {
            self.value(init, &loop_scope).await?;
        }
        let values = match &node.iterable {
            Some(iterable) => {
                let source = self.value(iterable, &loop_scope).await?;
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
                    shared::bind_loop_value(&self.interp, binding, &body_scope, value.clone())?;
                }
            }
            if node.check_first && !self.condition(node, &iteration).await? {
                break;
            }
            let outcome = self.statements(&node.body, &body_scope.child()).await;
            match shared::loop_step(outcome, node.label.as_ref(), &mut last) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Abrupt(action) => return Err(action),
            }
            let next = iteration.fork();
            if let Some(step) = &node.step {
                self.value(step, &next).await?;
            }
            if !node.check_first && !self.condition(node, &next).await? {
                break;
            }
            iteration = next;
        }
        Ok(last)
    }

    async fn condition(&self, node: &LoopNode, scope: &Scope) -> Flow<bool> {
        match &node.condition {
            Some(condition) => Ok(self.value(condition, scope).await?.truthy()),
            None => Ok(true),
        }
    }

    async fn run_switch(&self, node: &SwitchNode, scope: &Scope) -> Flow<Value> {
        let discriminant = self.value(&node.discriminant, scope).await?;
        let scope = scope.child();
        let mut start = None;
        for (index, case) in node.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.value(test, &scope).await?.strict_equals(&discriminant) {
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
            match self.statements(&case.body, &scope).await {
                Ok(value) => last = value,
                Err(action) if shared::breaks_switch(&action, node.label.as_ref()) => break,
                Err(action) => return Err(action),
            }
        }
        Ok(last)
    }

    async fn run_try(&self, node: &TryNode, scope: &Scope) -> Flow<Value> {
        let mut outcome = self.statements(&node.block, &scope.child()).await;
        let handler = match (shared::catches(&outcome), &node.handler) {
            (Some(err), Some(handler)) => Some((
                handler,
                shared::catch_scope(&self.interp, scope, node.param.as_ref(), err)?,
            )),
            _ => None,
        };
        if let Some((handler, catch_scope)) = handler {
            outcome = self.statements(handler, &catch_scope).await;
        }
        if let Some(finalizer) = &node.finalizer {
            if shared::is_fatal(&outcome) {
                return outcome;
            }
            self.statements(finalizer, &scope.child()).await?;
        }
        outcome
    }
}
