//! Heap objects.
//!
//! An [`Obj`] is a shared, identity-compared handle. Own properties keep
//! insertion order, with integer-like keys enumerated first in ascending
//! order. Arrays store their elements densely and expose `length` and index
//! keys as virtual own properties.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use super::promise::PromiseCell;
use super::{Value, MAX_ARRAY_LENGTH};
use crate::errors::{invalid_array_length, EvalResult};
use crate::interpreter::{Closure, Interp};

/// Identity of an object, stable for as long as the object is alive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(usize);

/// Arguments handed to a native function.
pub struct Args<'a> {
    pub this: Value,
    pub values: &'a [Value],
    /// Called through `new`.
    pub construct: bool,
}

impl<'a> Args<'a> {
    pub fn new(this: Value, values: &'a [Value]) -> Self {
        Args {
            this,
            values,
            construct: false,
        }
    }

    /// Argument `index`, or `undefined` when absent.
    pub fn get(&self, index: usize) -> Value {
        self.values.get(index).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arguments from `index` on.
    pub fn rest(&self, index: usize) -> &'a [Value] {
        self.values.get(index..).unwrap_or_default()
    }
}

/// Host-implemented function body.
pub type NativeFn = Rc<dyn Fn(&Interp, &Args<'_>) -> EvalResult>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: Rc<str>,
    pub func: NativeFn,
    /// Accepts `new`.
    pub constructor: bool,
}

/// `fn.bind(this, ...args)`.
pub struct BoundFunction {
    pub target: Obj,
    pub this: Value,
    pub args: Vec<Value>,
}

/// Something that can be called.
#[derive(Clone)]
pub enum Callable {
    /// A function literal evaluated inside the sandbox.
    Sandbox(Rc<Closure>),
    Native(NativeFunction),
    Bound(Rc<BoundFunction>),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Sandbox(closure) => write!(f, "Sandbox({:?})", closure.name()),
            Callable::Native(native) => write!(f, "Native({})", native.name),
            Callable::Bound(_) => f.write_str("Bound"),
        }
    }
}

/// A compiled regular expression with its source text.
#[derive(Debug)]
pub struct RegExpData {
    pub source: Rc<str>,
    pub flags: Rc<str>,
    pub regex: regex::Regex,
}

impl RegExpData {
    pub fn global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn sticky(&self) -> bool {
        self.flags.contains('y')
    }
}

#[derive(Debug)]
pub enum ObjectKind {
    Ordinary,
    Array(Vec<Value>),
    Function(Callable),
    Error,
    RegExp(Rc<RegExpData>),
    Promise(PromiseCell),
    /// `new String(..)`, `new Number(..)`, `new Boolean(..)`.
    Boxed(Value),
    /// The synthetic global object a sandbox sees as top-level `this`.
    Global,
}

pub struct ObjectData {
    pub kind: ObjectKind,
    pub proto: Option<Obj>,
    pub frozen: bool,
    keys: Vec<Rc<str>>,
    values: FxHashMap<Rc<str>, Value>,
}

impl ObjectData {
    pub fn new(kind: ObjectKind, proto: Option<Obj>) -> Self {
        ObjectData {
            kind,
            proto,
            frozen: false,
            keys: Vec::new(),
            values: FxHashMap::default(),
        }
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        match &self.kind {
            ObjectKind::Array(items) => {
                if key == "length" {
                    return Some(Value::Number(items.len() as f64));
                }
                if let Some(index) = array_index(key) {
                    return items.get(index).cloned();
                }
            }
            ObjectKind::Boxed(Value::String(s)) => {
                if key == "length" {
                    return Some(Value::Number(s.chars().count() as f64));
                }
                if let Some(index) = array_index(key) {
                    return s.chars().nth(index).map(|c| Value::from(c.to_string()));
                }
            }
            _ => {}
        }
        self.values.get(key).cloned()
    }

    pub fn has_own(&self, key: &str) -> bool {
        match &self.kind {
            ObjectKind::Array(items) => {
                if key == "length" || array_index(key).is_some_and(|i| i < items.len()) {
                    return true;
                }
            }
            ObjectKind::Boxed(Value::String(s)) => {
                if key == "length" || array_index(key).is_some_and(|i| i < s.chars().count()) {
                    return true;
                }
            }
            _ => {}
        }
        self.values.contains_key(key)
    }

    /// Create or replace an own property. Ignores the frozen flag; callers
    /// that enforce it check first.
    pub fn set_own(&mut self, key: Rc<str>, value: Value) -> Result<(), crate::EvalError> {
        if let ObjectKind::Array(items) = &mut self.kind {
            if &*key == "length" {
                items.resize(array_length(value.to_number())?, Value::Undefined);
                return Ok(());
            }
            if let Some(index) = array_index(&key) {
                if index >= items.len() {
                    if index >= MAX_ARRAY_LENGTH {
                        return Err(invalid_array_length());
                    }
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
                return Ok(());
            }
        }
        if self.values.insert(Rc::clone(&key), value).is_none() {
            self.keys.push(key);
        }
        Ok(())
    }

    /// Create or replace a named own property that is never an array index
    /// or `length`. Realm construction uses this for built-in members.
    pub fn define_own(&mut self, key: Rc<str>, value: Value) {
        if self.values.insert(Rc::clone(&key), value).is_none() {
            self.keys.push(key);
        }
    }

    /// Remove an own property. Array elements become `undefined`.
    pub fn delete_own(&mut self, key: &str) -> bool {
        if let ObjectKind::Array(items) = &mut self.kind {
            if key == "length" {
                return false;
            }
            if let Some(index) = array_index(key) {
                if let Some(slot) = items.get_mut(index) {
                    *slot = Value::Undefined;
                }
                return true;
            }
        }
        if self.values.remove(key).is_some() {
            self.keys.retain(|k| &**k != key);
        }
        true
    }

    /// Own enumerable keys: integer-like keys ascending, then the rest in
    /// insertion order.
    pub fn own_keys(&self) -> Vec<Rc<str>> {
        let mut out: Vec<Rc<str>> = match &self.kind {
            ObjectKind::Array(items) => (0..items.len()).map(|i| i.to_string().into()).collect(),
            ObjectKind::Boxed(Value::String(s)) => {
                (0..s.chars().count()).map(|i| i.to_string().into()).collect()
            }
            _ => Vec::new(),
        };
        let mut indexed: Vec<(usize, &Rc<str>)> = self
            .keys
            .iter()
            .filter_map(|k| array_index(k).map(|i| (i, k)))
            .collect();
        indexed.sort_unstable_by_key(|&(i, _)| i);
        out.extend(indexed.into_iter().map(|(_, k)| Rc::clone(k)));
        out.extend(
            self.keys
                .iter()
                .filter(|k| array_index(k).is_none())
                .cloned(),
        );
        out
    }
}

/// Validate a requested array length.
pub fn array_length(len: f64) -> Result<usize, crate::EvalError> {
    if len < 0.0 || len.fract() != 0.0 || len > MAX_ARRAY_LENGTH as f64 {
        return Err(invalid_array_length());
    }
    Ok(len as usize)
}

/// Parse a canonical array index (`"0"`, `"17"`, not `"01"` or `"-1"`).
pub fn array_index(key: &str) -> Option<usize> {
    let bytes = key.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    let index: u64 = key.parse().ok()?;
    (index < u64::from(u32::MAX)).then_some(index as usize)
}

/// Shared handle to a heap object.
#[derive(Clone)]
pub struct Obj(Rc<RefCell<ObjectData>>);

/// Non-owning handle used by registries.
#[derive(Clone)]
pub struct WeakObj(Weak<RefCell<ObjectData>>);

impl WeakObj {
    pub fn upgrade(&self) -> Option<Obj> {
        self.0.upgrade().map(Obj)
    }
}

impl Obj {
    pub fn new(data: ObjectData) -> Self {
        Obj(Rc::new(RefCell::new(data)))
    }

    pub fn with_kind(kind: ObjectKind, proto: Option<Obj>) -> Self {
        Obj::new(ObjectData::new(kind, proto))
    }

    pub fn id(&self) -> ObjId {
        ObjId(Rc::as_ptr(&self.0).cast::<()>() as usize)
    }

    pub fn ptr_eq(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObj {
        WeakObj(Rc::downgrade(&self.0))
    }

    pub fn borrow(&self) -> Ref<'_, ObjectData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, ObjectData> {
        self.0.borrow_mut()
    }

    pub fn proto(&self) -> Option<Obj> {
        self.borrow().proto.clone()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(_))
    }

    pub fn callable(&self) -> Option<Callable> {
        match &self.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        }
    }

    pub fn promise(&self) -> Option<PromiseCell> {
        match &self.borrow().kind {
            ObjectKind::Promise(cell) => Some(Rc::clone(cell)),
            _ => None,
        }
    }

    pub fn regexp(&self) -> Option<Rc<RegExpData>> {
        match &self.borrow().kind {
            ObjectKind::RegExp(data) => Some(Rc::clone(data)),
            _ => None,
        }
    }

    /// Elements of an array, copied out.
    pub fn array_items(&self) -> Option<Vec<Value>> {
        match &self.borrow().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.borrow().get_own(key)
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.borrow().has_own(key)
    }

    /// Write an own property directly, bypassing every sandbox check.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), crate::EvalError> {
        self.borrow_mut().set_own(key.into(), value.into())
    }

    /// Install a named member on a built-in or host object.
    pub fn define(&self, key: &str, value: impl Into<Value>) {
        self.borrow_mut().define_own(key.into(), value.into());
    }

    pub fn delete(&self, key: &str) -> bool {
        self.borrow_mut().delete_own(key)
    }

    pub fn own_keys(&self) -> Vec<Rc<str>> {
        self.borrow().own_keys()
    }

    /// Find `key` on this object or its prototype chain.
    ///
    /// Returns the value and, for inherited properties, the prototype that
    /// owns it.
    pub fn lookup(&self, key: &str) -> Option<(Value, Option<Obj>)> {
        if let Some(value) = self.get_own(key) {
            return Some((value, None));
        }
        let mut current = self.proto();
        while let Some(proto) = current {
            if let Some(value) = proto.get_own(key) {
                return Some((value, Some(proto)));
            }
            current = proto.proto();
        }
        None
    }

    /// Read `key` through the prototype chain without any sandbox checks.
    pub fn get(&self, key: &str) -> Value {
        self.lookup(key).map(|(value, _)| value).unwrap_or_default()
    }

    /// Whether `proto` appears on this object's prototype chain.
    pub fn inherits_from(&self, proto: &Obj) -> bool {
        let mut current = self.proto();
        while let Some(p) = current {
            if p.ptr_eq(proto) {
                return true;
            }
            current = p.proto();
        }
        false
    }
}

impl PartialEq for Obj {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(data) = self.0.try_borrow() else {
            return write!(f, "Obj({:?}, <borrowed>)", self.id());
        };
        match &data.kind {
            ObjectKind::Ordinary => write!(f, "Object{:?}", data.keys),
            ObjectKind::Array(items) => write!(f, "Array(len {})", items.len()),
            ObjectKind::Function(callable) => write!(f, "Function({callable:?})"),
            ObjectKind::Error => f.write_str("Error"),
            ObjectKind::RegExp(data) => write!(f, "/{}/{}", data.source, data.flags),
            ObjectKind::Promise(_) => f.write_str("Promise"),
            ObjectKind::Boxed(value) => write!(f, "Boxed({value:?})"),
            ObjectKind::Global => f.write_str("SandboxGlobal"),
        }
    }
}
