//! The capability context.
//!
//! Everything a host decides about what a sandboxed program may touch lives
//! here: which globals exist, which prototype members may be reached by
//! inheritance, which values are transparently swapped for safe stand-ins,
//! whether functions may be called or created at all, and how many
//! evaluation ticks a run may spend. The context also records what a run
//! touched (audit mode) and notifies subscribers about reads and writes.
//!
//! [`Capabilities`] is a cheap handle; clones share state, including the
//! tick counter and subscriptions.

mod subscriptions;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::errors::{quota_exceeded, EvalError};
use crate::realm::Realm;
use crate::value::{Obj, ObjId, Value, WeakObj};

pub use subscriptions::{ArrayChange, Change, Subscription};
use subscriptions::{ChangeCallback, GetCallback, Subscriptions};

/// Smallest registry size that triggers a sweep of dead sandbox functions.
const PRUNE_FLOOR: usize = 1024;

/// Decides whether a run that hit its quota may continue. Receives the tick
/// count; returning `true` grants another full quota.
pub type QuotaHook = Rc<dyn Fn(u64) -> bool>;

/// Globals and prototype members touched during an audited run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub globals: BTreeSet<String>,
    /// Type name to the members read through that type's prototype.
    pub prototypes: BTreeMap<String, BTreeSet<String>>,
}

/// Members of one whitelisted prototype. Empty means unrestricted.
struct PrototypeRule {
    _proto: Obj,
    members: FxHashSet<Rc<str>>,
}

struct CapabilityState {
    globals: Vec<(Rc<str>, Value)>,
    global_objects: FxHashSet<ObjId>,
    prototypes: FxHashMap<ObjId, PrototypeRule>,
    replacements: FxHashMap<ObjId, (Obj, Value)>,
    forbid_calls: bool,
    forbid_creation: bool,
    audit: bool,
    quota: Option<u64>,
    on_quota: Option<QuotaHook>,
    ticks: Cell<u64>,
    /// Reprieves granted by the quota hook.
    quota_base: Cell<u64>,
    created: RefCell<FxHashMap<ObjId, WeakObj>>,
    /// Size of `created` that triggers the next sweep of dead entries.
    prune_at: Cell<usize>,
    subscriptions: RefCell<Subscriptions>,
    report: RefCell<AuditReport>,
}

/// Shared handle to a capability context.
#[derive(Clone)]
pub struct Capabilities(Rc<CapabilityState>);

impl Capabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::new()
    }

    /// Names and values of the sandbox's globals.
    pub fn globals(&self) -> &[(Rc<str>, Value)] {
        &self.0.globals
    }

    pub fn is_audited(&self) -> bool {
        self.0.audit
    }

    pub fn calls_forbidden(&self) -> bool {
        self.0.forbid_calls
    }

    pub fn creation_forbidden(&self) -> bool {
        self.0.forbid_creation
    }

    /// Ticks spent by the current (or last) run.
    pub fn ticks(&self) -> u64 {
        self.0.ticks.get()
    }

    /// Snapshot of what audited runs touched so far.
    pub fn audit_report(&self) -> AuditReport {
        self.0.report.borrow().clone()
    }

    /// Reset per-run state before an execution starts.
    pub(crate) fn begin_run(&self) {
        self.0.ticks.set(0);
        self.0.quota_base.set(0);
        *self.0.report.borrow_mut() = AuditReport::default();
    }

    /// Count one evaluation step against the quota.
    pub(crate) fn tick(&self) -> Result<(), EvalError> {
        let ticks = self.0.ticks.get() + 1;
        self.0.ticks.set(ticks);
        let Some(quota) = self.0.quota else {
            return Ok(());
        };
        if ticks - self.0.quota_base.get() <= quota {
            return Ok(());
        }
        if let Some(hook) = &self.0.on_quota {
            if hook(ticks) {
                tracing::debug!(ticks, "execution quota extended");
                self.0.quota_base.set(ticks);
                return Ok(());
            }
        }
        tracing::warn!(ticks, quota, "execution quota exceeded");
        Err(quota_exceeded(ticks))
    }

    /// Whether `obj` is one of the whitelisted global values.
    pub fn is_global_object(&self, obj: &Obj) -> bool {
        self.0.global_objects.contains(&obj.id())
    }

    pub fn is_global_name(&self, key: &str) -> bool {
        self.0.globals.iter().any(|(name, _)| &**name == key)
    }

    /// Whether `proto` is on the prototype whitelist at all.
    pub fn has_prototype(&self, proto: &Obj) -> bool {
        self.0.prototypes.contains_key(&proto.id())
    }

    /// Whether `key` may be inherited from `proto`. The `prototype` objects
    /// of sandbox functions are always open to the sandbox.
    pub fn prototype_allows(&self, proto: &Obj, key: &str) -> bool {
        match self.0.prototypes.get(&proto.id()) {
            Some(rule) => rule.members.is_empty() || rule.members.contains(key),
            None => self.is_created(proto),
        }
    }

    /// Safe stand-in for `value`, if one is registered.
    pub fn replacement(&self, value: &Value) -> Option<Value> {
        let Value::Object(obj) = value else {
            return None;
        };
        self.0
            .replacements
            .get(&obj.id())
            .map(|(_, replacement)| replacement.clone())
    }

    /// Remember a function (or its `prototype` object) as sandbox-made.
    pub(crate) fn register_function(&self, function: &Obj) {
        let mut created = self.0.created.borrow_mut();
        if created.len() >= self.0.prune_at.get() {
            created.retain(|_, weak| weak.upgrade().is_some());
            self.0.prune_at.set((created.len() * 2).max(PRUNE_FLOOR));
        }
        created.insert(function.id(), function.downgrade());
    }

    /// Whether `function` was created by a sandboxed program.
    pub fn is_sandbox_function(&self, function: &Obj) -> bool {
        function.is_callable() && self.is_created(function)
    }

    fn is_created(&self, obj: &Obj) -> bool {
        self.0
            .created
            .borrow()
            .get(&obj.id())
            .and_then(WeakObj::upgrade)
            .is_some_and(|live| live.ptr_eq(obj))
    }

    pub(crate) fn record_global(&self, key: &str) {
        if self.0.audit {
            self.0.report.borrow_mut().globals.insert(key.to_string());
        }
    }

    pub(crate) fn record_prototype(&self, type_name: &str, key: &str) {
        if self.0.audit {
            self.0
                .report
                .borrow_mut()
                .prototypes
                .entry(type_name.to_string())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Observe every property read.
    pub fn subscribe_get(&self, callback: impl Fn(&Obj, &str) + 'static) -> Subscription {
        let callback: GetCallback = Rc::new(callback);
        let id = self.0.subscriptions.borrow_mut().add_get(callback);
        Subscription::new(Rc::downgrade(&self.0), id)
    }

    /// Observe creation, replacement and deletion of `key` on `object`.
    pub fn subscribe_set(
        &self,
        object: &Obj,
        key: &str,
        callback: impl Fn(&Change) + 'static,
    ) -> Subscription {
        let callback: ChangeCallback = Rc::new(callback);
        let id = self
            .0
            .subscriptions
            .borrow_mut()
            .add_set(object, key.into(), callback);
        Subscription::new(Rc::downgrade(&self.0), id)
    }

    /// Observe every structural change of `object`, including array
    /// mutation through its methods.
    pub fn subscribe_change(&self, object: &Obj, callback: impl Fn(&Change) + 'static) -> Subscription {
        let callback: ChangeCallback = Rc::new(callback);
        let id = self.0.subscriptions.borrow_mut().add_change(object, callback);
        Subscription::new(Rc::downgrade(&self.0), id)
    }

    pub(crate) fn fire_get(&self, object: &Obj, key: &str) {
        let callbacks = self.0.subscriptions.borrow().get_callbacks();
        for callback in callbacks {
            callback(object, key);
        }
    }

    pub(crate) fn fire_set(&self, object: &Obj, change: &Change) {
        let callbacks = self.0.subscriptions.borrow().set_callbacks(object, change);
        for callback in callbacks {
            callback(change);
        }
    }

    pub(crate) fn has_change_subscribers(&self, object: &Obj) -> bool {
        self.0.subscriptions.borrow().has_change(object)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("globals", &self.0.globals.len())
            .field("prototypes", &self.0.prototypes.len())
            .field("forbid_calls", &self.0.forbid_calls)
            .field("forbid_creation", &self.0.forbid_creation)
            .field("audit", &self.0.audit)
            .field("quota", &self.0.quota)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Capabilities`].
#[derive(Default)]
pub struct CapabilitiesBuilder {
    globals: Vec<(Rc<str>, Value)>,
    prototypes: FxHashMap<ObjId, PrototypeRule>,
    replacements: FxHashMap<ObjId, (Obj, Value)>,
    forbid_calls: bool,
    forbid_creation: bool,
    audit: bool,
    quota: Option<u64>,
    on_quota: Option<QuotaHook>,
}

impl CapabilitiesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual starting point: the realm's standard globals, every
    /// intrinsic prototype unrestricted, and the `Function` constructor
    /// replaced by one that compiles into the sandbox.
    pub fn standard(realm: &Realm) -> Self {
        let mut builder = Self::new();
        for (name, value) in realm.standard_globals() {
            builder = builder.global(name, value.clone());
        }
        for proto in realm.intrinsics().prototypes() {
            builder = builder.allow_prototype(proto);
        }
        builder.replace(
            &realm.intrinsics().function_constructor,
            Value::Object(realm.intrinsics().sandboxed_function.clone()),
        )
    }

    /// Expose `value` to the sandbox as the global `name`.
    #[must_use]
    pub fn global(mut self, name: &str, value: Value) -> Self {
        self.globals.retain(|(existing, _)| &**existing != name);
        self.globals.push((name.into(), value));
        self
    }

    /// Allow inheriting every member of `proto`.
    #[must_use]
    pub fn allow_prototype(mut self, proto: &Obj) -> Self {
        self.prototypes.insert(
            proto.id(),
            PrototypeRule {
                _proto: proto.clone(),
                members: FxHashSet::default(),
            },
        );
        self
    }

    /// Allow inheriting only `members` of `proto`.
    #[must_use]
    pub fn allow_prototype_members<'a>(
        mut self,
        proto: &Obj,
        members: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.prototypes.insert(
            proto.id(),
            PrototypeRule {
                _proto: proto.clone(),
                members: members.into_iter().map(Rc::from).collect(),
            },
        );
        self
    }

    /// Remove `proto` from the whitelist.
    #[must_use]
    pub fn deny_prototype(mut self, proto: &Obj) -> Self {
        self.prototypes.remove(&proto.id());
        self
    }

    /// Whenever the sandbox reads `original`, hand it `replacement`.
    #[must_use]
    pub fn replace(mut self, original: &Obj, replacement: Value) -> Self {
        self.replacements
            .insert(original.id(), (original.clone(), replacement));
        self
    }

    #[must_use]
    pub fn forbid_function_calls(mut self, forbid: bool) -> Self {
        self.forbid_calls = forbid;
        self
    }

    #[must_use]
    pub fn forbid_function_creation(mut self, forbid: bool) -> Self {
        self.forbid_creation = forbid;
        self
    }

    #[must_use]
    pub fn audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    /// Abort runs after `ticks` evaluation steps.
    #[must_use]
    pub fn execution_quota(mut self, ticks: u64) -> Self {
        self.quota = Some(ticks);
        self
    }

    #[must_use]
    pub fn on_quota_reached(mut self, hook: impl Fn(u64) -> bool + 'static) -> Self {
        self.on_quota = Some(Rc::new(hook));
        self
    }

    pub fn build(self) -> Capabilities {
        let mut global_objects: FxHashSet<ObjId> = self
            .globals
            .iter()
            .filter_map(|(_, value)| value.as_object().map(Obj::id))
            .collect();
        global_objects.extend(
            self.replacements
                .values()
                .filter_map(|(_, replacement)| replacement.as_object().map(Obj::id)),
        );
        Capabilities(Rc::new(CapabilityState {
            globals: self.globals,
            global_objects,
            prototypes: self.prototypes,
            replacements: self.replacements,
            forbid_calls: self.forbid_calls,
            forbid_creation: self.forbid_creation,
            audit: self.audit,
            quota: self.quota,
            on_quota: self.on_quota,
            ticks: Cell::new(0),
            quota_base: Cell::new(0),
            created: RefCell::new(FxHashMap::default()),
            prune_at: Cell::new(PRUNE_FLOOR),
            subscriptions: RefCell::new(Subscriptions::default()),
            report: RefCell::new(AuditReport::default()),
        }))
    }
}

#[cfg(test)]
mod tests;
