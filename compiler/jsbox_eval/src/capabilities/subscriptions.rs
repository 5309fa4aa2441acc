//! Read and write observers.

use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use super::CapabilityState;
use crate::value::{Obj, ObjId, Value};

pub(super) type GetCallback = Rc<dyn Fn(&Obj, &str)>;
pub(super) type ChangeCallback = Rc<dyn Fn(&Change)>;

/// A mutation about to be applied to an object.
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    /// A new own property.
    Create(Rc<str>),
    /// An existing own property gets a new value.
    Replace(Rc<str>),
    Delete(Rc<str>),
    /// An array mutating method was called.
    Array(ArrayChange),
}

impl Change {
    /// The property a key-level change affects.
    pub fn key(&self) -> Option<&str> {
        match self {
            Change::Create(key) | Change::Replace(key) | Change::Delete(key) => Some(key),
            Change::Array(_) => None,
        }
    }
}

/// What an array method call does to its receiver.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayChange {
    pub method: &'static str,
    /// First affected index.
    pub start: usize,
    /// One past the last affected index.
    pub end: usize,
    pub added: Vec<Value>,
    pub removed: Vec<Value>,
}

struct Entry {
    id: u64,
    key: Option<Rc<str>>,
    // Keeps the object alive so its id cannot be reused while subscribed.
    _object: Obj,
    callback: ChangeCallback,
}

#[derive(Default)]
pub(super) struct Subscriptions {
    next_id: u64,
    get: Vec<(u64, GetCallback)>,
    by_object: FxHashMap<ObjId, Vec<Entry>>,
}

impl Subscriptions {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(super) fn add_get(&mut self, callback: GetCallback) -> u64 {
        let id = self.next_id();
        self.get.push((id, callback));
        id
    }

    pub(super) fn add_set(&mut self, object: &Obj, key: Rc<str>, callback: ChangeCallback) -> u64 {
        self.add_entry(object, Some(key), callback)
    }

    pub(super) fn add_change(&mut self, object: &Obj, callback: ChangeCallback) -> u64 {
        self.add_entry(object, None, callback)
    }

    fn add_entry(&mut self, object: &Obj, key: Option<Rc<str>>, callback: ChangeCallback) -> u64 {
        let id = self.next_id();
        self.by_object.entry(object.id()).or_default().push(Entry {
            id,
            key,
            _object: object.clone(),
            callback,
        });
        id
    }

    fn remove(&mut self, id: u64) {
        self.get.retain(|(existing, _)| *existing != id);
        for entries in self.by_object.values_mut() {
            entries.retain(|entry| entry.id != id);
        }
        self.by_object.retain(|_, entries| !entries.is_empty());
    }

    pub(super) fn get_callbacks(&self) -> Vec<GetCallback> {
        self.get.iter().map(|(_, cb)| Rc::clone(cb)).collect()
    }

    /// Callbacks interested in `change` to `object`: key subscribers for
    /// key-level changes, plus every whole-object subscriber.
    pub(super) fn set_callbacks(&self, object: &Obj, change: &Change) -> Vec<ChangeCallback> {
        let Some(entries) = self.by_object.get(&object.id()) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|entry| match &entry.key {
                None => true,
                Some(key) => change.key() == Some(&**key),
            })
            .map(|entry| Rc::clone(&entry.callback))
            .collect()
    }

    pub(super) fn has_change(&self, object: &Obj) -> bool {
        self.by_object
            .get(&object.id())
            .is_some_and(|entries| entries.iter().any(|e| e.key.is_none()))
    }
}

/// Handle returned by the `subscribe_*` methods.
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe to remove it"]
pub struct Subscription {
    state: Weak<CapabilityState>,
    id: u64,
}

impl Subscription {
    pub(super) fn new(state: Weak<CapabilityState>, id: u64) -> Self {
        Subscription { state, id }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(self) {
        if let Some(state) = self.state.upgrade() {
            state.subscriptions.borrow_mut().remove(self.id);
        }
    }
}
