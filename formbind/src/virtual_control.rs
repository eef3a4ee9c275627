//! In-memory [`Control`] host.
//!
//! `VirtualControl` models an element tree with attributes, live properties,
//! light and encapsulated children, and event listeners. Tests drive the
//! engine with it, and hosts without a native widget tree can use it as their
//! element model.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::Value;

use crate::control::{Control, ControlEvent, ControlId, ControlRef, EventListener, ListenerId};
use crate::observer::{ChangeObserver, MutationRecord, StructureChangeSource};

pub struct VirtualControl {
    id: ControlId,
    tag: String,
    attributes: RefCell<IndexMap<String, String>>,
    properties: RefCell<IndexMap<String, Value>>,
    children: RefCell<Vec<Rc<VirtualControl>>>,
    shadow_children: RefCell<Vec<Rc<VirtualControl>>>,
    parent: RefCell<Weak<VirtualControl>>,
    this: Weak<VirtualControl>,
    listeners: RefCell<Vec<(ListenerId, String, EventListener)>>,
    next_listener: Cell<u64>,
    observer: RefCell<Option<ChangeObserver>>,
}

impl VirtualControl {
    pub fn new(tag: &str) -> Self {
        Self {
            id: ControlId::new(),
            tag: tag.to_ascii_lowercase(),
            attributes: RefCell::new(IndexMap::new()),
            properties: RefCell::new(IndexMap::new()),
            children: RefCell::new(Vec::new()),
            shadow_children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            this: Weak::new(),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            observer: RefCell::new(None),
        }
    }

    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_property(self, name: &str, value: Value) -> Self {
        self.properties.borrow_mut().insert(name.to_string(), value);
        self
    }

    /// Move into a shared handle. Children can only be attached to shared controls.
    pub fn into_ref(self) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            ..self
        })
    }

    pub fn append_child(&self, child: Rc<VirtualControl>) {
        self.adopt(&child);
        self.children.borrow_mut().push(Rc::clone(&child));
        self.notify(MutationRecord::Added(child as ControlRef));
    }

    /// Attach into the encapsulated subtree, like a shadow root.
    pub fn append_shadow_child(&self, child: Rc<VirtualControl>) {
        self.adopt(&child);
        self.shadow_children.borrow_mut().push(Rc::clone(&child));
        self.notify(MutationRecord::Added(child as ControlRef));
    }

    /// Detach a direct child. Returns false when `child` is not attached here.
    pub fn remove_child(&self, child: &Rc<VirtualControl>) -> bool {
        let removed = detach(&self.children, child) || detach(&self.shadow_children, child);
        if removed {
            *child.parent.borrow_mut() = Weak::new();
            self.notify(MutationRecord::Removed(Rc::clone(child) as ControlRef));
        }
        removed
    }

    pub fn parent(&self) -> Option<Rc<VirtualControl>> {
        self.parent.borrow().upgrade()
    }

    /// Current `value` property, `Null` when unset.
    pub fn value(&self) -> Value {
        self.property("value").unwrap_or(Value::Null)
    }

    pub fn set_value(&self, value: Value) {
        self.set_property("value", value);
    }

    /// Fire an event without detail.
    pub fn dispatch(&self, kind: &str) {
        self.dispatch_event(ControlEvent::new(kind));
    }

    pub fn dispatch_event(&self, event: ControlEvent) {
        // Listeners may add or remove listeners while running.
        let matching: Vec<EventListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, kind, _)| *kind == event.kind)
            .map(|(_, _, listener)| Rc::clone(listener))
            .collect();
        for listener in matching {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn adopt(&self, child: &Rc<VirtualControl>) {
        if let Some(previous) = child.parent() {
            previous.remove_child(child);
        }
        *child.parent.borrow_mut() = self.this.clone();
    }

    /// Report to the nearest connected observer up the tree.
    fn notify(&self, record: MutationRecord) {
        if let Some(observer) = self.observer.borrow().as_ref() {
            observer.record(record);
            return;
        }
        if let Some(parent) = self.parent() {
            parent.notify(record);
        }
    }
}

fn detach(list: &RefCell<Vec<Rc<VirtualControl>>>, child: &Rc<VirtualControl>) -> bool {
    let mut list = list.borrow_mut();
    match list.iter().position(|c| Rc::ptr_eq(c, child)) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

impl Control for VirtualControl {
    fn id(&self) -> ControlId {
        self.id
    }

    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.borrow().keys().cloned().collect()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, name: &str) {
        self.attributes.borrow_mut().shift_remove(name);
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.properties.borrow().get(name).cloned()
    }

    fn set_property(&self, name: &str, value: Value) {
        self.properties.borrow_mut().insert(name.to_string(), value);
    }

    fn children(&self) -> Vec<ControlRef> {
        self.children
            .borrow()
            .iter()
            .chain(self.shadow_children.borrow().iter())
            .map(|child| Rc::clone(child) as ControlRef)
            .collect()
    }

    fn add_event_listener(&self, event: &str, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .push((id, event.to_string(), listener));
        id
    }

    fn remove_event_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(other, _, _)| *other != id);
    }
}

impl StructureChangeSource for VirtualControl {
    fn connect(&self, observer: ChangeObserver) {
        for child in self.children() {
            observer.added(child);
        }
        *self.observer.borrow_mut() = Some(observer);
    }

    fn disconnect(&self) {
        self.observer.borrow_mut().take();
    }
}
