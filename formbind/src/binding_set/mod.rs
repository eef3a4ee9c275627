//! The form engine.
//!
//! A [`BindingSet`] owns the data tree, the patch recorded since the last
//! baseline, and one [`ControlBinding`] per bound control. User edits arrive
//! as signals through its message channel (see [`BindingSet::pump`]), are
//! written to data and patch together, pushed to every control bound to a
//! related pointer, validated, and announced on the event stream when valid.
//!
//! The engine is single threaded: it hands out `Rc`s and its futures are not
//! `Send`. Drive it from a current-thread runtime or a `LocalSet`.

mod messages;
mod validation;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use formbind_config::FormConfig;
use formbind_pointer::{get_value, resolve_write_segments, set_value, Pointer};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};

use crate::binder::{Binder, BinderRegistry};
use crate::binding::{ChangeOptions, ControlBinding, SignalSink};
use crate::control::{
    apply_attribute_value, attribute_bindings, bound_pointer, descendants_and_self, ControlId,
    ControlRef,
};
use crate::error::Result;
use crate::events::{ChangeEvent, FormEvent};
use crate::logging::Pretty;
use crate::observer::EngineMessage;
use crate::patch::PatchInput;
use crate::validator::ValidatorRegistry;

use validation::ReportGate;

#[derive(Default)]
struct FormState {
    data: Option<Value>,
    original: Option<Value>,
    /// Last write per pointer since the baseline, in write order
    patch: IndexMap<Pointer, Value>,
    bindings: IndexMap<ControlId, ControlBinding>,
    /// Unbound controls that only mirror data into attributes
    attribute_hosts: IndexMap<ControlId, ControlRef>,
    visited: HashSet<ControlId>,
    updated: HashMap<ControlId, Value>,
}

impl FormState {
    /// Write data and patch together. Returns the pointer actually written,
    /// with `-` and out-of-range indices resolved to the index they landed on.
    fn write(&mut self, pointer: Pointer, value: Value) -> Pointer {
        let data = self.data.get_or_insert_with(|| Value::Object(Map::new()));
        let pointer = Pointer::from_segments(resolve_write_segments(data, pointer.as_str()));
        trace!(pointer = %pointer, "write");
        set_value(data, pointer.as_str(), value.clone());
        self.patch.shift_remove(&pointer);
        self.patch.insert(pointer.clone(), value);
        pointer
    }

    fn reset_patch(&mut self) {
        self.patch.clear();
        self.updated.clear();
    }
}

/// A pending write into a control.
enum Refresh {
    Value {
        control: ControlRef,
        binder: Rc<dyn Binder>,
        value: Value,
    },
    Attribute {
        control: ControlRef,
        attribute: String,
        value: Value,
    },
}

impl Refresh {
    fn apply(self) {
        match self {
            Self::Value {
                control,
                binder,
                value,
            } => binder.write_value(control.as_ref(), &value),
            Self::Attribute {
                control,
                attribute,
                value,
            } => apply_attribute_value(control.as_ref(), &attribute, &value),
        }
    }
}

pub struct BindingSet {
    config: FormConfig,
    binders: Rc<BinderRegistry>,
    validators: Rc<ValidatorRegistry>,
    state: RefCell<FormState>,
    sender: mpsc::UnboundedSender<EngineMessage>,
    receiver: RefCell<Option<mpsc::UnboundedReceiver<EngineMessage>>>,
    events: broadcast::Sender<FormEvent>,
    report: ReportGate,
}

/// Builder for [`BindingSet`].
///
/// ```
/// use std::rc::Rc;
/// use formbind::{BindingSet, BinderRegistry, FormConfig, ValidatorRegistry};
///
/// let validators = Rc::new(ValidatorRegistry::new());
/// let form = BindingSet::builder()
///     .config(FormConfig::default().with_defer_validation(false))
///     .binders(Rc::new(BinderRegistry::with_defaults()))
///     .validators(validators.clone())
///     .build()
///     .unwrap();
/// assert!(Rc::ptr_eq(form.validators(), &validators));
/// ```
#[derive(Default)]
pub struct BindingSetBuilder {
    config: FormConfig,
    binders: Option<Rc<BinderRegistry>>,
    validators: Option<Rc<ValidatorRegistry>>,
}

impl BindingSetBuilder {
    pub fn config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    pub fn binders(mut self, binders: Rc<BinderRegistry>) -> Self {
        self.binders = Some(binders);
        self
    }

    pub fn validators(mut self, validators: Rc<ValidatorRegistry>) -> Self {
        self.validators = Some(validators);
        self
    }

    /// Validate the configuration and create the engine. Registries left
    /// unset get the built-in strategies.
    pub fn build(self) -> Result<BindingSet> {
        self.config.validate()?;
        let binders = self
            .binders
            .unwrap_or_else(|| Rc::new(BinderRegistry::with_defaults_for(&self.config)));
        let validators = self
            .validators
            .unwrap_or_else(|| Rc::new(ValidatorRegistry::with_defaults()));
        Ok(BindingSet::from_parts(self.config, binders, validators))
    }
}

impl BindingSet {
    /// Engine with default configuration and built-in strategies.
    pub fn new() -> Self {
        let config = FormConfig::default();
        let binders = Rc::new(BinderRegistry::with_defaults_for(&config));
        Self::from_parts(config, binders, Rc::new(ValidatorRegistry::with_defaults()))
    }

    pub fn builder() -> BindingSetBuilder {
        BindingSetBuilder::default()
    }

    fn from_parts(
        config: FormConfig,
        binders: Rc<BinderRegistry>,
        validators: Rc<ValidatorRegistry>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            config,
            binders,
            validators,
            state: RefCell::new(FormState::default()),
            sender,
            receiver: RefCell::new(Some(receiver)),
            events,
            report: ReportGate::new(),
        }
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn binders(&self) -> &Rc<BinderRegistry> {
        &self.binders
    }

    pub fn validators(&self) -> &Rc<ValidatorRegistry> {
        &self.validators
    }

    /// Receive [`FormEvent`]s published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: FormEvent) {
        if self.events.send(event).is_err() {
            trace!("no event subscribers");
        }
    }

    fn signal_sink(&self) -> SignalSink {
        let sender = self.sender.clone();
        Rc::new(move |signal| {
            // Fails only after the engine is dropped.
            let _ = sender.send(EngineMessage::Signal(signal));
        })
    }

    /// Replace the data tree and baseline with copies of `data`, clear the
    /// patch, and refresh every control.
    pub fn set_data(&self, data: &Value) {
        {
            let mut state = self.state.borrow_mut();
            state.data = Some(data.clone());
            state.original = Some(data.clone());
            state.reset_patch();
        }
        trace!("data assigned: {}", Pretty(data));
        self.update_control_values(None);
    }

    /// Copy of the current data tree.
    pub fn data(&self) -> Option<Value> {
        self.state.borrow().data.clone()
    }

    /// Bind `control` if a binder accepts it and it is not bound yet.
    ///
    /// Controls without a binder that declare attribute bindings are tracked
    /// for attribute refresh only. Returns whether a binding was created.
    pub fn add_control(&self, control: &ControlRef) -> bool {
        let id = control.id();
        {
            let state = self.state.borrow();
            if state.bindings.contains_key(&id) || state.attribute_hosts.contains_key(&id) {
                return false;
            }
        }

        let mirrors_attributes =
            !attribute_bindings(control.as_ref(), &self.config.attribute_binding_prefix).is_empty();
        let binding = self.binders.initialize(control, self.signal_sink());
        let bound = binding.is_some();
        {
            let mut state = self.state.borrow_mut();
            match binding {
                Some(binding) => {
                    state.bindings.insert(id, binding);
                }
                None if mirrors_attributes => {
                    debug!(control = %id, "tracking attribute bindings");
                    state.attribute_hosts.insert(id, Rc::clone(control));
                }
                None => return false,
            }
        }

        self.refresh(None, Some(id));
        bound
    }

    /// Forget `control` and every descendant, removing their listeners.
    pub fn remove_control(&self, control: &ControlRef) {
        let ids: Vec<ControlId> = descendants_and_self(control).iter().map(|c| c.id()).collect();
        let removed: Vec<ControlBinding> = {
            let mut state = self.state.borrow_mut();
            let mut removed = Vec::new();
            for id in &ids {
                if let Some(binding) = state.bindings.shift_remove(id) {
                    removed.push(binding);
                }
                state.attribute_hosts.shift_remove(id);
                state.visited.remove(id);
                state.updated.remove(id);
            }
            removed
        };
        for mut binding in removed {
            binding.unbind();
        }
    }

    pub fn is_bound(&self, control: &ControlRef) -> bool {
        self.state.borrow().bindings.contains_key(&control.id())
    }

    pub fn is_visited(&self, control: &ControlRef) -> bool {
        self.state.borrow().visited.contains(&control.id())
    }

    /// Bound controls in binding order.
    pub fn get_controls(&self) -> Vec<ControlRef> {
        self.state
            .borrow()
            .bindings
            .values()
            .map(|binding| Rc::clone(binding.control()))
            .collect()
    }

    /// The patch as a sparse tree.
    pub fn get_patch(&self) -> Value {
        let mut tree = Value::Object(Map::new());
        for (pointer, value) in &self.state.borrow().patch {
            set_value(&mut tree, pointer.as_str(), value.clone());
        }
        tree
    }

    pub fn get_patch_as_map(&self) -> IndexMap<Pointer, Value> {
        self.state.borrow().patch.clone()
    }

    pub fn get_patch_as_array(&self) -> Vec<(Pointer, Value)> {
        self.state
            .borrow()
            .patch
            .iter()
            .map(|(pointer, value)| (pointer.clone(), value.clone()))
            .collect()
    }

    /// The central write path for user edits.
    ///
    /// Writes the value into data and patch when it differs from the current
    /// one, refreshes related controls, marks the control visited and runs a
    /// report pass. The change event is published, and returned, only when
    /// the control ends up valid; an invalid value stays written.
    pub async fn handle_control_value_change(
        &self,
        control: &ControlRef,
        value: Value,
        options: ChangeOptions,
    ) -> Option<ChangeEvent> {
        let Some(base) = bound_pointer(control.as_ref(), &self.config.bind_attribute) else {
            debug!(control = %control.id(), "change from control without pointer ignored");
            return None;
        };
        let pointer = match &options.reference {
            Some(reference) => base.join(reference),
            None => base,
        };
        let id = control.id();

        let pointer = {
            let mut state = self.state.borrow_mut();
            let unchanged = state
                .data
                .as_ref()
                .and_then(|data| get_value(data, pointer.as_str()))
                .unwrap_or(&Value::Null)
                == &value;
            if unchanged {
                trace!(pointer = %pointer, "value unchanged");
                return None;
            }
            state.updated.insert(id, value.clone());
            state.write(pointer, value.clone())
        };

        self.update_control_values(Some(std::slice::from_ref(&pointer)));
        let validation = self.control_visited(control).await;

        let valid = validation.group_for(id).map_or(true, |group| group.is_valid());
        if !valid {
            debug!(pointer = %pointer, "invalid value written, change not announced");
            return None;
        }

        let event = ChangeEvent {
            data: self.data().unwrap_or(Value::Null),
            pointer,
            value,
            validation_results: validation,
        };
        self.publish(FormEvent::Change(event.clone()));
        Some(event)
    }

    /// Apply a batch of writes without validation, then refresh the affected controls.
    pub fn patch(&self, input: impl Into<PatchInput>) {
        let pairs = input.into().into_pairs();
        if pairs.is_empty() {
            return;
        }
        let written: Vec<Pointer> = {
            let mut state = self.state.borrow_mut();
            pairs
                .into_iter()
                .map(|(pointer, value)| state.write(pointer, value))
                .collect()
        };
        debug!(writes = written.len(), "patch applied");
        self.update_control_values(Some(&written));
    }

    /// Accept the current data as the new baseline.
    pub fn commit(&self) {
        let mut state = self.state.borrow_mut();
        state.reset_patch();
        state.original = state.data.clone();
        debug!("committed");
    }

    /// Drop the patch and return to the baseline, if there is one.
    pub fn rollback(&self) {
        let restored = {
            let mut state = self.state.borrow_mut();
            state.reset_patch();
            match state.original.clone() {
                Some(original) => {
                    state.data = Some(original);
                    true
                }
                None => false,
            }
        };
        debug!(restored, "rolled back");
        if restored {
            self.update_control_values(None);
        }
    }

    /// Push data into every control bound to a pointer related to one of
    /// `pointers` (equal, ancestor or descendant). `None` refreshes everything.
    pub fn update_control_values(&self, pointers: Option<&[Pointer]>) {
        self.refresh(pointers, None);
    }

    fn refresh(&self, pointers: Option<&[Pointer]>, only: Option<ControlId>) {
        let affected = |pointer: &Pointer| {
            pointers.map_or(true, |changed| changed.iter().any(|c| c.is_related_to(pointer)))
        };

        let writes: Vec<Refresh> = {
            let mut state = self.state.borrow_mut();
            let FormState {
                data,
                bindings,
                attribute_hosts,
                updated,
                ..
            } = &mut *state;
            let Some(data) = data.as_ref() else {
                return;
            };
            let lookup = |pointer: &Pointer| get_value(data, pointer.as_str()).cloned().unwrap_or(Value::Null);
            let wanted = |id: ControlId| only.map_or(true, |only| only == id);

            let mut writes = Vec::new();
            for (id, binding) in bindings.iter().filter(|(id, _)| wanted(**id)) {
                let control = binding.control();
                if let Some(pointer) = bound_pointer(control.as_ref(), &self.config.bind_attribute) {
                    if affected(&pointer) {
                        let value = lookup(&pointer);
                        // The editing control already shows this value.
                        if updated.get(id) == Some(&value) {
                            continue;
                        }
                        // Once overwritten, the control shows engine data again.
                        updated.remove(id);
                        writes.push(Refresh::Value {
                            control: Rc::clone(control),
                            binder: Rc::clone(binding.binder()),
                            value,
                        });
                    }
                }
            }

            let attribute_controls = bindings
                .iter()
                .map(|(id, binding)| (id, binding.control()))
                .chain(attribute_hosts.iter())
                .filter(|(id, _)| wanted(**id));
            for (_, control) in attribute_controls {
                let declared =
                    attribute_bindings(control.as_ref(), &self.config.attribute_binding_prefix);
                for (attribute, pointer) in declared {
                    if affected(&pointer) {
                        writes.push(Refresh::Attribute {
                            control: Rc::clone(control),
                            attribute,
                            value: lookup(&pointer),
                        });
                    }
                }
            }
            writes
        };

        if !writes.is_empty() {
            trace!(count = writes.len(), "refreshing controls");
        }
        for write in writes {
            write.apply();
        }
    }
}

impl Default for BindingSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualControl;
    use crate::control::Control;
    use serde_json::json;

    fn text(pointer: &str) -> Rc<VirtualControl> {
        VirtualControl::new("input").with_attribute("bind", pointer).into_ref()
    }

    #[test]
    fn test_set_data_is_a_copy() {
        let form = BindingSet::new();
        let mut source = json!({"name": "Ada"});
        form.set_data(&source);
        source["name"] = json!("Grace");
        assert_eq!(form.data(), Some(json!({"name": "Ada"})));
    }

    #[test]
    fn test_add_control_writes_current_value() {
        let form = BindingSet::new();
        form.set_data(&json!({"personalData": {"age": 34}}));
        let age = VirtualControl::new("input")
            .with_attribute("type", "number")
            .with_attribute("bind", "#/personalData/age")
            .into_ref();
        let control: ControlRef = age.clone();
        assert!(form.add_control(&control));
        assert!(!form.add_control(&control));
        assert_eq!(age.value(), json!("34"));
        assert_eq!(form.get_controls().len(), 1);
    }

    #[test]
    fn test_unbindable_control_ignored() {
        let form = BindingSet::new();
        let div: ControlRef = VirtualControl::new("div").into_ref();
        assert!(!form.add_control(&div));
        assert!(form.get_controls().is_empty());
    }

    #[test]
    fn test_attribute_binding_mirrors_value() {
        let form = BindingSet::new();
        let fieldset = VirtualControl::new("fieldset")
            .with_attribute("bind-attr:disabled", "/locked")
            .into_ref();
        let control: ControlRef = fieldset.clone();
        assert!(!form.add_control(&control));

        form.set_data(&json!({"locked": true}));
        assert_eq!(fieldset.attribute("disabled"), Some(String::new()));
        form.patch(json!({"/locked": null}));
        assert_eq!(fieldset.attribute("disabled"), None);
    }

    #[test]
    fn test_patch_refreshes_related_controls_only() {
        let form = BindingSet::new();
        form.set_data(&json!({"a": {"x": 1}, "b": 2}));
        let x = text("/a/x");
        let b = text("/b");
        form.add_control(&(x.clone() as ControlRef));
        form.add_control(&(b.clone() as ControlRef));
        b.set_value(json!("stale"));

        form.patch(json!({"a": {"x": 5}}));
        assert_eq!(x.value(), json!("5"));
        assert_eq!(b.value(), json!("stale"));

        form.patch(json!({"/a": {"x": 6}}));
        assert_eq!(x.value(), json!("6"));
    }

    #[test]
    fn test_patch_commit_rollback() {
        let form = BindingSet::new();
        form.set_data(&json!({"name": "Ada", "age": 36}));
        form.patch(vec![("/age", json!(37))]);
        assert_eq!(
            form.get_patch_as_array(),
            vec![(Pointer::new("/age"), json!(37))]
        );
        assert_eq!(form.get_patch(), json!({"age": 37}));

        form.rollback();
        assert!(form.get_patch_as_map().is_empty());
        assert_eq!(form.data(), Some(json!({"name": "Ada", "age": 36})));

        form.patch(json!({"#/age": 38}));
        form.commit();
        assert!(form.get_patch_as_map().is_empty());
        assert_eq!(form.data(), Some(json!({"name": "Ada", "age": 38})));
        form.rollback();
        assert_eq!(form.data(), Some(json!({"name": "Ada", "age": 38})));
    }

    #[test]
    fn test_append_pointer_resolved() {
        let form = BindingSet::new();
        form.set_data(&json!({"tags": ["a"]}));
        form.patch(vec![("/tags/-", json!("b"))]);
        assert_eq!(form.data(), Some(json!({"tags": ["a", "b"]})));
        assert_eq!(form.get_patch_as_array()[0].0, Pointer::new("/tags/1"));
    }

    #[test]
    fn test_rollback_without_baseline_keeps_data() {
        let form = BindingSet::new();
        form.patch(json!({"/a": 1}));
        form.rollback();
        assert_eq!(form.data(), Some(json!({"a": 1})));
        assert!(form.get_patch_as_map().is_empty());
    }

    #[test]
    fn test_remove_control_removes_descendants() {
        let form = BindingSet::new();
        let group = VirtualControl::new("div").into_ref();
        let inner = text("/a");
        group.append_child(inner.clone());
        let group_ref: ControlRef = group.clone();
        for control in descendants_and_self(&group_ref) {
            form.add_control(&control);
        }
        assert_eq!(form.get_controls().len(), 1);
        assert!(inner.listener_count() > 0);

        form.remove_control(&group_ref);
        assert!(form.get_controls().is_empty());
        assert_eq!(inner.listener_count(), 0);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let config = FormConfig {
            event_capacity: 0,
            ..FormConfig::default()
        };
        assert!(BindingSet::builder().config(config).build().is_err());
    }

    #[test]
    fn test_custom_bind_attribute() {
        let form = BindingSet::builder()
            .config(FormConfig::default().with_bind_attribute("data-bind"))
            .build()
            .unwrap();
        form.set_data(&json!({"a": "x"}));
        let input = VirtualControl::new("input").with_attribute("data-bind", "/a").into_ref();
        assert!(form.add_control(&(input.clone() as ControlRef)));
        assert_eq!(input.value(), json!("x"));
    }
}
