//! Binder strategies and their registry.
//!
//! A [`Binder`] knows how to talk to one kind of control: which controls it
//! handles, which native events mean "value committed" and "touched", and how
//! to push a value back in. The [`BinderRegistry`] keeps binders in precedence
//! order; the first binder whose `matches` accepts a control binds it.
//!
//! Registries are plain values shared by handle, so separate engines can run
//! with different binder sets:
//!
//! ```
//! use std::rc::Rc;
//! use formbind::{Binder, BinderRegistry, CheckboxBinder};
//!
//! let registry = BinderRegistry::with_defaults();
//! let checkbox = Rc::new(CheckboxBinder::new("bind"));
//! registry.unshift([checkbox as Rc<dyn Binder>]);
//! assert_eq!(registry.names()[0], "checkbox");
//! ```

mod builtin;

use std::cell::RefCell;
use std::rc::Rc;

use formbind_config::FormConfig;
use serde_json::Value;
use tracing::{debug, trace};

use crate::binding::{ControlBinding, ControlCallbacks, SignalSink};
use crate::control::{Control, ControlRef, ListenerId};
use crate::validator::ValidationResult;

pub(crate) use builtin::parse_number;
pub use builtin::{
    default_binders, CheckboxBinder, CustomElementBinder, InputBinder, NumberBinder, SelectBinder,
};

/// Strategy binding one kind of control.
pub trait Binder {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn matches(&self, control: &dyn Control) -> bool;

    /// Register native listeners that translate control events into
    /// `callbacks`. Returned ids are removed again when the control unbinds.
    ///
    /// Listeners must not hold the control strongly; capture a
    /// [`Weak`](std::rc::Weak) from `control` instead.
    fn initialize_events(&self, control: &ControlRef, callbacks: ControlCallbacks)
        -> Vec<ListenerId>;

    /// Show `value` in the control. Absent data arrives as `Null`.
    fn write_value(&self, control: &dyn Control, value: &Value);

    /// Optional feedback hook, called with the control's results after a
    /// report pass once the control has been visited.
    fn report_validity(&self, _control: &dyn Control, _results: &[ValidationResult]) {}
}

fn same_binder(a: &Rc<dyn Binder>, b: &Rc<dyn Binder>) -> bool {
    std::ptr::eq(
        Rc::as_ptr(a) as *const (),
        Rc::as_ptr(b) as *const (),
    )
}

/// Ordered binder list, highest precedence first.
#[derive(Default)]
pub struct BinderRegistry {
    binders: RefCell<Vec<Rc<dyn Binder>>>,
}

impl BinderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in binders for the default `bind` attribute.
    pub fn with_defaults() -> Self {
        Self::with_defaults_for(&FormConfig::default())
    }

    pub fn with_defaults_for(config: &FormConfig) -> Self {
        let registry = Self::new();
        registry.add(default_binders(&config.bind_attribute));
        registry
    }

    /// Append binders at lowest precedence. A binder already present moves to the end.
    pub fn add(&self, binders: impl IntoIterator<Item = Rc<dyn Binder>>) {
        let mut list = self.binders.borrow_mut();
        for binder in binders {
            list.retain(|existing| !same_binder(existing, &binder));
            trace!(binder = binder.name(), "binder appended");
            list.push(binder);
        }
    }

    /// Insert binders at highest precedence, keeping their given order.
    pub fn unshift(&self, binders: impl IntoIterator<Item = Rc<dyn Binder>>) {
        let incoming: Vec<Rc<dyn Binder>> = binders.into_iter().collect();
        let mut list = self.binders.borrow_mut();
        list.retain(|existing| !incoming.iter().any(|b| same_binder(existing, b)));
        for (index, binder) in incoming.into_iter().enumerate() {
            trace!(binder = binder.name(), "binder prepended");
            list.insert(index, binder);
        }
    }

    /// Remove by identity. Controls already bound by a removed binder keep working.
    pub fn remove(&self, binders: impl IntoIterator<Item = Rc<dyn Binder>>) {
        let mut list = self.binders.borrow_mut();
        for binder in binders {
            list.retain(|existing| !same_binder(existing, &binder));
        }
    }

    /// First binder accepting `control`.
    pub fn find(&self, control: &dyn Control) -> Option<Rc<dyn Binder>> {
        self.binders
            .borrow()
            .iter()
            .find(|binder| binder.matches(control))
            .cloned()
    }

    /// Bind `control` with the first matching binder, or `None` when nothing matches.
    pub fn initialize(&self, control: &ControlRef, sink: SignalSink) -> Option<ControlBinding> {
        let Some(binder) = self.find(control.as_ref()) else {
            debug!(control = %control.id(), tag = %control.tag_name(), "no binder matches");
            return None;
        };
        Some(ControlBinding::new(Rc::clone(control), binder, sink))
    }

    pub fn names(&self) -> Vec<String> {
        self.binders
            .borrow()
            .iter()
            .map(|binder| binder.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.binders.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.binders.borrow_mut().clear();
    }
}
