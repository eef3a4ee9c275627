//! Runtime pairing of one control with one binder.
//!
//! A [`ControlBinding`] is created bound: construction wires the binder's
//! native listeners, which report through [`ControlCallbacks`]. Unbinding
//! (explicitly or on drop) removes those listeners and silences any callback
//! clones still held by the host.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{debug, trace};

use crate::binder::Binder;
use crate::control::{ControlId, ControlRef, ListenerId};

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Receives normalized signals from bound controls.
pub type SignalSink = Rc<dyn Fn(ControlSignal)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Bound,
    Unbound,
}

/// Extra information attached to a change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeOptions {
    /// Sub-path below the control's pointer, for controls editing several fields.
    pub reference: Option<String>,
}

impl ChangeOptions {
    pub fn with_reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalKind {
    Change { value: Value, options: ChangeOptions },
    Touch,
}

/// A change or touch reported by a bound control.
///
/// `serial` identifies the binding that produced it, so signals from a
/// binding that was replaced in the meantime can be told apart.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSignal {
    pub control: ControlId,
    pub serial: u64,
    pub kind: SignalKind,
}

/// The `onChange`/`onTouch` pair handed to [`Binder::initialize_events`].
#[derive(Clone)]
pub struct ControlCallbacks {
    control: ControlId,
    serial: u64,
    sink: SignalSink,
    state: Rc<Cell<BindingState>>,
}

impl ControlCallbacks {
    pub fn control(&self) -> ControlId {
        self.control
    }

    pub fn on_change(&self, value: Value) {
        self.on_change_with(value, ChangeOptions::default());
    }

    pub fn on_change_with(&self, value: Value, options: ChangeOptions) {
        self.emit(SignalKind::Change { value, options });
    }

    pub fn on_touch(&self) {
        self.emit(SignalKind::Touch);
    }

    fn emit(&self, kind: SignalKind) {
        if self.state.get() != BindingState::Bound {
            trace!(control = %self.control, "signal from unbound control ignored");
            return;
        }
        (self.sink)(ControlSignal {
            control: self.control,
            serial: self.serial,
            kind,
        });
    }
}

pub struct ControlBinding {
    control: ControlRef,
    binder: Rc<dyn Binder>,
    listeners: Vec<ListenerId>,
    serial: u64,
    state: Rc<Cell<BindingState>>,
}

impl ControlBinding {
    /// Bind `control` to `binder`, wiring the binder's events immediately.
    pub fn new(control: ControlRef, binder: Rc<dyn Binder>, sink: SignalSink) -> Self {
        let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        let state = Rc::new(Cell::new(BindingState::Bound));
        let callbacks = ControlCallbacks {
            control: control.id(),
            serial,
            sink,
            state: Rc::clone(&state),
        };
        let listeners = binder.initialize_events(&control, callbacks);
        debug!(
            control = %control.id(),
            tag = %control.tag_name(),
            binder = binder.name(),
            "control bound"
        );
        Self {
            control,
            binder,
            listeners,
            serial,
            state,
        }
    }

    pub fn id(&self) -> ControlId {
        self.control.id()
    }

    pub fn control(&self) -> &ControlRef {
        &self.control
    }

    pub fn binder(&self) -> &Rc<dyn Binder> {
        &self.binder
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn state(&self) -> BindingState {
        self.state.get()
    }

    /// Remove the binder's listeners. Safe to call more than once.
    pub fn unbind(&mut self) {
        if self.state.get() == BindingState::Unbound {
            return;
        }
        for listener in self.listeners.drain(..) {
            self.control.remove_event_listener(listener);
        }
        self.state.set(BindingState::Unbound);
        debug!(control = %self.control.id(), binder = self.binder.name(), "control unbound");
    }
}

impl Drop for ControlBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl fmt::Debug for ControlBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBinding")
            .field("control", &self.control.id())
            .field("binder", &self.binder.name())
            .field("serial", &self.serial)
            .field("state", &self.state.get())
            .finish()
    }
}
