//! # formbind
//!
//! Declarative form binding. Controls declare a JSON pointer into a data
//! tree; the engine keeps controls and data in sync, records a patch of
//! edits since the last commit, and runs pluggable async validators.
//!
//! ## Pieces
//!
//! - [`Control`]: what the engine needs from a host element. [`VirtualControl`]
//!   is an in-memory implementation.
//! - [`Binder`] / [`BinderRegistry`]: how each kind of control reads and writes values.
//! - [`Validator`] / [`ValidatorRegistry`]: checks producing [`ValidationResult`]s.
//! - [`BindingSet`]: the engine owning data, patch and bindings.
//! - [`ChangeObserver`]: structural changes of the control container.
//!
//! ## Example
//!
//! ```
//! use formbind::{BindingSet, FormEvent, VirtualControl};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let form = BindingSet::new();
//! let mut events = form.subscribe();
//! form.set_data(&json!({"personalData": {"age": 34}}));
//!
//! let container = VirtualControl::new("form").into_ref();
//! let age = VirtualControl::new("input")
//!     .with_attribute("type", "number")
//!     .with_attribute("bind", "#/personalData/age")
//!     .with_attribute("min", "18")
//!     .with_attribute("max", "65")
//!     .into_ref();
//! container.append_child(age.clone());
//! form.observe(container.as_ref());
//! form.pump().await;
//! assert_eq!(age.value(), json!("34"));
//!
//! age.set_value(json!("40"));
//! age.dispatch("change");
//! form.pump().await;
//! assert_eq!(form.data().unwrap()["personalData"]["age"], json!(40));
//! assert!(form.check_validity(None).await);
//!
//! // A report pass runs first, then the change is announced.
//! assert!(matches!(events.try_recv(), Ok(FormEvent::ReportValidity(_))));
//! assert!(matches!(events.try_recv(), Ok(FormEvent::Change(_))));
//! # });
//! ```

pub mod binder;
pub mod binding;
mod binding_set;
pub mod control;
pub mod error;
pub mod events;
pub mod logging;
pub mod observer;
pub mod patch;
pub mod selector;
pub mod validator;
mod virtual_control;

pub use binder::{
    default_binders, Binder, BinderRegistry, CheckboxBinder, CustomElementBinder, InputBinder,
    NumberBinder, SelectBinder,
};
pub use binding::{
    BindingState, ChangeOptions, ControlBinding, ControlCallbacks, ControlSignal, SignalKind,
    SignalSink,
};
pub use binding_set::{BindingSet, BindingSetBuilder};
pub use control::{
    apply_attribute_value, attribute_bindings, bound_pointer, descendants_and_self, Control,
    ControlEvent, ControlId, ControlRef, EventListener, ListenerId,
};
pub use error::{FormError, Result, ValidatorError};
pub use events::{ChangeEvent, FormEvent, ReportValidityEvent};
pub use observer::{ChangeObserver, MutationBatch, MutationRecord, StructureChangeSource};
pub use patch::PatchInput;
pub use selector::Selector;
pub use validator::{
    default_validators, ControlValidation, FormValidationResult, GreaterThanValidator,
    MaxLengthValidator, MaxValidator, MinLengthValidator, MinValidator, PatternValidator,
    RequiredValidator, ValidationResult, Validator, ValidatorRegistry,
};
pub use virtual_control::VirtualControl;

pub use formbind_config::{load_configuration, ConfigError, ConfigProvider, FormConfig};
pub use formbind_pointer::{get_value, normalize, object_flat, set_value, Pointer};
