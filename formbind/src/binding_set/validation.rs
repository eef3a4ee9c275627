//! Validation passes and collapsed report passes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use formbind_pointer::{get_value, Pointer};
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::BindingSet;
use crate::binder::Binder;
use crate::control::{bound_pointer, Control, ControlId, ControlRef};
use crate::error::ValidatorError;
use crate::events::{FormEvent, ReportValidityEvent};
use crate::validator::{ControlValidation, FormValidationResult, ValidationResult, Validator};

/// Controls a report pass should cover.
#[derive(Clone)]
pub(super) enum ReportTargets {
    All,
    Controls(Vec<ControlRef>),
}

impl ReportTargets {
    fn from_request(controls: Option<&[ControlRef]>) -> Self {
        match controls {
            None => Self::All,
            Some(controls) => Self::Controls(controls.to_vec()),
        }
    }

    fn merge(&mut self, other: ReportTargets) {
        match other {
            Self::All => *self = Self::All,
            Self::Controls(theirs) => {
                if let Self::Controls(mine) = self {
                    for control in theirs {
                        if !mine.iter().any(|c| c.id() == control.id()) {
                            mine.push(control);
                        }
                    }
                }
            }
        }
    }

    fn as_request(&self) -> Option<&[ControlRef]> {
        match self {
            Self::All => None,
            Self::Controls(controls) => Some(controls),
        }
    }
}

/// Keeps at most one report pass running. Requests arriving meanwhile are
/// merged and served together by the next pass.
pub(super) struct ReportGate {
    running: Cell<bool>,
    pending: RefCell<Option<ReportTargets>>,
    /// Passes started so far
    started: Cell<u64>,
    /// Last finished pass and its result
    finished: watch::Sender<(u64, FormValidationResult)>,
}

impl ReportGate {
    pub(super) fn new() -> Self {
        let (finished, _) = watch::channel((0, FormValidationResult::default()));
        Self {
            running: Cell::new(false),
            pending: RefCell::new(None),
            started: Cell::new(0),
            finished,
        }
    }

    fn defer(&self, targets: ReportTargets) {
        let mut pending = self.pending.borrow_mut();
        match pending.as_mut() {
            Some(existing) => existing.merge(targets),
            None => *pending = Some(targets),
        }
    }

    /// Wait until pass `wanted` finished. `None` when the running pass was
    /// abandoned first.
    async fn wait_for(&self, wanted: u64) -> Option<FormValidationResult> {
        let mut finished = self.finished.subscribe();
        loop {
            {
                let current = finished.borrow_and_update();
                if current.0 >= wanted {
                    return Some(current.1.clone());
                }
            }
            if !self.running.get() || finished.changed().await.is_err() {
                return None;
            }
        }
    }
}

/// Clears the running flag even when the driving future is dropped mid-pass.
struct Running<'a>(&'a ReportGate);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.running.set(false);
        self.0.finished.send_modify(|_| {});
    }
}

/// Run one validator, turning failures and timeouts into a logged `None`.
pub(super) async fn run_validator(
    validator: &dyn Validator,
    control: &dyn Control,
    value: &Value,
    data: &Value,
    timeout: Option<Duration>,
) -> Option<ValidationResult> {
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, validator.validate(control, value, data))
            .await
            .unwrap_or_else(|_| {
                Err(ValidatorError::Timeout {
                    validator: validator.name().to_string(),
                    after: limit,
                })
            }),
        None => validator.validate(control, value, data).await,
    };

    match outcome {
        Ok(result) => Some(result),
        Err(error) => {
            warn!(
                validator = validator.name(),
                control = %control.id(),
                %error,
                "validator failed, result dropped"
            );
            None
        }
    }
}

impl BindingSet {
    /// Validate `controls` (default: every bound control).
    ///
    /// Every matching validator runs concurrently; results are reassembled in
    /// registration order per control. Failing validators are logged and left
    /// out.
    pub async fn validate(&self, controls: Option<&[ControlRef]>) -> FormValidationResult {
        let (targets, data) = {
            let state = self.state.borrow();
            let controls: Vec<ControlRef> = match controls {
                None => state
                    .bindings
                    .values()
                    .map(|binding| Rc::clone(binding.control()))
                    .collect(),
                Some(controls) => controls
                    .iter()
                    .filter(|control| state.bindings.contains_key(&control.id()))
                    .cloned()
                    .collect(),
            };
            let targets: Vec<(ControlRef, Option<Pointer>, bool)> = controls
                .into_iter()
                .map(|control| {
                    let pointer = bound_pointer(control.as_ref(), &self.config.bind_attribute);
                    let visited = state.visited.contains(&control.id());
                    (control, pointer, visited)
                })
                .collect();
            (targets, state.data.clone().unwrap_or(Value::Null))
        };

        let timeout = self.config.validator_timeout();
        let data = &data;
        let groups = join_all(targets.into_iter().map(|(control, pointer, visited)| async move {
            let value = pointer
                .as_ref()
                .and_then(|p| get_value(data, p.as_str()))
                .cloned()
                .unwrap_or(Value::Null);
            let validators = self.validators.matching_validators(control.as_ref());
            let outcomes = join_all(validators.iter().map(|validator| {
                run_validator(validator.as_ref(), control.as_ref(), &value, data, timeout)
            }))
            .await;

            let results = outcomes
                .into_iter()
                .flatten()
                .map(|result| match &pointer {
                    Some(own) if result.field.is_none() => result.with_field(own.clone()),
                    _ => result,
                })
                .collect();
            ControlValidation {
                control,
                pointer,
                results,
                visited,
            }
        }))
        .await;

        let validation = FormValidationResult::from_groups(groups);
        debug!(
            controls = validation.result.len(),
            errors = validation.errors.len(),
            valid = validation.is_valid,
            "validation pass"
        );
        validation
    }

    pub async fn check_validity(&self, controls: Option<&[ControlRef]>) -> bool {
        self.validate(controls).await.is_valid
    }

    /// Validate, feed results to the binders of visited controls, and publish
    /// a report event.
    ///
    /// While a pass is running, further requests are merged and served by
    /// one follow-up pass; each caller receives the result of the pass that
    /// covered its request.
    pub async fn report_validity(&self, controls: Option<&[ControlRef]>) -> FormValidationResult {
        let targets = ReportTargets::from_request(controls);
        loop {
            if !self.report.running.get() {
                return self.drive_reports(targets).await;
            }
            let wanted = self.report.started.get() + 1;
            trace!(wanted, "report pass in flight, request deferred");
            self.report.defer(targets.clone());
            if let Some(result) = self.report.wait_for(wanted).await {
                return result;
            }
        }
    }

    async fn drive_reports(&self, mut targets: ReportTargets) -> FormValidationResult {
        self.report.running.set(true);
        let _running = Running(&self.report);
        let mut first = None;
        loop {
            if let Some(pending) = self.report.pending.borrow_mut().take() {
                targets.merge(pending);
            }
            let generation = self.report.started.get() + 1;
            self.report.started.set(generation);

            let result = self.report_pass(&targets).await;
            self.report.finished.send_replace((generation, result.clone()));
            if first.is_none() {
                first = Some(result);
            }

            // Give callers woken by this pass a tick to queue follow-ups.
            tokio::task::yield_now().await;
            match self.report.pending.borrow_mut().take() {
                Some(next) => targets = next,
                None => return first.unwrap_or_default(),
            }
        }
    }

    async fn report_pass(&self, targets: &ReportTargets) -> FormValidationResult {
        let validation = self.validate(targets.as_request()).await;

        let feedback: Vec<(Rc<dyn Binder>, ControlRef, Vec<ValidationResult>)> = {
            let state = self.state.borrow();
            validation
                .result
                .iter()
                .filter(|group| group.visited)
                .filter_map(|group| {
                    let binding = state.bindings.get(&group.id())?;
                    Some((
                        Rc::clone(binding.binder()),
                        Rc::clone(&group.control),
                        group.results.clone(),
                    ))
                })
                .collect()
        };
        for (binder, control, results) in feedback {
            binder.report_validity(control.as_ref(), &results);
        }

        self.publish(FormEvent::ReportValidity(ReportValidityEvent::from(&validation)));
        validation
    }

    /// Mark `control` visited and run a report pass, one scheduler tick later
    /// when validation is deferred.
    pub async fn control_visited(&self, control: &ControlRef) -> FormValidationResult {
        let id: ControlId = control.id();
        if self.state.borrow_mut().visited.insert(id) {
            debug!(control = %id, "control visited");
        }
        if self.config.defer_validation {
            tokio::task::yield_now().await;
        }
        self.report_validity(None).await
    }
}
