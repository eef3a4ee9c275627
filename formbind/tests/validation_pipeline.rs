//! Validator registry, aggregation and report-pass behavior.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use formbind::{
    BindingSet, Control, ControlRef, FormConfig, FormEvent, ValidationResult, Validator,
    ValidatorError, ValidatorRegistry, VirtualControl,
};
use serde_json::{json, Value};
use tracing_test::traced_test;

fn bound(form: &BindingSet, control: &Rc<VirtualControl>) -> ControlRef {
    let control: ControlRef = control.clone();
    assert!(form.add_control(&control));
    control
}

fn number(pointer: &str) -> VirtualControl {
    VirtualControl::new("input")
        .with_attribute("type", "number")
        .with_attribute("bind", pointer)
}

/// Always errors for controls carrying `broken`.
struct BrokenValidator;

#[async_trait(?Send)]
impl Validator for BrokenValidator {
    fn name(&self) -> &str {
        "broken"
    }

    fn matches(&self, control: &dyn Control) -> bool {
        control.has_attribute("broken")
    }

    async fn validate(
        &self,
        _control: &dyn Control,
        _value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        Err(ValidatorError::failed(self.name(), "backend unavailable"))
    }
}

/// Counts calls and yields once before answering.
struct SlowCounter {
    calls: Rc<Cell<usize>>,
    delay: Option<Duration>,
}

#[async_trait(?Send)]
impl Validator for SlowCounter {
    fn name(&self) -> &str {
        "slow-counter"
    }

    fn matches(&self, _control: &dyn Control) -> bool {
        true
    }

    async fn validate(
        &self,
        _control: &dyn Control,
        value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        self.calls.set(self.calls.get() + 1);
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        Ok(ValidationResult::new(self.name(), Value::Null, value.clone(), true))
    }
}

/// Answers valid for every control after sleeping for `delay`.
struct Delayed {
    name: &'static str,
    delay: Duration,
}

#[async_trait(?Send)]
impl Validator for Delayed {
    fn name(&self) -> &str {
        self.name
    }

    fn matches(&self, _control: &dyn Control) -> bool {
        true
    }

    async fn validate(
        &self,
        _control: &dyn Control,
        value: &Value,
        _data: &Value,
    ) -> Result<ValidationResult, ValidatorError> {
        tokio::time::sleep(self.delay).await;
        Ok(ValidationResult::new(self.name, Value::Null, value.clone(), true))
    }
}

#[tokio::test]
async fn test_cross_field_greater_than() {
    let form = BindingSet::new();
    form.set_data(&json!({"age": 30, "height": 50}));
    let age = number("/age").with_attribute("greater-than", "/height").into_ref();
    let age = bound(&form, &age);

    let validation = form.validate(None).await;
    assert!(!validation.is_valid);
    let group = validation.group_for(age.id()).unwrap();
    assert_eq!(group.results[0].name, "greater-than");
    assert_eq!(group.results[0].expected, json!(50));

    form.patch(json!({"/age": 60}));
    assert!(form.check_validity(None).await);
}

#[tokio::test]
async fn test_results_follow_registration_order() {
    let form = BindingSet::new();
    form.set_data(&json!({"age": 10}));
    let age = number("/age")
        .with_attribute("required", "")
        .with_attribute("min", "18")
        .with_attribute("max", "65")
        .into_ref();
    let age = bound(&form, &age);

    let validation = form.validate(None).await;
    let group = validation.group_for(age.id()).unwrap();
    let names: Vec<&str> = group.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["required", "min", "max"]);
    assert!(group.results.iter().all(|r| r.field.as_ref().map(|p| p.as_str()) == Some("/age")));
    assert_eq!(validation.errors.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_failing_validator_is_isolated() {
    let validators = Rc::new(ValidatorRegistry::with_defaults());
    validators.add(Rc::new(BrokenValidator), false);
    let form = BindingSet::builder().validators(validators).build().unwrap();
    form.set_data(&json!({"name": "Ada"}));
    let name = VirtualControl::new("input")
        .with_attribute("bind", "/name")
        .with_attribute("required", "")
        .with_attribute("broken", "")
        .into_ref();
    let name = bound(&form, &name);

    let validation = form.validate(None).await;
    let group = validation.group_for(name.id()).unwrap();
    assert_eq!(group.results.len(), 1);
    assert_eq!(group.results[0].name, "required");
    assert!(validation.is_valid);
    assert!(logs_contain("validator failed"));
    assert!(logs_contain("backend unavailable"));
}

#[tokio::test]
async fn test_unvisited_errors_are_hidden() {
    let form = BindingSet::new();
    let mut events = form.subscribe();
    form.set_data(&json!({"age": 300}));
    let age = number("/age").with_attribute("max", "65").into_ref();
    let control = bound(&form, &age);

    let validation = form.report_validity(None).await;
    assert!(!validation.is_valid);
    assert_eq!(validation.errors.len(), 1);
    assert!(validation.visible().is_empty());
    assert!(!validation.result[0].visited);
    assert!(age.attribute("aria-invalid").is_none());

    match events.try_recv() {
        Ok(FormEvent::ReportValidity(report)) => {
            assert!(!report.is_valid);
            assert!(report.errors.is_empty());
            assert_eq!(report.result.len(), 1);
        }
        other => panic!("expected a report, got {:?}", other),
    }

    form.control_visited(&control).await;
    assert_eq!(age.attribute("aria-invalid").as_deref(), Some("true"));
}

#[tokio::test]
async fn test_validate_subset_of_controls() {
    let form = BindingSet::new();
    form.set_data(&json!({"a": "", "b": ""}));
    let a = VirtualControl::new("input")
        .with_attribute("bind", "/a")
        .with_attribute("required", "")
        .into_ref();
    let b = VirtualControl::new("input").with_attribute("bind", "/b").into_ref();
    let a = bound(&form, &a);
    let b = bound(&form, &b);
    let stranger: ControlRef = VirtualControl::new("input").with_attribute("bind", "/c").into_ref();

    let optional = vec![b, stranger];
    assert!(form.check_validity(Some(optional.as_slice())).await);
    assert!(!form.check_validity(Some(std::slice::from_ref(&a))).await);
}

#[tokio::test]
async fn test_filter_validation_results() {
    let form = BindingSet::new();
    form.set_data(&json!({"a": "", "b": "x"}));
    for pointer in ["/a", "/b"] {
        let control = VirtualControl::new("input")
            .with_attribute("bind", pointer)
            .with_attribute("required", "")
            .into_ref();
        bound(&form, &control);
    }

    let validation = form.validate(None).await;
    let failing = ValidatorRegistry::filter_validation_results(&validation.result, |_, r| !r.valid);
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].pointer.as_ref().map(|p| p.as_str()), Some("/a"));
}

#[tokio::test]
async fn test_concurrent_reports_collapse() {
    let calls = Rc::new(Cell::new(0));
    let validators = Rc::new(ValidatorRegistry::new());
    validators.add(
        Rc::new(SlowCounter {
            calls: Rc::clone(&calls),
            delay: None,
        }),
        false,
    );
    let form = BindingSet::builder().validators(validators).build().unwrap();
    let mut events = form.subscribe();
    form.set_data(&json!({"name": "Ada"}));
    let name = VirtualControl::new("input").with_attribute("bind", "/name").into_ref();
    bound(&form, &name);

    let (first, second, third) = tokio::join!(
        form.report_validity(None),
        form.report_validity(None),
        form.report_validity(None),
    );
    assert!(first.is_valid && second.is_valid && third.is_valid);
    assert_eq!(calls.get(), 2);

    let mut reports = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, FormEvent::ReportValidity(_)) {
            reports += 1;
        }
    }
    assert_eq!(reports, 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_validator_times_out() {
    let validators = Rc::new(ValidatorRegistry::with_defaults());
    validators.add(
        Rc::new(SlowCounter {
            calls: Rc::new(Cell::new(0)),
            delay: Some(Duration::from_secs(30)),
        }),
        false,
    );
    let form = BindingSet::builder()
        .config(FormConfig::default().with_validator_timeout(Duration::from_millis(100)))
        .validators(validators)
        .build()
        .unwrap();
    form.set_data(&json!({"name": ""}));
    let name = VirtualControl::new("input")
        .with_attribute("bind", "/name")
        .with_attribute("required", "")
        .into_ref();
    let name = bound(&form, &name);

    let validation = form.validate(None).await;
    let group = validation.group_for(name.id()).unwrap();
    let names: Vec<&str> = group.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["required"]);
    assert!(!validation.is_valid);
}

#[tokio::test]
async fn test_prepended_validator_runs_first() {
    let validators = Rc::new(ValidatorRegistry::with_defaults());
    let calls = Rc::new(Cell::new(0));
    let counter: Rc<dyn Validator> = Rc::new(SlowCounter {
        calls: Rc::clone(&calls),
        delay: None,
    });
    validators.add(Rc::clone(&counter), true);
    assert_eq!(validators.names()[0], "slow-counter");

    let form = BindingSet::builder().validators(Rc::clone(&validators)).build().unwrap();
    form.set_data(&json!({"name": "Ada"}));
    let name = VirtualControl::new("input")
        .with_attribute("bind", "/name")
        .with_attribute("required", "")
        .into_ref();
    let name = bound(&form, &name);

    let validation = form.validate(None).await;
    let group = validation.group_for(name.id()).unwrap();
    assert_eq!(group.results[0].name, "slow-counter");

    validators.remove(&counter);
    let validation = form.validate(None).await;
    assert_eq!(validation.group_for(name.id()).unwrap().results.len(), 1);
    assert_eq!(calls.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_result_keeps_registration_slot() {
    let validators = Rc::new(ValidatorRegistry::new());
    validators.add(
        Rc::new(Delayed {
            name: "slow",
            delay: Duration::from_millis(50),
        }),
        false,
    );
    validators.add(
        Rc::new(Delayed {
            name: "fast",
            delay: Duration::from_millis(1),
        }),
        false,
    );
    let form = BindingSet::builder().validators(validators).build().unwrap();
    form.set_data(&json!({"name": "Ada"}));
    let name = VirtualControl::new("input").with_attribute("bind", "/name").into_ref();
    let name = bound(&form, &name);

    let validation = form.validate(None).await;
    let group = validation.group_for(name.id()).unwrap();
    let names: Vec<&str> = group.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["slow", "fast"]);
    assert!(validation.is_valid);
}
