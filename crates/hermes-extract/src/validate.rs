//! Structural validation of the primary value.
//!
//! [`Validate`] is the seam for structural validators: given a decoded value,
//! return zero or more [`FieldViolation`]s. [`Violations`] builds them for the
//! common tags (`required`, `min`, `max`, `len`, `oneof`), and
//! [`violations_to_error`] turns a non-empty list into one `ValidationFailed`
//! error with one entry per field.
//!
//! ```rust
//! use hermes_extract::{Validate, FieldViolation, Violations};
//!
//! struct CreateUser {
//!     name: String,
//!     age: u8,
//! }
//!
//! impl Validate for CreateUser {
//!     fn validate(&self) -> Vec<FieldViolation> {
//!         let mut v = Violations::new("CreateUser");
//!         v.required("Name", !self.name.is_empty())
//!             .min("Age", self.age, 18);
//!         v.finish()
//!     }
//! }
//!
//! let violations = CreateUser { name: String::new(), age: 30 }.validate();
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations[0].namespace, "CreateUser.Name");
//! assert_eq!(violations[0].tag, "required");
//! ```

use hermes_core::{ApiError, Error, ErrorKind};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Dotted path from the root type, e.g. `CreateUser.Address.Zip`.
    pub namespace: String,
    /// The field name.
    pub field: String,
    /// The failed constraint tag, e.g. `required`.
    pub tag: String,
    /// The constraint parameter, e.g. `18` for `min=18`.
    pub param: Option<String>,
}

impl FieldViolation {
    /// Creates a violation without a parameter.
    #[must_use]
    pub fn new(namespace: impl Into<String>, field: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            field: field.into(),
            tag: tag.into(),
            param: None,
        }
    }

    /// Sets the parameter.
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// Human-readable message for the client.
    #[must_use]
    pub fn message(&self) -> String {
        let param = self.param.as_deref().unwrap_or_default();
        match self.tag.as_str() {
            "required" => format!("{} is required", self.field),
            "min" => format!("{} must be at least {param}", self.field),
            "max" => format!("{} must be at most {param}", self.field),
            "len" => format!("{} must have length {param}", self.field),
            "oneof" => format!("{} must be one of [{param}]", self.field),
            tag => format!("{} failed on the '{tag}' tag", self.field),
        }
    }

    pub(crate) fn to_api_error(&self) -> ApiError {
        let mut entry = ApiError::new(StatusCode::BAD_REQUEST, self.message())
            .with_metadata("key", self.namespace.as_str())
            .with_metadata("field", self.field.as_str())
            .with_metadata("tag", self.tag.as_str());
        if let Some(param) = &self.param {
            entry = entry.with_metadata("param", param.as_str());
        }
        entry
    }
}

/// Structural validation of a decoded value.
pub trait Validate {
    /// Returns every failed constraint; empty when valid.
    fn validate(&self) -> Vec<FieldViolation>;
}

/// Accumulates violations for one type.
#[derive(Debug, Clone)]
pub struct Violations {
    namespace: String,
    list: Vec<FieldViolation>,
}

impl Violations {
    /// Starts a collection rooted at `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            namespace: type_name.into(),
            list: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, tag: &str, param: Option<String>) -> &mut Self {
        self.list.push(FieldViolation {
            namespace: format!("{}.{field}", self.namespace),
            field: field.to_string(),
            tag: tag.to_string(),
            param,
        });
        self
    }

    /// Records `required` unless `present`.
    pub fn required(&mut self, field: &str, present: bool) -> &mut Self {
        if present {
            return self;
        }
        self.push(field, "required", None)
    }

    /// Records `min` when `value < min`.
    pub fn min<N: PartialOrd + Display>(&mut self, field: &str, value: N, min: N) -> &mut Self {
        if value < min {
            return self.push(field, "min", Some(min.to_string()));
        }
        self
    }

    /// Records `max` when `value > max`.
    pub fn max<N: PartialOrd + Display>(&mut self, field: &str, value: N, max: N) -> &mut Self {
        if value > max {
            return self.push(field, "max", Some(max.to_string()));
        }
        self
    }

    /// Records `len` when `actual != expected`.
    pub fn length(&mut self, field: &str, actual: usize, expected: usize) -> &mut Self {
        if actual != expected {
            return self.push(field, "len", Some(expected.to_string()));
        }
        self
    }

    /// Records `oneof` when `value` is not in `allowed`.
    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            return self.push(field, "oneof", Some(allowed.join(" ")));
        }
        self
    }

    /// Records a custom tag when `ok` is false.
    pub fn check(&mut self, field: &str, tag: &str, ok: bool) -> &mut Self {
        if ok {
            return self;
        }
        self.push(field, tag, None)
    }

    /// Validates a nested value, prefixing its namespaces with this field.
    pub fn nested<V: Validate + ?Sized>(&mut self, field: &str, value: &V) -> &mut Self {
        for mut violation in value.validate() {
            let tail = violation
                .namespace
                .split_once('.')
                .map_or(violation.namespace.as_str(), |(_, rest)| rest)
                .to_string();
            violation.namespace = format!("{}.{field}.{tail}", self.namespace);
            self.list.push(violation);
        }
        self
    }

    /// Returns the collected violations.
    #[must_use]
    pub fn finish(self) -> Vec<FieldViolation> {
        self.list
    }
}

/// Converts violations into one `ValidationFailed` error, or `Ok` when empty.
#[track_caller]
pub fn violations_to_error(violations: &[FieldViolation]) -> Result<(), Error> {
    if violations.is_empty() {
        return Ok(());
    }
    Err(Error::from_entries(
        ErrorKind::ValidationFailed,
        violations.iter().map(FieldViolation::to_api_error),
    )
    .with_log_field("violations", violations.len()))
}

macro_rules! impl_validate_noop {
    ($($t:ty),* $(,)?) => {
        $(
            impl Validate for $t {
                fn validate(&self) -> Vec<FieldViolation> {
                    Vec::new()
                }
            }
        )*
    };
}

impl_validate_noop!(
    (),
    crate::NoBody,
    serde_json::Value,
    String,
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
);

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Vec<FieldViolation> {
        self.as_ref().map(Validate::validate).unwrap_or_default()
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Vec<FieldViolation> {
        self.iter().flat_map(Validate::validate).collect()
    }
}

impl<T: Validate + ?Sized> Validate for Box<T> {
    fn validate(&self) -> Vec<FieldViolation> {
        (**self).validate()
    }
}
