//! Name-based method dispatch for helper components.
//!
//! Each component publishes a static table of the method names it services
//! (PascalCase, the plugin's own vocabulary) and decodes JSON arguments for
//! them. The facade probes components in a fixed order; see
//! [`Facade::call`](crate::Facade::call).

use std::time::Duration;

use serde_json::Value;

use crate::error::{FacadeError, Result};

pub trait Dispatch {
    /// Component name used in logs and in [`Facade::resolve`](crate::Facade::resolve).
    fn component(&self) -> &'static str;

    /// Every method name this component services.
    fn methods(&self) -> &'static [&'static str];

    fn responds_to(&self, method: &str) -> bool {
        self.methods().contains(&method)
    }

    /// Invoke a method listed in [`methods`](Self::methods).
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value>;
}

/// Positional argument decoding for [`Dispatch::invoke`] implementations.
pub(crate) struct Args<'a> {
    method: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub(crate) fn new(method: &'a str, values: &'a [Value]) -> Self {
        Self { method, values }
    }

    pub(crate) fn int(&self, index: usize) -> Result<i32> {
        self.values
            .get(index)
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| self.invalid(index, "integer"))
    }

    pub(crate) fn int_or(&self, index: usize, default: i32) -> Result<i32> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.int(index),
        }
    }

    pub(crate) fn float_or(&self, index: usize, default: f64) -> Result<f64> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| self.invalid(index, "number")),
        }
    }

    /// Seconds as a [`Duration`]; negative values clamp to zero.
    pub(crate) fn seconds_or(&self, index: usize, default: f64) -> Result<Duration> {
        let secs = self.float_or(index, default)?.max(0.0);
        Duration::try_from_secs_f64(secs).map_err(|_| self.invalid(index, "seconds in range"))
    }

    pub(crate) fn bool_or(&self, index: usize, default: bool) -> Result<bool> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value.as_bool().ok_or_else(|| self.invalid(index, "boolean")),
        }
    }

    pub(crate) fn string(&self, index: usize) -> Result<&'a str> {
        self.values
            .get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| self.invalid(index, "string"))
    }

    pub(crate) fn string_or(&self, index: usize, default: &'a str) -> Result<&'a str> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.string(index),
        }
    }

    pub(crate) fn optional_string(&self, index: usize) -> Result<Option<&'a str>> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(index).map(Some),
        }
    }

    pub(crate) fn optional_int(&self, index: usize) -> Result<Option<i32>> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.int(index).map(Some),
        }
    }

    fn invalid(&self, index: usize, expected: &'static str) -> FacadeError {
        FacadeError::InvalidArgument {
            method: self.method.to_string(),
            index,
            expected,
        }
    }
}

pub(crate) fn not_found(method: &str) -> FacadeError {
    FacadeError::MethodNotFound(method.to_string())
}
