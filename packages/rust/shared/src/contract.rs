//! Validation contracts for values crossing a step boundary.
//!
//! Every contract returns a [`Validated`] outcome instead of an error so that
//! malformed model output is an ordinary value the caller must handle. A
//! [`Checker`] accumulates [`Violation`]s while a draft is converted into its
//! validated domain type; conversion only succeeds when nothing was recorded.

use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// One broken constraint, addressed by a JSON-path-like location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Tagged result of validating a value against a contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated<T> {
    Valid(T),
    Invalid(Vec<Violation>),
}

impl<T> Validated<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Contract trait
// ---------------------------------------------------------------------------

/// A loosely-typed draft that can be validated into a domain value.
pub trait Contract: Sized {
    /// The validated domain type.
    type Valid;

    /// Contract name used in diagnostics.
    const NAME: &'static str;

    /// Check every constraint, recording violations under `path`.
    /// Returns `None` only when the value cannot be built at all.
    fn check(self, path: &str, checker: &mut Checker) -> Option<Self::Valid>;

    fn validate(self) -> Validated<Self::Valid> {
        let mut checker = Checker::default();
        let value = self.check("$", &mut checker);
        checker.finish(value)
    }
}

/// Validate `value` against its contract.
pub fn validate<C: Contract>(value: C) -> Validated<C::Valid> {
    value.validate()
}

/// Deserialize loose JSON into a draft, then validate it.
pub fn validate_json<C>(value: Value) -> Validated<C::Valid>
where
    C: Contract + DeserializeOwned,
{
    match serde_json::from_value::<C>(value) {
        Ok(draft) => draft.validate(),
        Err(e) => Validated::Invalid(vec![Violation {
            path: "$".into(),
            message: format!("does not match {} shape: {e}", C::NAME),
        }]),
    }
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

/// Accumulates violations while a draft is converted.
#[derive(Debug, Default)]
pub struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// `Valid` only when no violation was recorded and a value was built.
    pub fn finish<T>(self, value: Option<T>) -> Validated<T> {
        match value {
            Some(v) if self.violations.is_empty() => Validated::Valid(v),
            Some(_) => Validated::Invalid(self.violations),
            None if self.violations.is_empty() => Validated::Invalid(vec![Violation {
                path: "$".into(),
                message: "value could not be constructed".into(),
            }]),
            None => Validated::Invalid(self.violations),
        }
    }

    /// Required string with at least one non-whitespace character.
    pub fn non_empty(&mut self, path: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.to_string()),
            Some(_) => {
                self.push(path, "must not be empty");
                None
            }
            None => {
                self.push(path, "is required");
                None
            }
        }
    }

    /// Required integer within `min..=max`. Whole floats and numeric strings count.
    pub fn int_in_range(&mut self, path: &str, value: Option<&Value>, min: i64, max: i64) -> Option<i64> {
        let Some(value) = value else {
            self.push(path, "is required");
            return None;
        };
        match as_integer(value) {
            Some(n) if (min..=max).contains(&n) => Some(n),
            Some(n) => {
                self.push(path, format!("{n} is outside {min}..={max}"));
                None
            }
            None => {
                self.push(path, format!("expected an integer, got {value}"));
                None
            }
        }
    }

    /// Optional number within `min..=max`; `null` or absent is fine.
    pub fn optional_number_in_range(
        &mut self,
        path: &str,
        value: Option<&Value>,
        min: f64,
        max: f64,
    ) -> Option<f64> {
        let value = value.filter(|v| !v.is_null())?;
        match as_number(value) {
            Some(n) if n >= min && n <= max => Some(n),
            Some(n) => {
                self.push(path, format!("{n} is outside {min}..={max}"));
                None
            }
            None => {
                self.push(path, format!("expected a number, got {value}"));
                None
            }
        }
    }

    /// Optional non-negative integer; `null` or absent is fine.
    pub fn optional_count(&mut self, path: &str, value: Option<&Value>) -> Option<u32> {
        let value = value.filter(|v| !v.is_null())?;
        match as_integer(value) {
            Some(n) if n >= 0 => u32::try_from(n).ok().or_else(|| {
                self.push(path, format!("{n} is too large"));
                None
            }),
            Some(n) => {
                self.push(path, format!("{n} must not be negative"));
                None
            }
            None => {
                self.push(path, format!("expected an integer, got {value}"));
                None
            }
        }
    }

    /// Member of a closed enumeration, parsed with `FromStr`.
    pub fn one_of<E: FromStr>(&mut self, path: &str, value: &str, allowed: &[&str]) -> Option<E> {
        match value.trim().parse::<E>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.push(
                    path,
                    format!("{value:?} is not one of {}", allowed.join("|")),
                );
                None
            }
        }
    }

    /// Exact cardinality check for a sequence.
    pub fn exactly<T>(&mut self, path: &str, items: &[T], expected: usize) -> bool {
        if items.len() == expected {
            true
        } else {
            self.push(
                path,
                format!("expected exactly {expected} items, got {}", items.len()),
            );
            false
        }
    }

    /// Well-formed absolute http(s) URL.
    pub fn url(&mut self, path: &str, value: &str) -> Option<Url> {
        match Url::parse(value.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            Ok(url) => {
                self.push(path, format!("unsupported scheme {:?}", url.scheme()));
                None
            }
            Err(e) => {
                self.push(path, format!("malformed URL: {e}"));
                None
            }
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}
