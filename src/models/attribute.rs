//! Remote-messaging matching attributes.
//!
//! A remote message carries targeting rules as a JSON object of attribute
//! keys to values. Each recognized key maps to exactly one
//! [`MatchingAttribute`] variant; coercion of the raw value is checked and a
//! wrong type is reported as [`Error::TypeMismatch`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Key of the "VPN onboarded" attribute.
pub const VPN_ONBOARDED_KEY: &str = "netpOnboarded";
/// Key of the app version range attribute.
pub const APP_VERSION_KEY: &str = "appVersion";
/// Key of the locale attribute.
pub const LOCALE_KEY: &str = "locale";

/// A typed targeting predicate.
///
/// Immutable once mapped; evaluation reads live state and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchingAttribute {
    /// Whether the VPN has completed onboarding.
    VpnOnboarded {
        /// Expected onboarding state.
        remote_value: bool,
    },
    /// Inclusive app version code range. A missing bound is unbounded.
    AppVersion {
        /// Lowest matching version code.
        min: Option<i64>,
        /// Highest matching version code.
        max: Option<i64>,
    },
    /// Device locale is one of the listed values.
    Locale {
        /// Accepted locales, for example `en-US`.
        values: Vec<String>,
    },
}

impl MatchingAttribute {
    /// Returns the JSON key this variant is mapped from.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::VpnOnboarded { .. } => VPN_ONBOARDED_KEY,
            Self::AppVersion { .. } => APP_VERSION_KEY,
            Self::Locale { .. } => LOCALE_KEY,
        }
    }
}

/// Raw attribute value as it appears in a remote message.
///
/// Both the bare form (`{"netpOnboarded": true}`) and the object form
/// (`{"netpOnboarded": {"value": true}}`, `{"appVersion": {"min": 5}}`) are
/// accepted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonMatchingAttribute {
    /// Scalar or list value.
    pub value: Option<Value>,
    /// Lower range bound.
    pub min: Option<Value>,
    /// Upper range bound.
    pub max: Option<Value>,
}

impl JsonMatchingAttribute {
    /// Wraps a bare value.
    #[must_use]
    pub fn from_scalar(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Reads a raw JSON attribute value.
    ///
    /// Objects carrying any of `value`, `min` or `max` are read field by
    /// field; every other value (including other objects) becomes `value`.
    #[must_use]
    pub fn from_json(raw: &Value) -> Self {
        match raw {
            Value::Object(map)
                if ["value", "min", "max"].iter().any(|k| map.contains_key(*k)) =>
            {
                Self {
                    value: map.get("value").cloned(),
                    min: map.get("min").cloned(),
                    max: map.get("max").cloned(),
                }
            },
            other => Self::from_scalar(other.clone()),
        }
    }

    /// Coerces `value` to a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` is missing or not a boolean.
    pub fn as_bool(&self, key: &str) -> Result<bool> {
        self.value
            .as_ref()
            .and_then(Value::as_bool)
            .ok_or_else(|| mismatch(key, "a boolean"))
    }

    /// Coerces `min`/`max` (or a bare numeric `value`, as an exact match) to
    /// an integer range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if a bound is present but not an
    /// integer, or if no bound is present at all.
    pub fn as_int_range(&self, key: &str) -> Result<(Option<i64>, Option<i64>)> {
        let bound = |v: Option<&Value>| -> Result<Option<i64>> {
            match v {
                None | Some(Value::Null) => Ok(None),
                Some(v) => v
                    .as_i64()
                    .map(Some)
                    .ok_or_else(|| mismatch(key, "an integer range")),
            }
        };

        let min = bound(self.min.as_ref())?;
        let max = bound(self.max.as_ref())?;
        if min.is_some() || max.is_some() {
            return Ok((min, max));
        }

        match bound(self.value.as_ref())? {
            Some(exact) => Ok((Some(exact), Some(exact))),
            None => Err(mismatch(key, "an integer range")),
        }
    }

    /// Coerces `value` to a list of strings. A single string is a
    /// one-element list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` is missing, or is neither a
    /// string nor an array of strings.
    pub fn as_string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.value.as_ref() {
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(ToString::to_string)
                        .ok_or_else(|| mismatch(key, "a string list"))
                })
                .collect(),
            _ => Err(mismatch(key, "a string list")),
        }
    }
}

fn mismatch(key: &str, expected: &'static str) -> Error {
    Error::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}
