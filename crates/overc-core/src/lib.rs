use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub mod bus;
pub mod events;
pub mod history;
pub mod scope;
pub mod status;

pub use bus::{EventBus, Subscription};
pub use events::{DashboardEvent, EventKind, StatusBarUpdate};
pub use history::{ExpandedGroups, LookbackWindow, StatesQuery};
pub use scope::{RouteParams, Scope, ScopeError};
pub use status::{
    AlertRecord, AlertsPayload, ItemRef, ServerSummary, ServiceState, ServiceSummary, StateAlert,
    StateRecord, StatesPayload, Stats, StatsChange, StatusSnapshot,
};

/// Service severity as reported by the backend.
///
/// The wire form is one of `OK`, `WARN`, `FAIL`, `UNK`. Anything else is a
/// data contract violation; it is kept verbatim so it can be shown and
/// round-tripped, and is never treated as an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    Ok,
    Warn,
    Fail,
    Unknown,
    Unrecognized(String),
}

impl Default for Severity {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Ok => "OK",
            Severity::Warn => "WARN",
            Severity::Fail => "FAIL",
            Severity::Unknown => "UNK",
            Severity::Unrecognized(raw) => raw.as_str(),
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "OK" => Severity::Ok,
            "WARN" => Severity::Warn,
            "FAIL" => Severity::Fail,
            "UNK" | "UNKNOWN" => Severity::Unknown,
            other => Severity::Unrecognized(other.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Severity::Unrecognized(_))
    }

    pub fn presentation(&self) -> PresentationClass {
        PresentationClass::for_severity(self)
    }

    /// Same mapping as [`Severity::presentation`] without the contract
    /// warning, for callers that run every frame.
    pub fn class(&self) -> PresentationClass {
        PresentationClass::of(self)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = std::convert::Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(Severity::from_wire(input))
    }
}

impl Serialize for Severity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Never fails: a non-string value is kept as its JSON text.
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Severity::Unknown,
            serde_json::Value::String(raw) => Severity::from_wire(&raw),
            other => Severity::Unrecognized(other.to_string()),
        })
    }
}

/// Presentation class attached to a severity at the rendering boundary.
///
/// The mapping is a compatibility contract with any backend:
/// `OK -> success`, `WARN -> warning`, `FAIL -> danger`, `UNK -> default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationClass {
    Success,
    Warning,
    Danger,
    Default,
}

impl PresentationClass {
    /// Maps a severity and logs a contract violation for unmapped values.
    pub fn for_severity(severity: &Severity) -> Self {
        if let Severity::Unrecognized(raw) = severity {
            warn!(
                event = "severity_contract_violation",
                severity = %raw,
                "unmapped severity, using neutral presentation"
            );
        }
        Self::of(severity)
    }

    pub fn of(severity: &Severity) -> Self {
        match severity {
            Severity::Ok => PresentationClass::Success,
            Severity::Warn => PresentationClass::Warning,
            Severity::Fail => PresentationClass::Danger,
            Severity::Unknown | Severity::Unrecognized(_) => PresentationClass::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationClass::Success => "success",
            PresentationClass::Warning => "warning",
            PresentationClass::Danger => "danger",
            PresentationClass::Default => "default",
        }
    }
}

impl fmt::Display for PresentationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deserialize an ID that can be either a string or a number into a String
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val: serde_json::Value = serde_json::Value::deserialize(deserializer)?;
    match val {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("expected string or number for id")),
    }
}

pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: serde_json::Value = serde_json::Value::deserialize(deserializer)?;
    match val {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(serde::de::Error::custom(
            "expected string, number or null for id",
        )),
    }
}
