//! Syslog message severities as defined by RFC 5424 section 6.2.1.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The eight standard syslog severities.
///
/// Variants are declared in code order, so the derived ordering runs from most
/// urgent (`Emergency`, code 0) to least urgent (`Debug`, code 7).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// System is unusable.
    Emergency,
    /// Action must be taken immediately.
    Alert,
    /// Critical conditions.
    Critical,
    /// Error conditions.
    Error,
    /// Warning conditions.
    Warning,
    /// Normal but significant condition.
    Notice,
    /// Informational messages.
    #[default]
    Informational,
    /// Debug-level messages.
    Debug,
}

impl Severity {
    /// All severities in ascending code order.
    pub const ALL: [Severity; 8] = [
        Severity::Emergency,
        Severity::Alert,
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Informational,
        Severity::Debug,
    ];

    /// Numeric RFC 5424 code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Canonical upper-case name, as rendered on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Emergency => "EMERGENCY",
            Severity::Alert => "ALERT",
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Notice => "NOTICE",
            Severity::Informational => "INFORMATIONAL",
            Severity::Debug => "DEBUG",
        }
    }

    /// Parse `s`, falling back to [`Severity::Informational`].
    pub fn parse_or_informational(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names none of the eight severities.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown syslog severity '{0}'")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    /// Matching is case-insensitive against the canonical names only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSeverityError(s.to_owned()))
    }
}
