//! Log severity levels
//!
//! The canonical name of each level doubles as the on-disk file stem, so the
//! rendering here is spelled out explicitly and must never change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of a recorded log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// Raised when a raw severity string names no known level
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log type '{0}'")]
pub struct SeverityParseError(pub String);

impl Severity {
    /// All levels in declaration order
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Canonical name, used for file names and display
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }

    /// Name of the file holding lines of this severity (e.g. `Info.log`)
    pub fn file_name(&self) -> String {
        format!("{}.log", self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SeverityParseError;

    /// Case-insensitive match on the canonical names.
    ///
    /// The browser client sends upper-case values ("INFO"), so exact-case
    /// matching would reject every one of its requests.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SeverityParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_is_stable() {
        assert_eq!(Severity::Debug.as_str(), "Debug");
        assert_eq!(Severity::Info.as_str(), "Info");
        assert_eq!(Severity::Warning.as_str(), "Warning");
        assert_eq!(Severity::Error.as_str(), "Error");
        assert_eq!(Severity::Fatal.as_str(), "Fatal");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(Severity::Info.file_name(), "Info.log");
        assert_eq!(Severity::Warning.file_name(), "Warning.log");
    }

    #[test]
    fn test_parse_canonical_names() {
        for level in Severity::ALL {
            assert_eq!(level.as_str().parse::<Severity>().unwrap(), level);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("INFO".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("fAtAl".parse::<Severity>().unwrap(), Severity::Fatal);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "Verbose".parse::<Severity>().unwrap_err();
        assert_eq!(err, SeverityParseError("Verbose".to_string()));
        assert!("".parse::<Severity>().is_err());
        assert!("Info ".parse::<Severity>().is_err());
        assert!("1".parse::<Severity>().is_err());
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(Severity::Error.to_string(), "Error");
    }
}
