//! Validated values that may be interpolated into a command line.
//!
//! Construction is the only way in: each newtype checks its input against a
//! strict pattern or allow-list and returns `InvalidParameter` otherwise.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{CoreError, Result};

/// Windows services the tool knows how to reconfigure.
pub const KNOWN_SERVICES: &[&str] = &[
    "DiagTrack",
    "dmwappushservice",
    "SysMain",
    "WSearch",
    "MapsBroker",
    "Fax",
    "RetailDemo",
    "WerSvc",
    "XblAuthManager",
    "XblGameSave",
    "XboxNetApiSvc",
    "XboxGipSvc",
    "wuauserv",
    "BITS",
    "TrkWks",
    "PcaSvc",
];

/// Store apps the debloat recipe may remove, matched as `*<name>*`.
pub const KNOWN_APPS: &[&str] = &[
    "BingWeather",
    "GetHelp",
    "Getstarted",
    "Microsoft3DViewer",
    "MicrosoftOfficeHub",
    "MicrosoftSolitaireCollection",
    "MixedReality.Portal",
    "People",
    "SkypeApp",
    "WindowsFeedbackHub",
    "WindowsMaps",
    "ZuneMusic",
    "ZuneVideo",
];

fn invalid(kind: &'static str, value: &str) -> CoreError {
    CoreError::InvalidParameter {
        kind,
        value: value.to_string(),
    }
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).unwrap())
        }
    };
}

pattern!(profile_re, r"^[A-Za-z0-9][A-Za-z0-9 _\-]{0,63}$");
pattern!(exe_re, r"^[A-Za-z0-9_.\-]+\.exe$");
pattern!(
    host_re,
    r"^[A-Za-z0-9]([A-Za-z0-9\-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9\-]{0,61}[A-Za-z0-9])?)*$"
);
pattern!(restore_re, r"^[A-Za-z0-9 _.\-]{1,64}$");

macro_rules! newtype_str {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// DriveLetter
// ---------------------------------------------------------------------------

/// A single drive letter, normalized to uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriveLetter(char);

impl DriveLetter {
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.strip_suffix(':').unwrap_or(value);
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(Self(c.to_ascii_uppercase())),
            _ => Err(invalid("drive letter", value)),
        }
    }

    pub fn letter(self) -> char {
        self.0
    }

    /// `C:`
    pub fn volume(self) -> String {
        format!("{}:", self.0)
    }
}

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ServiceName
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceName(String);

impl ServiceName {
    /// Accepts only names in `KNOWN_SERVICES`, matched case-insensitively and
    /// normalized to the registry spelling.
    pub fn parse(value: &str) -> Result<Self> {
        KNOWN_SERVICES
            .iter()
            .find(|known| known.eq_ignore_ascii_case(value))
            .map(|known| Self((*known).to_string()))
            .ok_or_else(|| invalid("service", value))
    }
}

newtype_str!(ServiceName);

// ---------------------------------------------------------------------------
// AppName
// ---------------------------------------------------------------------------

/// A store app package fragment from `KNOWN_APPS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppName(String);

impl AppName {
    pub fn parse(value: &str) -> Result<Self> {
        KNOWN_APPS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(value))
            .map(|known| Self((*known).to_string()))
            .ok_or_else(|| invalid("app", value))
    }
}

newtype_str!(AppName);

// ---------------------------------------------------------------------------
// ProfileName
// ---------------------------------------------------------------------------

/// QoS policy name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileName(String);

impl ProfileName {
    pub fn parse(value: &str) -> Result<Self> {
        if profile_re().is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(invalid("profile name", value))
        }
    }
}

newtype_str!(ProfileName);

// ---------------------------------------------------------------------------
// ExecutableName
// ---------------------------------------------------------------------------

/// Bare `name.exe`, no directory components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutableName(String);

impl ExecutableName {
    pub fn parse(value: &str) -> Result<Self> {
        if exe_re().is_match(value) && !value.starts_with('.') {
            Ok(Self(value.to_string()))
        } else {
            Err(invalid("executable", value))
        }
    }
}

newtype_str!(ExecutableName);

// ---------------------------------------------------------------------------
// HostName
// ---------------------------------------------------------------------------

/// DNS name or dotted IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostName(String);

impl HostName {
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() <= 253 && host_re().is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(invalid("host", value))
        }
    }
}

newtype_str!(HostName);

// ---------------------------------------------------------------------------
// RestorePointDescription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestorePointDescription(String);

impl RestorePointDescription {
    pub fn parse(value: &str) -> Result<Self> {
        if restore_re().is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(invalid("restore point description", value))
        }
    }
}

newtype_str!(RestorePointDescription);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_letter_normalizes() {
        assert_eq!(DriveLetter::parse("c").unwrap().volume(), "C:");
        assert_eq!(DriveLetter::parse("D:").unwrap().letter(), 'D');
    }

    #[test]
    fn drive_letter_rejects_injection() {
        for bad in ["C: & del", "", "CD", "1", "C:\\", "\"C\""] {
            assert!(DriveLetter::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn service_must_be_known() {
        assert_eq!(ServiceName::parse("sysmain").unwrap().as_str(), "SysMain");
        let err = ServiceName::parse("svc; rm").unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter { kind: "service", .. }));
        assert!(ServiceName::parse("Spooler").is_err());
    }

    #[test]
    fn app_must_be_known() {
        assert!(AppName::parse("ZuneMusic").is_ok());
        assert!(AppName::parse("*").is_err());
    }

    #[test]
    fn profile_name_rules() {
        assert!(ProfileName::parse("NeuroCore").is_ok());
        assert!(ProfileName::parse("Game Mode_2").is_ok());
        let long = "n".repeat(65);
        for bad in ["", " lead", "x'; Remove-Item", "a\"b", long.as_str()] {
            assert!(ProfileName::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn executable_rules() {
        assert!(ExecutableName::parse("game.exe").is_ok());
        for bad in ["game", "C:\\game.exe", "../game.exe", ".exe", "a b.exe", "x.exe;calc"] {
            assert!(ExecutableName::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn host_rules() {
        for good in ["8.8.8.8", "one.one.one.one", "localhost", "a-b.example"] {
            assert!(HostName::parse(good).is_ok(), "rejected {good:?}");
        }
        for bad in ["", "-a.com", "a..b", "8.8.8.8 -t", "host;ls", "a.com/"] {
            assert!(HostName::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn restore_description_rules() {
        assert!(RestorePointDescription::parse("NeuroCore Optimization").is_ok());
        assert!(RestorePointDescription::parse("it's").is_err());
        assert!(RestorePointDescription::parse("").is_err());
    }
}
