//! Host runtime version numbers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// `MAJOR.MINOR` version of the authoring host.
///
/// Patch numbers are accepted when parsing and discarded; node and socket
/// vocabularies only ever change on minor releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostVersion {
    pub major: u16,
    pub minor: u16,
}

impl HostVersion {
    /// Version assumed when nothing else is configured.
    pub const DEFAULT: HostVersion = HostVersion::new(4, 1);

    /// Oldest version any table entry is keyed on.
    pub const BASELINE: HostVersion = HostVersion::new(2, 80);

    /// Releases whose vocabulary differs from the previous one, plus the
    /// default. Used to enumerate the mapping tables in tests and `vocab`.
    pub const KNOWN: &'static [HostVersion] = &[
        HostVersion::new(2, 80),
        HostVersion::new(3, 0),
        HostVersion::new(3, 3),
        HostVersion::new(3, 4),
        HostVersion::new(3, 6),
        HostVersion::new(4, 0),
        HostVersion::new(4, 1),
        HostVersion::new(4, 2),
    ];

    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl Default for HostVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for HostVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidHostVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let minor = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        if let Some(patch) = parts.next() {
            patch.parse::<u16>().map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor))
    }
}

impl TryFrom<String> for HostVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HostVersion> for String {
    fn from(value: HostVersion) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("4.1".parse::<HostVersion>().unwrap(), HostVersion::new(4, 1));
        assert_eq!("3.6.5".parse::<HostVersion>().unwrap(), HostVersion::new(3, 6));
        assert_eq!(HostVersion::new(2, 80).to_string(), "2.80");
        assert!("4".parse::<HostVersion>().is_err());
        assert!("four.one".parse::<HostVersion>().is_err());
        assert!("4.1.2.3".parse::<HostVersion>().is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(HostVersion::new(3, 4) < HostVersion::new(3, 10));
        assert!(HostVersion::new(2, 80) < HostVersion::new(3, 0));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&HostVersion::new(3, 4)).unwrap();
        assert_eq!(json, "\"3.4\"");
        let back: HostVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HostVersion::new(3, 4));
    }
}
