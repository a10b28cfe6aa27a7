//! Platform taxonomy for capability matching.
//!
//! Platform values form a two-level family tree (Windows and Unix families
//! plus the `Any` wildcard), and requested platforms are matched against
//! provided ones through "is a" queries over that tree.

use std::fmt;

/// A requested or provided platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Any Windows release.
    Windows,
    /// Windows XP.
    Xp,
    /// Windows Vista.
    Vista,
    /// Windows 8.
    Win8,
    /// Windows 10.
    Win10,
    /// Any Unix-like system.
    Unix,
    /// Linux.
    Linux,
    /// macOS.
    Mac,
    /// Wildcard; satisfied by everything.
    Any,
}

impl Platform {
    /// The family this platform belongs to, if it is a leaf.
    pub fn family(self) -> Option<Platform> {
        match self {
            Platform::Xp | Platform::Vista | Platform::Win8 | Platform::Win10 => {
                Some(Platform::Windows)
            },
            Platform::Linux | Platform::Mac => Some(Platform::Unix),
            Platform::Windows | Platform::Unix | Platform::Any => None,
        }
    }

    /// One-directional "is a" query: true when `self` is `other`, belongs to
    /// the `other` family, or `other` is the wildcard.
    pub fn is(self, other: Platform) -> bool {
        self == other || other == Platform::Any || self.family() == Some(other)
    }

    /// Bidirectional family match, the form capability scoring uses: a
    /// request for `Windows` is satisfied by a `Win10` backend and a request
    /// for `Win10` is family-related to a `Windows` backend.
    pub fn matches(self, other: Platform) -> bool {
        self.is(other) || other.is(self)
    }

    /// Parse a platform capability value. Case-insensitive; unrecognized
    /// names yield `None` so scoring treats them as a plain string mismatch.
    pub fn from_name(name: &str) -> Option<Platform> {
        match name.to_ascii_lowercase().as_str() {
            "windows" | "win" => Some(Platform::Windows),
            "xp" | "windows xp" => Some(Platform::Xp),
            "vista" | "windows vista" => Some(Platform::Vista),
            "win8" | "windows 8" => Some(Platform::Win8),
            "win10" | "windows 10" => Some(Platform::Win10),
            "unix" => Some(Platform::Unix),
            "linux" => Some(Platform::Linux),
            "mac" | "macos" | "darwin" => Some(Platform::Mac),
            "any" | "*" | "" => Some(Platform::Any),
            _ => None,
        }
    }

    /// The platform this process is running on.
    pub fn current() -> Platform {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Unix
        }
    }

    /// Canonical capability value.
    pub fn name(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Xp => "xp",
            Platform::Vista => "vista",
            Platform::Win8 => "win8",
            Platform::Win10 => "win10",
            Platform::Unix => "unix",
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Any => "any",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_membership() {
        assert!(Platform::Win10.is(Platform::Windows));
        assert!(Platform::Linux.is(Platform::Unix));
        assert!(!Platform::Linux.is(Platform::Windows));
        assert!(Platform::Mac.is(Platform::Any));
    }

    #[test]
    fn test_bidirectional_match() {
        // Both directions of the family relation count as a match.
        assert!(Platform::Windows.matches(Platform::Win10));
        assert!(Platform::Win10.matches(Platform::Windows));
        assert!(!Platform::Win10.matches(Platform::Linux));
    }

    #[test]
    fn test_name_parsing() {
        assert_eq!(Platform::from_name("LINUX"), Some(Platform::Linux));
        assert_eq!(Platform::from_name("Windows 10"), Some(Platform::Win10));
        assert_eq!(Platform::from_name("*"), Some(Platform::Any));
        assert_eq!(Platform::from_name("beos"), None);
    }
}
