//! Host command-line length limits.
//!
//! Re-staging splits `git add` invocations so that no single command line
//! exceeds what the host OS accepts. The limit is resolved once per run and
//! passed explicitly to the re-stager.

use std::fmt;

/// Maximum command-line length, in bytes, used to size `git add` batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MaxCommandLength(usize);

impl MaxCommandLength {
    /// `ARG_MAX` on macOS.
    pub const MACOS: Self = Self(262_144);
    /// `cmd.exe` limit on Windows.
    pub const WINDOWS: Self = Self(8191);
    /// Conservative default for Linux and other Unix systems.
    pub const OTHER: Self = Self(131_072);

    /// An explicit limit. Zero is clamped to one so batch sizing never
    /// divides by zero.
    #[must_use]
    pub const fn new(bytes: usize) -> Self {
        if bytes == 0 { Self(1) } else { Self(bytes) }
    }

    /// The limit for an OS named as in [`std::env::consts::OS`].
    #[must_use]
    pub fn for_os(os: &str) -> Self {
        match os {
            "macos" => Self::MACOS,
            "windows" => Self::WINDOWS,
            _ => Self::OTHER,
        }
    }

    /// The limit for the host OS.
    #[must_use]
    pub fn host() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    /// The configured override if any, otherwise the host default.
    #[must_use]
    pub fn resolve(configured: Option<usize>) -> Self {
        configured.map_or_else(Self::host, Self::new)
    }

    /// The limit in bytes.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for MaxCommandLength {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for MaxCommandLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
