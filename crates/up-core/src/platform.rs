//! Host operating system family, used to pick `execute` commands

/// Operating system families distinguished by manifest `execute` items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// Linux and other Unix-likes
    Linux,
    /// macOS (shares the `linux` command)
    MacOs,
    /// Windows
    Windows,
    /// Anything else; no command applies
    Other,
}

impl OsFamily {
    /// Family of the running host
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::MacOs
        } else if cfg!(unix) {
            OsFamily::Linux
        } else {
            OsFamily::Other
        }
    }

    /// Whether commands run through a POSIX shell
    pub fn is_unix(self) -> bool {
        matches!(self, OsFamily::Linux | OsFamily::MacOs)
    }
}
