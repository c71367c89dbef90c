//! Step versions
//!
//! A manifest step is tagged with a `(major, minor)` pair, conventionally
//! year and week. Versions compare lexicographically: major first, then minor.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of one manifest step
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct StepVersion {
    /// Major component (year)
    pub major: i32,
    /// Minor component (week)
    pub minor: i32,
}

impl StepVersion {
    /// Create a new version
    pub const fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }

    /// The version that sorts immediately before this one on the minor axis.
    ///
    /// Used as a baseline so that a step tagged exactly `self` becomes eligible.
    pub const fn before(self) -> Self {
        Self {
            major: self.major,
            minor: self.minor.saturating_sub(1),
        }
    }

    /// Parse a forced starting point expressed as `YYYY/WW`.
    ///
    /// Both components must be present and positive.
    pub fn parse_force(s: &str) -> CoreResult<Self> {
        let version: StepVersion = s.parse()?;
        if version.major <= 0 || version.minor <= 0 {
            return Err(CoreError::InvalidVersion {
                value: s.to_string(),
                reason: "major and minor must both be positive".to_string(),
            });
        }
        Ok(version)
    }
}

impl FromStr for StepVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidVersion {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (major, minor) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected YYYY/WW (e.g. 2014/21)"))?;
        let major = major
            .trim()
            .parse::<i32>()
            .map_err(|_| invalid("major is not a number"))?;
        let minor = minor
            .trim()
            .parse::<i32>()
            .map_err(|_| invalid("minor is not a number"))?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for StepVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.major, self.minor)
    }
}
