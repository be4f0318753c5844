use std::fmt;

use serde::Serialize;

/// Build metadata reported by `version` and `/_status/version`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BuildInfo {
    pub build_profile: String,
    pub build_features: String,
    pub version: String,
    pub build_timestamp: String,
    pub rust_version: String,
}

impl BuildInfo {
    /// Info for a crate compiled without the workspace build script.
    pub fn unknown() -> Self {
        Self {
            build_profile: "unknown".to_string(),
            build_features: "none".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_timestamp: "unknown".to_string(),
            rust_version: "unknown".to_string(),
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} build, features: {}, built {} with {})",
            self.version,
            self.build_profile,
            self.build_features,
            self.build_timestamp,
            self.rust_version
        )
    }
}

/// Capture [`BuildInfo`] from the environment the calling crate's build
/// script exported.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            build_profile: env!("BUILD_PROFILE").to_string(),
            build_features: env!("BUILD_FEATURES").to_string(),
            version: env!("REPO_VERSION").to_string(),
            build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
            rust_version: env!("RUST_VERSION").to_string(),
        }
    };
}
