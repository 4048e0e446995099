use std::fmt;

use serde::Serialize;

/// Build metadata captured by `build.rs` at compile time
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub build_profile: &'static str,
    pub version: &'static str,
    pub repo_version: &'static str,
    pub rust_version: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        build_profile: env!("BUILD_PROFILE"),
        version: env!("CARGO_PKG_VERSION"),
        repo_version: env!("REPO_VERSION"),
        rust_version: env!("RUST_VERSION"),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bookwire {} ({}, {}) built with {}",
            self.version, self.repo_version, self.build_profile, self.rust_version
        )
    }
}
