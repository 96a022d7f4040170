//! Build version, with git metadata when available.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit SHA at build time, or "unknown" outside a checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// `0.1.0 (abc1234)`, `0.1.0 (abc1234, dirty)` or `0.1.0 (unknown)`.
pub fn version_string() -> String {
    let sha = &GIT_SHA[..7.min(GIT_SHA.len())];
    if git_dirty() {
        format!("{PKG_VERSION} ({sha}, dirty)")
    } else {
        format!("{PKG_VERSION} ({sha})")
    }
}

/// `User-Agent` sent with every provider request.
pub fn user_agent() -> String {
    format!("huginn/{PKG_VERSION}")
}
