//! Shared User-Agent string for listing and image requests.

/// Project identifier appended to the User-Agent.
const PROJECT_UA_TAG: &str = "io-strategy-benchmark";

/// Default User-Agent for every request the benchmark makes.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("image-bench/{version} ({PROJECT_UA_TAG})")
}
