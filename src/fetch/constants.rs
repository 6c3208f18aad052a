//! Constants for the fetch module (timeouts, simulated payloads).

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total request timeout (30 seconds), covering the body read.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default payload size written by the simulated fetcher (4 KiB).
pub const SIMULATED_PAYLOAD_BYTES: u64 = 4096;
