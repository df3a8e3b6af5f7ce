//! Crate-wide error type for the one fallible operation the core exposes:
//! reserving the backing mapping for a heap. Every other failure mode
//! (running out of space after a full collection cycle, a malformed
//! object tag, a request for a second mutator) is treated as a
//! programming or corruption bug and aborts via `panic!` rather than
//! being something a caller can recover from.

use std::fmt;

/// Returned by a heap constructor when the initial `mmap` fails.
#[derive(Debug)]
pub struct GcInitError(pub std::io::Error);

impl fmt::Display for GcInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to map garbage-collected heap: {}", self.0)
    }
}

impl std::error::Error for GcInitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for GcInitError {
    fn from(e: std::io::Error) -> Self {
        GcInitError(e)
    }
}
