//! # Types
//!
//! Platform-agnostic types used throughout the supervisor.
//!
//! These types abstract away raw integers, allowing the rest of the code to
//! work with concepts like "return address" and "process ID" without mixing
//! them up with sizes, counts, or file descriptors.

pub mod address;
pub mod process;

// Re-export all public types
pub use address::Address;
pub use process::ProcessId;
