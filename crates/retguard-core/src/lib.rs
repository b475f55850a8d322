//! # retguard-core
//!
//! Shadow call stack engine and traced-process supervision for Retguard.
//!
//! This crate enforces control-flow integrity on an unmodified running
//! program. An external instrumentation driver reports every call and
//! return the program executes; this crate maintains the shadow stack those
//! notifications are validated against, and kills the whole process group
//! the instant a return does not match the address its call pushed.
//!
//! The pieces, leaves first:
//! - [`protocol`]: fixed-width wire frames
//! - [`stack`]: the shadow stack and the validation decision
//! - [`transport`]: the Unix-socket rendezvous with the traced program
//! - [`session`]: the loop serving one traced connection
//! - [`group`] / [`spawn`]: process-group lifecycle and fork/exec
//! - [`supervisor`]: the orchestrated run
//!
//! ## Why unsafe code is needed
//!
//! Process-group control requires raw `libc` calls (`fork`, `execvp`,
//! `setsid`, `kill`, `signal`). These interact directly with the kernel and
//! cannot be expressed in safe Rust. The unsafe calls are confined to
//! [`group`] and [`spawn`] and wrapped in safe abstractions.

#![allow(unsafe_code)] // Required for low-level process control (fork, exec, signals)

pub mod error;
pub mod group;
pub mod protocol;
pub mod session;
pub mod spawn;
pub mod stack;
pub mod supervisor;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use error::{Result, RetguardError};
pub use session::Session;
pub use spawn::Mode;
pub use stack::{ShadowStack, Violation};
pub use types::{Address, ProcessId};
