//! # Error Types
//!
//! General error handling for the supervisor.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! The taxonomy is deliberately fail-fast. Almost nothing is recovered
//! locally: once a session is up, every error variant below must end in
//! process-group termination, because the entire value of the system is
//! never letting a corrupted program keep running. The single non-error end
//! of a session is the clean disconnect, which is not represented here at
//! all.

use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::spawn::SpawnError;
use crate::stack::Violation;
use crate::transport::TransportError;

/// Main error type for supervisor operations
///
/// ## Error Categories
///
/// 1. **CFI violations**: the security-relevant class; always escalated with
///    full diagnostic context, never rate-limited or downgraded.
/// 2. **Protocol errors**: a desynchronized or buggy driver.
/// 3. **Transport errors**: short reads, failed writes, mid-frame
///    disconnects.
/// 4. **Spawn errors**: the traced program could not be started.
/// 5. **Group errors**: process-group setup problems before any fork.
#[derive(Debug, Error)]
pub enum RetguardError
{
    /// The traced program attempted an illegitimate return.
    #[error("control-flow integrity violation: {0}")]
    Violation(#[from] Violation),

    /// The driver sent something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The connection to the traced program failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The traced program could not be launched under the driver.
    #[error("failed to launch traced program: {0}")]
    Spawn(#[from] SpawnError),

    /// Process-group creation was attempted twice in one run.
    #[error("process group already created")]
    GroupAlreadyCreated,

    /// `setsid(2)` failed and the caller was not already a group leader.
    #[error("failed to create process group: {0}")]
    GroupSetup(std::io::Error),

    /// Overriding a signal disposition failed.
    #[error("failed to override signal disposition: {0}")]
    SignalSetup(std::io::Error),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, RetguardError>`
///
/// ```rust
/// use retguard_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, RetguardError>;
