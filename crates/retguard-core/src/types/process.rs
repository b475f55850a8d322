//! Process identifier type.

use std::fmt;

/// Process identifier (PID)
///
/// A PID is a unique number assigned to each running process by the operating
/// system. On Unix-like systems PIDs are 32-bit integers.
///
/// ## Why wrap it in a struct?
///
/// Using a newtype pattern (`struct ProcessId(u32)`) instead of a raw `u32`
/// provides:
/// - **Type safety**: Prevents accidentally passing a random number where a PID is expected
/// - **Self-documenting code**: Makes it clear what the value represents
///
/// ## Example
///
/// ```rust
/// use retguard_core::types::ProcessId;
///
/// let pid = ProcessId::from(12345);
/// assert_eq!(pid.raw(), 12345);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl ProcessId
{
    /// Get the raw `u32` representation of the process identifier
    pub const fn raw(self) -> u32
    {
        self.0
    }
}

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}
