//! # Shadow Stack Engine
//!
//! The record of expected return addresses, kept outside the traced
//! program's (corruptible) memory, and the validation function that decides
//! whether a return is legitimate.
//!
//! [`ShadowStack::validate_and_pop`] is the entire security boundary of the
//! system: any outcome other than `Ok` must lead the caller to process-group
//! termination. There is no silent recovery, rate limiting, or downgrade to
//! a warning.

use thiserror::Error;

use crate::types::Address;

/// One entry on the shadow stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowEntry
{
    /// The return address pushed by an ordinary call.
    Return(Address),
    /// Anything may return here. Pushed when a signal is delivered: the
    /// handler's eventual return has no matching call, so its target is
    /// unknowable in advance.
    Wildcard,
}

/// A last-in-first-out record of expected return addresses
///
/// The top entry, if any, is always the address expected at the *next*
/// return on this logical thread of execution.
///
/// ## Example
///
/// ```rust
/// use retguard_core::stack::ShadowStack;
/// use retguard_core::types::Address;
///
/// let mut stack = ShadowStack::new();
/// stack.push(Address::from(0x1000));
/// assert!(stack.validate_and_pop(Address::from(0x1000)).is_ok());
/// assert!(stack.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ShadowStack
{
    entries: Vec<ShadowEntry>,
}

impl ShadowStack
{
    /// Create an empty shadow stack.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record the return address of a call. Any address is accepted.
    pub fn push(&mut self, addr: Address)
    {
        self.entries.push(ShadowEntry::Return(addr));
    }

    /// Record that a signal handler is running and its return target is
    /// unknowable.
    pub fn push_wildcard(&mut self)
    {
        self.entries.push(ShadowEntry::Wildcard);
    }

    /// Validate a return target against the top of the stack.
    ///
    /// - Empty stack: [`Violation::StackUnderflow`]. Nothing to return to
    ///   legitimately.
    /// - Top is a wildcard: pop and succeed unconditionally.
    /// - Top differs from `target`: [`Violation::Mismatch`]. The stack is
    ///   **not** popped, so the frozen state is available for forensic
    ///   logging before termination.
    /// - Top matches: pop and succeed.
    ///
    /// ## Errors
    ///
    /// Every error from this function is a control-flow integrity violation.
    /// Callers must escalate to process-group termination.
    pub fn validate_and_pop(&mut self, target: Address) -> Result<(), Violation>
    {
        match self.entries.last().copied() {
            None => Err(Violation::StackUnderflow(target)),
            Some(ShadowEntry::Wildcard) => {
                self.entries.pop();
                Ok(())
            }
            Some(ShadowEntry::Return(expected)) if expected != target => Err(Violation::Mismatch {
                expected,
                actual: target,
            }),
            Some(ShadowEntry::Return(_)) => {
                self.entries.pop();
                Ok(())
            }
        }
    }

    /// Number of entries currently on the stack.
    #[must_use]
    pub fn depth(&self) -> usize
    {
        self.entries.len()
    }

    /// Returns `true` if no returns are currently expected.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// The entry a return would be validated against next, if any.
    #[must_use]
    pub fn top(&self) -> Option<ShadowEntry>
    {
        self.entries.last().copied()
    }
}

/// A control-flow integrity violation
///
/// Produced only by [`ShadowStack::validate_and_pop`]. Both variants carry
/// full diagnostic context so the termination path can log exactly what the
/// traced program attempted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Violation
{
    /// A return executed while no returns were expected.
    #[error("return to {0} with an empty shadow stack")]
    StackUnderflow(Address),

    /// A return targeted a different address than the one its call pushed.
    #[error("return target {actual} does not match expected {expected}")]
    Mismatch
    {
        /// The address on top of the shadow stack.
        expected: Address,
        /// The address the traced program attempted to return to.
        actual: Address,
    },
}
