//! Code address type.

use std::fmt;

/// Strongly typed code address
///
/// This wrapper around `u64` provides type safety when working with the
/// return addresses reported by the instrumentation driver. It prevents
/// accidentally mixing addresses with other `u64` values (like counts,
/// lengths, or file descriptors).
///
/// An `Address` is **never dereferenced**: it belongs to the traced program's
/// address space, not ours. The supervisor only compares and logs it. Every
/// bit pattern is legal, including zero and `u64::MAX`; "any return is fine
/// here" is expressed by a separate shadow-stack entry kind, never by a
/// reserved address value.
///
/// ## Example
///
/// ```rust
/// use retguard_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// assert_eq!(addr.value(), 0x1000);
/// assert_eq!(addr.to_string(), "0x0000000000001000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The zero address
    ///
    /// Used as the payload of messages that carry no address, such as the
    /// continuation grant. Zero has no special meaning during validation.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    ///
    /// Use this when the address needs to cross the wire or appear in a
    /// diagnostic, never to touch memory.
    pub const fn value(self) -> u64
    {
        self.0
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}
