//! # Wire Protocol
//!
//! Fixed-width framed messages exchanged between the instrumentation driver
//! and the supervisor.
//!
//! Every frame is exactly [`FRAME_LEN`] bytes: a 4-byte ASCII header tag
//! followed by a little-endian 64-bit address payload. Messages that carry no
//! address ([`MessageKind::NewSignal`], [`MessageKind::Continue`]) still pad
//! the payload with zeros so that framing never depends on the message kind.
//!
//! Encoding is total: every [`Frame`] encodes to exactly one byte sequence.
//! Decoding fails only on an unrecognized header tag; a frame that is too
//! short to decode is a transport problem, not a protocol one, and never
//! reaches this module.

use thiserror::Error;

use crate::types::Address;

/// Length in bytes of the header tag at the start of every frame.
pub const HEADER_LEN: usize = 4;

/// Length in bytes of the address payload. Addresses travel as little-endian
/// 64-bit integers regardless of the host's pointer width or endianness.
pub const ADDR_LEN: usize = 8;

/// Total length in bytes of every frame, in both directions.
pub const FRAME_LEN: usize = HEADER_LEN + ADDR_LEN;

const TAG_NEW_SIGNAL: &[u8; HEADER_LEN] = b"SIGN";
const TAG_CALL: &[u8; HEADER_LEN] = b"CALL";
const TAG_RET: &[u8; HEADER_LEN] = b"RETN";
const TAG_CONTINUE: &[u8; HEADER_LEN] = b"CONT";

/// The kind of a wire message
///
/// Three kinds flow driver-to-supervisor (`NewSignal`, `Call`, `Ret`); one
/// flows supervisor-to-driver (`Continue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind
{
    /// An asynchronous signal is being delivered to the traced program.
    /// There is no matching call for the handler's eventual return.
    NewSignal,
    /// A call instruction executed; the payload is its return address.
    Call,
    /// A return instruction is about to transfer control to the payload
    /// address. The driver blocks until the supervisor replies.
    Ret,
    /// Validation passed; the traced program may execute the return.
    Continue,
}

impl MessageKind
{
    const fn tag(self) -> &'static [u8; HEADER_LEN]
    {
        match self {
            MessageKind::NewSignal => TAG_NEW_SIGNAL,
            MessageKind::Call => TAG_CALL,
            MessageKind::Ret => TAG_RET,
            MessageKind::Continue => TAG_CONTINUE,
        }
    }
}

/// A single wire message: a kind plus an address payload
///
/// The payload is meaningful only for `Call` and `Ret`; for the other kinds
/// it is zero on encode and ignored on receipt.
///
/// ## Example
///
/// ```rust
/// use retguard_core::protocol::{Frame, MessageKind, FRAME_LEN};
/// use retguard_core::types::Address;
///
/// let frame = Frame::call(Address::from(0x1000));
/// let bytes = frame.encode();
/// assert_eq!(bytes.len(), FRAME_LEN);
/// assert_eq!(Frame::decode(&bytes).unwrap(), frame);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame
{
    /// Which message this is.
    pub kind: MessageKind,
    /// The address payload (zero when the kind carries no address).
    pub payload: Address,
}

impl Frame
{
    /// A signal-delivery notification. Carries no address.
    pub const fn new_signal() -> Self
    {
        Frame {
            kind: MessageKind::NewSignal,
            payload: Address::ZERO,
        }
    }

    /// A call notification carrying the address the call will return to.
    pub const fn call(return_addr: Address) -> Self
    {
        Frame {
            kind: MessageKind::Call,
            payload: return_addr,
        }
    }

    /// A return notification carrying the address about to be jumped to.
    pub const fn ret(target: Address) -> Self
    {
        Frame {
            kind: MessageKind::Ret,
            payload: target,
        }
    }

    /// The continuation grant sent after a validated return. Carries no address.
    pub const fn continue_reply() -> Self
    {
        Frame {
            kind: MessageKind::Continue,
            payload: Address::ZERO,
        }
    }

    /// Encode this frame into its fixed-width wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN]
    {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..HEADER_LEN].copy_from_slice(self.kind.tag());
        bytes[HEADER_LEN..].copy_from_slice(&self.payload.value().to_le_bytes());
        bytes
    }

    /// Decode a fixed-width wire frame.
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::UnknownHeader`] if the header tag does not
    /// match any recognized message kind. An unknown header means the peer is
    /// desynchronized or buggy; callers must treat it as fatal, never skip
    /// bytes looking for the next frame.
    pub fn decode(bytes: &[u8; FRAME_LEN]) -> Result<Self, ProtocolError>
    {
        let mut tag = [0u8; HEADER_LEN];
        tag.copy_from_slice(&bytes[..HEADER_LEN]);

        let kind = match &tag {
            TAG_NEW_SIGNAL => MessageKind::NewSignal,
            TAG_CALL => MessageKind::Call,
            TAG_RET => MessageKind::Ret,
            TAG_CONTINUE => MessageKind::Continue,
            _ => return Err(ProtocolError::UnknownHeader(tag)),
        };

        let mut payload = [0u8; ADDR_LEN];
        payload.copy_from_slice(&bytes[HEADER_LEN..]);

        Ok(Frame {
            kind,
            payload: Address::from(u64::from_le_bytes(payload)),
        })
    }
}

/// Protocol-level decoding failure
///
/// Both variants indicate a desynchronized or buggy peer. Neither is ever
/// recovered from: continued operation cannot be trusted once framing is in
/// doubt.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError
{
    /// The header tag did not match any recognized message kind.
    #[error("unrecognized message header {0:?}")]
    UnknownHeader([u8; HEADER_LEN]),

    /// A well-formed message arrived in the wrong direction (e.g. a
    /// `Continue` sent by the driver).
    #[error("message kind {0:?} is not valid in this direction")]
    UnexpectedKind(MessageKind),
}
