//! # Session Loop
//!
//! Serves one traced connection end-to-end: reads frames, dispatches them to
//! the shadow stack, and replies with continuation grants.
//!
//! The `Continue` reply is a blocking gate, not an acknowledgement. The
//! driver holds the traced program at the return instruction until the grant
//! arrives, so a return can never execute before it is validated. That
//! rendezvous is what closes the time-of-check/time-of-use window, and it is
//! also the system's backpressure: the traced program cannot outrun
//! validation.

use tracing::{debug, error, info};

use crate::error::Result;
use crate::group::TracedProcesses;
use crate::protocol::{Frame, MessageKind, ProtocolError};
use crate::stack::{ShadowStack, Violation};
use crate::transport::Connection;
use crate::types::Address;

/// One traced connection and its private shadow stack
///
/// A session is bound to one logical thread of execution in the traced
/// program. The stack is owned exclusively by the session; nothing else
/// mutates it.
pub struct Session
{
    conn: Connection,
    stack: ShadowStack,
}

impl Session
{
    /// Wrap an accepted connection in a fresh session.
    #[must_use]
    pub fn new(conn: Connection) -> Self
    {
        Self {
            conn,
            stack: ShadowStack::new(),
        }
    }

    /// Serve the connection until it ends.
    ///
    /// Returns `Ok(())` only for a clean disconnect: the peer closed the
    /// socket with zero bytes pending exactly at a frame boundary, meaning
    /// the traced program exited. Every other exit is an error the caller
    /// must escalate to process-group termination.
    ///
    /// The live-connection count is incremented on entry and decremented on
    /// every exit path.
    ///
    /// ## Errors
    ///
    /// - A control-flow integrity violation (underflow or mismatch).
    /// - A transport failure (short read, failed reply write).
    /// - A protocol failure (unknown header, wrong-direction message).
    pub fn run(mut self) -> Result<()>
    {
        TracedProcesses::inc();
        let outcome = self.serve();
        let live = TracedProcesses::dec();
        debug!(live, "session ended");
        outcome
    }

    fn serve(&mut self) -> Result<()>
    {
        loop {
            let Some(bytes) = self.conn.recv()? else {
                info!("traced program disconnected");
                return Ok(());
            };

            let frame = Frame::decode(&bytes)?;
            match frame.kind {
                MessageKind::NewSignal => {
                    debug!(depth = self.stack.depth(), "signal delivery; pushing wildcard");
                    self.stack.push_wildcard();
                }
                MessageKind::Call => {
                    debug!(addr = %frame.payload, depth = self.stack.depth(), "push");
                    self.stack.push(frame.payload);
                }
                MessageKind::Ret => self.handle_ret(frame.payload)?,
                MessageKind::Continue => {
                    // Only the supervisor sends grants
                    return Err(ProtocolError::UnexpectedKind(MessageKind::Continue).into());
                }
            }
        }
    }

    /// Validate a return and, if it is legitimate, grant continuation.
    ///
    /// On a violation nothing is sent: the traced program stays blocked at
    /// the return instruction until the group-wide kill reaches it.
    fn handle_ret(&mut self, target: Address) -> Result<()>
    {
        debug!(addr = %target, depth = self.stack.depth(), "pop");

        match self.stack.validate_and_pop(target) {
            Ok(()) => {
                self.conn.send(&Frame::continue_reply())?;
                Ok(())
            }
            Err(violation) => {
                match violation {
                    Violation::StackUnderflow(actual) => {
                        error!(
                            attempted = %actual,
                            "shadow stack mismatch detected: return with an empty shadow stack"
                        );
                    }
                    Violation::Mismatch { expected, actual } => {
                        error!(
                            expected = %expected,
                            attempted = %actual,
                            depth = self.stack.depth(),
                            "shadow stack mismatch detected"
                        );
                    }
                }
                Err(violation.into())
            }
        }
    }
}
