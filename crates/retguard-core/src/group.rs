//! # Process Group Supervision
//!
//! Process-group lifecycle for the supervisor and everything it spawns:
//! one-time group creation, accounting of live traced connections, and the
//! single point of group-wide termination.
//!
//! Termination is deliberately coarse. The only way to stop the system
//! mid-flight is to signal the whole group, which kills every participant;
//! there is no graceful cancellation handshake. [`terminate`] is therefore a
//! one-shot broadcast-and-exit with no staged teardown, safe to reach from
//! any fatal path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::error::{Result, RetguardError};

/// Process group id recorded by [`setup`]. Set at most once per run.
static GROUP: OnceCell<libc::pid_t> = OnceCell::new();

/// Latch ensuring the termination broadcast happens once even if fatal
/// paths overlap.
static TERMINATED: AtomicBool = AtomicBool::new(false);

/// Count of currently live traced connections.
static TRACED: AtomicUsize = AtomicUsize::new(0);

/// Create the supervisor's own process group, once per run.
///
/// Starts a new session so that every subsequently forked process shares a
/// group the supervisor can signal as a unit. Many terminals already make
/// the shell's children group leaders; in that case `setsid(2)` fails with
/// `EPERM` and the existing group is recorded instead.
///
/// Also overrides two default signal dispositions to ignored:
/// - `SIGCHLD`: child exits are observed through the transport (a clean
///   disconnect), not through signals.
/// - `SIGPIPE`: the peer closing its read side must surface as a write
///   error, which the session loop checks explicitly, not as sudden death.
///
/// ## Errors
///
/// - [`RetguardError::GroupAlreadyCreated`] if called a second time.
/// - [`RetguardError::GroupSetup`] if `setsid` fails for any reason other
///   than already being a group leader.
/// - [`RetguardError::SignalSetup`] if a disposition override fails.
pub fn setup() -> Result<()>
{
    let sid = unsafe { libc::setsid() };
    let pgid = if sid == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EPERM) {
            return Err(RetguardError::GroupSetup(err));
        }
        // Already a group leader; the existing group is ours to signal
        unsafe { libc::getpgrp() }
    } else {
        sid
    };

    GROUP.set(pgid).map_err(|_| RetguardError::GroupAlreadyCreated)?;

    for sig in [libc::SIGCHLD, libc::SIGPIPE] {
        let previous = unsafe { libc::signal(sig, libc::SIG_IGN) };
        if previous == libc::SIG_ERR {
            return Err(RetguardError::SignalSetup(std::io::Error::last_os_error()));
        }
    }

    info!(pgid, "process group ready; SIGCHLD and SIGPIPE ignored");
    Ok(())
}

/// Returns `true` once [`setup`] has completed.
#[must_use]
pub fn is_setup() -> bool
{
    GROUP.get().is_some()
}

/// Kill the entire process group and exit the supervisor.
///
/// Idempotent: concurrent or repeated calls broadcast at most once. The
/// latch and the broadcast are both async-signal-safe, so this may be
/// reached from signal-adjacent contexts.
///
/// This never returns. `kill(0, ...)` signals the caller's own group,
/// supervisor included; the trailing exit only matters if the broadcast
/// itself fails.
pub fn terminate(reason: &str) -> !
{
    if !TERMINATED.swap(true, Ordering::SeqCst) {
        error!(reason, "terminating process group");
        unsafe {
            libc::kill(0, libc::SIGKILL);
        }
    }
    std::process::exit(1);
}

/// Process-wide count of live traced connections
///
/// Incremented when a session begins and decremented when it ends, cleanly
/// or not. The current design supervises a single connection per run, but
/// the counter is lock-free so N concurrent sessions sharing one group can
/// use it unchanged.
pub struct TracedProcesses;

impl TracedProcesses
{
    /// Record a session starting. Returns the new live count.
    pub fn inc() -> usize
    {
        TRACED.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a session ending. Returns the new live count. Saturates at
    /// zero rather than wrapping if calls are unpaired.
    pub fn dec() -> usize
    {
        TRACED
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .map(|prev| prev.saturating_sub(1))
            .unwrap_or(0)
    }

    /// The number of currently live traced connections.
    #[must_use]
    pub fn live() -> usize
    {
        TRACED.load(Ordering::SeqCst)
    }
}

/// Scope guard that terminates the process group unless disarmed
///
/// Armed at the top of the supervised body; if control leaves that body for
/// any reason other than the explicit success path (early return, `?`,
/// panic), the drop fires [`terminate`]. The success path calls
/// [`TerminateGuard::disarm`] first. This guarantees no error path leaves a
/// half-instrumented traced program running unsupervised.
///
/// ## Example
///
/// ```rust
/// use retguard_core::group::TerminateGuard;
///
/// let guard = TerminateGuard::arm("supervised body aborted");
/// // ... work that must not outlive a failure ...
/// guard.disarm();
/// ```
pub struct TerminateGuard
{
    armed: bool,
    reason: &'static str,
}

impl TerminateGuard
{
    /// Arm the guard. `reason` is logged if the guard ever fires.
    #[must_use]
    pub fn arm(reason: &'static str) -> Self
    {
        Self { armed: true, reason }
    }

    /// Disarm the guard on the success path. Dropping afterwards is a no-op.
    pub fn disarm(mut self)
    {
        self.armed = false;
    }
}

impl Drop for TerminateGuard
{
    fn drop(&mut self)
    {
        if self.armed {
            terminate(self.reason);
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_disarmed_guard_is_inert()
    {
        let guard = TerminateGuard::arm("never fires");
        guard.disarm();
        // Still alive after the drop above
        assert!(TracedProcesses::live() < usize::MAX);
    }

    #[test]
    fn test_group_not_created_until_setup()
    {
        // No test in this binary calls setup()
        assert!(!is_setup());
    }

    #[test]
    fn test_traced_count_accounting()
    {
        // Only this test touches the counter in this binary
        let base = TracedProcesses::live();
        let up = TracedProcesses::inc();
        assert_eq!(up, base + 1);
        let down = TracedProcesses::dec();
        assert_eq!(down, base);

        // Unpaired decrements saturate at zero rather than wrapping
        if base == 0 {
            assert_eq!(TracedProcesses::dec(), 0);
        }
    }
}
