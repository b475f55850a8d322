//! # Supervisor Orchestration
//!
//! Ties the pieces together for one run: process-group setup, rendezvous
//! generation, fork/exec of the traced program, and the session loop.
//!
//! The supervised body runs under an armed [`TerminateGuard`]. The guard is
//! disarmed only on the explicit success path (a clean disconnect), so every
//! other way out takes the whole process group down with it. A
//! half-instrumented traced program never keeps running unsupervised.

use std::path::Path;

use tracing::{error, info};

use crate::error::Result;
use crate::group::{self, TerminateGuard};
use crate::session::Session;
use crate::spawn::{self, Mode};
use crate::transport::{self, Listener};

/// Rendezvous placeholder handed to the driver in internal mode, where no
/// supervisor socket exists to connect to.
pub const INTERNAL_RENDEZVOUS: &str = "-";

/// Run the supervisor to completion.
///
/// In internal mode the driver validates in-process, so the supervisor has
/// nothing to do beyond group setup: it replaces itself with the driver and
/// this function never returns.
///
/// In external mode: generate a private rendezvous path, bind the listening
/// endpoint, arm the terminate guard, start the traced program under the
/// driver, accept its single connection, and serve it. Returns `Ok(())`
/// only when the session ended in a clean disconnect.
///
/// ## Errors
///
/// Failures before the guard is armed (group setup, rendezvous generation,
/// bind) are returned to the caller and have no process-group side effects.
/// Failures after it is armed are logged and escalate to group-wide
/// termination; this function then does not return.
pub fn run(mode: Mode, driver: &str, target: &str, target_args: &[String]) -> Result<()>
{
    group::setup()?;

    if mode == Mode::Internal {
        info!("internal mode: handing over to the driver");
        let argv = spawn::driver_argv(driver, mode, Path::new(INTERNAL_RENDEZVOUS), target, target_args)?;
        spawn::exec_driver(&argv);
    }

    // The path could be claimed between generation and bind; the bind fails
    // in that case, before any traced program exists
    let rendezvous = transport::rendezvous_path()?;
    let listener = Listener::bind(&rendezvous)?;

    let guard = TerminateGuard::arm("supervisor aborted");

    let outcome = supervise(&listener, mode, driver, target, target_args);
    match outcome {
        Ok(()) => {
            guard.disarm();
            info!("traced program finished cleanly");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "fatal supervisor error");
            group::terminate("fatal error while supervising the traced program");
        }
    }
}

/// The supervised body: everything that must not outlive a failure.
fn supervise(listener: &Listener, mode: Mode, driver: &str, target: &str, target_args: &[String]) -> Result<()>
{
    let pid = spawn::spawn_traced(driver, mode, listener.path(), target, target_args)?;
    info!(%pid, "traced program started; waiting for it to connect");

    let conn = listener.accept()?;
    Session::new(conn).run()
}
