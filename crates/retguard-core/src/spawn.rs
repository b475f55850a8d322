//! # Spawning the Traced Program
//!
//! Launching the target under the instrumentation driver: argv assembly,
//! `fork(2)`, and `execvp(3)`.
//!
//! The driver is an external collaborator. Its invocation contract is: the
//! validation mode, the rendezvous path the supervisor listens on, a literal
//! `--` separator, the target executable, and the target's own arguments
//! verbatim.

use std::ffi::CString;
use std::fmt;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::{error, info};

use crate::types::ProcessId;

/// Separates driver arguments from the target and its argument vector.
pub const ARG_SEPARATOR: &str = "--";

/// Where return validation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode
{
    /// The driver validates returns inside the traced process itself; no
    /// supervisor connection is made.
    Internal,
    /// The driver reports calls and returns to this supervisor over the
    /// rendezvous socket and blocks on its verdicts.
    External,
}

impl Mode
{
    /// The flag string passed to the driver.
    #[must_use]
    pub const fn flag(self) -> &'static str
    {
        match self {
            Mode::Internal => "internal",
            Mode::External => "external",
        }
    }
}

impl fmt::Display for Mode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.flag())
    }
}

impl FromStr for Mode
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s {
            "internal" => Ok(Mode::Internal),
            "external" => Ok(Mode::External),
            _ => Err(format!("Unknown mode: {s}. Use 'internal' or 'external'")),
        }
    }
}

/// Build the exec argv for the driver.
///
/// Shape: `<driver> <mode> <rendezvous> -- <target> [target-args...]`.
///
/// ## Errors
///
/// Fails only if an argument contains an interior nul byte and therefore
/// cannot cross the C boundary.
pub fn driver_argv(
    driver: &str,
    mode: Mode,
    rendezvous: &Path,
    target: &str,
    target_args: &[String],
) -> Result<Vec<CString>, SpawnError>
{
    let mut argv = Vec::with_capacity(5 + target_args.len());
    argv.push(CString::new(driver)?);
    argv.push(CString::new(mode.flag())?);
    argv.push(CString::new(rendezvous.as_os_str().as_bytes())?);
    argv.push(CString::new(ARG_SEPARATOR)?);
    argv.push(CString::new(target)?);
    for arg in target_args {
        argv.push(CString::new(arg.as_str())?);
    }
    Ok(argv)
}

/// Replace the current process image with the driver.
///
/// Never returns. Exec failure is unrecoverable for the calling process:
/// there is nothing useful a process that failed to become the driver can
/// do, and retrying a failed exec of a fixed command never helps. The
/// failure is logged and the process exits without unwinding (this may be a
/// freshly forked child sharing the parent's state).
pub fn exec_driver(argv: &[CString]) -> !
{
    debug_assert!(!argv.is_empty());

    let mut ptrs: Vec<*const libc::c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
    ptrs.push(std::ptr::null());

    unsafe {
        libc::execvp(ptrs[0], ptrs.as_ptr());
    }

    // Reached only if exec failed
    let err = std::io::Error::last_os_error();
    error!(error = %err, "execvp() failed");
    unsafe { libc::_exit(1) }
}

/// Fork and start the traced program under the driver.
///
/// The child replaces itself with the driver and never returns; the parent
/// gets the child's pid back. Stdio is flushed before forking so buffered
/// output is not emitted twice.
///
/// ## Errors
///
/// - [`SpawnError::BadArgument`] if an argument cannot be converted for exec.
/// - [`SpawnError::Fork`] if `fork(2)` itself fails.
pub fn spawn_traced(
    driver: &str,
    mode: Mode,
    rendezvous: &Path,
    target: &str,
    target_args: &[String],
) -> Result<ProcessId, SpawnError>
{
    let argv = driver_argv(driver, mode, rendezvous, target, target_args)?;

    info!(driver, %mode, target, "starting the traced program under the driver");
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(SpawnError::Fork(std::io::Error::last_os_error())),
        0 => exec_driver(&argv),
        child => Ok(ProcessId::from(child as u32)),
    }
}

/// Failure to launch the traced program
#[derive(Debug, Error)]
pub enum SpawnError
{
    /// An argument contains an interior nul byte.
    #[error("argument not representable in exec argv: {0}")]
    BadArgument(#[from] std::ffi::NulError),

    /// `fork(2)` failed.
    #[error("fork() failed: {0}")]
    Fork(std::io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_driver_argv_shape()
    {
        let argv = driver_argv(
            "/usr/bin/drrun",
            Mode::External,
            Path::new("/tmp/retguard-abc"),
            "/bin/ls",
            &["-l".to_string(), "/etc".to_string()],
        )
        .unwrap();

        let strings: Vec<&str> = argv.iter().map(|s| s.to_str().unwrap()).collect();
        assert_eq!(
            strings,
            ["/usr/bin/drrun", "external", "/tmp/retguard-abc", "--", "/bin/ls", "-l", "/etc"]
        );
    }

    #[test]
    fn test_driver_argv_rejects_interior_nul()
    {
        let result = driver_argv(
            "/usr/bin/drrun",
            Mode::Internal,
            Path::new("/tmp/retguard-abc"),
            "bad\0target",
            &[],
        );
        assert!(matches!(result, Err(SpawnError::BadArgument(_))));
    }

    #[test]
    fn test_mode_round_trip()
    {
        for mode in [Mode::Internal, Mode::External] {
            assert_eq!(mode.flag().parse::<Mode>().unwrap(), mode);
        }
        assert!("managed".parse::<Mode>().is_err());
    }
}
