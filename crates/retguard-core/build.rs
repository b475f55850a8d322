//! Build script for retguard-core
//!
//! This script checks system requirements before compilation:
//! - Minimum Rust version (Edition 2021 = Rust 1.56.0+)
//! - A Unix target
//!
//! ## Requirements
//!
//! - **Rust**: Edition 2021 (Rust 1.56.0 or newer)
//! - **Unix**: the supervisor is built on process groups, `fork`/`exec`,
//!   and Unix domain sockets, none of which exist on other platforms

fn main()
{
    // Check minimum Rust version
    // Edition 2021 requires Rust 1.56.0
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::parse("1.56.0").unwrap();

        if rustc_version < min_rust_version {
            panic!(
                "retguard-core requires Rust {} or newer (Edition 2021), found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }

    // The target must be Unix. The crate's process-group supervision and
    // socket rendezvous have no meaning on other systems.
    if std::env::var_os("CARGO_CFG_UNIX").is_none() {
        panic!("retguard-core only supports Unix targets (process groups, fork/exec, Unix sockets)");
    }
}
