//! Container dispatch for bioinformatics pipeline functions.
//!
//! `isorun` runs pipeline analysis functions inside an isolated container,
//! translating configuration trees and every filesystem path they carry
//! between the host namespace and the container namespace, in both
//! directions. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure namespace-translation logic (mount derivation,
//!   prefix-based path remapping, tree translation). Deterministic, no I/O,
//!   fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (YAML files, filesystem
//!   probes, child processes, the container runtime).
//!
//! Orchestration modules ([`dispatch`], [`analysis`]) coordinate core logic
//! with I/O to implement the CLI commands.

pub mod analysis;
pub mod core;
pub mod dispatch;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
