//! # remedy_runner
//!
//! Sandboxed execution engine for remedy.
//!
//! Every test/build run happens inside a fresh, disposable Docker container:
//! the working tree is streamed in as a tar archive, the profile's command
//! runs as a single shell invocation, combined output and exit status are
//! captured, and the container is removed on every exit path.
//!
//! The crate also hosts the engine selector ([`profile::detect`]), which
//! inspects a working tree's manifests to pick a runtime profile, and a
//! [`MockSandbox`] for tests.

pub mod docker;
pub mod error;
pub mod mock;
pub mod profile;
pub mod sandbox;

pub use docker::DockerSandbox;
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedExecution, MockSandbox};
pub use profile::{detect, CheckKind, RuntimeProfile, Stack};
pub use sandbox::{Sandbox, SandboxResult};
