//! Scripted fake-agent-process harness for testing the fleetline session
//! runtime against a real OS child process rather than an in-memory mock of
//! the Process Supervisor.
//!
//! Integration tests in `fleetline-runtime` spawn the `fleetline-fake-agent`
//! binary (a `[[bin]]` target in this crate) through the real `Supervisor`,
//! driven by a [`Script`] built with [`ScriptBuilder`], and assert over the
//! resulting `SemanticEvent`/`OutputLine` streams using the `assertions`
//! helpers and `frames` builders below.

pub mod assertions;
pub mod fake_agent;
pub mod frames;
pub mod process;
pub mod script;

pub use fake_agent::{fake_agent_binary, wrapper_for, WrapperBinary};
pub use script::{Script, ScriptBuilder, ScriptFile, ScriptStep};
