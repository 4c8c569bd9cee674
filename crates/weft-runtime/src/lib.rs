pub mod driver;
pub mod runtime;
pub mod scripted;

pub use driver::{RunDriver, RunStream};
pub use runtime::{AgentRuntime, RunInput, RuntimeError};
pub use scripted::{ScriptStep, ScriptedRuntime};
