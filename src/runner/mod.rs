//! External downloader invocation
//!
//! The orchestrator never spawns processes directly; it goes through the
//! [`ToolRunner`] capability so tests can substitute a scripted fake.
//! [`CliRunner`] is the production implementation, [`MissingToolRunner`] the
//! stand-in used when no downloader binary is available. [`RateGate`] spaces
//! out invocation starts across every job in the process.

mod cli;
mod invocation;
mod missing;
mod rate_gate;
mod traits;

pub use cli::CliRunner;
pub use invocation::Invocation;
pub use missing::MissingToolRunner;
pub use rate_gate::RateGate;
pub use traits::{ToolOutput, ToolRunner};
