//! CLI command implementations

pub mod compare;
pub mod download;
pub mod error;
pub mod verify;

pub use compare::CompareArgs;
pub use download::{Cli, Commands, DownloadArgs, OutputFormat};
pub use error::CliError;
pub use verify::{VerifyArgs, VerifySummary};
