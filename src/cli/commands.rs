use clap::Subcommand;

use super::compare::CompareArgs;
use super::config::ConfigArgs;
use super::paths::PathsArgs;
use super::snapshot::MatchArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Print the golden, candidate and diff paths of a snapshot
    Paths(PathsArgs),

    /// Compare two PNG files directly
    Compare(CompareArgs),

    /// Run a snapshot request against a rendered PNG
    Match(MatchArgs),

    /// Configuration management
    Config(ConfigArgs),
}
