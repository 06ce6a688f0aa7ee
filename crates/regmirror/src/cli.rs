use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "regmirror", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run one mirror pass over the change feed
    #[command(alias = "s", name = "sync")]
    Sync(SyncArg),
    /// Show what the ledger has recorded
    #[command(alias = "st", name = "status")]
    Status(StatusArg),
}

#[derive(Clone, Debug, Args)]
pub struct SyncArg {
    /// Configuration file (default: regmirror.toml in the base directory)
    #[arg(short, long)]
    pub config:  Option<PathBuf>,
    /// Number of concurrent package workers
    #[arg(short, long)]
    pub workers: Option<usize>,
    /// Process at most this many planned packages
    #[arg(short, long)]
    pub limit:   Option<usize>,
    /// Change feed file
    #[arg(short, long)]
    pub feed:    Option<PathBuf>,
}

#[derive(Clone, Debug, Args)]
pub struct StatusArg {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// List every package with a recorded error
    #[arg(short, long)]
    pub errors: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_flags() {
        let app = App::try_parse_from(["regmirror", "sync", "-w", "4", "--limit", "10", "--verbose"]).unwrap();
        assert!(app.verbose);
        let Commands::Sync(arg) = app.cmd else { panic!("expected sync") };
        assert_eq!(arg.workers, Some(4));
        assert_eq!(arg.limit, Some(10));
        assert_eq!(arg.feed, None);
    }

    #[test]
    fn test_status_errors_flag() {
        let app = App::try_parse_from(["regmirror", "status", "--errors"]).unwrap();
        assert!(!app.verbose);
        assert!(matches!(app.cmd, Commands::Status(StatusArg { errors: true, .. })));
    }

    #[test]
    fn test_command_is_required() {
        assert!(App::try_parse_from(["regmirror"]).is_err());
    }
}
