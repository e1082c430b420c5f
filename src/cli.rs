//! Command-line interface for briefcast
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Automated podcast production
#[derive(Parser, Debug)]
#[command(
    name = "briefcast",
    version,
    about = "Turn scripts into published podcast episodes"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Produce and publish one episode now
    Run {
        /// Use placeholder speech and publish nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Produce an episode every day at a fixed local time
    Schedule {
        /// Local time of day, HH:MM
        #[arg(long, value_name = "HH:MM", default_value = "06:00")]
        at: String,

        /// Use placeholder speech and publish nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Publish an existing audio file as an episode
    Publish {
        /// Audio file to publish
        audio: PathBuf,

        /// Episode title
        #[arg(long)]
        title: String,

        /// Episode description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Rebuild the feed from the episode store
    Feed,

    /// Show how a script splits into spoken segments
    Segment {
        /// Script file ("-" reads stdin)
        script: PathBuf,
    },

    /// Speak a script into an audio file without publishing it
    Synthesize {
        /// Script file ("-" reads stdin)
        script: PathBuf,

        /// Output file (.wav or .mp3); default: a generated name in the store
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Check system dependencies and configured services
    Check,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (secrets masked)
    Show,
    /// Print the default configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["briefcast"]).is_err());
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["briefcast", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { dry_run: false }));
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["briefcast", "-vv", "run", "--dry-run"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Run { dry_run: true }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["briefcast", "feed", "--config", "/etc/briefcast.toml", "-q"])
                .unwrap();
        assert!(matches!(cli.command, Commands::Feed));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/briefcast.toml")));
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_schedule_default_time() {
        let cli = Cli::try_parse_from(["briefcast", "schedule"]).unwrap();
        match cli.command {
            Commands::Schedule { at, dry_run } => {
                assert_eq!(at, "06:00");
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from([
            "briefcast",
            "publish",
            "out/episode_20260106T052419Z.mp3",
            "--title",
            "Daily Brief: Rust",
        ])
        .unwrap();
        match cli.command {
            Commands::Publish {
                audio,
                title,
                description,
            } => {
                assert_eq!(audio, PathBuf::from("out/episode_20260106T052419Z.mp3"));
                assert_eq!(title, "Daily Brief: Rust");
                assert_eq!(description, "");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_publish_requires_title() {
        assert!(Cli::try_parse_from(["briefcast", "publish", "a.mp3"]).is_err());
    }

    #[test]
    fn test_parse_synthesize_output() {
        let cli =
            Cli::try_parse_from(["briefcast", "synthesize", "script.txt", "-o", "out.wav"]).unwrap();
        match cli.command {
            Commands::Synthesize { script, output } => {
                assert_eq!(script, PathBuf::from("script.txt"));
                assert_eq!(output, Some(PathBuf::from("out.wav")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_and_completions() {
        let cli = Cli::try_parse_from(["briefcast", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));

        let cli = Cli::try_parse_from(["briefcast", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
