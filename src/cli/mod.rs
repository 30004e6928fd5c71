//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "retrieval-eval",
    version,
    about = "Hybrid retrieval dispatch and human evaluation recorder",
    long_about = "Serves passages and questions to an evaluation UI, runs the retrieval strategy \
                  named by a model identifier against the proposition, summary and question \
                  collections, and appends human relevance judgments to a CSV log."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/retrieval-eval/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List every valid model identifier
    Models,

    /// Resolve a model identifier into its retrieval plan
    Resolve {
        /// Identifier, e.g. "formatted_summary_question" or "qwen3_summ_ques"
        identifier: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from(["retrieval-eval", "-v", "resolve", "qwen3_summ"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Resolve { identifier } if identifier == "qwen3_summ"));
    }
}
