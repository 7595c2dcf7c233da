//! CLI argument definitions for rdgai.

use crate::commands::ClassifyMode;
use crate::editor::Operation;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Version with the commit and build time, for `--version`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("RDGAI_GIT_COMMIT"),
    ", built ",
    env!("RDGAI_BUILD_TIMESTAMP"),
    ")"
);

/// rdgai - Classify the relations between variant readings in TEI apparatuses.
///
/// Start with `rdgai summary <doc>` to see what a document contains.
#[derive(Parser, Debug)]
#[command(name = "rdgai")]
#[command(author, version, long_version = LONG_VERSION)]
#[command(about = "Classify the relations between variant readings in TEI apparatuses", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Read configuration from this file instead of the default location.
    /// Can also be set via the RDGAI_CONFIG environment variable.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show classified pairs grouped by category
    Show {
        /// TEI document
        doc: PathBuf,

        /// Categories to leave out (repeatable)
        #[arg(long)]
        ignore: Vec<String>,
    },

    /// Count apparatuses, readings, pairs and classifications
    Summary {
        /// TEI document
        doc: PathBuf,
    },

    /// Repair hand-edited relation lists
    ///
    /// Prefixes every category in `ana` with `#` and merges relations that
    /// name the same pair within one list.
    Clean {
        /// TEI document
        doc: PathBuf,
        /// Where to write the cleaned document
        output: PathBuf,
    },

    /// Export pairs and their categories to CSV
    Export {
        /// TEI document
        doc: PathBuf,
        /// CSV file to write
        output: PathBuf,

        /// Also write the category list to this CSV file
        #[arg(long)]
        categories: Option<PathBuf>,

        /// Export both directions of every reading combination
        #[arg(long)]
        all_pairs: bool,
    },

    /// Apply classifications from a CSV file
    Import {
        /// TEI document
        doc: PathBuf,
        /// CSV file as written by `export`
        spreadsheet: PathBuf,
        /// Where to write the updated document
        output: PathBuf,

        /// Provenance for changed relations (default from config)
        #[arg(long)]
        responsible: Option<String>,
    },

    /// Classify unclassified pairs with a language model
    ///
    /// The API key is read from OPENAI_API_KEY. The output document is
    /// written after every accepted classification.
    Classify {
        /// TEI document
        doc: PathBuf,
        /// Where to write the classified document
        output: PathBuf,

        /// Request grouping
        #[arg(long, value_enum, default_value_t = ClassifyMode::Apparatus)]
        mode: ClassifyMode,

        /// Print the prompts instead of sending them
        #[arg(long)]
        prompt_only: bool,

        /// Categories neither offered nor accepted (repeatable)
        #[arg(long)]
        ignore: Vec<String>,

        /// Representative examples per category (default from config)
        #[arg(long)]
        examples: Option<usize>,

        /// Seed for example sampling (default from config)
        #[arg(long)]
        seed: Option<u64>,

        /// Model name (default from config)
        #[arg(long)]
        model: Option<String>,

        /// Chat completions base URL (default from config)
        #[arg(long)]
        endpoint: Option<String>,

        /// Sampling temperature (default from config)
        #[arg(long)]
        temperature: Option<f64>,

        /// Pair mode: classify both directions of every combination
        #[arg(long)]
        all_pairs: bool,

        /// Only classify these apparatuses (repeatable)
        #[arg(long = "apparatus")]
        apparatus: Vec<String>,

        /// Send at most this many requests
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the representative examples of a category
    Examples {
        /// TEI document
        doc: PathBuf,
        /// Category name
        category: String,

        /// Number of examples (default from config)
        #[arg(short = 'k', long)]
        count: Option<usize>,

        /// Sampling seed (default from config)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List the keys accepted by `edit`
    Keys {
        /// TEI document
        doc: PathBuf,
    },

    /// Apply one edit and write the document
    Edit {
        /// TEI document
        doc: PathBuf,
        /// Where to write the edited document
        output: PathBuf,

        #[command(subcommand)]
        command: EditCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Edit subcommands
#[derive(Subcommand, Debug)]
pub enum EditCommands {
    /// Add or remove a category on a pair
    RelationType {
        /// Pair key (see `rdgai keys`)
        pair: String,
        /// Category key
        relation_type: String,
        /// Whether to add or remove the category
        #[arg(value_enum)]
        operation: Operation,

        /// Provenance for added relations (default from config)
        #[arg(long)]
        responsible: Option<String>,
    },

    /// Set or clear the description of a pair
    Description {
        /// Pair key (see `rdgai keys`)
        pair: String,
        /// New description; omit to clear
        text: Option<String>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration and where each value came from
    Show,

    /// Write a config file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_classify() {
        let cli = Cli::parse_from([
            "rdgai", "-H", "classify", "in.xml", "out.xml", "--mode", "pair", "--ignore", "a",
            "--ignore", "b", "--limit", "3",
        ]);
        assert!(cli.human_readable);
        match cli.command {
            Commands::Classify {
                mode, ignore, limit, ..
            } => {
                assert_eq!(mode, ClassifyMode::Pair);
                assert_eq!(ignore, vec!["a", "b"]);
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_edit_relation_type() {
        let cli = Cli::parse_from([
            "rdgai", "edit", "in.xml", "out.xml", "relation-type", "app: a ➞ b", "category1",
            "remove",
        ]);
        match cli.command {
            Commands::Edit {
                command: EditCommands::RelationType { operation, .. },
                ..
            } => assert_eq!(operation, Operation::Remove),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
