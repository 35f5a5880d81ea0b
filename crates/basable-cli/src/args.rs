use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "basable", version, about = "Browse, filter and edit Basable tables from a terminal")]
pub struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true, env = "BASABLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the Basable API
    #[arg(long, global = true, env = "BASABLE_BASE_URL")]
    pub base_url: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write JSON logs to the data directory
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured tables
    Tables,

    /// Show the columns of a table
    Columns { table: String },

    /// Fetch one page of rows
    Query {
        table: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Count rows matching the filters or search
    Count {
        table: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Export rows matching the filters or search
    Export {
        table: String,

        #[command(flatten)]
        query: QueryArgs,

        /// CSV, TSV, PSV, TEXT, JSON, HTML or XML
        #[arg(short = 'F', long, default_value = "csv")]
        format: String,

        /// Output file (defaults to the filename suggested by the server)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Update cells of one row, addressed by its unique-column value
    Edit {
        table: String,

        /// Unique-column value of the row to edit
        #[arg(long)]
        row_key: String,

        /// `column=value`, repeatable
        #[arg(long = "set", value_name = "COLUMN=VALUE", required = true)]
        assignments: Vec<String>,
    },

    /// Show or change a table's configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Delete every row of a table
    Clear {
        table: String,

        /// Skip the confirmation guard
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Drop a table
    Drop {
        table: String,

        /// Skip the confirmation guard
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// List filter operators
    Operators,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the stored configuration
    Show { table: String },

    /// Save a partial configuration
    Set {
        table: String,

        #[arg(long)]
        label: Option<String>,

        /// Column used to address rows when saving edits
        #[arg(long)]
        unique_column: Option<String>,

        #[arg(long)]
        created_column: Option<String>,

        #[arg(long)]
        page_size: Option<usize>,

        /// Column to hide, repeatable
        #[arg(long = "exclude", value_name = "COLUMN")]
        exclude: Vec<String>,

        /// Show every column again
        #[arg(long, conflicts_with = "exclude")]
        clear_excludes: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct QueryArgs {
    /// `[and|or] <column> <OPERATOR> [value] [end]`, repeatable
    #[arg(short, long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Free-text search
    #[arg(short, long, conflicts_with = "filters")]
    pub search: Option<String>,

    /// Column to search, repeatable (defaults to all text columns)
    #[arg(long = "search-col", value_name = "COLUMN", requires = "search")]
    pub search_cols: Vec<String>,

    /// Sort column
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Page number, starting at 1
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_query_with_filters() {
        let cli = Cli::parse_from([
            "basable",
            "query",
            "orders",
            "-f",
            "status EQUAL paid",
            "-f",
            "and total GREATER_THAN 100",
            "--sort",
            "total",
            "--desc",
            "--page",
            "2",
        ]);
        match cli.command {
            Commands::Query { table, query, json } => {
                assert_eq!(table, "orders");
                assert_eq!(query.filters.len(), 2);
                assert_eq!(query.sort.as_deref(), Some("total"));
                assert!(query.desc);
                assert_eq!(query.page, 2);
                assert!(!json);
            }
            _ => panic!("Expected query subcommand"),
        }
    }

    #[test]
    fn test_search_conflicts_with_filters() {
        let result = Cli::try_parse_from([
            "basable", "query", "orders", "-f", "status EQUAL paid", "-s", "ada",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::parse_from([
            "basable",
            "config",
            "set",
            "orders",
            "--unique-column",
            "id",
            "--exclude",
            "notes",
            "--exclude",
            "internal_ref",
        ]);
        match cli.command {
            Commands::Config {
                command:
                    ConfigCommand::Set {
                        unique_column,
                        exclude,
                        ..
                    },
            } => {
                assert_eq!(unique_column.as_deref(), Some("id"));
                assert_eq!(exclude, vec!["notes", "internal_ref"]);
            }
            _ => panic!("Expected config set subcommand"),
        }
    }

    #[test]
    fn test_edit_requires_assignment() {
        assert!(Cli::try_parse_from(["basable", "edit", "orders", "--row-key", "7"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["basable", "tables", "-vv", "--base-url", "http://db:5000/"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.base_url.as_deref(), Some("http://db:5000/"));
    }
}
