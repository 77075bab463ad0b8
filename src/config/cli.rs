use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio content cache and revision tools")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Enable or disable the in-memory cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build the folder tree from exported folder records and print it as JSON.
    Tree(TreeArgs),
    /// Diff two files and print the unified diff, or HTML with --html.
    Diff(DiffArgs),
    /// Look up the latest published version of a package.
    Version(VersionArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TreeArgs {
    /// JSON array of folder records.
    #[arg(value_name = "RECORDS", value_hint = ValueHint::FilePath)]
    pub records: PathBuf,

    /// JSON array of page records to attach as leaves.
    #[arg(long = "pages", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub pages: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DiffArgs {
    #[arg(value_name = "OLD", value_hint = ValueHint::FilePath)]
    pub old: PathBuf,

    #[arg(value_name = "NEW", value_hint = ValueHint::FilePath)]
    pub new: PathBuf,

    /// Render the diff as an HTML table.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub html: bool,

    /// Place old and new lines in separate columns (implies --html).
    #[arg(long = "side-by-side", action = clap::ArgAction::SetTrue)]
    pub side_by_side: bool,

    /// Heading for the HTML output.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Override the maximum diff input size in bytes.
    #[arg(long = "diff-max-input-bytes", value_name = "BYTES")]
    pub max_input_bytes: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct VersionArgs {
    /// Package to look up instead of the configured one.
    #[arg(long, value_name = "NAME")]
    pub package: Option<String>,

    /// Override the package registry URL.
    #[arg(long = "registry-url", value_name = "URL")]
    pub registry_url: Option<String>,
}
