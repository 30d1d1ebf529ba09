//! Clap derive structures for the `sgivu` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sgivu -- browse and manage sgivu resource lists
#[derive(Debug, Parser)]
#[command(
    name = "sgivu",
    version,
    about = "Browse sgivu resource lists from the command line",
    long_about = "Paged listings with KPI counts for users, persons, companies,\n\
        cars and motorcycles served by an sgivu gateway.\n\n\
        Filters use the same query keys as the web list screens\n\
        (e.g. --query carBrand=Mazda --query carMinSalePrice=25000).",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "SGIVU_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway URL (overrides profile)
    #[arg(long, env = "SGIVU_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SGIVU_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SGIVU_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SGIVU_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show one page of a resource with active/inactive counts
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a single record
    Get(RecordArgs),

    /// Delete a record
    #[command(alias = "rm")]
    Delete(RecordArgs),

    /// Change a record's status
    Status(StatusArgs),

    /// Show the aggregate counts reported by the gateway
    Counts(ResourceArgs),

    /// List known resources
    Resources,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Resource name (users, persons, companies, cars, motorcycles, ...)
    pub resource: String,

    /// Zero-based page index
    #[arg(long, short = 'P')]
    pub page: Option<String>,

    /// Filter as a list-URL query parameter (repeatable)
    #[arg(long, short = 'Q', value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct ResourceArgs {
    /// Resource name
    pub resource: String,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Resource name
    pub resource: String,

    /// Record identifier
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Resource name
    pub resource: String,

    /// Record identifier
    pub id: i64,

    /// New status (e.g. "true", "false", "SOLD")
    pub status: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_owned(), v.to_owned()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}
