//! Clap derive structures for the `pigmea` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

use pigmea_core::{ClientStatus, Priority, Stage};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pigmea -- inspect the shop's shared record cache from a terminal
#[derive(Debug, Parser)]
#[command(
    name = "pigmea",
    version,
    about = "Query clients, sales reps and production orders",
    long_about = "Command-line client for the Pigmea print-shop backend.\n\n\
        Lists records through the shared cache, follows live push updates,\n\
        and runs the same uniqueness checks the editors use.",
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
    /// Backend profile to use
    #[arg(long, short = 'p', env = "PIGMEA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 'b', env = "PIGMEA_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Bearer token (overrides profile and keyring)
    #[arg(long, env = "PIGMEA_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PIGMEA_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PIGMEA_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "PIGMEA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Record kind selector shared by `watch` and `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    #[value(alias = "client", alias = "clientes")]
    Clients,
    #[value(alias = "rep", alias = "vendedores")]
    Reps,
    #[value(alias = "order", alias = "pedidos")]
    Orders,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse clients
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Browse sales reps
    #[command(alias = "vendedores")]
    Reps(RepsArgs),

    /// Browse production orders
    #[command(alias = "pedidos")]
    Orders(OrdersArgs),

    /// Follow live changes for one record kind
    Watch(WatchArgs),

    /// Check whether a unique value is already taken
    Check(CheckArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Clients ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    /// List clients
    #[command(alias = "ls")]
    List(ClientListArgs),
}

#[derive(Debug, Args)]
pub struct ClientListArgs {
    /// Case-insensitive match on name, legal name or tax id
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Only clients in this state
    #[arg(long, value_parser = parse_client_status)]
    pub status: Option<ClientStatus>,

    /// Include archived clients
    #[arg(long, short = 'a')]
    pub all: bool,
}

// ── Sales reps ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RepsArgs {
    #[command(subcommand)]
    pub command: RepsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RepsCommand {
    /// List sales reps
    #[command(alias = "ls")]
    List(RepListArgs),
}

#[derive(Debug, Args)]
pub struct RepListArgs {
    /// Case-insensitive match on name
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Only active reps
    #[arg(long, conflicts_with = "inactive")]
    pub active: bool,

    /// Only inactive reps
    #[arg(long)]
    pub inactive: bool,
}

// ── Orders ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct OrdersArgs {
    #[command(subcommand)]
    pub command: OrdersCommand,
}

#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    /// List production orders
    #[command(alias = "ls")]
    List(OrderListArgs),
}

#[derive(Debug, Args)]
pub struct OrderListArgs {
    /// Case-insensitive match on order number or client name
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Only orders in this stage (e.g. PREPARACION, IMPRESION_WM1)
    #[arg(long, value_parser = parse_stage)]
    pub stage: Option<Stage>,

    /// Only orders with this priority
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,

    /// Hide completed and archived orders
    #[arg(long)]
    pub in_production: bool,
}

// ── Watch / Check ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Record kind to follow
    pub kind: KindArg,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Record kind whose unique field is checked
    pub kind: KindArg,

    /// Candidate value (client name, rep name or order number)
    pub value: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile in the config file
    Init(ConfigInitArgs),

    /// Display the current configuration (tokens redacted)
    Show,

    /// Store a bearer token for a profile in the system keyring
    SetToken {
        /// Token value
        token: String,
    },
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Profile name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Backend URL
    #[arg(long, default_value = "http://localhost:8080")]
    pub url: String,

    /// User id sent as `x-user-id`
    #[arg(long)]
    pub user_id: Option<String>,

    /// Role sent as `x-user-role`
    #[arg(long, requires = "user_id")]
    pub role: Option<String>,

    /// Make this the default profile
    #[arg(long)]
    pub set_default: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

fn parse_client_status(raw: &str) -> Result<ClientStatus, String> {
    raw.to_lowercase()
        .parse()
        .map_err(|_| format!("unknown client status '{raw}' (activo, inactivo, archivado)"))
}

fn parse_stage(raw: &str) -> Result<Stage, String> {
    raw.parse().map_err(|_| {
        let known: Vec<&str> = Stage::KNOWN.iter().map(Stage::as_str).collect();
        format!("unknown stage '{raw}' ({})", known.join(", "))
    })
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    raw.parse()
        .map_err(|_| format!("unknown priority '{raw}' (Urgente, Alta, Normal, Baja)"))
}
