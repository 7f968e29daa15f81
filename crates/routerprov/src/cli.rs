//! Clap derive structures for the `routerprov` CLI.
//!
//! Complete command tree, global flags and shared argument groups. Kept
//! free of workspace types so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// routerprov -- provision RouterOS tunnels, OpenVPN servers and vCenter machines
#[derive(Debug, Parser)]
#[command(
    name = "routerprov",
    version,
    about = "Provision RouterOS tunnels, OpenVPN servers and vCenter machines",
    long_about = "Drives RouterOS devices over their REST interface to build GRE, EoIP,\n\
        VXLAN and IPIP tunnels between two routers, bootstraps OpenVPN servers\n\
        with a CA / server / client certificate triad, and creates batches of\n\
        virtual machines through the vCenter REST API.\n\n\
        Every command prints the operation envelope: data, status and message.",
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
    /// Config file (defaults to the platform config path)
    #[arg(long, env = "ROUTERPROV_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ROUTERPROV_OUTPUT",
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

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output, Color & Log Enums ────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON envelope
    Json,
    /// Compact single-line JSON envelope
    JsonCompact,
    /// YAML envelope
    Yaml,
    /// Plain text, one value per line (scripting)
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

#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create tunnels between two routers
    #[command(alias = "t")]
    Tunnel(TunnelArgs),

    /// Provision VPN servers
    Vpn(VpnArgs),

    /// Manage PPP secrets
    Secret(SecretArgs),

    /// Query a single router
    #[command(alias = "dev", alias = "d")]
    Device(DeviceArgs),

    /// vCenter clusters and machines
    Compute(ComputeArgs),

    /// Serve the workflows over HTTP
    Serve(ServeArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// JSON request body read from a file (`-` for stdin).
#[derive(Debug, Args)]
pub struct RequestFileArgs {
    /// Request JSON file, or `-` for stdin
    #[arg(long = "file", short = 'f', value_name = "PATH")]
    pub file: PathBuf,
}

/// How to reach and authenticate against one router.
#[derive(Debug, Args)]
pub struct EndpointArgs {
    /// Router address (IPv4 or domain name)
    #[arg(long, short = 'a')]
    pub address: String,

    /// Router REST port
    #[arg(long, default_value = "443")]
    pub port: u16,

    /// Router username
    #[arg(long, short = 'u', default_value = "admin")]
    pub username: String,

    /// Router password (prompted when absent)
    #[arg(long, env = "ROUTERPROV_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

// ── Tunnel ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TunnelArgs {
    #[command(subcommand)]
    pub command: TunnelCommand,
}

#[derive(Debug, Subcommand)]
pub enum TunnelCommand {
    /// Create a GRE / EoIP / VXLAN / IPIP tunnel between source and destination
    Create(RequestFileArgs),
}

// ── VPN ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VpnArgs {
    #[command(subcommand)]
    pub command: VpnCommand,
}

#[derive(Debug, Subcommand)]
pub enum VpnCommand {
    /// Provision a VPN server and print the client configuration
    Create(RequestFileArgs),
}

// ── Secret ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SecretArgs {
    #[command(subcommand)]
    pub command: SecretCommand,
}

#[derive(Debug, Subcommand)]
pub enum SecretCommand {
    /// Create a PPP secret
    Create(RequestFileArgs),
}

// ── Device ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// List IP addresses
    Addresses(EndpointArgs),

    /// Check connectivity and credentials
    Validate(EndpointArgs),

    /// List PPP profiles
    Profiles(EndpointArgs),

    /// List PPP secrets
    Secrets(EndpointArgs),

    /// Show system resource usage
    Resource(EndpointArgs),

    /// Ping a host from the router
    Ping {
        #[command(flatten)]
        endpoint: EndpointArgs,

        /// Host to ping
        #[arg(long, short = 't')]
        target: String,

        /// Echo requests to send
        #[arg(long, short = 'c')]
        count: Option<u32>,
    },
}

// ── Compute ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ComputeArgs {
    #[command(subcommand)]
    pub command: ComputeCommand,
}

#[derive(Debug, Subcommand)]
pub enum ComputeCommand {
    /// List clusters
    Clusters {
        /// vCenter address, optionally with scheme
        #[arg(long, short = 'a')]
        address: String,

        /// vCenter port
        #[arg(long)]
        port: Option<u16>,

        /// vCenter username
        #[arg(long, short = 'u')]
        username: String,

        /// vCenter password (prompted when absent)
        #[arg(long, env = "ROUTERPROV_COMPUTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create a batch of identical machines
    Create(RequestFileArgs),
}

// ── Serve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides `server.bind`)
    #[arg(long, short = 'b')]
    pub bind: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
