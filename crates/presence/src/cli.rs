//! Clap derive structures for the `presence` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// presence -- manage device presence and capabilities from the shell
#[derive(Debug, Parser)]
#[command(
    name = "presence",
    version,
    about = "Manage presence-tracked devices and capabilities from the command line",
    long_about = "Command-line client for the presence add-on.\n\n\
        Lists and registers devices seen on the router, edits capability\n\
        templates, and switches device or global capability states.\n\
        Works directly against the add-on or through an ingress proxy.",
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
    /// Profile to use
    #[arg(long, short = 'p', env = "PRESENCE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Add-on URL or dashboard URL (overrides profile)
    #[arg(long, short = 's', env = "PRESENCE_SERVER", global = true)]
    pub server: Option<String>,

    /// Ingress base path (detected from --server when omitted)
    #[arg(long, env = "PRESENCE_BASE_PATH", global = true)]
    pub base_path: Option<String>,

    /// Bearer token for proxies that require one
    #[arg(long, env = "PRESENCE_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PRESENCE_OUTPUT",
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

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "PRESENCE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "PRESENCE_TIMEOUT", global = true)]
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, inspect, and register devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage capability templates and their device assignments
    #[command(alias = "caps", alias = "c")]
    Capabilities(CapabilitiesArgs),

    /// View and switch global capabilities
    #[command(alias = "g")]
    Global(GlobalArgs),

    /// List the action and state source types the add-on offers
    Primitives(PrimitivesArgs),

    /// Manage saved device list views
    Views(ViewsArgs),

    /// Show add-on health and device counts
    Status,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RegistrationArg {
    All,
    New,
    Registered,
    Unregistered,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OnlineArg {
    Any,
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Name,
    Mac,
    Vendor,
    Ip,
    LastSeen,
    Status,
    Online,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IconArg {
    Wifi,
    Wired,
    Unknown,
}

/// Filter flags shared by `devices list`, `devices register-all` and
/// `views save`.
#[derive(Debug, Args)]
pub struct DeviceFilterArgs {
    /// Registration status
    #[arg(long, value_enum, default_value = "all")]
    pub status: RegistrationArg,

    /// Connectivity
    #[arg(long, value_enum, default_value = "any")]
    pub online: OnlineArg,

    /// Case-insensitive text search over name, MAC, vendor, IP, subnet and sources
    #[arg(long)]
    pub search: Option<String>,

    /// Only these vendors (repeatable; "Unknown" matches blank)
    #[arg(long = "vendor", value_name = "VENDOR")]
    pub vendors: Vec<String>,

    /// Only devices seen by these sources (repeatable)
    #[arg(long = "source", value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Only these subnets (repeatable)
    #[arg(long = "subnet", value_name = "CIDR")]
    pub subnets: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        filter: DeviceFilterArgs,

        /// Start from a saved view (id or name); flags add to it
        #[arg(long)]
        view: Option<String>,

        /// Sort column
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: usize,

        /// Rows per page
        #[arg(long, short = 'l')]
        page_size: Option<usize>,

        /// Print every matching row
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Show one device
    Get {
        /// Device MAC address
        mac: String,
    },

    /// Register a new device
    Register {
        /// Device MAC address
        mac: String,

        #[command(flatten)]
        fields: DeviceFieldArgs,
    },

    /// Edit a registered device
    #[command(alias = "edit")]
    Update {
        /// Device MAC address
        mac: String,

        #[command(flatten)]
        fields: DeviceFieldArgs,
    },

    /// Register every matching unregistered device with a default name
    RegisterAll {
        #[command(flatten)]
        filter: DeviceFilterArgs,
    },

    /// Ask the add-on to poll the router now
    Refresh,

    /// Device counts by status and connectivity
    Summary,

    /// List a device's capabilities and their current state
    #[command(alias = "caps")]
    Capabilities {
        /// Device MAC address
        mac: String,
    },

    /// Change one of a device's capabilities
    Set {
        /// Device MAC address
        mac: String,

        /// Capability id
        capability: String,

        #[command(flatten)]
        patch: PatchArgs,
    },
}

#[derive(Debug, Args)]
pub struct DeviceFieldArgs {
    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Connection type shown as the device icon
    #[arg(long, value_enum)]
    pub icon: Option<IconArg>,

    /// Free-form note (max 200 characters; empty clears it)
    #[arg(long)]
    pub comment: Option<String>,
}

/// `{state?, enabled?}` capability patch; at least one is required.
#[derive(Debug, Args)]
pub struct PatchArgs {
    /// New state value
    #[arg(long)]
    pub state: Option<String>,

    /// Enable the capability
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    /// Disable the capability
    #[arg(long)]
    pub disable: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CAPABILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CapabilitiesArgs {
    #[command(subcommand)]
    pub command: CapabilitiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CapabilitiesCommand {
    /// List capability templates
    #[command(alias = "ls")]
    List {
        /// Search label, id and description
        #[arg(long)]
        search: Option<String>,

        /// Only this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show one template
    Get {
        /// Capability id
        id: String,
    },

    /// Print an empty template to start from
    Template,

    /// Create a template from a JSON file
    Create {
        /// Path to the template JSON
        #[arg(long, short = 'F', value_name = "FILE")]
        from_file: PathBuf,
    },

    /// Replace a template from a JSON file
    Update {
        /// Capability id
        id: String,

        /// Path to the template JSON
        #[arg(long, short = 'F', value_name = "FILE")]
        from_file: PathBuf,
    },

    /// Copy a template under a fresh id
    #[command(alias = "cp")]
    Duplicate {
        /// Capability id to copy
        id: String,
    },

    /// Delete a template
    #[command(alias = "rm")]
    Delete {
        /// Capability id
        id: String,
    },

    /// List categories in use plus the built-in ones
    Categories,

    /// List the devices a capability applies to
    Assignments {
        /// Capability id
        id: String,
    },

    /// Change a capability on one assigned device
    Assign {
        /// Capability id
        id: String,

        /// Device id (MAC)
        device: String,

        #[command(flatten)]
        patch: PatchArgs,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GLOBAL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub command: GlobalCommand,
}

#[derive(Debug, Subcommand)]
pub enum GlobalCommand {
    /// List global capabilities
    #[command(alias = "ls")]
    List,

    /// Change a global capability
    Set {
        /// Capability id
        capability: String,

        #[command(flatten)]
        patch: PatchArgs,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PRIMITIVES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PrimitivesArgs {
    #[command(subcommand)]
    pub command: PrimitivesCommand,
}

#[derive(Debug, Subcommand)]
pub enum PrimitivesCommand {
    /// Action types that can run on state entry
    Actions,

    /// State source types usable for sync
    Sources,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VIEWS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ViewsArgs {
    #[command(subcommand)]
    pub command: ViewsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ViewsCommand {
    /// List saved views, newest first
    #[command(alias = "ls")]
    List,

    /// Save a filter as a view
    Save {
        /// View name (defaults to "View HH:MM:SS")
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        filter: DeviceFilterArgs,
    },

    /// Remove a saved view
    #[command(alias = "rm")]
    Remove {
        /// View id or name
        view: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Set a profile value
    Set {
        /// Key: server, base_path, token_env, ca_cert, insecure, timeout
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a bearer token in the system keyring (uses --profile)
    SetToken,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
