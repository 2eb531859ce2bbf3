//! Clap derive structures for the `ringlink` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ringlink -- Ring doorbells, cameras, and chimes from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "ringlink",
    version,
    about = "Control Ring doorbells, cameras, and chimes from the command line",
    long_about = "Talks to the Ring cloud on behalf of one account.\n\n\
        Run `ringlink login` once; the session is then refreshed automatically\n\
        from the stored refresh token.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "RINGLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Settings file holding the session tokens
    #[arg(long, env = "RINGLINK_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "RINGLINK_OUTPUT",
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

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "RINGLINK_TIMEOUT", global = true)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in to the Ring account (prompts for a two-factor code if needed)
    Login(LoginArgs),

    /// Forget the stored session tokens
    Logout,

    /// List doorbells, cameras, and chimes
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// Show currently active dings and motion events
    Dings,

    /// Show or change location security modes
    #[command(alias = "mode")]
    Modes(ModesArgs),

    /// Stream alarms, dings, and mode changes until interrupted
    Watch(WatchArgs),

    /// Capture a snapshot from a camera or doorbell
    #[command(alias = "snap")]
    Snapshot(SnapshotArgs),

    /// Play the ding sound on a chime
    Chime(DeviceArg),

    /// Switch a camera floodlight
    Light(SwitchArgs),

    /// Switch a camera siren
    Siren(SwitchArgs),

    /// Enable or disable motion detection or motion alerts
    Motion(MotionArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Subcommand Arguments ─────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (defaults to account.username from config)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Store the password in the system keyring after a successful login
    #[arg(long)]
    pub save_password: bool,
}

#[derive(Debug, Args)]
pub struct ModesArgs {
    #[command(subcommand)]
    pub command: Option<ModesCommand>,
}

#[derive(Debug, Subcommand)]
pub enum ModesCommand {
    /// List every location and its current mode
    List,

    /// Set a location's mode
    Set {
        /// Location ID (see `ringlink modes`)
        location: String,

        /// Target mode, e.g. home, away, disarmed
        mode: String,
    },
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this long (e.g. "90s", "10m"); runs until Ctrl-C otherwise
    #[arg(long, value_name = "DURATION")]
    pub duration: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeviceArg {
    /// Device ID (see `ringlink devices`)
    pub device: u64,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Device ID (see `ringlink devices`)
    pub device: u64,

    /// Output file (defaults to snapshot-<device>.jpg)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SwitchArgs {
    /// Device ID (see `ringlink devices`)
    pub device: u64,

    pub state: Switch,
}

#[derive(Debug, Args)]
pub struct MotionArgs {
    /// Device ID (see `ringlink devices`)
    pub device: u64,

    pub state: Switch,

    /// Change the motion push subscription instead of detection itself
    #[arg(long)]
    pub alerts: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config and settings file locations
    Path,

    /// Print the effective configuration (secrets redacted)
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
