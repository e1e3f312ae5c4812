use std::path::PathBuf;

use clap::{Parser, Subcommand};
use infrastructure::config::{LogFormat, LogLevel};
use infrastructure::constants::{DEFAULT_CONFIG_PATH, DEFAULT_SOCKET_PATH};

#[derive(Parser, Debug)]
#[command(
    name = "wireward-agent",
    about = "Zero-trust WireGuard gateway authorization agent",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Log level override (takes precedence over the config file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Log format: json (production) or text (development)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Control socket of a running agent (for subcommands)
    #[arg(long, env = "WIREWARD_SOCKET", global = true)]
    pub socket: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn socket_path(&self) -> PathBuf {
        PathBuf::from(self.socket.as_deref().unwrap_or(DEFAULT_SOCKET_PATH))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage enrolled devices
    #[command(subcommand)]
    Devices(DevicesCommand),

    /// List authorized sessions
    Sessions,

    /// Dump the compiled per-user firewall tables
    Firewall,

    /// Re-read the configuration and reconcile tables and devices
    Reload,

    /// Manage pending enrolment registrations
    #[command(subcommand)]
    Registrations(RegistrationsCommand),

    /// Query the running agent's version
    Version {
        /// Report the loaded eBPF object digest instead
        #[arg(long)]
        bpf: bool,
    },

    /// Ask the running agent to shut down
    Shutdown,

    /// Manage eBPF object pinning
    #[command(subcommand)]
    Ebpf(EbpfCommand),
}

#[derive(Subcommand, Debug)]
pub enum DevicesCommand {
    /// List devices, optionally for a single user
    List {
        #[arg(long)]
        username: Option<String>,
    },
    /// Remove every device belonging to a user
    Delete { username: String },
    /// Lock a user's devices (clears sessions, blocks authorize)
    Lock { username: String },
    /// Unlock a user's devices
    Unlock { username: String },
}

#[derive(Subcommand, Debug)]
pub enum RegistrationsCommand {
    /// List pending registrations
    List,
    /// Create a registration (token auto-generated when omitted)
    Create {
        username: String,
        #[arg(long)]
        token: Option<String>,
    },
    /// Delete a registration by token
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum EbpfCommand {
    /// Pin the loaded object's link and maps to the BPF filesystem
    Pin,
    /// Remove previously created pins
    Unpin,
}

pub fn parse() -> Cli {
    Cli::parse()
}
