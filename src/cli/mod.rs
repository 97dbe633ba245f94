//! Command-line surface of the `adm` binary

pub mod commands;
pub mod display;

pub use commands::{execute, run, RenderOptions};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "adm")]
#[command(version, about = "ADM - A CLI utility for managing audio devices.")]
pub struct Cli {
    /// Print devices as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: ~/.adm/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(flatten)]
    Device(DeviceCommand),

    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Commands that run against the audio hardware
#[derive(Subcommand, Debug, Clone)]
pub enum DeviceCommand {
    /// Print available audio devices.
    List(SectionFlags),

    /// Set or get default input and output devices.
    Defaults {
        #[command(subcommand)]
        action: DefaultsAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum DefaultsAction {
    /// Get default input or output device.
    Get(SectionFlags),

    /// Set default input or output device.
    Set(SetArgs),
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,

    /// Write a default configuration file if none exists.
    Init,
}

/// Which device groups a command operates on
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct SectionFlags {
    /// Input audio devices.
    #[arg(short, long)]
    pub input: bool,

    /// Output audio devices.
    #[arg(short, long)]
    pub output: bool,

    /// System output audio device.
    #[arg(short, long)]
    pub system: bool,
}

impl SectionFlags {
    pub fn any(&self) -> bool {
        self.input || self.output || self.system
    }
}

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    #[command(flatten)]
    pub sections: SectionFlags,

    /// Also set system output device when setting the default output device.
    #[arg(short, long)]
    pub force: bool,

    /// Specify audio device name instead of audio device id.
    #[arg(short, long, conflicts_with = "uid")]
    pub name: bool,

    /// Specify audio device uid instead of audio device id.
    #[arg(short, long)]
    pub uid: bool,

    /// An audio device id, name or uid to operate on.
    pub value: String,
}
