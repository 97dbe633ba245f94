use super::display::{self, Section};
use super::{Cli, Command, ConfigAction, DefaultsAction, DeviceCommand, SectionFlags, SetArgs};
use crate::config::ConfigManager;
use crate::hal::{
    find_device, DefaultKind, Device, DeviceError, DeviceFlag, DeviceQuery, DeviceRegistry,
    PropertyBackend,
};
use anyhow::Result;
use std::io::{self, Write};

/// Presentation settings for device output
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub json: bool,
    /// Minimum name column width
    pub padding: usize,
}

/// Entry point of the binary; returns whether every requested operation succeeded
pub fn execute(cli: Cli) -> Result<bool> {
    let manager = ConfigManager::new(cli.config.clone().unwrap_or_else(ConfigManager::default_path));
    let mut out = io::stdout().lock();

    let command = match cli.command {
        Some(Command::Config { action }) => return config_command(&manager, action, &mut out),
        Some(Command::Device(command)) => command,
        None => DeviceCommand::List(SectionFlags::default()),
    };

    let config = manager.load()?;
    let backend = config.open_backend()?;
    log::debug!("using {} backend", backend.backend_id());

    let registry = DeviceRegistry::new(backend);
    let options = RenderOptions {
        json: cli.json,
        padding: config.padding,
    };
    run(&command, &registry, options, &mut out)
}

/// Run one device command against `registry`, writing to `out`
pub fn run<B: PropertyBackend>(
    command: &DeviceCommand,
    registry: &DeviceRegistry<B>,
    options: RenderOptions,
    out: &mut impl Write,
) -> Result<bool> {
    match command {
        DeviceCommand::List(flags) => {
            let devices = registry.list_devices()?;
            let sections = list_sections(&devices, *flags);
            render(out, &devices, &sections, options)?;
            Ok(true)
        }
        DeviceCommand::Defaults {
            action: DefaultsAction::Get(flags),
        } => {
            let devices = registry.list_devices()?;
            let sections = default_sections(&devices, *flags);
            render(out, &devices, &sections, options)?;
            Ok(true)
        }
        DeviceCommand::Defaults {
            action: DefaultsAction::Set(args),
        } => set_defaults(registry, args, out),
    }
}

fn filtered(devices: &[Device], flag: DeviceFlag) -> Vec<&Device> {
    devices.iter().filter(|d| d.has(flag)).collect()
}

fn list_sections(devices: &[Device], mut flags: SectionFlags) -> Vec<Section<'_>> {
    if !flags.any() {
        flags = SectionFlags {
            input: true,
            output: true,
            system: true,
        };
    }

    let mut sections = Vec::new();
    if flags.input {
        sections.push(Section {
            key: "input",
            title: "Input devices:",
            devices: filtered(devices, DeviceFlag::Input),
        });
    }
    if flags.output {
        sections.push(Section {
            key: "output",
            title: "Output devices:",
            devices: filtered(devices, DeviceFlag::Output),
        });
    }
    if flags.system {
        sections.push(Section {
            key: "system",
            title: "System output device:",
            devices: filtered(devices, DeviceFlag::System),
        });
    }
    sections
}

fn default_sections(devices: &[Device], mut flags: SectionFlags) -> Vec<Section<'_>> {
    if !flags.any() {
        flags.input = true;
        flags.output = true;
    }

    let mut sections = Vec::new();
    if flags.input {
        sections.push(Section {
            key: "default_input",
            title: "Default input device:",
            devices: filtered(devices, DeviceFlag::DefaultInput),
        });
    }
    if flags.output {
        sections.push(Section {
            key: "default_output",
            title: "Default output device:",
            devices: filtered(devices, DeviceFlag::DefaultOutput),
        });
    }
    if flags.system {
        sections.push(Section {
            key: "system",
            title: "System output device:",
            devices: filtered(devices, DeviceFlag::System),
        });
    }
    sections
}

fn render(
    out: &mut impl Write,
    devices: &[Device],
    sections: &[Section<'_>],
    options: RenderOptions,
) -> Result<()> {
    if options.json {
        display::write_json(out, sections)
    } else {
        display::write_text(out, sections, display::column_width(devices, options.padding))
    }
}

fn device_query(args: &SetArgs) -> Option<DeviceQuery> {
    if args.name {
        Some(DeviceQuery::Name(args.value.clone()))
    } else if args.uid {
        Some(DeviceQuery::Uid(args.value.clone()))
    } else {
        args.value.trim().parse().ok().map(DeviceQuery::Id)
    }
}

fn set_defaults<B: PropertyBackend>(
    registry: &DeviceRegistry<B>,
    args: &SetArgs,
    out: &mut impl Write,
) -> Result<bool> {
    let flags = args.sections;
    if !flags.any() {
        writeln!(out, "Specify at least one of --input, --output or --system.")?;
        return Ok(false);
    }

    let devices = registry.list_devices()?;
    let Some(device) = device_query(args).and_then(|query| find_device(&devices, &query)) else {
        writeln!(out, "Can't find audio device {}", args.value)?;
        return Ok(false);
    };
    let id = device.id;

    let mut succeeded = true;
    if flags.input {
        succeeded &= report(out, registry.set_default(DefaultKind::Input, id))?;
    }
    if flags.output {
        let result = if args.force {
            registry.force_default_output(id)
        } else {
            registry.set_default(DefaultKind::Output, id)
        };
        succeeded &= report(out, result)?;
    }
    if flags.system {
        succeeded &= report(out, registry.set_default(DefaultKind::System, id))?;
    }
    Ok(succeeded)
}

/// Print the user-facing message for a failed mutation
fn report(out: &mut impl Write, result: Result<(), DeviceError>) -> Result<bool> {
    match result {
        Ok(()) => return Ok(true),
        Err(DeviceError::IncapableDevice { kind, .. }) => {
            let direction = if kind == DefaultKind::Input { "input" } else { "output" };
            writeln!(out, "The selected device has no {} channels.", direction)?;
        }
        Err(DeviceError::WriteRejected { kind, .. }) => {
            writeln!(out, "The selected device can't be selected as {} device.", kind)?;
        }
        Err(DeviceError::SystemWriteRejectedAfterOutputSet { .. }) => {
            writeln!(out, "The selected device can't be selected as system output device.")?;
        }
        Err(DeviceError::UnknownDevice(id)) => {
            writeln!(out, "Can't find audio device {}", id)?;
        }
        Err(err @ DeviceError::Enumeration(_)) => return Err(err.into()),
    }
    Ok(false)
}

fn config_command(manager: &ConfigManager, action: ConfigAction, out: &mut impl Write) -> Result<bool> {
    match action {
        ConfigAction::Show => {
            let config = manager.load()?;
            writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
        }
        ConfigAction::Init => {
            if manager.ensure_config_file()? {
                writeln!(out, "Wrote default configuration to {}", manager.path().display())?;
            } else {
                writeln!(out, "Configuration already exists at {}", manager.path().display())?;
            }
        }
    }
    Ok(true)
}
