use crate::hal::Device;
use anyhow::Result;
use serde_json::{Map, Value};
use std::io::Write;

/// A titled group of devices in the command output
pub struct Section<'a> {
    /// Key used in JSON output
    pub key: &'static str,
    pub title: &'static str,
    pub devices: Vec<&'a Device>,
}

/// Width of the name column: the longest name, but at least `minimum`
pub fn column_width(devices: &[Device], minimum: usize) -> usize {
    devices
        .iter()
        .filter_map(|d| d.name.as_deref())
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0)
        .max(minimum)
}

/// `   %3d: <name> [uid = <uid>, default]`, or `None` when name or uid is missing
pub fn device_line(device: &Device, width: usize) -> Option<String> {
    let name = device.name.as_deref()?;
    let uid = device.uid.as_deref()?;
    let default = if device.is_default() { ", default" } else { "" };
    Some(format!(
        "   {:>3}: {:<width$} [uid = {}{}]",
        device.id,
        name,
        uid,
        default,
        width = width
    ))
}

pub fn write_text(out: &mut impl Write, sections: &[Section<'_>], width: usize) -> Result<()> {
    for section in sections {
        writeln!(out, "{}", section.title)?;
        for line in section.devices.iter().filter_map(|d| device_line(d, width)) {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

/// One JSON object keyed by section, each holding its device array
pub fn write_json(out: &mut impl Write, sections: &[Section<'_>]) -> Result<()> {
    let mut object = Map::new();
    for section in sections {
        object.insert(section.key.to_string(), serde_json::to_value(&section.devices)?);
    }
    serde_json::to_writer_pretty(&mut *out, &Value::Object(object))?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{DeviceFlag, DeviceFlags};

    fn device(id: u32, name: Option<&str>, uid: Option<&str>, flags: &[DeviceFlag]) -> Device {
        Device {
            id,
            name: name.map(str::to_string),
            uid: uid.map(str::to_string),
            flags: flags.iter().copied().collect::<DeviceFlags>(),
        }
    }

    #[test]
    fn test_device_line_pads_name() {
        let mic = device(41, Some("Mic"), Some("mic-uid"), &[DeviceFlag::Input]);
        assert_eq!(device_line(&mic, 8).unwrap(), "    41: Mic      [uid = mic-uid]");
    }

    #[test]
    fn test_device_line_marks_default() {
        let out = device(
            52,
            Some("Speakers"),
            Some("spk"),
            &[DeviceFlag::Output, DeviceFlag::DefaultOutput],
        );
        assert_eq!(device_line(&out, 8).unwrap(), "    52: Speakers [uid = spk, default]");
    }

    #[test]
    fn test_device_line_skips_incomplete_device() {
        assert!(device_line(&device(1, None, Some("uid"), &[]), 4).is_none());
        assert!(device_line(&device(1, Some("name"), None, &[]), 4).is_none());
    }

    #[test]
    fn test_column_width() {
        let devices = vec![
            device(1, Some("Mic"), Some("a"), &[]),
            device(2, Some("Speakers"), Some("b"), &[]),
            device(3, None, Some("c"), &[]),
        ];
        assert_eq!(column_width(&devices, 0), 8);
        assert_eq!(column_width(&devices, 20), 20);
        assert_eq!(column_width(&[], 0), 0);
    }

    #[test]
    fn test_write_json_sections() {
        let mic = device(41, Some("Mic"), Some("mic-uid"), &[DeviceFlag::Input]);
        let sections = [Section {
            key: "input",
            title: "Input devices:",
            devices: vec![&mic],
        }];

        let mut buf = Vec::new();
        write_json(&mut buf, &sections).unwrap();

        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["input"][0]["id"], 41);
        assert_eq!(value["input"][0]["flags"][0], "input");
    }
}
