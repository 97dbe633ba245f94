use crate::hal::buffer_list;
use crate::hal::error::{status, OsStatus};
use crate::hal::traits::PropertyBackend;
use crate::hal::types::{
    DefaultKind, DeviceId, ObjectId, PropertyAddress, Scope, Selector, SYSTEM_OBJECT, UNKNOWN_OBJECT,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// One device of the simulated hardware
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedDevice {
    pub id: DeviceId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    /// Channels per input buffer
    #[serde(default)]
    pub input_channels: Vec<u32>,
    /// Channels per output buffer
    #[serde(default)]
    pub output_channels: Vec<u32>,
}

impl SimulatedDevice {
    pub fn new(id: DeviceId, name: &str, uid: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            uid: Some(uid.to_string()),
            ..Default::default()
        }
    }

    pub fn with_input(mut self, channels: &[u32]) -> Self {
        self.input_channels = channels.to_vec();
        self
    }

    pub fn with_output(mut self, channels: &[u32]) -> Self {
        self.output_channels = channels.to_vec();
        self
    }
}

/// Fixture format for simulated hardware
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedLayout {
    pub devices: Vec<SimulatedDevice>,
    #[serde(default)]
    pub default_input: Option<DeviceId>,
    #[serde(default)]
    pub default_output: Option<DeviceId>,
    #[serde(default)]
    pub system_output: Option<DeviceId>,
}

#[derive(Debug, Default)]
struct SimulatedState {
    devices: Vec<SimulatedDevice>,
    selectors: [DeviceId; 3],
    device_list_missing: bool,
    rejected: HashSet<DefaultKind>,
    unreadable: HashSet<(ObjectId, Selector)>,
    write_attempts: usize,
}

impl SimulatedState {
    fn device(&self, id: ObjectId) -> Option<&SimulatedDevice> {
        self.devices.iter().find(|d| d.id == id)
    }

    fn value(&self, object: ObjectId, address: &PropertyAddress) -> Result<Vec<u8>, OsStatus> {
        if object == SYSTEM_OBJECT {
            return match address.selector {
                Selector::Devices if self.device_list_missing => Err(status::UNKNOWN_PROPERTY),
                Selector::Devices => Ok(self.devices.iter().flat_map(|d| d.id.to_ne_bytes()).collect()),
                selector => match default_kind(selector) {
                    Some(kind) => Ok(self.selectors[slot(kind)].to_ne_bytes().to_vec()),
                    None => Err(status::UNKNOWN_PROPERTY),
                },
            };
        }

        let device = self.device(object).ok_or(status::BAD_OBJECT)?;
        match (address.selector, address.scope) {
            (Selector::DeviceName, _) => device
                .name
                .as_ref()
                .map(|name| name.as_bytes().to_vec())
                .ok_or(status::UNKNOWN_PROPERTY),
            (Selector::DeviceUid, _) => device
                .uid
                .as_ref()
                .map(|uid| uid.as_bytes().to_vec())
                .ok_or(status::UNKNOWN_PROPERTY),
            (Selector::StreamConfiguration, Scope::Input) => {
                Ok(buffer_list::encode_channel_counts(&device.input_channels))
            }
            (Selector::StreamConfiguration, Scope::Output) => {
                Ok(buffer_list::encode_channel_counts(&device.output_channels))
            }
            _ => Err(status::UNKNOWN_PROPERTY),
        }
    }
}

fn default_kind(selector: Selector) -> Option<DefaultKind> {
    DefaultKind::ALL.into_iter().find(|kind| kind.selector() == selector)
}

fn slot(kind: DefaultKind) -> usize {
    match kind {
        DefaultKind::Input => 0,
        DefaultKind::Output => 1,
        DefaultKind::System => 2,
    }
}

/// In-memory hardware implementing the same property protocol as the OS
///
/// Strings are stored as UTF-8 bytes and channel layouts in the native
/// buffer-list layout. The default slots live behind a mutex so the
/// simulation can be shared like the real hardware.
#[derive(Debug, Default)]
pub struct SimulatedHardware {
    state: Mutex<SimulatedState>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_layout(layout: SimulatedLayout) -> Self {
        let hardware = Self::new();
        {
            let mut state = hardware.lock();
            state.devices = layout.devices;
            state.selectors = [
                layout.default_input.unwrap_or(UNKNOWN_OBJECT),
                layout.default_output.unwrap_or(UNKNOWN_OBJECT),
                layout.system_output.unwrap_or(UNKNOWN_OBJECT),
            ];
        }
        hardware
    }

    /// Load a [`SimulatedLayout`] fixture from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read simulated devices from {:?}", path))?;
        let layout: SimulatedLayout = serde_json::from_str(&json)
            .context("Failed to parse simulated devices JSON")?;
        Ok(Self::from_layout(layout))
    }

    pub fn with_device(self, device: SimulatedDevice) -> Self {
        self.lock().devices.push(device);
        self
    }

    pub fn with_default(self, kind: DefaultKind, id: DeviceId) -> Self {
        self.lock().selectors[slot(kind)] = id;
        self
    }

    /// Current raw value of a default slot, `UNKNOWN_OBJECT` when empty
    pub fn selector(&self, kind: DefaultKind) -> DeviceId {
        self.lock().selectors[slot(kind)]
    }

    /// Make every future write to `kind` fail
    pub fn reject_writes(&self, kind: DefaultKind) {
        self.lock().rejected.insert(kind);
    }

    /// Make reads of `selector` on `object` fail after a successful size query
    pub fn fail_reads(&self, object: ObjectId, selector: Selector) {
        self.lock().unreadable.insert((object, selector));
    }

    /// Stop exposing the device list property
    pub fn hide_device_list(&self) {
        self.lock().device_list_missing = true;
    }

    /// Unplug a device
    pub fn remove_device(&self, id: DeviceId) {
        self.lock().devices.retain(|d| d.id != id);
    }

    /// Number of write attempts, successful or not
    pub fn write_attempts(&self) -> usize {
        self.lock().write_attempts
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PropertyBackend for SimulatedHardware {
    fn backend_id(&self) -> &str {
        "simulated"
    }

    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus> {
        self.lock().value(object, address).map(|value| value.len() as u32)
    }

    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus> {
        let state = self.lock();
        if state.unreadable.contains(&(object, address.selector)) {
            return Err(status::ILLEGAL_OPERATION);
        }
        let value = state.value(object, address)?;
        let n = value.len().min(buf.len());
        buf[..n].copy_from_slice(&value[..n]);
        Ok(n)
    }

    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus> {
        let mut state = self.lock();
        state.write_attempts += 1;

        let kind = match default_kind(address.selector) {
            Some(kind) if object == SYSTEM_OBJECT => kind,
            _ => return Err(status::ILLEGAL_OPERATION),
        };
        if state.rejected.contains(&kind) {
            return Err(status::ILLEGAL_OPERATION);
        }
        let word: [u8; 4] = data.try_into().map_err(|_| status::BAD_PROPERTY_SIZE)?;
        let id = u32::from_ne_bytes(word);
        if state.device(id).is_none() {
            return Err(status::BAD_DEVICE);
        }

        state.selectors[slot(kind)] = id;
        Ok(())
    }

    fn decode_string(&self, raw: &[u8]) -> Option<String> {
        String::from_utf8(raw.to_vec()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_json() {
        let json = r#"{
            "devices": [
                { "id": 41, "name": "Mic", "uid": "mic-1", "input_channels": [1] },
                { "id": 52, "name": "Speakers", "output_channels": [2] }
            ],
            "default_input": 41
        }"#;

        let layout: SimulatedLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.devices.len(), 2);
        assert_eq!(layout.devices[1].uid, None);
        assert_eq!(layout.default_output, None);

        let hardware = SimulatedHardware::from_layout(layout);
        assert_eq!(hardware.selector(DefaultKind::Input), 41);
        assert_eq!(hardware.selector(DefaultKind::Output), UNKNOWN_OBJECT);
    }

    #[test]
    fn test_stream_configuration_size_tracks_buffers() {
        let hardware = SimulatedHardware::new()
            .with_device(SimulatedDevice::new(7, "Interface", "if-7").with_input(&[2, 2, 2, 2]));

        let address = PropertyAddress::scoped(Selector::StreamConfiguration, Scope::Input);
        let size = hardware.property_size(7, &address).unwrap();
        assert_eq!(size as usize, buffer_list::encoded_len(4));
    }

    #[test]
    fn test_write_counts_attempts_and_validates_target() {
        let hardware = SimulatedHardware::new()
            .with_device(SimulatedDevice::new(7, "Interface", "if-7").with_output(&[2]));
        let address = PropertyAddress::global(Selector::DefaultOutputDevice);

        assert_eq!(
            hardware.write_property(SYSTEM_OBJECT, &address, &99u32.to_ne_bytes()),
            Err(status::BAD_DEVICE)
        );
        hardware
            .write_property(SYSTEM_OBJECT, &address, &7u32.to_ne_bytes())
            .unwrap();

        assert_eq!(hardware.write_attempts(), 2);
        assert_eq!(hardware.selector(DefaultKind::Output), 7);
    }

    #[test]
    fn test_missing_name_is_unknown_property() {
        let hardware = SimulatedHardware::new().with_device(SimulatedDevice {
            id: 3,
            ..Default::default()
        });
        let address = PropertyAddress::global(Selector::DeviceName);
        assert_eq!(hardware.property_size(3, &address), Err(status::UNKNOWN_PROPERTY));
    }
}
