use super::buffer_list;
use super::error::{DeviceError, PropertyError};
use super::property::PropertyStore;
use super::traits::PropertyBackend;
use super::types::{
    DefaultKind, DefaultSelectors, Device, DeviceFlag, DeviceFlags, DeviceId, PropertyAddress,
    Scope, Selector, SYSTEM_OBJECT,
};

const DEVICE_LIST: PropertyAddress = PropertyAddress::global(Selector::Devices);

/// A default-slot write whose target passed the capability check
#[derive(Debug, Clone, Copy)]
struct CheckedWrite {
    kind: DefaultKind,
    id: DeviceId,
}

/// Enumerates audio devices and changes the default device slots
///
/// Holds no device state of its own: every call rebuilds what it needs from
/// the backend.
pub struct DeviceRegistry<B> {
    store: PropertyStore<B>,
}

impl<B: PropertyBackend> DeviceRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: PropertyStore::new(backend),
        }
    }

    pub fn store(&self) -> &PropertyStore<B> {
        &self.store
    }

    pub fn backend(&self) -> &B {
        self.store.backend()
    }

    /// All devices in the order the OS reports them
    ///
    /// The default selectors are sampled once, so the default flags in the
    /// returned list are consistent with each other.
    pub fn list_devices(&self) -> Result<Vec<Device>, DeviceError> {
        let ids = self.device_ids()?;
        let defaults = self.store.default_selectors();
        Ok(ids.into_iter().map(|id| self.describe(id, &defaults)).collect())
    }

    /// Fresh snapshot of a single device
    pub fn device(&self, id: DeviceId) -> Result<Device, DeviceError> {
        self.ensure_present(id)?;
        let defaults = self.store.default_selectors();
        Ok(self.describe(id, &defaults))
    }

    /// Make `id` the device for the `kind` slot
    ///
    /// Input needs input channels; output and system output need output
    /// channels. An incapable device is refused without touching the slot. A
    /// rejected write is reported and not retried.
    pub fn set_default(&self, kind: DefaultKind, id: DeviceId) -> Result<(), DeviceError> {
        let write = self.check(kind, id)?;
        self.apply(write)
    }

    /// Make `id` the default output device and then the system output device
    ///
    /// The system slot is only attempted once the output slot took the new
    /// value. A failure at that point is reported as
    /// [`DeviceError::SystemWriteRejectedAfterOutputSet`].
    pub fn force_default_output(&self, id: DeviceId) -> Result<(), DeviceError> {
        let output = self.check(DefaultKind::Output, id)?;
        self.apply(output)?;

        let system = CheckedWrite {
            kind: DefaultKind::System,
            ..output
        };
        self.apply(system).map_err(|err| match err {
            DeviceError::WriteRejected { source, .. } => {
                DeviceError::SystemWriteRejectedAfterOutputSet { id, source }
            }
            other => other,
        })
    }

    fn device_ids(&self) -> Result<Vec<DeviceId>, DeviceError> {
        match self.store.read_object_ids(SYSTEM_OBJECT, &DEVICE_LIST) {
            Ok(ids) => Ok(ids),
            Err(PropertyError::NotFound { status, .. }) => {
                log::debug!("no device list exposed (status {}), treating as empty", status);
                Ok(Vec::new())
            }
            Err(e) => Err(DeviceError::Enumeration(e)),
        }
    }

    fn ensure_present(&self, id: DeviceId) -> Result<(), DeviceError> {
        if self.device_ids()?.contains(&id) {
            Ok(())
        } else {
            Err(DeviceError::UnknownDevice(id))
        }
    }

    fn describe(&self, id: DeviceId, defaults: &DefaultSelectors) -> Device {
        let mut flags = self.capabilities(id);
        flags.extend(defaults.flags_for(id));

        Device {
            id,
            name: self.optional_string(id, Selector::DeviceName),
            uid: self.optional_string(id, Selector::DeviceUid),
            flags,
        }
    }

    fn capabilities(&self, id: DeviceId) -> DeviceFlags {
        let mut flags = DeviceFlags::new();
        if self.has_channels(id, Scope::Input) {
            flags.insert(DeviceFlag::Input);
        }
        if self.has_channels(id, Scope::Output) {
            flags.insert(DeviceFlag::Output);
        }
        flags
    }

    fn has_channels(&self, id: DeviceId, scope: Scope) -> bool {
        let address = PropertyAddress::scoped(Selector::StreamConfiguration, scope);
        match self.store.read_channel_counts(id, &address) {
            Ok(counts) => buffer_list::total_channels(&counts) > 0,
            Err(e) => {
                log::debug!("device {}: {}", id, e);
                false
            }
        }
    }

    fn optional_string(&self, id: DeviceId, selector: Selector) -> Option<String> {
        self.store
            .read_string(id, &PropertyAddress::global(selector))
            .map_err(|e| log::debug!("device {}: {}", id, e))
            .ok()
    }

    fn check(&self, kind: DefaultKind, id: DeviceId) -> Result<CheckedWrite, DeviceError> {
        self.ensure_present(id)?;
        if !self.capabilities(id).contains(kind.required_capability()) {
            return Err(DeviceError::IncapableDevice { id, kind });
        }
        Ok(CheckedWrite { kind, id })
    }

    fn apply(&self, write: CheckedWrite) -> Result<(), DeviceError> {
        let CheckedWrite { kind, id } = write;
        self.store.set_default_device(kind, id).map_err(|source| {
            log::warn!("{} slot refused device {}: {}", kind, id, source);
            DeviceError::WriteRejected { id, kind, source }
        })?;
        log::info!("{} device set to {}", kind, id);
        Ok(())
    }
}

/// How a user refers to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceQuery {
    Id(DeviceId),
    /// Case-insensitive name
    Name(String),
    /// Case-insensitive uid
    Uid(String),
}

impl DeviceQuery {
    pub fn matches(&self, device: &Device) -> bool {
        fn same(value: Option<&str>, wanted: &str) -> bool {
            value.is_some_and(|v| v.to_lowercase() == wanted.to_lowercase())
        }

        match self {
            DeviceQuery::Id(id) => device.id == *id,
            DeviceQuery::Name(name) => same(device.name.as_deref(), name),
            DeviceQuery::Uid(uid) => same(device.uid.as_deref(), uid),
        }
    }
}

/// First device in `devices` matching `query`
pub fn find_device<'a>(devices: &'a [Device], query: &DeviceQuery) -> Option<&'a Device> {
    devices.iter().find(|device| query.matches(device))
}
