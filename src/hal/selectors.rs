use super::error::PropertyError;
use super::property::PropertyStore;
use super::traits::PropertyBackend;
use super::types::{DefaultKind, DefaultSelectors, DeviceId, PropertyAddress, SYSTEM_OBJECT, UNKNOWN_OBJECT};

/// Accessors for the three global default device slots
///
/// Nothing is cached here; every call goes to the backend.
impl<B: PropertyBackend> PropertyStore<B> {
    /// Device currently occupying `kind`, `None` when the slot is empty
    pub fn default_device(&self, kind: DefaultKind) -> Result<Option<DeviceId>, PropertyError> {
        let id = self.read_u32(SYSTEM_OBJECT, &PropertyAddress::global(kind.selector()))?;
        Ok((id != UNKNOWN_OBJECT).then_some(id))
    }

    /// Overwrite the `kind` slot with `id`
    pub fn set_default_device(&self, kind: DefaultKind, id: DeviceId) -> Result<(), PropertyError> {
        self.write_u32(SYSTEM_OBJECT, &PropertyAddress::global(kind.selector()), id)
    }

    /// Sample all three slots once
    ///
    /// A slot that cannot be read is treated as empty.
    pub fn default_selectors(&self) -> DefaultSelectors {
        let mut defaults = DefaultSelectors::default();
        for kind in DefaultKind::ALL {
            match self.default_device(kind) {
                Ok(id) => defaults.set(kind, id),
                Err(e) => log::warn!("could not read {} selector: {}", kind, e),
            }
        }
        defaults
    }
}
