use super::error::OsStatus;
use super::types::{ObjectId, PropertyAddress};

/// Raw property primitives exposed by the host's audio hardware layer
///
/// Every call is a synchronous round-trip. Implementations do not cache:
/// the values behind these calls are owned by the operating system and may
/// change between any two calls.
pub trait PropertyBackend: Send + Sync {
    /// Backend identifier (e.g., "coreaudio", "simulated")
    fn backend_id(&self) -> &str;

    /// Current size in bytes of the property's value
    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus>;

    /// Fill `buf` with the property's value, returning the number of bytes written
    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus>;

    /// Replace the property's value with `data`
    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus>;

    /// Convert a native string handle, as laid out in a freshly read buffer,
    /// into an owned string.
    ///
    /// Called at most once per buffer, while the buffer is still alive. The
    /// implementation takes over whatever ownership the handle carries.
    fn decode_string(&self, raw: &[u8]) -> Option<String>;
}

impl<T: PropertyBackend + ?Sized> PropertyBackend for Box<T> {
    fn backend_id(&self) -> &str {
        (**self).backend_id()
    }

    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus> {
        (**self).property_size(object, address)
    }

    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus> {
        (**self).read_property(object, address, buf)
    }

    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus> {
        (**self).write_property(object, address, data)
    }

    fn decode_string(&self, raw: &[u8]) -> Option<String> {
        (**self).decode_string(raw)
    }
}
