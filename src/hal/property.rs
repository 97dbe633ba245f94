use super::buffer_list;
use super::error::{PropertyError, WriteFailure};
use super::traits::PropertyBackend;
use super::types::{ObjectId, PropertyAddress};
use std::mem::size_of;

/// Typed access to size-discovered hardware properties
///
/// Every read queries the property's current size, reads into a buffer of
/// exactly that size and decodes it before returning. The buffer is owned by
/// the read and dropped on every exit path; raw bytes never leave the store.
pub struct PropertyStore<B> {
    backend: B,
}

impl<B: PropertyBackend> PropertyStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Size in bytes of the property's current value
    pub fn query_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<usize, PropertyError> {
        self.backend
            .property_size(object, address)
            .map(|size| size as usize)
            .map_err(|status| PropertyError::NotFound {
                object,
                address: *address,
                status,
            })
    }

    fn read(&self, object: ObjectId, address: &PropertyAddress, size: usize) -> Result<Vec<u8>, PropertyError> {
        // An empty value has nothing to fetch; some HAL objects refuse a zero-length read.
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; size];
        let written = self
            .backend
            .read_property(object, address, &mut buf)
            .map_err(|status| PropertyError::Unreadable {
                object,
                address: *address,
                status,
            })?;
        buf.truncate(written.min(size));
        Ok(buf)
    }

    fn read_with<T>(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        decode: impl FnOnce(&[u8]) -> Result<T, String>,
    ) -> Result<T, PropertyError> {
        let size = self.query_size(object, address)?;
        let buf = self.read(object, address, size)?;
        decode(&buf).map_err(|detail| PropertyError::Malformed {
            object,
            address: *address,
            detail,
        })
    }

    /// Read a single 32-bit value
    pub fn read_u32(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, PropertyError> {
        self.read_with(object, address, |raw| {
            let word: [u8; 4] = raw
                .get(..size_of::<u32>())
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or_else(|| format!("expected 4 bytes, got {}", raw.len()))?;
            Ok(u32::from_ne_bytes(word))
        })
    }

    /// Read an array of object handles; the count follows from the size
    pub fn read_object_ids(&self, object: ObjectId, address: &PropertyAddress) -> Result<Vec<ObjectId>, PropertyError> {
        self.read_with(object, address, |raw| {
            if raw.len() % size_of::<ObjectId>() != 0 {
                return Err(format!("{} bytes is not a whole number of object ids", raw.len()));
            }
            Ok(raw
                .chunks_exact(size_of::<ObjectId>())
                .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect())
        })
    }

    /// Read a string property, converting the native handle right away
    pub fn read_string(&self, object: ObjectId, address: &PropertyAddress) -> Result<String, PropertyError> {
        self.read_with(object, address, |raw| {
            self.backend
                .decode_string(raw)
                .ok_or_else(|| "value is not a string".to_string())
        })
    }

    /// Read a stream configuration as per-buffer channel counts
    pub fn read_channel_counts(&self, object: ObjectId, address: &PropertyAddress) -> Result<Vec<u32>, PropertyError> {
        self.read_with(object, address, buffer_list::decode_channel_counts)
    }

    /// Write a replacement value
    ///
    /// The property's current size is queried first and must match `data`.
    pub fn write(&self, object: ObjectId, address: &PropertyAddress, data: &[u8]) -> Result<(), PropertyError> {
        let unwritable = |failure| PropertyError::Unwritable {
            object,
            address: *address,
            failure,
        };

        let expected = self
            .backend
            .property_size(object, address)
            .map_err(|status| unwritable(WriteFailure::SizeUnknown(status)))? as usize;
        if expected != data.len() {
            return Err(unwritable(WriteFailure::SizeMismatch {
                expected,
                actual: data.len(),
            }));
        }

        self.backend
            .write_property(object, address, data)
            .map_err(|status| unwritable(WriteFailure::Rejected(status)))
    }

    pub fn write_u32(&self, object: ObjectId, address: &PropertyAddress, value: u32) -> Result<(), PropertyError> {
        self.write(object, address, &value.to_ne_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::error::{status, OsStatus};
    use crate::hal::types::{Scope, Selector};
    use std::sync::Mutex;

    /// Backend serving one fixed value for every address
    struct FixedBackend {
        value: Vec<u8>,
        reported_size: u32,
        read_status: Option<OsStatus>,
        reads: Mutex<usize>,
        written: Mutex<Vec<Vec<u8>>>,
    }

    impl FixedBackend {
        fn new(value: Vec<u8>) -> Self {
            Self {
                reported_size: value.len() as u32,
                value,
                read_status: None,
                reads: Mutex::new(0),
                written: Mutex::new(Vec::new()),
            }
        }
    }

    impl PropertyBackend for FixedBackend {
        fn backend_id(&self) -> &str {
            "fixed"
        }

        fn property_size(&self, _object: ObjectId, _address: &PropertyAddress) -> Result<u32, OsStatus> {
            Ok(self.reported_size)
        }

        fn read_property(&self, _object: ObjectId, _address: &PropertyAddress, buf: &mut [u8]) -> Result<usize, OsStatus> {
            *self.reads.lock().unwrap() += 1;
            if buf.is_empty() {
                return Err(status::BAD_PROPERTY_SIZE);
            }
            if let Some(status) = self.read_status {
                return Err(status);
            }
            let n = buf.len().min(self.value.len());
            buf[..n].copy_from_slice(&self.value[..n]);
            Ok(n)
        }

        fn write_property(&self, _object: ObjectId, _address: &PropertyAddress, data: &[u8]) -> Result<(), OsStatus> {
            self.written.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        fn decode_string(&self, raw: &[u8]) -> Option<String> {
            String::from_utf8(raw.to_vec()).ok()
        }
    }

    const DEVICES: PropertyAddress = PropertyAddress::global(Selector::Devices);

    #[test]
    fn test_read_object_ids_uses_discovered_size() {
        let ids: Vec<u8> = [10u32, 20, 30].iter().flat_map(|id| id.to_ne_bytes()).collect();
        let store = PropertyStore::new(FixedBackend::new(ids));

        assert_eq!(store.query_size(1, &DEVICES).unwrap(), 12);
        assert_eq!(store.read_object_ids(1, &DEVICES).unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn test_empty_value_skips_backend_read() {
        let store = PropertyStore::new(FixedBackend::new(Vec::new()));

        assert_eq!(store.read_object_ids(1, &DEVICES).unwrap(), Vec::<ObjectId>::new());
        assert_eq!(store.read_channel_counts(5, &DEVICES).unwrap(), Vec::<u32>::new());
        assert_eq!(*store.backend().reads.lock().unwrap(), 0);
    }

    #[test]
    fn test_read_failure_is_unreadable() {
        let mut backend = FixedBackend::new(vec![0; 4]);
        backend.read_status = Some(status::ILLEGAL_OPERATION);
        let store = PropertyStore::new(backend);

        let err = store.read_u32(1, &DEVICES).unwrap_err();
        assert!(matches!(err, PropertyError::Unreadable { status: code, .. } if code == status::ILLEGAL_OPERATION));
    }

    #[test]
    fn test_short_value_is_malformed() {
        let store = PropertyStore::new(FixedBackend::new(vec![1, 2]));
        let err = store.read_u32(1, &DEVICES).unwrap_err();
        assert!(matches!(err, PropertyError::Malformed { .. }));
    }

    #[test]
    fn test_read_keeps_only_written_bytes() {
        let mut backend = FixedBackend::new(vec![1, 0, 0, 0]);
        backend.reported_size = 8;
        let store = PropertyStore::new(backend);

        assert_eq!(store.read_object_ids(1, &DEVICES).unwrap(), vec![1]);
    }

    #[test]
    fn test_read_channel_counts() {
        let raw = buffer_list::encode_channel_counts(&[1, 1]);
        let store = PropertyStore::new(FixedBackend::new(raw));
        let address = PropertyAddress::scoped(Selector::StreamConfiguration, Scope::Input);

        assert_eq!(store.read_channel_counts(5, &address).unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_read_string() {
        let store = PropertyStore::new(FixedBackend::new(b"Built-in Output".to_vec()));
        let address = PropertyAddress::global(Selector::DeviceName);
        assert_eq!(store.read_string(5, &address).unwrap(), "Built-in Output");
    }

    #[test]
    fn test_write_requires_current_size() {
        let store = PropertyStore::new(FixedBackend::new(vec![0; 8]));
        let address = PropertyAddress::global(Selector::DefaultOutputDevice);

        let err = store.write_u32(1, &address, 7).unwrap_err();
        assert!(matches!(
            err,
            PropertyError::Unwritable {
                failure: WriteFailure::SizeMismatch { expected: 8, actual: 4 },
                ..
            }
        ));
        assert!(store.backend().written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_write_submits_bytes() {
        let store = PropertyStore::new(FixedBackend::new(vec![0; 4]));
        let address = PropertyAddress::global(Selector::DefaultOutputDevice);

        store.write_u32(1, &address, 7).unwrap();
        assert_eq!(*store.backend().written.lock().unwrap(), vec![7u32.to_ne_bytes().to_vec()]);
    }
}
