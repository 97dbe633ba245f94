pub mod buffer_list;
pub mod drivers;
pub mod error;
pub mod mock;
pub mod property;
pub mod registry;
pub mod selectors;
pub mod traits;
pub mod types;

pub use error::{DeviceError, OsStatus, PropertyError, WriteFailure};
pub use property::PropertyStore;
pub use registry::{find_device, DeviceQuery, DeviceRegistry};
pub use traits::PropertyBackend;
pub use types::{
    DefaultKind, DefaultSelectors, Device, DeviceFlag, DeviceFlags, DeviceId, ObjectId,
    PropertyAddress, Scope, Selector, SYSTEM_OBJECT, UNKNOWN_OBJECT,
};
