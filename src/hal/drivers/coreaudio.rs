use crate::hal::error::{self, OsStatus};
use crate::hal::traits::PropertyBackend;
use crate::hal::types::{ObjectId, PropertyAddress, Scope, Selector};
use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use coreaudio_sys::{
    kAudioDevicePropertyDeviceNameCFString, kAudioDevicePropertyDeviceUID,
    kAudioDevicePropertyScopeInput, kAudioDevicePropertyScopeOutput,
    kAudioDevicePropertyStreamConfiguration, kAudioHardwarePropertyDefaultInputDevice,
    kAudioHardwarePropertyDefaultOutputDevice, kAudioHardwarePropertyDefaultSystemOutputDevice,
    kAudioHardwarePropertyDevices, kAudioObjectPropertyScopeGlobal, AudioObjectGetPropertyData,
    AudioObjectGetPropertyDataSize, AudioObjectPropertyAddress, AudioObjectSetPropertyData,
};
use std::mem::size_of;
use std::ptr;

/// Property backend talking to the CoreAudio HAL
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudioHardware;

impl CoreAudioHardware {
    pub fn new() -> Self {
        Self
    }
}

fn native_address(address: &PropertyAddress) -> AudioObjectPropertyAddress {
    let selector = match address.selector {
        Selector::Devices => kAudioHardwarePropertyDevices,
        Selector::DeviceName => kAudioDevicePropertyDeviceNameCFString,
        Selector::DeviceUid => kAudioDevicePropertyDeviceUID,
        Selector::StreamConfiguration => kAudioDevicePropertyStreamConfiguration,
        Selector::DefaultInputDevice => kAudioHardwarePropertyDefaultInputDevice,
        Selector::DefaultOutputDevice => kAudioHardwarePropertyDefaultOutputDevice,
        Selector::DefaultSystemOutputDevice => kAudioHardwarePropertyDefaultSystemOutputDevice,
    };
    let scope = match address.scope {
        Scope::Global => kAudioObjectPropertyScopeGlobal,
        Scope::Input => kAudioDevicePropertyScopeInput,
        Scope::Output => kAudioDevicePropertyScopeOutput,
    };

    AudioObjectPropertyAddress {
        mSelector: selector,
        mScope: scope,
        mElement: address.element,
    }
}

/// Whether a read of `written` bytes holds a whole value for `selector`
///
/// String properties carry one CFStringRef. A shorter value cannot be turned
/// back into a handle, so it is reported as unreadable instead of decoded.
fn complete_read(selector: Selector, written: usize) -> bool {
    match selector {
        Selector::DeviceName | Selector::DeviceUid => written >= size_of::<CFStringRef>(),
        _ => true,
    }
}

fn check(status: OsStatus) -> Result<(), OsStatus> {
    if status == 0 {
        Ok(())
    } else {
        Err(status)
    }
}

impl PropertyBackend for CoreAudioHardware {
    fn backend_id(&self) -> &str {
        "coreaudio"
    }

    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus> {
        let native = native_address(address);
        let mut size: u32 = 0;
        // SAFETY: `native` and `size` outlive the call; no qualifier is passed.
        let status = unsafe {
            AudioObjectGetPropertyDataSize(object, &native, 0, ptr::null(), &mut size)
        };
        check(status).map(|_| size)
    }

    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus> {
        let native = native_address(address);
        let mut size = buf.len() as u32;
        // SAFETY: the HAL writes at most `size` bytes into `buf`.
        let status = unsafe {
            AudioObjectGetPropertyData(
                object,
                &native,
                0,
                ptr::null(),
                &mut size,
                buf.as_mut_ptr().cast(),
            )
        };
        check(status)?;

        let written = size as usize;
        if !complete_read(address.selector, written) {
            log::debug!("object {}: short {} read of {} bytes", object, address, written);
            return Err(error::status::BAD_PROPERTY_SIZE);
        }
        Ok(written)
    }

    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus> {
        let native = native_address(address);
        // SAFETY: the HAL only reads `data.len()` bytes from `data`.
        let status = unsafe {
            AudioObjectSetPropertyData(
                object,
                &native,
                0,
                ptr::null(),
                data.len() as u32,
                data.as_ptr().cast(),
            )
        };
        check(status)
    }

    fn decode_string(&self, raw: &[u8]) -> Option<String> {
        if raw.len() < size_of::<CFStringRef>() {
            return None;
        }
        // SAFETY: string properties hold one CFStringRef that the caller owns
        // (create rule). It is read at most once per buffer, so wrapping it
        // releases it exactly once.
        let handle = unsafe { ptr::read_unaligned(raw.as_ptr() as *const CFStringRef) };
        if handle.is_null() {
            return None;
        }
        let string = unsafe { CFString::wrap_under_create_rule(handle) };
        Some(string.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::types::SYSTEM_OBJECT;

    #[test]
    fn test_native_address_maps_scope() {
        let address = PropertyAddress::scoped(Selector::StreamConfiguration, Scope::Output);
        let native = native_address(&address);
        assert_eq!(native.mSelector, kAudioDevicePropertyStreamConfiguration);
        assert_eq!(native.mScope, kAudioDevicePropertyScopeOutput);
        assert_eq!(native.mElement, 0);
    }

    #[test]
    fn test_short_string_read_is_incomplete() {
        let handle = size_of::<CFStringRef>();
        assert!(complete_read(Selector::DeviceName, handle));
        assert!(!complete_read(Selector::DeviceName, handle - 1));
        assert!(!complete_read(Selector::DeviceUid, 0));
        // Non-string values are decoded from whatever was written
        assert!(complete_read(Selector::StreamConfiguration, 4));
    }

    #[test]
    fn test_device_list_size_is_whole_ids() {
        let hardware = CoreAudioHardware::new();
        let address = PropertyAddress::global(Selector::Devices);
        if let Ok(size) = hardware.property_size(SYSTEM_OBJECT, &address) {
            assert_eq!(size as usize % size_of::<ObjectId>(), 0);
        }
    }
}
