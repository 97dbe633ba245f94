use super::types::{DefaultKind, DeviceId, ObjectId, PropertyAddress};
use std::fmt;
use thiserror::Error;

/// Status code returned by the hardware layer (an `OSStatus` on macOS)
pub type OsStatus = i32;

/// Status codes shared by every backend, using the CoreAudio four-char values
pub mod status {
    use super::OsStatus;

    /// 'who?'
    pub const UNKNOWN_PROPERTY: OsStatus = 0x7768_6F3F;
    /// '!obj'
    pub const BAD_OBJECT: OsStatus = 0x216F_626A;
    /// '!siz'
    pub const BAD_PROPERTY_SIZE: OsStatus = 0x2173_697A;
    /// 'nope'
    pub const ILLEGAL_OPERATION: OsStatus = 0x6E6F_7065;
    /// '!dev'
    pub const BAD_DEVICE: OsStatus = 0x2164_6576;
}

/// Why a property write did not take effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    /// The hardware refused the new value
    Rejected(OsStatus),
    /// The property's current size differs from the supplied value
    SizeMismatch { expected: usize, actual: usize },
    /// The size query before the write failed
    SizeUnknown(OsStatus),
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteFailure::Rejected(status) => write!(f, "rejected with status {}", status),
            WriteFailure::SizeMismatch { expected, actual } => {
                write!(f, "expected {} bytes, got {}", expected, actual)
            }
            WriteFailure::SizeUnknown(status) => {
                write!(f, "size query failed with status {}", status)
            }
        }
    }
}

/// Failure of a single property operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("property {address} not found on object {object} (status {status})")]
    NotFound {
        object: ObjectId,
        address: PropertyAddress,
        status: OsStatus,
    },

    #[error("property {address} on object {object} could not be read (status {status})")]
    Unreadable {
        object: ObjectId,
        address: PropertyAddress,
        status: OsStatus,
    },

    #[error("property {address} on object {object} could not be written: {failure}")]
    Unwritable {
        object: ObjectId,
        address: PropertyAddress,
        failure: WriteFailure,
    },

    #[error("property {address} on object {object} is malformed: {detail}")]
    Malformed {
        object: ObjectId,
        address: PropertyAddress,
        detail: String,
    },
}

/// Failure of a device registry operation
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no audio device with id {0}")]
    UnknownDevice(DeviceId),

    #[error("device {id} has no {} channels", channel_direction(.kind))]
    IncapableDevice { id: DeviceId, kind: DefaultKind },

    #[error("device {id} can't be selected as {kind} device")]
    WriteRejected {
        id: DeviceId,
        kind: DefaultKind,
        #[source]
        source: PropertyError,
    },

    #[error("device {id} is now the default output device but can't be selected as system output device")]
    SystemWriteRejectedAfterOutputSet {
        id: DeviceId,
        #[source]
        source: PropertyError,
    },

    #[error("failed to enumerate audio devices")]
    Enumeration(#[source] PropertyError),
}

fn channel_direction(kind: &DefaultKind) -> &'static str {
    match kind {
        DefaultKind::Input => "input",
        DefaultKind::Output | DefaultKind::System => "output",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::types::Selector;

    #[test]
    fn test_incapable_device_message() {
        let err = DeviceError::IncapableDevice {
            id: 42,
            kind: DefaultKind::System,
        };
        assert_eq!(err.to_string(), "device 42 has no output channels");
    }

    #[test]
    fn test_write_rejected_keeps_source() {
        let err = DeviceError::WriteRejected {
            id: 3,
            kind: DefaultKind::Input,
            source: PropertyError::Unwritable {
                object: 1,
                address: PropertyAddress::global(Selector::DefaultInputDevice),
                failure: WriteFailure::Rejected(status::ILLEGAL_OPERATION),
            },
        };

        assert_eq!(err.to_string(), "device 3 can't be selected as default input device");
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("DefaultInputDevice/Global/0"));
    }
}
