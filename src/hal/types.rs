use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Handle of any object in the hardware property tree
pub type ObjectId = u32;

/// Handle of an audio device, valid for the current boot session
pub type DeviceId = u32;

/// The object that owns the global properties (device list, default selectors)
pub const SYSTEM_OBJECT: ObjectId = 1;

/// Selector value meaning "no device"
pub const UNKNOWN_OBJECT: ObjectId = 0;

/// Main element of every property this crate touches
pub const ELEMENT_MAIN: u32 = 0;

/// Which hardware property is being addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Devices,
    DeviceName,
    DeviceUid,
    StreamConfiguration,
    DefaultInputDevice,
    DefaultOutputDevice,
    DefaultSystemOutputDevice,
}

/// Qualifies a selector as input, output or global
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Input,
    Output,
}

/// `(selector, scope, element)` triple identifying a property on an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyAddress {
    pub selector: Selector,
    pub scope: Scope,
    pub element: u32,
}

impl PropertyAddress {
    pub const fn global(selector: Selector) -> Self {
        Self::scoped(selector, Scope::Global)
    }

    pub const fn scoped(selector: Selector, scope: Scope) -> Self {
        Self {
            selector,
            scope,
            element: ELEMENT_MAIN,
        }
    }
}

impl fmt::Display for PropertyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}/{}", self.selector, self.scope, self.element)
    }
}

/// One of the three OS-owned default device slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultKind {
    Input,
    Output,
    System,
}

impl DefaultKind {
    pub const ALL: [DefaultKind; 3] = [DefaultKind::Input, DefaultKind::Output, DefaultKind::System];

    /// Global selector holding this slot
    pub fn selector(self) -> Selector {
        match self {
            DefaultKind::Input => Selector::DefaultInputDevice,
            DefaultKind::Output => Selector::DefaultOutputDevice,
            DefaultKind::System => Selector::DefaultSystemOutputDevice,
        }
    }

    /// Capability a device needs before it may occupy this slot
    pub fn required_capability(self) -> DeviceFlag {
        match self {
            DefaultKind::Input => DeviceFlag::Input,
            DefaultKind::Output | DefaultKind::System => DeviceFlag::Output,
        }
    }

    /// Flag carried by the device currently occupying this slot
    pub fn flag(self) -> DeviceFlag {
        match self {
            DefaultKind::Input => DeviceFlag::DefaultInput,
            DefaultKind::Output => DeviceFlag::DefaultOutput,
            DefaultKind::System => DeviceFlag::System,
        }
    }
}

impl fmt::Display for DefaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DefaultKind::Input => "default input",
            DefaultKind::Output => "default output",
            DefaultKind::System => "system output",
        };
        f.write_str(label)
    }
}

/// Independent capability tag derived for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFlag {
    Input,
    Output,
    DefaultInput,
    DefaultOutput,
    System,
}

/// Set of capability tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFlags(BTreeSet<DeviceFlag>);

impl DeviceFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, flag: DeviceFlag) -> bool {
        self.0.insert(flag)
    }

    pub fn contains(&self, flag: DeviceFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = DeviceFlag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<DeviceFlag> for DeviceFlags {
    fn from_iter<I: IntoIterator<Item = DeviceFlag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<DeviceFlag> for DeviceFlags {
    fn extend<I: IntoIterator<Item = DeviceFlag>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

/// Point-in-time view of one hardware audio endpoint
///
/// Flags are derived from global state when the device is enumerated and go
/// stale as soon as another process changes a default selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: Option<String>,
    pub uid: Option<String>,
    pub flags: DeviceFlags,
}

impl Device {
    pub fn has(&self, flag: DeviceFlag) -> bool {
        self.flags.contains(flag)
    }

    /// Whether the device is the default input or default output device
    pub fn is_default(&self) -> bool {
        self.has(DeviceFlag::DefaultInput) || self.has(DeviceFlag::DefaultOutput)
    }
}

/// Values of the three default selectors sampled at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultSelectors {
    pub input: Option<DeviceId>,
    pub output: Option<DeviceId>,
    pub system: Option<DeviceId>,
}

impl DefaultSelectors {
    pub fn get(&self, kind: DefaultKind) -> Option<DeviceId> {
        match kind {
            DefaultKind::Input => self.input,
            DefaultKind::Output => self.output,
            DefaultKind::System => self.system,
        }
    }

    pub fn set(&mut self, kind: DefaultKind, id: Option<DeviceId>) {
        match kind {
            DefaultKind::Input => self.input = id,
            DefaultKind::Output => self.output = id,
            DefaultKind::System => self.system = id,
        }
    }

    /// Default flags `id` holds according to this snapshot
    pub fn flags_for(&self, id: DeviceId) -> impl Iterator<Item = DeviceFlag> + '_ {
        DefaultKind::ALL
            .into_iter()
            .filter(move |kind| self.get(*kind) == Some(id))
            .map(DefaultKind::flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_independent() {
        let mut flags = DeviceFlags::new();
        flags.insert(DeviceFlag::Output);
        flags.insert(DeviceFlag::System);

        assert!(flags.contains(DeviceFlag::Output));
        assert!(flags.contains(DeviceFlag::System));
        assert!(!flags.contains(DeviceFlag::DefaultOutput));
        assert!(!flags.insert(DeviceFlag::Output));
        assert_eq!(flags.len(), 2);
    }

    #[test]
    fn test_flags_serialize_as_tag_list() {
        let flags: DeviceFlags = [DeviceFlag::DefaultInput, DeviceFlag::Input].into_iter().collect();
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, r#"["input","default_input"]"#);
    }

    #[test]
    fn test_capability_required_per_kind() {
        assert_eq!(DefaultKind::Input.required_capability(), DeviceFlag::Input);
        assert_eq!(DefaultKind::Output.required_capability(), DeviceFlag::Output);
        assert_eq!(DefaultKind::System.required_capability(), DeviceFlag::Output);
    }

    #[test]
    fn test_selector_snapshot_flags() {
        let defaults = DefaultSelectors {
            input: Some(7),
            output: Some(9),
            system: Some(9),
        };

        let flags: Vec<_> = defaults.flags_for(9).collect();
        assert_eq!(flags, vec![DeviceFlag::DefaultOutput, DeviceFlag::System]);
        assert_eq!(defaults.flags_for(3).count(), 0);
    }

    #[test]
    fn test_is_default_ignores_system_slot() {
        let device = Device {
            id: 4,
            name: None,
            uid: None,
            flags: [DeviceFlag::Output, DeviceFlag::System].into_iter().collect(),
        };
        assert!(!device.is_default());
    }
}
