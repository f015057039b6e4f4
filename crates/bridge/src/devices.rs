//! Audio devices and output routes
//!
//! The engine reports concrete devices; the application only picks between
//! three routes. A route is available when at least one playback-capable
//! device of a matching type is present.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of audio device as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioDeviceType {
    Unknown,
    Microphone,
    Earpiece,
    Speaker,
    Bluetooth,
    #[serde(rename = "BluetoothA2DP")]
    BluetoothA2dp,
    Telephony,
    AuxLine,
    GenericUsb,
    Headset,
    Headphones,
    HearingAid,
}

/// What a device can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioDeviceCapabilities {
    CapabilityRecord,
    CapabilityPlay,
    CapabilityAll,
}

impl AudioDeviceCapabilities {
    pub fn can_play(self) -> bool {
        matches!(self, Self::CapabilityPlay | Self::CapabilityAll)
    }

    pub fn can_record(self) -> bool {
        matches!(self, Self::CapabilityRecord | Self::CapabilityAll)
    }
}

/// Audio device descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDevice {
    /// Engine device identifier
    pub id: String,
    /// Human-readable device name
    pub name: String,
    /// Platform driver backing the device
    pub driver_name: String,
    pub capabilities: AudioDeviceCapabilities,
    #[serde(rename = "type")]
    pub device_type: AudioDeviceType,
}

impl AudioDevice {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        device_type: AudioDeviceType,
        capabilities: AudioDeviceCapabilities,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            driver_name: String::new(),
            capabilities,
            device_type,
        }
    }

    pub fn with_driver(mut self, driver_name: impl Into<String>) -> Self {
        self.driver_name = driver_name.into();
        self
    }

    /// Route this device can serve as an output, if any
    pub fn route(&self) -> Option<AudioRoute> {
        if !self.capabilities.can_play() {
            return None;
        }
        AudioRoute::for_device_type(self.device_type)
    }
}

/// Snapshot returned by `get_audio_devices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceList {
    pub devices: Vec<AudioDevice>,
    /// Id of the current playback device, empty if none
    pub current_output: String,
    /// Id of the current capture device, empty if none
    pub current_input: String,
    pub muted: bool,
}

/// Output routes the application can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioRoute {
    Bluetooth,
    Phone,
    Loudspeaker,
}

impl AudioRoute {
    pub const ALL: [AudioRoute; 3] = [AudioRoute::Bluetooth, AudioRoute::Phone, AudioRoute::Loudspeaker];

    pub fn for_device_type(device_type: AudioDeviceType) -> Option<Self> {
        match device_type {
            AudioDeviceType::Bluetooth | AudioDeviceType::BluetoothA2dp => Some(AudioRoute::Bluetooth),
            AudioDeviceType::Earpiece | AudioDeviceType::Microphone => Some(AudioRoute::Phone),
            AudioDeviceType::Speaker => Some(AudioRoute::Loudspeaker),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioRoute::Bluetooth => "bluetooth",
            AudioRoute::Phone => "phone",
            AudioRoute::Loudspeaker => "loudspeaker",
        }
    }
}

impl fmt::Display for AudioRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Availability of each route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteAvailability {
    pub bluetooth: bool,
    pub phone: bool,
    pub loudspeaker: bool,
}

impl RouteAvailability {
    pub fn contains(&self, route: AudioRoute) -> bool {
        match route {
            AudioRoute::Bluetooth => self.bluetooth,
            AudioRoute::Phone => self.phone,
            AudioRoute::Loudspeaker => self.loudspeaker,
        }
    }

    fn insert(&mut self, route: AudioRoute) {
        match route {
            AudioRoute::Bluetooth => self.bluetooth = true,
            AudioRoute::Phone => self.phone = true,
            AudioRoute::Loudspeaker => self.loudspeaker = true,
        }
    }
}

/// Result of `scan_audio_devices`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRouteOptions {
    pub options: RouteAvailability,
    pub current: AudioRoute,
}

/// Result of switching routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRouteChange {
    pub message: String,
    /// Id of the device now used for playback
    pub id: String,
}

/// Work out which routes are available and which one is in use
///
/// When the current output matches no route, the phone route is reported.
pub fn scan_routes(devices: &[AudioDevice], current_output: &str) -> AudioRouteOptions {
    let mut options = RouteAvailability::default();
    for route in devices.iter().filter_map(AudioDevice::route) {
        options.insert(route);
    }

    let current = devices
        .iter()
        .find(|device| device.id == current_output)
        .and_then(AudioDevice::route)
        .unwrap_or(AudioRoute::Phone);

    AudioRouteOptions { options, current }
}

/// First playback device serving `route`
pub fn find_route_device(devices: &[AudioDevice], route: AudioRoute) -> Option<&AudioDevice> {
    devices.iter().find(|device| device.route() == Some(route))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::AudioDeviceCapabilities::*;

    fn devices() -> Vec<AudioDevice> {
        vec![
            AudioDevice::new("mic", "Built-in Microphone", AudioDeviceType::Microphone, CapabilityRecord),
            AudioDevice::new("ear", "iPhone", AudioDeviceType::Earpiece, CapabilityPlay),
            AudioDevice::new("spk", "Speaker", AudioDeviceType::Speaker, CapabilityPlay),
            AudioDevice::new("bt", "AirPods", AudioDeviceType::BluetoothA2dp, CapabilityAll).with_driver("AVAudioSession"),
        ]
    }

    #[test]
    fn test_record_only_devices_have_no_route() {
        assert_eq!(devices()[0].route(), None);
        assert_eq!(devices()[1].route(), Some(AudioRoute::Phone));
        assert_eq!(devices()[3].route(), Some(AudioRoute::Bluetooth));
    }

    #[test]
    fn test_scan_routes() {
        let scan = scan_routes(&devices(), "spk");
        assert_eq!(
            scan.options,
            RouteAvailability {
                bluetooth: true,
                phone: true,
                loudspeaker: true,
            }
        );
        assert_eq!(scan.current, AudioRoute::Loudspeaker);

        let without_bt: Vec<_> = devices().into_iter().filter(|d| d.id != "bt").collect();
        let scan = scan_routes(&without_bt, "missing");
        assert!(!scan.options.contains(AudioRoute::Bluetooth));
        assert_eq!(scan.current, AudioRoute::Phone);
    }

    #[test]
    fn test_find_route_device_skips_capture_only() {
        let only_mic = vec![devices().remove(0)];
        assert!(find_route_device(&only_mic, AudioRoute::Phone).is_none());
        assert_eq!(find_route_device(&devices(), AudioRoute::Phone).map(|d| d.id.as_str()), Some("ear"));
    }

    #[test]
    fn test_device_json_shape() {
        let json = serde_json::to_value(&devices()[3]).unwrap();
        assert_eq!(json["driverName"], "AVAudioSession");
        assert_eq!(json["type"], "BluetoothA2DP");
        assert_eq!(json["capabilities"], "CapabilityAll");

        let routes = serde_json::to_value(scan_routes(&devices(), "bt")).unwrap();
        assert_eq!(routes["current"], "bluetooth");
        assert_eq!(routes["options"]["loudspeaker"], true);
    }
}
