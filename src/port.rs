//! Port descriptors and the JSON shape used for protocol event payloads.

use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};

/// A serial port as seen by one enumeration.
///
/// `vid`, `pid` and `serial_number` are only meaningful when `is_usb` is
/// `true`; for non-USB ports they are always `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub address: String,
    pub is_usb: bool,
    pub vid: Option<String>,
    pub pid: Option<String>,
    pub serial_number: Option<String>,
}

impl PortDescriptor {
    /// Build a descriptor from whatever the platform enumeration primitive
    /// returned.
    pub fn from_info(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => PortDescriptor {
                address: info.port_name,
                is_usb: true,
                vid: Some(format!("{:04x}", usb.vid)),
                pid: Some(format!("{:04x}", usb.pid)),
                serial_number: Some(usb.serial_number.unwrap_or_default()),
            },
            _ => PortDescriptor {
                address: info.port_name,
                is_usb: false,
                vid: None,
                pid: None,
                serial_number: None,
            },
        }
    }

    /// The identity rule used by the diff engine: two descriptors denote the
    /// same port iff the address and USB-ness match, and, for USB ports, the
    /// vid/pid/serial triple matches too.
    pub fn is_same_port(&self, other: &PortDescriptor) -> bool {
        if self.address != other.address || self.is_usb != other.is_usb {
            return false;
        }
        if !self.is_usb {
            return true;
        }
        self.vid == other.vid && self.pid == other.pid && self.serial_number == other.serial_number
    }

    fn protocol_label(&self) -> String {
        if self.is_usb {
            "Serial Port (USB)".to_string()
        } else {
            "Serial Port".to_string()
        }
    }

    fn hardware_id(&self) -> String {
        if self.is_usb {
            self.serial_number.clone().unwrap_or_default()
        } else {
            String::new()
        }
    }

    fn properties(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        if !self.is_usb {
            return None;
        }
        let mut props = serde_json::Map::new();
        props.insert(
            "vid".to_string(),
            format!("0x{}", self.vid.as_deref().unwrap_or_default()).into(),
        );
        props.insert(
            "pid".to_string(),
            format!("0x{}", self.pid.as_deref().unwrap_or_default()).into(),
        );
        props.insert(
            "serialNumber".to_string(),
            self.serial_number.clone().unwrap_or_default().into(),
        );
        Some(props)
    }
}

/// The wire shape of a port, as it appears nested under `"port"` in an event
/// payload or in a `LIST` reply.
///
/// Remove events carry only `address` and `protocol` ([`PortJson::minimal`]);
/// every other event and the `LIST` reply carries the full shape
/// ([`PortJson::full`]).
#[derive(Debug, Clone, Serialize)]
pub struct PortJson {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub protocol: &'static str,
    #[serde(rename = "protocolLabel", skip_serializing_if = "Option::is_none")]
    pub protocol_label: Option<String>,
    #[serde(rename = "hardwareId", skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

impl PortJson {
    pub fn full(port: &PortDescriptor) -> Self {
        PortJson {
            address: port.address.clone(),
            label: Some(port.address.clone()),
            protocol: "serial",
            protocol_label: Some(port.protocol_label()),
            hardware_id: Some(port.hardware_id()),
            properties: port.properties(),
        }
    }

    pub fn minimal(address: impl Into<String>) -> Self {
        PortJson {
            address: address.into(),
            label: None,
            protocol: "serial",
            protocol_label: None,
            hardware_id: None,
            properties: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb(address: &str, vid: &str, pid: &str, serial: &str) -> PortDescriptor {
        PortDescriptor {
            address: address.to_string(),
            is_usb: true,
            vid: Some(vid.to_string()),
            pid: Some(pid.to_string()),
            serial_number: Some(serial.to_string()),
        }
    }

    fn non_usb(address: &str) -> PortDescriptor {
        PortDescriptor {
            address: address.to_string(),
            is_usb: false,
            vid: None,
            pid: None,
            serial_number: None,
        }
    }

    #[test]
    fn same_address_and_usbness_but_different_identity_are_not_equal() {
        let a = usb("COM3", "2341", "0043", "X");
        let b = usb("COM3", "2341", "0043", "Y");
        assert!(!a.is_same_port(&b));
    }

    #[test]
    fn non_usb_ports_only_compare_by_address() {
        let a = non_usb("/dev/ttyS0");
        let b = non_usb("/dev/ttyS0");
        assert!(a.is_same_port(&b));
    }

    #[test]
    fn usb_and_non_usb_with_same_address_are_not_equal() {
        let a = usb("/dev/ttyACM0", "2341", "0043", "ABC");
        let b = non_usb("/dev/ttyACM0");
        assert!(!a.is_same_port(&b));
    }

    #[test]
    fn full_descriptor_matches_scenario_a() {
        let port = usb("/dev/ttyACM0", "2341", "0043", "ABC");
        let json = PortJson::full(&port);
        assert_eq!(json.hardware_id.as_deref(), Some("ABC"));
        let props = json.properties.expect("usb port has properties");
        let keys: Vec<_> = props.keys().cloned().collect();
        assert_eq!(keys, vec!["vid", "pid", "serialNumber"]);
        assert_eq!(props["vid"], "0x2341");
        assert_eq!(props["pid"], "0x0043");
        assert_eq!(props["serialNumber"], "ABC");
    }

    #[test]
    fn minimal_descriptor_has_no_properties() {
        let json = PortJson::minimal("COM3");
        assert!(json.properties.is_none());
        assert!(json.label.is_none());
        assert_eq!(json.protocol, "serial");
    }
}
