//! The pure add/remove diff engine shared by every watcher and by `LIST`.

use crate::port::{PortDescriptor, PortJson};

/// The kind of a change event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
    Add,
    Remove,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Add => "add",
            EventKind::Remove => "remove",
        }
    }
}

/// Compare two enumeration snapshots and invoke `event_cb` once per change.
///
/// Removes are emitted before adds so that a consumer indexing ports by
/// address retires the old identity before a new one with the same address
/// arrives: a replugged device with a changed serial number is a remove
/// followed by an add, never the reverse.
///
/// This function is pure and cannot fail.
pub fn diff(old: &[PortDescriptor], new: &[PortDescriptor], mut event_cb: impl FnMut(EventKind, PortJson)) {
    for old_port in old {
        if !new.iter().any(|p| p.is_same_port(old_port)) {
            event_cb(EventKind::Remove, PortJson::minimal(old_port.address.clone()));
        }
    }
    for new_port in new {
        if !old.iter().any(|p| p.is_same_port(new_port)) {
            event_cb(EventKind::Add, PortJson::full(new_port));
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

    #[test]
    fn idempotence_of_diff() {
        let snapshot = vec![usb("/dev/ttyACM0", "2341", "0043", "ABC")];
        let mut events = Vec::new();
        diff(&snapshot, &snapshot, |kind, port| events.push((kind, port.address)));
        assert!(events.is_empty());
    }

    #[test]
    fn scenario_a_empty_to_one_usb_port() {
        let old: Vec<PortDescriptor> = vec![];
        let new = vec![usb("/dev/ttyACM0", "2341", "0043", "ABC")];
        let mut events = Vec::new();
        diff(&old, &new, |kind, port| events.push((kind, port)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, EventKind::Add);
        assert_eq!(events[0].1.address, "/dev/ttyACM0");
        assert_eq!(events[0].1.hardware_id.as_deref(), Some("ABC"));
    }

    #[test]
    fn scenario_b_replug_with_different_serial() {
        let old = vec![usb("COM3", "2341", "0043", "X")];
        let new = vec![usb("COM3", "2341", "0043", "Y")];
        let mut events = Vec::new();
        diff(&old, &new, |kind, port| events.push((kind, port)));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, EventKind::Remove);
        assert_eq!(events[0].1.address, "COM3");
        assert!(events[0].1.properties.is_none());
        assert_eq!(events[1].0, EventKind::Add);
        assert_eq!(events[1].1.properties.unwrap()["serialNumber"], "Y");
    }

    #[test]
    fn remove_before_add_for_same_address_different_identity() {
        let old = vec![usb("/dev/ttyACM0", "2341", "0043", "X")];
        let new = vec![usb("/dev/ttyACM0", "2341", "0044", "X")];
        let mut order = Vec::new();
        diff(&old, &new, |kind, _port| order.push(kind));
        assert_eq!(order, vec![EventKind::Remove, EventKind::Add]);
    }

    #[test]
    fn round_trip_applies_events_to_reach_new_snapshot() {
        let old = vec![
            usb("/dev/ttyACM0", "2341", "0043", "A"),
            usb("/dev/ttyACM1", "2341", "0044", "B"),
        ];
        let new = vec![
            usb("/dev/ttyACM1", "2341", "0044", "B"),
            usb("/dev/ttyACM2", "2341", "0045", "C"),
        ];
        let mut working = old.clone();
        diff(&old, &new, |kind, port| match kind {
            EventKind::Remove => working.retain(|p| p.address != port.address),
            EventKind::Add => {
                let vid = port.properties.as_ref().unwrap()["vid"].as_str().unwrap()[2..].to_string();
                let pid = port.properties.as_ref().unwrap()["pid"].as_str().unwrap()[2..].to_string();
                let serial = port.properties.as_ref().unwrap()["serialNumber"]
                    .as_str()
                    .unwrap()
                    .to_string();
                working.push(usb(&port.address, &vid, &pid, &serial));
            }
        });
        // Compare as sets: the diff engine does not guarantee event order across addresses.
        assert_eq!(working.len(), new.len());
        for port in &new {
            assert!(working.iter().any(|p| p.is_same_port(port)));
        }
    }
}
