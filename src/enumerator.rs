//! Wraps the platform port-enumeration primitive and applies [`crate::filter`].

use crate::error::DiscoveryError;
use crate::filter::FILTER;
use crate::port::PortDescriptor;

/// Enumerate the serial ports currently visible to the OS, with any
/// `skip.txt`-matched addresses already removed.
pub fn enumerate() -> Result<Vec<PortDescriptor>, DiscoveryError> {
    let ports = serialport::available_ports()
        .map_err(|err| DiscoveryError::Enumeration(err.to_string()))?;
    Ok(ports
        .into_iter()
        .map(PortDescriptor::from_info)
        .filter(|port| FILTER.is_allowed(&port.address))
        .collect())
}
