//! PCI bus/device/function address.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// Hierarchical `domain:bus:device.function` address.
///
/// This is the join key between vertices discovered by independent sources:
/// the host enumerator creates a PCI device at an address, and the GPU
/// enumerator later finds it again by that same address.
///
/// The total order is lexicographic over (domain, bus, device, function) but
/// **inverted**: an address with a numerically greater field sorts *before*
/// one with a smaller field. Canonical-direction tests (e.g. which side of a
/// bidirectionally visible NVLink creates the edge) depend on this.
///
/// Serialized as its display string, e.g. `"0000:04:00.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PciAddress {
    pub domain: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciAddress {
    pub const fn new(domain: u16, bus: u8, device: u8, function: u8) -> Self {
        Self { domain, bus, device, function }
    }

    /// The same address with the function number cleared.
    pub const fn with_function_zero(self) -> Self {
        Self { function: 0, ..self }
    }

    /// True if `other` lives on the same domain and bus.
    pub fn same_bus(&self, other: &PciAddress) -> bool {
        self.domain == other.domain && self.bus == other.bus
    }
}

impl Ord for PciAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.domain, other.bus, other.device, other.function)
            .cmp(&(self.domain, self.bus, self.device, self.function))
    }
}

impl PartialOrd for PciAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl FromStr for PciAddress {
    type Err = Error;

    /// Parse `dddd:bb:dd.f` (hex). The domain may be omitted (`bb:dd.f`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidAddress(s.to_string());

        let (head, function) = s.rsplit_once('.').ok_or_else(invalid)?;
        let parts: Vec<&str> = head.split(':').collect();
        let (domain, bus, device) = match parts.as_slice() {
            [domain, bus, device] => (*domain, *bus, *device),
            [bus, device] => ("0", *bus, *device),
            _ => return Err(invalid()),
        };

        Ok(Self {
            domain: u16::from_str_radix(domain, 16).map_err(|_| invalid())?,
            bus: u8::from_str_radix(bus, 16).map_err(|_| invalid())?,
            device: u8::from_str_radix(device, 16).map_err(|_| invalid())?,
            function: u8::from_str_radix(function, 16).map_err(|_| invalid())?,
        })
    }
}

impl Serialize for PciAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PciAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
