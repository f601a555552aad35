//! Static beacon reference data.
//!
//! The registry is loaded once at startup from the authoritative CSV table
//! and never mutated afterwards. Lookups normalize the client-supplied MAC
//! and, when that misses, retry with the six octet groups byte-reversed:
//! some mobile BLE stacks report beacon addresses in the opposite octet
//! order, so `08:92:72:87:8D:D6` and `D6:8D:87:72:92:08` name the same
//! beacon.

use std::{collections::HashMap, io::Read, path::Path, str::FromStr};

use anyhow::{Context, Result, bail};
use mac_address::MacAddress;
use serde::Deserialize;

use crate::geometry::Point;

pub const UNKNOWN_ROOM: &str = "unknown";

/// A stationary Bluetooth transmitter at a known floor-plan coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Beacon {
    pub mac: String,
    pub x: f64,
    pub y: f64,
}

impl Beacon {
    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One row of the reference table: `mac,x,y,room`.
#[derive(Debug, Deserialize)]
struct BeaconRecord {
    mac: String,
    x: f64,
    y: f64,
    room: String,
}

#[derive(Debug, Default)]
pub struct MapRegistry {
    beacons: HashMap<String, Beacon>,
    rooms: HashMap<String, String>,
}

pub fn normalize_mac(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// The same address with its six octet groups in reverse order, or `None`
/// when the input is not a parseable MAC.
pub fn reversed_mac(mac: &str) -> Option<String> {
    let parsed = MacAddress::from_str(mac).ok()?;
    let mut octets = parsed.bytes();
    octets.reverse();
    Some(MacAddress::new(octets).to_string().to_ascii_uppercase())
}

impl MapRegistry {
    /// Build the registry from reference tuples, failing fast when two rows
    /// collide on the same normalized address. The source material carries
    /// divergent snapshots of the beacon survey; a collision means the
    /// wrong table was deployed and must never be merged silently.
    pub fn from_records(records: Vec<(String, f64, f64, String)>) -> Result<Self> {
        let mut beacons = HashMap::with_capacity(records.len());
        let mut rooms = HashMap::with_capacity(records.len());

        for (mac, x, y, room) in records {
            MacAddress::from_str(mac.trim())
                .with_context(|| format!("invalid beacon mac '{mac}'"))?;

            let key = normalize_mac(&mac);
            if beacons.contains_key(&key) {
                bail!("duplicate beacon '{key}' in reference table");
            }

            beacons.insert(
                key.clone(),
                Beacon {
                    mac: key.clone(),
                    x,
                    y,
                },
            );
            rooms.insert(key, room);
        }

        Ok(MapRegistry { beacons, rooms })
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to read beacon table {}", path.display()))?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        for row in csv_reader.deserialize() {
            let record: BeaconRecord = row.context("Failed to parse beacon table row")?;
            records.push((record.mac, record.x, record.y, record.room));
        }
        Self::from_records(records)
    }

    /// Look the address up as sent, then with reversed octet order.
    pub fn resolve(&self, raw: &str) -> Option<&Beacon> {
        let key = normalize_mac(raw);
        if let Some(beacon) = self.beacons.get(&key) {
            return Some(beacon);
        }
        reversed_mac(&key).and_then(|reversed| self.beacons.get(&reversed))
    }

    /// Room label mapped to the beacon, or `"unknown"`.
    pub fn room_for(&self, raw: &str) -> String {
        let key = normalize_mac(raw);
        if let Some(room) = self.rooms.get(&key) {
            return room.clone();
        }
        reversed_mac(&key)
            .and_then(|reversed| self.rooms.get(&reversed).cloned())
            .unwrap_or_else(|| UNKNOWN_ROOM.to_string())
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }
}
