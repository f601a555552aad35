mod registry;

pub use registry::{Beacon, MapRegistry, UNKNOWN_ROOM, normalize_mac, reversed_mac};
