//! Static waypoint graph of the instrumented ground floor.
//!
//! Corridor waypoints form the spine; every room and landmark hangs off its
//! nearest waypoint as a leaf. Edge weights are Euclidean pixel distances.
//! The graph is built once at startup and shared read-only.

use std::collections::HashMap;

use crate::geometry::Point;

/// A corridor intersection, door or landmark.
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub id: &'static str,
    pub x: f64,
    pub y: f64,
    pub display_name: &'static str,
}

impl Waypoint {
    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// Corridor spine, rooms and landmarks: (id, x, y, display name).
const NODES: &[(&str, f64, f64, &str)] = &[
    // Main corridor, west to east.
    ("w1", 245.0, 225.0, "Corridor W1"),
    ("w2", 390.0, 225.0, "Corridor W2"),
    ("w3", 535.0, 225.0, "Corridor W3"),
    ("w4", 680.0, 225.0, "Corridor W4"),
    ("w5", 825.0, 225.0, "Corridor W5"),
    ("w6", 970.0, 225.0, "Corridor W6"),
    ("w7", 1115.0, 225.0, "Corridor W7"),
    ("w8", 1260.0, 225.0, "Corridor W8"),
    ("w9", 1405.0, 225.0, "Corridor W9"),
    ("w10", 1550.0, 225.0, "Corridor W10"),
    // Left wing, north to south.
    ("lw1", 245.0, 360.0, "Left Wing LW1"),
    ("lw2", 245.0, 480.0, "Left Wing LW2"),
    ("lw3", 245.0, 600.0, "Left Wing LW3"),
    // North rooms, descending odd numbers eastwards.
    ("room-167", 290.0, 185.0, "Room 167"),
    ("room-165", 390.0, 185.0, "Room 165"),
    ("room-163", 490.0, 185.0, "Room 163"),
    ("room-161", 590.0, 185.0, "Room 161"),
    ("room-159", 690.0, 185.0, "Room 159"),
    ("room-157", 790.0, 185.0, "Room 157"),
    ("room-155", 890.0, 185.0, "Room 155"),
    ("room-153", 990.0, 185.0, "Room 153"),
    ("room-151", 1090.0, 185.0, "Room 151"),
    ("room-149", 1190.0, 185.0, "Room 149"),
    ("room-147", 1290.0, 185.0, "Room 147"),
    ("room-145", 1390.0, 185.0, "Room 145"),
    ("room-143", 1490.0, 185.0, "Room 143"),
    ("room-141", 1590.0, 185.0, "Room 141"),
    // South rooms.
    ("room-152", 350.0, 265.0, "Room 152"),
    ("room-150", 550.0, 265.0, "Room 150"),
    ("room-148", 750.0, 265.0, "Room 148"),
    ("room-146", 950.0, 265.0, "Room 146"),
    ("room-144", 1150.0, 265.0, "Room 144"),
    ("room-142", 1350.0, 265.0, "Room 142"),
    // Landmarks.
    ("entrance", 245.0, 690.0, "Main Entrance (Giris)"),
    ("cafeteria", 200.0, 480.0, "Cafeteria (Yemekhane)"),
    ("wc-1", 1600.0, 265.0, "WC"),
    ("wc-2", 290.0, 600.0, "WC Left Wing"),
    ("stairs-1", 1600.0, 185.0, "Stairs (Merdiven)"),
    ("stairs-2", 290.0, 360.0, "Stairs Left Wing (Merdiven)"),
];

const EDGES: &[(&str, &str)] = &[
    // Corridor spine.
    ("w1", "w2"),
    ("w2", "w3"),
    ("w3", "w4"),
    ("w4", "w5"),
    ("w5", "w6"),
    ("w6", "w7"),
    ("w7", "w8"),
    ("w8", "w9"),
    ("w9", "w10"),
    // Junction into the left wing.
    ("w1", "lw1"),
    ("lw1", "lw2"),
    ("lw2", "lw3"),
    // North rooms to their nearest waypoint.
    ("room-167", "w1"),
    ("room-165", "w2"),
    ("room-163", "w3"),
    ("room-161", "w3"),
    ("room-159", "w4"),
    ("room-157", "w5"),
    ("room-155", "w5"),
    ("room-153", "w6"),
    ("room-151", "w7"),
    ("room-149", "w8"),
    ("room-147", "w8"),
    ("room-145", "w9"),
    ("room-143", "w10"),
    ("room-141", "w10"),
    // South rooms.
    ("room-152", "w2"),
    ("room-150", "w3"),
    ("room-148", "w4"),
    ("room-146", "w6"),
    ("room-144", "w7"),
    ("room-142", "w9"),
    // Landmarks.
    ("entrance", "lw3"),
    ("cafeteria", "lw2"),
    ("wc-1", "w10"),
    ("wc-2", "lw3"),
    ("stairs-1", "w10"),
    ("stairs-2", "lw1"),
];

// Spoken and legacy names for destinations, Turkish and English.
const ALIASES: &[(&str, &str)] = &[
    ("entrance", "entrance"),
    ("giris", "entrance"),
    ("giriş", "entrance"),
    ("exit", "entrance"),
    ("cafeteria", "cafeteria"),
    ("yemekhane", "cafeteria"),
    ("canteen", "cafeteria"),
    ("wc", "wc-1"),
    ("tuvalet", "wc-1"),
    ("toilet", "wc-1"),
    ("stairs", "stairs-1"),
    ("merdiven", "stairs-1"),
];

#[derive(Debug)]
pub struct RouteGraph {
    nodes: Vec<Waypoint>,
    index: HashMap<&'static str, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
    aliases: HashMap<String, usize>,
}

impl RouteGraph {
    /// Build the ground-floor graph from the static tables.
    pub fn building() -> Self {
        let nodes: Vec<Waypoint> = NODES
            .iter()
            .map(|&(id, x, y, display_name)| Waypoint {
                id,
                x,
                y,
                display_name,
            })
            .collect();

        let index: HashMap<&'static str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for &(a, b) in EDGES {
            let (ia, ib) = (index[a], index[b]);
            let weight = nodes[ia].location().distance_to(&nodes[ib].location());
            adjacency[ia].push((ib, weight));
            adjacency[ib].push((ia, weight));
        }

        let mut aliases: HashMap<String, usize> = HashMap::new();
        for &(alias, id) in ALIASES {
            aliases.insert(alias.to_string(), index[id]);
        }
        // Numeric room codes resolve directly: "147" -> room-147.
        for (i, node) in nodes.iter().enumerate() {
            if let Some(number) = node.id.strip_prefix("room-") {
                aliases.insert(number.to_string(), i);
            }
        }

        RouteGraph {
            nodes,
            index,
            adjacency,
            aliases,
        }
    }

    pub fn node(&self, index: usize) -> &Waypoint {
        &self.nodes[index]
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.nodes
    }

    /// Undirected edge list as node-id pairs.
    pub fn edges(&self) -> &'static [(&'static str, &'static str)] {
        EDGES
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().len()
    }

    pub fn neighbors(&self, index: usize) -> &[(usize, f64)] {
        &self.adjacency[index]
    }

    /// Node closest to an arbitrary pixel position.
    pub fn nearest_node(&self, p: Point) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, node) in self.nodes.iter().enumerate() {
            let distance = p.distance_to(&node.location());
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }

    /// Resolve a requested destination: alias table first, then direct node
    /// id, then case-insensitive substring of the display name.
    pub fn resolve_target(&self, target: &str) -> Option<usize> {
        let needle = target.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(&i) = self.aliases.get(&needle) {
            return Some(i);
        }
        if let Some(&i) = self.index.get(needle.as_str()) {
            return Some(i);
        }
        self.nodes
            .iter()
            .position(|node| node.display_name.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_full_floor() {
        let graph = RouteGraph::building();
        assert_eq!(graph.node_count(), 39);
        // Every node has at least one edge.
        for i in 0..graph.node_count() {
            assert!(
                !graph.neighbors(i).is_empty(),
                "{} is disconnected",
                graph.node(i).id
            );
        }
    }

    #[test]
    fn nearest_node_finds_the_west_corridor_end() {
        let graph = RouteGraph::building();
        let i = graph.nearest_node(Point::new(250.0, 230.0));
        assert_eq!(graph.node(i).id, "w1");
    }

    #[test]
    fn resolves_numeric_room_codes() {
        let graph = RouteGraph::building();
        let i = graph.resolve_target(" 147 ").unwrap();
        assert_eq!(graph.node(i).id, "room-147");
    }

    #[test]
    fn resolves_turkish_and_english_aliases() {
        let graph = RouteGraph::building();
        for alias in ["yemekhane", "cafeteria", "CANTEEN"] {
            let i = graph.resolve_target(alias).unwrap();
            assert_eq!(graph.node(i).id, "cafeteria", "alias {alias}");
        }
        let i = graph.resolve_target("merdiven").unwrap();
        assert_eq!(graph.node(i).id, "stairs-1");
    }

    #[test]
    fn resolves_display_name_substrings() {
        let graph = RouteGraph::building();
        let i = graph.resolve_target("room 159").unwrap();
        assert_eq!(graph.node(i).id, "room-159");
    }

    #[test]
    fn unknown_targets_resolve_to_nothing() {
        let graph = RouteGraph::building();
        assert!(graph.resolve_target("rooftop").is_none());
        assert!(graph.resolve_target("").is_none());
        assert!(graph.resolve_target("   ").is_none());
    }
}
