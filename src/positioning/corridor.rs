//! Soft walkable-region prior.
//!
//! The ground floor has two walkable rectangles: the long main corridor and
//! the left wing running south from its west end. Radio estimates that land
//! inside a wall are pulled back into the nearest corridor; the pull is
//! soft across the corridor width and hard along its length, so a noisy
//! estimate keeps its progress along the corridor while being squeezed
//! toward the centre-line.

use crate::constants::{
    CENTERLINE_PULL, CORRIDOR_MARGIN_PX, JUNCTION_MAX_Y, LEFT_CORRIDOR_CENTER_X,
    LEFT_CORRIDOR_MAX_X, LEFT_CORRIDOR_MAX_Y, LEFT_CORRIDOR_MIN_X, LEFT_CORRIDOR_MIN_Y,
    MAIN_CORRIDOR_CENTER_Y, MAIN_CORRIDOR_MAX_X, MAIN_CORRIDOR_MAX_Y, MAIN_CORRIDOR_MIN_X,
    MAIN_CORRIDOR_MIN_Y, SOFT_CONSTRAINT_STRENGTH,
};
use crate::geometry::Point;

#[derive(Debug, Clone, Copy)]
struct Corridor {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    /// true when the corridor runs along the x axis
    horizontal: bool,
    centerline: f64,
}

const MAIN: Corridor = Corridor {
    min_x: MAIN_CORRIDOR_MIN_X,
    max_x: MAIN_CORRIDOR_MAX_X,
    min_y: MAIN_CORRIDOR_MIN_Y,
    max_y: MAIN_CORRIDOR_MAX_Y,
    horizontal: true,
    centerline: MAIN_CORRIDOR_CENTER_Y,
};

const LEFT: Corridor = Corridor {
    min_x: LEFT_CORRIDOR_MIN_X,
    max_x: LEFT_CORRIDOR_MAX_X,
    min_y: LEFT_CORRIDOR_MIN_Y,
    max_y: LEFT_CORRIDOR_MAX_Y,
    horizontal: false,
    centerline: LEFT_CORRIDOR_CENTER_X,
};

impl Corridor {
    fn contains(&self, p: Point) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }

    fn within_margin(&self, p: Point, margin: f64) -> bool {
        (self.min_x - margin..=self.max_x + margin).contains(&p.x)
            && (self.min_y - margin..=self.max_y + margin).contains(&p.y)
    }

    fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.min_x, self.max_x),
            p.y.clamp(self.min_y, self.max_y),
        )
    }

    /// Hard clamp along the corridor's length, soft landing across its
    /// width: an overflow of `delta` comes to rest `delta * (1 - strength)`
    /// inside the violated boundary, then gets a gentle pull toward the
    /// centre-line.
    fn soft_pull(&self, p: Point) -> Point {
        let (along, perp, perp_min, perp_max) = if self.horizontal {
            (p.x.clamp(self.min_x, self.max_x), p.y, self.min_y, self.max_y)
        } else {
            (p.y.clamp(self.min_y, self.max_y), p.x, self.min_x, self.max_x)
        };

        let mut perp = if perp < perp_min {
            perp_min + (perp_min - perp) * (1.0 - SOFT_CONSTRAINT_STRENGTH)
        } else if perp > perp_max {
            perp_max - (perp - perp_max) * (1.0 - SOFT_CONSTRAINT_STRENGTH)
        } else {
            perp
        };
        perp = perp.clamp(perp_min, perp_max);
        perp += CENTERLINE_PULL * (self.centerline - perp);

        if self.horizontal {
            Point::new(along, perp)
        } else {
            Point::new(perp, along)
        }
    }
}

fn in_junction(p: Point) -> bool {
    (LEFT_CORRIDOR_MIN_X..=LEFT_CORRIDOR_MAX_X).contains(&p.x)
        && (MAIN_CORRIDOR_MIN_Y..=JUNCTION_MAX_Y).contains(&p.y)
}

/// Pull an off-corridor estimate back into the walkable region. Points
/// already inside a corridor pass through unchanged.
pub fn apply_soft_constraint(p: Point) -> Point {
    if within_walkable(p) {
        return p;
    }

    // Where the two corridors meet, only the main corridor's outer bounds
    // apply; squeezing toward either centre-line would fight the turn.
    if in_junction(p) {
        return MAIN.clamp(p);
    }

    let in_main_margin = MAIN.within_margin(p, CORRIDOR_MARGIN_PX);
    let in_left_margin = LEFT.within_margin(p, CORRIDOR_MARGIN_PX);

    if p.y < MAIN_CORRIDOR_MAX_Y || (in_main_margin && !in_left_margin) {
        MAIN.soft_pull(p)
    } else if in_left_margin {
        LEFT.soft_pull(p)
    } else {
        let to_main = p.distance_to(&MAIN.clamp(p));
        let to_left = p.distance_to(&LEFT.clamp(p));
        if to_main <= to_left {
            MAIN.soft_pull(p)
        } else {
            LEFT.soft_pull(p)
        }
    }
}

/// Whether the point is inside (or on the boundary of) the walkable region.
pub fn within_walkable(p: Point) -> bool {
    MAIN.contains(p) || LEFT.contains(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_inside_a_corridor_pass_through() {
        let p = Point::new(500.0, 225.0);
        assert_eq!(apply_soft_constraint(p), p);
        let q = Point::new(245.0, 500.0);
        assert_eq!(apply_soft_constraint(q), q);
    }

    #[test]
    fn below_main_corridor_is_pulled_back_inside() {
        let constrained = apply_soft_constraint(Point::new(800.0, 400.0));
        assert_eq!(constrained.x, 800.0);
        // Overflow of 130 px lands 39 px inside the south wall, then the
        // centre-line pull brings it to 229.8.
        assert!((constrained.y - 229.8).abs() < 1e-9);
        assert!((225.0..270.0).contains(&constrained.y));
    }

    #[test]
    fn turning_the_junction_stays_walkable() {
        // Standing in the top strip of the left corridor is legitimate;
        // the constraint must not snap the turn onto a wall.
        let p = Point::new(250.0, 290.0);
        assert_eq!(apply_soft_constraint(p), p);
    }

    #[test]
    fn far_west_points_join_the_left_corridor() {
        let constrained = apply_soft_constraint(Point::new(120.0, 500.0));
        assert!(within_walkable(constrained));
        assert_eq!(constrained.y, 500.0);
        // 80 px overflow beyond x=200 lands 24 px inside, then pulls
        // toward x=245.
        assert!((constrained.x - 228.2).abs() < 1e-9);
    }

    #[test]
    fn margin_above_main_prefers_the_main_corridor() {
        // 60 px above the north wall, inside the 100 px margin.
        let constrained = apply_soft_constraint(Point::new(900.0, 120.0));
        assert_eq!(constrained.x, 900.0);
        // 60 px overflow lands 18 px inside, then pulls toward y=225.
        assert!((constrained.y - 203.4).abs() < 1e-9);
    }

    #[test]
    fn margin_beside_left_wing_prefers_the_left_corridor() {
        // Just west of the left wing, well below the main corridor.
        let constrained = apply_soft_constraint(Point::new(150.0, 450.0));
        assert_eq!(constrained.y, 450.0);
        assert!((200.0..=290.0).contains(&constrained.x));
    }

    #[test]
    fn constrained_points_never_leave_the_walkable_region() {
        let samples = [
            Point::new(0.0, 0.0),
            Point::new(1800.0, 100.0),
            Point::new(1700.0, 500.0),
            Point::new(100.0, 800.0),
            Point::new(400.0, 900.0),
            Point::new(245.0, -50.0),
            Point::new(-100.0, 290.0),
            Point::new(900.0, 269.9),
            Point::new(283.0, 301.0),
        ];
        for p in samples {
            let q = apply_soft_constraint(p);
            assert!(within_walkable(q), "{p} escaped to {q}");
        }
    }
}
