//! Static loop geometry: waypoints, interpolation, terrain and zones.

use serde::Serialize;

/// A point in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in map units.
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Position and heading derived from route progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Heading of the current segment in degrees, counter-clockwise from +x.
    pub heading_deg: f64,
}

impl Pose {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One stop on the loop.
#[derive(Debug, Clone, Serialize)]
pub struct Waypoint {
    pub id: usize,
    pub name: String,
    /// Logical zone this waypoint belongs to (many waypoints may share one).
    pub zone: String,
    pub position: Point,
    /// Multiplier applied to power draw on the segment starting here.
    pub terrain_factor: f64,
    /// Extra wind speed on the segment starting here, in m/s.
    pub wind_exposure_mps: f64,
}

/// Outcome of moving a distance along the route.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    /// New progress, wrapped into `[0, len)`.
    pub progress: f64,
    /// Distance actually covered in meters.
    pub traveled_m: f64,
    /// Waypoints reached, in order.
    pub arrivals: Vec<usize>,
    /// `true` when movement stopped early at the last arrival.
    pub halted: bool,
}

/// Cyclic sequence of waypoints. Immutable after construction.
///
/// Progress is route-relative: the integer part is the origin waypoint index
/// (mod N) and the fractional part the interpolation weight towards its
/// successor. The last waypoint's successor is the first.
#[derive(Debug, Clone)]
pub struct Route {
    waypoints: Vec<Waypoint>,
    segment_lengths_m: Vec<f64>,
    meters_per_unit: f64,
}

impl Route {
    /// Creates a loop from ordered waypoints.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two waypoints are given, `meters_per_unit` is not
    /// positive, a terrain factor is not positive, or two consecutive
    /// waypoints coincide.
    pub fn new(waypoints: Vec<Waypoint>, meters_per_unit: f64) -> Self {
        assert!(waypoints.len() >= 2, "route needs at least two waypoints");
        assert!(meters_per_unit > 0.0, "meters_per_unit must be > 0");
        assert!(waypoints.iter().all(|w| w.terrain_factor > 0.0));

        let n = waypoints.len();
        let segment_lengths_m: Vec<f64> = (0..n)
            .map(|i| {
                let a = &waypoints[i].position;
                let b = &waypoints[(i + 1) % n].position;
                a.distance(b) * meters_per_unit
            })
            .collect();
        assert!(
            segment_lengths_m.iter().all(|&l| l > 0.0),
            "consecutive waypoints must not coincide"
        );

        Self {
            waypoints,
            segment_lengths_m,
            meters_per_unit,
        }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn waypoint(&self, idx: usize) -> &Waypoint {
        &self.waypoints[idx % self.len()]
    }

    /// Length of the segment starting at waypoint `idx`, in meters.
    pub fn segment_length_m(&self, idx: usize) -> f64 {
        self.segment_lengths_m[idx % self.len()]
    }

    /// Total loop length in meters.
    pub fn total_length_m(&self) -> f64 {
        self.segment_lengths_m.iter().sum()
    }

    /// Wraps progress of any magnitude or sign into `[0, len)`.
    pub fn wrap(&self, progress: f64) -> f64 {
        let n = self.len() as f64;
        let p = progress.rem_euclid(n);
        // rem_euclid can round up to exactly n for tiny negative inputs
        if p >= n { 0.0 } else { p }
    }

    /// Splits progress into `(origin waypoint index, fraction)`.
    fn locate(&self, progress: f64) -> (usize, f64) {
        let p = self.wrap(progress);
        let idx = (p.floor() as usize).min(self.len() - 1);
        (idx, (p - idx as f64).clamp(0.0, 1.0))
    }

    /// Interpolated position and heading at `progress`.
    pub fn position_at(&self, progress: f64) -> Pose {
        let (idx, frac) = self.locate(progress);
        let a = self.waypoints[idx].position;
        let b = self.waypoints[(idx + 1) % self.len()].position;
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        Pose {
            x: a.x + dx * frac,
            y: a.y + dy * frac,
            heading_deg: dy.atan2(dx).to_degrees(),
        }
    }

    /// Terrain factor of the segment containing `progress` (its origin waypoint's factor).
    pub fn terrain_factor(&self, progress: f64) -> f64 {
        let (idx, _) = self.locate(progress);
        self.waypoints[idx].terrain_factor
    }

    /// Wind exposure of the segment containing `progress`.
    pub fn wind_exposure(&self, progress: f64) -> f64 {
        let (idx, _) = self.locate(progress);
        self.waypoints[idx].wind_exposure_mps
    }

    /// Straight-line distance in meters between two derived positions.
    pub fn distance_m(&self, a: &Pose, b: &Pose) -> f64 {
        a.point().distance(&b.point()) * self.meters_per_unit
    }

    /// Index of the waypoint closest to `point`. Ties go to the lower index.
    pub fn nearest_waypoint(&self, point: &Point) -> usize {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, w) in self.waypoints.iter().enumerate() {
            let d = w.position.distance(point);
            if d < best_d {
                best = i;
                best_d = d;
            }
        }
        best
    }

    /// Zone of the waypoint nearest to the position at `progress`.
    pub fn zone_at(&self, progress: f64) -> &str {
        let pose = self.position_at(progress);
        &self.waypoints[self.nearest_waypoint(&pose.point())].zone
    }

    /// Moves `distance_m` forward from `progress`.
    ///
    /// Every waypoint reached is reported in `arrivals`. When `halt` returns
    /// `true` for a reached waypoint, movement stops exactly on it and the
    /// remaining distance is discarded.
    pub fn advance(&self, progress: f64, distance_m: f64, halt: impl Fn(usize) -> bool) -> Advance {
        let (mut idx, mut frac) = self.locate(progress);
        let mut remaining = distance_m.max(0.0);
        let mut traveled_m = 0.0;
        let mut arrivals = Vec::new();

        while remaining > 0.0 {
            let seg = self.segment_lengths_m[idx];
            let to_next = (1.0 - frac) * seg;
            if remaining < to_next {
                let next_frac = frac + remaining / seg;
                if next_frac < 1.0 {
                    frac = next_frac;
                    traveled_m += remaining;
                    break;
                }
                // Rounded onto the next waypoint: falls through as an arrival.
            }

            remaining -= to_next;
            traveled_m += to_next;
            idx = (idx + 1) % self.len();
            frac = 0.0;
            arrivals.push(idx);
            if halt(idx) {
                return Advance {
                    progress: idx as f64,
                    traveled_m,
                    arrivals,
                    halted: true,
                };
            }
        }

        Advance {
            progress: self.wrap(idx as f64 + frac),
            traveled_m,
            arrivals,
            halted: false,
        }
    }
}
