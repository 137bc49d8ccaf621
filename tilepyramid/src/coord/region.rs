//! Rectangular geographic regions.

use std::fmt;

use super::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Position of a child region within its parent after a quad split.
///
/// The order of the variants is the order in which [`Region::subdivide_quad`]
/// returns children. Rows grow northwards and columns grow eastwards, so the
/// row/column offset of each quadrant relative to `2 * parent` is fixed:
///
/// | Quadrant | row offset | col offset |
/// |----------|------------|------------|
/// | NW       | 1          | 0          |
/// | NE       | 1          | 1          |
/// | SW       | 0          | 0          |
/// | SE       | 0          | 1          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    /// All quadrants in subdivision order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::SouthEast,
    ];

    /// Row offset added to `2 * parent_row`.
    pub fn row_offset(self) -> i32 {
        match self {
            Quadrant::NorthWest | Quadrant::NorthEast => 1,
            Quadrant::SouthWest | Quadrant::SouthEast => 0,
        }
    }

    /// Column offset added to `2 * parent_col`.
    pub fn col_offset(self) -> i32 {
        match self {
            Quadrant::NorthWest | Quadrant::SouthWest => 0,
            Quadrant::NorthEast | Quadrant::SouthEast => 1,
        }
    }
}

/// A latitude/longitude bounding box in degrees.
///
/// The invariant `min <= max` holds on both axes for every region produced
/// by this module. Regions that would violate it (for example a disjoint
/// intersection) are represented as `None` instead.
///
/// Regions never wrap the antimeridian. Callers holding a view that straddles
/// it must split the view into two regions first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Region {
    /// Creates a region from degree bounds, normalising the order of each axis.
    pub fn from_degrees(lat_a: f64, lat_b: f64, lon_a: f64, lon_b: f64) -> Self {
        Self {
            min_lat: lat_a.min(lat_b),
            max_lat: lat_a.max(lat_b),
            min_lon: lon_a.min(lon_b),
            max_lon: lon_a.max(lon_b),
        }
    }

    /// The whole sphere: latitude -90..90, longitude -180..180.
    pub fn full_sphere() -> Self {
        Self {
            min_lat: MIN_LAT,
            max_lat: MAX_LAT,
            min_lon: MIN_LON,
            max_lon: MAX_LON,
        }
    }

    /// Latitude extent in degrees.
    pub fn delta_lat(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude extent in degrees.
    pub fn delta_lon(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Area in square degrees. Zero for regions that collapse to a line or point.
    pub fn area(&self) -> f64 {
        self.delta_lat() * self.delta_lon()
    }

    /// Center point as `(lat, lon)`.
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Returns true if the point lies inside or on the boundary of the region.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Returns true if `other` lies entirely within this region.
    pub fn contains_region(&self, other: &Region) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lon >= self.min_lon
            && other.max_lon <= self.max_lon
    }

    /// Bounding envelope of both regions.
    pub fn union(&self, other: &Region) -> Region {
        Region {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    /// Overlap of both regions, or `None` if they are disjoint.
    ///
    /// Regions that only share an edge intersect in a zero-area region.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let min_lat = self.min_lat.max(other.min_lat);
        let max_lat = self.max_lat.min(other.max_lat);
        let min_lon = self.min_lon.max(other.min_lon);
        let max_lon = self.max_lon.min(other.max_lon);

        if min_lat > max_lat || min_lon > max_lon {
            return None;
        }

        Some(Region {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Returns true if the regions overlap with positive area.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.intersect(other).is_some_and(|r| r.area() > 0.0)
    }

    /// Child region for a single quadrant.
    pub fn quadrant(&self, quadrant: Quadrant) -> Region {
        let (mid_lat, mid_lon) = self.centroid();
        let (min_lat, max_lat) = if quadrant.row_offset() == 1 {
            (mid_lat, self.max_lat)
        } else {
            (self.min_lat, mid_lat)
        };
        let (min_lon, max_lon) = if quadrant.col_offset() == 1 {
            (mid_lon, self.max_lon)
        } else {
            (self.min_lon, mid_lon)
        };
        Region {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Splits the region at the midpoint of each axis.
    ///
    /// Children are returned in [`Quadrant::ALL`] order: NW, NE, SW, SE.
    pub fn subdivide_quad(&self) -> [Region; 4] {
        Quadrant::ALL.map(|q| self.quadrant(q))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[lat {:.6}..{:.6}, lon {:.6}..{:.6}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}
