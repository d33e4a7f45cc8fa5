//! Coordinate, bounds and pixel types

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Coordinates { lat, lng }
    }
}

/// Rectangular lat/lng region.
///
/// `north >= south` holds for anything built by this module. `east` may be
/// smaller than `west` when a region crosses the antimeridian, callers that
/// build such bounds have to handle that themselves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Bounds {
            north,
            south,
            east,
            west,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    /// Grow the bounds by `fraction` of their span on every side. Zero spans
    /// grow by `min_margin` degrees instead so a single point still gets an area.
    pub fn padded(&self, fraction: f64, min_margin: f64) -> Bounds {
        let lat_pad = (self.lat_span() * fraction).max(min_margin);
        let lng_pad = (self.lng_span() * fraction).max(min_margin);
        Bounds {
            north: (self.north + lat_pad).min(90.0),
            south: (self.south - lat_pad).max(-90.0),
            east: self.east + lng_pad,
            west: self.west - lng_pad,
        }
    }
}

/// A position on a rendered map, origin top left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Pixel { x, y }
    }
}

/// Range and NaN check.
pub fn is_valid_coordinate(coordinate: &Coordinates) -> bool {
    (-90.0..=90.0).contains(&coordinate.lat) && (-180.0..=180.0).contains(&coordinate.lng)
}

pub fn format_coordinates(coordinate: &Coordinates, precision: usize) -> String {
    format!(
        "{:.*}, {:.*}",
        precision, coordinate.lat, precision, coordinate.lng
    )
}
