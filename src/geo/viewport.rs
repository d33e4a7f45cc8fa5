//! Fitting coordinates into a rendered map area

use std::f64::consts::PI;

use super::coordinates::{Bounds, Coordinates, Pixel};

/// Web map tiles are 256px squares
const TILE_SIZE: f64 = 256.0;
const ZOOM_MAX: i32 = 21;

/// Arithmetic mean of latitudes and longitudes, `(0, 0)` for no input.
///
/// This is not a spherical centroid and drifts near the poles or across the
/// antimeridian. Good enough for city sized extents.
pub fn calculate_center(coordinates: &[Coordinates]) -> Coordinates {
    if coordinates.is_empty() {
        return Coordinates::default();
    }
    let n = coordinates.len() as f64;
    let (lat, lng) = coordinates
        .iter()
        .fold((0.0, 0.0), |(lat, lng), c| (lat + c.lat, lng + c.lng));
    Coordinates {
        lat: lat / n,
        lng: lng / n,
    }
}

/// Smallest bounds containing all coordinates, all zero for no input.
///
/// A NaN latitude or longitude anywhere in the input makes the matching
/// bounds NaN.
pub fn calculate_bounds(coordinates: &[Coordinates]) -> Bounds {
    let Some(first) = coordinates.first() else {
        return Bounds::default();
    };
    let mut bounds = Bounds::new(first.lat, first.lat, first.lng, first.lng);
    for c in &coordinates[1..] {
        bounds.north = widen(bounds.north, c.lat, f64::max);
        bounds.south = widen(bounds.south, c.lat, f64::min);
        bounds.east = widen(bounds.east, c.lng, f64::max);
        bounds.west = widen(bounds.west, c.lng, f64::min);
    }
    bounds
}

// f64::max and f64::min drop a NaN operand, bounds must keep it
fn widen(edge: f64, value: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if edge.is_nan() || value.is_nan() {
        f64::NAN
    } else {
        pick(edge, value)
    }
}

// Half the mercator y of a latitude, clamped to the projectable range
fn mercator_lat(lat: f64) -> f64 {
    let sin = lat.to_radians().sin();
    let rad_x2 = ((1.0 + sin) / (1.0 - sin)).ln() / 2.0;
    rad_x2.clamp(-PI, PI) / 2.0
}

fn zoom_for(map_px: f64, fraction: f64) -> f64 {
    (map_px / TILE_SIZE / fraction).log2().floor()
}

/// Largest tile zoom level (capped at 21) at which `bounds` fit into a
/// `width` x `height` pixel viewport.
///
/// Bounds whose `east` is smaller than `west` are treated as crossing the
/// antimeridian. Zero sized bounds give the maximum zoom, NaN input gives 0.
pub fn calculate_zoom_level(bounds: &Bounds, width: f64, height: f64) -> i32 {
    let lat_fraction = (mercator_lat(bounds.north) - mercator_lat(bounds.south)) / PI;
    let mut lng_diff = bounds.east - bounds.west;
    if lng_diff < 0.0 {
        lng_diff += 360.0;
    }
    let lng_fraction = lng_diff / 360.0;

    let lat_zoom = zoom_for(height, lat_fraction);
    let lng_zoom = zoom_for(width, lng_fraction);
    if lat_zoom.is_nan() || lng_zoom.is_nan() {
        return 0;
    }
    // `as` saturates, infinite zoom from an empty span ends up at ZOOM_MAX
    (lat_zoom.min(lng_zoom) as i32).min(ZOOM_MAX)
}

/// Inclusive check on both axes.
pub fn is_within_bounds(coordinate: &Coordinates, bounds: &Bounds) -> bool {
    coordinate.lat >= bounds.south
        && coordinate.lat <= bounds.north
        && coordinate.lng >= bounds.west
        && coordinate.lng <= bounds.east
}

/// Linear projection of a coordinate into a `width` x `height` area showing
/// `bounds`. North is at `y = 0`.
pub fn coordinate_to_pixel(
    coordinate: &Coordinates,
    bounds: &Bounds,
    width: f64,
    height: f64,
) -> Pixel {
    Pixel {
        x: (coordinate.lng - bounds.west) / bounds.lng_span() * width,
        y: (bounds.north - coordinate.lat) / bounds.lat_span() * height,
    }
}

/// Inverse of [`coordinate_to_pixel`].
pub fn pixel_to_coordinate(pixel: &Pixel, bounds: &Bounds, width: f64, height: f64) -> Coordinates {
    Coordinates {
        lat: bounds.north - pixel.y / height * bounds.lat_span(),
        lng: bounds.west + pixel.x / width * bounds.lng_span(),
    }
}

/// Named default view of a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPreset {
    pub name: &'static str,
    pub center: Coordinates,
    pub zoom: i32,
    pub bounds: Bounds,
}

pub const NEW_YORK: MapPreset = MapPreset {
    name: "New York",
    center: Coordinates {
        lat: 40.7128,
        lng: -74.0060,
    },
    zoom: 11,
    bounds: Bounds {
        north: 40.9176,
        south: 40.4774,
        east: -73.7004,
        west: -74.2591,
    },
};

pub const LOS_ANGELES: MapPreset = MapPreset {
    name: "Los Angeles",
    center: Coordinates {
        lat: 34.0522,
        lng: -118.2437,
    },
    zoom: 10,
    bounds: Bounds {
        north: 34.8233,
        south: 33.7037,
        east: -117.6462,
        west: -118.9448,
    },
};

pub const CHICAGO: MapPreset = MapPreset {
    name: "Chicago",
    center: Coordinates {
        lat: 41.8781,
        lng: -87.6298,
    },
    zoom: 11,
    bounds: Bounds {
        north: 42.0230,
        south: 41.6445,
        east: -87.5240,
        west: -87.9401,
    },
};

pub static MAP_PRESETS: [MapPreset; 3] = [NEW_YORK, LOS_ANGELES, CHICAGO];

/// Preset whose bounds contain `coordinate`, if any.
pub fn preset_for(coordinate: &Coordinates) -> Option<&'static MapPreset> {
    MAP_PRESETS
        .iter()
        .find(|p| is_within_bounds(coordinate, &p.bounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_of_nothing_and_one() {
        assert_eq!(calculate_center(&[]), Coordinates::default());
        let c = Coordinates::new(12.5, -3.25);
        assert_eq!(calculate_center(&[c]), c);
    }

    #[test]
    fn center_is_mean() {
        let c = calculate_center(&[Coordinates::new(0.0, 0.0), Coordinates::new(10.0, 20.0)]);
        assert_eq!(c, Coordinates::new(5.0, 10.0));
    }

    #[test]
    fn empty_bounds_are_zero() {
        assert_eq!(calculate_bounds(&[]), Bounds::default());
    }

    #[test]
    fn nan_in_first_position_reaches_the_bounds() {
        let points = [
            Coordinates::new(f64::NAN, 0.0),
            Coordinates::new(10.0, 10.0),
        ];
        let b = calculate_bounds(&points);
        assert!(b.north.is_nan());
        assert!(b.south.is_nan());
        assert_eq!((b.east, b.west), (10.0, 0.0));
    }

    #[test]
    fn nan_in_the_middle_reaches_the_bounds() {
        let points = [
            Coordinates::new(0.0, 0.0),
            Coordinates::new(f64::NAN, 5.0),
            Coordinates::new(10.0, 10.0),
        ];
        let b = calculate_bounds(&points);
        assert!(b.north.is_nan());
        assert!(b.south.is_nan());
        assert_eq!((b.east, b.west), (10.0, 0.0));

        let b = calculate_bounds(&[Coordinates::new(1.0, 1.0), Coordinates::new(2.0, f64::NAN)]);
        assert_eq!((b.north, b.south), (2.0, 1.0));
        assert!(b.east.is_nan() && b.west.is_nan());
    }

    #[test]
    fn zoom_for_new_york() {
        assert_eq!(calculate_zoom_level(&NEW_YORK.bounds, 800.0, 600.0), 10);
    }

    #[test]
    fn zoom_caps_at_max() {
        let point = Bounds::new(40.0, 40.0, -74.0, -74.0);
        assert_eq!(calculate_zoom_level(&point, 800.0, 600.0), ZOOM_MAX);
        let nan = Bounds::new(f64::NAN, 0.0, 1.0, 0.0);
        assert_eq!(calculate_zoom_level(&nan, 800.0, 600.0), 0);
    }

    #[test]
    fn within_bounds_is_inclusive() {
        let b = NEW_YORK.bounds;
        assert!(is_within_bounds(&Coordinates::new(b.north, b.west), &b));
        assert!(!is_within_bounds(&Coordinates::new(b.north + 1e-9, b.west), &b));
        assert!(!is_within_bounds(&Coordinates::new(f64::NAN, b.west), &b));
    }

    #[test]
    fn corners_project_to_corners() {
        let b = Bounds::new(10.0, 0.0, 20.0, 0.0);
        let nw = coordinate_to_pixel(&Coordinates::new(10.0, 0.0), &b, 200.0, 100.0);
        let se = coordinate_to_pixel(&Coordinates::new(0.0, 20.0), &b, 200.0, 100.0);
        assert_eq!(nw, Pixel::new(0.0, 0.0));
        assert_eq!(se, Pixel::new(200.0, 100.0));
    }

    #[test]
    fn presets_contain_their_center() {
        for preset in MAP_PRESETS.iter() {
            let found = preset_for(&preset.center).map(|p| p.name);
            assert_eq!(found, Some(preset.name));
        }
    }
}
