use dispatch_view::geo::{
    Bounds, CHICAGO, Coordinates, LOS_ANGELES, MAP_PRESETS, NEW_YORK, Pixel, calculate_bounds,
    calculate_center, calculate_distance, calculate_zoom_level, coordinate_to_pixel,
    get_bearing, get_destination, is_within_bounds, pixel_to_coordinate, preset_for,
};

fn close(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

// Compare bearings modulo 360 so 359.9999 counts as north
fn same_angle(a: f64, b: f64) -> bool {
    ((a - b + 540.0).rem_euclid(360.0) - 180.0).abs() < 1e-6
}

#[test]
fn distance_is_symmetric_and_zero_for_same_point() {
    let points = [
        NEW_YORK.center,
        LOS_ANGELES.center,
        CHICAGO.center,
        Coordinates::new(-33.8688, 151.2093),
    ];
    for a in &points {
        assert_eq!(calculate_distance(a, a), 0.0);
        for b in &points {
            assert!(close(calculate_distance(a, b), calculate_distance(b, a), 1e-9));
        }
    }
    let ny_la = calculate_distance(&NEW_YORK.center, &LOS_ANGELES.center);
    assert!(close(ny_la, 3936.0, 5.0), "{ny_la}");
}

#[test]
fn destination_follows_bearing_and_distance() {
    let start = CHICAGO.center;
    for bearing in [0.0, 45.0, 90.0, 135.0, 200.0, 315.0] {
        for km in [0.5, 12.0, 250.0] {
            let end = get_destination(&start, bearing, km);
            assert!(close(calculate_distance(&start, &end), km, 1e-6));
            let heading = get_bearing(&start, &end);
            assert!(same_angle(heading, bearing), "{bearing} {km}");
        }
    }
}

#[test]
fn bearing_range() {
    let north = get_bearing(&Coordinates::new(0.0, 0.0), &Coordinates::new(1.0, 0.0));
    let west = get_bearing(&Coordinates::new(0.0, 0.0), &Coordinates::new(0.0, -1.0));
    assert_eq!(north, 0.0);
    assert!(close(west, 270.0, 1e-9));
    let nowhere = Coordinates::new(f64::NAN, 0.0);
    assert!(get_bearing(&nowhere, &Coordinates::new(1.0, 1.0)).is_nan());
}

#[test]
fn bounds_and_center_of_points() {
    let points = [
        Coordinates::new(0.0, 0.0),
        Coordinates::new(10.0, 10.0),
        Coordinates::new(-5.0, 5.0),
    ];
    // West is the smallest longitude, 0 here
    let bounds = calculate_bounds(&points);
    assert_eq!(bounds, Bounds::new(10.0, -5.0, 10.0, 0.0));
    assert!(points.iter().all(|p| is_within_bounds(p, &bounds)));

    let center = calculate_center(&points);
    assert!(close(center.lat, 5.0 / 3.0, 1e-12));
    assert!(close(center.lng, 5.0, 1e-12));
}

#[test]
fn nan_coordinates_poison_bounds() {
    let points = [
        Coordinates::new(0.0, 0.0),
        Coordinates::new(f64::NAN, 5.0),
        Coordinates::new(10.0, 10.0),
    ];
    let bounds = calculate_bounds(&points);
    assert!(bounds.north.is_nan() && bounds.south.is_nan());
    assert!(!is_within_bounds(&points[0], &bounds));
    assert_eq!(calculate_zoom_level(&bounds, 800.0, 600.0), 0);
}

#[test]
fn pixels_round_trip() {
    let bounds = NEW_YORK.bounds;
    let (w, h) = (800.0, 600.0);

    let nw = coordinate_to_pixel(&Coordinates::new(bounds.north, bounds.west), &bounds, w, h);
    assert_eq!(nw, Pixel::new(0.0, 0.0));
    let se = coordinate_to_pixel(&Coordinates::new(bounds.south, bounds.east), &bounds, w, h);
    assert!(close(se.x, w, 1e-9) && close(se.y, h, 1e-9));

    let c = Coordinates::new(40.7589, -73.9851);
    let back = pixel_to_coordinate(&coordinate_to_pixel(&c, &bounds, w, h), &bounds, w, h);
    assert!(close(back.lat, c.lat, 1e-9));
    assert!(close(back.lng, c.lng, 1e-9));
}

#[test]
fn zoom_levels() {
    assert_eq!(calculate_zoom_level(&NEW_YORK.bounds, 800.0, 600.0), 10);
    // Larger viewports never zoom out
    assert!(calculate_zoom_level(&NEW_YORK.bounds, 1600.0, 1200.0) >= 10);

    let point = Bounds::new(1.0, 1.0, 2.0, 2.0);
    assert_eq!(calculate_zoom_level(&point, 800.0, 600.0), 21);
    let broken = Bounds::new(f64::NAN, 0.0, 1.0, 0.0);
    assert_eq!(calculate_zoom_level(&broken, 800.0, 600.0), 0);
}

#[test]
fn presets_contain_their_center() {
    for preset in MAP_PRESETS.iter() {
        assert!(is_within_bounds(&preset.center, &preset.bounds));
        let found = preset_for(&preset.center).map(|p| p.name);
        assert_eq!(found, Some(preset.name));
    }
    assert!(preset_for(&Coordinates::new(48.2082, 16.3738)).is_none());
}
