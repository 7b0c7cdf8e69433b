pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Checks that a latitude/longitude pair lies on the globe. NaN and infinite
/// values are rejected.
pub fn is_valid_position(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Human readable position with four decimals (roughly 11 m precision),
/// used wherever no street address is known.
pub fn format_position(latitude: f64, longitude: f64) -> String {
    format!("{:.4}, {:.4}", latitude, longitude)
}

pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lat2_rad = to_radians(latitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = to_radians(longitude_2) - to_radians(longitude_1);

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_four_decimals() {
        assert_eq!(format_position(51.50071, -0.12463), "51.5007, -0.1246");
    }

    #[test]
    fn rejects_out_of_range_positions() {
        assert!(is_valid_position(51.505, -0.09));
        assert!(!is_valid_position(91.0, 0.0));
        assert!(!is_valid_position(0.0, -181.0));
        assert!(!is_valid_position(f64::NAN, 0.0));
    }

    #[test]
    fn westminster_to_kings_cross() {
        let distance = haversine_distance(51.5007, -0.1246, 51.5308, -0.1238);
        assert!((distance - 3.35).abs() < 0.05, "got {distance}");
    }
}
