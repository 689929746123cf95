use std::f64::consts::{PI, TAU};

use chrono::{DateTime, Utc};

pub const EARTH_RADIUS_EQUATOR_KM: f64 = 6378.137;
pub const EARTH_RADIUS_POLAR_KM: f64 = 6356.752314245;
pub const EARTH_FLATTENING: f64 = 1.0 - EARTH_RADIUS_POLAR_KM / EARTH_RADIUS_EQUATOR_KM;

const UNIX_EPOCH_JULIAN_DATE: f64 = 2_440_587.5;
const J2000_JULIAN_DATE: f64 = 2_451_545.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

const GEODETIC_TOLERANCE: f64 = 1e-10;
const GEODETIC_MAX_ITERATIONS: usize = 10;

/// Geodetic coordinates in radians and kilometres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
}

fn eccentricity_squared() -> f64 {
    EARTH_FLATTENING * (2.0 - EARTH_FLATTENING)
}

pub fn julian_date(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_JULIAN_DATE
}

/// Greenwich mean sidereal time in radians, [0, 2π)
pub fn gmst(timestamp: DateTime<Utc>) -> f64 {
    let days = julian_date(timestamp) - J2000_JULIAN_DATE;
    let t = days / DAYS_PER_JULIAN_CENTURY;
    let degrees = 280.460_618_37 + 360.985_647_366_29 * days + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    let radians = degrees.rem_euclid(360.0).to_radians();
    if radians >= TAU {
        0.0
    } else {
        radians
    }
}

pub fn eci_to_ecef(pos_eci: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_gmst, cos_gmst) = gmst.sin_cos();
    [
        pos_eci[0] * cos_gmst + pos_eci[1] * sin_gmst,
        -pos_eci[0] * sin_gmst + pos_eci[1] * cos_gmst,
        pos_eci[2],
    ]
}

/// Wrap a longitude into (-π, π]
pub fn normalize_longitude(longitude: f64) -> f64 {
    if longitude > -PI && longitude <= PI {
        return longitude;
    }
    let wrapped = (longitude + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

fn prime_vertical_radius(sin_lat: f64) -> f64 {
    EARTH_RADIUS_EQUATOR_KM / (1.0 - eccentricity_squared() * sin_lat * sin_lat).sqrt()
}

/// Iterative footpoint solution over the reference ellipsoid
pub fn ecef_to_geodetic(pos_ecef: [f64; 3]) -> Geodetic {
    let [x, y, z] = pos_ecef;
    let e2 = eccentricity_squared();

    let longitude = normalize_longitude(y.atan2(x));
    let rho = (x * x + y * y).sqrt();

    let mut latitude = z.atan2(rho);
    let mut previous = 0.0;
    let mut iterations = 0;
    while (latitude - previous).abs() > GEODETIC_TOLERANCE && iterations < GEODETIC_MAX_ITERATIONS
    {
        previous = latitude;
        let sin_lat = latitude.sin();
        let n = prime_vertical_radius(sin_lat);
        latitude = (z + e2 * n * sin_lat).atan2(rho);
        iterations += 1;
    }

    let (sin_lat, cos_lat) = latitude.sin_cos();
    let n = prime_vertical_radius(sin_lat);
    let altitude_km = if cos_lat.abs() > 1e-10 {
        rho / cos_lat - n
    } else {
        z / sin_lat - n * (1.0 - e2)
    };

    Geodetic {
        latitude,
        longitude,
        altitude_km,
    }
}

/// Inverse of `ecef_to_geodetic`
pub fn geodetic_to_ecef(geodetic: &Geodetic) -> [f64; 3] {
    let e2 = eccentricity_squared();
    let (sin_lat, cos_lat) = geodetic.latitude.sin_cos();
    let (sin_lon, cos_lon) = geodetic.longitude.sin_cos();
    let n = prime_vertical_radius(sin_lat);
    let h = geodetic.altitude_km;
    [
        (n + h) * cos_lat * cos_lon,
        (n + h) * cos_lat * sin_lon,
        (n * (1.0 - e2) + h) * sin_lat,
    ]
}

pub fn eci_to_geodetic(pos_eci: [f64; 3], timestamp: DateTime<Utc>) -> Geodetic {
    ecef_to_geodetic(eci_to_ecef(pos_eci, gmst(timestamp)))
}
