use std::f64::consts::TAU;

use chrono::{DateTime, Utc};

use crate::orbit::elements::{OrbitalElements, GM_KM3_S2};
use crate::orbit::types::EciState;

/// Reported when vis-viva cannot produce a real speed
pub const FALLBACK_SPEED_KMH: f64 = 27_600.0;

const KEPLER_TOLERANCE: f64 = 1e-8;
const KEPLER_MAX_ITERATIONS: usize = 12;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    pub eccentric_anomaly: f64,
    pub iterations: usize,
}

/// Wrap an angle into [0, 2π)
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Newton-Raphson on E - e·sin(E) = M, starting from E = M.
///
/// Runs at most `KEPLER_MAX_ITERATIONS` steps; the last iterate is returned
/// whether or not it met the tolerance.
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
    let mut eccentric_anomaly = mean_anomaly;
    let mut iterations = 0;

    while iterations < KEPLER_MAX_ITERATIONS {
        let delta = (eccentric_anomaly - eccentricity * eccentric_anomaly.sin() - mean_anomaly)
            / (1.0 - eccentricity * eccentric_anomaly.cos());
        eccentric_anomaly -= delta;
        iterations += 1;
        if delta.abs() < KEPLER_TOLERANCE {
            break;
        }
    }

    KeplerSolution {
        eccentric_anomaly,
        iterations,
    }
}

pub fn true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let half = eccentric_anomaly / 2.0;
    2.0 * ((1.0 + eccentricity).sqrt() * half.sin()).atan2((1.0 - eccentricity).sqrt() * half.cos())
}

/// Orbital speed in km/h from the vis-viva equation.
///
/// This is the only place the fallback speed is chosen: a non-positive
/// radius is replaced by the semi-major axis, and a radicand or result that
/// is not a positive finite number yields `FALLBACK_SPEED_KMH`.
pub fn speed_from_vis_viva(radius_km: f64, semi_major_axis_km: f64) -> f64 {
    let radius = if radius_km > 0.0 {
        radius_km
    } else {
        semi_major_axis_km
    };
    let radicand = GM_KM3_S2 * (2.0 / radius - 1.0 / semi_major_axis_km);
    let speed_km_s = if radicand > 0.0 { radicand.sqrt() } else { 0.0 };

    if speed_km_s.is_finite() && speed_km_s > 0.0 {
        speed_km_s * SECONDS_PER_HOUR
    } else {
        FALLBACK_SPEED_KMH
    }
}

/// Two-body position and speed of the satellite at `timestamp`
pub fn eci_state(elements: &OrbitalElements, timestamp: DateTime<Utc>) -> EciState {
    let e = elements.eccentricity();
    let a = elements.semi_major_axis();

    let mean_anomaly = elements.mean_anomaly_at(timestamp);
    let eccentric_anomaly = solve_kepler(mean_anomaly, e).eccentric_anomaly;
    let nu = true_anomaly(eccentric_anomaly, e);

    let radius = a * (1.0 - e * eccentric_anomaly.cos());
    let speed_kmh = speed_from_vis_viva(radius, a);

    let u = normalize_angle(elements.arg_perigee() + nu);
    let (sin_u, cos_u) = u.sin_cos();
    let (sin_raan, cos_raan) = elements.raan().sin_cos();
    let (sin_i, cos_i) = elements.inclination().sin_cos();

    EciState {
        position_km: [
            radius * (cos_raan * cos_u - sin_raan * sin_u * cos_i),
            radius * (sin_raan * cos_u + cos_raan * sin_u * cos_i),
            radius * (sin_u * sin_i),
        ],
        speed_kmh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::tle::TleSet;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::Duration;

    fn iss() -> OrbitalElements {
        OrbitalElements::from_tle(&TleSet::fallback()).unwrap()
    }

    #[test]
    fn test_circular_orbit_solves_in_one_iteration() {
        for m in [0.0, 0.5, 2.0, 4.7, 6.2] {
            let solution = solve_kepler(m, 0.0);
            assert_eq!(solution.iterations, 1);
            assert_eq!(solution.eccentric_anomaly, m);
        }
    }

    #[test]
    fn test_solution_satisfies_kepler_equation() {
        for e in [0.0004116, 0.1, 0.5, 0.7] {
            for m in [0.1, 1.0, 3.0, 5.5] {
                let solution = solve_kepler(m, e);
                let ea = solution.eccentric_anomaly;
                assert_abs_diff_eq!(ea - e * ea.sin(), m, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_iterations_are_bounded() {
        let solution = solve_kepler(0.01, 0.999_999);
        assert!(solution.iterations <= 12);
        assert!(solution.eccentric_anomaly.is_finite());
    }

    #[test]
    fn test_normalize_angle_range() {
        assert_eq!(normalize_angle(-1e-17), 0.0);
        assert_relative_eq!(normalize_angle(-0.5), TAU - 0.5);
        assert_relative_eq!(normalize_angle(3.0 * TAU + 1.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_true_anomaly_circular_matches_eccentric() {
        assert_relative_eq!(true_anomaly(1.2, 0.0), 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_vis_viva_circular_speed() {
        // Circular at r = a gives sqrt(GM / a)
        let a = 6794.69;
        let expected = (GM_KM3_S2 / a).sqrt() * 3600.0;
        assert_relative_eq!(speed_from_vis_viva(a, a), expected, max_relative = 1e-12);
        assert_relative_eq!(expected, 27_571.0, epsilon = 10.0);
    }

    #[test]
    fn test_vis_viva_degenerate_uses_fallback() {
        // Radius beyond apoapsis of any bound orbit
        assert_eq!(speed_from_vis_viva(20_000.0, 7000.0), FALLBACK_SPEED_KMH);
        assert_eq!(speed_from_vis_viva(f64::NAN, 7000.0), FALLBACK_SPEED_KMH);
        // Non-positive radius falls back to the semi-major axis
        assert_relative_eq!(
            speed_from_vis_viva(0.0, 7000.0),
            speed_from_vis_viva(7000.0, 7000.0)
        );
    }

    #[test]
    fn test_radius_and_speed_for_iss() {
        let elements = iss();
        let state = eci_state(&elements, elements.epoch());
        let [x, y, z] = state.position_km;
        let r = (x * x + y * y + z * z).sqrt();
        let a = elements.semi_major_axis();
        let e = elements.eccentricity();
        assert!(r >= a * (1.0 - e) - 1e-6 && r <= a * (1.0 + e) + 1e-6);
        assert_relative_eq!(state.speed_kmh, 27_574.06, epsilon = 0.5);
    }

    #[test]
    fn test_z_bounded_by_inclination() {
        let elements = iss();
        let bound = elements.inclination().sin();
        for minutes in (0..95).step_by(5) {
            let state = eci_state(&elements, elements.epoch() + Duration::minutes(minutes));
            let [x, y, z] = state.position_km;
            let r = (x * x + y * y + z * z).sqrt();
            assert!(z.abs() / r <= bound + 1e-12);
        }
    }
}
