use std::f64::consts::{PI, TAU};

use chrono::{DateTime, Duration, Utc};

use crate::orbit::error::OrbitError;
use crate::orbit::kepler::normalize_angle;
use crate::orbit::tle::{ElementFields, TleSet};

/// Earth's gravitational parameter, km^3 / s^2
pub const GM_KM3_S2: f64 = 398_600.4418;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Mean orbital elements referenced to an epoch.
///
/// Built once per element set and never mutated; a new TLE produces a new
/// record. The angular rate and semi-major axis are derived together here so
/// they always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElements {
    norad_id: u32,
    inclination: f64,
    raan: f64,
    eccentricity: f64,
    arg_perigee: f64,
    mean_anomaly: f64,
    mean_motion: f64,
    mean_motion_rad: f64,
    semi_major_axis: f64,
    epoch: DateTime<Utc>,
}

impl OrbitalElements {
    pub fn from_tle(tle: &TleSet) -> Result<Self, OrbitError> {
        Self::from_fields(&tle.fields()?)
    }

    pub fn from_fields(fields: &ElementFields) -> Result<Self, OrbitError> {
        let e = fields.eccentricity;
        if !(0.0..1.0).contains(&e) {
            return Err(OrbitError::InvalidOrbit(format!(
                "eccentricity {e} is not a bound ellipse"
            )));
        }
        let angles = [
            fields.raan_deg,
            fields.arg_perigee_deg,
            fields.mean_anomaly_deg,
        ];
        if angles.iter().any(|a| !a.is_finite()) {
            return Err(OrbitError::InvalidOrbit(
                "angular elements must be finite".to_string(),
            ));
        }
        if !(0.0..=180.0).contains(&fields.inclination_deg) {
            return Err(OrbitError::InvalidOrbit(format!(
                "inclination {} deg outside [0, 180]",
                fields.inclination_deg
            )));
        }
        if !(fields.mean_motion_rev_day.is_finite() && fields.mean_motion_rev_day > 0.0) {
            return Err(OrbitError::InvalidOrbit(format!(
                "mean motion {} rev/day must be positive",
                fields.mean_motion_rev_day
            )));
        }

        let mean_motion_rad = fields.mean_motion_rev_day * TAU / SECONDS_PER_DAY;
        let semi_major_axis = (GM_KM3_S2 / (mean_motion_rad * mean_motion_rad)).cbrt();
        if !(semi_major_axis.is_finite() && semi_major_axis > 0.0) {
            return Err(OrbitError::InvalidOrbit(format!(
                "degenerate semi-major axis {semi_major_axis} km"
            )));
        }

        Ok(Self {
            norad_id: fields.norad_id,
            inclination: fields.inclination_deg.to_radians(),
            raan: normalize_angle(fields.raan_deg.to_radians()),
            eccentricity: e,
            arg_perigee: fields.arg_perigee_deg.to_radians(),
            mean_anomaly: fields.mean_anomaly_deg.to_radians(),
            mean_motion: fields.mean_motion_rev_day,
            mean_motion_rad,
            semi_major_axis,
            epoch: fields.epoch,
        })
    }

    pub fn norad_id(&self) -> u32 {
        self.norad_id
    }

    pub fn inclination(&self) -> f64 {
        self.inclination
    }

    pub fn raan(&self) -> f64 {
        self.raan
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn arg_perigee(&self) -> f64 {
        self.arg_perigee
    }

    /// Mean anomaly at epoch, radians
    pub fn mean_anomaly(&self) -> f64 {
        self.mean_anomaly
    }

    /// Revolutions per day as published
    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    /// Radians per second
    pub fn mean_motion_rad(&self) -> f64 {
        self.mean_motion_rad
    }

    /// Kilometres
    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn period_seconds(&self) -> f64 {
        TAU / self.mean_motion_rad
    }

    pub fn orbital_period(&self) -> Duration {
        Duration::milliseconds((self.period_seconds() * 1000.0).round() as i64)
    }

    pub fn seconds_since_epoch(&self, timestamp: DateTime<Utc>) -> f64 {
        (timestamp - self.epoch).num_milliseconds() as f64 / 1000.0
    }

    /// Mean anomaly propagated to `timestamp`, in [0, 2π)
    pub fn mean_anomaly_at(&self, timestamp: DateTime<Utc>) -> f64 {
        normalize_angle(self.mean_anomaly + self.mean_motion_rad * self.seconds_since_epoch(timestamp))
    }

    /// Highest geocentric latitude the ground track can reach, degrees
    pub fn latitude_bound_deg(&self) -> f64 {
        let inc = self.inclination.to_degrees();
        if self.inclination > PI / 2.0 {
            180.0 - inc
        } else {
            inc
        }
    }
}
