use chrono::{DateTime, Utc};
use serde::Deserialize;
use sgp4::{Constants, Elements};

use crate::orbit::elements::OrbitalElements;
use crate::orbit::error::OrbitError;
use crate::orbit::frames::{eci_to_ecef, eci_to_geodetic, ecef_to_geodetic, Geodetic};
use crate::orbit::kepler::eci_state;
use crate::orbit::tle::TleSet;
use crate::orbit::types::GeodeticPosition;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Maps an instant to the satellite's geodetic position and speed.
///
/// Implementations hold only immutable state and can be shared between
/// threads.
pub trait Propagator: Send + Sync {
    fn position_at(&self, timestamp: DateTime<Utc>) -> Result<GeodeticPosition, OrbitError>;

    fn epoch(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PropagatorKind {
    /// Two-body Keplerian model
    #[default]
    Kepler,
    /// SGP4 perturbation model
    Sgp4,
}

fn to_position(geodetic: Geodetic, speed_kmh: f64) -> GeodeticPosition {
    GeodeticPosition {
        latitude_deg: geodetic.latitude.to_degrees(),
        longitude_deg: geodetic.longitude.to_degrees(),
        altitude_km: geodetic.altitude_km,
        speed_kmh,
    }
}

impl OrbitalElements {
    /// Keplerian position query; total for any constructed record
    pub fn geodetic_at(&self, timestamp: DateTime<Utc>) -> GeodeticPosition {
        let state = eci_state(self, timestamp);
        to_position(eci_to_geodetic(state.position_km, timestamp), state.speed_kmh)
    }
}

impl Propagator for OrbitalElements {
    fn position_at(&self, timestamp: DateTime<Utc>) -> Result<GeodeticPosition, OrbitError> {
        Ok(self.geodetic_at(timestamp))
    }

    fn epoch(&self) -> DateTime<Utc> {
        OrbitalElements::epoch(self)
    }
}

pub struct Sgp4Propagator {
    elements: Elements,
    constants: Constants,
}

impl Sgp4Propagator {
    /// Parsing is delegated to sgp4, which is stricter about line layout and
    /// checksums than `TleSet::fields`
    pub fn from_tle(tle: &TleSet) -> Result<Self, OrbitError> {
        if !tle.checksums_valid() {
            return Err(OrbitError::malformed(
                "checksum",
                "line checksum mismatch, the SGP4 model requires intact element sets",
            ));
        }
        let elements = Elements::from_tle(None, tle.line1().as_bytes(), tle.line2().as_bytes())
            .map_err(|e| OrbitError::malformed("sgp4", e.to_string()))?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| OrbitError::InvalidOrbit(e.to_string()))?;

        Ok(Self {
            elements,
            constants,
        })
    }

    /// TEME position (km) and velocity (km/s)
    pub fn teme_state(&self, timestamp: DateTime<Utc>) -> Result<([f64; 3], [f64; 3]), OrbitError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| OrbitError::Propagation(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| OrbitError::Propagation(e.to_string()))?;

        Ok((prediction.position, prediction.velocity))
    }
}

impl Propagator for Sgp4Propagator {
    fn position_at(&self, timestamp: DateTime<Utc>) -> Result<GeodeticPosition, OrbitError> {
        let (position, velocity) = self.teme_state(timestamp)?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(
            &timestamp.naive_utc(),
        ));
        let geodetic = ecef_to_geodetic(eci_to_ecef(position, sidereal));

        let speed_km_s =
            (velocity[0] * velocity[0] + velocity[1] * velocity[1] + velocity[2] * velocity[2])
                .sqrt();

        Ok(to_position(geodetic, speed_km_s * SECONDS_PER_HOUR))
    }

    fn epoch(&self) -> DateTime<Utc> {
        self.elements.datetime.and_utc()
    }
}

pub fn build_propagator(
    kind: PropagatorKind,
    tle: &TleSet,
) -> Result<Box<dyn Propagator>, OrbitError> {
    match kind {
        PropagatorKind::Kepler => Ok(Box::new(OrbitalElements::from_tle(tle)?)),
        PropagatorKind::Sgp4 => Ok(Box::new(Sgp4Propagator::from_tle(tle)?)),
    }
}
