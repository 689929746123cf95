use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::orbit::error::OrbitError;
use crate::orbit::propagator::Propagator;
use crate::orbit::types::{GeodeticPosition, ScenePoint, ScenePosition};

/// Mean Earth radius used to scale altitude into the scene
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Radius of the rendered globe in scene units
pub const EARTH_RADIUS_SCENE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SceneScale {
    #[serde(default = "default_earth_radius")]
    pub earth_radius: f64,
}

fn default_earth_radius() -> f64 {
    EARTH_RADIUS_SCENE
}

impl Default for SceneScale {
    fn default() -> Self {
        Self {
            earth_radius: EARTH_RADIUS_SCENE,
        }
    }
}

impl SceneScale {
    pub fn radius_for_altitude(&self, altitude_km: f64) -> f64 {
        self.earth_radius + altitude_km * (self.earth_radius / EARTH_RADIUS_KM)
    }

    pub fn project(&self, position: &GeodeticPosition) -> ScenePoint {
        let radius = self.radius_for_altitude(position.altitude_km);
        let (sin_lat, cos_lat) = position.latitude_deg.to_radians().sin_cos();
        let (sin_lon, cos_lon) = position.longitude_deg.to_radians().sin_cos();
        ScenePoint {
            x: radius * cos_lat * sin_lon,
            y: radius * sin_lat,
            z: radius * cos_lat * cos_lon,
        }
    }
}

/// Samples a propagator at fixed steps and projects into scene space.
///
/// Each sample is independent, so a failed one is logged and left out of the
/// track rather than aborting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackSampler {
    pub scale: SceneScale,
}

impl TrackSampler {
    pub fn new(scale: SceneScale) -> Self {
        Self { scale }
    }

    pub fn scene_position_at<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        timestamp: DateTime<Utc>,
    ) -> Result<ScenePosition, OrbitError> {
        let geodetic = propagator.position_at(timestamp)?;
        Ok(ScenePosition {
            geodetic,
            point: self.scale.project(&geodetic),
        })
    }

    /// `points` samples ending at `center`, oldest first
    pub fn ground_track<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        center: DateTime<Utc>,
        points: usize,
        step: Duration,
    ) -> Vec<ScenePoint> {
        if step <= Duration::zero() {
            log::warn!("Ground track step must be positive, got {}", step);
            return Vec::new();
        }

        let timestamps = (0..points as u128).rev().map(|i| {
            step_offset(step, i).and_then(|offset| center.checked_sub_signed(offset))
        });
        self.sample(propagator, timestamps)
    }

    /// Samples after `center` covering `duration`, excluding `center` itself
    pub fn future_track<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        center: DateTime<Utc>,
        duration: Duration,
        step: Duration,
    ) -> Vec<ScenePoint> {
        if step <= Duration::zero() {
            log::warn!("Future track step must be positive, got {}", step);
            return Vec::new();
        }

        let steps = (total_nanos(duration) / total_nanos(step)).max(0) as u128;
        let timestamps = (1..=steps).map_while(|i| {
            let timestamp =
                step_offset(step, i).and_then(|offset| center.checked_add_signed(offset));
            if timestamp.is_none() {
                log::warn!("Future track truncated after {} samples: time out of range", i - 1);
            }
            timestamp.map(Some)
        });
        self.sample(propagator, timestamps)
    }

    // `None` entries are instants outside the representable range
    fn sample<P, I>(&self, propagator: &P, timestamps: I) -> Vec<ScenePoint>
    where
        P: Propagator + ?Sized,
        I: Iterator<Item = Option<DateTime<Utc>>>,
    {
        let mut points = Vec::new();
        let mut out_of_range = 0usize;

        for timestamp in timestamps {
            let Some(timestamp) = timestamp else {
                out_of_range += 1;
                continue;
            };
            match self.scene_position_at(propagator, timestamp) {
                Ok(position) => points.push(position.point),
                Err(e) => {
                    log::warn!("Skipping track sample at {}: {}", timestamp, e);
                }
            }
        }

        if out_of_range > 0 {
            log::warn!("Skipped {} track samples with out-of-range time", out_of_range);
        }
        points
    }
}

const NANOS_PER_SECOND: i128 = 1_000_000_000;

fn total_nanos(duration: Duration) -> i128 {
    duration.num_seconds() as i128 * NANOS_PER_SECOND + duration.subsec_nanos() as i128
}

/// `step * i`, or `None` when it overflows a `Duration`
fn step_offset(step: Duration, i: u128) -> Option<Duration> {
    let i = i128::try_from(i).ok()?;
    let nanos = total_nanos(step).checked_mul(i)?;
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok()?;
    Duration::new(secs, nanos.rem_euclid(NANOS_PER_SECOND) as u32)
}

pub fn build_ground_track<P: Propagator + ?Sized>(
    propagator: &P,
    center: DateTime<Utc>,
    points: usize,
    step: Duration,
) -> Vec<ScenePoint> {
    TrackSampler::default().ground_track(propagator, center, points, step)
}

pub fn build_future_track<P: Propagator + ?Sized>(
    propagator: &P,
    center: DateTime<Utc>,
    duration: Duration,
    step: Duration,
) -> Vec<ScenePoint> {
    TrackSampler::default().future_track(propagator, center, duration, step)
}
