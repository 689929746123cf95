use serde::Serialize;

/// Satellite position over the reference ellipsoid at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
    pub speed_kmh: f64,
}

/// Earth-centred inertial state produced by the Keplerian calculator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EciState {
    pub position_km: [f64; 3],
    pub speed_kmh: f64,
}

/// A point in visualisation space, Earth centred at the origin with +y north
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ScenePoint {
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenePosition {
    pub geodetic: GeodeticPosition,
    pub point: ScenePoint,
}
