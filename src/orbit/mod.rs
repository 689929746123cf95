mod elements;
mod error;
mod frames;
mod kepler;
mod propagator;
mod tle;
mod track;
mod types;

pub use elements::{OrbitalElements, GM_KM3_S2};
pub use error::OrbitError;
pub use frames::{
    ecef_to_geodetic, eci_to_ecef, eci_to_geodetic, geodetic_to_ecef, gmst, julian_date,
    normalize_longitude, Geodetic,
};
pub use kepler::{eci_state, solve_kepler, speed_from_vis_viva, KeplerSolution, FALLBACK_SPEED_KMH};
pub use propagator::{build_propagator, Propagator, PropagatorKind, Sgp4Propagator};
pub use tle::{line_checksum, load_catalog_file, parse_catalog, CatalogEntry, ElementFields, TleSet};
pub use track::{
    build_future_track, build_ground_track, SceneScale, TrackSampler, EARTH_RADIUS_KM,
    EARTH_RADIUS_SCENE,
};
pub use types::{EciState, GeodeticPosition, ScenePoint, ScenePosition};
