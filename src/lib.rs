//! Orbit propagation for an ISS tracker.
//!
//! Two-line element sets are parsed into immutable [`orbit::OrbitalElements`],
//! propagated with a two-body Keplerian model (or SGP4) and converted to
//! geodetic positions and scene-space ground tracks.

pub mod config;
pub mod orbit;
pub mod refresh;
