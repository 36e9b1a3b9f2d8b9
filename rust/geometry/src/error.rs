// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during hole punching
#[derive(Error, Debug)]
pub enum Error {
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Boolean operation failed: {0}")]
    BooleanError(String),

    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Mesh transform has non-uniform scale ({x}, {y}, {z})")]
    NonUniformScale { x: f64, y: f64, z: f64 },
}
