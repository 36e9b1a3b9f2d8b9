// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for hole processing
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Geometry error: {0}")]
    Geometry(#[from] holepunch_geometry::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn hole worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("Hole worker has stopped")]
    WorkerStopped,

    #[error("Hole application panicked: {0}")]
    HolePanicked(String),
}
