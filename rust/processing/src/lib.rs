// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HolePunch processing
//!
//! Asynchronous hole application on top of `holepunch-geometry`: a queue of
//! pending holes drained by one worker thread, with the resulting render
//! buffers published as immutable snapshots.

pub mod config;
pub mod error;
pub mod puncher;

pub use config::PuncherConfig;
pub use error::{Error, Result};
pub use puncher::{MeshSnapshot, Puncher, SnapshotStats};
