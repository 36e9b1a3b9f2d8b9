// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment configuration. Kept to a single test in its own binary: it
//! mutates process-wide variables.

use holepunch_processing::PuncherConfig;

#[test]
fn test_from_env() {
    std::env::set_var("HOLEPUNCH_LEAF_CAPACITY", "120");
    std::env::set_var("HOLEPUNCH_ATOMIC_VOLUME", "not a number");
    let config = PuncherConfig::from_env();
    std::env::remove_var("HOLEPUNCH_LEAF_CAPACITY");
    std::env::remove_var("HOLEPUNCH_ATOMIC_VOLUME");

    assert_eq!(config.leaf_capacity, 120);
    assert_eq!(config.atomic_volume, PuncherConfig::default().atomic_volume);
    assert_eq!(PuncherConfig::from_env(), PuncherConfig::default());
}
