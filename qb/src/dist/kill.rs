// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use crate::config::Config;

use super::{shell_orders, Error};

/// Signal matching seeder processes on every configured node.
///
/// `pkill` exits non-zero when nothing matched, which is not a failure
/// here, hence the `|| true`.
pub fn kill(jobish: Option<&str>, signal: Option<&str>, config: &Config) -> Result<(), Error> {
    let order = command(jobish, signal);

    shell_orders(
        config
            .nodes
            .iter()
            .map(|node| (node.address.clone(), order.clone()))
            .collect::<Vec<_>>(),
        config,
    )
}

fn command(jobish: Option<&str>, signal: Option<&str>) -> String {
    let filter = jobish.map(|job| format!(" -j {job}")).unwrap_or_default();

    format!(
        "pkill -{} -f \"qb seed{filter}\" || true",
        signal.unwrap_or("KILL")
    )
}
