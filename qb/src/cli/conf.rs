// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use qb::Env;

#[derive(Debug, Parser)]
#[command(about = "Print the effective configuration")]
pub struct Command {}

pub fn handle(_command: Command, env: Env) {
    for (key, value) in env.config.render() {
        println!("{key:>12}: {value}");
    }
}
