// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use qb::{graph, qubit, rule, Env};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(about = "Print the qubits for the targets")]
pub struct Command {
    #[arg(help = "Targets to resolve, defaults to 'default'")]
    pub targets: Vec<String>,
}

pub fn handle(command: Command, env: Env) -> Result<(), Error> {
    let map = graph::resolve(&command.targets, &env.rules)?;

    print!("{}", qubit::dump(map.iter()));

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("resolve")]
    Rule(#[from] rule::Error),
}
