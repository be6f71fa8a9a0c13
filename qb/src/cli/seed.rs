// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use qb::{engine, Env};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(about = "Make the targets from the qubits manifest, then help finish it")]
pub struct Command {
    #[arg(help = "Assigned targets to make first")]
    pub targets: Vec<String>,
}

pub fn handle(command: Command, env: Env) -> Result<(), Error> {
    let job = engine::seed(&command.targets, &env.rules, &env.config)?;

    println!("{job}");

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("engine")]
    Engine(#[from] engine::Error),
}
