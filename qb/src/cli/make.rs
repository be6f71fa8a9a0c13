// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use qb::{engine, Env};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(about = "Make the targets from the Qfile")]
pub struct Command {
    #[arg(help = "Targets to make, defaults to 'default'")]
    pub targets: Vec<String>,
}

pub fn handle(command: Command, env: Env) -> Result<(), Error> {
    engine::make(&command.targets, &env.rules, &env.config)?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("engine")]
    Engine(#[from] engine::Error),
}
