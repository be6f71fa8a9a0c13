// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use qb::{dist::spawn, Env};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(about = "Launch seeders for a shared job on every node")]
pub struct Command {
    #[arg(help = "Job to seed")]
    pub jobid: String,
    #[arg(help = "QPACK directory, defaults to the configured one")]
    pub qpack: Option<String>,
}

pub fn handle(command: Command, env: Env) -> Result<(), Error> {
    let job = spawn::spawn(&command.jobid, command.qpack.as_deref(), &env.rules, &env.config)?;

    println!("{job}");

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("spawn")]
    Spawn(#[from] spawn::Error),
}
