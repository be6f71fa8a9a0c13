// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use qb::{dist, dist::kill, Env};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(about = "Signal seeder processes on every node")]
pub struct Command {
    #[arg(help = "Only seeders of this job")]
    pub jobish: Option<String>,
    #[arg(help = "Signal to send, defaults to KILL")]
    pub signal: Option<String>,
}

pub fn handle(command: Command, env: Env) -> Result<(), Error> {
    kill::kill(command.jobish.as_deref(), command.signal.as_deref(), &env.config)?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("kill")]
    Kill(#[from] dist::Error),
}
