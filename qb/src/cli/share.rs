// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;
use qb::{dist::share, Env};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(about = "Copy the QPACK to all nodes")]
pub struct Command {
    #[arg(help = "QPACK directory, defaults to the configured one")]
    pub qpack: Option<String>,
}

pub fn handle(command: Command, env: Env) -> Result<(), Error> {
    let job = share::share(command.qpack.as_deref(), &env.config)?;

    println!("{job}");

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("share")]
    Share(#[from] share::Error),
}
