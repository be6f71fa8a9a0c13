// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use clap::Parser;
use qb::{
    dist::{share, spawn},
    pack, Env,
};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(about = "Pack the targets, share the QPACK, spawn seeders")]
pub struct Command {
    #[arg(help = "Targets to run, defaults to 'default'")]
    pub targets: Vec<String>,
}

pub fn handle(command: Command, env: Env) -> Result<(), Error> {
    let qpack = pack::snapshot(Path::new("."), &command.targets, &env.rules, &env.config)?;
    let qpack = qpack.to_string_lossy();

    let job = share::share(Some(&qpack), &env.config)?;
    let job = spawn::spawn(&job, Some(&qpack), &env.rules, &env.config)?;

    println!("{job}");

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("pack")]
    Pack(#[from] pack::Error),
    #[error("share")]
    Share(#[from] share::Error),
    #[error("spawn")]
    Spawn(#[from] spawn::Error),
}
