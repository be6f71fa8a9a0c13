// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use clap::Parser;
use qb::{pack, Env};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(about = "Create the QPACK for the targets")]
pub struct Command {
    #[arg(help = "Targets to pack, defaults to 'default'")]
    pub targets: Vec<String>,
}

pub fn handle(command: Command, env: Env) -> Result<(), Error> {
    let qpack = pack::snapshot(Path::new("."), &command.targets, &env.rules, &env.config)?;

    println!("{}", qpack.display());

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("pack")]
    Pack(#[from] pack::Error),
}
