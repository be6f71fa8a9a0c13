// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0
use std::{io, path::PathBuf};

use clap::{Args, CommandFactory, Parser};
use qb::env::{self, Env};
use thiserror::Error;

mod conf;
mod kill;
mod logging;
mod make;
mod pack;
mod qubits;
mod run;
mod seed;
mod share;
mod spawn;

#[derive(Debug, Parser)]
#[command(name = "qb", about = "Make qubits across a cluster of nodes")]
pub struct Command {
    #[command(flatten)]
    pub global: Global,
    #[command(subcommand)]
    pub subcommand: Option<Subcommand>,
}

#[derive(Debug, Args)]
pub struct Global {
    #[arg(
        short = 'f',
        long = "Qfile",
        help = "The path of the Qfile",
        default_value = "Qfile",
        global = true
    )]
    pub qfile: PathBuf,
    #[arg(short = 'j', long = "parent", help = "The parent job", global = true)]
    pub parent: Option<String>,
    #[arg(short = 'p', long = "profile", help = "The profile of the config", global = true)]
    pub profile: Option<String>,
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose output",
        default_value = "false",
        global = true
    )]
    pub verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Conf(conf::Command),
    Qubits(qubits::Command),
    Make(make::Command),
    Pack(pack::Command),
    Seed(seed::Command),
    Spawn(spawn::Command),
    Share(share::Command),
    Kill(kill::Command),
    Run(run::Command),
}

pub fn process() -> Result<(), Error> {
    let Command { global, subcommand } = Command::parse();

    logging::init(global.verbose);

    let Some(subcommand) = subcommand else {
        Command::command().print_help()?;
        return Ok(());
    };

    // `run` distributes by default
    let profile = global
        .profile
        .or_else(|| matches!(subcommand, Subcommand::Run(_)).then(|| "dist".to_owned()));

    let env = Env::new(&global.qfile, profile, global.parent, global.verbose)?;

    match subcommand {
        Subcommand::Conf(command) => conf::handle(command, env),
        Subcommand::Qubits(command) => qubits::handle(command, env)?,
        Subcommand::Make(command) => make::handle(command, env)?,
        Subcommand::Pack(command) => pack::handle(command, env)?,
        Subcommand::Seed(command) => seed::handle(command, env)?,
        Subcommand::Spawn(command) => spawn::handle(command, env)?,
        Subcommand::Share(command) => share::handle(command, env)?,
        Subcommand::Kill(command) => kill::handle(command, env)?,
        Subcommand::Run(command) => run::handle(command, env)?,
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("env")]
    Env(#[from] env::Error),
    #[error("qubits")]
    Qubits(#[from] qubits::Error),
    #[error("make")]
    Make(#[from] make::Error),
    #[error("pack")]
    Pack(#[from] pack::Error),
    #[error("seed")]
    Seed(#[from] seed::Error),
    #[error("spawn")]
    Spawn(#[from] spawn::Error),
    #[error("share")]
    Share(#[from] share::Error),
    #[error("kill")]
    Kill(#[from] kill::Error),
    #[error("run")]
    Run(#[from] run::Error),
    #[error("io error")]
    Io(#[from] io::Error),
}
