// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{io, path::Path};

use fs_err as fs;
use thiserror::Error;

use crate::config::Config;
use crate::rule::{self, RuleTable};

/// Everything a subcommand needs: the effective configuration and the
/// rule table loaded from the Qfile.
pub struct Env {
    pub config: Config,
    pub rules: RuleTable,
}

impl Env {
    pub fn new(
        qfile: &Path,
        profile: Option<String>,
        parent: Option<String>,
        verbose: bool,
    ) -> Result<Self, Error> {
        let qfile = qfile::from_slice(&fs::read(qfile)?)?;

        Ok(Self {
            rules: RuleTable::from_qfile(&qfile)?,
            config: Config::new(&qfile, profile, parent, verbose),
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("read Qfile")]
    Io(#[from] io::Error),
    #[error("parse Qfile")]
    Qfile(#[from] serde_yaml::Error),
    #[error("register rules")]
    Rule(#[from] rule::Error),
}
