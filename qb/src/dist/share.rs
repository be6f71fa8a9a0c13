// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use crate::config::Config;
use crate::job::Job;
use crate::jobspace;

use super::{dispatch, Invocation};

/// Copy the QPACK to every configured node's job directory in parallel.
/// Returns the job-id the copies were filed under.
pub fn share(qpack: Option<&str>, config: &Config) -> Result<String, Error> {
    let job = Job::create(config.jobspace(), config.parent.clone())?;

    dispatch(copies(qpack, job.id(), config), config.fanout)?;

    Ok(job.id().to_owned())
}

fn copies(qpack: Option<&str>, job_id: &str, config: &Config) -> Vec<Invocation> {
    // Trailing slash: ship the contents, not the directory
    let source = format!("{}/", qpack.unwrap_or(&config.qpack));
    let jobdir = config.jobdir(job_id);

    config
        .nodes
        .iter()
        .map(|node| {
            Invocation::new(
                &config.copy,
                [
                    "-az".to_owned(),
                    source.clone(),
                    format!("{}:{}", node.address, jobdir.display()),
                ],
            )
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("jobspace")]
    JobSpace(#[from] jobspace::Error),
    #[error("copy")]
    Transport(#[from] super::Error),
}
