// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The cooperative execution loop
//!
//! Every worker runs the same loop against the same ledger. A worker
//! claims a ready target by appending its own `in` punch; workers seeing
//! an existing claim defer until the claimer punches out, or until the
//! claim looks abandoned (`stalled` consecutive idle cycles), at which
//! point re-execution is permitted. Collisions inside a single cycle are
//! tolerated; recipes are assumed idempotent.

use std::{collections::HashSet, io, thread, time::Duration};

use fs_err as fs;
use log::{debug, error};
use thiserror::Error;

use crate::config::Config;
use crate::graph;
use crate::job::{Job, Status};
use crate::jobspace::{self, Direction};
use crate::qubit::{self, Qubit};
use crate::rule::{self, RuleTable};

/// Drive `queue` to completion against `job`.
///
/// Terminates when every queued target has been observed complete.
pub fn drive(queue: &[&Qubit], job: &Job, interval: u64, stalled: u64) -> Result<(), Error> {
    let mut targets = queue.iter().map(|q| q.target.as_str()).collect::<HashSet<_>>();
    let mut idle: u64 = 0;

    while !targets.is_empty() {
        let mut busy = false;

        if idle > 0 {
            thread::sleep(Duration::from_secs(interval));
        }
        job.sync()?;

        for qubit in queue {
            if !targets.contains(qubit.target.as_str()) {
                continue;
            }

            let (status, (ins, outs)) = job.status(qubit)?;
            debug!("{status:>12} ({ins}, {outs}): {}", qubit.target);

            match status {
                Status::UpToDate => {
                    targets.remove(qubit.target.as_str());
                }
                Status::Waiting => {}
                Status::Ready => {
                    // Unclaimed, or the claim has gone stale
                    if ins == 0 || idle > stalled {
                        job.punch(&qubit.target, Direction::In)?;
                        if let Err(e) = qubit.invoke() {
                            error!("recipe {} failed for {}: {e}", qubit.recipe.name(), qubit.target);
                        }
                        job.punch(&qubit.target, Direction::Out)?;
                        busy = true;
                    }
                }
            }
        }

        idle = if busy { 0 } else { idle + 1 };
    }

    Ok(())
}

/// Resolve targets from the rule table and drive them to completion.
pub fn make<S: AsRef<str>>(targets: &[S], rules: &RuleTable, config: &Config) -> Result<String, Error> {
    let map = graph::resolve(targets, rules)?;
    let job = Job::create(config.jobspace(), config.parent.clone())?;

    drive(&map.iter().collect::<Vec<_>>(), &job, config.interval, config.stalled)?;

    Ok(job.id().to_owned())
}

/// Drive a node's share of a distributed job from the qubits manifest.
///
/// The queue starts with the requested targets, then takes every other
/// manifest qubit, so a worker that finishes its own assignment
/// opportunistically picks up whatever else is ready.
pub fn seed<S: AsRef<str>>(targets: &[S], rules: &RuleTable, config: &Config) -> Result<String, Error> {
    let manifest = fs::read_to_string(&config.qubits)?;
    let map = qubit::parse(&manifest, rules)?;

    let mut queue = Vec::with_capacity(map.len());
    for target in targets {
        let target = target.as_ref();
        queue.push(map.get(target).ok_or_else(|| Error::MissingTarget(target.to_owned()))?);
    }
    queue.extend(
        map.iter()
            .filter(|qubit| !targets.iter().any(|t| t.as_ref() == qubit.target)),
    );

    let job = Job::create(config.jobspace(), config.parent.clone())?;

    drive(&queue, &job, config.interval, config.stalled)?;

    Ok(job.id().to_owned())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("resolve")]
    Rule(#[from] rule::Error),
    #[error("manifest")]
    Qubit(#[from] qubit::Error),
    #[error("jobspace")]
    JobSpace(#[from] jobspace::Error),
    #[error("target '{0}' not in manifest")]
    MissingTarget(String),
    #[error("io")]
    Io(#[from] io::Error),
}
