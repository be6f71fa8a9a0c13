// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use uuid::Uuid;

use crate::jobspace::{self, Direction, JobSpace};
use crate::qubit::Qubit;

/// A handle on one job's subspace inside a jobspace.
pub struct Job {
    id: String,
    space: JobSpace,
}

impl Job {
    /// Enter a job: mint a fresh 128-bit hex id unless inheriting one,
    /// then ensure the per-job area exists.
    pub fn create(space: JobSpace, id: Option<String>) -> Result<Self, jobspace::Error> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        space.subspace(&id)?;

        Ok(Self { id, space })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sync(&self) -> Result<(), jobspace::Error> {
        self.space.sync(&self.id)
    }

    pub fn punch(&self, target: &str, direction: Direction) -> Result<(), jobspace::Error> {
        self.space.punch(&self.id, target, direction)
    }

    pub fn counts(&self, target: &str) -> Result<(u64, u64), jobspace::Error> {
        self.space.count(&self.id, target)
    }

    /// Classify a qubit from ledger counts: complete once any worker has
    /// punched out; ready once every dependency is complete.
    pub fn status(&self, qubit: &Qubit) -> Result<(Status, (u64, u64)), jobspace::Error> {
        let (ins, outs) = self.counts(&qubit.target)?;
        if outs > 0 {
            return Ok((Status::UpToDate, (ins, outs)));
        }

        for dep in &qubit.deps {
            if self.counts(dep)?.1 == 0 {
                return Ok((Status::Waiting, (ins, outs)));
            }
        }

        Ok((Status::Ready, (ins, outs)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    UpToDate,
    Ready,
    Waiting,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::UpToDate => "up-to-date",
            Status::Ready => "ready",
            Status::Waiting => "waiting",
        })
    }
}
