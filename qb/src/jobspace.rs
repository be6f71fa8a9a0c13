// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The shared append-only ledger of per-target start/finish punches
//!
//! A jobspace holds one subdirectory per job; inside each, one file per
//! worker containing that worker's punches. Workers only ever append to
//! their own file, so no locking is needed; readers tolerate torn lines by
//! skipping anything malformed.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process,
    time::{SystemTime, UNIX_EPOCH},
};

use fs_err as fs;
use thiserror::Error;

use crate::util;

pub const REMOTE_SCHEME: &str = "s3://";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_int(self) -> u8 {
        match self {
            Direction::In => 1,
            Direction::Out => 0,
        }
    }
}

/// A ledger rooted at a URL.
///
/// Local variant: the root is a plain directory. Remote variant: the root
/// is a cache mirror under the qspace, kept in step with the remote prefix
/// by an explicit bidirectional [`sync`](JobSpace::sync).
#[derive(Debug, Clone)]
pub struct JobSpace {
    kind: Kind,
    root: PathBuf,
    worker: String,
}

#[derive(Debug, Clone)]
enum Kind {
    Local,
    Remote { url: String },
}

impl JobSpace {
    /// Construct from a jobspace URL; an `s3://` scheme selects the
    /// remote-cached variant, anything else is a local directory.
    pub fn new(url: &str, worker: impl ToString, qspace: &Path) -> Self {
        let worker = worker.to_string();

        if url.starts_with(REMOTE_SCHEME) {
            Self {
                root: qspace.join(util::urlencode(url)),
                kind: Kind::Remote {
                    url: url.trim_end_matches('/').to_owned(),
                },
                worker,
            }
        } else {
            Self {
                root: PathBuf::from(url),
                kind: Kind::Local,
                worker,
            }
        }
    }

    pub fn worker(&self) -> &str {
        &self.worker
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Idempotently ensure the per-job area exists.
    pub fn subspace(&self, job: &str) -> Result<(), Error> {
        util::ensure_dir_exists(&self.root.join(job))?;
        Ok(())
    }

    /// Append one punch to this worker's file. A single `write_all` of a
    /// short line on an append-mode descriptor, so concurrent writers on
    /// the same filesystem do not interleave.
    pub fn punch(&self, job: &str, target: &str, direction: Direction) -> Result<(), Error> {
        let subdir = self.root.join(job);
        util::ensure_dir_exists(&subdir)?;

        let mut clock = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(subdir.join(util::urlencode(&self.worker)))?;

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        clock.write_all(format!("{stamp}\t{target}\t{}\n", direction.as_int()).as_bytes())?;

        Ok(())
    }

    /// Scan every worker file in the job subspace and tally the `in` and
    /// `out` punches observed for `target`. Malformed lines are skipped.
    pub fn count(&self, job: &str, target: &str) -> Result<(u64, u64), Error> {
        let subdir = self.root.join(job);
        util::ensure_dir_exists(&subdir)?;

        let (mut ins, mut outs) = (0, 0);

        for entry in fs::read_dir(&subdir)?.flatten() {
            if !entry.file_type()?.is_file() {
                continue;
            }
            let punches = fs::read_to_string(entry.path())?;

            for line in punches.lines() {
                let fields = line.split('\t').collect::<Vec<_>>();
                let &[_stamp, punched, direction] = fields.as_slice() else {
                    continue;
                };
                if punched != target {
                    continue;
                }
                match direction {
                    "1" => ins += 1,
                    "0" => outs += 1,
                    _ => {}
                }
            }
        }

        Ok((ins, outs))
    }

    /// Flush ledger state to the durable backing store. A no-op for the
    /// local variant; for the remote variant, pull then push the job
    /// subspace so counts reflect the remote state as of this sync.
    pub fn sync(&self, job: &str) -> Result<(), Error> {
        let Kind::Remote { url } = &self.kind else {
            return Ok(());
        };

        let local = self.root.join(job);
        util::ensure_dir_exists(&local)?;

        let local = local.to_string_lossy();
        let remote = format!("{url}/{job}");

        transfer(&remote, &local)?;
        transfer(&local, &remote)?;

        Ok(())
    }
}

fn transfer(from: &str, to: &str) -> Result<(), Error> {
    let status = process::Command::new("aws")
        .args(["s3", "sync", from, to])
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::Sync(status))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),
    #[error("ledger sync failed: {0}")]
    Sync(process::ExitStatus),
}

#[cfg(test)]
mod test {
    use super::*;

    fn local(dir: &Path, worker: &str) -> JobSpace {
        JobSpace::new(&dir.to_string_lossy(), worker, Path::new(".qspace"))
    }

    #[test]
    fn punch_then_count() {
        let dir = tempfile::tempdir().unwrap();
        let space = local(dir.path(), "host:1");

        space.punch("job", "a", Direction::In).unwrap();
        assert_eq!(space.count("job", "a").unwrap(), (1, 0));

        space.punch("job", "a", Direction::Out).unwrap();
        assert_eq!(space.count("job", "a").unwrap(), (1, 1));
        assert_eq!(space.count("job", "b").unwrap(), (0, 0));
    }

    #[test]
    fn counts_aggregate_across_workers() {
        let dir = tempfile::tempdir().unwrap();
        let one = local(dir.path(), "host:1");
        let two = local(dir.path(), "host:2");

        one.punch("job", "a", Direction::In).unwrap();
        two.punch("job", "a", Direction::In).unwrap();
        two.punch("job", "a", Direction::Out).unwrap();

        assert_eq!(one.count("job", "a").unwrap(), (2, 1));
    }

    #[test]
    fn worker_file_is_urlencoded() {
        let dir = tempfile::tempdir().unwrap();
        let space = local(dir.path(), "host:1");

        space.punch("job", "a", Direction::In).unwrap();

        assert!(dir.path().join("job").join("host%3A1").exists());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let space = local(dir.path(), "w");

        space.punch("job", "a", Direction::In).unwrap();
        fs::write(
            dir.path().join("job").join("other"),
            "torn\n123.0\ta\t1\n123.0\ta\t7\n",
        )
        .unwrap();

        assert_eq!(space.count("job", "a").unwrap(), (2, 0));
    }

    #[test]
    fn missing_subspace_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let space = local(dir.path(), "w");

        assert_eq!(space.count("job", "a").unwrap(), (0, 0));
        assert!(dir.path().join("job").exists());
    }

    #[test]
    fn local_sync_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let space = local(dir.path(), "w");

        space.subspace("job").unwrap();
        space.sync("job").unwrap();
    }

    #[test]
    fn remote_url_selects_cache_mirror() {
        let space = JobSpace::new("s3://bucket/ledgers", "w", Path::new(".qspace"));

        assert_eq!(
            space.root(),
            Path::new(".qspace").join("s3%3A%2F%2Fbucket%2Fledgers")
        );
    }
}
