// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Distribution layer: bounded fan-out over external transports
//!
//! Share, spawn and kill all funnel through [`dispatch`], an in-process
//! worker pool spawning one subprocess per invocation with concurrency
//! bounded by the configured fanout.

use std::{fmt, io, process};

use futures_util::{stream, StreamExt};
use log::debug;
use thiserror::Error;
use tokio::runtime;

use crate::config::Config;

pub mod kill;
pub mod share;
pub mod spawn;

/// One subprocess invocation: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Run every invocation to completion, at most `fanout` at a time, and
/// surface the first non-zero exit observed.
pub(crate) fn dispatch(invocations: Vec<Invocation>, fanout: usize) -> Result<(), Error> {
    if invocations.is_empty() {
        return Ok(());
    }

    let runtime = runtime::Builder::new_current_thread().enable_all().build()?;

    let results = runtime.block_on(async {
        stream::iter(invocations)
            .map(|invocation| async move {
                debug!("dispatching {invocation}");
                let status = tokio::process::Command::new(&invocation.program)
                    .args(&invocation.args)
                    .status()
                    .await;
                (invocation, status)
            })
            .buffer_unordered(fanout.max(1))
            .collect::<Vec<_>>()
            .await
    });

    for (invocation, status) in results {
        let status = status?;
        if !status.success() {
            return Err(Error::Failed { invocation, status });
        }
    }

    Ok(())
}

/// Dispatch one remote-shell command per `(address, command)` order.
pub(crate) fn shell_orders(
    orders: impl IntoIterator<Item = (String, String)>,
    config: &Config,
) -> Result<(), Error> {
    dispatch(
        orders
            .into_iter()
            .map(|(address, command)| Invocation::new(&config.shell, [address, command]))
            .collect(),
        config.fanout,
    )
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport '{invocation}' failed: {status}")]
    Failed {
        invocation: Invocation,
        status: process::ExitStatus,
    },
    #[error("io")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dispatch_succeeds_on_clean_exits() {
        let invocations = (0..4).map(|_| Invocation::new("true", Vec::<String>::new())).collect();

        dispatch(invocations, 2).unwrap();
    }

    #[test]
    fn dispatch_surfaces_failures() {
        let invocations = vec![
            Invocation::new("true", Vec::<String>::new()),
            Invocation::new("false", Vec::<String>::new()),
        ];

        assert!(matches!(
            dispatch(invocations, 2),
            Err(Error::Failed { invocation, .. }) if invocation.program == "false"
        ));
    }

    #[test]
    fn dispatch_of_nothing_is_ok() {
        dispatch(vec![], 16).unwrap();
    }
}
