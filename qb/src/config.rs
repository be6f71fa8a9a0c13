// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Immutable configuration snapshot
//!
//! Built once per invocation: built-in defaults, then the Qfile `config`
//! section, then the selected profile, then command-line flags. The only
//! lazy key is `worker`, computed on first read unless configured.

use std::{
    path::PathBuf,
    process,
    sync::OnceLock,
};

use qfile::{Node, Settings};

use crate::jobspace::JobSpace;
use crate::util;

#[derive(Debug, Clone)]
pub struct Config {
    pub parent: Option<String>,
    pub profile: Option<String>,
    pub verbose: bool,
    pub qpack: String,
    pub qubits: String,
    pub qspace: PathBuf,
    pub jobspace: Option<String>,
    pub interval: u64,
    pub stalled: u64,
    pub jobroot: PathBuf,
    pub jobprefix: String,
    pub nodes: Vec<Node>,
    pub spawnlog: String,
    pub ignore: Vec<String>,
    pub fanout: usize,
    pub shell: String,
    pub copy: String,
    pub(crate) worker: Worker,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Worker(OnceLock<String>);

impl Default for Config {
    fn default() -> Self {
        Self {
            parent: None,
            profile: None,
            verbose: false,
            qpack: ".qpack".into(),
            qubits: ".qubits".into(),
            qspace: ".qspace".into(),
            jobspace: None,
            interval: 2,
            stalled: 100,
            jobroot: "/mnt".into(),
            jobprefix: "qjob-".into(),
            nodes: vec![Node {
                address: "localhost".into(),
                slots: 2,
            }],
            spawnlog: "spawn.log".into(),
            ignore: vec![],
            fanout: 16,
            shell: "ssh".into(),
            copy: "rsync".into(),
            worker: Worker::default(),
        }
    }
}

impl Config {
    /// Snapshot the effective configuration for this invocation.
    pub fn new(qfile: &qfile::Qfile, profile: Option<String>, parent: Option<String>, verbose: bool) -> Self {
        let mut settings = qfile.config.clone();

        // An undeclared profile is an empty overlay; the name still
        // propagates to spawned seeders
        if let Some(overlay) = profile.as_ref().and_then(|name| qfile.profiles.get(name)) {
            settings = settings.merge(overlay.clone());
        }

        Self::from_settings(settings, profile, parent, verbose)
    }

    fn from_settings(settings: Settings, profile: Option<String>, parent: Option<String>, verbose: bool) -> Self {
        let defaults = Self::default();

        let worker = Worker::default();
        if let Some(id) = settings.worker {
            let _ = worker.0.set(id);
        }

        Self {
            parent,
            profile,
            verbose,
            qpack: settings.qpack.unwrap_or(defaults.qpack),
            qubits: settings.qubits.unwrap_or(defaults.qubits),
            qspace: settings.qspace.unwrap_or(defaults.qspace),
            jobspace: settings.jobspace,
            interval: settings.interval.unwrap_or(defaults.interval),
            stalled: settings.stalled.unwrap_or(defaults.stalled),
            jobroot: settings.jobroot.unwrap_or(defaults.jobroot),
            jobprefix: settings.jobprefix.unwrap_or(defaults.jobprefix),
            nodes: settings.nodes.unwrap_or(defaults.nodes),
            spawnlog: settings.spawnlog.unwrap_or(defaults.spawnlog),
            ignore: settings.ignore.unwrap_or(defaults.ignore),
            fanout: settings.fanout.unwrap_or(defaults.fanout),
            shell: settings.shell.unwrap_or(defaults.shell),
            copy: settings.copy.unwrap_or(defaults.copy),
            worker,
        }
    }

    /// This process's worker id, `hostname:pid` unless configured.
    pub fn worker(&self) -> &str {
        self.worker
            .0
            .get_or_init(|| format!("{}:{}", util::hostname(), process::id()))
    }

    /// A job's working directory on a remote node.
    pub fn jobdir(&self, id: &str) -> PathBuf {
        self.jobroot.join(format!("{}{id}", self.jobprefix))
    }

    /// The ledger this configuration points at; the `jobspace` URL falls
    /// back to the local qspace path.
    pub fn jobspace(&self) -> JobSpace {
        let url = self
            .jobspace
            .clone()
            .unwrap_or_else(|| self.qspace.to_string_lossy().into_owned());

        JobSpace::new(&url, self.worker(), &self.qspace)
    }

    /// Key-sorted `(name, value)` pairs, as printed by `qb conf`.
    pub fn render(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("parent", format!("{:?}", self.parent)),
            ("profile", format!("{:?}", self.profile)),
            ("verbose", self.verbose.to_string()),
            ("qpack", self.qpack.clone()),
            ("qubits", self.qubits.clone()),
            ("qspace", self.qspace.display().to_string()),
            ("jobspace", format!("{:?}", self.jobspace)),
            ("interval", self.interval.to_string()),
            ("stalled", self.stalled.to_string()),
            ("jobroot", self.jobroot.display().to_string()),
            ("jobprefix", self.jobprefix.clone()),
            (
                "nodes",
                format!(
                    "{:?}",
                    self.nodes.iter().map(|n| (&n.address, n.slots)).collect::<Vec<_>>()
                ),
            ),
            ("spawnlog", self.spawnlog.clone()),
            ("ignore", format!("{:?}", self.ignore)),
            ("fanout", self.fanout.to_string()),
            ("shell", self.shell.clone()),
            ("copy", self.copy.clone()),
            ("worker", self.worker().to_owned()),
        ];
        entries.sort_by_key(|(key, _)| *key);
        entries
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.interval, 2);
        assert_eq!(config.stalled, 100);
        assert_eq!(config.qpack, ".qpack");
        assert_eq!(
            config.nodes,
            vec![Node {
                address: "localhost".into(),
                slots: 2
            }]
        );
    }

    #[test]
    fn profile_overlays_config_section() {
        let qfile = qfile::from_str(
            r#"
config:
  interval: 5
  stalled: 10
profiles:
  dist:
    interval: 1
"#,
        )
        .unwrap();

        let config = Config::new(&qfile, Some("dist".into()), None, false);

        assert_eq!(config.interval, 1);
        assert_eq!(config.stalled, 10);
    }

    #[test]
    fn undeclared_profile_is_empty_overlay() {
        let qfile = qfile::from_str("config:\n  interval: 5\n").unwrap();

        let config = Config::new(&qfile, Some("dist".into()), None, false);

        assert_eq!(config.interval, 5);
        assert_eq!(config.profile.as_deref(), Some("dist"));
    }

    #[test]
    fn jobdir_layout() {
        let config = Config::default();

        assert_eq!(config.jobdir("abc"), PathBuf::from("/mnt/qjob-abc"));
    }

    #[test]
    fn worker_defaults_to_hostname_pid() {
        let config = Config::default();

        let worker = config.worker();
        assert!(worker.contains(':'));
        assert_eq!(config.worker(), worker);
    }

    #[test]
    fn worker_override() {
        let qfile = qfile::from_str("config:\n  worker: fixed:1\n").unwrap();

        let config = Config::new(&qfile, None, None, false);

        assert_eq!(config.worker(), "fixed:1");
    }
}
