// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Schema for the `Qfile` rule-definition document.
//!
//! A Qfile declares the rules a build is made from, plus optional
//! configuration overrides and named profiles. This crate only parses;
//! compiling patterns and binding recipes happens in the engine.

use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;

pub fn from_slice(bytes: &[u8]) -> Result<Qfile, serde_yaml::Error> {
    serde_yaml::from_slice(bytes)
}

pub fn from_str(s: &str) -> Result<Qfile, serde_yaml::Error> {
    serde_yaml::from_str(s)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Qfile {
    #[serde(default)]
    pub config: Settings,
    #[serde(default)]
    pub profiles: HashMap<String, Settings>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// One overlay of configuration keys. Every field is optional so the
/// engine can merge defaults, the `config` section, a profile and the
/// command line in precedence order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub qpack: Option<String>,
    pub qubits: Option<String>,
    pub qspace: Option<PathBuf>,
    pub jobspace: Option<String>,
    pub interval: Option<u64>,
    pub stalled: Option<u64>,
    pub jobroot: Option<PathBuf>,
    pub jobprefix: Option<String>,
    pub nodes: Option<Vec<Node>>,
    pub worker: Option<String>,
    pub spawnlog: Option<String>,
    pub ignore: Option<Vec<String>>,
    pub fanout: Option<usize>,
    pub shell: Option<String>,
    pub copy: Option<String>,
}

impl Settings {
    /// Overlay `other` on top of `self`, field by field.
    pub fn merge(self, other: Self) -> Self {
        Self {
            qpack: other.qpack.or(self.qpack),
            qubits: other.qubits.or(self.qubits),
            qspace: other.qspace.or(self.qspace),
            jobspace: other.jobspace.or(self.jobspace),
            interval: other.interval.or(self.interval),
            stalled: other.stalled.or(self.stalled),
            jobroot: other.jobroot.or(self.jobroot),
            jobprefix: other.jobprefix.or(self.jobprefix),
            nodes: other.nodes.or(self.nodes),
            worker: other.worker.or(self.worker),
            spawnlog: other.spawnlog.or(self.spawnlog),
            ignore: other.ignore.or(self.ignore),
            fanout: other.fanout.or(self.fanout),
            shell: other.shell.or(self.shell),
            copy: other.copy.or(self.copy),
        }
    }
}

/// A worker node: an address plus the number of seeder slots it carries.
///
/// Accepts either a bare address string (two slots) or an explicit
/// `{ address, slots }` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "NodeDef")]
pub struct Node {
    pub address: String,
    pub slots: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NodeDef {
    Address(String),
    Full {
        address: String,
        #[serde(default = "default_slots")]
        slots: usize,
    },
}

fn default_slots() -> usize {
    2
}

impl From<NodeDef> for Node {
    fn from(def: NodeDef) -> Self {
        match def {
            NodeDef::Address(address) => Node {
                address,
                slots: default_slots(),
            },
            NodeDef::Full { address, slots } => Node { address, slots },
        }
    }
}

/// A rule: target pattern, dependency templates, shell recipe.
///
/// `deps` entries may reference the pattern's capture groups as `$1`..`$9`.
/// A missing `run` is a no-op recipe, useful for aggregate targets.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub name: String,
    pub pattern: String,
    #[serde(default, deserialize_with = "single_as_sequence")]
    pub deps: Vec<String>,
    pub run: Option<String>,
}

fn single_as_sequence<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::de::Deserializer<'de>,
{
    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum Value<T> {
        Single(T),
        Sequence(Vec<T>),
    }

    match Value::deserialize(deserializer)? {
        Value::Single(value) => Ok(vec![value]),
        Value::Sequence(sequence) => Ok(sequence),
    }
}
