// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! QPACK: a distributable snapshot of the working tree

use std::{
    io,
    path::{Path, PathBuf},
};

use fs_err as fs;
use glob::Pattern;
use thiserror::Error;

use crate::config::Config;
use crate::graph;
use crate::qubit;
use crate::rule::{self, RuleTable};
use crate::util;

/// Build intermediates never worth shipping to a node.
const INTERMEDIATES: &[&str] = &["target"];

/// Snapshot the tree at `root` into its QPACK directory and write the
/// qubits manifest for `targets`.
///
/// Excluded at every level: dot-entries, anything named like the QPACK
/// itself, build intermediates, and the configured ignore globs (matched
/// against entry names). Symlinks are preserved. A prior QPACK is removed
/// first.
pub fn snapshot<S: AsRef<str>>(
    root: &Path,
    targets: &[S],
    rules: &RuleTable,
    config: &Config,
) -> Result<PathBuf, Error> {
    let map = graph::resolve(targets, rules)?;

    let ignore = config
        .ignore
        .iter()
        .map(|pattern| Pattern::new(pattern))
        .collect::<Result<Vec<_>, _>>()?;

    let qpack = root.join(&config.qpack);
    util::recreate_dir(&qpack)?;

    let keep = |name: &str| {
        !(name.starts_with('.')
            || name == config.qpack
            || INTERMEDIATES.contains(&name)
            || ignore.iter().any(|pattern| pattern.matches(name)))
    };
    util::copy_dir(root, &qpack, &keep)?;

    fs::write(qpack.join(&config.qubits), qubit::dump(map.iter()))?;

    Ok(qpack)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("resolve")]
    Rule(#[from] rule::Error),
    #[error("malformed ignore pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("io")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use std::os::unix::fs::symlink;

    use super::*;
    use crate::rule::{Deps, Recipe};

    fn rules() -> RuleTable {
        let mut rules = RuleTable::new();
        rules.add("^default$", Deps::None, Recipe::noop("all")).unwrap();
        rules
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(root.join("f.txt"), "f").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/g.txt"), "g").unwrap();
        fs::write(root.join("sub/.hidden"), "h").unwrap();
        fs::write(root.join(".secret"), "s").unwrap();
        fs::write(root.join("noise.log"), "n").unwrap();
        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("target/obj"), "o").unwrap();
        symlink("f.txt", root.join("link")).unwrap();

        dir
    }

    #[test]
    fn snapshot_filters_and_writes_manifest() {
        let dir = tree();
        let rules = rules();
        let config = Config {
            ignore: vec!["*.log".into()],
            ..Default::default()
        };

        let qpack = snapshot(dir.path(), &["default"], &rules, &config).unwrap();

        assert!(qpack.join("f.txt").exists());
        assert!(qpack.join("sub/g.txt").exists());
        assert!(!qpack.join(".secret").exists());
        assert!(!qpack.join("sub/.hidden").exists());
        assert!(!qpack.join("noise.log").exists());
        assert!(!qpack.join("target").exists());

        assert_eq!(
            fs::read_to_string(qpack.join(".qubits")).unwrap(),
            "all\tdefault\t\n"
        );
    }

    #[test]
    fn symlinks_are_preserved() {
        let dir = tree();
        let config = Config::default();

        let qpack = snapshot(dir.path(), &["default"], &rules(), &config).unwrap();

        let meta = fs::symlink_metadata(qpack.join("link")).unwrap();
        assert!(meta.is_symlink());
        assert_eq!(fs::read_link(qpack.join("link")).unwrap(), Path::new("f.txt"));
    }

    #[test]
    fn prior_qpack_is_replaced() {
        let dir = tree();
        let config = Config::default();
        let stale = dir.path().join(".qpack");

        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("stale"), "old").unwrap();

        let qpack = snapshot(dir.path(), &["default"], &rules(), &config).unwrap();

        assert!(!qpack.join("stale").exists());
        assert!(!qpack.join(".qpack").exists());
    }

    #[test]
    fn manifest_matches_resolver_output() {
        let dir = tree();
        let rules = rules();
        let config = Config::default();

        let qpack = snapshot(dir.path(), &["default"], &rules, &config).unwrap();

        let written = fs::read_to_string(qpack.join(".qubits")).unwrap();
        let reread = qubit::parse(&written, &rules).unwrap();
        let resolved = graph::resolve(&["default"], &rules).unwrap();

        assert_eq!(
            reread.targets().collect::<Vec<_>>(),
            resolved.targets().collect::<Vec<_>>()
        );
    }
}
