// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{io, os::unix::fs::symlink, path::Path};

use fs_err as fs;

pub fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

pub fn recreate_dir(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Recursively copy `source_dir` into `out_dir`, keeping only entries whose
/// name passes `keep`. The filter applies at every level. Symlinks are
/// recreated as links, never followed.
pub fn copy_dir(source_dir: &Path, out_dir: &Path, keep: &dyn Fn(&str) -> bool) -> io::Result<()> {
    ensure_dir_exists(out_dir)?;

    let contents = fs::read_dir(source_dir)?;

    for entry in contents.flatten() {
        let path = entry.path();

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !keep(file_name) {
            continue;
        }

        let dest = out_dir.join(file_name);
        let meta = entry.metadata()?;

        if meta.is_dir() {
            copy_dir(&path, &dest, keep)?;
        } else if meta.is_file() {
            fs::copy(&path, &dest)?;
        } else if meta.is_symlink() {
            symlink(fs::read_link(&path)?, &dest)?;
        }
    }

    Ok(())
}

pub fn hostname() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".into())
}

/// Percent-encode a string for use as a single path component.
pub fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
