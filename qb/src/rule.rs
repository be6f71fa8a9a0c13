// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Ordered rule table mapping target-name patterns to recipes

use std::{fmt, io, process, sync::Arc};

use regex::Regex;
use thiserror::Error;

pub type Action = dyn Fn(&str, &[String]) -> Result<(), RecipeError> + Send + Sync;

/// An executable action with a stable name.
///
/// The name is the recipe-id written to the qubits manifest; a remote
/// process re-binds to the action by re-matching the target against its
/// own rule table.
#[derive(Clone)]
pub struct Recipe {
    name: String,
    action: Arc<Action>,
}

impl Recipe {
    pub fn new(
        name: impl ToString,
        action: impl Fn(&str, &[String]) -> Result<(), RecipeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            action: Arc::new(action),
        }
    }

    /// A recipe which runs `command` via `sh -c`, with `TARGET` and `DEPS`
    /// (space-joined) in the environment.
    pub fn shell(name: impl ToString, command: impl Into<String>) -> Self {
        let command = command.into();

        Self::new(name, move |target, deps| {
            let status = process::Command::new("sh")
                .arg("-c")
                .arg(&command)
                .env("TARGET", target)
                .env("DEPS", deps.join(" "))
                .status()?;

            if status.success() {
                Ok(())
            } else if let Some(code) = status.code() {
                Err(RecipeError::Code(code))
            } else {
                Err(RecipeError::Signal)
            }
        })
    }

    pub fn noop(name: impl ToString) -> Self {
        Self::new(name, |_, _| Ok(()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, target: &str, deps: &[String]) -> Result<(), RecipeError> {
        (self.action)(target, deps)
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("failed with status code {0}")]
    Code(i32),
    #[error("terminated by signal")]
    Signal,
    #[error("io")]
    Io(#[from] io::Error),
}

/// A dependency expression: nothing, a fixed name, a fixed sequence, or a
/// function of the pattern's capture groups.
#[derive(Clone, Default)]
pub enum Deps {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
    Expand(Arc<dyn Fn(&[String]) -> Vec<String> + Send + Sync>),
}

impl Deps {
    pub fn expand(f: impl Fn(&[String]) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self::Expand(Arc::new(f))
    }

    fn resolve(&self, captures: &[String]) -> Vec<String> {
        match self {
            Deps::None => vec![],
            Deps::One(dep) => vec![dep.clone()],
            Deps::Many(deps) => deps.clone(),
            Deps::Expand(f) => f(captures),
        }
    }
}

impl From<&str> for Deps {
    fn from(dep: &str) -> Self {
        Deps::One(dep.to_owned())
    }
}

impl From<String> for Deps {
    fn from(dep: String) -> Self {
        Deps::One(dep)
    }
}

impl From<Vec<String>> for Deps {
    fn from(deps: Vec<String>) -> Self {
        Deps::Many(deps)
    }
}

impl From<Vec<&str>> for Deps {
    fn from(deps: Vec<&str>) -> Self {
        Deps::Many(deps.into_iter().map(str::to_owned).collect())
    }
}

struct Rule {
    pattern: Regex,
    deps: Deps,
    recipe: Recipe,
}

/// Registration-ordered rule table.
///
/// Matching a target walks the rules in registration order and takes the
/// first whose pattern matches at the start of the name.
#[derive(Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: &str, deps: impl Into<Deps>, recipe: Recipe) -> Result<(), Error> {
        let pattern = Regex::new(pattern)?;
        self.rules.push(Rule {
            pattern,
            deps: deps.into(),
            recipe,
        });
        Ok(())
    }

    /// Resolve `target` to its expanded dependency list and recipe.
    pub fn matched(&self, target: &str) -> Result<(Vec<String>, Recipe), Error> {
        for rule in &self.rules {
            let Some(captures) = rule.pattern.captures(target) else {
                continue;
            };
            // Mirror anchored matching: a hit elsewhere in the name is no hit
            if captures.get(0).map(|m| m.start()) != Some(0) {
                continue;
            }

            let groups = captures
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_owned()).unwrap_or_default())
                .collect::<Vec<_>>();

            return Ok((rule.deps.resolve(&groups), rule.recipe.clone()));
        }

        Err(Error::UnknownTarget(target.to_owned()))
    }

    /// Populate a table from a parsed Qfile: shell recipes named after
    /// their rule, `$N` templates compiled to capture-group expansion.
    pub fn from_qfile(qfile: &qfile::Qfile) -> Result<Self, Error> {
        let mut table = Self::new();

        for rule in &qfile.rules {
            let recipe = match &rule.run {
                Some(command) => Recipe::shell(&rule.name, command.clone()),
                None => Recipe::noop(&rule.name),
            };

            table.add(&rule.pattern, compile_deps(&rule.deps), recipe)?;
        }

        Ok(table)
    }
}

fn compile_deps(templates: &[String]) -> Deps {
    if templates.is_empty() {
        Deps::None
    } else if templates.iter().any(|t| t.contains('$')) {
        let templates = templates.to_vec();
        Deps::expand(move |captures| templates.iter().map(|t| substitute(t, captures)).collect())
    } else {
        Deps::Many(templates.to_vec())
    }
}

/// Replace `$1`..`$9` with the corresponding capture group; a lone or
/// trailing `$` passes through.
fn substitute(template: &str, captures: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(digit @ '1'..='9') => {
                let index = digit.to_digit(10).unwrap() as usize - 1;
                out.push_str(captures.get(index).map(String::as_str).unwrap_or_default());
                chars.next();
            }
            _ => out.push('$'),
        }
    }

    out
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("don't know how to make '{0}'")]
    UnknownTarget(String),
    #[error("malformed pattern")]
    Pattern(#[from] regex::Error),
}
