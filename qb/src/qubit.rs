// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Resolved work units and their manifest serialization

use std::collections::HashMap;

use thiserror::Error;

use crate::rule::{self, Recipe, RecipeError, RuleTable};

/// A resolved unit of work: target, dependency names, bound recipe.
#[derive(Debug, Clone)]
pub struct Qubit {
    pub target: String,
    pub deps: Vec<String>,
    pub recipe: Recipe,
}

impl Qubit {
    pub fn invoke(&self) -> Result<(), RecipeError> {
        self.recipe.invoke(&self.target, &self.deps)
    }

    /// One manifest line: `recipe-id TAB target TAB space-joined-deps`.
    fn format(&self) -> String {
        format!("{}\t{}\t{}\n", self.recipe.name(), self.target, self.deps.join(" "))
    }
}

/// Target → qubit mapping preserving insertion order.
///
/// Re-inserting an existing target replaces the qubit but keeps its
/// original position, so seeding iterates in declaration-stable order.
#[derive(Debug, Default)]
pub struct QubitMap {
    order: Vec<String>,
    entries: HashMap<String, Qubit>,
}

impl QubitMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, qubit: Qubit) {
        if !self.entries.contains_key(&qubit.target) {
            self.order.push(qubit.target.clone());
        }
        self.entries.insert(qubit.target.clone(), qubit);
    }

    pub fn remove(&mut self, target: &str) -> Option<Qubit> {
        let removed = self.entries.remove(target);
        if removed.is_some() {
            self.order.retain(|t| t != target);
        }
        removed
    }

    pub fn get(&self, target: &str) -> Option<&Qubit> {
        self.entries.get(target)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.entries.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qubit> {
        self.order.iter().filter_map(|target| self.entries.get(target))
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Append `other`, coalescing duplicate targets (last write wins).
    pub fn merge(&mut self, other: Self) {
        let Self { order, mut entries } = other;
        for target in order {
            if let Some(qubit) = entries.remove(&target) {
                self.insert(qubit);
            }
        }
    }
}

/// Serialize qubits as the ordered concatenation of their manifest lines.
pub fn dump<'a>(qubits: impl IntoIterator<Item = &'a Qubit>) -> String {
    qubits.into_iter().map(Qubit::format).collect()
}

/// Parse a manifest, re-binding each qubit's recipe by re-matching the
/// target against `rules`. The stored recipe-id is not consulted;
/// dependency names are taken verbatim from the line.
pub fn parse(manifest: &str, rules: &RuleTable) -> Result<QubitMap, Error> {
    let mut map = QubitMap::new();

    for (n, line) in manifest.lines().enumerate() {
        let fields = line.split('\t').collect::<Vec<_>>();
        let &[_name, target, deps] = fields.as_slice() else {
            return Err(Error::Manifest(n + 1));
        };

        let deps = if deps.is_empty() {
            vec![]
        } else {
            deps.split(' ').map(str::to_owned).collect()
        };
        let (_, recipe) = rules.matched(target)?;

        map.insert(Qubit {
            target: target.to_owned(),
            deps,
            recipe,
        });
    }

    Ok(map)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed manifest line {0}")]
    Manifest(usize),
    #[error("rule")]
    Rule(#[from] rule::Error),
}
