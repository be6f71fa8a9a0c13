// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Expand requested targets into the transitive qubit map

use log::warn;

use crate::qubit::{Qubit, QubitMap};
use crate::rule::{self, RuleTable};

pub const DEFAULT_TARGET: &str = "default";

/// Resolve the requested targets (default: `"default"`) into a qubit map.
///
/// Requests are expanded depth-first and concatenated in input order;
/// duplicates across requests coalesce, last write wins. A target with no
/// matching rule aborts the whole resolution.
pub fn resolve<S: AsRef<str>>(targets: &[S], rules: &RuleTable) -> Result<QubitMap, rule::Error> {
    let mut map = QubitMap::new();

    if targets.is_empty() {
        map.merge(expand_request(DEFAULT_TARGET, rules)?);
    } else {
        for target in targets {
            map.merge(expand_request(target.as_ref(), rules)?);
        }
    }

    Ok(map)
}

fn expand_request(target: &str, rules: &RuleTable) -> Result<QubitMap, rule::Error> {
    let mut request = QubitMap::new();
    expand(target, &mut request, &mut Vec::new(), rules)?;
    Ok(request)
}

/// Depth-first expansion with an ordered ancestors stack.
///
/// Revisiting a target already on the stack closes a cycle: that target is
/// dropped from the map with a warning and the branch is not followed. Its
/// ancestors stay behind, pointing at the now-missing dependency, and
/// quietly become unsatisfiable.
fn expand(
    target: &str,
    map: &mut QubitMap,
    ancestors: &mut Vec<String>,
    rules: &RuleTable,
) -> Result<(), rule::Error> {
    if ancestors.iter().any(|ancestor| ancestor == target) {
        warn!(
            "dropping circular dependency: {} -> {target}",
            ancestors.join(" -> ")
        );
        map.remove(target);
        return Ok(());
    }

    let (deps, recipe) = rules.matched(target)?;
    map.insert(Qubit {
        target: target.to_owned(),
        deps: deps.clone(),
        recipe,
    });

    ancestors.push(target.to_owned());
    for dep in &deps {
        expand(dep, map, ancestors, rules)?;
    }
    ancestors.pop();

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rule::{Deps, Recipe};

    fn chain() -> RuleTable {
        let mut rules = RuleTable::new();
        rules.add("^a$", Deps::None, Recipe::noop("base")).unwrap();
        rules.add("^b$", "a", Recipe::noop("mid")).unwrap();
        rules.add("^c$", "b", Recipe::noop("top")).unwrap();
        rules
    }

    #[test]
    fn linear_chain() {
        let map = resolve(&["c"], &chain()).unwrap();

        assert_eq!(map.targets().collect::<Vec<_>>(), vec!["c", "b", "a"]);
    }

    #[test]
    fn closure_holds() {
        let map = resolve(&["c"], &chain()).unwrap();

        for qubit in map.iter() {
            for dep in &qubit.deps {
                assert!(map.contains(dep), "{dep} missing from map");
            }
        }
    }

    #[test]
    fn cycle_drops_reentrant_target() {
        let mut rules = RuleTable::new();
        rules.add("^a$", "b", Recipe::noop("a")).unwrap();
        rules.add("^b$", "a", Recipe::noop("b")).unwrap();

        let map = resolve(&["a"], &rules).unwrap();

        assert!(!map.contains("a"));
        assert!(map.contains("b"));
    }

    #[test]
    fn self_loop_drops_target() {
        let mut rules = RuleTable::new();
        rules.add("^a$", "a", Recipe::noop("a")).unwrap();

        let map = resolve(&["a"], &rules).unwrap();

        assert!(map.is_empty());
    }

    #[test]
    fn unknown_target_is_fatal() {
        let mut rules = RuleTable::new();
        rules.add("^x$", Deps::None, Recipe::noop("x")).unwrap();

        assert!(matches!(
            resolve(&["y"], &rules),
            Err(rule::Error::UnknownTarget(target)) if target == "y"
        ));
    }

    #[test]
    fn default_target() {
        let mut rules = RuleTable::new();
        rules.add("^default$", Deps::None, Recipe::noop("d")).unwrap();

        let map = resolve::<&str>(&[], &rules).unwrap();

        assert!(map.contains(DEFAULT_TARGET));
    }

    #[test]
    fn duplicate_requests_coalesce() {
        let map = resolve(&["c", "b"], &chain()).unwrap();

        assert_eq!(map.targets().collect::<Vec<_>>(), vec!["c", "b", "a"]);
    }

    #[test]
    fn diamond_expands_once_per_position() {
        let mut rules = RuleTable::new();
        rules.add("^a$", Deps::None, Recipe::noop("a")).unwrap();
        rules.add("^b$", "a", Recipe::noop("b")).unwrap();
        rules.add("^c$", "a", Recipe::noop("c")).unwrap();
        rules.add("^d$", vec!["b", "c"], Recipe::noop("d")).unwrap();

        let map = resolve(&["d"], &rules).unwrap();

        assert_eq!(map.targets().collect::<Vec<_>>(), vec!["d", "b", "a", "c"]);
    }
}
