// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{io, path::Path};

use fs_err as fs;
use itertools::Itertools;
use qfile::Node;
use thiserror::Error;

use crate::config::Config;
use crate::job::Job;
use crate::jobspace;
use crate::qubit::{self, QubitMap};
use crate::rule::RuleTable;

use super::shell_orders;

/// Launch seeders for a shared job across the configured nodes.
///
/// Root targets (empty deps) are assigned round-robin over the nodes'
/// seeder slots; everything else becomes reachable through seeding, with
/// the ledger's claim protocol preventing duplicate execution. Returns the
/// job-id unchanged.
pub fn spawn(jobid: &str, qpack: Option<&str>, rules: &RuleTable, config: &Config) -> Result<String, Error> {
    let manifest = fs::read_to_string(Path::new(qpack.unwrap_or(&config.qpack)).join(&config.qubits))?;
    let map = qubit::parse(&manifest, rules)?;

    let mut slots = expand_slots(&config.nodes);
    if slots.is_empty() {
        return Err(Error::NoNodes);
    }
    assign_roots(&map, &mut slots);

    let job = Job::create(config.jobspace(), Some(jobid.to_owned()))?;

    shell_orders(orders(&slots, job.id(), config), config)?;

    Ok(jobid.to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    address: String,
    targets: Vec<String>,
}

/// One empty bucket per seeder slot, node order preserved.
fn expand_slots(nodes: &[Node]) -> Vec<Slot> {
    nodes
        .iter()
        .flat_map(|node| {
            (0..node.slots).map(move |_| Slot {
                address: node.address.clone(),
                targets: vec![],
            })
        })
        .collect()
}

/// Deal the root targets over the buckets in declaration order.
fn assign_roots(map: &QubitMap, slots: &mut [Slot]) {
    for (n, qubit) in map.iter().filter(|qubit| qubit.deps.is_empty()).enumerate() {
        slots[n % slots.len()].targets.push(qubit.target.clone());
    }
}

fn seed_flags(job_id: &str, config: &Config) -> String {
    let mut flags = format!("-j {job_id}");
    if let Some(profile) = &config.profile {
        flags.push_str(&format!(" -p {profile}"));
    }
    if config.verbose {
        flags.push_str(" -v");
    }
    flags
}

fn plant(flags: &str, targets: &[String], spawnlog: &str) -> String {
    format!("(nohup qb seed {flags} {} >> {spawnlog} 2>&1 &)", targets.join(" "))
}

/// One remote command line per address: cd into the job directory and
/// background one seeder per non-empty bucket. Addresses whose buckets are
/// all empty are skipped.
fn orders(slots: &[Slot], job_id: &str, config: &Config) -> Vec<(String, String)> {
    let flags = seed_flags(job_id, config);
    let jobdir = config.jobdir(job_id);

    let mut orders = vec![];
    for (address, group) in &slots.iter().chunk_by(|slot| slot.address.clone()) {
        let plants = group
            .filter(|slot| !slot.targets.is_empty())
            .map(|slot| plant(&flags, &slot.targets, &config.spawnlog))
            .join("; ");
        if plants.is_empty() {
            continue;
        }
        orders.push((address, format!("cd {}; {plants}; echo ok", jobdir.display())));
    }

    orders
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no nodes configured")]
    NoNodes,
    #[error("manifest")]
    Qubit(#[from] qubit::Error),
    #[error("jobspace")]
    JobSpace(#[from] jobspace::Error),
    #[error("shell")]
    Transport(#[from] super::Error),
    #[error("io")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph;
    use crate::rule::{Deps, Recipe};

    fn nodes() -> Vec<Node> {
        vec![
            Node {
                address: "n1".into(),
                slots: 2,
            },
            Node {
                address: "n2".into(),
                slots: 1,
            },
        ]
    }

    fn roots(targets: &[&str]) -> QubitMap {
        let mut rules = RuleTable::new();
        rules.add("^.+$", Deps::None, Recipe::noop("r")).unwrap();
        graph::resolve(targets, &rules).unwrap()
    }

    #[test]
    fn slots_expand_in_node_order() {
        let slots = expand_slots(&nodes());

        assert_eq!(
            slots.iter().map(|slot| slot.address.as_str()).collect::<Vec<_>>(),
            vec!["n1", "n1", "n2"]
        );
    }

    #[test]
    fn roots_deal_round_robin() {
        let map = roots(&["a", "b", "c", "d"]);
        let mut slots = expand_slots(&nodes());

        assign_roots(&map, &mut slots);

        assert_eq!(slots[0].targets, vec!["a", "d"]);
        assert_eq!(slots[1].targets, vec!["b"]);
        assert_eq!(slots[2].targets, vec!["c"]);
    }

    #[test]
    fn non_root_targets_are_not_assigned() {
        let mut rules = RuleTable::new();
        rules.add("^leaf$", Deps::None, Recipe::noop("leaf")).unwrap();
        rules.add("^top$", "leaf", Recipe::noop("top")).unwrap();
        let map = graph::resolve(&["top"], &rules).unwrap();

        let mut slots = expand_slots(&nodes());
        assign_roots(&map, &mut slots);

        assert_eq!(slots[0].targets, vec!["leaf"]);
        assert!(slots[1].targets.is_empty());
        assert!(slots[2].targets.is_empty());
    }

    #[test]
    fn orders_group_contiguous_buckets() {
        let map = roots(&["a", "b", "c"]);
        let mut slots = expand_slots(&nodes());
        assign_roots(&map, &mut slots);

        let config = Config {
            nodes: nodes(),
            ..Default::default()
        };
        let orders = orders(&slots, "J", &config);

        assert_eq!(
            orders,
            vec![
                (
                    "n1".to_owned(),
                    "cd /mnt/qjob-J; \
                     (nohup qb seed -j J a >> spawn.log 2>&1 &); \
                     (nohup qb seed -j J b >> spawn.log 2>&1 &); \
                     echo ok"
                        .to_owned()
                ),
                (
                    "n2".to_owned(),
                    "cd /mnt/qjob-J; (nohup qb seed -j J c >> spawn.log 2>&1 &); echo ok".to_owned()
                ),
            ]
        );
    }

    #[test]
    fn idle_addresses_are_skipped() {
        let map = roots(&["a"]);
        let mut slots = expand_slots(&nodes());
        assign_roots(&map, &mut slots);

        let config = Config {
            nodes: nodes(),
            ..Default::default()
        };
        let orders = orders(&slots, "J", &config);

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].0, "n1");
    }

    #[test]
    fn flags_carry_profile_and_verbosity() {
        let config = Config {
            profile: Some("dist".into()),
            verbose: true,
            ..Default::default()
        };

        assert_eq!(seed_flags("J", &config), "-j J -p dist -v");
    }
}
