// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Provider selection policy.
//!
//! Maps a [`Priority`] to accuracy/power [`Criteria`] and picks the provider
//! that should deliver fixes. The ranking itself belongs to the host, which
//! may use [`rank_providers`]; the host has to be queried on every selection
//! because providers enable and disable at any time.

use common::options::Priority;
use std::cmp::Reverse;
use tracing::trace;

/// Name of the opportunistic provider that only forwards fixes other
/// consumers caused.
pub const PASSIVE_PROVIDER: &str = "passive";

/// Horizontal accuracy class, ordered from least to most demanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Accuracy {
    NoRequirement,
    Coarse,
    Fine,
}

/// Power class, ordered from cheapest to most expensive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Power {
    NoRequirement,
    Low,
    Medium,
    High,
}

/// Requirement a provider has to meet to be selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Criteria {
    /// Minimum accuracy class.
    pub accuracy: Accuracy,
    /// Maximum power class.
    pub power: Power,
}

impl Criteria {
    pub const ANY: Criteria = Criteria {
        accuracy: Accuracy::NoRequirement,
        power: Power::NoRequirement,
    };
}

/// Static properties a provider advertises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProviderProperties {
    pub accuracy: Accuracy,
    pub power: Power,
}

impl ProviderProperties {
    pub fn new(accuracy: Accuracy, power: Power) -> Self {
        ProviderProperties { accuracy, power }
    }

    /// Returns true if the provider is at least as accurate and at most as
    /// expensive as `criteria` requests.
    pub fn satisfies(&self, criteria: &Criteria) -> bool {
        let accuracy_ok = self.accuracy >= criteria.accuracy;
        let power_ok = criteria.power == Power::NoRequirement || self.power <= criteria.power;
        accuracy_ok && power_ok
    }
}

/// Snapshot of one provider taken at query time.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderRecord {
    pub name: String,
    pub properties: ProviderProperties,
    pub enabled: bool,
}

/// Read access to the providers a host currently knows.
pub trait ProviderQuery {
    /// Names of the providers matching `criteria`; with `enabled_only` the
    /// disabled ones are left out.
    fn providers(&self, criteria: &Criteria, enabled_only: bool) -> Vec<String>;

    /// The provider the host ranks best for `criteria`.
    fn best_provider(&self, criteria: &Criteria, enabled_only: bool) -> Option<String>;
}

/// Maps a request priority to the criteria providers are matched against.
pub fn criteria_for(priority: Priority) -> Criteria {
    match priority {
        Priority::HighAccuracy => Criteria {
            accuracy: Accuracy::Fine,
            power: Power::High,
        },
        Priority::BalancedPowerAccuracy => Criteria {
            accuracy: Accuracy::Coarse,
            power: Power::Medium,
        },
        Priority::LowPower | Priority::NoPower => Criteria {
            accuracy: Accuracy::NoRequirement,
            power: Power::Low,
        },
    }
}

/// Selects the provider that should serve a request with `priority`.
///
/// [`Priority::NoPower`] only ever yields the passive provider, and only
/// while it is enabled. Every other priority asks the host for its best
/// enabled provider.
pub fn select_provider<Q: ProviderQuery + ?Sized>(query: &Q, priority: Priority) -> Option<String> {
    let criteria = criteria_for(priority);
    let selected = if priority == Priority::NoPower {
        query
            .providers(&criteria, true)
            .into_iter()
            .find(|name| name == PASSIVE_PROVIDER)
    } else {
        query.best_provider(&criteria, true)
    };
    trace!("Selected provider {:?} for priority {:?}", selected, priority);
    selected
}

fn rank_key(record: &ProviderRecord) -> (Power, Reverse<Accuracy>, &str) {
    (
        record.properties.power,
        Reverse(record.properties.accuracy),
        record.name.as_str(),
    )
}

/// Ranks `candidates` for `criteria` and returns the best one.
///
/// Candidates that satisfy the criteria win. If none does, the power
/// requirement is dropped first and then the accuracy requirement. Among
/// the remaining candidates lower power wins, then better accuracy, then
/// the lexicographically smaller name. The passive provider is never ranked
/// since it produces no fixes on its own.
pub fn rank_providers<'a>(
    candidates: &'a [ProviderRecord],
    criteria: &Criteria,
) -> Option<&'a ProviderRecord> {
    let active: Vec<&ProviderRecord> = candidates
        .iter()
        .filter(|record| record.name != PASSIVE_PROVIDER)
        .collect();
    let relaxed_power = Criteria {
        power: Power::NoRequirement,
        ..*criteria
    };
    [*criteria, relaxed_power, Criteria::ANY]
        .iter()
        .find_map(|criteria| {
            active
                .iter()
                .filter(|record| record.properties.satisfies(criteria))
                .min_by(|lhs, rhs| rank_key(lhs).cmp(&rank_key(rhs)))
                .copied()
        })
}
