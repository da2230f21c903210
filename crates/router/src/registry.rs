//! Subscription registry
//!
//! `Filter -> (shard id -> members)`. Invariants:
//! - a shard entry exists only while its member list is non-empty
//! - a filter entry exists only while it holds at least one shard entry
//!
//! Member lists are immutable `Arc<[Subscriber]>` values; every mutation builds
//! a new list and swaps it in, so a snapshot cloned out by a reader stays valid
//! after the lock is released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use contracts::DataSetter;

use crate::filter::Filter;

/// Unique id of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One registered consumer
#[derive(Clone)]
pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    pub(crate) setter: Arc<dyn DataSetter>,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

pub(crate) type Members = Arc<[Subscriber]>;

/// Shard groups of one filter
pub(crate) type ShardGroups = HashMap<String, Members>;

#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    subscriptions: HashMap<Filter, ShardGroups>,
}

impl SubscriptionRegistry {
    /// Append a subscriber to `[filter][shard_id]`
    pub(crate) fn insert(&mut self, filter: Filter, shard_id: &str, subscriber: Subscriber) {
        let groups = self.subscriptions.entry(filter).or_default();

        let members: Members = match groups.get(shard_id) {
            Some(current) => current
                .iter()
                .cloned()
                .chain(std::iter::once(subscriber))
                .collect(),
            None => Arc::from(vec![subscriber]),
        };

        groups.insert(shard_id.to_string(), members);
    }

    /// Remove the subscriber with `id` from `[filter][shard_id]`
    ///
    /// Returns whether anything was removed. Collapses the shard entry and the
    /// filter entry when they become empty.
    pub(crate) fn remove(&mut self, filter: &Filter, shard_id: &str, id: SubscriptionId) -> bool {
        let Some(groups) = self.subscriptions.get_mut(filter) else {
            return false;
        };
        let Some(current) = groups.get(shard_id) else {
            return false;
        };

        let remaining: Vec<Subscriber> = current.iter().filter(|s| s.id != id).cloned().collect();
        let removed = remaining.len() != current.len();

        if remaining.is_empty() {
            groups.remove(shard_id);
        } else if removed {
            groups.insert(shard_id.to_string(), Arc::from(remaining));
        }

        if groups.is_empty() {
            self.subscriptions.remove(filter);
        }

        removed
    }

    /// Shard groups registered under `filter`
    pub(crate) fn groups(&self, filter: &Filter) -> Option<&ShardGroups> {
        self.subscriptions.get(filter)
    }

    /// Number of filter entries
    pub(crate) fn filter_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Number of registrations across all filters and groups
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscriptions
            .values()
            .flat_map(|groups| groups.values())
            .map(|members| members.len())
            .sum()
    }
}
