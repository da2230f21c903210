//! Router - subscription registration and envelope dispatch
//!
//! Registration and release take the registry's write lock; dispatch takes the
//! read lock only long enough to clone the matched member lists, then
//! serializes and delivers with no lock held. A slow `DataSetter` therefore
//! never blocks registration or other dispatchers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use contracts::{DataSetter, RoutableEnvelope, SubscriptionRequest};
use tracing::{debug, instrument, trace};

use crate::filter::Filter;
use crate::metrics::RouterMetrics;
use crate::registry::{Members, Subscriber, SubscriptionId, SubscriptionRegistry};
use crate::shard;

/// Source of registration ids, shared by every router in the process so a
/// handle can never name a registration on a router that did not issue it
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(0);

/// Handle returned by [`Router::register`]
///
/// Pass it to [`Router::release`] to stop delivery. Releasing is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    filter: Filter,
    shard_id: String,
    id: SubscriptionId,
}

impl SubscriptionHandle {
    /// Filter the consumer was registered under
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Shard group (empty = broadcast)
    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    /// Registration id
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// One shard group picked up by a dispatch
struct Target {
    broadcast: bool,
    members: Members,
}

/// In-memory pub-sub dispatch table
#[derive(Debug, Default)]
pub struct Router {
    registry: RwLock<SubscriptionRegistry>,
    metrics: Arc<RouterMetrics>,
}

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `setter` for envelopes matching `request`
    #[instrument(name = "router_register", skip(self, setter), fields(shard_id = %request.shard_id))]
    pub fn register(
        &self,
        request: &SubscriptionRequest,
        setter: Arc<dyn DataSetter>,
    ) -> SubscriptionHandle {
        let filter = Filter::from_request(request);
        let id = SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));

        let subscribers = {
            let mut registry = self.write();
            registry.insert(filter.clone(), &request.shard_id, Subscriber { id, setter });
            registry.subscriber_count()
        };
        observability::record_subscriptions(subscribers);

        debug!(
            subscription = %id,
            filter = ?filter,
            subscribers,
            "consumer registered"
        );

        SubscriptionHandle {
            filter,
            shard_id: request.shard_id.clone(),
            id,
        }
    }

    /// Remove the registration behind `handle`
    ///
    /// Releasing twice, or releasing a handle from a registration that is
    /// already gone, does nothing.
    #[instrument(name = "router_release", skip(self, handle), fields(subscription = %handle.id))]
    pub fn release(&self, handle: &SubscriptionHandle) {
        let (removed, subscribers) = {
            let mut registry = self.write();
            let removed = registry.remove(&handle.filter, &handle.shard_id, handle.id);
            (removed, registry.subscriber_count())
        };

        if removed {
            observability::record_subscriptions(subscribers);
            debug!(subscription = %handle.id, subscribers, "consumer released");
        }
    }

    /// Route one envelope owned by `app_id` to every matching consumer
    ///
    /// Ungrouped consumers all receive the envelope; each named shard group
    /// delivers to exactly one member. The envelope is serialized once; if that
    /// fails it is dropped without delivering anything.
    pub fn dispatch<E: RoutableEnvelope + ?Sized>(&self, app_id: &str, envelope: &E) {
        self.metrics.inc_dispatched();

        let targets = self.collect_targets(app_id, envelope);
        if targets.is_empty() {
            self.metrics.inc_unmatched();
            observability::record_envelope_dispatched(false);
            return;
        }

        let data = match envelope.marshal() {
            Ok(data) => data,
            Err(e) => {
                self.metrics.inc_marshal_failures();
                observability::record_marshal_failure();
                trace!(app_id, error = %e, "dropping envelope that failed to serialize");
                return;
            }
        };

        let mut broadcast = 0u64;
        let mut sharded = 0u64;
        for target in &targets {
            if target.broadcast {
                for member in target.members.iter() {
                    member.setter.set(data.clone());
                }
                broadcast += target.members.len() as u64;
            } else {
                let idx = shard::select(envelope, target.members.len());
                target.members[idx].setter.set(data.clone());
                sharded += 1;
            }
        }

        self.metrics.add_deliveries(broadcast + sharded);
        observability::record_envelope_dispatched(true);
        observability::record_deliveries(broadcast, sharded);
    }

    /// Number of filters with at least one registration
    pub fn filter_count(&self) -> usize {
        self.read().filter_count()
    }

    /// Number of live registrations
    pub fn subscription_count(&self) -> usize {
        self.read().subscriber_count()
    }

    /// Routing counters
    pub fn metrics(&self) -> &Arc<RouterMetrics> {
        &self.metrics
    }

    fn collect_targets<E: RoutableEnvelope + ?Sized>(&self, app_id: &str, envelope: &E) -> Vec<Target> {
        let filters = Filter::matching(app_id, envelope);
        let registry = self.read();

        filters
            .iter()
            .filter_map(|filter| registry.groups(filter))
            .flat_map(|groups| groups.iter())
            .map(|(shard_id, members)| Target {
                broadcast: shard_id.is_empty(),
                members: Arc::clone(members),
            })
            .collect()
    }

    // A panicking setter never runs under the lock, so a poisoned registry
    // still holds consistent data.
    fn read(&self) -> RwLockReadGuard<'_, SubscriptionRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SubscriptionRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}
