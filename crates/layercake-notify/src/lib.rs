// SPDX-License-Identifier: Apache-2.0
//! Route-keyed, synchronous observer registry.
//!
//! A process-wide, single-threaded bus: `register`/`unregister`/`notify`
//! key observers by `route.flat`. Notifications run synchronously, in
//! registration order; a callback that panics-equivalent (returns an
//! error) is logged and does not interrupt the remaining callbacks for
//! that route.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

/// An insert-history row (or any JSON payload) delivered to observers.
pub type NotifyPayload = Value;

/// A subscribed observer callback. Boxed so a bus can hold a
/// heterogeneous set of closures; fallible so a callback can report a
/// failure without panicking — the bus logs it and moves on.
pub type Observer = Box<dyn FnMut(&str, &NotifyPayload) -> Result<(), String>>;

/// An opaque handle returned by [`NotifyBus::register`], used to
/// [`NotifyBus::unregister`] later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    observer: Observer,
}

/// The route-keyed observer registry itself.
///
/// `!Send`/`!Sync` by construction (`Rc<RefCell<_>>` internals): this bus
/// is meant to live on the single cooperative thread the rest of the
/// catalog store runs on, not to be shared across threads.
pub struct NotifyBus {
    by_route: Rc<RefCell<BTreeMap<String, Vec<Subscription>>>>,
    next_id: Rc<RefCell<u64>>,
}

impl Default for NotifyBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyBus {
    /// An empty bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_route: Rc::new(RefCell::new(BTreeMap::new())),
            next_id: Rc::new(RefCell::new(0)),
        }
    }

    /// Subscribe `observer` to notifications on `route_flat`. Returns a
    /// handle usable with [`Self::unregister`].
    pub fn register(
        &self,
        route_flat: impl Into<String>,
        observer: Observer,
    ) -> SubscriptionId {
        let id = {
            let mut next = self.next_id.borrow_mut();
            let id = SubscriptionId(*next);
            *next += 1;
            id
        };
        self.by_route
            .borrow_mut()
            .entry(route_flat.into())
            .or_default()
            .push(Subscription { id, observer });
        id
    }

    /// Remove a previously registered observer. A no-op if `id` is not
    /// (or is no longer) registered.
    pub fn unregister(&self, id: SubscriptionId) {
        let mut by_route = self.by_route.borrow_mut();
        by_route.retain(|_, subs| {
            subs.retain(|s| s.id != id);
            !subs.is_empty()
        });
    }

    /// Deliver `payload` to every observer registered on `route_flat`, in
    /// registration order. Observer errors are logged via `tracing::warn`
    /// and do not stop delivery to the remaining observers.
    pub fn notify(&self, route_flat: &str, payload: &NotifyPayload) {
        let Some(subs) = self.by_route.borrow_mut().get_mut(route_flat).map(std::mem::take)
        else {
            return;
        };
        let mut subs = subs;
        for sub in &mut subs {
            if let Err(err) = (sub.observer)(route_flat, payload) {
                tracing::warn!(route = route_flat, error = %err, "notify observer failed");
            }
        }
        if !subs.is_empty() {
            self.by_route
                .borrow_mut()
                .entry(route_flat.to_owned())
                .or_default()
                .extend(subs);
        }
    }

    /// How many observers are registered on `route_flat`.
    #[must_use]
    pub fn observer_count(&self, route_flat: &str) -> usize {
        self.by_route
            .borrow()
            .get(route_flat)
            .map_or(0, Vec::len)
    }
}
