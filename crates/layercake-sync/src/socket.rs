// SPDX-License-Identifier: Apache-2.0
//! The transport seam a [`crate::Connector`] talks through, plus an
//! in-memory reference implementation for tests and for
//! wiring several connectors into one peer mesh.

use std::rc::Rc;

use layercake_notify::{NotifyBus, SubscriptionId};
use serde_json::Value;

/// An opaque handle returned by [`Socket::on`], used to unsubscribe via
/// [`Socket::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(SubscriptionId);

/// A synchronous event transport: `emit`/`on`/`off` on named events,
/// carrying JSON payloads. A connector never learns how events actually
/// cross the wire — only that emitting on one side eventually invokes
/// the matching `on` handlers on the other.
pub trait Socket {
    /// Deliver `payload` to every handler registered for `event`.
    fn emit(&self, event: &str, payload: Value);

    /// Subscribe `handler` to `event`. Returns a handle usable with
    /// [`Self::off`].
    fn on(&self, event: &str, handler: Box<dyn FnMut(&Value)>) -> ListenerId;

    /// Remove a previously registered handler.
    fn off(&self, event: &str, id: ListenerId);
}

/// An in-memory [`Socket`] backed by a shared [`NotifyBus`]. Cloning a
/// `LoopbackSocket` shares the same bus, so several connectors built
/// on clones of one `LoopbackSocket` form a peer mesh: every `emit`
/// reaches every attached connector, including the sender — exactly
/// how a real fan-out hub behaves. Self-delivery is filtered at the
/// connector's protocol layer (the origin check), not here.
#[derive(Clone)]
pub struct LoopbackSocket {
    bus: Rc<NotifyBus>,
}

impl Default for LoopbackSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackSocket {
    /// A fresh socket with no peers attached yet. Clone it to attach
    /// more connectors to the same bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bus: Rc::new(NotifyBus::new()),
        }
    }
}

impl Socket for LoopbackSocket {
    fn emit(&self, event: &str, payload: Value) {
        self.bus.notify(event, &payload);
    }

    fn on(&self, event: &str, mut handler: Box<dyn FnMut(&Value)>) -> ListenerId {
        let id = self.bus.register(
            event.to_owned(),
            Box::new(move |_event, payload| {
                handler(payload);
                Ok(())
            }),
        );
        ListenerId(id)
    }

    fn off(&self, _event: &str, id: ListenerId) {
        self.bus.unregister(id.0);
    }
}
