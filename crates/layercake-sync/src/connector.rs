// SPDX-License-Identifier: Apache-2.0
//! The sync connector: one per `(Db, route)` pair, forwarding local
//! inserts to peers and folding inbound refs back into ref listeners.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use layercake_core::{generate_origin, tips, Db};
use layercake_hash::Route;
use layercake_notify::SubscriptionId;
use layercake_storage::StorageGateway;
use layercake_sync_proto::{
    event_names, AckPayload, Conflict, ConflictKind, ConnectorPayload, EventNames, GapFillEntry, GapFillRequest,
    GapFillResponse,
};
use serde_json::{json, Value};

use crate::config::SyncConfig;
use crate::dedup::DedupSet;
use crate::error::SyncError;
use crate::socket::{ListenerId, Socket};

/// Forwards inserts on one table/route to peers over a [`Socket`], and
/// folds inbound refs from peers back in via ref listeners.
///
/// Bound to a single `Db`/table for its whole life; `!Send`/`!Sync` by
/// construction, matching the rest of this store's single-threaded
/// cooperative model. `send_with_ack` is the one genuinely async
/// operation and must run on the same thread (a `LocalSet` or a
/// current-thread `tokio` runtime), since its oneshot is driven by
/// synchronous `Socket` callbacks.
pub struct Connector<G: StorageGateway, S: Socket> {
    db: Rc<Db<G>>,
    route: Route,
    table: String,
    socket: S,
    config: SyncConfig,
    origin: String,
    client_id: String,
    events: EventNames,
    sent_refs: RefCell<DedupSet>,
    received_refs: RefCell<DedupSet>,
    seq: Cell<u64>,
    sent_log: RefCell<VecDeque<(u64, String)>>,
    last_seq_by_client: RefCell<HashMap<String, u64>>,
    ref_listeners: RefCell<Vec<Box<dyn FnMut(&str)>>>,
    conflict_observers: RefCell<Vec<Box<dyn FnMut(&Conflict)>>>,
    pending_acks: RefCell<HashMap<String, u32>>,
    db_observer_id: Cell<Option<SubscriptionId>>,
    listener_ids: RefCell<Vec<(String, ListenerId)>>,
    torn_down: Cell<bool>,
}

impl<G, S> Connector<G, S>
where
    G: StorageGateway + 'static,
    S: Socket + 'static,
{
    /// Build a connector for `table` at `route`, talking over `socket`.
    /// Call [`Self::init`] once wrapped in an `Rc` before using it — the
    /// connector doesn't observe anything until then.
    #[must_use]
    pub fn new(db: Rc<Db<G>>, route: Route, table: impl Into<String>, socket: S, config: SyncConfig) -> Self {
        let events = event_names(&route.flat());
        let origin = db.origin().to_owned();
        let max_dedup = config.max_dedup_set_size;
        Self {
            db,
            route,
            table: table.into(),
            socket,
            config,
            origin,
            client_id: generate_origin(),
            events,
            sent_refs: RefCell::new(DedupSet::new(max_dedup)),
            received_refs: RefCell::new(DedupSet::new(max_dedup)),
            seq: Cell::new(0),
            sent_log: RefCell::new(VecDeque::new()),
            last_seq_by_client: RefCell::new(HashMap::new()),
            ref_listeners: RefCell::new(Vec::new()),
            conflict_observers: RefCell::new(Vec::new()),
            pending_acks: RefCell::new(HashMap::new()),
            db_observer_id: Cell::new(None),
            listener_ids: RefCell::new(Vec::new()),
            torn_down: Cell::new(false),
        }
    }

    /// This connector's own stable writer origin (the `Db`'s origin,
    /// reused as the payload `o` field). Distinct from
    /// [`Self::client_id`], a fresh per-instance token.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// This connector's opaque client-identity token, generated fresh
    /// at construction. Only attached to outgoing payloads when
    /// [`SyncConfig::include_client_identity`] is set.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Subscribe to the `Db`'s insert notifications and this
    /// connector's own events: `<route>`, `<route>:ack:client`,
    /// `<route>:gapfill:req`, `<route>:gapfill:res`, `<route>:bootstrap`.
    /// Idempotent only in the sense that the caller must call it
    /// exactly once per connector — call it right after wrapping the
    /// connector in an `Rc`.
    pub fn init(this: &Rc<Self>) {
        let conn = Rc::clone(this);
        let db_id = this.db.register_observer(
            this.route.flat(),
            Box::new(move |_route, payload| {
                conn.handle_local_insert(payload);
                Ok(())
            }),
        );
        this.db_observer_id.set(Some(db_id));

        let mut ids = this.listener_ids.borrow_mut();

        let conn = Rc::clone(this);
        let id = this.socket.on(
            &this.events.data,
            Box::new(move |payload| conn.handle_inbound_value(payload)),
        );
        ids.push((this.events.data.clone(), id));

        let conn = Rc::clone(this);
        let id = this.socket.on(
            &this.events.ack_client,
            Box::new(move |payload| conn.handle_ack_client(payload)),
        );
        ids.push((this.events.ack_client.clone(), id));

        let conn = Rc::clone(this);
        let id = this.socket.on(
            &this.events.gapfill_req,
            Box::new(move |payload| conn.handle_gapfill_req(payload)),
        );
        ids.push((this.events.gapfill_req.clone(), id));

        let conn = Rc::clone(this);
        let id = this.socket.on(
            &this.events.gapfill_res,
            Box::new(move |payload| conn.handle_gapfill_res(payload)),
        );
        ids.push((this.events.gapfill_res.clone(), id));

        let conn = Rc::clone(this);
        let id = this.socket.on(
            &this.events.bootstrap,
            Box::new(move |payload| conn.handle_inbound_value(payload)),
        );
        ids.push((this.events.bootstrap.clone(), id));
    }

    /// Register a callback invoked with every ref accepted from a peer
    /// (after dedup, self-echo filtering, and gap-fill folding).
    pub fn on_ref(&self, listener: Box<dyn FnMut(&str)>) {
        self.ref_listeners.borrow_mut().push(listener);
    }

    /// Register a callback invoked whenever this table's insert history
    /// develops two or more tips sharing the same predecessor set. Never an error —
    /// inserts always succeed; this is an observability hook.
    pub fn register_conflict_observer(&self, observer: Box<dyn FnMut(&Conflict)>) {
        self.conflict_observers.borrow_mut().push(observer);
    }

    /// Emit `r` to peers without waiting for an ack, performing the same
    /// dedup and causal-metadata steps a `Db`-triggered send does.
    ///
    /// # Errors
    /// Returns [`SyncError::TornDown`] if [`Self::teardown`] already ran.
    pub fn send(&self, r: &str) -> Result<(), SyncError> {
        if self.torn_down.get() {
            return Err(SyncError::TornDown);
        }
        self.send_ref(r, None)
    }

    /// Emit `r`, then wait up to `ackTimeoutMs` for a matching
    /// [`AckPayload`] on `<route>:ack`. Subscribes before emitting so a
    /// synchronous ack can't be missed.
    ///
    /// # Errors
    /// Returns [`SyncError::TornDown`] if already torn down, or
    /// [`SyncError::AckTimeout`] if no matching ack arrives in time.
    pub async fn send_with_ack(this: &Rc<Self>, r: &str) -> Result<(), SyncError> {
        if this.torn_down.get() {
            return Err(SyncError::TornDown);
        }
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let tx = RefCell::new(Some(tx));
        let target = r.to_owned();
        let ack_id = this.socket.on(
            &this.events.ack,
            Box::new(move |payload| {
                let Ok(ack) = serde_json::from_value::<AckPayload>(payload.clone()) else {
                    return;
                };
                if ack.r != target {
                    return;
                }
                if let Some(sender) = tx.borrow_mut().take() {
                    let _ = sender.send(());
                }
            }),
        );

        if let Err(err) = this.send_ref(r, None) {
            this.socket.off(&this.events.ack, ack_id);
            return Err(err);
        }

        let outcome = tokio::time::timeout(Duration::from_millis(this.config.ack_timeout_ms), rx).await;
        this.socket.off(&this.events.ack, ack_id);
        match outcome {
            Ok(Ok(())) => Ok(()),
            _ => Err(SyncError::AckTimeout { r: r.to_owned() }),
        }
    }

    /// Unsubscribe from the `Db` and the socket. Idempotent — later
    /// calls, and later `send`/`send_with_ack` calls, are no-ops/errors
    /// rather than repeating the teardown.
    pub fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        if let Some(id) = self.db_observer_id.take() {
            self.db.unregister_observer(id);
        }
        for (event, id) in self.listener_ids.take() {
            self.socket.off(&event, id);
        }
        self.ref_listeners.borrow_mut().clear();
        self.conflict_observers.borrow_mut().clear();
    }

    fn handle_local_insert(&self, payload: &Value) {
        if self.torn_down.get() {
            return;
        }
        let ref_field = format!("{}Ref", self.table);
        let Some(r) = payload.get(&ref_field).and_then(Value::as_str) else {
            return;
        };
        let previous = payload.get("previous").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect::<Vec<_>>()
        });
        if let Err(err) = self.send_ref(r, previous) {
            tracing::warn!(error = %err, r, "sync connector failed to forward a local insert");
        }
        self.check_dag_branch();
    }

    fn send_ref(&self, r: &str, previous: Option<Vec<String>>) -> Result<(), SyncError> {
        if self.sent_refs.borrow().contains(r) || self.received_refs.borrow().contains(r) {
            return Ok(());
        }

        let mut payload = ConnectorPayload::new(self.origin.clone(), r.to_owned());
        if self.config.include_client_identity {
            payload.c = Some(self.client_id.clone());
        }
        let seq = if self.config.causal_ordering {
            let next = self.seq.get() + 1;
            self.seq.set(next);
            payload.seq = Some(next);
            payload.t = Some(now_millis());
            if let Some(prev) = previous {
                if !prev.is_empty() {
                    payload.p = Some(prev);
                }
            }
            Some(next)
        } else {
            None
        };

        self.sent_refs.borrow_mut().insert(r.to_owned());
        if let Some(seq) = seq {
            let mut log = self.sent_log.borrow_mut();
            log.push_back((seq, r.to_owned()));
            while log.len() > self.config.max_dedup_set_size {
                log.pop_front();
            }
        }

        let value = serde_json::to_value(&payload).map_err(|err| SyncError::MalformedPayload {
            reason: err.to_string(),
        })?;
        self.socket.emit(&self.events.data, value);
        Ok(())
    }

    fn handle_inbound_value(&self, payload: &Value) {
        match serde_json::from_value::<ConnectorPayload>(payload.clone()) {
            Ok(p) => self.handle_inbound(&p),
            Err(err) => tracing::warn!(error = %err, "received malformed sync payload"),
        }
    }

    fn handle_inbound(&self, payload: &ConnectorPayload) {
        if self.torn_down.get() {
            return;
        }
        // Invariant: a connector never reacts to its own broadcasts,
        // even when the transport fans a send back out to the sender.
        if payload.o == self.origin {
            return;
        }
        if self.received_refs.borrow().contains(&payload.r) {
            return;
        }
        self.received_refs.borrow_mut().insert(payload.r.clone());

        if self.config.causal_ordering {
            if let (Some(seq), Some(client)) = (payload.seq, payload.c.as_ref()) {
                let last = self.last_seq_by_client.borrow().get(client).copied().unwrap_or(0);
                if seq > last + 1 {
                    self.request_gap_fill(client, last);
                }
                if seq > last {
                    self.last_seq_by_client.borrow_mut().insert(client.clone(), seq);
                }
            }
        }

        if self.config.require_ack {
            self.socket.emit(&self.events.ack_client, json!({ "r": payload.r }));
        }

        for listener in self.ref_listeners.borrow_mut().iter_mut() {
            listener(&payload.r);
        }
    }

    fn request_gap_fill(&self, client_id: &str, after_seq: u64) {
        let request = GapFillRequest {
            route: self.route.flat(),
            after_seq,
            client_id: Some(client_id.to_owned()),
        };
        if let Ok(value) = serde_json::to_value(&request) {
            self.socket.emit(&self.events.gapfill_req, value);
        }
    }

    fn handle_ack_client(&self, payload: &Value) {
        if self.torn_down.get() {
            return;
        }
        let Some(r) = payload.get("r").and_then(Value::as_str) else {
            return;
        };
        if !self.sent_refs.borrow().contains(r) {
            return;
        }
        let count = {
            let mut pending = self.pending_acks.borrow_mut();
            let entry = pending.entry(r.to_owned()).or_insert(0);
            *entry += 1;
            *entry
        };
        let ack = AckPayload {
            r: r.to_owned(),
            ok: true,
            received_by: Some(count),
            total_clients: None,
        };
        if let Ok(value) = serde_json::to_value(&ack) {
            self.socket.emit(&self.events.ack, value);
        }
    }

    fn handle_gapfill_req(&self, payload: &Value) {
        if self.torn_down.get() || !self.config.include_client_identity {
            return;
        }
        let Ok(request) = serde_json::from_value::<GapFillRequest>(payload.clone()) else {
            return;
        };
        if request.route != self.route.flat() {
            return;
        }
        if request.client_id.as_deref() != Some(self.client_id.as_str()) {
            return;
        }
        let entries: Vec<GapFillEntry> = self
            .sent_log
            .borrow()
            .iter()
            .filter(|(seq, _)| *seq > request.after_seq)
            .map(|(seq, r)| GapFillEntry {
                o: self.origin.clone(),
                r: r.clone(),
                seq: *seq,
            })
            .collect();
        let response = GapFillResponse {
            route: request.route,
            refs: entries,
        };
        if let Ok(value) = serde_json::to_value(&response) {
            self.socket.emit(&self.events.gapfill_res, value);
        }
    }

    fn handle_gapfill_res(&self, payload: &Value) {
        if self.torn_down.get() {
            return;
        }
        let Ok(response) = serde_json::from_value::<GapFillResponse>(payload.clone()) else {
            return;
        };
        if response.route != self.route.flat() {
            return;
        }
        for entry in response.refs {
            let synthetic = ConnectorPayload {
                o: entry.o,
                r: entry.r,
                c: None,
                t: None,
                seq: Some(entry.seq),
                p: None,
            };
            self.handle_inbound(&synthetic);
        }
    }

    fn check_dag_branch(&self) {
        let Ok(rows) = self.db.get_insert_history(&self.table, false, true) else {
            return;
        };
        let branch_tips = tips(&rows);
        let mut groups: BTreeMap<Vec<String>, Vec<&str>> = BTreeMap::new();
        for tip in &branch_tips {
            let mut key = tip.previous.clone().unwrap_or_default();
            key.sort();
            groups.entry(key).or_default().push(tip.time_id.as_str());
        }
        for members in groups.into_values() {
            if members.len() < 2 {
                continue;
            }
            let conflict = Conflict {
                kind: ConflictKind::DagBranch,
                table: self.table.clone(),
                branches: members.into_iter().map(str::to_owned).collect(),
                detected_at: now_millis(),
            };
            for observer in self.conflict_observers.borrow_mut().iter_mut() {
                observer(&conflict);
            }
        }
    }
}

fn now_millis() -> i64 {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    i64::try_from(millis).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::cell::RefCell;

    use layercake_core::InsertSpec;
    use layercake_storage::{ColumnType, ContentKind, MemoryGateway, TableCfg};
    use serde_json::json;

    use super::*;
    use crate::socket::LoopbackSocket;

    fn declare(db: &Db<MemoryGateway>, table: &str) {
        db.storage()
            .borrow_mut()
            .create_or_extend_table(TableCfg::new(table, ContentKind::Components).with_column("value", ColumnType::JsonValue))
            .unwrap();
    }

    fn build_connector(
        socket: LoopbackSocket,
        config: SyncConfig,
    ) -> (Rc<Db<MemoryGateway>>, Rc<Connector<MemoryGateway, LoopbackSocket>>) {
        let db = Rc::new(Db::new(Rc::new(RefCell::new(MemoryGateway::new()))));
        declare(&db, "carGeneral");
        let route = Route::from_flat("/carGeneral").unwrap();
        let connector = Rc::new(Connector::new(Rc::clone(&db), route, "carGeneral", socket, config));
        Connector::init(&connector);
        (db, connector)
    }

    #[test]
    fn local_insert_is_forwarded_to_peers() {
        let socket = LoopbackSocket::new();
        let (db, connector) = build_connector(socket.clone(), SyncConfig::default());
        drop(connector);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        socket.on(
            "/carGeneral",
            Box::new(move |payload| seen_clone.borrow_mut().push(payload.clone())),
        );

        db.insert(InsertSpec::new(Route::from_flat("/carGeneral").unwrap(), json!({"brand": "Porsche"})))
            .unwrap();

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0]["o"], json!(db.origin()));
    }

    #[test]
    fn self_echo_is_dropped() {
        let socket = LoopbackSocket::new();
        let (db, connector) = build_connector(socket.clone(), SyncConfig::default());

        let accepted = Rc::new(RefCell::new(Vec::new()));
        let accepted_clone = Rc::clone(&accepted);
        connector.on_ref(Box::new(move |r| accepted_clone.borrow_mut().push(r.to_owned())));

        db.insert(InsertSpec::new(Route::from_flat("/carGeneral").unwrap(), json!({"brand": "Porsche"})))
            .unwrap();

        // the hub fans the connector's own send back out to every
        // listener, including itself; the origin check must drop it.
        assert!(accepted.borrow().is_empty());
    }

    #[test]
    fn a_peers_payload_invokes_ref_listeners_once() {
        let socket = LoopbackSocket::new();
        let (_db, connector) = build_connector(socket.clone(), SyncConfig::default());

        let accepted = Rc::new(RefCell::new(Vec::new()));
        let accepted_clone = Rc::clone(&accepted);
        connector.on_ref(Box::new(move |r| accepted_clone.borrow_mut().push(r.to_owned())));

        let peer_payload = ConnectorPayload::new("client_peer", "deadbeef");
        socket.emit("/carGeneral", serde_json::to_value(&peer_payload).unwrap());
        socket.emit("/carGeneral", serde_json::to_value(&peer_payload).unwrap());

        assert_eq!(*accepted.borrow(), vec!["deadbeef".to_owned()]);
    }

    #[test]
    fn teardown_stops_further_forwarding() {
        let socket = LoopbackSocket::new();
        let (db, connector) = build_connector(
            socket.clone(),
            SyncConfig::default(),
        );
        connector.teardown();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        socket.on(
            "/carGeneral",
            Box::new(move |payload| seen_clone.borrow_mut().push(payload.clone())),
        );

        db.insert(InsertSpec::new(Route::from_flat("/carGeneral").unwrap(), json!({"brand": "Porsche"})))
            .unwrap();

        assert!(seen.borrow().is_empty());
        assert!(matches!(connector.send("deadbeef"), Err(SyncError::TornDown)));
    }

    #[test]
    fn a_sequence_gap_triggers_a_gapfill_request() {
        let socket = LoopbackSocket::new();
        let config = SyncConfig {
            causal_ordering: true,
            include_client_identity: true,
            ..SyncConfig::default()
        };
        let (_db, connector) = build_connector(socket.clone(), config);

        let requests = Rc::new(RefCell::new(Vec::new()));
        let requests_clone = Rc::clone(&requests);
        socket.on(
            "/carGeneral:gapfill:req",
            Box::new(move |payload| requests_clone.borrow_mut().push(payload.clone())),
        );

        let mut first = ConnectorPayload::new("client_peer", "ref1");
        first.c = Some("client_peer".to_owned());
        first.seq = Some(1);
        socket.emit("/carGeneral", serde_json::to_value(&first).unwrap());

        let mut skipped_ahead = ConnectorPayload::new("client_peer", "ref3");
        skipped_ahead.c = Some("client_peer".to_owned());
        skipped_ahead.seq = Some(3);
        socket.emit("/carGeneral", serde_json::to_value(&skipped_ahead).unwrap());

        drop(connector);
        assert_eq!(requests.borrow().len(), 1);
        assert_eq!(requests.borrow()[0]["afterSeq"], json!(1));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn send_with_ack_resolves_once_the_peer_acks() {
        let socket = LoopbackSocket::new();
        let (_db, connector) = build_connector(
            socket.clone(),
            SyncConfig {
                require_ack: true,
                ..SyncConfig::default()
            },
        );

        let responder = socket.clone();
        socket.on(
            "/carGeneral",
            Box::new(move |payload| {
                let r = payload["r"].as_str().unwrap().to_owned();
                responder.emit("/carGeneral:ack", serde_json::to_value(&AckPayload {
                    r,
                    ok: true,
                    received_by: Some(1),
                    total_clients: Some(1),
                }).unwrap());
            }),
        );

        Connector::send_with_ack(&connector, "deadbeef").await.unwrap();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn send_with_ack_times_out_without_a_peer() {
        let socket = LoopbackSocket::new();
        let (_db, connector) = build_connector(
            socket,
            SyncConfig {
                require_ack: true,
                ack_timeout_ms: 10,
                ..SyncConfig::default()
            },
        );

        let err = Connector::send_with_ack(&connector, "deadbeef").await.unwrap_err();
        assert!(matches!(err, SyncError::AckTimeout { .. }));
    }

    #[test]
    fn two_tips_sharing_a_previous_set_emit_a_conflict() {
        let socket = LoopbackSocket::new();
        let (db, connector) = build_connector(socket, SyncConfig::default());

        let conflicts = Rc::new(RefCell::new(Vec::new()));
        let conflicts_clone = Rc::clone(&conflicts);
        connector.register_conflict_observer(Box::new(move |c| conflicts_clone.borrow_mut().push(c.clone())));

        let route = Route::from_flat("/carGeneral").unwrap();
        let root = db.insert(InsertSpec::new(route.clone(), json!({"brand": "Porsche"}))).unwrap();
        let root_time_id = db.get_time_ids_for_ref("carGeneral", &root.hash.to_string()).unwrap()[0].clone();

        let mut branch_a = InsertSpec::new(route.clone(), json!({"brand": "Audi"}));
        branch_a.previous = Some(vec![root_time_id.clone()]);
        db.insert(branch_a).unwrap();

        let mut branch_b = InsertSpec::new(route, json!({"brand": "BMW"}));
        branch_b.previous = Some(vec![root_time_id]);
        db.insert(branch_b).unwrap();

        assert_eq!(conflicts.borrow().len(), 1);
        assert_eq!(conflicts.borrow()[0].branches.len(), 2);
    }
}
