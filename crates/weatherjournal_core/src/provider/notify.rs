//! Change notification broadcast.
//!
//! # Responsibility
//! - Keep the set of observers registered against resource identifiers.
//! - Deliver "resource changed" signals to every matching observer.
//!
//! # Invariants
//! - Delivery reaches observers registered at the time of `notify`; there is
//!   no queue or replay for later registrations.
//! - Observer callbacks run without the registry lock held, so a callback may
//!   register or unregister observers.
//! - Channel subscriptions whose receiver is gone are pruned on delivery.
//! - Store writes reserve a delivery turn before releasing the connection, so
//!   their notifications go out in write order.

use log::debug;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

thread_local! {
    static DELIVERING: Cell<bool> = const { Cell::new(false) };
}

/// Callback invoked when an observed identifier changes.
///
/// Runs on the writing thread after the write committed and the connection
/// was released, before the write call returns. A callback may query the
/// store, register or unregister observers, and write to the store; its own
/// writes notify immediately instead of waiting for their turn. A panicking
/// callback unwinds into the write call that triggered it; the write stays
/// committed and the store stays usable. A callback must not wait on a write
/// running on another thread; that write's delivery queues behind this one.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, uri: &str);
}

/// Signal that data behind `uri` changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub uri: String,
}

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

enum Sink {
    Callback(Arc<dyn ChangeObserver>),
    Channel(Sender<ChangeEvent>),
}

struct Registration {
    id: ObserverId,
    uri: String,
    notify_for_descendants: bool,
    sink: Sink,
}

/// Registry of observers keyed by resource identifier.
#[derive(Default)]
pub struct ChangeNotifier {
    registrations: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
    turns: Mutex<Turns>,
    turn_finished: Condvar,
}

/// Delivery turns handed out in write order.
#[derive(Default)]
struct Turns {
    issued: u64,
    next: u64,
    finished: BTreeSet<u64>,
}

/// Reserved slot in the delivery order.
///
/// Dropping an unused ticket gives up its turn.
#[must_use = "a reserved turn blocks later deliveries until it is used or dropped"]
pub(crate) struct DeliveryTicket<'n> {
    notifier: &'n ChangeNotifier,
    turn: u64,
}

impl DeliveryTicket<'_> {
    /// Waits for every earlier ticket, then delivers a change of `uri`.
    ///
    /// Inside an observer callback the wait is skipped: the outer delivery
    /// holds an earlier turn on this thread.
    pub(crate) fn notify(self, uri: &str) -> usize {
        if DELIVERING.with(Cell::get) {
            return self.notifier.notify(uri);
        }

        self.notifier.wait_for_turn(self.turn);
        let _delivering = DeliveringFlag::set();
        self.notifier.notify(uri)
    }
}

impl Drop for DeliveryTicket<'_> {
    fn drop(&mut self) {
        self.notifier.finish_turn(self.turn);
    }
}

/// Marks the current thread as running observer callbacks, unwinding included.
struct DeliveringFlag;

impl DeliveringFlag {
    fn set() -> Self {
        DELIVERING.with(|delivering| delivering.set(true));
        Self
    }
}

impl Drop for DeliveringFlag {
    fn drop(&mut self) {
        DELIVERING.with(|delivering| delivering.set(false));
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` for changes to `uri`.
    ///
    /// With `notify_for_descendants`, changes to identifiers below `uri`
    /// (e.g. items of a collection) are delivered too.
    pub fn register(
        &self,
        uri: &str,
        notify_for_descendants: bool,
        observer: Arc<dyn ChangeObserver>,
    ) -> ObserverId {
        self.add(uri, notify_for_descendants, Sink::Callback(observer))
    }

    /// Channel-backed registration; events queue in the returned subscription.
    pub fn subscribe(&self, uri: &str, notify_for_descendants: bool) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = self.add(uri, notify_for_descendants, Sink::Channel(sender));
        Subscription { id, receiver }
    }

    /// Removes a registration. Returns `false` when `id` was not registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut registrations = self.lock();
        let before = registrations.len();
        registrations.retain(|registration| registration.id != id);
        registrations.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    /// Delivers a change of `uri` to every matching observer.
    ///
    /// Returns the number of observers reached.
    pub fn notify(&self, uri: &str) -> usize {
        let mut callbacks = Vec::new();
        let mut delivered = 0;

        {
            let mut registrations = self.lock();
            registrations.retain(|registration| {
                if !observes(&registration.uri, registration.notify_for_descendants, uri) {
                    return true;
                }
                match &registration.sink {
                    Sink::Callback(observer) => {
                        callbacks.push(Arc::clone(observer));
                        true
                    }
                    Sink::Channel(sender) => {
                        let alive = sender
                            .send(ChangeEvent {
                                uri: uri.to_string(),
                            })
                            .is_ok();
                        if alive {
                            delivered += 1;
                        }
                        alive
                    }
                }
            });
        }

        for observer in &callbacks {
            observer.on_change(uri);
        }
        delivered += callbacks.len();

        debug!("event=change_notify module=provider status=ok observers={delivered}");
        delivered
    }

    /// Reserves the next delivery turn. Call while the write is still exclusive.
    pub(crate) fn reserve(&self) -> DeliveryTicket<'_> {
        let mut turns = self.turns();
        let turn = turns.issued;
        turns.issued += 1;
        DeliveryTicket {
            notifier: self,
            turn,
        }
    }

    fn wait_for_turn(&self, turn: u64) {
        let turns = self.turns();
        let _turns = self
            .turn_finished
            .wait_while(turns, |turns| turns.next != turn)
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn finish_turn(&self, turn: u64) {
        let mut guard = self.turns();
        let turns = &mut *guard;
        turns.finished.insert(turn);
        while turns.finished.remove(&turns.next) {
            turns.next += 1;
        }
        drop(guard);
        self.turn_finished.notify_all();
    }

    fn turns(&self) -> MutexGuard<'_, Turns> {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, uri: &str, notify_for_descendants: bool, sink: Sink) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Registration {
            id,
            uri: normalize(uri).to_string(),
            notify_for_descendants,
            sink,
        });
        id
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Registration>> {
        // The list stays consistent even if a holder panicked mid-retain.
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving end of [`ChangeNotifier::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: ObserverId,
    receiver: Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next queued event, without blocking.
    pub fn try_next(&self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Drains every event queued so far.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Whether an observer at `registered` sees a change at `changed`.
fn observes(registered: &str, notify_for_descendants: bool, changed: &str) -> bool {
    let changed = normalize(changed);
    if registered == changed || is_descendant(registered, changed) {
        return true;
    }
    notify_for_descendants && is_descendant(changed, registered)
}

fn is_descendant(uri: &str, ancestor: &str) -> bool {
    uri.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn normalize(uri: &str) -> &str {
    uri.strip_suffix('/').unwrap_or(uri)
}
