//! The single-threaded cooperative socket event dispatcher (§4.3, §5). One
//! dispatcher owns a list of socket events; each tick offers read/write
//! readiness and fires timeouts in list order. Cross-thread callers wake the
//! dispatcher through a [`WakeupHandle`] rather than touching the event list
//! directly, since only the dispatcher's own thread ever mutates it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use openrti_buffer::ProtocolError;
use tokio::sync::{mpsc, Notify};

/// What a [`SocketEvent`]'s underlying socket was ready for.
#[derive(Debug, Clone, Copy, Default)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

/// One socket's participation in the dispatcher. Implementors own their
/// socket; erasing the event from the dispatcher is the only way to close
/// it (§5 "Resource lifecycle").
#[async_trait]
pub trait SocketEvent: Send {
    fn wants_read(&self) -> bool;
    fn wants_write(&self) -> bool;

    /// `None` means no timeout is armed.
    fn deadline(&self) -> Option<Instant> {
        None
    }

    /// Waits until the socket is readable and/or writable per
    /// [`wants_read`]/[`wants_write`]. Implementations typically delegate to
    /// `tokio`'s own per-socket readiness (`TcpStream::ready`, ...).
    async fn ready(&mut self) -> std::io::Result<Readiness>;

    async fn on_read(&mut self) -> Result<(), ProtocolError>;
    async fn on_write(&mut self) -> Result<(), ProtocolError>;

    /// Fired once per elapsed deadline; the event should reschedule or
    /// erase itself on its next `wants_read`/`wants_write`/`deadline` query.
    fn on_timeout(&mut self) {}

    /// Fired when a callback errors or the readiness wait fails. The event
    /// is erased from the dispatcher immediately afterwards.
    fn on_error(&mut self, err: &ProtocolError) {
        let _ = err;
    }
}

/// Opaque handle returned by [`Dispatcher::insert`]; required by
/// [`Dispatcher::erase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

/// A way to hand the dispatcher a new [`SocketEvent`] from outside its own
/// `exec` loop, such as an accept-loop task producing one event per inbound
/// connection. Generalizes the same "enqueue, then the
/// dispatcher's own thread drains it" shape §5 describes for cross-thread
/// message delivery, applied here to event insertion instead of message
/// delivery.
#[derive(Clone)]
pub struct InsertHandle {
    tx: mpsc::UnboundedSender<Box<dyn SocketEvent>>,
    notify: Arc<Notify>,
}

impl InsertHandle {
    /// Queues `event` for insertion on the dispatcher's own thread at the
    /// start of its next tick, and pokes the dispatcher awake in case it is
    /// currently blocked on `exec`'s `tokio::select!` with nothing else
    /// pending. Silently dropped if the dispatcher itself has already been
    /// torn down.
    pub fn insert(&self, event: Box<dyn SocketEvent>) {
        let _ = self.tx.send(event);
        self.notify.notify_one();
    }
}

/// The cross-thread half of the wakeup self-pipe (§4.3 "Cross-thread
/// wakeup", §5). Calling [`wake_up`] is idempotent and cheap: repeated
/// calls before the dispatcher drains them coalesce into a single
/// wakeup, matching "exactly one write-side byte is pending at a time".
///
/// [`wake_up`]: WakeupHandle::wake_up
#[derive(Clone)]
pub struct WakeupHandle {
    notify: Arc<Notify>,
    done: Arc<AtomicBool>,
}

impl WakeupHandle {
    pub fn wake_up(&self) {
        self.done.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }
}

/// A single-threaded reactor over a list of [`SocketEvent`]s.
pub struct Dispatcher {
    events: Vec<(EventId, Box<dyn SocketEvent>)>,
    next_id: u64,
    notify: Arc<Notify>,
    done: Arc<AtomicBool>,
    insert_tx: mpsc::UnboundedSender<Box<dyn SocketEvent>>,
    insert_rx: mpsc::UnboundedReceiver<Box<dyn SocketEvent>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        let (insert_tx, insert_rx) = mpsc::unbounded_channel();
        Self {
            events: Vec::new(),
            next_id: 0,
            notify: Arc::new(Notify::new()),
            done: Arc::new(AtomicBool::new(false)),
            insert_tx,
            insert_rx,
        }
    }

    #[must_use]
    pub fn wakeup_handle(&self) -> WakeupHandle {
        WakeupHandle {
            notify: Arc::clone(&self.notify),
            done: Arc::clone(&self.done),
        }
    }

    /// A handle other tasks (an accept loop, most commonly) can use to add
    /// events without borrowing the dispatcher itself.
    #[must_use]
    pub fn insert_handle(&self) -> InsertHandle {
        InsertHandle {
            tx: self.insert_tx.clone(),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Attaches `event`, at most once. Returns the id needed to [`erase`] it.
    ///
    /// [`erase`]: Dispatcher::erase
    pub fn insert(&mut self, event: Box<dyn SocketEvent>) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push((id, event));
        id
    }

    /// Detaches the event with `id`, if still present. No-op otherwise.
    pub fn erase(&mut self, id: EventId) {
        self.events.retain(|(event_id, _)| *event_id != id);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Runs ticks until `deadline`, a [`WakeupHandle::wake_up`] call, or the
    /// event set becomes empty, whichever comes first. Events queued
    /// through an [`InsertHandle`] (typically an accept loop handing off a
    /// freshly accepted connection) are spliced in at the start of every
    /// tick, so the event set only counts as empty once no insert is either
    /// pending or still possible to arrive.
    pub async fn exec(&mut self, deadline: Instant) {
        self.done.store(false, Ordering::SeqCst);
        loop {
            while let Ok(event) = self.insert_rx.try_recv() {
                self.insert(event);
            }
            if self.done.load(Ordering::SeqCst) {
                return;
            }
            if Instant::now() >= deadline {
                return;
            }
            if self.events.is_empty() {
                let notify = Arc::clone(&self.notify);
                tokio::select! {
                    biased;
                    () = notify.notified() => {}
                    Some(event) = self.insert_rx.recv() => self.insert(event),
                    () = tokio::time::sleep_until(deadline.into()) => return,
                }
                continue;
            }

            let earliest_timeout = self
                .events
                .iter()
                .filter_map(|(_, event)| event.deadline())
                .min();
            let wake_at = match earliest_timeout {
                Some(t) if t < deadline => t,
                _ => deadline,
            };

            let notify = Arc::clone(&self.notify);
            let done = Arc::clone(&self.done);

            let mut ready_futures: FuturesUnordered<BoxFuture<'_, (usize, std::io::Result<Readiness>)>> =
                self.events
                    .iter_mut()
                    .enumerate()
                    .filter(|(_, (_, event))| event.wants_read() || event.wants_write())
                    .map(|(index, (_, event))| async move { (index, event.ready().await) }.boxed())
                    .collect();
            let has_pending_io = !ready_futures.is_empty();

            tokio::select! {
                biased;

                () = notify.notified() => {
                    drop(ready_futures);
                    if done.load(Ordering::SeqCst) {
                        return;
                    }
                }
                () = tokio::time::sleep_until(wake_at.into()) => {
                    drop(ready_futures);
                    self.dispatch_timeouts();
                }
                Some((index, result)) = ready_futures.next(), if has_pending_io => {
                    drop(ready_futures);
                    self.dispatch_ready(index, result).await;
                }
            }
        }
    }

    fn dispatch_timeouts(&mut self) {
        let now = Instant::now();
        let expired: Vec<EventId> = self
            .events
            .iter()
            .filter(|(_, event)| event.deadline().is_some_and(|d| d <= now))
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some((_, event)) = self.events.iter_mut().find(|(i, _)| *i == id) {
                event.on_timeout();
            }
        }
    }

    async fn dispatch_ready(&mut self, index: usize, result: std::io::Result<Readiness>) {
        if index >= self.events.len() {
            return;
        }
        let readiness = match result {
            Ok(readiness) => readiness,
            Err(err) => {
                tracing::debug!(error = %err, "socket readiness wait failed; erasing event");
                let (id, event) = &mut self.events[index];
                let id = *id;
                event.on_error(&ProtocolError::other(err.to_string()));
                self.erase(id);
                return;
            }
        };

        let (id, event) = &mut self.events[index];
        let id = *id;

        if readiness.readable && event.wants_read() {
            if let Err(err) = event.on_read().await {
                tracing::debug!(%err, "on_read failed; erasing event");
                event.on_error(&err);
                self.erase(id);
                return;
            }
        }
        if let Some((_, event)) = self.events.iter_mut().find(|(i, _)| *i == id) {
            if readiness.writable && event.wants_write() {
                if let Err(err) = event.on_write().await {
                    tracing::debug!(%err, "on_write failed; erasing event");
                    event.on_error(&err);
                    self.erase(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingEvent {
        reads_remaining: usize,
        read_count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SocketEvent for CountingEvent {
        fn wants_read(&self) -> bool {
            self.reads_remaining > 0
        }
        fn wants_write(&self) -> bool {
            false
        }
        async fn ready(&mut self) -> std::io::Result<Readiness> {
            Ok(Readiness {
                readable: true,
                writable: false,
            })
        }
        async fn on_read(&mut self) -> Result<(), ProtocolError> {
            self.reads_remaining -= 1;
            self.read_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn on_write(&mut self) -> Result<(), ProtocolError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn exec_returns_when_event_set_is_empty() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .exec(Instant::now() + std::time::Duration::from_millis(50))
            .await;
        assert!(dispatcher.is_empty());
    }

    #[tokio::test]
    async fn exec_services_a_ready_event_until_it_stops_wanting_reads() {
        let mut dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.insert(Box::new(CountingEvent {
            reads_remaining: 3,
            read_count: Arc::clone(&count),
        }));

        dispatcher
            .exec(Instant::now() + std::time::Duration::from_millis(200))
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wake_up_from_another_task_stops_exec_promptly() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.insert(Box::new(CountingEvent {
            reads_remaining: usize::MAX,
            read_count: Arc::new(AtomicUsize::new(0)),
        }));
        let wakeup = dispatcher.wakeup_handle();

        let start = Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            wakeup.wake_up();
        });
        dispatcher
            .exec(Instant::now() + std::time::Duration::from_secs(30))
            .await;
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn erase_removes_event_from_future_ticks() {
        let mut dispatcher = Dispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = dispatcher.insert(Box::new(CountingEvent {
            reads_remaining: usize::MAX,
            read_count: Arc::clone(&count),
        }));
        dispatcher.erase(id);
        assert!(dispatcher.is_empty());
    }
}
