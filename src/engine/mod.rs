pub mod availability;
mod bookings;
mod error;
mod queries;
mod waitlist;

pub use availability::{SLOTS_CLOSE, SLOTS_OPEN};
pub use error::{EngineError, ResourceKind};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::catalog::Catalog;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedTimeline = Arc<RwLock<Timeline>>;
pub type SharedQueue = Arc<RwLock<Vec<WaitlistEntry>>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

// ── Engine ───────────────────────────────────────────────

/// The reservation engine: availability verification across courts,
/// equipment pools and coaches, atomic multi-resource booking commit,
/// deterministic pricing, and per-slot waitlists with promotion on
/// release. Catalog entities are read through the [`Catalog`] boundary;
/// all engine state is reconstructable from the WAL.
pub struct Engine {
    pub catalog: Arc<dyn Catalog>,
    pub notify: Arc<NotifyHub>,
    /// Booking records by id. Never removed; status flips to Cancelled.
    pub(super) bookings: DashMap<Ulid, Booking>,
    /// Per-resource allocation timelines (confirmed bookings only).
    pub(super) timelines: DashMap<Ulid, SharedTimeline>,
    /// Per-slot waitlist queues, ordered by position.
    pub(super) waitlists: DashMap<SlotKey, SharedQueue>,
    /// Reverse lookup: waitlist entry id → slot key.
    pub(super) entry_to_slot: DashMap<Ulid, SlotKey>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
}

impl Engine {
    pub fn new(
        wal_path: PathBuf,
        catalog: Arc<dyn Catalog>,
        notify: Arc<NotifyHub>,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            catalog,
            notify,
            bookings: DashMap::new(),
            timelines: DashMap::new(),
            waitlists: DashMap::new(),
            entry_to_slot: DashMap::new(),
            wal_tx,
        };

        // Replay — we're the sole owner of the lock Arcs here, so try_write
        // always succeeds instantly. Never use blocking_write: this may run
        // inside an async context.
        for event in events {
            engine.apply_replay(event);
        }

        Ok(engine)
    }

    /// Apply one replayed event. Mirrors exactly what the live mutation
    /// paths do after their WAL append, so restart converges on the same
    /// state.
    fn apply_replay(&self, event: Event) {
        match event {
            Event::BookingCreated { booking } => {
                if booking.is_confirmed() {
                    for (resource_id, units) in booking.allocations() {
                        let tl = self.timeline_handle(resource_id);
                        let mut guard = tl.try_write().expect("replay: uncontended write");
                        guard.insert(Allocation {
                            booking_id: booking.id,
                            window: booking.window,
                            units,
                        });
                    }
                }
                self.bookings.insert(booking.id, booking);
            }
            Event::BookingCancelled { id } => {
                if let Some(mut booking) = self.bookings.get_mut(&id) {
                    if !booking.is_confirmed() {
                        return; // double-cancel replay — already done
                    }
                    booking.status = BookingStatus::Cancelled;
                    let allocations = booking.allocations();
                    drop(booking);
                    for (resource_id, _) in allocations {
                        if let Some(tl) = self.get_timeline(&resource_id) {
                            let mut guard = tl.try_write().expect("replay: uncontended write");
                            guard.remove_booking(id);
                        }
                    }
                }
            }
            Event::WaitlistJoined { entry } => {
                let key = entry.slot_key();
                let queue = self.queue_handle(&key);
                let mut guard = queue.try_write().expect("replay: uncontended write");
                self.entry_to_slot.insert(entry.id, key);
                guard.push(entry);
            }
            Event::WaitlistLeft { id } => {
                if let Some((_, key)) = self.entry_to_slot.remove(&id)
                    && let Some(queue) = self.get_queue(&key)
                {
                    let mut guard = queue.try_write().expect("replay: uncontended write");
                    waitlist::remove_and_renumber(&mut guard, id);
                }
            }
            Event::WaitlistPromoted { entry } => {
                if let Some(queue) = self.get_queue(&entry.slot_key()) {
                    let mut guard = queue.try_write().expect("replay: uncontended write");
                    if let Some(stored) = guard.iter_mut().find(|e| e.id == entry.id) {
                        stored.notified = true;
                    }
                }
            }
        }
    }

    /// Write an event through the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Wal(e.to_string()))
    }

    /// Timeline for a resource, created lazily. Resources live in the
    /// catalog; the engine only tracks their allocations.
    pub(super) fn timeline_handle(&self, resource_id: Ulid) -> SharedTimeline {
        self.timelines
            .entry(resource_id)
            .or_insert_with(|| Arc::new(RwLock::new(Timeline::new(resource_id))))
            .value()
            .clone()
    }

    pub(super) fn get_timeline(&self, resource_id: &Ulid) -> Option<SharedTimeline> {
        self.timelines.get(resource_id).map(|e| e.value().clone())
    }

    pub(super) fn queue_handle(&self, key: &SlotKey) -> SharedQueue {
        self.waitlists
            .entry(*key)
            .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
            .value()
            .clone()
    }

    pub(super) fn get_queue(&self, key: &SlotKey) -> Option<SharedQueue> {
        self.waitlists.get(key).map(|e| e.value().clone())
    }

    /// Rewrite the WAL as a snapshot of current records. Events carry full
    /// records, so the snapshot is just every booking and waitlist entry.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();
        for entry in self.bookings.iter() {
            events.push(Event::BookingCreated {
                booking: entry.value().clone(),
            });
        }
        for queue in self.waitlists.iter() {
            let guard = queue.value().try_read().ok();
            let Some(guard) = guard else {
                // Queue busy — skip this compaction round rather than block.
                return Err(EngineError::Wal("waitlist busy during compaction".into()));
            };
            for e in guard.iter() {
                events.push(Event::WaitlistJoined { entry: e.clone() });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Wal(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
