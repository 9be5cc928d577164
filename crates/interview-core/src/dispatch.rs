//! Per-user event serialization.
//!
//! Session mutation is not commutative (a photo landing mid-reset must not
//! corrupt state), so the engine requires that no two events for the same
//! user id run concurrently. The dispatcher enforces that with one worker
//! task per user id draining a bounded channel; distinct users proceed in
//! parallel, and one user's pending finish/generation sequence only delays
//! that same user's next event.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use protocol::InboundEvent;
use tokio::sync::{mpsc, Mutex};

use crate::ports::{GeneratorPort, LogSinkPort, OutboundPort};
use crate::InterviewEngine;

const WORKER_QUEUE_DEPTH: usize = 32;

pub struct Dispatcher<G: GeneratorPort, L: LogSinkPort, O: OutboundPort> {
    engine: Arc<InterviewEngine<G, L, O>>,
    /// Workers live for the process lifetime, one entry per user id ever
    /// seen. The allow-list bounds that set; an open-access deployment that
    /// expects heavy churn would want an idle timeout here.
    workers: Mutex<HashMap<i64, mpsc::Sender<InboundEvent>>>,
}

impl<G, L, O> Dispatcher<G, L, O>
where
    G: GeneratorPort + 'static,
    L: LogSinkPort + 'static,
    O: OutboundPort + 'static,
{
    pub fn new(engine: InterviewEngine<G, L, O>) -> Self {
        Self { engine: Arc::new(engine), workers: Mutex::new(HashMap::new()) }
    }

    pub fn engine(&self) -> &InterviewEngine<G, L, O> {
        &self.engine
    }

    /// Queues one event onto its user's worker, spawning the worker on first
    /// contact. Never blocks the caller: a worker whose queue is full (a user
    /// flooding events while their finish sequence drains) has the event
    /// dropped with a warn instead of stalling dispatch for everyone else.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<()> {
        let user_id = event.user().id;
        let sender = {
            let mut workers = self.workers.lock().await;
            workers.entry(user_id).or_insert_with(|| self.spawn_worker(user_id)).clone()
        };
        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id, "worker queue full, dropping event");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(anyhow::anyhow!("worker for user {} is gone", user_id))
            }
        }
    }

    fn spawn_worker(&self, user_id: i64) -> mpsc::Sender<InboundEvent> {
        let (tx, mut rx) = mpsc::channel(WORKER_QUEUE_DEPTH);
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = engine.handle(event).await {
                    tracing::warn!(user_id, error = %e, "event handling failed");
                }
            }
        });
        tx
    }
}
