//! Multicast transport seam.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::ActorId;

/// Metadata delivered with every replicated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderInfo {
    /// Sending actor, if it has one.
    pub actor: Option<ActorId>,
    /// Whether the sender is the authoritative peer.
    pub authoritative: bool,
    /// Sender's timestamp.
    pub sent_at: Duration,
}

/// Ordered multicast to every peer, including the sender.
pub trait Transport {
    /// Send `payload` to all peers under `message`.
    fn broadcast(&mut self, message: &'static str, payload: Vec<u8>);

    /// Actor id of this peer.
    fn local_actor(&self) -> Option<ActorId>;
}

/// A message waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub message: &'static str,
    pub payload: Vec<u8>,
    pub sender: SenderInfo,
}

/// In-process transport that delivers broadcasts back to the local peer.
#[derive(Debug)]
pub struct LoopbackTransport {
    actor: Option<ActorId>,
    authoritative: bool,
    started: Instant,
    queue: VecDeque<Envelope>,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new(actor: Option<ActorId>, authoritative: bool) -> Self {
        Self {
            actor,
            authoritative,
            started: Instant::now(),
            queue: VecDeque::new(),
        }
    }

    /// Take every queued message in send order.
    pub fn drain(&mut self) -> impl Iterator<Item = Envelope> + '_ {
        self.queue.drain(..)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Transport for LoopbackTransport {
    fn broadcast(&mut self, message: &'static str, payload: Vec<u8>) {
        self.queue.push_back(Envelope {
            message,
            payload,
            sender: SenderInfo {
                actor: self.actor,
                authoritative: self.authoritative,
                sent_at: self.started.elapsed(),
            },
        });
    }

    fn local_actor(&self) -> Option<ActorId> {
        self.actor
    }
}
