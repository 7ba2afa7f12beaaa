//! One transmission attempt, from a freshly built frame to its confirmation.
//!
//! Each phase is its own type, so an attempt can only move forward:
//! `SendAttempt` (constructed) -> `Serialized` -> `Submitted` -> `SendOutcome`.
//! A new sampling tick always starts a new attempt.

use std::fmt;

use nodelink_core::{FRAME_SIZE, Frame, PeerAddress};
use tokio::sync::oneshot;

use crate::link::LinkError;

/// Local correlation id for an attempt. Never sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u32);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Constructed,
    Serialized,
    Submitted,
    Confirmed,
    Failed,
}

#[derive(Debug)]
pub struct SendAttempt {
    id: AttemptId,
    dest: PeerAddress,
    frame: Frame,
}

impl SendAttempt {
    pub fn new(id: AttemptId, dest: PeerAddress, frame: Frame) -> Self {
        Self { id, dest, frame }
    }

    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn state(&self) -> AttemptState {
        AttemptState::Constructed
    }

    /// Lay the frame out into its own wire buffer.
    pub fn serialize(self) -> Serialized {
        Serialized {
            id: self.id,
            dest: self.dest,
            bytes: self.frame.to_bytes(),
        }
    }
}

#[derive(Debug)]
pub struct Serialized {
    pub(crate) id: AttemptId,
    pub(crate) dest: PeerAddress,
    pub(crate) bytes: [u8; FRAME_SIZE],
}

impl Serialized {
    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn dest(&self) -> PeerAddress {
        self.dest
    }

    pub fn bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.bytes
    }

    pub fn state(&self) -> AttemptState {
        AttemptState::Serialized
    }
}

/// Handle to an attempt that has been handed to the link.
///
/// Dropping it does not cancel the transmission; the outcome is still
/// reported on the transport's send-result stream.
#[derive(Debug)]
pub struct Submitted {
    pub(crate) id: AttemptId,
    pub(crate) dest: PeerAddress,
    pub(crate) completion: oneshot::Receiver<SendOutcome>,
}

impl Submitted {
    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn dest(&self) -> PeerAddress {
        self.dest
    }

    pub fn state(&self) -> AttemptState {
        AttemptState::Submitted
    }

    /// Wait for the link to confirm or fail the transmission.
    pub async fn outcome(self) -> SendOutcome {
        self.completion
            .await
            .unwrap_or(SendOutcome::Failed(LinkError::Closed))
    }
}

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Confirmed,
    Failed(LinkError),
}

impl SendOutcome {
    pub fn state(&self) -> AttemptState {
        match self {
            SendOutcome::Confirmed => AttemptState::Confirmed,
            SendOutcome::Failed(_) => AttemptState::Failed,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, SendOutcome::Confirmed)
    }
}

/// Outcome of one attempt, as published on the send-result stream.
#[derive(Debug, Clone)]
pub struct SendReport {
    pub attempt: AttemptId,
    pub dest: PeerAddress,
    pub outcome: SendOutcome,
}
