//! In-process transport: one consent responder task per party, reached
//! through bounded tokio channels.
//!
//! ```text
//!  ProposalProtocol ──ChannelSession.send()──▶ mpsc ──▶ responder task
//!        ▲                                                   │
//!        └─────────────────── oneshot reply ◀── ConsentProtocol::respond()
//! ```
//!
//! Each incoming request gets a fresh [`ConsentProtocol`], so sessions
//! never share state.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;
use rems_types::{PartyId, ProtocolConfig, RemsError, Result};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::consent::{AcceptAll, ConsentPolicy, ConsentProtocol};
use crate::party::Party;
use crate::session::{ConsentReply, Counterparties, ProposalRequest, Session};

struct Envelope {
    request: ProposalRequest,
    reply: oneshot::Sender<ConsentReply>,
}

/// Registry of in-process responders, addressable by [`PartyId`].
pub struct LocalNetwork {
    responders: RwLock<HashMap<PartyId, mpsc::Sender<Envelope>>>,
    config: ProtocolConfig,
}

impl LocalNetwork {
    #[must_use]
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            responders: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Start a responder for `party` that endorses whatever the rules accept.
    ///
    /// Must be called from within a tokio runtime.
    pub fn join(&self, party: Arc<Party>) -> JoinHandle<()> {
        self.join_with_policy(party, Arc::new(AcceptAll))
    }

    /// Start a responder for `party` with an extra acceptance policy.
    ///
    /// Replaces any responder previously registered for the same party.
    pub fn join_with_policy(
        &self,
        party: Arc<Party>,
        policy: Arc<dyn ConsentPolicy>,
    ) -> JoinHandle<()> {
        let (tx, rx) = mpsc::channel(self.config.session_buffer.max(1));
        self.responders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(party.id(), tx);
        tracing::debug!(party = %party.id(), "responder joined");
        tokio::spawn(serve(party, policy, rx))
    }

    /// Stop routing requests to `party`. Its responder exits once drained.
    pub fn leave(&self, party: &PartyId) -> bool {
        self.responders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(party)
            .is_some()
    }

    #[must_use]
    pub fn is_reachable(&self, party: &PartyId) -> bool {
        self.responders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(party)
    }
}

impl Counterparties for LocalNetwork {
    fn open_session(&self, party: PartyId) -> Result<Box<dyn Session>> {
        let sender = self
            .responders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&party)
            .cloned()
            .ok_or(RemsError::UnknownCounterparty(party))?;
        Ok(Box::new(ChannelSession { party, sender }))
    }
}

/// Session over the responder's request channel.
struct ChannelSession {
    party: PartyId,
    sender: mpsc::Sender<Envelope>,
}

#[async_trait]
impl Session for ChannelSession {
    fn counterparty(&self) -> PartyId {
        self.party
    }

    async fn send(&self, request: ProposalRequest) -> Result<ConsentReply> {
        let (reply, answer) = oneshot::channel();
        self.sender
            .send(Envelope { request, reply })
            .await
            .map_err(|_| RemsError::SessionClosed(self.party))?;
        answer.await.map_err(|_| RemsError::SessionClosed(self.party))
    }
}

async fn serve(
    party: Arc<Party>,
    policy: Arc<dyn ConsentPolicy>,
    mut rx: mpsc::Receiver<Envelope>,
) {
    while let Some(Envelope { request, reply }) = rx.recv().await {
        let mut consent = ConsentProtocol::with_policy(party.clone(), policy.clone());
        let answer = consent.respond(&request);
        if reply.send(answer).is_err() {
            tracing::debug!(
                party = %party.id(),
                initiator = %request.initiator,
                "initiator abandoned session"
            );
        }
    }
    tracing::debug!(party = %party.id(), "responder stopped");
}
