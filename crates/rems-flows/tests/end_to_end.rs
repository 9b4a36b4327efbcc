//! End-to-end tests: proposal, consent, and sequencing together.
//!
//! Every party runs a real consent responder on a [`LocalNetwork`] and
//! shares one [`InMemoryLedger`] as lookup and sequencer. Scripted
//! sessions stand in for counterparties that hang or misbehave.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use rems_flows::{
    ConsentProtocol, ConsentReply, Counterparties, DeclineKinds, InMemoryLedger, LocalNetwork,
    Lookup, Party, ProposalPhase, ProposalProtocol, ProposalRequest, Sequencer, Session,
    SubmitOutcome,
};
use rems_types::{
    Command, CommittedTransition, LiveTitle, PartyId, ProtocolConfig, Rejection, RemsError, Result,
    SignedTransition, TitleId, TitleState, TransitionKind,
};

/// Helper: one process hosting a ledger and a set of parties.
struct Deployment {
    ledger: Arc<InMemoryLedger>,
    network: Arc<LocalNetwork>,
    config: ProtocolConfig,
}

impl Deployment {
    fn new() -> Self {
        let config = ProtocolConfig {
            endorsement_timeout_ms: 2_000,
            ..ProtocolConfig::default()
        };
        Self {
            ledger: Arc::new(InMemoryLedger::new()),
            network: Arc::new(LocalNetwork::new(config.clone())),
            config,
        }
    }

    fn join(&self, seed: u8) -> Arc<Party> {
        let party = Arc::new(Party::from_seed([seed; 32]));
        self.network.join(party.clone());
        party
    }

    fn join_declining(&self, seed: u8, kinds: Vec<TransitionKind>) -> Arc<Party> {
        let party = Arc::new(Party::from_seed([seed; 32]));
        self.network
            .join_with_policy(party.clone(), Arc::new(DeclineKinds(kinds)));
        party
    }

    fn protocol(
        &self,
        party: &Arc<Party>,
    ) -> ProposalProtocol<InMemoryLedger, InMemoryLedger, LocalNetwork> {
        ProposalProtocol::new(
            party.clone(),
            self.ledger.clone(),
            self.ledger.clone(),
            self.network.clone(),
            self.config.clone(),
        )
    }

    async fn run(&self, party: &Arc<Party>, command: Command) -> Result<CommittedTransition> {
        self.protocol(party).run(command).await
    }

    async fn register(&self, owner: &Arc<Party>, address: &str) -> TitleState {
        let committed = self
            .run(
                owner,
                Command::Register {
                    address: address.into(),
                },
            )
            .await
            .expect("register should commit");
        committed.transition().outputs[0].clone()
    }

    async fn live_title(&self, id: TitleId) -> LiveTitle {
        self.ledger
            .find_unconsumed(id)
            .await
            .expect("title should be live")
    }

    async fn live(&self, id: TitleId) -> TitleState {
        self.live_title(id).await.state
    }

    /// Proposal whose lookup keeps answering with `stale`.
    fn stale_protocol(
        &self,
        party: &Arc<Party>,
        stale: LiveTitle,
    ) -> ProposalProtocol<StaleLookup, InMemoryLedger, LocalNetwork> {
        ProposalProtocol::new(
            party.clone(),
            Arc::new(StaleLookup(stale)),
            self.ledger.clone(),
            self.network.clone(),
            self.config.clone(),
        )
    }
}

/// Lookup that keeps answering with a state the ledger has since consumed.
struct StaleLookup(LiveTitle);

#[async_trait]
impl Lookup for StaleLookup {
    async fn find_unconsumed(&self, id: TitleId) -> Option<LiveTitle> {
        (self.0.state.id == id).then(|| self.0.clone())
    }
}

/// Sequencer that refuses everything it is handed.
struct RefusingSequencer;

#[async_trait]
impl Sequencer for RefusingSequencer {
    async fn submit(&self, _signed: SignedTransition) -> SubmitOutcome {
        SubmitOutcome::Invalid {
            reason: "ledger is read-only".into(),
        }
    }
}

/// Sets its flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone)]
enum Script {
    /// Never answers; raises the flag once the pending send is dropped.
    Hang(Arc<AtomicBool>),
    /// Refuses immediately.
    Reject,
}

struct ScriptedSession {
    party: PartyId,
    script: Script,
}

#[async_trait]
impl Session for ScriptedSession {
    fn counterparty(&self) -> PartyId {
        self.party
    }

    async fn send(&self, _request: ProposalRequest) -> Result<ConsentReply> {
        match &self.script {
            Script::Hang(dropped) => {
                let _guard = DropFlag(dropped.clone());
                futures::future::pending().await
            }
            Script::Reject => Ok(ConsentReply::Rejected {
                party: self.party,
                reason: "not today".into(),
                rule: None,
            }),
        }
    }
}

struct ScriptedNetwork(HashMap<PartyId, Script>);

impl Counterparties for ScriptedNetwork {
    fn open_session(&self, party: PartyId) -> Result<Box<dyn Session>> {
        let script = self
            .0
            .get(&party)
            .cloned()
            .ok_or(RemsError::UnknownCounterparty(party))?;
        Ok(Box::new(ScriptedSession { party, script }))
    }
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_needs_only_the_owner() {
    let net = Deployment::new();
    let alice = net.join(1);

    let mut proposal = net.protocol(&alice);
    let committed = proposal
        .run(Command::Register {
            address: "1 Harbour Road".into(),
        })
        .await
        .unwrap();

    assert_eq!(proposal.phase(), &ProposalPhase::Finalized);
    let tx = committed.transition();
    assert!(tx.inputs.is_empty());
    assert_eq!(tx.outputs[0].owner, alice.id());
    assert_eq!(tx.outputs[0].tenant, None);
    assert_eq!(committed.signed.endorsed_by(), [alice.id()].into());
    committed.signed.verify_required_signatures().unwrap();

    assert_eq!(net.ledger.unconsumed_for(&alice.id()).await, tx.outputs);
}

#[tokio::test]
async fn sell_moves_title_to_buyer() {
    let net = Deployment::new();
    let seller = net.join(1);
    let buyer = net.join(2);
    let title = net.register(&seller, "1 Harbour Road").await;
    let registered_at = net.ledger.live_ref(title.id).await.unwrap();

    let committed = net
        .run(
            &seller,
            Command::Sell {
                id: title.id,
                new_owner: buyer.id(),
            },
        )
        .await
        .unwrap();

    committed.signed.verify_required_signatures().unwrap();
    assert_eq!(committed.signed.endorsed_by(), [seller.id(), buyer.id()].into());

    let live = net.live(title.id).await;
    assert_eq!(live.owner, buyer.id());
    assert_eq!(live.address, title.address);
    assert!(net.ledger.is_consumed(&registered_at).await);

    // Recorded by every participant of the output, and only them.
    assert_eq!(net.ledger.unconsumed_for(&buyer.id()).await, vec![live]);
    assert!(net.ledger.unconsumed_for(&seller.id()).await.is_empty());
}

#[tokio::test]
async fn rent_then_terminate() {
    let net = Deployment::new();
    let owner = net.join(1);
    let tenant = net.join(2);
    let title = net.register(&owner, "1 Harbour Road").await;

    net.run(
        &owner,
        Command::Rent {
            id: title.id,
            new_tenant: tenant.id(),
        },
    )
    .await
    .unwrap();
    let rented = net.live(title.id).await;
    assert_eq!(rented.tenant, Some(tenant.id()));
    assert_eq!(net.ledger.unconsumed_for(&tenant.id()).await, vec![rented.clone()]);
    assert_eq!(net.ledger.unconsumed_for(&owner.id()).await, vec![rented]);

    // Either participant may initiate; here the tenant does.
    let committed = net
        .run(&tenant, Command::TerminateRent { id: title.id })
        .await
        .unwrap();
    assert_eq!(committed.signed.endorsed_by(), [owner.id(), tenant.id()].into());

    let vacated = net.live(title.id).await;
    assert_eq!(vacated.tenant, None);
    assert_eq!(vacated.owner, owner.id());
    assert!(net.ledger.unconsumed_for(&tenant.id()).await.is_empty());
}

#[tokio::test]
async fn selling_a_rented_title_keeps_the_tenant_and_needs_its_signature() {
    let net = Deployment::new();
    let owner = net.join(1);
    let tenant = net.join(2);
    let buyer = net.join(3);
    let title = net.register(&owner, "1 Harbour Road").await;
    net.run(
        &owner,
        Command::Rent {
            id: title.id,
            new_tenant: tenant.id(),
        },
    )
    .await
    .unwrap();

    let committed = net
        .run(
            &owner,
            Command::Sell {
                id: title.id,
                new_owner: buyer.id(),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        committed.transition().signers,
        [owner.id(), tenant.id(), buyer.id()].into()
    );
    committed.signed.verify_required_signatures().unwrap();
    let live = net.live(title.id).await;
    assert_eq!(live.owner, buyer.id());
    assert_eq!(live.tenant, Some(tenant.id()));
}

#[tokio::test]
async fn round_trip_sale_yields_a_fresh_state() {
    let net = Deployment::new();
    let alice = net.join(1);
    let bob = net.join(2);
    let original = net.register(&alice, "1 Harbour Road").await;
    let original_at = net.ledger.live_ref(original.id).await.unwrap();

    net.run(
        &alice,
        Command::Sell {
            id: original.id,
            new_owner: bob.id(),
        },
    )
    .await
    .unwrap();
    net.run(
        &bob,
        Command::Sell {
            id: original.id,
            new_owner: alice.id(),
        },
    )
    .await
    .unwrap();

    // Same content as the original, but the original itself stays consumed.
    let back = net.live(original.id).await;
    assert_eq!(back, original);
    assert!(net.ledger.is_consumed(&original_at).await);
    let back_at = net.ledger.live_ref(original.id).await.unwrap();
    assert_ne!(back_at, original_at);
    assert!(!net.ledger.is_consumed(&back_at).await);

    // And it can move again.
    net.run(
        &alice,
        Command::Rent {
            id: original.id,
            new_tenant: bob.id(),
        },
    )
    .await
    .unwrap();

    let history = net.ledger.history(original.id).await;
    let sequences: Vec<u64> = history.iter().map(|c| c.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3]);
    let kinds: Vec<_> = history.iter().map(|c| c.transition().kinds[0]).collect();
    assert_eq!(
        kinds,
        vec![
            TransitionKind::Register,
            TransitionKind::Sell,
            TransitionKind::Sell,
            TransitionKind::Rent
        ]
    );
}

#[tokio::test]
async fn ownership_chain_with_tenancy() {
    let net = Deployment::new();
    let alice = net.join(1);
    let bob = net.join(2);
    let carol = net.join(3);
    let dave = net.join(4);
    let title = net.register(&alice, "1 Harbour Road").await;

    net.run(
        &alice,
        Command::Sell {
            id: title.id,
            new_owner: bob.id(),
        },
    )
    .await
    .unwrap();
    net.run(
        &bob,
        Command::Rent {
            id: title.id,
            new_tenant: carol.id(),
        },
    )
    .await
    .unwrap();

    // A second tenant is refused locally, before anyone is asked.
    let mut second = net.protocol(&bob);
    let err = second
        .run(Command::Rent {
            id: title.id,
            new_tenant: dave.id(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.rejection(), Some(Rejection::RentPreviousTenant));
    assert!(matches!(second.phase(), ProposalPhase::Failed(_)));
    assert_eq!(net.ledger.len().await, 3);

    net.run(&carol, Command::TerminateRent { id: title.id })
        .await
        .unwrap();
    net.run(
        &bob,
        Command::Rent {
            id: title.id,
            new_tenant: dave.id(),
        },
    )
    .await
    .unwrap();

    let live = net.live(title.id).await;
    assert_eq!(live.owner, bob.id());
    assert_eq!(live.tenant, Some(dave.id()));
    assert!(net.ledger.unconsumed_for(&alice.id()).await.is_empty());
    assert!(net.ledger.unconsumed_for(&carol.id()).await.is_empty());
}

#[tokio::test]
async fn request_survives_the_wire() {
    let owner = Arc::new(Party::from_seed([1; 32]));
    let tenant = Arc::new(Party::from_seed([2; 32]));
    let input = TitleState::register(owner.id(), "1 Harbour Road");
    let output = input.with_tenant(Some(tenant.id()));
    let transition = rems_types::Transition::new(
        TransitionKind::Rent,
        vec![input],
        vec![output],
        [owner.id(), tenant.id()].into(),
    );
    let request = ProposalRequest {
        initiator: owner.id(),
        transition,
    };

    let json = serde_json::to_string(&request).unwrap();
    let received: ProposalRequest = serde_json::from_str(&json).unwrap();
    let reply = ConsentProtocol::new(tenant).respond(&received);

    let json = serde_json::to_string(&reply).unwrap();
    let reply: ConsentReply = serde_json::from_str(&json).unwrap();
    let ConsentReply::Endorsed(endorsement) = reply else {
        panic!("expected an endorsement");
    };
    endorsement.verify(&request.transition.hash()).unwrap();
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_title_is_not_found() {
    let net = Deployment::new();
    let alice = net.join(1);
    let bob = net.join(2);
    let missing = TitleId::new();

    let err = net
        .run(
            &alice,
            Command::Sell {
                id: missing,
                new_owner: bob.id(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RemsError::TitleNotFound(id) if id == missing));
}

#[tokio::test]
async fn outsider_cannot_initiate() {
    let net = Deployment::new();
    let owner = net.join(1);
    let tenant = net.join(2);
    let mallory = net.join(3);
    let title = net.register(&owner, "1 Harbour Road").await;

    let err = net
        .run(
            &mallory,
            Command::Rent {
                id: title.id,
                new_tenant: tenant.id(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RemsError::NotARequiredSigner(p) if p == mallory.id()));
    assert_eq!(net.live(title.id).await, title);
}

#[tokio::test]
async fn counterparty_refusal_aborts_the_proposal() {
    let net = Deployment::new();
    let seller = net.join(1);
    let buyer = net.join_declining(2, vec![TransitionKind::Sell]);
    let title = net.register(&seller, "1 Harbour Road").await;

    let mut proposal = net.protocol(&seller);
    let err = proposal
        .run(Command::Sell {
            id: title.id,
            new_owner: buyer.id(),
        })
        .await
        .unwrap_err();

    let RemsError::CounterpartyRejected { party, reason } = err else {
        panic!("expected a counterparty rejection, got {err}");
    };
    assert_eq!(party, buyer.id());
    assert!(reason.contains("SELL"), "Got: {reason}");
    assert!(matches!(proposal.phase(), ProposalPhase::Failed(_)));
    assert_eq!(net.live(title.id).await, title);
}

#[tokio::test]
async fn unreachable_counterparty_is_reported() {
    let net = Deployment::new();
    let seller = net.join(1);
    let offline = PartyId::from_seed(2);
    let title = net.register(&seller, "1 Harbour Road").await;

    let err = net
        .run(
            &seller,
            Command::Sell {
                id: title.id,
                new_owner: offline,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RemsError::UnknownCounterparty(p) if p == offline));
}

#[tokio::test]
async fn stale_input_is_a_conflict() {
    let net = Deployment::new();
    let alice = net.join(1);
    let bob = net.join(2);
    let carol = net.join(3);
    let original = net.register(&alice, "1 Harbour Road").await;
    let stale = net.live_title(original.id).await;
    net.run(
        &alice,
        Command::Sell {
            id: original.id,
            new_owner: bob.id(),
        },
    )
    .await
    .unwrap();

    // Alice still believes she owns the title. Carol agrees; the sequencer
    // knows better.
    let mut proposal = net.stale_protocol(&alice, stale);
    let err = proposal
        .run(Command::Rent {
            id: original.id,
            new_tenant: carol.id(),
        })
        .await
        .unwrap_err();

    assert!(err.is_conflict(), "Got: {err}");
    assert!(matches!(err, RemsError::Conflict { title, .. } if title == original.id));
    assert_eq!(net.live(original.id).await.tenant, None);
}

#[tokio::test]
async fn consumed_state_cannot_be_reused_after_buy_back() {
    let net = Deployment::new();
    let alice = net.join(1);
    let bob = net.join(2);
    let carol = net.join(3);
    let original = net.register(&alice, "1 Harbour Road").await;
    let stale = net.live_title(original.id).await;

    for (from, to) in [(&alice, &bob), (&bob, &alice)] {
        net.run(
            from,
            Command::Sell {
                id: original.id,
                new_owner: to.id(),
            },
        )
        .await
        .unwrap();
    }
    let back = net.live_title(original.id).await;
    assert_eq!(back.state, stale.state);
    assert!(net.ledger.is_consumed(&stale.at).await);

    // Same content as the live state, but built on the consumed original.
    let err = net
        .stale_protocol(&alice, stale)
        .run(Command::Rent {
            id: original.id,
            new_tenant: carol.id(),
        })
        .await
        .unwrap_err();

    match err {
        RemsError::Conflict { title, reason } => {
            assert_eq!(title, original.id);
            assert!(reason.contains("already consumed"), "Got: {reason}");
        }
        other => panic!("expected a conflict, got {other}"),
    }
    assert_eq!(net.live_title(original.id).await, back);
    assert_eq!(net.ledger.len().await, 3);
}

#[tokio::test]
async fn sequencer_refusal_fails_the_proposal() {
    let net = Deployment::new();
    let seller = net.join(1);
    let buyer = net.join(2);
    let title = net.register(&seller, "1 Harbour Road").await;

    let mut proposal = ProposalProtocol::new(
        seller.clone(),
        net.ledger.clone(),
        Arc::new(RefusingSequencer),
        net.network.clone(),
        net.config.clone(),
    );
    let err = proposal
        .run(Command::Sell {
            id: title.id,
            new_owner: buyer.id(),
        })
        .await
        .unwrap_err();

    assert!(
        matches!(err, RemsError::SequencerRejected { ref reason } if reason == "ledger is read-only"),
        "Got: {err}"
    );
    assert!(!err.is_conflict());
    assert!(matches!(proposal.phase(), ProposalPhase::Failed(_)));
    assert_eq!(net.live(title.id).await, title);
}

#[tokio::test]
async fn silent_counterparty_times_out() {
    let net = Deployment::new();
    let seller = net.join(1);
    let buyer = PartyId::from_seed(2);
    let title = net.register(&seller, "1 Harbour Road").await;

    let dropped = Arc::new(AtomicBool::new(false));
    let scripted = ScriptedNetwork(HashMap::from([(buyer, Script::Hang(dropped.clone()))]));
    let config = ProtocolConfig {
        endorsement_timeout_ms: 50,
        ..ProtocolConfig::default()
    };
    let mut proposal = ProposalProtocol::new(
        seller.clone(),
        net.ledger.clone(),
        net.ledger.clone(),
        Arc::new(scripted),
        config,
    );

    let err = proposal
        .run(Command::Sell {
            id: title.id,
            new_owner: buyer,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RemsError::EndorsementTimeout(p) if p == buyer));
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(net.live(title.id).await, title);
}

#[tokio::test]
async fn first_refusal_cancels_outstanding_sessions() {
    let net = Deployment::new();
    let owner = net.join(1);
    let tenant = net.join(2);
    let buyer = PartyId::from_seed(3);
    let title = net.register(&owner, "1 Harbour Road").await;
    net.run(
        &owner,
        Command::Rent {
            id: title.id,
            new_tenant: tenant.id(),
        },
    )
    .await
    .unwrap();

    // Buyer never answers, tenant refuses. The default timeout is far longer
    // than the outer bound, so only cancellation can finish in time.
    let dropped = Arc::new(AtomicBool::new(false));
    let scripted = ScriptedNetwork(HashMap::from([
        (buyer, Script::Hang(dropped.clone())),
        (tenant.id(), Script::Reject),
    ]));
    let mut proposal = ProposalProtocol::new(
        owner.clone(),
        net.ledger.clone(),
        net.ledger.clone(),
        Arc::new(scripted),
        ProtocolConfig::default(),
    );

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        proposal.run(Command::Sell {
            id: title.id,
            new_owner: buyer,
        }),
    )
    .await
    .expect("proposal should not wait for the silent buyer")
    .unwrap_err();

    assert!(
        matches!(err, RemsError::CounterpartyRejected { party, .. } if party == tenant.id())
    );
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(net.live(title.id).await.owner, owner.id());
}

#[tokio::test]
async fn proposal_runs_once() {
    let net = Deployment::new();
    let alice = net.join(1);

    let mut proposal = net.protocol(&alice);
    proposal
        .run(Command::Register {
            address: "1 Harbour Road".into(),
        })
        .await
        .unwrap();

    let err = proposal
        .run(Command::Register {
            address: "2 Harbour Road".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RemsError::WrongPhase { .. }));
    assert_eq!(proposal.phase(), &ProposalPhase::Finalized);
    assert_eq!(net.ledger.len().await, 1);
}
