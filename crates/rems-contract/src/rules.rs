//! Transition rules for the four title transition kinds.
//!
//! | Kind          | In | Out | Structure                                         | Signers                  |
//! |---------------|----|-----|---------------------------------------------------|--------------------------|
//! | Register      | 0  | 1   | no tenant                                         | {owner}                  |
//! | Sell          | 1  | 1   | owner changes, only owner, buyer ≠ old tenant     | participants(in ∪ out)   |
//! | Rent          | 1  | 1   | no old tenant, new tenant, only tenant, ≠ owner   | participants(in ∪ out)   |
//! | TerminateRent | 1  | 1   | old tenant, tenant removed, only tenant           | participants(in ∪ out)   |
//!
//! Checks run in the order listed; the first failure is returned.
//! Cardinality is always checked first so later checks can assume
//! singleton access.

use std::collections::BTreeSet;

use rems_types::{PartyId, Rejection, TitleState, Transition, TransitionKind};

/// Validate a whole transition, including that it carries exactly one kind.
///
/// Returns the kind on success.
///
/// # Errors
/// Returns the first violated [`Rejection`].
pub fn verify(transition: &Transition) -> Result<TransitionKind, Rejection> {
    let Some(kind) = transition.single_kind() else {
        let rejection = Rejection::AmbiguousKind {
            found: transition.kinds.len(),
        };
        tracing::debug!(rule = rejection.code(), "transition rejected");
        return Err(rejection);
    };

    verify_kind(
        kind,
        &transition.inputs,
        &transition.outputs,
        &transition.signers,
    )
    .inspect_err(|rejection| {
        tracing::debug!(%kind, rule = rejection.code(), "transition rejected");
    })?;
    Ok(kind)
}

/// Validate `inputs → outputs` under `kind` with the claimed `signers`.
///
/// # Errors
/// Returns the first violated [`Rejection`].
pub fn verify_kind(
    kind: TransitionKind,
    inputs: &[TitleState],
    outputs: &[TitleState],
    signers: &BTreeSet<PartyId>,
) -> Result<(), Rejection> {
    match kind {
        TransitionKind::Register => verify_register(inputs, outputs, signers),
        TransitionKind::Sell => verify_sell(inputs, outputs, signers),
        TransitionKind::Rent => verify_rent(inputs, outputs, signers),
        TransitionKind::TerminateRent => verify_terminate_rent(inputs, outputs, signers),
    }
}

/// The signer set a transition of `kind` must carry, derived from its states.
///
/// Both the initiator (to know whom to ask) and every responder (to check
/// the initiator's claim) call this; the set is never configured.
#[must_use]
pub fn required_signers(
    kind: TransitionKind,
    inputs: &[TitleState],
    outputs: &[TitleState],
) -> BTreeSet<PartyId> {
    match kind {
        TransitionKind::Register => outputs.iter().map(|s| s.owner).collect(),
        TransitionKind::Sell | TransitionKind::Rent | TransitionKind::TerminateRent => inputs
            .iter()
            .chain(outputs)
            .flat_map(TitleState::participants)
            .collect(),
    }
}

fn ensure(condition: bool, rejection: Rejection) -> Result<(), Rejection> {
    if condition { Ok(()) } else { Err(rejection) }
}

fn single(states: &[TitleState], rejection: Rejection) -> Result<&TitleState, Rejection> {
    match states {
        [state] => Ok(state),
        _ => Err(rejection),
    }
}

fn verify_register(
    inputs: &[TitleState],
    outputs: &[TitleState],
    signers: &BTreeSet<PartyId>,
) -> Result<(), Rejection> {
    ensure(inputs.is_empty(), Rejection::RegisterConsumesInputs)?;
    let output = single(outputs, Rejection::RegisterOutputCount)?;
    ensure(output.tenant.is_none(), Rejection::RegisterHasTenant)?;
    ensure(
        *signers == BTreeSet::from([output.owner]),
        Rejection::RegisterSigners,
    )
}

fn verify_sell(
    inputs: &[TitleState],
    outputs: &[TitleState],
    signers: &BTreeSet<PartyId>,
) -> Result<(), Rejection> {
    let input = single(inputs, Rejection::SellInputCount)?;
    let output = single(outputs, Rejection::SellOutputCount)?;
    ensure(input.owner != output.owner, Rejection::SellOwnerUnchanged)?;
    ensure(
        *output == input.with_owner(output.owner),
        Rejection::SellOtherFieldsChanged,
    )?;
    ensure(
        input.tenant != Some(output.owner),
        Rejection::SellBuyerIsTenant,
    )?;
    ensure(
        *signers == required_signers(TransitionKind::Sell, inputs, outputs),
        Rejection::SellSigners,
    )
}

fn verify_rent(
    inputs: &[TitleState],
    outputs: &[TitleState],
    signers: &BTreeSet<PartyId>,
) -> Result<(), Rejection> {
    let input = single(inputs, Rejection::RentInputCount)?;
    let output = single(outputs, Rejection::RentOutputCount)?;
    ensure(input.tenant.is_none(), Rejection::RentPreviousTenant)?;
    ensure(output.tenant.is_some(), Rejection::RentNoNewTenant)?;
    ensure(
        *output == input.with_tenant(output.tenant),
        Rejection::RentOtherFieldsChanged,
    )?;
    ensure(
        output.tenant != Some(output.owner),
        Rejection::RentOwnerIsTenant,
    )?;
    ensure(
        *signers == required_signers(TransitionKind::Rent, inputs, outputs),
        Rejection::RentSigners,
    )
}

fn verify_terminate_rent(
    inputs: &[TitleState],
    outputs: &[TitleState],
    signers: &BTreeSet<PartyId>,
) -> Result<(), Rejection> {
    let input = single(inputs, Rejection::TerminateInputCount)?;
    let output = single(outputs, Rejection::TerminateOutputCount)?;
    ensure(input.tenant.is_some(), Rejection::TerminateNoTenant)?;
    ensure(output.tenant.is_none(), Rejection::TerminateTenantNotRemoved)?;
    ensure(
        *output == input.with_tenant(output.tenant),
        Rejection::TerminateOtherFieldsChanged,
    )?;
    ensure(
        *signers == required_signers(TransitionKind::TerminateRent, inputs, outputs),
        Rejection::TerminateSigners,
    )
}
