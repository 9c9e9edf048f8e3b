use std::sync::Arc;

use election::{ElectionError, ElectionResult, Session, SessionStore};
use shared::{
    domain::{Identity, Phase, Proposal, ProposalId, Voter},
    error::{ApiError, ErrorCode},
    protocol::{ElectionEvent, ElectionRequest, ElectionResponse},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// The live session, where it is committed, and where committed events go.
/// Cloning shares all three.
#[derive(Clone)]
pub struct ApiContext {
    store: Arc<dyn SessionStore>,
    session: Arc<Mutex<Session>>,
    events: Option<broadcast::Sender<ElectionEvent>>,
}

impl ApiContext {
    /// Loads the stored session, or creates and commits a fresh one owned by
    /// `administrator`. A stored session keeps its own administrator.
    pub async fn open(
        store: Arc<dyn SessionStore>,
        administrator: Identity,
    ) -> Result<Self, ApiError> {
        let session = match store.load_session().await.map_err(internal)? {
            Some(snapshot) => {
                let session = Session::restore(snapshot).map_err(|err| {
                    ApiError::internal(format!("stored session is unusable: {err}"))
                })?;
                if *session.administrator() != administrator {
                    warn!(
                        configured = %administrator,
                        stored = %session.administrator(),
                        "configured administrator differs from stored session; keeping stored"
                    );
                }
                session
            }
            None => {
                let session = Session::new(administrator).map_err(ApiError::from)?;
                store
                    .commit(&session.snapshot(), &[])
                    .await
                    .map_err(internal)?;
                info!(administrator = %session.administrator(), "created new election session");
                session
            }
        };

        Ok(Self {
            store,
            session: Arc::new(Mutex::new(session)),
            events: None,
        })
    }

    /// Publishes every committed event on `events`, in commit order.
    pub fn with_events(mut self, events: broadcast::Sender<ElectionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn phase(&self) -> Phase {
        self.session.lock().await.phase()
    }

    pub async fn administrator(&self) -> Identity {
        self.session.lock().await.administrator().clone()
    }
}

/// Routes one request. Only `winner` may be called without an identity.
pub async fn dispatch(
    ctx: &ApiContext,
    caller: Option<&Identity>,
    request: ElectionRequest,
) -> Result<ElectionResponse, ApiError> {
    let caller = match caller {
        Some(caller) => caller,
        None if request == ElectionRequest::Winner => return winner_response(ctx).await,
        None => {
            return Err(ApiError::new(
                ErrorCode::Unauthorized,
                "this request requires a caller identity",
            ))
        }
    };

    let response = match request {
        ElectionRequest::AdvancePhase { phase } => committed(advance_phase(ctx, caller, phase).await?),
        ElectionRequest::Reset => committed(reset(ctx, caller).await?),
        ElectionRequest::CurrentPhase => ElectionResponse::Phase {
            phase: current_phase(ctx, caller).await?,
        },
        ElectionRequest::RegisterVoter { identity } => {
            committed(register_voter(ctx, caller, &identity).await?)
        }
        ElectionRequest::GetVoter { identity } => {
            let voter = get_voter(ctx, caller, &identity).await?;
            ElectionResponse::Voter { identity, voter }
        }
        ElectionRequest::VotedProposalOf { identity } => {
            let (proposal_id, proposal) = voted_proposal_of(ctx, caller, &identity).await?;
            ElectionResponse::Proposal {
                proposal_id,
                proposal,
            }
        }
        ElectionRequest::SubmitProposal { description } => {
            committed(submit_proposal(ctx, caller, &description).await?)
        }
        ElectionRequest::ListProposals => ElectionResponse::Proposals {
            proposals: list_proposals(ctx, caller).await?,
        },
        ElectionRequest::GetProposal { proposal_id } => ElectionResponse::Proposal {
            proposal_id,
            proposal: get_proposal(ctx, caller, proposal_id).await?,
        },
        ElectionRequest::Vote { proposal_id } => committed(vote(ctx, caller, proposal_id).await?),
        ElectionRequest::TransferAdministration { identity } => {
            committed(transfer_administration(ctx, caller, &identity).await?)
        }
        ElectionRequest::Winner => return winner_response(ctx).await,
    };
    Ok(response)
}

async fn winner_response(ctx: &ApiContext) -> Result<ElectionResponse, ApiError> {
    let (proposal_id, proposal) = winner(ctx).await?;
    Ok(ElectionResponse::Winner {
        proposal_id,
        proposal,
    })
}

fn committed(event: ElectionEvent) -> ElectionResponse {
    ElectionResponse::Committed { event }
}

pub async fn advance_phase(
    ctx: &ApiContext,
    caller: &Identity,
    phase: Phase,
) -> Result<ElectionEvent, ApiError> {
    commit(ctx, caller, |session| session.advance(caller, phase)).await
}

pub async fn reset(ctx: &ApiContext, caller: &Identity) -> Result<ElectionEvent, ApiError> {
    commit(ctx, caller, |session| session.reset(caller)).await
}

pub async fn current_phase(ctx: &ApiContext, caller: &Identity) -> Result<Phase, ApiError> {
    read(ctx, caller, |session| session.current_phase(caller)).await
}

pub async fn register_voter(
    ctx: &ApiContext,
    caller: &Identity,
    identity: &Identity,
) -> Result<ElectionEvent, ApiError> {
    commit(ctx, caller, |session| session.register_voter(caller, identity)).await
}

pub async fn get_voter(
    ctx: &ApiContext,
    caller: &Identity,
    identity: &Identity,
) -> Result<Voter, ApiError> {
    read(ctx, caller, |session| session.voter(caller, identity)).await
}

pub async fn voted_proposal_of(
    ctx: &ApiContext,
    caller: &Identity,
    identity: &Identity,
) -> Result<(ProposalId, Proposal), ApiError> {
    read(ctx, caller, |session| session.voted_proposal_of(caller, identity)).await
}

pub async fn submit_proposal(
    ctx: &ApiContext,
    caller: &Identity,
    description: &str,
) -> Result<ElectionEvent, ApiError> {
    commit(ctx, caller, |session| session.submit_proposal(caller, description)).await
}

pub async fn list_proposals(ctx: &ApiContext, caller: &Identity) -> Result<Vec<Proposal>, ApiError> {
    read(ctx, caller, |session| session.proposals(caller)).await
}

pub async fn get_proposal(
    ctx: &ApiContext,
    caller: &Identity,
    proposal_id: ProposalId,
) -> Result<Proposal, ApiError> {
    read(ctx, caller, |session| session.proposal(caller, proposal_id)).await
}

pub async fn vote(
    ctx: &ApiContext,
    caller: &Identity,
    proposal_id: ProposalId,
) -> Result<ElectionEvent, ApiError> {
    commit(ctx, caller, |session| session.vote(caller, proposal_id)).await
}

pub async fn winner(ctx: &ApiContext) -> Result<(ProposalId, Proposal), ApiError> {
    let session = ctx.session.lock().await;
    session.winner().map_err(ApiError::from)
}

pub async fn transfer_administration(
    ctx: &ApiContext,
    caller: &Identity,
    identity: &Identity,
) -> Result<ElectionEvent, ApiError> {
    commit(ctx, caller, |session| {
        session.transfer_administration(caller, identity)
    })
    .await
}

pub async fn ensure_administrator(ctx: &ApiContext, caller: &Identity) -> Result<(), ApiError> {
    read(ctx, caller, |session| session.guard().ensure_administrator(caller)).await
}

/// Applies `apply` to a copy of the session, commits the copy with its event,
/// and only then makes it live and publishes the event. The lock is held
/// throughout, so operations are serialized, subscribers see events in log
/// order, and a failed commit leaves the live session untouched.
async fn commit<F>(ctx: &ApiContext, caller: &Identity, apply: F) -> Result<ElectionEvent, ApiError>
where
    F: FnOnce(&mut Session) -> ElectionResult<ElectionEvent>,
{
    let mut live = ctx.session.lock().await;
    let mut next = live.clone();
    let event = apply(&mut next).map_err(|err| rejected(caller, err))?;

    ctx.store
        .commit(&next.snapshot(), std::slice::from_ref(&event))
        .await
        .map_err(|err| {
            warn!(%caller, event = event.kind(), error = %err, "failed to commit election operation");
            internal(err)
        })?;
    *live = next;
    info!(%caller, event = event.kind(), "election operation committed");
    if let Some(events) = &ctx.events {
        // nobody listening is fine
        let _ = events.send(event.clone());
    }
    Ok(event)
}

async fn read<T, F>(ctx: &ApiContext, caller: &Identity, query: F) -> Result<T, ApiError>
where
    F: FnOnce(&Session) -> ElectionResult<T>,
{
    let session = ctx.session.lock().await;
    query(&session).map_err(|err| rejected(caller, err))
}

fn rejected(caller: &Identity, err: ElectionError) -> ApiError {
    debug!(%caller, code = ?err.code(), error = %err, "election operation rejected");
    ApiError::from(err)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
