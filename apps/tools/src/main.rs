use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use election::SessionStore;
use identity::{mint_token, TokenConfig};
use server_api::{dispatch, ApiContext};
use shared::{
    domain::{EventId, Identity, Phase, ProposalId},
    error::ApiException,
    protocol::ElectionRequest,
};
use storage::Storage;

#[derive(Parser, Debug)]
#[command(name = "electionctl", about = "Operate an election database directly")]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/election.db")]
    database_url: String,
    /// Identity the operation is performed as.
    #[arg(long = "as", global = true)]
    caller: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the election session if the database has none.
    Init {
        #[arg(long, default_value = "admin")]
        administrator: String,
    },
    MintToken {
        #[arg(long)]
        identity: String,
        #[arg(long, default_value = "devsecret")]
        secret: String,
        #[arg(long, default_value_t = 3600)]
        ttl_seconds: i64,
    },
    /// Print a page of the audit log.
    Events {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long)]
        before: Option<i64>,
    },
    Advance {
        phase: Phase,
    },
    Reset,
    Phase,
    Register {
        identity: String,
    },
    Voter {
        identity: String,
    },
    VotedProposalOf {
        identity: String,
    },
    Submit {
        description: String,
    },
    Proposals,
    Proposal {
        proposal_id: usize,
    },
    Vote {
        proposal_id: usize,
    },
    Winner,
    TransferAdmin {
        identity: String,
    },
}

impl Command {
    /// The election request this subcommand stands for, if any.
    fn request(&self) -> Option<ElectionRequest> {
        let request = match self {
            Command::Init { .. } | Command::MintToken { .. } | Command::Events { .. } => {
                return None
            }
            Command::Advance { phase } => ElectionRequest::AdvancePhase { phase: *phase },
            Command::Reset => ElectionRequest::Reset,
            Command::Phase => ElectionRequest::CurrentPhase,
            Command::Register { identity } => ElectionRequest::RegisterVoter {
                identity: Identity::new(identity.as_str()),
            },
            Command::Voter { identity } => ElectionRequest::GetVoter {
                identity: Identity::new(identity.as_str()),
            },
            Command::VotedProposalOf { identity } => ElectionRequest::VotedProposalOf {
                identity: Identity::new(identity.as_str()),
            },
            Command::Submit { description } => ElectionRequest::SubmitProposal {
                description: description.clone(),
            },
            Command::Proposals => ElectionRequest::ListProposals,
            Command::Proposal { proposal_id } => ElectionRequest::GetProposal {
                proposal_id: ProposalId(*proposal_id),
            },
            Command::Vote { proposal_id } => ElectionRequest::Vote {
                proposal_id: ProposalId(*proposal_id),
            },
            Command::Winner => ElectionRequest::Winner,
            Command::TransferAdmin { identity } => ElectionRequest::TransferAdministration {
                identity: Identity::new(identity.as_str()),
            },
        };
        Some(request)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::MintToken {
        identity,
        secret,
        ttl_seconds,
    } = &cli.command
    {
        let cfg = TokenConfig {
            secret: secret.clone(),
            ttl_seconds: *ttl_seconds,
        };
        println!("{}", mint_token(&cfg, &Identity::new(identity.as_str()))?);
        return Ok(());
    }

    let storage = Storage::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to open {}", cli.database_url))?;

    match &cli.command {
        Command::Init { administrator } => {
            let ctx = ApiContext::open(
                Arc::new(storage.clone()),
                Identity::new(administrator.as_str()),
            )
            .await
            .map_err(ApiException::from)?;
            println!(
                "session administrator={} phase={}",
                ctx.administrator().await,
                ctx.phase().await
            );
        }
        Command::Events { limit, before } => {
            let events = storage.list_events(*limit, before.map(EventId)).await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        command => {
            let Some(request) = command.request() else {
                bail!("unsupported command");
            };
            let Some(snapshot) = storage.load_session().await? else {
                bail!("no election session in {}; run `electionctl init` first", cli.database_url);
            };
            let ctx = ApiContext::open(Arc::new(storage.clone()), snapshot.administrator)
                .await
                .map_err(ApiException::from)?;
            let caller = cli.caller.as_deref().map(Identity::from);
            let response = dispatch(&ctx, caller.as_ref(), request)
                .await
                .map_err(ApiException::from)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
