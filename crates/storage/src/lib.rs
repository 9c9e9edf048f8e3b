use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use election::{SessionSnapshot, SessionStore, VoterEntry};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{EventId, Identity, Phase, Proposal, ProposalId, Voter},
    protocol::{ElectionEvent, EventRecord},
};

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every connection to :memory: is its own database, so keep exactly one alive
        let pool_options = if database_url.starts_with(MEMORY_URL) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Audit log page, oldest first. `before` pages backwards from an event id.
    pub async fn list_events(&self, limit: u32, before: Option<EventId>) -> Result<Vec<EventRecord>> {
        let mut rows = if let Some(before_id) = before {
            sqlx::query(
                "SELECT id, payload, recorded_at
                 FROM election_events
                 WHERE id < ?
                 ORDER BY id DESC
                 LIMIT ?",
            )
            .bind(before_id.0)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, payload, recorded_at
                 FROM election_events
                 ORDER BY id DESC
                 LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        rows.reverse();
        rows.into_iter()
            .map(|r| {
                let event_id = EventId(r.get::<i64, _>(0));
                let payload = r.get::<String, _>(1);
                let event = serde_json::from_str::<ElectionEvent>(&payload)
                    .with_context(|| format!("event {} has an unreadable payload", event_id.0))?;
                Ok(EventRecord {
                    event_id,
                    event,
                    recorded_at: r.get::<DateTime<Utc>, _>(2),
                })
            })
            .collect()
    }

    async fn load_voters(&self) -> Result<Vec<VoterEntry>> {
        let rows = sqlx::query(
            "SELECT identity, is_registered, has_voted, voted_proposal_index
             FROM voters
             ORDER BY registration_order ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(VoterEntry {
                    identity: Identity::new(r.get::<String, _>(0)),
                    voter: Voter {
                        is_registered: r.get::<bool, _>(1),
                        has_voted: r.get::<bool, _>(2),
                        voted_proposal_id: proposal_id_from_row(r.get::<i64, _>(3))?,
                    },
                })
            })
            .collect()
    }

    async fn load_proposals(&self) -> Result<Vec<Proposal>> {
        let rows = sqlx::query(
            "SELECT description, vote_count
             FROM proposals
             ORDER BY proposal_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(Proposal {
                    description: r.get::<String, _>(0),
                    vote_count: u64::try_from(r.get::<i64, _>(1))
                        .context("negative vote count in proposals table")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SessionStore for Storage {
    async fn load_session(&self) -> Result<Option<SessionSnapshot>> {
        let row = sqlx::query(
            "SELECT administrator, phase, leader_index FROM election_session WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let phase = Phase::from_str(&row.get::<String, _>(1))?;
        Ok(Some(SessionSnapshot {
            administrator: Identity::new(row.get::<String, _>(0)),
            phase,
            leader: proposal_id_from_row(row.get::<i64, _>(2))?,
            proposals: self.load_proposals().await?,
            voters: self.load_voters().await?,
        }))
    }

    async fn commit(&self, snapshot: &SessionSnapshot, events: &[ElectionEvent]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO election_session (id, administrator, phase, leader_index, updated_at)
             VALUES (1, ?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(id) DO UPDATE SET
                administrator = excluded.administrator,
                phase = excluded.phase,
                leader_index = excluded.leader_index,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(snapshot.administrator.as_str())
        .bind(snapshot.phase.as_str())
        .bind(proposal_id_to_row(snapshot.leader)?)
        .execute(&mut *tx)
        .await
        .context("failed to store election session row")?;

        sqlx::query("DELETE FROM voters").execute(&mut *tx).await?;
        for (order, entry) in snapshot.voters.iter().enumerate() {
            sqlx::query(
                "INSERT INTO voters (registration_order, identity, is_registered, has_voted, voted_proposal_index)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(i64::try_from(order)?)
            .bind(entry.identity.as_str())
            .bind(entry.voter.is_registered)
            .bind(entry.voter.has_voted)
            .bind(proposal_id_to_row(entry.voter.voted_proposal_id)?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to store voter {}", entry.identity))?;
        }

        sqlx::query("DELETE FROM proposals").execute(&mut *tx).await?;
        for (index, proposal) in snapshot.proposals.iter().enumerate() {
            sqlx::query(
                "INSERT INTO proposals (proposal_index, description, vote_count) VALUES (?, ?, ?)",
            )
            .bind(i64::try_from(index)?)
            .bind(proposal.description.as_str())
            .bind(i64::try_from(proposal.vote_count)?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to store proposal {index}"))?;
        }

        for event in events {
            sqlx::query("INSERT INTO election_events (kind, payload) VALUES (?, ?)")
                .bind(event.kind())
                .bind(serde_json::to_string(event)?)
                .execute(&mut *tx)
                .await
                .context("failed to append election event")?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn proposal_id_to_row(proposal_id: ProposalId) -> Result<i64> {
    i64::try_from(proposal_id.0).context("proposal index does not fit in sqlite integer")
}

fn proposal_id_from_row(raw: i64) -> Result<ProposalId> {
    Ok(ProposalId(
        usize::try_from(raw).context("negative proposal index in database")?,
    ))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(parent) = sqlite_path(database_url)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
    else {
        return Ok(());
    };

    fs::create_dir_all(&parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with(MEMORY_URL) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    (!path.is_empty()).then(|| PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
