use anyhow::Result;
use async_trait::async_trait;
use shared::protocol::ElectionEvent;

use crate::session::SessionSnapshot;

/// Durable home of the session. `commit` must store the snapshot and its
/// events atomically: either both are visible afterwards or neither is.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_session(&self) -> Result<Option<SessionSnapshot>>;
    async fn commit(&self, snapshot: &SessionSnapshot, events: &[ElectionEvent]) -> Result<()>;
}
