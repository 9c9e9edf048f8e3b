use async_trait::async_trait;
use election::{Session, SessionSnapshot, SessionStore};
use shared::{
    domain::{Identity, Phase, ProposalId},
    protocol::ElectionEvent,
};
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryStore {
    snapshot: Mutex<Option<SessionSnapshot>>,
    events: Mutex<Vec<ElectionEvent>>,
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session(&self) -> anyhow::Result<Option<SessionSnapshot>> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn commit(
        &self,
        snapshot: &SessionSnapshot,
        events: &[ElectionEvent],
    ) -> anyhow::Result<()> {
        *self.snapshot.lock().await = Some(snapshot.clone());
        self.events.lock().await.extend_from_slice(events);
        Ok(())
    }
}

#[tokio::test]
async fn park_or_library_end_to_end() {
    let store = MemoryStore::default();
    let admin = Identity::new("admin");
    let v1 = Identity::new("V1");
    let v2 = Identity::new("V2");

    let mut session = Session::new(admin.clone()).expect("session");
    store.commit(&session.snapshot(), &[]).await.expect("init");

    let steps: Vec<Box<dyn Fn(&mut Session) -> election::ElectionResult<ElectionEvent>>> = vec![
        Box::new(|s: &mut Session| s.register_voter(&admin, &v1)),
        Box::new(|s: &mut Session| s.register_voter(&admin, &v2)),
        Box::new(|s: &mut Session| s.advance(&admin, Phase::ProposalsRegistrationOpen)),
        Box::new(|s: &mut Session| s.submit_proposal(&v1, "Park renovation")),
        Box::new(|s: &mut Session| s.submit_proposal(&v2, "Library hours")),
        Box::new(|s: &mut Session| s.advance(&admin, Phase::ProposalsRegistrationClosed)),
        Box::new(|s: &mut Session| s.advance(&admin, Phase::VotingOpen)),
        Box::new(|s: &mut Session| s.vote(&v1, ProposalId(1))),
        Box::new(|s: &mut Session| s.vote(&v2, ProposalId(1))),
        Box::new(|s: &mut Session| s.advance(&admin, Phase::VotingClosed)),
        Box::new(|s: &mut Session| s.advance(&admin, Phase::ResultsTallied)),
    ];

    for step in &steps {
        // reload before every call so each one runs against committed state
        let snapshot = store.load_session().await.expect("load").expect("present");
        session = Session::restore(snapshot).expect("restore");
        let event = step(&mut session).expect("step");
        store
            .commit(&session.snapshot(), std::slice::from_ref(&event))
            .await
            .expect("commit");
    }

    let (winner_id, winner) = session.winner().expect("winner");
    assert_eq!(winner_id, ProposalId(1));
    assert_eq!(winner.description, "Library hours");
    assert_eq!(winner.vote_count, 2);

    let events = store.events.lock().await;
    assert_eq!(events.len(), steps.len());
    assert_eq!(
        events[3],
        ElectionEvent::ProposalRegistered {
            proposal_id: ProposalId(0)
        }
    );
    assert_eq!(
        events[8],
        ElectionEvent::VoteCast {
            voter: v2.clone(),
            proposal_id: ProposalId(1)
        }
    );
}
