use super::*;
use election::Session;

fn id(value: &str) -> Identity {
    Identity::new(value)
}

async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = memory_storage().await;
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn empty_database_has_no_session() {
    let storage = memory_storage().await;
    assert!(storage.load_session().await.expect("load").is_none());
}

#[tokio::test]
async fn commit_round_trips_a_voting_session() {
    let storage = memory_storage().await;
    let admin = id("admin");
    let mut session = Session::new(admin.clone()).expect("session");
    session.register_voter(&admin, &id("v1")).expect("register");
    session
        .advance(&admin, Phase::ProposalsRegistrationOpen)
        .expect("advance");
    session.submit_proposal(&id("v1"), "Park").expect("submit");
    session.submit_proposal(&admin, "Library").expect("submit");
    session.advance(&admin, Phase::VotingOpen).expect("advance");
    let event = session.vote(&id("v1"), ProposalId(1)).expect("vote");

    storage
        .commit(&session.snapshot(), &[event])
        .await
        .expect("commit");

    let loaded = storage.load_session().await.expect("load").expect("present");
    assert_eq!(loaded, session.snapshot());
    assert_eq!(Session::restore(loaded).expect("restore"), session);
}

#[tokio::test]
async fn later_commit_replaces_rows_after_reset() {
    let storage = memory_storage().await;
    let admin = id("admin");
    let mut session = Session::new(admin.clone()).expect("session");
    session
        .advance(&admin, Phase::ProposalsRegistrationOpen)
        .expect("advance");
    session.submit_proposal(&admin, "Park").expect("submit");
    storage.commit(&session.snapshot(), &[]).await.expect("commit");

    let event = session.reset(&admin).expect("reset");
    storage
        .commit(&session.snapshot(), &[event])
        .await
        .expect("commit");

    let loaded = storage.load_session().await.expect("load").expect("present");
    assert!(loaded.proposals.is_empty());
    assert_eq!(loaded.phase, Phase::RegisteringVoters);
    assert_eq!(loaded.voters.len(), 1);
}

#[tokio::test]
async fn paginates_event_log() {
    let storage = memory_storage().await;
    let admin = id("admin");
    let mut session = Session::new(admin.clone()).expect("session");
    let mut events = Vec::new();
    for voter in ["v1", "v2", "v3"] {
        events.push(session.register_voter(&admin, &id(voter)).expect("register"));
    }
    storage
        .commit(&session.snapshot(), &events)
        .await
        .expect("commit");

    let newest_two = storage.list_events(2, None).await.expect("events");
    assert_eq!(newest_two.len(), 2);
    assert_eq!(
        newest_two[1].event,
        ElectionEvent::VoterRegistered { identity: id("v3") }
    );

    let older = storage
        .list_events(10, Some(newest_two[0].event_id))
        .await
        .expect("events");
    assert_eq!(older.len(), 1);
    assert_eq!(older[0].event, events[0]);
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("election.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[test]
fn memory_urls_have_no_path() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/election.db?mode=rwc"),
        Some(PathBuf::from("./data/election.db"))
    );
}
