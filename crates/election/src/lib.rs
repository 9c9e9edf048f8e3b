//! Administered single-winner election.
//!
//! A [`Session`] is built from five small parts: the [`WorkflowController`]
//! owns the phase, the [`AccessGuard`] answers identity questions, the
//! [`VoterRegistry`] and [`ProposalCatalog`] hold participants and proposals,
//! and the [`TallyEngine`] records ballots and tracks the leader. Nothing in
//! this crate does I/O; persistence is reached through [`SessionStore`].

pub mod access;
pub mod catalog;
pub mod error;
pub mod registry;
pub mod session;
pub mod store;
pub mod tally;
pub mod workflow;

pub use access::AccessGuard;
pub use catalog::ProposalCatalog;
pub use error::{ElectionError, ElectionResult};
pub use registry::VoterRegistry;
pub use session::{Session, SessionSnapshot, VoterEntry};
pub use store::SessionStore;
pub use tally::TallyEngine;
pub use workflow::WorkflowController;
