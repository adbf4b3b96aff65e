//! Bot swarm engine.
//!
//! Opens many game sessions against a live server, mirrors the objects each
//! session can see and feeds randomized inputs on a fixed tick until every
//! session has ended.

pub mod catalog;
pub mod config;
pub mod defs;
pub mod matchmaking;
pub mod orchestrator;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod transport;
pub mod world;

pub use catalog::LoadoutCatalog;
pub use config::Config;
pub use orchestrator::{Command, Swarm, SwarmSummary};
pub use session::{Outcome, Session, SessionState};
