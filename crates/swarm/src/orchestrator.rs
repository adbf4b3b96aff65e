//! Swarm orchestration.
//!
//! [`Swarm`] owns every live session. It is driven entirely from outside:
//! timers fire through [`Swarm::fire`], matchmaking answers arrive through
//! [`Swarm::on_matchmade`] and connection events through
//! [`Swarm::on_event`]. Work that has to happen off the driving task comes
//! back out as [`Command`]s.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::catalog::LoadoutCatalog;
use crate::config::{Config, InputConfig, SwarmConfig};
use crate::matchmaking::{GameTarget, MatchmakingError};
use crate::scheduler::{Timer, TimerQueue};
use crate::session::{Outcome, Session};
use crate::transport::{Connector, SessionEvent, SessionEventKind};

/// Work the driver has to carry out for the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Request a game for bot `n` and report back through `on_matchmade`.
    Matchmake(u32),
    /// Every bot is done; stop.
    Exit,
}

/// Final counts of a swarm run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwarmSummary {
    pub spawned: u32,
    pub matchmaking_failures: u32,
    pub won: u32,
    pub died: u32,
    pub disconnected: u32,
    pub timed_out: u32,
}

impl SwarmSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Won => self.won += 1,
            Outcome::Died => self.died += 1,
            Outcome::Disconnected => self.disconnected += 1,
            Outcome::TimedOut => self.timed_out += 1,
        }
    }
}

pub struct Swarm<C: Connector> {
    config: SwarmConfig,
    input: InputConfig,
    catalog: Arc<LoadoutCatalog>,
    connector: C,
    /// Active sessions, in spawn order.
    sessions: Vec<Session>,
    /// Spawn attempts that finished, successfully or not.
    settled: u32,
    summary: SwarmSummary,
    finished: bool,
    rng: StdRng,
}

impl<C: Connector> Swarm<C> {
    pub fn new(config: &Config, catalog: Arc<LoadoutCatalog>, connector: C, rng: StdRng) -> Self {
        Self {
            config: config.swarm.clone(),
            input: config.input.clone(),
            catalog,
            connector,
            sessions: Vec::new(),
            settled: 0,
            summary: SwarmSummary::default(),
            finished: false,
            rng,
        }
    }

    /// Schedule every spawn and the first tick.
    ///
    /// Bot `n` (1-based) is requested at `n * join_delay`.
    pub fn start(&self, queue: &mut TimerQueue) {
        let delay = self.config.join_delay();
        for n in 1..=self.config.bot_count {
            queue.schedule(delay * n, Timer::Spawn(n));
        }
        queue.schedule(self.config.tick_interval(), Timer::Tick);
    }

    /// Run a timer that came due at `now`.
    pub fn fire(&mut self, timer: Timer, now: Duration, queue: &mut TimerQueue) -> Vec<Command> {
        match timer {
            Timer::Spawn(n) => {
                debug!("Requesting game for bot {}", n);
                vec![Command::Matchmake(n)]
            }
            Timer::Tick => {
                if self.finished {
                    return Vec::new();
                }
                queue.schedule(now + self.config.tick_interval(), Timer::Tick);
                if self.tick(now) {
                    vec![Command::Exit]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Matchmaking for bot `n` finished.
    pub fn on_matchmade(&mut self, n: u32, result: Result<GameTarget, MatchmakingError>, now: Duration) {
        self.settled += 1;
        match result {
            Ok(target) => {
                info!("Bot {} joining game {} at {}", n, target.game_id, target.play_url());
                let transport = self.connector.connect(n, &target);
                let session = Session::new(
                    n,
                    transport,
                    Arc::clone(&self.catalog),
                    &self.input,
                    now,
                    &mut self.rng,
                );
                self.sessions.push(session);
                self.summary.spawned += 1;
            }
            Err(e) => {
                warn!("Bot {} matchmaking failed: {}", n, e);
                self.summary.matchmaking_failures += 1;
            }
        }
    }

    /// Route a connection event to its session. Events for retired
    /// sessions are dropped.
    pub fn on_event(&mut self, event: SessionEvent) {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id() == event.session) else {
            debug!("Dropping event for retired bot {}", event.session);
            return;
        };
        match event.kind {
            SessionEventKind::Opened => session.on_open(&mut self.rng),
            SessionEventKind::Frame(frame) => session.on_frame(frame),
            SessionEventKind::Closed { reason } => session.on_close(&reason),
        }
    }

    /// Drive every session once and retire terminated ones. Returns true
    /// when the swarm has drained.
    fn tick(&mut self, now: Duration) -> bool {
        let join_timeout = self.config.join_timeout();
        for session in &mut self.sessions {
            if self.rng.random_bool(self.input.refresh_chance) {
                session.update_inputs(&mut self.rng, &self.input);
            }
            session.send_inputs(&mut self.rng);

            if let Some(timeout) = join_timeout {
                if !session.joined_ack() && now.saturating_sub(session.created_at()) >= timeout {
                    session.expire();
                }
            }
        }

        let summary = &mut self.summary;
        self.sessions.retain(|session| {
            if !session.is_terminated() {
                return true;
            }
            summary.record(session.outcome().unwrap_or(Outcome::Disconnected));
            false
        });

        if self.settled == self.config.bot_count && self.sessions.is_empty() {
            self.finished = true;
            info!("All bots died or disconnected, exiting.");
            info!(
                "Summary: {} spawned, {} won, {} died, {} disconnected, {} timed out, {} matchmaking failures",
                self.summary.spawned,
                self.summary.won,
                self.summary.died,
                self.summary.disconnected,
                self.summary.timed_out,
                self.summary.matchmaking_failures
            );
            return true;
        }
        false
    }

    /// Number of active sessions.
    pub fn active(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get_session(&self, id: u32) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    /// Whether the swarm drained and asked to exit.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn summary(&self) -> &SwarmSummary {
        &self.summary
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}
