//! Tokio driver for a [`Swarm`].

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::info;

use crate::catalog::LoadoutCatalog;
use crate::config::Config;
use crate::matchmaking::{GameTarget, MatchmakingError, Matchmaker};
use crate::orchestrator::{Command, Swarm, SwarmSummary};
use crate::scheduler::TimerQueue;
use crate::transport::WsConnector;

type MatchResult = (u32, Result<GameTarget, MatchmakingError>);

/// Run a swarm until every bot has finished.
///
/// All swarm state lives on this task. Matchmaking requests and connections
/// run as their own tasks and report back over channels.
pub async fn run(config: Config, catalog: Arc<LoadoutCatalog>) -> anyhow::Result<SwarmSummary> {
    config.validate()?;

    let matchmaker = Matchmaker::new(&config.matchmaking)?;
    info!("Matchmaking via {}", matchmaker.url());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (match_tx, mut match_rx) = mpsc::unbounded_channel::<MatchResult>();

    let connector = WsConnector::new(event_tx);
    let mut swarm = Swarm::new(&config, catalog, connector, StdRng::from_rng(&mut rand::rng()));
    let mut queue = TimerQueue::new();
    swarm.start(&mut queue);

    let start = Instant::now();
    loop {
        let Some(due) = queue.next_due() else {
            anyhow::bail!("swarm stopped scheduling before it finished");
        };

        tokio::select! {
            _ = sleep_until(start + due) => {
                let now = start.elapsed();
                while let Some((_, timer)) = queue.pop_due(now) {
                    for command in swarm.fire(timer, now, &mut queue) {
                        match command {
                            Command::Matchmake(bot) => {
                                let matchmaker = matchmaker.clone();
                                let tx = match_tx.clone();
                                tokio::spawn(async move {
                                    let result = matchmaker.find_game().await;
                                    let _ = tx.send((bot, result));
                                });
                            }
                            Command::Exit => return Ok(swarm.summary().clone()),
                        }
                    }
                }
            }
            Some((bot, result)) = match_rx.recv() => {
                swarm.on_matchmade(bot, result, start.elapsed());
            }
            Some(event) = event_rx.recv() => {
                swarm.on_event(event);
            }
        }
    }
}
