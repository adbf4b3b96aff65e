//! Swarm scenarios on virtual time with instant matchmaking and connections.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use protocol::objects::{LootFull, LootPart};
use protocol::packets::{
    serialize_msg, FullObject, GameOverMsg, JoinedMsg, MsgReader, MsgType, MsgWriter, NextMsg,
    PlayerStats, UpdateMsg,
};
use protocol::ObjectData;
use rand::rngs::StdRng;
use rand::SeedableRng;
use swarm::defs::{default_unlocks, GameDefs};
use swarm::matchmaking::GameTarget;
use swarm::scheduler::TimerQueue;
use swarm::transport::{Connector, SessionEvent, Transport, TransportError};
use swarm::{Command, Config, LoadoutCatalog, Swarm};

/// Frames sent by every session, in order.
#[derive(Clone, Default)]
struct Wire(Arc<Mutex<Vec<(u32, Bytes)>>>);

impl Wire {
    fn types_for(&self, session: u32) -> Vec<MsgType> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == session)
            .filter_map(|(_, frame)| match MsgReader::new(frame.clone()).next_msg() {
                NextMsg::Msg(ty) => Some(ty),
                _ => None,
            })
            .collect()
    }
}

struct RecordingTransport {
    session: u32,
    wire: Wire,
    closed: bool,
}

impl Transport for RecordingTransport {
    fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.wire.0.lock().unwrap().push((self.session, frame));
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[derive(Default)]
struct RecordingConnector {
    wire: Wire,
    connected: Vec<u32>,
}

impl Connector for RecordingConnector {
    fn connect(&mut self, session: u32, _target: &GameTarget) -> Box<dyn Transport> {
        self.connected.push(session);
        Box::new(RecordingTransport {
            session,
            wire: self.wire.clone(),
            closed: false,
        })
    }
}

fn target() -> GameTarget {
    GameTarget {
        game_id: "test".to_string(),
        use_https: false,
        addrs: vec!["127.0.0.1:8001".to_string()],
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Server behaviour: once a session has joined, what it receives and when.
type Script = fn(u32) -> Vec<(Duration, Bytes)>;

struct Harness {
    swarm: Swarm<RecordingConnector>,
    queue: TimerQueue,
    /// Frames the fake server will deliver: (due, session, frame).
    pending: Vec<(Duration, u32, Bytes)>,
    exits: Vec<Duration>,
    script: Script,
}

impl Harness {
    fn new(config: Config, script: Script) -> Self {
        let catalog = Arc::new(LoadoutCatalog::build(&GameDefs::default(), &default_unlocks()).unwrap());
        let swarm = Swarm::new(&config, catalog, RecordingConnector::default(), StdRng::seed_from_u64(11));
        let mut queue = TimerQueue::new();
        swarm.start(&mut queue);
        Self {
            swarm,
            queue,
            pending: Vec::new(),
            exits: Vec::new(),
            script,
        }
    }

    /// Step virtual time until `until` or until nothing is left to happen.
    fn run_until(&mut self, until: Duration) {
        loop {
            let next_frame = self.pending.iter().map(|(due, _, _)| *due).min();
            let next = match (self.queue.next_due(), next_frame) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => return,
            };
            if next > until {
                return;
            }

            let (ready, later): (Vec<_>, Vec<_>) =
                self.pending.drain(..).partition(|(due, _, _)| *due <= next);
            self.pending = later;
            for (_, session, frame) in ready {
                self.swarm.on_event(SessionEvent::frame(session, frame));
            }

            while let Some((_, timer)) = self.queue.pop_due(next) {
                for command in self.swarm.fire(timer, next, &mut self.queue) {
                    match command {
                        Command::Matchmake(bot) => {
                            self.swarm.on_matchmade(bot, Ok(target()), next);
                            self.swarm.on_event(SessionEvent::opened(bot));
                            for (delay, frame) in (self.script)(bot) {
                                self.pending.push((next + delay, bot, frame));
                            }
                        }
                        Command::Exit => self.exits.push(next),
                    }
                }
            }
        }
    }
}

fn joined(bot: u32) -> Bytes {
    serialize_msg(&JoinedMsg {
        team_mode: 1,
        player_id: bot as u16,
        started: true,
        emotes: vec!["emote_happyface".to_string(); 6],
    })
}

fn game_over(won: bool) -> Bytes {
    serialize_msg(&GameOverMsg {
        team_rank: if won { 1 } else { 5 },
        game_over: won,
        player_stats: vec![PlayerStats::default()],
        ..Default::default()
    })
}

fn three_bots() -> Config {
    let mut config = Config::default();
    config.swarm.bot_count = 3;
    config.swarm.join_delay_ms = 100;
    config
}

#[test]
fn test_swarm_drains_after_game_over() {
    fn script(bot: u32) -> Vec<(Duration, Bytes)> {
        vec![(ms(10), joined(bot)), (ms(40), game_over(bot == 2))]
    }
    let mut harness = Harness::new(three_bots(), script);

    harness.run_until(ms(250));
    assert_eq!(harness.swarm.connector().connected, vec![1, 2]);
    assert!(harness.exits.is_empty());

    harness.run_until(ms(500));
    assert_eq!(harness.swarm.connector().connected, vec![1, 2, 3]);
    assert_eq!(harness.swarm.active(), 0);
    assert_eq!(harness.exits.len(), 1);
    assert!(harness.exits[0] <= ms(500));
    assert!(harness.exits[0] > ms(300));

    let summary = harness.swarm.summary();
    assert_eq!(summary.spawned, 3);
    assert_eq!(summary.won, 1);
    assert_eq!(summary.died, 2);

    // Nothing fires after the exit.
    harness.run_until(ms(5_000));
    assert_eq!(harness.exits.len(), 1);
    assert!(harness.queue.is_empty());

    let sent = harness.swarm.connector().wire.types_for(1);
    assert_eq!(sent[0], MsgType::Join);
    assert!(sent[1..].iter().all(|ty| matches!(ty, MsgType::Input | MsgType::Emote)));
    assert!(sent.contains(&MsgType::Input));
}

#[test]
fn test_swarm_waits_for_last_spawn() {
    // Bots are done almost immediately; the swarm must still wait for bot 3.
    fn script(_bot: u32) -> Vec<(Duration, Bytes)> {
        vec![(ms(1), game_over(false))]
    }
    let mut harness = Harness::new(three_bots(), script);

    harness.run_until(ms(299));
    assert!(harness.exits.is_empty());
    assert_eq!(harness.swarm.active(), 0);

    harness.run_until(ms(1_000));
    assert_eq!(harness.exits.len(), 1);
}

#[test]
fn test_update_batch_mirrored() {
    fn script(bot: u32) -> Vec<(Duration, Bytes)> {
        let mut batch = MsgWriter::new();
        batch.push(&UpdateMsg {
            del_obj_ids: vec![7],
            full_objects: vec![FullObject {
                id: 7,
                data: ObjectData::Loot(LootPart::default(), LootFull::default()),
            }],
            ..Default::default()
        });
        vec![(ms(5), joined(bot)), (ms(10), batch.finish())]
    }
    let mut config = three_bots();
    config.swarm.bot_count = 1;
    let mut harness = Harness::new(config, script);

    harness.run_until(ms(150));
    let session = harness.swarm.get_session(1).unwrap();
    assert_eq!(session.player_id(), Some(1));
    assert_eq!(session.world().ids(), vec![7]);
    assert!(harness.exits.is_empty());
}

#[test]
fn test_idle_sessions_time_out() {
    fn script(_bot: u32) -> Vec<(Duration, Bytes)> {
        Vec::new()
    }
    let mut config = three_bots();
    config.swarm.join_timeout_ms = 200;
    let mut harness = Harness::new(config, script);

    harness.run_until(ms(2_000));
    assert_eq!(harness.exits.len(), 1);
    assert_eq!(harness.swarm.summary().timed_out, 3);
}
