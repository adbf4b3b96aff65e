//! One bot's game session.
//!
//! A session is single use: `Connecting -> Joined -> Terminated`. It joins as
//! soon as its connection opens, mirrors the world from the updates it
//! receives and sends whatever input its current intent describes each time
//! the swarm ticks it.

use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use glam::Vec2;
use protocol::packets::{
    serialize_msg, AliveCountsMsg, DisconnectMsg, EmoteMsg, GameOverMsg, InputAction, InputMsg,
    JoinMsg, JoinedMsg, KillMsg, Loadout, MapMsg, MsgReader, MsgType, NextMsg, PickupMsg,
    PlayerStatsMsg, RoleAnnouncementMsg, UpdateMsg, UpdatePassMsg,
};
use protocol::{ProtocolError, PROTOCOL_VERSION};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::catalog::LoadoutCatalog;
use crate::config::InputConfig;
use crate::transport::Transport;
use crate::world::WorldState;

/// Prefix of every bot's display name.
pub const BOT_NAME_PREFIX: &str = "BOT_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Joined,
    Terminated,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Died,
    /// Connection closed without a game over.
    Disconnected,
    /// Server never acknowledged the join.
    TimedOut,
}

/// Movement is one of the eight compass directions.
const DIRECTIONS: [(bool, bool, bool, bool); 8] = [
    // (up, down, left, right)
    (true, false, false, false),
    (false, true, false, false),
    (false, false, true, false),
    (false, false, false, true),
    (true, false, true, false),
    (true, false, false, true),
    (false, true, true, false),
    (false, true, false, true),
];

/// What the bot wants to do until its next refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputIntent {
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub shoot_start: bool,
    pub interact: bool,
    pub emote: bool,
}

impl InputIntent {
    /// A fresh random intent.
    pub fn random<R: Rng>(rng: &mut R, input: &InputConfig) -> Self {
        let shoot_start = rng.random_bool(input.shoot_chance);
        let interact = rng.random_bool(input.interact_chance);
        let emote = rng.random_bool(input.emote_chance);
        let (move_up, move_down, move_left, move_right) =
            DIRECTIONS[rng.random_range(0..DIRECTIONS.len())];
        Self {
            move_up,
            move_down,
            move_left,
            move_right,
            shoot_start,
            interact,
            emote,
        }
    }
}

pub struct Session {
    id: u32,
    state: SessionState,
    player_id: Option<u16>,
    joined_ack: bool,
    emotes: Vec<String>,
    loadout: Option<Loadout>,
    world: WorldState,
    intent: InputIntent,
    seq: u8,
    angle: f32,
    angular_speed: f32,
    to_mouse_len: f32,
    created_at: Duration,
    outcome: Option<Outcome>,
    catalog: Arc<LoadoutCatalog>,
    transport: Box<dyn Transport>,
}

impl Session {
    /// A session for bot `id` whose connection is being opened.
    pub fn new<R: Rng>(
        id: u32,
        transport: Box<dyn Transport>,
        catalog: Arc<LoadoutCatalog>,
        input: &InputConfig,
        created_at: Duration,
        rng: &mut R,
    ) -> Self {
        let angular_speed = if input.max_angular_speed > 0.0 {
            rng.random_range(0.0..input.max_angular_speed)
        } else {
            0.0
        };
        Self {
            id,
            state: SessionState::Connecting,
            player_id: None,
            joined_ack: false,
            emotes: catalog.random_emotes(rng),
            loadout: None,
            world: WorldState::new(),
            intent: InputIntent::default(),
            seq: 0,
            angle: rng.random_range(-PI..PI),
            angular_speed,
            to_mouse_len: input.to_mouse_len,
            created_at,
            outcome: None,
            catalog,
            transport,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> String {
        format!("{}{}", BOT_NAME_PREFIX, self.id)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    pub fn player_id(&self) -> Option<u16> {
        self.player_id
    }

    /// Whether the server answered the join.
    pub fn joined_ack(&self) -> bool {
        self.joined_ack
    }

    pub fn emotes(&self) -> &[String] {
        &self.emotes
    }

    /// Loadout sent with the join, once sent.
    pub fn loadout(&self) -> Option<&Loadout> {
        self.loadout.as_ref()
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn intent(&self) -> &InputIntent {
        &self.intent
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Connection is up: send the join request.
    pub fn on_open<R: Rng>(&mut self, rng: &mut R) {
        if self.state != SessionState::Connecting {
            return;
        }
        let loadout = self.catalog.random_loadout(rng, self.emotes.clone());
        let join = JoinMsg {
            protocol: PROTOCOL_VERSION,
            name: self.name(),
            is_mobile: false,
            loadout: loadout.clone(),
        };
        self.loadout = Some(loadout);
        // Inputs may flow before the server acknowledges.
        self.state = SessionState::Joined;
        if let Err(e) = self.transport.send(serialize_msg(&join)) {
            warn!("Bot {} failed to send join: {}", self.id, e);
            self.terminate(Outcome::Disconnected);
        }
    }

    /// Connection closed, for whatever reason.
    pub fn on_close(&mut self, reason: &str) {
        if self.is_terminated() {
            return;
        }
        debug!("Bot {} disconnected: {}", self.id, reason);
        self.terminate(Outcome::Disconnected);
    }

    /// Retire a session the server never acknowledged.
    pub fn expire(&mut self) {
        if self.is_terminated() {
            return;
        }
        warn!("Bot {} got no join acknowledgement, giving up", self.id);
        self.terminate(Outcome::TimedOut);
    }

    /// Handle one received frame: a batch of messages read in wire order.
    pub fn on_frame(&mut self, frame: Bytes) {
        if self.is_terminated() {
            return;
        }
        let mut reader = MsgReader::new(frame);
        loop {
            let ty = match reader.next_msg() {
                NextMsg::Msg(ty) => ty,
                NextMsg::End => break,
                NextMsg::Unknown(tag) => {
                    warn!("Bot {} got unknown message type {}, dropping rest of batch", self.id, tag);
                    break;
                }
            };
            match self.on_msg(ty, &mut reader) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("Bot {} failed to decode {:?}: {}", self.id, ty, e);
                    break;
                }
            }
            if self.is_terminated() {
                break;
            }
        }
    }

    /// Dispatch one message. Returns false when the rest of the batch
    /// cannot be read.
    fn on_msg(&mut self, ty: MsgType, reader: &mut MsgReader) -> Result<bool, ProtocolError> {
        match ty {
            MsgType::Joined => {
                let msg: JoinedMsg = reader.read()?;
                debug!("Bot {} joined as player {}", self.id, msg.player_id);
                self.player_id = Some(msg.player_id);
                self.emotes = msg.emotes;
                self.joined_ack = true;
            }
            MsgType::Map => {
                let _: MapMsg = reader.read()?;
            }
            MsgType::Update => {
                let msg = UpdateMsg::decode(reader.reader(), &self.world)?;
                if !msg.unresolved_ids.is_empty() {
                    warn!(
                        "Bot {} skipped partial updates for unknown objects {:?} (known: {:?})",
                        self.id,
                        msg.unresolved_ids,
                        self.world.ids()
                    );
                }
                if !msg.malformed_ids.is_empty() {
                    warn!(
                        "Bot {} skipped partial updates with mismatched blocks for {:?}",
                        self.id, msg.malformed_ids
                    );
                }
                self.world.apply_update(&msg);
            }
            MsgType::Kill => {
                let _: KillMsg = reader.read()?;
            }
            MsgType::RoleAnnouncement => {
                let _: RoleAnnouncementMsg = reader.read()?;
            }
            MsgType::PlayerStats => {
                let _: PlayerStatsMsg = reader.read()?;
            }
            MsgType::Pickup => {
                let _: PickupMsg = reader.read()?;
            }
            MsgType::AliveCounts => {
                let _: AliveCountsMsg = reader.read()?;
            }
            MsgType::UpdatePass => {
                let _: UpdatePassMsg = reader.read()?;
            }
            MsgType::GameOver => {
                let msg: GameOverMsg = reader.read()?;
                let kills = msg.player_stats.first().map(|s| s.kills).unwrap_or(0);
                info!(
                    "Bot {} {} | kills: {} | rank: {}",
                    self.id,
                    if msg.game_over { "won" } else { "died" },
                    kills,
                    msg.team_rank
                );
                self.terminate(if msg.game_over { Outcome::Won } else { Outcome::Died });
            }
            MsgType::Disconnect => {
                let msg: DisconnectMsg = reader.read()?;
                info!("Bot {} disconnected by server: {}", self.id, msg.reason);
            }
            other => {
                // Client-bound only; the payload layout is unknown here.
                warn!("Bot {} got unexpected message {:?}, dropping rest of batch", self.id, other);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Pick a new random intent.
    pub fn update_inputs<R: Rng>(&mut self, rng: &mut R, input: &InputConfig) {
        self.intent = InputIntent::random(rng, input);
    }

    /// Send the current intent. Does nothing until the session has joined.
    pub fn send_inputs<R: Rng>(&mut self, rng: &mut R) {
        if self.state != SessionState::Joined {
            return;
        }

        let mut msg = InputMsg {
            seq: self.seq,
            move_left: self.intent.move_left,
            move_right: self.intent.move_right,
            move_up: self.intent.move_up,
            move_down: self.intent.move_down,
            shoot_start: self.intent.shoot_start,
            to_mouse_dir: Vec2::from_angle(self.angle),
            to_mouse_len: self.to_mouse_len,
            ..Default::default()
        };
        if self.intent.interact {
            msg.add_input(InputAction::Interact);
        }
        self.seq = self.seq.wrapping_add(1);
        self.angle += self.angular_speed;
        if self.angle > PI {
            self.angle = -PI;
        }

        if let Err(e) = self.transport.send(serialize_msg(&msg)) {
            warn!("Bot {} failed to send input: {}", self.id, e);
            self.terminate(Outcome::Disconnected);
            return;
        }

        if self.intent.emote && !self.emotes.is_empty() {
            let emote = EmoteMsg {
                emote: self.emotes[rng.random_range(0..self.emotes.len())].clone(),
                pos: Vec2::ZERO,
                is_ping: false,
            };
            if let Err(e) = self.transport.send(serialize_msg(&emote)) {
                debug!("Bot {} failed to send emote: {}", self.id, e);
            }
        }
    }

    fn terminate(&mut self, outcome: Outcome) {
        self.state = SessionState::Terminated;
        self.outcome.get_or_insert(outcome);
        self.world.clear();
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{default_unlocks, GameDefs};
    use crate::transport::TransportError;
    use protocol::objects::{LootFull, LootPart, PlayerPart};
    use protocol::packets::{FullObject, MsgWriter, PartialObject, PlayerStats};
    use protocol::{ObjectData, PartialData};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Wire {
        sent: Vec<Bytes>,
        closed: bool,
    }

    struct TestTransport(Arc<Mutex<Wire>>);

    impl Transport for TestTransport {
        fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
            let mut wire = self.0.lock().unwrap();
            if wire.closed {
                return Err(TransportError::Closed);
            }
            wire.sent.push(frame);
            Ok(())
        }

        fn close(&mut self) {
            self.0.lock().unwrap().closed = true;
        }
    }

    fn session() -> (Session, Arc<Mutex<Wire>>, StdRng) {
        let wire = Arc::new(Mutex::new(Wire::default()));
        let catalog = Arc::new(LoadoutCatalog::build(&GameDefs::default(), &default_unlocks()).unwrap());
        let mut rng = StdRng::seed_from_u64(1);
        let session = Session::new(
            4,
            Box::new(TestTransport(wire.clone())),
            catalog,
            &InputConfig::default(),
            Duration::ZERO,
            &mut rng,
        );
        (session, wire, rng)
    }

    fn sent_types(wire: &Arc<Mutex<Wire>>) -> Vec<MsgType> {
        wire.lock()
            .unwrap()
            .sent
            .iter()
            .map(|frame| MsgType::from_u8(frame[0]).unwrap())
            .collect()
    }

    fn game_over(won: bool) -> Bytes {
        serialize_msg(&GameOverMsg {
            team_rank: if won { 1 } else { 12 },
            game_over: won,
            player_stats: vec![PlayerStats {
                kills: 2,
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    #[test]
    fn test_open_sends_join() {
        let (mut session, wire, mut rng) = session();
        assert_eq!(session.state(), SessionState::Connecting);
        session.on_open(&mut rng);
        assert_eq!(session.state(), SessionState::Joined);

        let frame = wire.lock().unwrap().sent[0].clone();
        let mut reader = MsgReader::new(frame);
        assert_eq!(reader.next_msg(), NextMsg::Msg(MsgType::Join));
        let join: JoinMsg = reader.read().unwrap();
        assert_eq!(join.name, "BOT_4");
        assert_eq!(join.protocol, PROTOCOL_VERSION);
        assert!(!join.is_mobile);
        assert_eq!(join.loadout.emotes, session.emotes());
        assert_eq!(join.loadout.heal, "heal_basic");
        assert_eq!(Some(&join.loadout), session.loadout());
    }

    #[test]
    fn test_close_before_any_message() {
        let (mut session, wire, mut rng) = session();
        session.on_close("refused");
        assert!(session.is_terminated());
        assert_eq!(session.outcome(), Some(Outcome::Disconnected));

        // Late events change nothing.
        session.on_open(&mut rng);
        session.on_frame(game_over(true));
        assert_eq!(session.outcome(), Some(Outcome::Disconnected));
        assert!(wire.lock().unwrap().sent.is_empty());
    }

    #[test]
    fn test_inputs_wait_for_open() {
        let (mut session, wire, mut rng) = session();
        session.update_inputs(&mut rng, &InputConfig::default());
        session.send_inputs(&mut rng);
        assert!(wire.lock().unwrap().sent.is_empty());

        session.on_open(&mut rng);
        session.send_inputs(&mut rng);
        assert_eq!(&sent_types(&wire)[..2], &[MsgType::Join, MsgType::Input]);
    }

    #[test]
    fn test_joined_records_player() {
        let (mut session, _wire, mut rng) = session();
        session.on_open(&mut rng);
        let emotes = vec!["emote_doge".to_string(); 6];
        session.on_frame(serialize_msg(&JoinedMsg {
            team_mode: 1,
            player_id: 77,
            started: true,
            emotes: emotes.clone(),
        }));
        assert_eq!(session.player_id(), Some(77));
        assert!(session.joined_ack());
        assert_eq!(session.emotes(), emotes);
    }

    #[test]
    fn test_game_over_terminates_and_closes() {
        let (mut session, wire, mut rng) = session();
        session.on_open(&mut rng);

        let mut batch = MsgWriter::new();
        batch.push(&UpdateMsg {
            full_objects: vec![FullObject {
                id: 3,
                data: ObjectData::Loot(LootPart::default(), LootFull::default()),
            }],
            ..Default::default()
        });
        batch.push(&AliveCountsMsg {
            team_alive_counts: vec![40],
        });
        session.on_frame(batch.finish());
        assert_eq!(session.world().len(), 1);

        session.on_frame(game_over(false));
        assert!(session.is_terminated());
        assert_eq!(session.outcome(), Some(Outcome::Died));
        assert!(wire.lock().unwrap().closed);
        assert!(session.world().is_empty());

        // Close notification after game over keeps the first outcome.
        session.on_close("closed by client");
        assert_eq!(session.outcome(), Some(Outcome::Died));
    }

    #[test]
    fn test_mismatched_partial_keeps_batch() {
        let (mut session, _wire, mut rng) = session();
        session.on_open(&mut rng);
        let loot = ObjectData::Loot(LootPart::default(), LootFull::default());
        session.on_frame(serialize_msg(&UpdateMsg {
            full_objects: vec![FullObject { id: 3, data: loot.clone() }],
            ..Default::default()
        }));

        // 3 is loot here; the server sends it a player block.
        let mut batch = MsgWriter::new();
        batch.push(&UpdateMsg {
            full_objects: vec![FullObject { id: 8, data: loot.clone() }],
            part_objects: vec![PartialObject {
                id: 3,
                data: PartialData::Player(PlayerPart::default()),
            }],
            ..Default::default()
        });
        batch.push(&JoinedMsg {
            team_mode: 1,
            player_id: 9,
            started: true,
            emotes: Vec::new(),
        });
        session.on_frame(batch.finish());

        assert_eq!(session.world().ids(), vec![3, 8]);
        assert_eq!(session.world().get(3).unwrap().data, loot);
        assert_eq!(session.player_id(), Some(9));
    }

    #[test]
    fn test_batch_stops_at_unknown_tag() {
        let (mut session, _wire, mut rng) = session();
        session.on_open(&mut rng);

        let mut batch = MsgWriter::new();
        batch.push(&DisconnectMsg {
            reason: "maintenance".to_string(),
        });
        batch.push_tag(0xEE);
        let mut tail = MsgWriter::new();
        tail.push(&GameOverMsg::default());
        let mut frame = batch.finish().to_vec();
        frame.extend_from_slice(&tail.finish());

        session.on_frame(Bytes::from(frame));
        assert_eq!(session.state(), SessionState::Joined);
    }

    #[test]
    fn test_truncated_payload_drops_batch() {
        let (mut session, _wire, mut rng) = session();
        session.on_open(&mut rng);
        session.on_frame(Bytes::from_static(&[MsgType::Joined as u8, 1]));
        assert_eq!(session.player_id(), None);
        assert_eq!(session.state(), SessionState::Joined);
    }

    #[test]
    fn test_input_reflects_intent() {
        let (mut session, wire, mut rng) = session();
        session.on_open(&mut rng);
        session.intent = InputIntent {
            move_up: true,
            move_left: true,
            interact: true,
            ..Default::default()
        };
        session.angle = 0.0;
        session.send_inputs(&mut rng);

        let frame = wire.lock().unwrap().sent[1].clone();
        let mut reader = MsgReader::new(frame);
        assert_eq!(reader.next_msg(), NextMsg::Msg(MsgType::Input));
        let input: InputMsg = reader.read().unwrap();
        assert!(input.move_up && input.move_left);
        assert!(!input.move_down && !input.move_right);
        assert_eq!(input.inputs, vec![InputAction::Interact]);
        assert_eq!(input.to_mouse_dir, Vec2::new(1.0, 0.0));
        assert_eq!(input.to_mouse_len, 50.0);
        assert_eq!(reader.next_msg(), NextMsg::End);
    }

    #[test]
    fn test_emote_follows_input() {
        let (mut session, wire, mut rng) = session();
        session.on_open(&mut rng);
        session.intent.emote = true;
        session.send_inputs(&mut rng);
        assert_eq!(sent_types(&wire), vec![MsgType::Join, MsgType::Input, MsgType::Emote]);
    }

    #[test]
    fn test_angle_wraps() {
        let (mut session, _wire, mut rng) = session();
        session.on_open(&mut rng);
        session.angular_speed = 0.1;
        session.angle = PI - 0.05;
        session.send_inputs(&mut rng);
        assert_eq!(session.angle(), -PI);
        session.send_inputs(&mut rng);
        assert!((session.angle() - (-PI + 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_failed_input_send_terminates() {
        let (mut session, wire, mut rng) = session();
        session.on_open(&mut rng);
        wire.lock().unwrap().closed = true;
        session.send_inputs(&mut rng);
        assert!(session.is_terminated());
        assert_eq!(session.outcome(), Some(Outcome::Disconnected));
    }

    #[test]
    fn test_random_intent_moves() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let intent = InputIntent::random(&mut rng, &InputConfig::default());
            let vertical = intent.move_up as u8 + intent.move_down as u8;
            let horizontal = intent.move_left as u8 + intent.move_right as u8;
            assert!(vertical <= 1 && horizontal <= 1);
            assert!(vertical + horizontal >= 1);
        }
    }
}
