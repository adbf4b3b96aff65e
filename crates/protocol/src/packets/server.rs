//! Server -> Client messages.

use std::collections::HashMap;

use glam::Vec2;

use super::{get_count, put_count, Decode, Encode, MsgType};
use crate::{
    BinaryReader, BinaryWriter, ObjectData, ObjectType, ObjectTypeLookup, PartialData,
    ProtocolError,
};

fn put_ids(w: &mut BinaryWriter, ids: &[u32]) {
    put_count(w, ids.len());
    for &id in ids {
        w.put_u32(id);
    }
}

fn get_ids(r: &mut BinaryReader) -> Result<Vec<u32>, ProtocolError> {
    let count = get_count(r)?;
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(r.get_u32()?);
    }
    Ok(ids)
}

fn put_strings(w: &mut BinaryWriter, items: &[String]) {
    debug_assert!(items.len() <= u8::MAX as usize, "too many strings");
    w.put_u8(items.len().min(u8::MAX as usize) as u8);
    for item in items {
        w.put_string(item);
    }
}

fn get_strings(r: &mut BinaryReader) -> Result<Vec<String>, ProtocolError> {
    let count = r.get_u8()? as usize;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(r.get_string()?);
    }
    Ok(items)
}

/// Join acknowledgment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinedMsg {
    pub team_mode: u8,
    pub player_id: u16,
    pub started: bool,
    /// Emotes the server accepted for this player.
    pub emotes: Vec<String>,
}

impl Encode for JoinedMsg {
    const TYPE: MsgType = MsgType::Joined;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u8(self.team_mode);
        w.put_u16(self.player_id);
        w.put_bool(self.started);
        put_strings(w, &self.emotes);
    }
}

impl Decode for JoinedMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            team_mode: r.get_u8()?,
            player_id: r.get_u16()?,
            started: r.get_bool()?,
            emotes: get_strings(r)?,
        })
    }
}

/// A named location on the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapPlace {
    pub name: String,
    pub pos: Vec2,
}

/// A static object placed at map generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapObject {
    pub pos: Vec2,
    pub object_type: String,
    pub ori: u8,
    pub scale: f32,
}

/// Map description sent once after joining.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapMsg {
    pub map_name: String,
    pub seed: u32,
    pub width: u16,
    pub height: u16,
    pub shore_inset: u16,
    pub grass_inset: u16,
    pub places: Vec<MapPlace>,
    pub objects: Vec<MapObject>,
}

impl Encode for MapMsg {
    const TYPE: MsgType = MsgType::Map;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_string(&self.map_name);
        w.put_u32(self.seed);
        w.put_u16(self.width);
        w.put_u16(self.height);
        w.put_u16(self.shore_inset);
        w.put_u16(self.grass_inset);
        put_count(w, self.places.len());
        for place in &self.places {
            w.put_string(&place.name);
            w.put_vec2(place.pos);
        }
        put_count(w, self.objects.len());
        for obj in &self.objects {
            w.put_vec2(obj.pos);
            w.put_string(&obj.object_type);
            w.put_u8(obj.ori);
            w.put_f32(obj.scale);
        }
    }
}

impl Decode for MapMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        let map_name = r.get_string()?;
        let seed = r.get_u32()?;
        let width = r.get_u16()?;
        let height = r.get_u16()?;
        let shore_inset = r.get_u16()?;
        let grass_inset = r.get_u16()?;

        let count = get_count(r)?;
        let mut places = Vec::with_capacity(count);
        for _ in 0..count {
            places.push(MapPlace {
                name: r.get_string()?,
                pos: r.get_vec2()?,
            });
        }

        let count = get_count(r)?;
        let mut objects = Vec::with_capacity(count);
        for _ in 0..count {
            objects.push(MapObject {
                pos: r.get_vec2()?,
                object_type: r.get_string()?,
                ori: r.get_u8()?,
                scale: r.get_f32()?,
            });
        }

        Ok(Self {
            map_name,
            seed,
            width,
            height,
            shore_inset,
            grass_inset,
            places,
            objects,
        })
    }
}

/// A complete object snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FullObject {
    pub id: u32,
    pub data: ObjectData,
}

/// Changed part block of an already-known object.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialObject {
    pub id: u32,
    pub data: PartialData,
}

/// World delta: deletions, then full snapshots, then partial updates.
///
/// Wire layout:
/// - del count u16, ids u32 × count
/// - full count u16, `[type u8, id u32, part block, full block]` × count
/// - part count u16, `[id u32, len u16, part block]` × count
///
/// Partial entries carry no type tag; the decoder resolves it from the
/// deletions and full snapshots earlier in the same message, falling back to
/// the receiver's object store. The length prefix lets an unresolvable or
/// mis-sized entry be skipped without losing the cursor.
///
/// Every list is limited to `u16::MAX` entries and every part block to
/// `u16::MAX` bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMsg {
    pub del_obj_ids: Vec<u32>,
    pub full_objects: Vec<FullObject>,
    pub part_objects: Vec<PartialObject>,
    /// Partial entries whose type could not be resolved. Their payload was
    /// skipped.
    pub unresolved_ids: Vec<u32>,
    /// Partial entries whose block did not match the resolved type's part
    /// layout. Their payload was skipped.
    pub malformed_ids: Vec<u32>,
}

impl Encode for UpdateMsg {
    const TYPE: MsgType = MsgType::Update;

    fn encode(&self, w: &mut BinaryWriter) {
        put_ids(w, &self.del_obj_ids);

        put_count(w, self.full_objects.len());
        for obj in &self.full_objects {
            w.put_u8(obj.data.kind().as_u8());
            w.put_u32(obj.id);
            obj.data.encode(w);
        }

        put_count(w, self.part_objects.len());
        for obj in &self.part_objects {
            let mut part = BinaryWriter::with_capacity(32);
            obj.data.encode(&mut part);
            debug_assert!(part.len() <= u16::MAX as usize, "part block too long");
            w.put_u32(obj.id);
            w.put_u16(part.len() as u16);
            w.put_slice(part.as_slice());
        }
    }
}

impl UpdateMsg {
    /// Decode against the receiver's view of which objects exist.
    pub fn decode<L>(r: &mut BinaryReader, lookup: &L) -> Result<Self, ProtocolError>
    where
        L: ObjectTypeLookup + ?Sized,
    {
        // Types as they will be once this message's deletions and full
        // snapshots are applied. `None` marks a deletion.
        let mut pending: HashMap<u32, Option<ObjectType>> = HashMap::new();

        let del_obj_ids = get_ids(r)?;
        for &id in &del_obj_ids {
            pending.insert(id, None);
        }

        let count = get_count(r)?;
        let mut full_objects = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = r.get_u8()?;
            let kind = ObjectType::from_u8(tag).ok_or(ProtocolError::InvalidObjectType(tag))?;
            let id = r.get_u32()?;
            let data = ObjectData::decode(kind, r)?;
            pending.insert(id, Some(kind));
            full_objects.push(FullObject { id, data });
        }

        let count = get_count(r)?;
        let mut part_objects = Vec::with_capacity(count);
        let mut unresolved_ids = Vec::new();
        let mut malformed_ids = Vec::new();
        for _ in 0..count {
            let id = r.get_u32()?;
            let len = r.get_u16()? as usize;
            let mut payload = BinaryReader::new(r.get_bytes(len)?);
            let kind = match pending.get(&id) {
                Some(kind) => *kind,
                None => lookup.object_type(id),
            };
            match kind {
                Some(kind) => match PartialData::decode(kind, &mut payload) {
                    Ok(data) if !payload.has_remaining() => {
                        part_objects.push(PartialObject { id, data });
                    }
                    _ => malformed_ids.push(id),
                },
                None => unresolved_ids.push(id),
            }
        }

        Ok(Self {
            del_obj_ids,
            full_objects,
            part_objects,
            unresolved_ids,
            malformed_ids,
        })
    }
}

/// Kill feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillMsg {
    pub damage_type: u8,
    pub item_source_type: String,
    pub map_source_type: String,
    pub target_id: u16,
    pub killer_id: u16,
    pub kill_credit_id: u16,
    pub killer_kills: u8,
    pub downed: bool,
    pub killed: bool,
}

impl Encode for KillMsg {
    const TYPE: MsgType = MsgType::Kill;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u8(self.damage_type);
        w.put_string(&self.item_source_type);
        w.put_string(&self.map_source_type);
        w.put_u16(self.target_id);
        w.put_u16(self.killer_id);
        w.put_u16(self.kill_credit_id);
        w.put_u8(self.killer_kills);
        w.put_bool(self.downed);
        w.put_bool(self.killed);
    }
}

impl Decode for KillMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            damage_type: r.get_u8()?,
            item_source_type: r.get_string()?,
            map_source_type: r.get_string()?,
            target_id: r.get_u16()?,
            killer_id: r.get_u16()?,
            kill_credit_id: r.get_u16()?,
            killer_kills: r.get_u8()?,
            downed: r.get_bool()?,
            killed: r.get_bool()?,
        })
    }
}

/// Role assignment or loss (faction modes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAnnouncementMsg {
    pub player_id: u16,
    pub role: String,
    pub assigned: bool,
    pub killed: bool,
    pub killer_id: u16,
}

impl Encode for RoleAnnouncementMsg {
    const TYPE: MsgType = MsgType::RoleAnnouncement;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u16(self.player_id);
        w.put_string(&self.role);
        w.put_bool(self.assigned);
        w.put_bool(self.killed);
        w.put_u16(self.killer_id);
    }
}

impl Decode for RoleAnnouncementMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id: r.get_u16()?,
            role: r.get_string()?,
            assigned: r.get_bool()?,
            killed: r.get_bool()?,
            killer_id: r.get_u16()?,
        })
    }
}

/// Per-player match statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub player_id: u16,
    pub time_alive: u16,
    pub kills: u8,
    pub damage_dealt: u16,
    pub damage_taken: u16,
}

impl PlayerStats {
    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u16(self.player_id);
        w.put_u16(self.time_alive);
        w.put_u8(self.kills);
        w.put_u16(self.damage_dealt);
        w.put_u16(self.damage_taken);
    }

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_id: r.get_u16()?,
            time_alive: r.get_u16()?,
            kills: r.get_u8()?,
            damage_dealt: r.get_u16()?,
            damage_taken: r.get_u16()?,
        })
    }
}

/// Stats of a single player, sent when they die while teammates live on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStatsMsg {
    pub player_stats: PlayerStats,
}

impl Encode for PlayerStatsMsg {
    const TYPE: MsgType = MsgType::PlayerStats;

    fn encode(&self, w: &mut BinaryWriter) {
        self.player_stats.encode(w);
    }
}

impl Decode for PlayerStatsMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            player_stats: PlayerStats::decode(r)?,
        })
    }
}

/// End of the game for this player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameOverMsg {
    pub team_id: u8,
    pub team_rank: u8,
    /// True when the whole game ended, i.e. this player's team won.
    pub game_over: bool,
    pub winning_team_id: u8,
    pub player_stats: Vec<PlayerStats>,
}

impl Encode for GameOverMsg {
    const TYPE: MsgType = MsgType::GameOver;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u8(self.team_id);
        w.put_u8(self.team_rank);
        w.put_bool(self.game_over);
        w.put_u8(self.winning_team_id);
        w.put_u8(self.player_stats.len().min(u8::MAX as usize) as u8);
        for stats in &self.player_stats {
            stats.encode(w);
        }
    }
}

impl Decode for GameOverMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        let team_id = r.get_u8()?;
        let team_rank = r.get_u8()?;
        let game_over = r.get_bool()?;
        let winning_team_id = r.get_u8()?;
        let count = r.get_u8()? as usize;
        let mut player_stats = Vec::with_capacity(count);
        for _ in 0..count {
            player_stats.push(PlayerStats::decode(r)?);
        }
        Ok(Self {
            team_id,
            team_rank,
            game_over,
            winning_team_id,
            player_stats,
        })
    }
}

/// Item pickup feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickupMsg {
    pub msg_type: u8,
    pub item: String,
    pub count: u8,
}

impl Encode for PickupMsg {
    const TYPE: MsgType = MsgType::Pickup;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u8(self.msg_type);
        w.put_string(&self.item);
        w.put_u8(self.count);
    }
}

impl Decode for PickupMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            msg_type: r.get_u8()?,
            item: r.get_string()?,
            count: r.get_u8()?,
        })
    }
}

/// Number of players alive, per team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliveCountsMsg {
    pub team_alive_counts: Vec<u8>,
}

impl Encode for AliveCountsMsg {
    const TYPE: MsgType = MsgType::AliveCounts;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u8(self.team_alive_counts.len().min(u8::MAX as usize) as u8);
        for &count in &self.team_alive_counts {
            w.put_u8(count);
        }
    }
}

impl Decode for AliveCountsMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        let count = r.get_u8()? as usize;
        let mut team_alive_counts = Vec::with_capacity(count);
        for _ in 0..count {
            team_alive_counts.push(r.get_u8()?);
        }
        Ok(Self { team_alive_counts })
    }
}

/// Battle pass progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePassMsg {
    pub pass_type: String,
    pub level: u8,
    pub xp: u32,
}

impl Encode for UpdatePassMsg {
    const TYPE: MsgType = MsgType::UpdatePass;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_string(&self.pass_type);
        w.put_u8(self.level);
        w.put_u32(self.xp);
    }
}

impl Decode for UpdatePassMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            pass_type: r.get_string()?,
            level: r.get_u8()?,
            xp: r.get_u32()?,
        })
    }
}

/// Server-initiated end of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectMsg {
    pub reason: String,
}

impl Encode for DisconnectMsg {
    const TYPE: MsgType = MsgType::Disconnect;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_string(&self.reason);
    }
}

impl Decode for DisconnectMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            reason: r.get_string()?,
        })
    }
}
