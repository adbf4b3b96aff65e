//! Client -> Server messages.

use glam::Vec2;

use super::{Decode, Encode, MsgType};
use crate::{BinaryReader, BinaryWriter, ProtocolError};

/// Number of emote slots in a loadout.
pub const LOADOUT_EMOTE_SLOTS: usize = 6;

/// Most actions a single input message may carry.
pub const MAX_INPUT_ACTIONS: usize = 7;

/// Cosmetic and equipment selection presented on join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Loadout {
    pub melee: String,
    pub outfit: String,
    pub heal: String,
    pub boost: String,
    pub emotes: Vec<String>,
}

/// Join request (sent once the connection opens).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinMsg {
    pub protocol: u32,
    pub name: String,
    pub is_mobile: bool,
    pub loadout: Loadout,
}

impl Encode for JoinMsg {
    const TYPE: MsgType = MsgType::Join;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u32(self.protocol);
        w.put_string(&self.name);
        w.put_bool(self.is_mobile);
        w.put_string(&self.loadout.melee);
        w.put_string(&self.loadout.outfit);
        w.put_string(&self.loadout.heal);
        w.put_string(&self.loadout.boost);
        w.put_u8(self.loadout.emotes.len().min(u8::MAX as usize) as u8);
        for emote in &self.loadout.emotes {
            w.put_string(emote);
        }
    }
}

impl Decode for JoinMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        let protocol = r.get_u32()?;
        let name = r.get_string()?;
        let is_mobile = r.get_bool()?;
        let melee = r.get_string()?;
        let outfit = r.get_string()?;
        let heal = r.get_string()?;
        let boost = r.get_string()?;
        let count = r.get_u8()? as usize;
        let mut emotes = Vec::with_capacity(count);
        for _ in 0..count {
            emotes.push(r.get_string()?);
        }
        Ok(Self {
            protocol,
            name,
            is_mobile,
            loadout: Loadout {
                melee,
                outfit,
                heal,
                boost,
                emotes,
            },
        })
    }
}

/// Discrete actions appended to an input message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Reload = 5,
    Cancel = 6,
    Interact = 7,
    Revive = 8,
    Use = 9,
    Loot = 10,
    EquipPrimary = 11,
    EquipSecondary = 12,
    EquipThrowable = 13,
    EquipMelee = 14,
}

impl InputAction {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            5 => Self::Reload,
            6 => Self::Cancel,
            7 => Self::Interact,
            8 => Self::Revive,
            9 => Self::Use,
            10 => Self::Loot,
            11 => Self::EquipPrimary,
            12 => Self::EquipSecondary,
            13 => Self::EquipThrowable,
            14 => Self::EquipMelee,
            _ => return None,
        })
    }
}

/// Movement, aim and action state for one client tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputMsg {
    pub seq: u8,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub shoot_start: bool,
    pub shoot_hold: bool,
    /// Unit vector from the player towards the cursor.
    pub to_mouse_dir: Vec2,
    pub to_mouse_len: f32,
    pub inputs: Vec<InputAction>,
}

impl InputMsg {
    /// Queue an action. Actions beyond [`MAX_INPUT_ACTIONS`] are dropped.
    pub fn add_input(&mut self, action: InputAction) {
        if self.inputs.len() < MAX_INPUT_ACTIONS {
            self.inputs.push(action);
        }
    }

    fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.move_left {
            flags |= 0x01;
        }
        if self.move_right {
            flags |= 0x02;
        }
        if self.move_up {
            flags |= 0x04;
        }
        if self.move_down {
            flags |= 0x08;
        }
        if self.shoot_start {
            flags |= 0x10;
        }
        if self.shoot_hold {
            flags |= 0x20;
        }
        flags
    }
}

impl Encode for InputMsg {
    const TYPE: MsgType = MsgType::Input;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_u8(self.seq);
        w.put_u8(self.flags());
        w.put_vec2(self.to_mouse_dir);
        w.put_f32(self.to_mouse_len);
        w.put_u8(self.inputs.len() as u8);
        for action in &self.inputs {
            w.put_u8(*action as u8);
        }
    }
}

impl Decode for InputMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        let seq = r.get_u8()?;
        let flags = r.get_u8()?;
        let to_mouse_dir = r.get_vec2()?;
        let to_mouse_len = r.get_f32()?;
        let count = r.get_u8()? as usize;
        let mut inputs = Vec::with_capacity(count);
        for _ in 0..count {
            let code = r.get_u8()?;
            inputs.push(InputAction::from_u8(code).ok_or(ProtocolError::InvalidInputAction(code))?);
        }
        Ok(Self {
            seq,
            move_left: flags & 0x01 != 0,
            move_right: flags & 0x02 != 0,
            move_up: flags & 0x04 != 0,
            move_down: flags & 0x08 != 0,
            shoot_start: flags & 0x10 != 0,
            shoot_hold: flags & 0x20 != 0,
            to_mouse_dir,
            to_mouse_len,
            inputs,
        })
    }
}

/// Emote or map ping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmoteMsg {
    pub emote: String,
    pub pos: Vec2,
    pub is_ping: bool,
}

impl Encode for EmoteMsg {
    const TYPE: MsgType = MsgType::Emote;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_string(&self.emote);
        w.put_vec2(self.pos);
        w.put_bool(self.is_ping);
    }
}

impl Decode for EmoteMsg {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            emote: r.get_string()?,
            pos: r.get_vec2()?,
            is_ping: r.get_bool()?,
        })
    }
}
