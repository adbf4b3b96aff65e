//! Message definitions for the game protocol.
//!
//! A frame is a batch: `[tag u8][payload]...` repeated until the `None`
//! tag or the end of the buffer. This module contains both client->server
//! and server->client message types.

use bytes::Bytes;

use crate::{BinaryReader, BinaryWriter, ProtocolError};

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Message type tags.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    /// End of batch.
    None = 0,
    Join = 1,
    Disconnect = 2,
    Input = 3,
    Edit = 4,
    Joined = 5,
    Update = 6,
    Kill = 7,
    GameOver = 8,
    Pickup = 9,
    Map = 10,
    Spectate = 11,
    DropItem = 12,
    Emote = 13,
    PlayerStats = 14,
    AdStatus = 15,
    Loadout = 16,
    RoleAnnouncement = 17,
    Stats = 18,
    UpdatePass = 19,
    AliveCounts = 20,
}

impl MsgType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::None,
            1 => Self::Join,
            2 => Self::Disconnect,
            3 => Self::Input,
            4 => Self::Edit,
            5 => Self::Joined,
            6 => Self::Update,
            7 => Self::Kill,
            8 => Self::GameOver,
            9 => Self::Pickup,
            10 => Self::Map,
            11 => Self::Spectate,
            12 => Self::DropItem,
            13 => Self::Emote,
            14 => Self::PlayerStats,
            15 => Self::AdStatus,
            16 => Self::Loadout,
            17 => Self::RoleAnnouncement,
            18 => Self::Stats,
            19 => Self::UpdatePass,
            20 => Self::AliveCounts,
            _ => return None,
        })
    }
}

/// A message that can be written into a batch.
pub trait Encode {
    const TYPE: MsgType;

    fn encode(&self, w: &mut BinaryWriter);
}

/// A message whose payload decodes without outside context.
///
/// `UpdateMsg` is the exception: it needs an object type lookup and exposes
/// its own `decode`.
pub trait Decode: Encode + Sized {
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError>;
}

/// Serialize a single message as a one-message frame.
pub fn serialize_msg<M: Encode>(msg: &M) -> Bytes {
    let mut batch = MsgWriter::new();
    batch.push(msg);
    batch.finish()
}

/// Builds a frame holding several messages.
#[derive(Debug, Default)]
pub struct MsgWriter {
    w: BinaryWriter,
}

impl MsgWriter {
    pub fn new() -> Self {
        Self {
            w: BinaryWriter::with_capacity(1024),
        }
    }

    pub fn push<M: Encode>(&mut self, msg: &M) {
        self.w.put_u8(M::TYPE as u8);
        msg.encode(&mut self.w);
    }

    /// Append a raw tag byte. Used to terminate a batch explicitly.
    pub fn push_tag(&mut self, tag: u8) {
        self.w.put_u8(tag);
    }

    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    pub fn finish(self) -> Bytes {
        self.w.finish()
    }
}

/// Walks the messages of a received frame.
#[derive(Debug)]
pub struct MsgReader {
    r: BinaryReader,
}

/// What the next tag of a frame holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextMsg {
    /// A known message type; its payload follows.
    Msg(MsgType),
    /// The `None` tag or the end of the buffer.
    End,
    /// A tag outside the known set. The payload length is unknown, so the
    /// rest of the frame cannot be walked.
    Unknown(u8),
}

impl MsgReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            r: BinaryReader::new(data),
        }
    }

    /// Read the next message tag.
    pub fn next_msg(&mut self) -> NextMsg {
        match self.r.try_get_u8() {
            None => NextMsg::End,
            Some(tag) => match MsgType::from_u8(tag) {
                Some(MsgType::None) => NextMsg::End,
                Some(ty) => NextMsg::Msg(ty),
                None => NextMsg::Unknown(tag),
            },
        }
    }

    /// Decode the payload of the message whose tag was just read.
    pub fn read<M: Decode>(&mut self) -> Result<M, ProtocolError> {
        M::decode(&mut self.r)
    }

    /// Cursor over the remaining payload, for messages that decode with
    /// outside context.
    pub fn reader(&mut self) -> &mut BinaryReader {
        &mut self.r
    }
}

/// List counts are u16 on the wire; callers must not encode longer lists.
fn put_count(w: &mut BinaryWriter, n: usize) {
    debug_assert!(n <= u16::MAX as usize, "list too long: {}", n);
    w.put_u16(n as u16);
}

fn get_count(r: &mut BinaryReader) -> Result<usize, ProtocolError> {
    Ok(r.get_u16()? as usize)
}
