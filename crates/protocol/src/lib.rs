//! Binary protocol spoken between game clients and the game server.
//!
//! This crate contains:
//! - Binary reading/writing utilities
//! - Message definitions and batch framing
//! - Game object payloads carried by world updates

mod binary;
mod error;
pub mod objects;
pub mod packets;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::ProtocolError;
pub use objects::{ObjectData, ObjectType, ObjectTypeLookup, PartialData, Payload};

/// Protocol version presented in every join request.
pub const PROTOCOL_VERSION: u32 = 78;
