//! Game object payloads carried by `Update` messages.
//!
//! Each object type has a *part* block (state the server streams in partial
//! updates, e.g. positions) and a *full* block (state only sent when the
//! object is first seen or fully refreshed). A full update carries both
//! blocks; a partial update carries only the part block.

use std::collections::HashMap;

use glam::Vec2;

use crate::{BinaryReader, BinaryWriter, ProtocolError};

/// Resolves the type of an already-known object.
///
/// Partial updates do not carry a type tag on the wire, so the decoder asks
/// the receiver's object store what the id currently is.
pub trait ObjectTypeLookup {
    fn object_type(&self, id: u32) -> Option<ObjectType>;
}

impl ObjectTypeLookup for HashMap<u32, ObjectType> {
    fn object_type(&self, id: u32) -> Option<ObjectType> {
        self.get(&id).copied()
    }
}

/// A block of fields that encodes in declaration order.
pub trait Payload: Sized {
    fn encode(&self, w: &mut BinaryWriter);
    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError>;
}

trait Field: Sized {
    fn put(&self, w: &mut BinaryWriter);
    fn get(r: &mut BinaryReader) -> Result<Self, ProtocolError>;
}

impl Field for u8 {
    fn put(&self, w: &mut BinaryWriter) {
        w.put_u8(*self);
    }
    fn get(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        r.get_u8()
    }
}

impl Field for u16 {
    fn put(&self, w: &mut BinaryWriter) {
        w.put_u16(*self);
    }
    fn get(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        r.get_u16()
    }
}

impl Field for f32 {
    fn put(&self, w: &mut BinaryWriter) {
        w.put_f32(*self);
    }
    fn get(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        r.get_f32()
    }
}

impl Field for bool {
    fn put(&self, w: &mut BinaryWriter) {
        w.put_bool(*self);
    }
    fn get(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        r.get_bool()
    }
}

impl Field for Vec2 {
    fn put(&self, w: &mut BinaryWriter) {
        w.put_vec2(*self);
    }
    fn get(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        r.get_vec2()
    }
}

impl Field for String {
    fn put(&self, w: &mut BinaryWriter) {
        w.put_string(self);
    }
    fn get(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        r.get_string()
    }
}

macro_rules! payload {
    ($(#[$meta:meta])* $name:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl Payload for $name {
            #[allow(unused_variables)]
            fn encode(&self, w: &mut BinaryWriter) {
                $(Field::put(&self.$field, w);)*
            }

            #[allow(unused_variables)]
            fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
                Ok(Self {
                    $($field: Field::get(r)?,)*
                })
            }
        }
    };
}

payload!(PlayerPart { pos: Vec2, dir: Vec2 });
payload!(PlayerFull {
    outfit: String,
    backpack: String,
    helmet: String,
    chest: String,
    active_weapon: String,
    layer: u8,
    dead: bool,
    downed: bool,
});

payload!(ObstaclePart { pos: Vec2, ori: u8, scale: f32 });
payload!(ObstacleFull {
    obstacle_type: String,
    health: f32,
    dead: bool,
    layer: u8,
});

payload!(LootPart { pos: Vec2 });
payload!(LootFull { loot_type: String, count: u16, layer: u8 });

payload!(DeadBodyPart { pos: Vec2 });
payload!(DeadBodyFull { player_id: u16, layer: u8 });

payload!(BuildingPart { ceiling_dead: bool, occupied: bool });
payload!(BuildingFull {
    pos: Vec2,
    ori: u8,
    building_type: String,
    layer: u8,
});

payload!(
    /// Structures never change after placement.
    StructurePart {}
);
payload!(StructureFull { pos: Vec2, structure_type: String, ori: u8 });

payload!(
    /// Decals never change after placement.
    DecalPart {}
);
payload!(DecalFull {
    pos: Vec2,
    scale: f32,
    decal_type: String,
    ori: u8,
    layer: u8,
});

payload!(ProjectilePart { pos: Vec2, pos_z: f32, dir: Vec2 });
payload!(ProjectileFull { projectile_type: String, layer: u8 });

payload!(SmokePart { pos: Vec2, rad: f32 });
payload!(SmokeFull { layer: u8, interior: u8 });

payload!(AirdropPart { fall_t: f32, landed: bool });
payload!(AirdropFull { pos: Vec2 });

macro_rules! object_kinds {
    ($($variant:ident = $tag:literal => $part:ident, $full:ident;)*) => {
        /// Object type tag as sent on the wire. Tag 0 is reserved as invalid.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ObjectType {
            $($variant = $tag,)*
        }

        impl ObjectType {
            pub fn from_u8(v: u8) -> Option<Self> {
                match v {
                    $($tag => Some(Self::$variant),)*
                    _ => None,
                }
            }

            #[inline]
            pub fn as_u8(self) -> u8 {
                self as u8
            }
        }

        /// Complete state of one object, keyed by its type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ObjectData {
            $($variant($part, $full),)*
        }

        /// The part block of one object, as carried by a partial update.
        #[derive(Debug, Clone, PartialEq)]
        pub enum PartialData {
            $($variant($part),)*
        }

        impl ObjectData {
            pub fn kind(&self) -> ObjectType {
                match self {
                    $(Self::$variant(..) => ObjectType::$variant,)*
                }
            }

            pub fn decode(kind: ObjectType, r: &mut BinaryReader) -> Result<Self, ProtocolError> {
                match kind {
                    $(ObjectType::$variant => Ok(Self::$variant($part::decode(r)?, $full::decode(r)?)),)*
                }
            }

            pub fn encode(&self, w: &mut BinaryWriter) {
                match self {
                    $(Self::$variant(part, full) => {
                        part.encode(w);
                        full.encode(w);
                    })*
                }
            }

            /// The part block of this object.
            pub fn part(&self) -> PartialData {
                match self {
                    $(Self::$variant(part, _) => PartialData::$variant(part.clone()),)*
                }
            }

            /// Overwrite the part block with `partial`, leaving the full
            /// block untouched. Returns false when the types differ.
            pub fn merge(&mut self, partial: &PartialData) -> bool {
                match (self, partial) {
                    $((Self::$variant(part, _), PartialData::$variant(update)) => {
                        *part = update.clone();
                        true
                    })*
                    _ => false,
                }
            }
        }

        impl PartialData {
            pub fn kind(&self) -> ObjectType {
                match self {
                    $(Self::$variant(..) => ObjectType::$variant,)*
                }
            }

            pub fn decode(kind: ObjectType, r: &mut BinaryReader) -> Result<Self, ProtocolError> {
                match kind {
                    $(ObjectType::$variant => Ok(Self::$variant($part::decode(r)?)),)*
                }
            }

            pub fn encode(&self, w: &mut BinaryWriter) {
                match self {
                    $(Self::$variant(part) => part.encode(w),)*
                }
            }
        }
    };
}

object_kinds! {
    Player = 1 => PlayerPart, PlayerFull;
    Obstacle = 2 => ObstaclePart, ObstacleFull;
    Loot = 3 => LootPart, LootFull;
    DeadBody = 4 => DeadBodyPart, DeadBodyFull;
    Building = 5 => BuildingPart, BuildingFull;
    Structure = 6 => StructurePart, StructureFull;
    Decal = 7 => DecalPart, DecalFull;
    Projectile = 8 => ProjectilePart, ProjectileFull;
    Smoke = 9 => SmokePart, SmokeFull;
    Airdrop = 10 => AirdropPart, AirdropFull;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loot(x: f32, count: u16) -> ObjectData {
        ObjectData::Loot(
            LootPart { pos: Vec2::new(x, 0.0) },
            LootFull {
                loot_type: "9mm".to_string(),
                count,
                layer: 0,
            },
        )
    }

    #[test]
    fn test_object_type_tags() {
        assert_eq!(ObjectType::from_u8(1), Some(ObjectType::Player));
        assert_eq!(ObjectType::from_u8(10), Some(ObjectType::Airdrop));
        assert_eq!(ObjectType::from_u8(0), None);
        assert_eq!(ObjectType::from_u8(11), None);
        assert_eq!(ObjectType::Smoke.as_u8(), 9);
    }

    #[test]
    fn test_full_data_decodes_what_it_encodes() {
        let data = loot(12.5, 30);
        let mut w = BinaryWriter::new();
        data.encode(&mut w);
        let mut r = BinaryReader::new(w.finish());
        let decoded = ObjectData::decode(ObjectType::Loot, &mut r).unwrap();
        assert_eq!(decoded, data);
        assert!(!r.has_remaining());
    }

    #[test]
    fn test_merge_overwrites_part_only() {
        let mut data = loot(1.0, 30);
        let merged = data.merge(&PartialData::Loot(LootPart {
            pos: Vec2::new(5.0, 6.0),
        }));
        assert!(merged);
        let ObjectData::Loot(part, full) = &data else {
            panic!("kind changed: {data:?}");
        };
        assert_eq!(part.pos, Vec2::new(5.0, 6.0));
        assert_eq!(full.count, 30);
        assert_eq!(full.loot_type, "9mm");
    }

    #[test]
    fn test_merge_rejects_other_kind() {
        let mut data = loot(1.0, 30);
        let before = data.clone();
        let merged = data.merge(&PartialData::Smoke(SmokePart {
            pos: Vec2::ZERO,
            rad: 4.0,
        }));
        assert!(!merged);
        assert_eq!(data, before);
    }

    #[test]
    fn test_empty_part_block() {
        let data = ObjectData::Decal(DecalPart {}, DecalFull::default());
        assert_eq!(data.part(), PartialData::Decal(DecalPart {}));
        let mut w = BinaryWriter::new();
        data.part().encode(&mut w);
        assert!(w.is_empty());
    }
}
