//! Local mirror of the objects a session can see.
//!
//! The server sends each object once in full, then streams changes of its
//! part block. Updates that reference objects this mirror does not know are
//! logged and dropped: the swarm only needs a plausible mirror, not an exact
//! one.

use std::collections::HashMap;

use protocol::packets::UpdateMsg;
use protocol::{ObjectData, ObjectType, ObjectTypeLookup, PartialData};
use tracing::warn;

/// An object seen by this session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub id: u32,
    pub data: ObjectData,
}

impl GameObject {
    /// Type from the most recent full update.
    pub fn kind(&self) -> ObjectType {
        self.data.kind()
    }
}

/// What a store operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New id, record created.
    Created,
    /// Known id, payload replaced.
    Replaced,
    /// Known id whose type changed; the record now holds the new type.
    Reset,
    /// Part block overwritten.
    Merged,
    Removed,
    /// Id not present; nothing changed.
    Missing,
    /// Partial update of a different type than the record; nothing changed.
    KindMismatch,
}

impl Applied {
    /// Whether the store changed.
    pub fn is_applied(self) -> bool {
        !matches!(self, Applied::Missing | Applied::KindMismatch)
    }
}

/// Outcome counts of one update message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub applied: usize,
    pub skipped: usize,
}

impl UpdateStats {
    fn record(&mut self, applied: Applied) {
        if applied.is_applied() {
            self.applied += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Object id -> object.
#[derive(Debug, Default)]
pub struct WorldState {
    objects: HashMap<u32, GameObject>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    pub fn kind_of(&self, id: u32) -> Option<ObjectType> {
        self.objects.get(&id).map(GameObject::kind)
    }

    /// Known ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drop every object (session teardown).
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Store a complete snapshot of `id`.
    pub fn apply_full(&mut self, id: u32, data: ObjectData) -> Applied {
        match self.objects.get_mut(&id) {
            None => {
                self.objects.insert(id, GameObject { id, data });
                Applied::Created
            }
            Some(obj) if obj.kind() != data.kind() => {
                warn!(
                    "Object {} changed type {:?} -> {:?}, resetting",
                    id,
                    obj.kind(),
                    data.kind()
                );
                obj.data = data;
                Applied::Reset
            }
            Some(obj) => {
                obj.data = data;
                Applied::Replaced
            }
        }
    }

    /// Overwrite the part block of a known object.
    pub fn apply_partial(&mut self, id: u32, part: &PartialData) -> Applied {
        let Some(obj) = self.objects.get_mut(&id) else {
            warn!("Partial update for missing object {} (known: {:?})", id, self.ids());
            return Applied::Missing;
        };
        if !obj.data.merge(part) {
            warn!(
                "Partial update of type {:?} for object {} of type {:?}",
                part.kind(),
                id,
                obj.kind()
            );
            return Applied::KindMismatch;
        }
        Applied::Merged
    }

    pub fn remove(&mut self, id: u32) -> Applied {
        if self.objects.remove(&id).is_some() {
            Applied::Removed
        } else {
            warn!("Delete of missing object {} (known: {:?})", id, self.ids());
            Applied::Missing
        }
    }

    /// Apply a decoded update: deletions, then full snapshots, then partial
    /// merges. A full snapshot may re-create an id deleted by the same update.
    pub fn apply_update(&mut self, msg: &UpdateMsg) -> UpdateStats {
        let mut stats = UpdateStats::default();
        for &id in &msg.del_obj_ids {
            stats.record(self.remove(id));
        }
        for obj in &msg.full_objects {
            stats.record(self.apply_full(obj.id, obj.data.clone()));
        }
        for obj in &msg.part_objects {
            stats.record(self.apply_partial(obj.id, &obj.data));
        }
        stats
    }
}

impl ObjectTypeLookup for WorldState {
    fn object_type(&self, id: u32) -> Option<ObjectType> {
        self.kind_of(id)
    }
}
