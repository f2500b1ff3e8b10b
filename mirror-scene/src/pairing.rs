//! The pairing workflow: creating, recreating and tearing down mirrored
//! pairs, with the advisory physics consistency check.

use crate::scene::{EntityId, LinkId, Scene};
use log::warn;
use mirror_sync::{MirrorLink, MirrorSpace, Teleport};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PairError {
    #[error("unknown entity")]
    UnknownEntity,

    #[error("entity is already part of a mirror link")]
    AlreadyLinked,

    #[error("an entity cannot mirror itself")]
    SelfPair,

    #[error("center-space mirroring requires a center entity")]
    MissingCenter,
}

/// Non-fatal: mirrored entities with diverging physics settings drift apart
/// as soon as simulation runs, so the workflow reports it but still links.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("physics settings differ between mirrored entities: {a} <-> {b}")]
pub struct PhysicsMismatch {
    pub a: String,
    pub b: String,
}

impl Scene {
    /// Compares the physics-simulation and gravity flags of both entities.
    /// Missing entities are treated as matching, as there is nothing to
    /// simulate.
    pub fn check_physics_settings(
        &self,
        a: EntityId,
        b: EntityId,
    ) -> Result<(), PhysicsMismatch> {
        let (Some(first), Some(second)) = (self.entity(a), self.entity(b)) else {
            return Ok(());
        };

        if first.simulates_physics() != second.simulates_physics()
            || first.gravity_enabled() != second.gravity_enabled()
        {
            return Err(PhysicsMismatch {
                a: first.name().to_string(),
                b: second.name().to_string(),
            });
        }
        Ok(())
    }

    /// Links two existing entities. Both sides share the one [`MirrorLink`]
    /// value, so their settings can never diverge. A physics mismatch is
    /// logged and the link is established anyway.
    pub fn establish_link(
        &mut self,
        a: EntityId,
        b: EntityId,
        link: MirrorLink,
        center: Option<EntityId>,
    ) -> Result<LinkId, PairError> {
        if a == b {
            return Err(PairError::SelfPair);
        }
        let (Some(first), Some(second)) = (self.entity(a), self.entity(b)) else {
            return Err(PairError::UnknownEntity);
        };
        if first.link().is_some() || second.link().is_some() {
            return Err(PairError::AlreadyLinked);
        }

        let frame = self.mirror_frame_of(center);
        if !link.can_establish(frame.as_ref()) {
            return Err(PairError::MissingCenter);
        }

        if let Err(mismatch) = self.check_physics_settings(a, b) {
            warn!("{mismatch}; establishing the link anyway");
        }

        Ok(self.insert_link(link, a, b, center))
    }

    /// Duplicates `id` and links the duplicate as its mirror, replacing any
    /// existing counterpart first. In center-space the duplicate starts out
    /// at the mirrored pose, applied as a physics teleport.
    pub fn create_mirror(
        &mut self,
        id: EntityId,
        link: MirrorLink,
        center: Option<EntityId>,
    ) -> Result<EntityId, PairError> {
        let frame = self.mirror_frame_of(center);
        if !link.can_establish(frame.as_ref()) {
            return Err(PairError::MissingCenter);
        }

        // Recreate semantics: the previous counterpart goes away first.
        self.delete_mirror(id);

        let Some(source) = self.entity(id) else {
            return Err(PairError::UnknownEntity);
        };
        let name = format!("{} Mirror", source.name());
        let parent = source.parent();
        let local = source.local_pose();
        let bodies = source.bodies().to_vec();

        let duplicate = match parent {
            Some(parent) => self.spawn_child(&name, parent, local),
            None => self.spawn_at(&name, local),
        };
        for body in bodies {
            self.add_body(duplicate, body);
        }

        if link.space == MirrorSpace::CenterSpace {
            if let (Some(frame), Some(world)) = (frame.as_ref(), self.world_pose(id)) {
                self.set_world_pose(duplicate, frame.mirrored_pose(&world), Teleport::Physics);
            }
        }

        match self.establish_link(id, duplicate, link, center) {
            Ok(_) => Ok(duplicate),
            Err(err) => {
                self.remove_entity(duplicate);
                Err(err)
            }
        }
    }

    /// Destroys the entity's current counterpart and the link with it.
    /// Returns the removed counterpart, if there was one.
    pub fn delete_mirror(&mut self, id: EntityId) -> Option<EntityId> {
        let counterpart = self.counterpart_of(id)?;
        self.remove_entity(counterpart);
        Some(counterpart)
    }

    /// Tears down the entity's link without touching either entity.
    pub fn unlink(&mut self, id: EntityId) -> Option<LinkId> {
        let link_id = self.entity(id)?.link()?;
        self.remove_link(link_id);
        Some(link_id)
    }
}
