//! In-memory scene graph hosting mirrored entity pairs.
//!
//! This crate is the host side of `mirror-sync`: entities with
//! parent-relative poses and physics body flags, synchronous change
//! notification that drives the mirror links, and the pairing workflow
//! (create/recreate/delete a counterpart, tear links down). A real engine
//! integration would replace [`Scene`] while keeping the same notification
//! protocol.

pub mod pairing;
pub mod scene;

pub use crate::{
    pairing::{PairError, PhysicsMismatch},
    scene::{BodySettings, Entity, EntityId, LinkId, LinkInstance, Scene},
};
