//! Transform mirroring for paired scene entities.
//!
//! [`MirrorFrame`] does the geometry: reflecting a world pose about a center
//! position and up axis. [`MirrorLink`] is the synchronization state a pair
//! manager owns per mirrored pair: mode, tolerance, teleport policy and the
//! reentrancy guard that keeps two cross-referencing entities from updating
//! each other forever. The crate knows nothing about any particular scene
//! graph; hosts feed it [`PoseView`] snapshots and apply the [`PoseUpdate`]
//! values it hands back.

#![forbid(unsafe_code)]

pub mod frame;
pub mod link;
pub mod pose;

pub use crate::{
    frame::{mirrored_pose, MirrorFrame},
    link::{MirrorLink, MirrorSpace, PoseUpdate, PoseView, Teleport, DEFAULT_TOLERANCE},
    pose::Pose,
};
