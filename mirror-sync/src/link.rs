use crate::{frame::MirrorFrame, pose::Pose};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// How a linked pair keeps their transforms in sync.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorSpace {
    /// Reflect world poses about a shared center frame.
    CenterSpace,
    /// Copy the parent-relative pose directly between the pair.
    LocalSpace,
}

impl Default for MirrorSpace {
    fn default() -> Self {
        Self::CenterSpace
    }
}

/// How applying a world pose interacts with the target's physics state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Teleport {
    None,
    Physics,
}

/// Read-only snapshot of one endpoint of a link.
#[derive(Debug, Clone, Copy)]
pub struct PoseView {
    pub world: Pose,
    pub relative: Pose,
}

/// A transform change the host must apply to the counterpart entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseUpdate {
    /// Parent-relative update. Position and rotation are applied
    /// independently, and only the position half carries the world-move side
    /// effect for the physics step.
    Relative {
        position: Option<Vector3<f32>>,
        rotation: Option<UnitQuaternion<f32>>,
    },
    /// One combined world-space update.
    World { pose: Pose, teleport: Teleport },
}

pub const DEFAULT_TOLERANCE: f32 = 1.0e-4;

/// Synchronization state shared by a mirrored pair of entities.
///
/// The link itself holds no entity references; the pair manager owns one
/// `MirrorLink` per pair and both endpoints route their change notifications
/// through it. Notification protocol:
///
/// 1. `begin_update()` — returns `false` when an update for this link is
///    already in flight; the caller drops the change.
/// 2. `sync_update(..)` — pure decision for the counterpart.
/// 3. Apply the returned [`PoseUpdate`]; a synchronous notification this
///    triggers on the counterpart's side lands back in step 1 and is dropped.
/// 4. `end_update()` — must run on every path out of a notification that saw
///    `begin_update` succeed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorLink {
    pub space: MirrorSpace,
    /// Pose differences at or below this are not propagated.
    pub tolerance: f32,
    /// Apply center-space updates as physics teleports.
    pub teleport_physics: bool,
    #[serde(skip)]
    updating: bool,
}

impl Default for MirrorLink {
    fn default() -> Self {
        Self::new(MirrorSpace::default())
    }
}

impl MirrorLink {
    pub fn new(space: MirrorSpace) -> Self {
        Self {
            space,
            tolerance: DEFAULT_TOLERANCE,
            teleport_physics: false,
            updating: false,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_physics_teleport(mut self) -> Self {
        self.teleport_physics = true;
        self
    }

    /// Whether a counterpart could be linked right now. Center-space
    /// mirroring is meaningless without a frame.
    pub fn can_establish(&self, frame: Option<&MirrorFrame>) -> bool {
        match self.space {
            MirrorSpace::LocalSpace => true,
            MirrorSpace::CenterSpace => frame.is_some(),
        }
    }

    /// Marks an update as in flight. Returns `false` when one already is;
    /// this is a non-blocking short-circuit, so the losing notification is
    /// dropped rather than queued.
    #[must_use]
    pub fn begin_update(&mut self) -> bool {
        if self.updating {
            return false;
        }
        self.updating = true;
        true
    }

    pub fn end_update(&mut self) {
        self.updating = false;
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Decides what, if anything, must change on the counterpart after the
    /// owning endpoint moved. Pure; the guard protocol above is the caller's
    /// business.
    pub fn sync_update(
        &self,
        own: &PoseView,
        counterpart: &PoseView,
        frame: Option<&MirrorFrame>,
    ) -> Option<PoseUpdate> {
        match self.space {
            MirrorSpace::LocalSpace => {
                let position = (!own.relative.position_eq(&counterpart.relative, self.tolerance))
                    .then_some(own.relative.position);
                let rotation = (!own.relative.rotation_eq(&counterpart.relative, self.tolerance))
                    .then_some(own.relative.rotation);

                if position.is_none() && rotation.is_none() {
                    return None;
                }
                Some(PoseUpdate::Relative { position, rotation })
            }
            MirrorSpace::CenterSpace => {
                let desired = frame?.mirrored_pose(&own.world);
                if desired.approx_eq(&counterpart.world, self.tolerance) {
                    return None;
                }
                Some(PoseUpdate::World {
                    pose: desired,
                    teleport: if self.teleport_physics {
                        Teleport::Physics
                    } else {
                        Teleport::None
                    },
                })
            }
        }
    }
}
