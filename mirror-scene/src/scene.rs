use mirror_sync::{MirrorFrame, MirrorLink, Pose, PoseUpdate, PoseView, Teleport};
use nalgebra::{UnitQuaternion, Vector3};
use std::collections::BTreeMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(pub u32);

/// Physics settings of one collision body attached to an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodySettings {
    pub simulate_physics: bool,
    pub enable_gravity: bool,
}

#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    parent: Option<EntityId>,
    local: Pose,
    bodies: Vec<BodySettings>,
    link: Option<LinkId>,
    /// Set when the last update moved the entity in world space; the physics
    /// step consumes it. Rotation-only relative updates leave it untouched.
    pending_move: Option<Teleport>,
}

impl Entity {
    fn new(name: String, parent: Option<EntityId>, local: Pose) -> Self {
        Self {
            name,
            parent,
            local,
            bodies: Vec::new(),
            link: None,
            pending_move: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn local_pose(&self) -> Pose {
        self.local
    }

    pub fn bodies(&self) -> &[BodySettings] {
        &self.bodies
    }

    pub fn link(&self) -> Option<LinkId> {
        self.link
    }

    /// True when any attached body simulates physics, matching how the
    /// physics step treats the entity.
    pub fn simulates_physics(&self) -> bool {
        self.bodies.iter().any(|b| b.simulate_physics)
    }

    pub fn gravity_enabled(&self) -> bool {
        self.bodies.iter().any(|b| b.enable_gravity)
    }
}

/// One mirrored pair: the shared synchronization state plus the two entities
/// it spans and the optional center entity whose pose defines the mirror
/// frame. Neither entity is owned by the link.
#[derive(Debug, Clone)]
pub struct LinkInstance {
    pub link: MirrorLink,
    a: EntityId,
    b: EntityId,
    center: Option<EntityId>,
}

impl LinkInstance {
    pub fn endpoints(&self) -> (EntityId, EntityId) {
        (self.a, self.b)
    }

    pub fn center(&self) -> Option<EntityId> {
        self.center
    }

    pub fn counterpart_of(&self, id: EntityId) -> Option<EntityId> {
        if id == self.a {
            Some(self.b)
        } else if id == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Minimal scene graph standing in for the host engine: entities with
/// parent-relative poses, synchronous change notification, and the mirror
/// links that react to it.
#[derive(Debug, Default)]
pub struct Scene {
    entities: BTreeMap<EntityId, Entity>,
    links: BTreeMap<LinkId, LinkInstance>,
    next_entity_id: u32,
    next_link_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, name: &str) -> EntityId {
        self.spawn_at(name, Pose::identity())
    }

    pub fn spawn_at(&mut self, name: &str, pose: Pose) -> EntityId {
        self.insert_entity(Entity::new(name.to_string(), None, pose))
    }

    pub fn spawn_child(&mut self, name: &str, parent: EntityId, local: Pose) -> EntityId {
        self.insert_entity(Entity::new(name.to_string(), Some(parent), local))
    }

    fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.insert(id, entity);
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn add_body(&mut self, id: EntityId, body: BodySettings) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.bodies.push(body);
        }
    }

    pub fn link_instance(&self, id: LinkId) -> Option<&LinkInstance> {
        self.links.get(&id)
    }

    pub fn counterpart_of(&self, id: EntityId) -> Option<EntityId> {
        let link_id = self.entities.get(&id)?.link?;
        self.links.get(&link_id)?.counterpart_of(id)
    }

    pub fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter_map(|(child, entity)| (entity.parent == Some(id)).then_some(*child))
            .collect()
    }

    pub fn local_pose(&self, id: EntityId) -> Option<Pose> {
        self.entities.get(&id).map(|e| e.local)
    }

    pub fn world_pose(&self, id: EntityId) -> Option<Pose> {
        let entity = self.entities.get(&id)?;
        let mut pose = entity.local;
        let mut parent = entity.parent;
        while let Some(parent_id) = parent {
            let Some(ancestor) = self.entities.get(&parent_id) else {
                break;
            };
            pose = ancestor.local.transform(&pose);
            parent = ancestor.parent;
        }
        Some(pose)
    }

    fn pose_view(&self, id: EntityId) -> Option<PoseView> {
        Some(PoseView {
            world: self.world_pose(id)?,
            relative: self.local_pose(id)?,
        })
    }

    pub fn set_local_pose(&mut self, id: EntityId, pose: Pose) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.local = pose;
        entity.pending_move = Some(Teleport::None);
        self.transform_updated(id);
    }

    pub fn set_local_position(&mut self, id: EntityId, position: Vector3<f32>) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.local.position = position;
        entity.pending_move = Some(Teleport::None);
        self.transform_updated(id);
    }

    /// Unlike the position setters, a relative rotation does not raise the
    /// world-move marker.
    pub fn set_local_rotation(&mut self, id: EntityId, rotation: UnitQuaternion<f32>) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.local.rotation = rotation;
        self.transform_updated(id);
    }

    pub fn set_world_pose(&mut self, id: EntityId, pose: Pose, teleport: Teleport) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        let parent_world = entity
            .parent
            .and_then(|parent| self.world_pose(parent))
            .unwrap_or_default();

        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.local = parent_world.inverse().transform(&pose);
        entity.pending_move = Some(teleport);
        self.transform_updated(id);
    }

    /// Consumes the entity's pending world-move marker, the way the physics
    /// step would.
    pub fn take_pending_move(&mut self, id: EntityId) -> Option<Teleport> {
        self.entities.get_mut(&id)?.pending_move.take()
    }

    /// Synchronous "pose changed" notification. Runs the entity's mirror
    /// link, then the links of every descendant, since a parent move changes
    /// their world poses too.
    fn transform_updated(&mut self, id: EntityId) {
        self.sync_link(id);
        for child in self.children(id) {
            self.transform_updated(child);
        }
    }

    fn sync_link(&mut self, id: EntityId) {
        let Some(link_id) = self.entities.get(&id).and_then(|e| e.link) else {
            return;
        };
        let Some(instance) = self.links.get(&link_id) else {
            return;
        };
        let Some(counterpart) = instance.counterpart_of(id) else {
            return;
        };
        let center = instance.center;

        let Some(own) = self.pose_view(id) else {
            return;
        };
        let Some(other) = self.pose_view(counterpart) else {
            return;
        };
        let frame = self.mirror_frame_of(center);

        let Some(instance) = self.links.get_mut(&link_id) else {
            return;
        };
        if !instance.link.begin_update() {
            // An update on this link is already in flight; this notification
            // is the echo of it. Drop it instead of recursing.
            return;
        }
        let update = instance.link.sync_update(&own, &other, frame.as_ref());

        if let Some(update) = update {
            self.apply_update(counterpart, update);
        }
        if let Some(instance) = self.links.get_mut(&link_id) {
            instance.link.end_update();
        }
    }

    fn apply_update(&mut self, id: EntityId, update: PoseUpdate) {
        match update {
            PoseUpdate::Relative { position, rotation } => {
                if let Some(position) = position {
                    self.set_local_position(id, position);
                }
                if let Some(rotation) = rotation {
                    self.set_local_rotation(id, rotation);
                }
            }
            PoseUpdate::World { pose, teleport } => self.set_world_pose(id, pose, teleport),
        }
    }

    /// Resolves the mirror frame from the center entity's current world
    /// pose. A missing or dead center means no frame, which skips mirroring.
    pub(crate) fn mirror_frame_of(&self, center: Option<EntityId>) -> Option<MirrorFrame> {
        let pose = self.world_pose(center?)?;
        Some(MirrorFrame::from_pose(&pose))
    }

    pub(crate) fn insert_link(
        &mut self,
        link: MirrorLink,
        a: EntityId,
        b: EntityId,
        center: Option<EntityId>,
    ) -> LinkId {
        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        self.links.insert(id, LinkInstance { link, a, b, center });
        if let Some(entity) = self.entities.get_mut(&a) {
            entity.link = Some(id);
        }
        if let Some(entity) = self.entities.get_mut(&b) {
            entity.link = Some(id);
        }
        id
    }

    /// Tears a link down; both entities survive and further pose changes on
    /// either become no-ops for the pair.
    pub fn remove_link(&mut self, id: LinkId) {
        let Some(instance) = self.links.remove(&id) else {
            return;
        };
        for endpoint in [instance.a, instance.b] {
            if let Some(entity) = self.entities.get_mut(&endpoint) {
                entity.link = None;
            }
        }
    }

    /// Removes an entity and its descendants. Links it takes part in are
    /// torn down; links it only centers stay and mirror nothing until a new
    /// center exists.
    pub fn remove_entity(&mut self, id: EntityId) {
        let Some(entity) = self.entities.remove(&id) else {
            return;
        };
        if let Some(link_id) = entity.link {
            self.remove_link(link_id);
        }
        for child in self.children(id) {
            self.remove_entity(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn world_pose_composes_through_parents() {
        let mut scene = Scene::new();
        let root = scene.spawn_at(
            "root",
            Pose::new(
                Vector3::new(10.0, 0.0, 0.0),
                UnitQuaternion::from_euler_angles(0.0, 0.0, FRAC_PI_2),
            ),
        );
        let child = scene.spawn_child("child", root, Pose::from_position(Vector3::new(1.0, 0.0, 0.0)));

        let world = scene.world_pose(child).unwrap();
        assert_relative_eq!(world.position, Vector3::new(10.0, 1.0, 0.0), epsilon = 1.0e-5);
    }

    #[test]
    fn set_world_pose_round_trips_through_the_parent() {
        let mut scene = Scene::new();
        let root = scene.spawn_at(
            "root",
            Pose::new(
                Vector3::new(-3.0, 2.0, 1.0),
                UnitQuaternion::from_euler_angles(0.3, -0.2, 0.9),
            ),
        );
        let child = scene.spawn_child("child", root, Pose::identity());

        let target = Pose::new(
            Vector3::new(4.0, 4.0, 4.0),
            UnitQuaternion::from_euler_angles(0.0, 0.1, 0.0),
        );
        scene.set_world_pose(child, target, Teleport::None);

        assert!(scene.world_pose(child).unwrap().approx_eq(&target, 1.0e-4));
    }

    #[test]
    fn rotation_setter_leaves_the_move_marker_alone() {
        let mut scene = Scene::new();
        let id = scene.spawn("thing");

        scene.set_local_rotation(id, UnitQuaternion::from_euler_angles(0.0, 0.0, 1.0));
        assert_eq!(scene.take_pending_move(id), None);

        scene.set_local_position(id, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(scene.take_pending_move(id), Some(Teleport::None));
        assert_eq!(scene.take_pending_move(id), None);

        scene.set_world_pose(id, Pose::identity(), Teleport::Physics);
        assert_eq!(scene.take_pending_move(id), Some(Teleport::Physics));
    }

    #[test]
    fn removing_an_entity_cascades_and_clears_links() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn("b");
        let child = scene.spawn_child("a child", a, Pose::identity());
        let link = scene.insert_link(MirrorLink::default(), a, b, None);

        scene.remove_entity(a);

        assert!(scene.entity(a).is_none());
        assert!(scene.entity(child).is_none());
        assert!(scene.link_instance(link).is_none());
        assert_eq!(scene.entity(b).unwrap().link(), None);
    }

    #[test]
    fn physics_flags_or_across_bodies() {
        let mut scene = Scene::new();
        let id = scene.spawn("crate");
        scene.add_body(id, BodySettings::default());
        scene.add_body(
            id,
            BodySettings {
                simulate_physics: true,
                enable_gravity: false,
            },
        );

        let entity = scene.entity(id).unwrap();
        assert!(entity.simulates_physics());
        assert!(!entity.gravity_enabled());
    }
}
