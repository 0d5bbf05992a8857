//! Scene-graph abstraction and a concrete hierarchical scene.
//!
//! The engine only sees meshes through [`SceneGraph::visit_meshes`] and
//! [`SceneMesh`]; all LOD bookkeeping stays in the engine's side table keyed
//! by [`ObjectId`].

use std::sync::Arc;

use glam::Mat4;
use rustc_hash::FxHashMap;
use tessera_mesh::{Geometry, Material};

/// Stable identity of a scene object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// A renderable mesh as seen by the LOD engine.
pub trait SceneMesh {
    fn id(&self) -> ObjectId;
    /// Exempt meshes are never tracked or modified.
    fn lod_exempt(&self) -> bool;
    fn world_matrix(&self) -> Mat4;
    fn geometry(&self) -> &Arc<Geometry>;
    fn set_geometry(&mut self, geometry: Arc<Geometry>);
    fn material(&self) -> Option<&Arc<Material>>;
    fn set_material(&mut self, material: Arc<Material>);
    fn visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
}

/// Anything that can enumerate its meshes mutably.
pub trait SceneGraph {
    fn visit_meshes(&mut self, visitor: &mut dyn FnMut(&mut dyn SceneMesh));
}

/// Renderable payload of a [`Node`].
#[derive(Clone, Debug)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub material: Option<Arc<Material>>,
}

#[derive(Clone, Debug)]
pub struct Node {
    id: ObjectId,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    /// Transform relative to the parent.
    pub local: Mat4,
    world: Mat4,
    pub visible: bool,
    pub lod_exempt: bool,
    pub mesh: Option<Mesh>,
}

impl Node {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// World transform as of the last traversal.
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }
}

/// In-memory scene of groups and meshes.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: FxHashMap<ObjectId, Node>,
    roots: Vec<ObjectId>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, parent: Option<ObjectId>, local: Mat4, mesh: Option<Mesh>) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        // A missing parent attaches the node at the root.
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }
        let world = match parent.and_then(|p| self.nodes.get(&p)) {
            Some(parent_node) => parent_node.world * local,
            None => local,
        };
        self.nodes.insert(
            id,
            Node {
                id,
                parent,
                children: Vec::new(),
                local,
                world,
                visible: true,
                lod_exempt: false,
                mesh,
            },
        );
        id
    }

    /// Add an empty transform node.
    pub fn add_group(&mut self, parent: Option<ObjectId>, local: Mat4) -> ObjectId {
        self.insert(parent, local, None)
    }

    pub fn add_mesh(
        &mut self,
        parent: Option<ObjectId>,
        local: Mat4,
        geometry: Arc<Geometry>,
        material: Option<Arc<Material>>,
    ) -> ObjectId {
        self.insert(parent, local, Some(Mesh { geometry, material }))
    }

    /// Remove a node and its whole subtree. Returns how many nodes went.
    pub fn remove(&mut self, id: ObjectId) -> usize {
        let Some(node) = self.nodes.get(&id) else {
            return 0;
        };
        match node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent) => parent.children.retain(|&c| c != id),
            None => self.roots.retain(|&r| r != id),
        }
        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    pub fn node(&self, id: ObjectId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first order with each node's freshly composed world matrix.
    fn traversal(&self) -> Vec<(ObjectId, Mat4)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(ObjectId, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|&id| (id, Mat4::IDENTITY))
            .collect();
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let world = parent_world * node.local;
            order.push((id, world));
            stack.extend(node.children.iter().rev().map(|&c| (c, world)));
        }
        order
    }

    /// Recompose every node's world matrix from the local transforms.
    pub fn update_world_matrices(&mut self) {
        for (id, world) in self.traversal() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.world = world;
            }
        }
    }
}

struct MeshView<'a> {
    id: ObjectId,
    world: Mat4,
    lod_exempt: bool,
    visible: &'a mut bool,
    mesh: &'a mut Mesh,
}

impl SceneMesh for MeshView<'_> {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn lod_exempt(&self) -> bool {
        self.lod_exempt
    }

    fn world_matrix(&self) -> Mat4 {
        self.world
    }

    fn geometry(&self) -> &Arc<Geometry> {
        &self.mesh.geometry
    }

    fn set_geometry(&mut self, geometry: Arc<Geometry>) {
        self.mesh.geometry = geometry;
    }

    fn material(&self) -> Option<&Arc<Material>> {
        self.mesh.material.as_ref()
    }

    fn set_material(&mut self, material: Arc<Material>) {
        self.mesh.material = Some(material);
    }

    fn visible(&self) -> bool {
        *self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        *self.visible = visible;
    }
}

impl SceneGraph for Scene {
    fn visit_meshes(&mut self, visitor: &mut dyn FnMut(&mut dyn SceneMesh)) {
        for (id, world) in self.traversal() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            node.world = world;
            let Node {
                visible,
                lod_exempt,
                mesh,
                ..
            } = node;
            if let Some(mesh) = mesh.as_mut() {
                let mut view = MeshView {
                    id,
                    world,
                    lod_exempt: *lod_exempt,
                    visible,
                    mesh,
                };
                visitor(&mut view);
            }
        }
    }
}
