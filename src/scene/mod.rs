//! Scene graph
//!
//! An arena of nodes addressed by [`NodeId`]. Drawables hold shared geometry
//! so a fill pass and its outline stay built from the same shape data.
//! Groups move their children as one unit.

pub mod composer;
pub mod geometry;
pub mod material;

pub use composer::SceneComposer;
pub use geometry::{Geometry, Topology, Vertex};
pub use material::{Color, LineMaterial, Material, PhongMaterial};

use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::capture::VideoTexture;

/// Handle to a node, returned at insertion and used for later mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Position and Euler rotation (XYZ order, radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_rotation_translation(rotation, self.position)
    }
}

/// Directional light shining from `position` toward the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
}

impl DirectionalLight {
    /// Unit vector from the lit surface toward the light
    pub fn direction(&self) -> Vec3 {
        self.position.normalize_or_zero()
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Geometry plus paint, drawn as triangles or lines per the geometry's topology
    Drawable {
        geometry: Arc<Geometry>,
        material: Material,
    },
    Group { children: Vec<NodeId> },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub transform: Transform,
    /// Set once the node has been placed under a group
    parent: Option<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// A drawable resolved to world space, ready for a draw call
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub id: NodeId,
    pub geometry: &'a Arc<Geometry>,
    pub material: &'a Material,
    pub world: Mat4,
}

/// Lights and nodes to draw
#[derive(Debug, Default)]
pub struct Scene {
    lights: Vec<DirectionalLight>,
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_light(&mut self, light: DirectionalLight) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[DirectionalLight] {
        &self.lights
    }

    /// Create and insert one drawable at the root
    pub fn attach_drawable(&mut self, geometry: Arc<Geometry>, material: Material) -> NodeId {
        self.insert(NodeKind::Drawable { geometry, material })
    }

    /// Insert an outline pass derived from `fill`'s shape data
    pub fn attach_outline(&mut self, fill: &Geometry, material: LineMaterial) -> NodeId {
        self.attach_drawable(Arc::new(fill.wireframe()), Material::Line(material))
    }

    /// Group existing root nodes under a new node so they move as one
    ///
    /// Children that already have a parent are left where they are.
    pub fn attach_group(&mut self, children: &[NodeId]) -> NodeId {
        let group = NodeId(self.nodes.len());
        let mut adopted = Vec::with_capacity(children.len());
        for &child in children {
            if let Some(node) = self.nodes.get_mut(child.0) {
                if node.parent.is_none() {
                    node.parent = Some(group);
                    adopted.push(child);
                }
            }
        }
        self.insert(NodeKind::Group { children: adopted })
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            transform: Transform::default(),
            parent: None,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of drawables sampling the given live texture
    pub fn drawables_using(&self, texture: &VideoTexture) -> usize {
        self.nodes
            .iter()
            .filter(|node| match &node.kind {
                NodeKind::Drawable { material, .. } => {
                    material.texture().is_some_and(|t| t.same_feed(texture))
                }
                NodeKind::Group { .. } => false,
            })
            .count()
    }

    /// Number of drawables sampling any live texture
    pub fn textured_drawables(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| {
                matches!(&node.kind, NodeKind::Drawable { material, .. } if material.texture().is_some())
            })
            .count()
    }

    /// Every drawable with its world matrix, parents before children
    pub fn draw_items(&self) -> Vec<DrawItem<'_>> {
        let mut items = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            if node.parent.is_none() {
                self.collect(NodeId(index), Mat4::IDENTITY, &mut items);
            }
        }
        items
    }

    fn collect<'a>(&'a self, id: NodeId, parent_world: Mat4, items: &mut Vec<DrawItem<'a>>) {
        let Some(node) = self.nodes.get(id.0) else { return };
        let world = parent_world * node.transform.matrix();
        match &node.kind {
            NodeKind::Drawable { geometry, material } => items.push(DrawItem {
                id,
                geometry,
                material,
                world,
            }),
            NodeKind::Group { children } => {
                for &child in children {
                    self.collect(child, world, items);
                }
            }
        }
    }
}
