//! Scene composer
//!
//! Builds the synchronous part of the graph at construction time and the
//! camera-fed drawable once its texture resolves.

use std::sync::Arc;

use glam::Vec3;

use super::{Color, DirectionalLight, Geometry, LineMaterial, Material, NodeId, PhongMaterial, Scene};
use crate::capture::VideoTexture;
use crate::config::{ModelConfig, ViewportConfig};

/// Assembles lights and drawables from configuration
pub struct SceneComposer {
    config: ViewportConfig,
}

impl SceneComposer {
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Light plus every drawable that does not wait on a live texture
    ///
    /// Returns the node the render loop animates, when one exists yet.
    pub fn build_static_graph(&self) -> (Scene, Option<NodeId>) {
        let mut scene = Scene::new();
        let light = &self.config.light;
        scene.add_light(DirectionalLight {
            color: Color::from_hex(light.color),
            intensity: light.intensity,
            position: Vec3::from_array(light.position),
        });

        if self.config.capture.enabled {
            // The textured cube is added when the stream resolves
            return (scene, None);
        }

        let model = &self.config.model;
        let geometry = Arc::new(box_geometry(model));
        let fill = scene.attach_drawable(
            geometry.clone(),
            Material::Phong(PhongMaterial::with_color(Color::from_hex(model.fill_color))),
        );

        let tracked = match model.outline_color {
            Some(outline_color) => {
                let outline = scene.attach_outline(
                    &geometry,
                    LineMaterial {
                        color: Color::from_hex(outline_color),
                    },
                );
                scene.attach_group(&[fill, outline])
            }
            None => fill,
        };

        (scene, Some(tracked))
    }

    /// Insert the drawable painted with the live camera texture
    pub fn attach_camera_drawable(&self, scene: &mut Scene, texture: VideoTexture) -> NodeId {
        let geometry = Arc::new(box_geometry(&self.config.model));
        scene.attach_drawable(geometry, Material::Phong(PhongMaterial::with_map(texture)))
    }
}

fn box_geometry(model: &ModelConfig) -> Geometry {
    let [width, height, depth] = model.size;
    Geometry::cuboid(width, height, depth, model.segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::test_texture;
    use crate::config::Variant;
    use crate::scene::{NodeKind, Topology};

    #[test]
    fn test_basic_graph() {
        let composer = SceneComposer::new(&ViewportConfig::for_variant(Variant::Basic));
        let (scene, tracked) = composer.build_static_graph();

        assert_eq!(scene.lights().len(), 1);
        assert_eq!(scene.lights()[0].position, Vec3::new(-1.0, 2.0, 4.0));
        assert_eq!(scene.len(), 1);
        let node = scene.node(tracked.unwrap()).unwrap();
        assert!(matches!(&node.kind, NodeKind::Drawable { .. }));
    }

    #[test]
    fn test_wireframe_graph_groups_fill_and_outline() {
        let composer = SceneComposer::new(&ViewportConfig::for_variant(Variant::Wireframe));
        let (scene, tracked) = composer.build_static_graph();

        let group = scene.node(tracked.unwrap()).unwrap();
        let NodeKind::Group { children } = &group.kind else {
            panic!("expected the tracked node to be a group");
        };
        assert_eq!(children.len(), 2);

        let items = scene.draw_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].geometry.topology, Topology::Triangles);
        assert_eq!(items[1].geometry.topology, Topology::Lines);
        assert_eq!(items[0].geometry.edges(), items[1].geometry.edges());
        assert_eq!(items[0].geometry.vertex_count(), 54);
    }

    #[test]
    fn test_webcam_graph_waits_for_texture() {
        let composer = SceneComposer::new(&ViewportConfig::for_variant(Variant::Webcam));
        let (mut scene, tracked) = composer.build_static_graph();
        assert!(tracked.is_none());
        assert!(scene.is_empty());
        assert_eq!(scene.lights().len(), 1);

        let texture = test_texture();
        let id = composer.attach_camera_drawable(&mut scene, texture.clone());
        assert_eq!(scene.drawables_using(&texture), 1);
        assert_eq!(scene.draw_items()[0].id, id);
    }
}
