//! TOML scene descriptions.
//!
//! ```toml
//! ambient = [0.1, 0.1, 0.1]
//!
//! [camera]
//! origin = [0.0, 0.0, 0.0]
//! direction = [0.0, 0.0, 20.0]
//! orientation = [0.0, 1.0, 0.0]
//! size = [16.0, 12.0]
//! resolution = [160, 120]
//!
//! [render]
//! levels = 3
//! oversampling = 2
//! sampler = "jittered"    # or { halton = { base_x = 2, base_y = 3 } }
//!
//! [[primitives]]
//! kind = "sphere"
//! center = [0.0, 0.0, 20.0]
//! radius = 2.0
//! color = [0.0, 0.0, 1.0]
//! reflection = 0.5
//!
//! [[lights]]
//! center = [-20.0, 20.0, 0.0]
//! color = [400.0, 400.0, 400.0]
//! ```

use std::path::Path;
use std::sync::Arc;

use irt_geom::shapes::{Cuboid, Sphere, Triangle};
use irt_geom::{Material, Surface};
use irt_kdtree::BuildSettings;
use irt_math::{Color, Point3, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::Camera;
use crate::error::{Result, SceneError};
use crate::light::Light;
use crate::raytracer::RenderSettings;
use crate::scene::Scene;

/// A complete scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Ambient color added to every hit, scaled by the surface color.
    #[serde(default = "black")]
    pub ambient: Color,
    /// Viewer.
    pub camera: CameraDescription,
    /// Rendering parameters.
    #[serde(default)]
    pub render: RenderSettings,
    /// Explicit kd-tree parameters; automatic when absent.
    #[serde(default)]
    pub kdtree: Option<BuildSettings>,
    /// Geometry.
    #[serde(default)]
    pub primitives: Vec<PrimitiveDescription>,
    /// Point lights.
    #[serde(default)]
    pub lights: Vec<LightDescription>,
}

fn black() -> Color {
    Color::zeros()
}

/// Camera section of a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescription {
    /// Eye position.
    pub origin: Point3,
    /// Line of sight to the screen center.
    pub direction: Vec3,
    /// Screen up vector.
    pub orientation: Vec3,
    /// Physical screen `[width, height]`.
    pub size: [f64; 2],
    /// Pixel `[width, height]`.
    pub resolution: [u32; 2],
}

impl CameraDescription {
    /// Build the camera.
    pub fn to_camera(&self) -> Result<Camera> {
        Camera::new(
            self.origin,
            self.direction,
            self.orientation,
            (self.size[0], self.size[1]),
            (self.resolution[0], self.resolution[1]),
        )
    }
}

/// Geometry of a primitive entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    /// A sphere.
    Sphere {
        /// Center.
        center: Point3,
        /// Radius.
        radius: f64,
    },
    /// An axis-aligned box spanned by two opposite corners.
    Cuboid {
        /// First corner.
        low: Point3,
        /// Opposite corner.
        high: Point3,
    },
    /// A triangle.
    Triangle {
        /// Corners.
        vertices: [Point3; 3],
    },
}

/// A `[[primitives]]` entry: a shape and its material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveDescription {
    /// Geometry.
    #[serde(flatten)]
    pub shape: Shape,
    /// Reflectance; omitted fields take [`Material::default`] values.
    #[serde(flatten)]
    pub material: Material,
}

impl PrimitiveDescription {
    /// Instantiate the primitive.
    pub fn to_surface(&self) -> Result<Arc<dyn Surface>> {
        let surface: Arc<dyn Surface> = match self.shape {
            Shape::Sphere { center, radius } => {
                if !(radius > 0.0) {
                    return Err(SceneError::Config(format!("sphere radius must be positive, got {radius}")));
                }
                Arc::new(Sphere::new(center, radius).with_material(self.material))
            }
            Shape::Cuboid { low, high } => Arc::new(Cuboid::new(low, high).with_material(self.material)),
            Shape::Triangle { vertices: [a, b, c] } => {
                if (b - a).cross(&(c - a)).norm_squared() == 0.0 {
                    return Err(SceneError::Config("degenerate triangle".into()));
                }
                Arc::new(Triangle::new(a, b, c).with_material(self.material))
            }
        };
        Ok(surface)
    }
}

/// A `[[lights]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDescription {
    /// Position.
    pub center: Point3,
    /// Color at unit distance.
    pub color: Color,
}

/// Everything needed to render a scene file.
#[derive(Debug)]
pub struct LoadedScene {
    /// Scene with its kd-tree built.
    pub scene: Scene,
    /// Viewer.
    pub camera: Camera,
    /// Rendering parameters.
    pub render: RenderSettings,
}

impl SceneDescription {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| SceneError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| SceneError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| SceneError::Config(e.to_string()))
    }

    /// Instantiate primitives and lights. The kd-tree is not built.
    pub fn to_scene(&self) -> Result<Scene> {
        let mut scene = Scene::new();
        scene.set_ambient(self.ambient);
        for primitive in &self.primitives {
            scene.add_primitive(primitive.to_surface()?)?;
        }
        for light in &self.lights {
            scene.add_light(Arc::new(Light::new(light.center, light.color)))?;
        }
        Ok(scene)
    }

    /// Validate, instantiate and build the kd-tree.
    #[tracing::instrument(skip_all, fields(primitives = self.primitives.len(), lights = self.lights.len()))]
    pub fn load(&self) -> Result<LoadedScene> {
        self.render.validate()?;
        let camera = self.camera.to_camera()?;
        let mut scene = self.to_scene()?;
        match self.kdtree {
            Some(settings) => scene.build_tree(settings)?,
            None => scene.build_tree_automatic()?,
        };
        debug!("scene loaded");
        Ok(LoadedScene {
            scene,
            camera,
            render: self.render,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SamplerKind;

    const SCENE: &str = r#"
ambient = [0.1, 0.1, 0.1]

[camera]
origin = [0.0, 0.0, 0.0]
direction = [0.0, 0.0, 20.0]
orientation = [0.0, 1.0, 0.0]
size = [16.0, 12.0]
resolution = [32, 24]

[render]
levels = 2
oversampling = 3
sampler = "multi-jittered"
seed = 9

[[primitives]]
kind = "sphere"
center = [0.0, 0.0, 20.0]
radius = 2.0
color = [0.0, 0.0, 1.0]
reflection = 0.5

[[primitives]]
kind = "cuboid"
low = [-10.0, -3.0, 10.0]
high = [10.0, -2.0, 30.0]

[[primitives]]
kind = "triangle"
vertices = [[-5.0, 5.0, 25.0], [5.0, 5.0, 25.0], [0.0, 8.0, 25.0]]
diffuse = 0.5

[[lights]]
center = [-20.0, 20.0, 0.0]
color = [400.0, 400.0, 400.0]
"#;

    #[test]
    fn test_parse_full_description() {
        let desc = SceneDescription::from_toml_str(SCENE).unwrap();
        assert_eq!(desc.ambient, Color::new(0.1, 0.1, 0.1));
        assert_eq!(desc.camera.resolution, [32, 24]);
        assert_eq!(desc.render.levels, 2);
        assert_eq!(desc.render.sampler, SamplerKind::MultiJittered);
        assert_eq!(desc.kdtree, None);
        assert_eq!(desc.primitives.len(), 3);
        assert_eq!(desc.lights.len(), 1);

        let sphere = &desc.primitives[0];
        assert_eq!(
            sphere.shape,
            Shape::Sphere {
                center: Point3::new(0.0, 0.0, 20.0),
                radius: 2.0
            }
        );
        assert_eq!(sphere.material.color, Color::new(0.0, 0.0, 1.0));
        assert_eq!(sphere.material.reflection, 0.5);
        assert_eq!(sphere.material.diffuse, 1.0);

        // Unspecified material fields fall back to the defaults.
        assert_eq!(desc.primitives[1].material, Material::default());
        assert_eq!(desc.primitives[2].material.diffuse, 0.5);
    }

    #[test]
    fn test_load_builds_tree() {
        let loaded = SceneDescription::from_toml_str(SCENE).unwrap().load().unwrap();
        assert_eq!(loaded.scene.len(), 3);
        assert_eq!(loaded.scene.lights().len(), 1);
        assert!(loaded.scene.kd_tree().is_some());
        assert_eq!(loaded.camera.resolution(), (32, 24));
        assert_eq!(loaded.render.oversampling, 3);
    }

    #[test]
    fn test_defaults_and_explicit_tree_settings() {
        let source = r#"
[camera]
origin = [0.0, 0.0, 0.0]
direction = [0.0, 0.0, 1.0]
orientation = [0.0, 1.0, 0.0]
size = [1.0, 1.0]
resolution = [8, 8]

[kdtree]
max_depth = 4
max_failures = 1
failure_ratio = 0.5

[render]
sampler = { halton = { base_x = 2, base_y = 5 } }

[[primitives]]
kind = "sphere"
center = [0.0, 0.0, 5.0]
radius = 1.0
"#;
        let desc = SceneDescription::from_toml_str(source).unwrap();
        assert_eq!(desc.ambient, Color::zeros());
        assert_eq!(desc.render.levels, 3);
        assert_eq!(desc.render.sampler, SamplerKind::Halton { base_x: 2, base_y: 5 });
        assert_eq!(
            desc.kdtree,
            Some(BuildSettings {
                max_depth: 4,
                max_failures: 1,
                failure_ratio: 0.5
            })
        );
        assert!(desc.lights.is_empty());
        assert!(desc.load().is_ok());
    }

    #[test]
    fn test_bundled_demo_loads() {
        let desc = SceneDescription::from_toml_str(include_str!("../../../demos/spheres.toml")).unwrap();
        let loaded = desc.load().unwrap();
        assert_eq!(loaded.scene.len(), 5);
        assert_eq!(loaded.render.sampler, SamplerKind::Jittered);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let desc = SceneDescription::from_toml_str(SCENE).unwrap();
        let text = desc.to_toml_string().unwrap();
        assert_eq!(SceneDescription::from_toml_str(&text).unwrap(), desc);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            SceneDescription::from_toml_str("ambient = 3"),
            Err(SceneError::Config(_))
        ));

        let mut desc = SceneDescription::from_toml_str(SCENE).unwrap();
        desc.primitives[0].shape = Shape::Sphere {
            center: Point3::origin(),
            radius: -1.0,
        };
        assert!(matches!(desc.to_scene(), Err(SceneError::Config(_))));

        let mut desc = SceneDescription::from_toml_str(SCENE).unwrap();
        desc.primitives.clear();
        assert!(matches!(
            desc.load(),
            Err(SceneError::KdTree(irt_kdtree::KdTreeError::EmptyPrimitiveSet))
        ));
    }
}
