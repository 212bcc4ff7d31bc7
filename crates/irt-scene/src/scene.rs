//! The scene: primitives, lights, the kd-tree over them and the shading
//! equation.

use std::sync::Arc;

use irt_geom::{BoundingBox, MaterialPoint, Primitive, Ray, Surface};
use irt_kdtree::{BuildSettings, Hit, KdTree, KdTreeBuilder};
use irt_math::{Color, Point3};
use tracing::debug;

use crate::error::{Result, SceneError};
use crate::light::Light;

/// Primitives and lights to render.
///
/// Every edit of the primitive list drops the kd-tree; ray queries fail
/// with [`SceneError::TreeNotBuilt`] until [`Scene::build_tree`] runs again.
#[derive(Debug, Default)]
pub struct Scene {
    primitives: Vec<Arc<dyn Surface>>,
    lights: Vec<Arc<Light>>,
    tree: Option<KdTree>,
    bounds: BoundingBox,
    ambient: Color,
}

impl Scene {
    /// An empty scene with a black ambient color.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primitive and return its index.
    pub fn add_primitive(&mut self, primitive: Arc<dyn Surface>) -> Result<usize> {
        if self.primitives.iter().any(|p| Arc::ptr_eq(p, &primitive)) {
            return Err(SceneError::DuplicatePrimitive);
        }
        self.bounds.include(&primitive.bounding_box());
        self.primitives.push(primitive);
        self.tree = None;
        Ok(self.primitives.len() - 1)
    }

    /// The primitive at `index`.
    pub fn primitive(&self, index: usize) -> Result<&Arc<dyn Surface>> {
        self.primitives.get(index).ok_or(SceneError::IndexOutOfRange {
            index,
            len: self.primitives.len(),
        })
    }

    /// Index of a primitive handle.
    pub fn primitive_index(&self, primitive: &Arc<dyn Surface>) -> Result<usize> {
        self.primitives
            .iter()
            .position(|p| Arc::ptr_eq(p, primitive))
            .ok_or(SceneError::PrimitiveNotFound)
    }

    /// Remove and return the primitive at `index`.
    ///
    /// Later primitives shift down by one.
    pub fn remove_primitive(&mut self, index: usize) -> Result<Arc<dyn Surface>> {
        if index >= self.primitives.len() {
            return Err(SceneError::IndexOutOfRange {
                index,
                len: self.primitives.len(),
            });
        }
        let removed = self.primitives.remove(index);
        self.tree = None;
        self.compute_bounding_box();
        debug!(index, remaining = self.primitives.len(), "primitive removed");
        Ok(removed)
    }

    /// All primitives, in index order.
    pub fn primitives(&self) -> &[Arc<dyn Surface>] {
        &self.primitives
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// True if the scene holds no primitive.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Add a light and return its index.
    pub fn add_light(&mut self, light: Arc<Light>) -> Result<usize> {
        if self.lights.iter().any(|l| Arc::ptr_eq(l, &light)) {
            return Err(SceneError::DuplicateLight);
        }
        self.lights.push(light);
        Ok(self.lights.len() - 1)
    }

    /// The light at `index`.
    pub fn light(&self, index: usize) -> Result<&Arc<Light>> {
        self.lights.get(index).ok_or(SceneError::IndexOutOfRange {
            index,
            len: self.lights.len(),
        })
    }

    /// Index of a light handle.
    pub fn light_index(&self, light: &Arc<Light>) -> Result<usize> {
        self.lights
            .iter()
            .position(|l| Arc::ptr_eq(l, light))
            .ok_or(SceneError::LightNotFound)
    }

    /// Remove and return the light at `index`.
    pub fn remove_light(&mut self, index: usize) -> Result<Arc<Light>> {
        if index >= self.lights.len() {
            return Err(SceneError::IndexOutOfRange {
                index,
                len: self.lights.len(),
            });
        }
        Ok(self.lights.remove(index))
    }

    /// All lights, in index order.
    pub fn lights(&self) -> &[Arc<Light>] {
        &self.lights
    }

    /// Ambient color.
    pub fn ambient(&self) -> Color {
        self.ambient
    }

    /// Set the ambient color.
    pub fn set_ambient(&mut self, ambient: Color) {
        self.ambient = ambient;
    }

    /// Union of all primitive bounds. Empty (inverted) for an empty scene.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Recompute the bounding box from scratch.
    pub fn compute_bounding_box(&mut self) {
        self.bounds = self
            .primitives
            .iter()
            .fold(BoundingBox::empty(), |acc, p| acc.union(&p.bounding_box()));
    }

    /// Build the kd-tree over the current primitives.
    #[tracing::instrument(skip_all, fields(primitives = self.primitives.len()))]
    pub fn build_tree(&mut self, settings: BuildSettings) -> Result<&KdTree> {
        let tree = KdTreeBuilder::new(settings).build(&self.primitives, self.bounds)?;
        Ok(&*self.tree.insert(tree))
    }

    /// Build the kd-tree with [`BuildSettings::automatic`].
    pub fn build_tree_automatic(&mut self) -> Result<&KdTree> {
        self.build_tree(BuildSettings::automatic(self.primitives.len()))
    }

    /// The kd-tree, if built since the last edit.
    pub fn kd_tree(&self) -> Option<&KdTree> {
        self.tree.as_ref()
    }

    fn tree(&self) -> Result<&KdTree> {
        self.tree.as_ref().ok_or(SceneError::TreeNotBuilt)
    }

    /// Nearest primitive hit between `t_near` and `t_far`.
    pub fn first_collision(&self, ray: &Ray, t_near: f64, t_far: f64) -> Result<Option<Hit>> {
        Ok(self.tree()?.first_hit(&self.primitives, ray, t_near, t_far)?)
    }

    /// Depth of the kd-tree leaf holding the nearest hit.
    pub fn hit_level(&self, ray: &Ray, t_near: f64, t_far: f64) -> Result<Option<u32>> {
        Ok(self.tree()?.hit_level(&self.primitives, ray, t_near, t_far)?)
    }

    /// Distance to the nearest hit.
    pub fn hit_distance(&self, ray: &Ray, t_near: f64, t_far: f64) -> Result<Option<f64>> {
        Ok(self.tree()?.hit_distance(&self.primitives, ray, t_near, t_far)?)
    }

    /// True if a primitive blocks `ray` before `max_distance`.
    pub fn test_collision(&self, ray: &Ray, max_distance: f64) -> Result<bool> {
        Ok(self.tree()?.occluded(&self.primitives, ray, 0.0, max_distance)?)
    }

    /// Direct light reaching `point` on primitive `primitive`.
    ///
    /// Sums, over the unshadowed lights facing the surface,
    /// `color * (path · normal) * diffuse ⊙ light.color / distance²`.
    pub fn compute_color(&self, point: &Point3, material_point: &MaterialPoint, primitive: usize) -> Result<Color> {
        let material = self.primitive(primitive)?.material();
        let mut color = Color::zeros();

        for light in &self.lights {
            let path = light.center - *point;
            let Some(ray) = Ray::try_new(*point, path) else {
                continue;
            };
            let distance = path.norm();
            if self.test_collision(&ray, distance)? {
                continue;
            }

            let cosphi = ray.direction.dot(&material_point.normal) * material.diffuse;
            if cosphi < 0.0 {
                continue;
            }
            color += (material.color * cosphi).component_mul(&light.color_at(distance));
        }

        Ok(color)
    }
}
