//! Whitted-style recursive ray tracing over a [`Scene`].

use irt_geom::{BoundingBox, Ray};
use irt_math::Color;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::Camera;
use crate::error::{Result, SceneError};
use crate::sampler::{SamplePattern, SamplerKind};
use crate::scene::Scene;

/// Number of color channels per pixel in [`Raytracer::draw`] output.
pub const CHANNELS: usize = 3;

/// Rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Number of reflection bounces after the primary hit.
    pub levels: u32,
    /// Samples per pixel along each axis.
    pub oversampling: u32,
    /// Sample placement.
    pub sampler: SamplerKind,
    /// Seed for the random samplers.
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            levels: 3,
            oversampling: 2,
            sampler: SamplerKind::Uniform,
            seed: 0,
        }
    }
}

impl RenderSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.oversampling == 0 {
            return Err(SceneError::InvalidSettings("oversampling must be at least 1".into()));
        }
        if let SamplerKind::Halton { base_x, base_y } = self.sampler {
            if base_x < 2 || base_y < 2 {
                return Err(SceneError::InvalidSettings("halton bases must be at least 2".into()));
            }
        }
        Ok(())
    }
}

/// Renders a scene through a camera.
#[derive(Debug)]
pub struct Raytracer<'s> {
    scene: &'s Scene,
    camera: Camera,
    levels: u32,
    pattern: SamplePattern,
}

impl<'s> Raytracer<'s> {
    /// Create a raytracer. The scene's kd-tree must already be built.
    pub fn new(scene: &'s Scene, camera: Camera, settings: &RenderSettings) -> Result<Self> {
        settings.validate()?;
        if scene.kd_tree().is_none() {
            return Err(SceneError::TreeNotBuilt);
        }
        let pattern = SamplePattern::new(settings.sampler, settings.oversampling, settings.seed)?;
        Ok(Self {
            scene,
            camera,
            levels: settings.levels,
            pattern,
        })
    }

    /// The camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable access to the camera.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Maximum reflection depth.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Set the maximum reflection depth.
    pub fn set_levels(&mut self, levels: u32) {
        self.levels = levels;
    }

    /// Samples per pixel along each axis.
    pub fn oversampling(&self) -> u32 {
        (self.pattern.len() as f64).sqrt().round() as u32
    }

    /// Regenerate the sample pattern.
    pub fn set_sampling(&mut self, sampler: SamplerKind, oversampling: u32, seed: u64) -> Result<()> {
        self.pattern = SamplePattern::new(sampler, oversampling, seed)?;
        Ok(())
    }

    /// The sub-pixel sample pattern.
    pub fn pattern(&self) -> &SamplePattern {
        &self.pattern
    }

    /// Color seen along `ray`, `level` bounces deep.
    ///
    /// Black when the ray misses the scene.
    pub fn compute_color(&self, ray: &Ray, level: u32) -> Result<Color> {
        let Some((t_near, t_far)) = self.scene.bounding_box().entry_exit_distances(ray) else {
            return Ok(Color::zeros());
        };
        let Some(hit) = self.scene.first_collision(ray, t_near, t_far)? else {
            return Ok(Color::zeros());
        };

        let surface = self.scene.primitive(hit.primitive)?;
        let material = surface.material();
        let material_point = surface.material_point(ray, hit.distance);
        let point = ray.at(hit.distance);

        let mut color = self.scene.compute_color(&point, &material_point, hit.primitive)?
            + self.scene.ambient().component_mul(&material.color);

        if level < self.levels && material.reflection != 0.0 {
            let reflected = ray.reflect(hit.distance, &material_point.normal);
            color += self.compute_color(&reflected, level + 1)? * material.reflection;
        }

        Ok(color)
    }

    /// False when `ray` starts outside `bounds` and points away from it on
    /// some axis.
    pub fn must_shoot(&self, ray: &Ray, bounds: &BoundingBox) -> bool {
        (0..3).all(|i| {
            if ray.direction[i] < 0.0 {
                ray.origin[i] >= bounds.low[i]
            } else {
                ray.origin[i] <= bounds.high[i]
            }
        })
    }

    /// Mean color over the sample pattern for pixel `(x, y)`.
    pub fn pixel_color(&self, x: u32, y: u32) -> Result<Color> {
        let bounds = self.scene.bounding_box();
        let mut sum = Color::zeros();
        for &(dx, dy) in self.pattern.offsets() {
            let ray = self.camera.generate_ray(x as f64 + dx, y as f64 + dy);
            if self.must_shoot(&ray, bounds) {
                sum += self.compute_color(&ray, 0)?;
            }
        }
        Ok(sum / self.pattern.len() as f64)
    }

    /// Render into `screen`, row-major, [`CHANNELS`] values per pixel.
    #[tracing::instrument(skip_all, fields(resolution = ?self.camera.resolution(), samples = self.pattern.len()))]
    pub fn draw(&self, screen: &mut [f64]) -> Result<()> {
        let expected = self.camera.pixel_count() * CHANNELS;
        if screen.len() != expected {
            return Err(SceneError::BufferSize {
                expected,
                actual: screen.len(),
            });
        }

        let (width, _) = self.camera.resolution();
        for (index, pixel) in screen.chunks_exact_mut(CHANNELS).enumerate() {
            let x = (index % width as usize) as u32;
            let y = (index / width as usize) as u32;
            let color = self.pixel_color(x, y)?;
            pixel.copy_from_slice(color.as_slice());
        }

        debug!("frame rendered");
        Ok(())
    }

    /// Write the kd-tree depth of the hit leaf for each pixel's center ray,
    /// `None` where nothing is hit.
    pub fn draw_hit_levels(&self, levels: &mut [Option<u32>]) -> Result<()> {
        let expected = self.camera.pixel_count();
        if levels.len() != expected {
            return Err(SceneError::BufferSize {
                expected,
                actual: levels.len(),
            });
        }

        let (width, _) = self.camera.resolution();
        let bounds = self.scene.bounding_box();
        for (index, level) in levels.iter_mut().enumerate() {
            let x = (index % width as usize) as f64;
            let y = (index / width as usize) as f64;
            let ray = self.camera.generate_ray(x, y);
            *level = match bounds.entry_exit_distances(&ray) {
                Some((t_near, t_far)) => self.scene.hit_level(&ray, t_near, t_far)?,
                None => None,
            };
        }
        Ok(())
    }
}
