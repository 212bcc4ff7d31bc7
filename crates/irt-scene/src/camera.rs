//! Pinhole camera producing primary rays.

use irt_geom::Ray;
use irt_math::{Point3, Vec3};

use crate::error::{Result, SceneError};

/// Viewer position, screen geometry and resolution.
///
/// The line of sight `direction` points from the eye to the screen center;
/// its length is the eye-to-screen distance. `orientation` is the screen's
/// up vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    origin: Point3,
    direction: Vec3,
    orientation: Vec3,
    width: f64,
    height: f64,
    pixel_width: u32,
    pixel_height: u32,
    // One pixel step right and up on the screen.
    u: Vec3,
    v: Vec3,
}

impl Camera {
    /// Create a camera. `size` is the physical screen size, `resolution`
    /// the pixel count along each screen axis.
    pub fn new(origin: Point3, direction: Vec3, orientation: Vec3, size: (f64, f64), resolution: (u32, u32)) -> Result<Self> {
        let mut camera = Self {
            origin,
            direction,
            orientation,
            width: size.0,
            height: size.1,
            pixel_width: resolution.0,
            pixel_height: resolution.1,
            u: Vec3::zeros(),
            v: Vec3::zeros(),
        };
        camera.update_parameters()?;
        Ok(camera)
    }

    fn update_parameters(&mut self) -> Result<()> {
        if self.pixel_width == 0 || self.pixel_height == 0 {
            return Err(SceneError::InvalidCamera(format!(
                "resolution must be positive, got {}x{}",
                self.pixel_width, self.pixel_height
            )));
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(SceneError::InvalidCamera(format!(
                "screen size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let up = self
            .orientation
            .try_normalize(f64::EPSILON)
            .ok_or_else(|| SceneError::InvalidCamera("orientation is zero".into()))?;
        let right = up
            .cross(&self.direction)
            .try_normalize(f64::EPSILON)
            .ok_or_else(|| SceneError::InvalidCamera("direction is zero or parallel to orientation".into()))?;

        self.u = right * (self.width / self.pixel_width as f64);
        self.v = up * (self.height / self.pixel_height as f64);
        Ok(())
    }

    /// Move the eye and change the line of sight.
    pub fn set_viewer(&mut self, origin: Point3, direction: Vec3) -> Result<()> {
        self.apply(|c| {
            c.origin = origin;
            c.direction = direction;
        })
    }

    /// Change the screen's up vector.
    pub fn set_orientation(&mut self, orientation: Vec3) -> Result<()> {
        self.apply(|c| c.orientation = orientation)
    }

    /// Change the physical screen size.
    pub fn set_size(&mut self, width: f64, height: f64) -> Result<()> {
        self.apply(|c| {
            c.width = width;
            c.height = height;
        })
    }

    /// Change the pixel resolution.
    pub fn set_resolution(&mut self, pixel_width: u32, pixel_height: u32) -> Result<()> {
        self.apply(|c| {
            c.pixel_width = pixel_width;
            c.pixel_height = pixel_height;
        })
    }

    /// Apply an edit; the camera is left unchanged if the result is invalid.
    fn apply(&mut self, edit: impl FnOnce(&mut Camera)) -> Result<()> {
        let mut next = self.clone();
        edit(&mut next);
        next.update_parameters()?;
        *self = next;
        Ok(())
    }

    /// Eye position.
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// `(pixel_width, pixel_height)`.
    pub fn resolution(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.pixel_width as usize * self.pixel_height as usize
    }

    /// Primary ray through screen position `(x, y)` in pixel units, `y`
    /// growing downwards. The screen center is `(pixel_width/2, pixel_height/2)`.
    pub fn generate_ray(&self, x: f64, y: f64) -> Ray {
        let half_w = self.pixel_width as f64 / 2.0;
        let half_h = self.pixel_height as f64 / 2.0;
        let direction = self.direction + self.u * (x - half_w) + self.v * (half_h - y);
        Ray::new(self.origin, direction)
    }
}
