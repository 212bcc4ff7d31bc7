#![warn(missing_docs)]

//! Scene container, shading and rendering for the IRT ray tracer.
//!
//! A [`Scene`] owns shaded primitives and point lights and answers ray
//! queries through a kd-tree built over them. A [`Raytracer`] shoots
//! primary rays through a [`Camera`], averages each pixel over a
//! [`SamplePattern`] and follows mirror reflections.
//!
//! Scenes are usually loaded from TOML with [`SceneDescription`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use irt_geom::shapes::Sphere;
//! use irt_math::{Color, Point3, Vec3};
//! use irt_scene::{Camera, Light, Raytracer, RenderSettings, Scene};
//!
//! let mut scene = Scene::new();
//! scene.add_primitive(Arc::new(Sphere::new(Point3::new(0.0, 0.0, 20.0), 2.0))).unwrap();
//! scene.add_light(Arc::new(Light::new(Point3::origin(), Color::new(1.0, 1.0, 1.0)))).unwrap();
//! scene.build_tree_automatic().unwrap();
//!
//! let camera = Camera::new(
//!     Point3::origin(),
//!     Vec3::new(0.0, 0.0, 20.0),
//!     Vec3::new(0.0, 1.0, 0.0),
//!     (16.0, 12.0),
//!     (16, 12),
//! )
//! .unwrap();
//! let tracer = Raytracer::new(&scene, camera, &RenderSettings::default()).unwrap();
//! let mut screen = vec![0.0; 16 * 12 * 3];
//! tracer.draw(&mut screen).unwrap();
//! ```

mod camera;
pub mod config;
mod error;
mod light;
mod raytracer;
mod sampler;
mod scene;

pub use camera::Camera;
pub use config::{LoadedScene, SceneDescription};
pub use error::{Result, SceneError};
pub use light::Light;
pub use raytracer::{Raytracer, RenderSettings, CHANNELS};
pub use sampler::{SamplePattern, SamplerKind};
pub use scene::Scene;
