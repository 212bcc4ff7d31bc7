//! irt CLI - inspect and render IRT scene files
//!
//! Images are rendered into memory only; the commands report statistics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use irt_kdtree::TreeStats;
use irt_math::{point_to_array, Color};
use irt_scene::{LoadedScene, Raytracer, SceneDescription, CHANNELS};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "irt")]
#[command(about = "Ray tracer with a SAH kd-tree", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show scene and kd-tree statistics
    Info {
        /// Path to a .toml scene file
        scene: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Trace the ray through one pixel
    Probe {
        /// Path to a .toml scene file
        scene: PathBuf,
        /// Pixel column
        x: u32,
        /// Pixel row (0 is the top)
        y: u32,
    },
    /// Histogram of kd-tree leaf depths hit by the pixel rays
    HitLevels {
        /// Path to a .toml scene file
        scene: PathBuf,
    },
    /// Render the scene into memory and report timing
    Render {
        /// Path to a .toml scene file
        scene: PathBuf,
        /// Override the reflection depth
        #[arg(long)]
        levels: Option<u32>,
        /// Override samples per pixel along each axis
        #[arg(long)]
        oversampling: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Info { scene, json } => show_info(&scene, json)?,
        Commands::Probe { scene, x, y } => probe(&scene, x, y)?,
        Commands::HitLevels { scene } => hit_levels(&scene)?,
        Commands::Render {
            scene,
            levels,
            oversampling,
        } => render(&scene, levels, oversampling)?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<LoadedScene> {
    let description =
        SceneDescription::from_path(path).with_context(|| format!("failed to read scene {}", path.display()))?;
    let loaded = description
        .load()
        .with_context(|| format!("failed to load scene {}", path.display()))?;
    info!(path = %path.display(), primitives = loaded.scene.len(), "scene loaded");
    Ok(loaded)
}

#[derive(Serialize)]
struct InfoReport {
    primitives: usize,
    lights: usize,
    bounds_min: [f64; 3],
    bounds_max: [f64; 3],
    resolution: (u32, u32),
    tree: TreeStats,
}

fn show_info(path: &Path, json: bool) -> Result<()> {
    let loaded = load(path)?;
    let scene = &loaded.scene;
    let Some(tree) = scene.kd_tree() else {
        bail!("kd-tree missing after load");
    };
    let bounds = scene.bounding_box();
    let report = InfoReport {
        primitives: scene.len(),
        lights: scene.lights().len(),
        bounds_min: point_to_array(&bounds.low),
        bounds_max: point_to_array(&bounds.high),
        resolution: loaded.camera.resolution(),
        tree: *tree.stats(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("IRT scene: {}", path.display());
    println!("  Primitives: {}", report.primitives);
    println!("  Lights: {}", report.lights);
    println!("  Bounds: {:?} .. {:?}", report.bounds_min, report.bounds_max);
    println!("  Resolution: {}x{}", report.resolution.0, report.resolution.1);
    println!("\nKd-tree:");
    println!("  Nodes: {}", report.tree.nodes);
    println!("  Leaves: {} ({} empty)", report.tree.leaves, report.tree.empty_leaves);
    println!("  Depth: {}", report.tree.max_depth);
    println!("  References: {}", report.tree.references);
    println!("  Largest leaf: {}", report.tree.max_leaf_size);
    if report.primitives > 0 {
        println!(
            "  References per primitive: {:.2}",
            report.tree.references as f64 / report.primitives as f64
        );
    }

    Ok(())
}

fn probe(path: &Path, x: u32, y: u32) -> Result<()> {
    let loaded = load(path)?;
    let (width, height) = loaded.camera.resolution();
    if x >= width || y >= height {
        bail!("pixel ({x}, {y}) outside {width}x{height} image");
    }
    let scene = &loaded.scene;
    let tracer = Raytracer::new(scene, loaded.camera.clone(), &loaded.render)?;

    let ray = tracer.camera().generate_ray(x as f64, y as f64);
    println!("Ray: origin {:?} direction {:?}", point_to_array(&ray.origin), ray.direction.as_slice());

    let Some((t_near, t_far)) = scene.bounding_box().entry_exit_distances(&ray) else {
        println!("  Misses the scene bounds");
        return Ok(());
    };
    match scene.first_collision(&ray, t_near, t_far)? {
        Some(hit) => {
            let level = scene.hit_level(&ray, t_near, t_far)?;
            println!("  Primitive: {}", hit.primitive);
            println!("  Distance: {:.6}", hit.distance);
            if let Some(level) = level {
                println!("  Leaf depth: {level}");
            }
        }
        None => println!("  No hit"),
    }
    let color = tracer.compute_color(&ray, 0)?;
    println!("  Color: [{:.4}, {:.4}, {:.4}]", color.x, color.y, color.z);

    Ok(())
}

fn hit_levels(path: &Path) -> Result<()> {
    let loaded = load(path)?;
    let tracer = Raytracer::new(&loaded.scene, loaded.camera.clone(), &loaded.render)?;

    let mut levels = vec![None; loaded.camera.pixel_count()];
    tracer.draw_hit_levels(&mut levels)?;

    let mut histogram: BTreeMap<u32, usize> = BTreeMap::new();
    let mut misses = 0usize;
    for level in levels {
        match level {
            Some(level) => *histogram.entry(level).or_default() += 1,
            None => misses += 1,
        }
    }

    println!("Hit levels over {} pixels:", loaded.camera.pixel_count());
    for (level, count) in &histogram {
        println!("  {level:>3}: {count}");
    }
    println!("  miss: {misses}");

    Ok(())
}

fn render(path: &Path, levels: Option<u32>, oversampling: Option<u32>) -> Result<()> {
    let loaded = load(path)?;
    let mut settings = loaded.render;
    if let Some(levels) = levels {
        settings.levels = levels;
    }
    if let Some(oversampling) = oversampling {
        settings.oversampling = oversampling;
    }
    let tracer = Raytracer::new(&loaded.scene, loaded.camera.clone(), &settings)?;

    let mut screen = vec![0.0; loaded.camera.pixel_count() * CHANNELS];
    let start = Instant::now();
    tracer.draw(&mut screen)?;
    let elapsed = start.elapsed();

    let pixels = loaded.camera.pixel_count().max(1) as f64;
    let mean = screen
        .chunks_exact(CHANNELS)
        .fold(Color::zeros(), |acc, p| acc + Color::new(p[0], p[1], p[2]))
        / pixels;
    let (width, height) = loaded.camera.resolution();

    println!("Rendered {width}x{height} in {:.3}s", elapsed.as_secs_f64());
    println!("  Samples per pixel: {}", tracer.pattern().len());
    println!("  Reflection levels: {}", tracer.levels());
    println!("  Mean color: [{:.4}, {:.4}, {:.4}]", mean.x, mean.y, mean.z);

    Ok(())
}
