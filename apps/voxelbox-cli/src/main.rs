use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use glam::{Mat4, Vec2, Vec3};
use tracing_subscriber::EnvFilter;
use voxelbox_camera::{Camera, Projection};
use voxelbox_input::{InputSnapshot, MoveDirection, ScriptedInput};
use voxelbox_render::{HeadlessRenderer, RenderError, Session, SessionConfig, Surface};
use voxelbox_terrain::{ChunkCoord, GeneratorConfig, MeshOptions, MeshStrategy, RadiusConfig, VertexLayout, World};

#[derive(Parser)]
#[command(name = "voxelbox-cli", about = "CLI tool for voxelbox operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Session config file (.json, .yaml or .yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Culled,
    Greedy,
}

impl From<Strategy> for MeshStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Culled => MeshStrategy::Culled,
            Strategy::Greedy => MeshStrategy::Greedy,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective session config
    Info,
    /// Generate a world and report mesh sizes per chunk
    Mesh {
        /// Meshing strategy (defaults to the config's)
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
        /// Override the generator radius in chunks
        #[arg(short, long)]
        radius: Option<u32>,
        /// Emit position + UV vertices
        #[arg(long)]
        textured: bool,
    },
    /// Print view and projection matrices for a camera pose
    Camera {
        /// Camera position as x y z
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        position: Option<Vec<f32>>,
        #[arg(long, allow_negative_numbers = true)]
        yaw: Option<f32>,
        #[arg(long, allow_negative_numbers = true)]
        pitch: Option<f32>,
        #[arg(long)]
        fov: Option<f32>,
        #[arg(long)]
        aspect: Option<f32>,
    },
    /// Run the frame loop headless with scripted input
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u32,
        /// Frames to hold forward (with a slow turn) before idling
        #[arg(long, default_value = "30")]
        walk: u32,
    },
}

/// Stand-in surface that closes after a fixed number of frames.
struct FrameBudget {
    remaining: u32,
}

impl Surface for FrameBudget {
    fn should_close(&self) -> bool {
        self.remaining == 0
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.remaining = self.remaining.saturating_sub(1);
        Ok(())
    }
}

fn print_matrix(name: &str, m: &Mat4) {
    println!("{name}:");
    // Rows, for reading; storage is column-major.
    for r in 0..4 {
        let row = m.row(r);
        println!(
            "  [{:>10.5} {:>10.5} {:>10.5} {:>10.5}]",
            row.x, row.y, row.z, row.w
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("voxelbox-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("chunk size: {}", config.chunk_size);
            println!("generator: {:?}", config.generator);
            println!(
                "mesh: {:?} / {:?}",
                config.mesh.strategy, config.mesh.layout
            );
            println!(
                "camera: pos={} yaw={} pitch={} speed={}",
                config.camera.position,
                config.camera.yaw_degrees,
                config.camera.pitch_degrees,
                config.camera.speed
            );
            println!(
                "projection: fov={} aspect={:.3} near={} far={}",
                config.projection.fov_degrees,
                config.projection.aspect,
                config.projection.near,
                config.projection.far
            );
        }
        Commands::Mesh {
            strategy,
            radius,
            textured,
        } => {
            if let Some(radius) = radius {
                config.generator = match config.generator {
                    GeneratorConfig::Radius(radius_config) => GeneratorConfig::Radius(RadiusConfig {
                        radius,
                        ..radius_config
                    }),
                    GeneratorConfig::Origin => GeneratorConfig::Radius(RadiusConfig {
                        radius,
                        ..RadiusConfig::default()
                    }),
                };
            }
            let options = MeshOptions {
                layout: if textured {
                    VertexLayout::PositionUv
                } else {
                    config.mesh.layout
                },
                strategy: strategy.map_or(config.mesh.strategy, MeshStrategy::from),
            };

            let generator = config.generator.build(config.chunk_size)?;
            let mut world = World::generated(generator.as_ref());
            println!(
                "Meshing {} chunks ({}, {:?}, {:?})",
                world.chunk_count(),
                config.chunk_size,
                options.strategy,
                options.layout
            );

            let (mut vertices, mut indices, mut quads, mut triangles) = (0usize, 0usize, 0usize, 0usize);
            for (coord, chunk) in world.chunks_mut() {
                let solid = chunk.solid_count();
                let mesh = chunk.mesh(options);
                if !mesh.is_empty() {
                    println!(
                        "  chunk {coord}: blocks={solid} quads={} triangles={} vertices={} indices={}",
                        mesh.quad_count(),
                        mesh.triangle_count(),
                        mesh.vertex_count(),
                        mesh.index_count()
                    );
                }
                vertices += mesh.vertex_count();
                indices += mesh.index_count();
                quads += mesh.quad_count();
                triangles += mesh.triangle_count();
            }
            println!(
                "Total: quads={quads} triangles={triangles} vertices={vertices} indices={indices}"
            );
        }
        Commands::Camera {
            position,
            yaw,
            pitch,
            fov,
            aspect,
        } => {
            let mut camera_config = config.camera;
            if let Some(yaw) = yaw {
                camera_config.yaw_degrees = yaw;
            }
            if let Some(pitch) = pitch {
                camera_config.pitch_degrees = pitch;
            }
            let projection = Projection {
                fov_degrees: fov.unwrap_or(config.projection.fov_degrees),
                aspect: aspect.unwrap_or(config.projection.aspect),
                ..config.projection
            };

            let mut camera = Camera::new(camera_config)?;
            if let Some([x, y, z]) = position.as_deref() {
                camera.set_position(Vec3::new(*x, *y, *z));
            }
            let front = camera.front();
            println!(
                "position=({:.3}, {:.3}, {:.3}) front=({:.3}, {:.3}, {:.3}) yaw={:.2} pitch={:.2}",
                camera.position().x,
                camera.position().y,
                camera.position().z,
                front.x,
                front.y,
                front.z,
                camera.yaw_degrees(),
                camera.pitch_degrees()
            );
            let block = camera.position().floor().as_ivec3();
            println!(
                "inside chunk {}",
                ChunkCoord::from_block(block, config.chunk_size)
            );
            print_matrix("view", &camera.view_matrix()?);
            print_matrix("projection", &projection.matrix()?);
        }
        Commands::Simulate { frames, walk } => {
            let mut session = Session::from_config(&config)?;
            tracing::info!(frames, walk, "running headless simulation");
            let step = InputSnapshot::new()
                .with_held(MoveDirection::Forward)
                .with_mouse_delta(Vec2::new(2.0, 0.0));
            let mut input = ScriptedInput::new((0..walk.min(frames)).map(|_| step.clone()));
            let mut surface = FrameBudget { remaining: frames };
            let mut renderer = HeadlessRenderer::new();

            let start = session.camera().position();
            let ran = session.run(&mut surface, &mut input, &mut renderer)?;
            let end = session.camera().position();

            println!("Simulated {ran} frames over {} chunks", session.world().chunk_count());
            println!(
                "Camera moved ({:.2}, {:.2}, {:.2}) -> ({:.2}, {:.2}, {:.2}), yaw {:.1}",
                start.x,
                start.y,
                start.z,
                end.x,
                end.y,
                end.z,
                session.camera().yaw_degrees()
            );
            print!("{}", renderer.report());
            session.shutdown(&mut renderer);
        }
    }

    Ok(())
}
