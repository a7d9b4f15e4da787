use anyhow::{Context as _, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use voxelbox_input::{InputSnapshot, MoveDirection};
use voxelbox_render::{FrameStats, Session, SessionConfig};
use voxelbox_render_wgpu::WgpuRenderer;
use voxelbox_terrain::MeshStrategy;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

#[derive(Parser)]
#[command(name = "voxelbox-desktop", about = "Voxelbox desktop sandbox")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Session config file (.json, .yaml or .yml)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Key bindings for movement intents.
const MOVE_KEYS: [(KeyCode, MoveDirection); 6] = [
    (KeyCode::KeyW, MoveDirection::Forward),
    (KeyCode::KeyS, MoveDirection::Backward),
    (KeyCode::KeyA, MoveDirection::Left),
    (KeyCode::KeyD, MoveDirection::Right),
    (KeyCode::Space, MoveDirection::Up),
    (KeyCode::ControlLeft, MoveDirection::Down),
];

/// Application state.
struct AppState {
    session: Session,
    show_hud: bool,
    keys_held: HashSet<KeyCode>,
    mouse_captured: bool,
    mouse_delta: Vec2,
    last_frame: Instant,
    last_stats: FrameStats,
}

impl AppState {
    fn new(session: Session) -> Self {
        Self {
            session,
            show_hud: true,
            keys_held: HashSet::new(),
            mouse_captured: false,
            mouse_delta: Vec2::ZERO,
            last_frame: Instant::now(),
            last_stats: FrameStats::default(),
        }
    }

    /// Snapshot held keys and drain accumulated pointer motion.
    fn take_input(&mut self) -> InputSnapshot {
        let mut snapshot = InputSnapshot::new()
            .with_mouse_delta(std::mem::take(&mut self.mouse_delta))
            .with_sprint(self.keys_held.contains(&KeyCode::ShiftLeft));
        for (key, direction) in MOVE_KEYS {
            if self.keys_held.contains(&key) {
                snapshot = snapshot.with_held(direction);
            }
        }
        snapshot
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys_held.insert(key);
        } else {
            self.keys_held.remove(&key);
        }

        if !pressed {
            return;
        }

        match key {
            KeyCode::F1 => {
                self.show_hud = !self.show_hud;
            }
            KeyCode::Escape => {
                self.mouse_captured = false;
            }
            _ => {}
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if !self.show_hud {
            return;
        }

        let camera = self.session.camera();
        let position = camera.position();
        let (yaw, pitch) = (camera.yaw_degrees(), camera.pitch_degrees());
        let stats = self.last_stats;
        let frame_ms = stats.delta_time * 1000.0;
        let fps = if stats.delta_time > 0.0 {
            1.0 / stats.delta_time
        } else {
            0.0
        };

        egui::Window::new("Voxelbox")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Camera: ({:.1}, {:.1}, {:.1})",
                    position.x, position.y, position.z
                ));
                ui.label(format!("Yaw: {yaw:.1}°  Pitch: {pitch:.1}°"));
                ui.separator();
                ui.label(format!("Chunks: {}", self.session.world().chunk_count()));
                ui.label(format!(
                    "Faces: {}  Draws: {}",
                    stats.quads, stats.draws
                ));
                ui.label(format!("Frame: {frame_ms:.2} ms ({fps:.0} fps)"));
                ui.separator();

                let mut options = self.session.meshes().options();
                ui.horizontal(|ui| {
                    ui.label("Meshing:");
                    ui.radio_value(&mut options.strategy, MeshStrategy::Culled, "Culled");
                    ui.radio_value(&mut options.strategy, MeshStrategy::Greedy, "Greedy");
                });
                if options != self.session.meshes().options() {
                    tracing::info!(strategy = ?options.strategy, "switching mesh strategy");
                    self.session.meshes_mut().set_options(options);
                }

                ui.separator();
                ui.small("F1: HUD | RMB: Look | Esc: Release | WASD/Space/Ctrl: Move | Shift: Sprint");
            });
    }
}

/// Everything that only exists once a window is up.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    hud_input: egui_winit::State,
    hud_painter: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, egui_ctx: &EguiContext) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("Voxelbox")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter")?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("voxelbox_device"),
                ..Default::default()
            },
            None,
        ))
        .context("request device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no formats")?;
        let inner = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: inner.width.max(1),
            height: inner.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: Vec::new(),
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let hud_input = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let hud_painter = egui_wgpu::Renderer::new(&device, format, None, 1, false);
        let renderer = WgpuRenderer::new(
            device,
            queue,
            format,
            surface_config.width,
            surface_config.height,
        );
        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            ?format,
            "gpu ready"
        );

        Ok(Self {
            window,
            surface,
            surface_config,
            renderer,
            hud_input,
            hud_painter,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface
            .configure(self.renderer.device(), &self.surface_config);
        self.renderer
            .resize(self.surface_config.width, self.surface_config.height);
    }

    fn capture_cursor(&self, captured: bool) {
        self.window.set_cursor_visible(!captured);
        let grab = if captured {
            self.window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = grab {
            tracing::debug!("cursor grab unavailable: {e}");
        }
    }

    /// Run the HUD for this frame and paint it over `target`.
    fn paint_hud(&mut self, egui_ctx: &EguiContext, state: &mut AppState, target: &wgpu::TextureView) {
        let raw_input = self.hud_input.take_egui_input(&self.window);
        let output = egui_ctx.run(raw_input, |ctx| state.draw_ui(ctx));
        self.hud_input
            .handle_platform_output(&self.window, output.platform_output);

        let jobs = egui_ctx.tessellate(output.shapes, output.pixels_per_point);
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point: output.pixels_per_point,
        };
        let device = self.renderer.device();
        let queue = self.renderer.queue();
        for (id, delta) in &output.textures_delta.set {
            self.hud_painter.update_texture(device, queue, *id, delta);
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("hud_encoder"),
        });
        self.hud_painter
            .update_buffers(device, queue, &mut encoder, &jobs, &screen);
        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hud_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            })
            .forget_lifetime();
        self.hud_painter.render(&mut pass, &jobs, &screen);
        drop(pass);
        queue.submit([encoder.finish()]);

        for id in &output.textures_delta.free {
            self.hud_painter.free_texture(id);
        }
    }
}

struct GpuApp {
    state: AppState,
    egui_ctx: EguiContext,
    gpu: Option<Gpu>,
}

impl GpuApp {
    fn set_mouse_captured(&mut self, captured: bool) {
        self.state.mouse_captured = captured;
        if let Some(gpu) = &self.gpu {
            gpu.capture_cursor(captured);
        }
    }

    fn redraw(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let now = Instant::now();
        let dt = now.duration_since(self.state.last_frame).as_secs_f32();
        self.state.last_frame = now;

        let input = self.state.take_input();
        self.state.last_stats = match self.state.session.frame(&input, dt, &mut gpu.renderer) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("frame failed: {e}");
                return;
            }
        };

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (w, h) = (gpu.surface_config.width, gpu.surface_config.height);
                gpu.resize(w, h);
                return;
            }
            Err(e) => {
                tracing::warn!("surface error: {e}");
                return;
            }
        };
        let target = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        gpu.renderer.render_frame(&target);
        gpu.paint_hud(&self.egui_ctx, &mut self.state, &target);
        frame.present();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, &self.egui_ctx) {
            Ok(gpu) => {
                let config = &gpu.surface_config;
                self.state
                    .session
                    .projection_mut()
                    .set_viewport(config.width, config.height);
                self.gpu = Some(gpu);
            }
            Err(e) => {
                tracing::error!("failed to initialize GPU: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(gpu) = &mut self.gpu {
            if gpu.hud_input.on_window_event(&gpu.window, &event).consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Some(gpu) = &mut self.gpu {
                    self.state.session.shutdown(&mut gpu.renderer);
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size.width, size.height);
                    self.state
                        .session
                        .projection_mut()
                        .set_viewport(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                let was_captured = self.state.mouse_captured;
                self.state.handle_key(key, state.is_pressed());
                if was_captured && !self.state.mouse_captured {
                    self.set_mouse_captured(false);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state: ElementState::Pressed,
                ..
            } => self.set_mouse_captured(true),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.state.mouse_captured {
                self.state.mouse_delta += Vec2::new(dx as f32, dy as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("voxelbox-desktop starting");

    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let session = Session::from_config(&config)?;
    tracing::info!(chunks = session.world().chunk_count(), "world ready");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp {
        state: AppState::new(session),
        egui_ctx: EguiContext::default(),
        gpu: None,
    };
    event_loop.run_app(&mut app)?;

    Ok(())
}
