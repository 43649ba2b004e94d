mod events;
mod hud;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use rally_assets::{JsonVehicleSource, MemoryVehicleSource, VehicleSource};
use rally_input::{InputEvent, InputRouter, KeyBindings};
use rally_persist::RecordStore;
use rally_render_wgpu::WgpuRenderer;
use rally_scene::{GameState, SceneLoop, SimConfig, Tick};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::events::TouchTracker;

#[derive(Parser)]
#[command(name = "rally-desktop", about = "Drive around and collect the coins")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Vehicle catalog JSON; the built-in demo car is used without one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Best-time record file
    #[arg(long, default_value = "rally_record.json")]
    record_file: PathBuf,

    /// Scene configuration JSON overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Key bindings JSON (key name to control or action)
    #[arg(long)]
    bindings: Option<PathBuf>,

    /// Vehicle to start with, counting from 1
    #[arg(long, default_value_t = 1)]
    vehicle: usize,
}

fn build_scene(cli: &Cli) -> Result<(SceneLoop, KeyBindings)> {
    let config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    let source: Box<dyn VehicleSource> = match &cli.catalog {
        Some(path) => Box::new(JsonVehicleSource::open(path)?),
        None => Box::new(MemoryVehicleSource::demo()),
    };
    let mut game = GameState::new(config, source, Some(RecordStore::new(&cli.record_file)))?;
    if cli.vehicle > 1 {
        game.select_vehicle(cli.vehicle - 1)?;
    }

    let bindings = match &cli.bindings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => KeyBindings::default(),
    };
    Ok((SceneLoop::new(game), bindings))
}

/// Window, device and the two renderers drawing into it.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(window: Arc<Window>, egui_ctx: &EguiContext) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("rally_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, surface_format, config.width, config.height);
        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            "GPU initialized"
        );
        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.renderer
            .resize(&self.device, self.config.width, self.config.height);
    }
}

struct App {
    scene: SceneLoop,
    router: InputRouter,
    touches: TouchTracker,
    cursor: Vec2,
    start: Instant,
    egui_ctx: EguiContext,
    gpu: Option<Gpu>,
}

impl App {
    fn new(scene: SceneLoop, bindings: KeyBindings) -> Self {
        Self {
            scene,
            router: InputRouter::new(bindings),
            touches: TouchTracker::default(),
            cursor: Vec2::ZERO,
            start: Instant::now(),
            egui_ctx: EguiContext::default(),
            gpu: None,
        }
    }

    fn feed(&mut self, event: InputEvent) {
        if let Some(command) = self.router.route(event) {
            self.scene.game_mut().handle_command(command);
        }
    }

    fn redraw(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let now = self.start.elapsed().as_secs_f64();
        let due = match self.scene.update(now) {
            Tick::Rendered(due) => due,
            Tick::Updated | Tick::Stopped => return,
        };
        gpu.renderer.sync_meshes(&gpu.device, self.scene.game().store());

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let scene_commands = {
            let mut frame = gpu.renderer.frame(&gpu.device, &gpu.queue, &view);
            self.scene.render(due, &mut frame)
        };

        let hud = self.scene.game().hud();
        let fps = self.scene.frame_timer().fps();
        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| hud::draw(ctx, &hud, fps));
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit([scene_commands, encoder.finish()]);
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Rally")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let gpu = event_loop
            .create_window(attrs)
            .map_err(anyhow::Error::from)
            .and_then(|window| Gpu::new(Arc::new(window), &self.egui_ctx));
        match gpu {
            Ok(gpu) => {
                let (width, height) = (gpu.config.width, gpu.config.height);
                self.gpu = Some(gpu);
                self.feed(InputEvent::Resize { width, height });
            }
            Err(e) => {
                tracing::error!("failed to initialize graphics: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.scene.stop_handle().stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size.width, size.height);
                }
                self.feed(InputEvent::Resize {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(input) =
                    events::key_event(&event.logical_key, event.state, event.repeat)
                {
                    self.feed(input);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                self.feed(InputEvent::PointerMove(self.cursor));
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                let input = match state {
                    ElementState::Pressed => InputEvent::PointerDown(self.cursor),
                    ElementState::Released => InputEvent::PointerUp,
                };
                self.feed(input);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.feed(events::wheel(delta));
            }
            WindowEvent::Touch(touch) => {
                let at = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                if let Some(input) = self.touches.update(touch.id, touch.phase, at) {
                    self.feed(input);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
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

    tracing::info!("rally-desktop starting");
    let (scene, bindings) = build_scene(&cli)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scene, bindings);
    event_loop.run_app(&mut app)?;

    if let Some(best) = app.scene.game().best_time() {
        tracing::info!(best = %rally_scene::format_clock(best), "best time");
    }
    Ok(())
}
