//! Spectrascape - audio-reactive particle and geometry scenes
//!
//! A playlist feeds a spectral analyzer; every frame the current spectrum
//! drives the selected scene.

use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use spectrascape::audio::{CpalBackend, OfflineBackend};
use spectrascape::camera::OrbitCamera;
use spectrascape::cli::Args;
use spectrascape::params::VisualizerConfig;
use spectrascape::playback::{HttpClient, PlaybackController, PlaybackEvent};
use spectrascape::rendering::{RenderSystem, Uniforms};
use spectrascape::scenes::{FrameScheduler, SceneKind};

/// Volume change per arrow key press
const VOLUME_STEP: f32 = 0.05;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    controller: PlaybackController,
    scheduler: FrameScheduler,
    camera: OrbitCamera,

    config: VisualizerConfig,

    // Time tracking
    start_time: Instant,
    last_frame: Instant,
}

impl App {
    fn new(config: VisualizerConfig, controller: PlaybackController, scene: SceneKind) -> Self {
        let now = Instant::now();
        Self {
            window: None,
            render_system: None,
            controller,
            scheduler: FrameScheduler::new(config.scenes.clone(), scene),
            camera: OrbitCamera::new(&config.render),
            config,
            start_time: now,
            last_frame: now,
        }
    }

    fn elapsed_s(&self) -> f32 {
        self.start_time.elapsed().as_secs_f32()
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => self.controller.toggle_play(),
            KeyCode::ArrowRight => self.controller.next(),
            KeyCode::ArrowLeft => self.controller.prev(),
            KeyCode::ArrowUp => {
                let volume = self.controller.volume() + VOLUME_STEP;
                self.controller.set_volume(volume);
                info!("Volume {:.0}%", self.controller.volume() * 100.0);
            }
            KeyCode::ArrowDown => {
                let volume = self.controller.volume() - VOLUME_STEP;
                self.controller.set_volume(volume);
                info!("Volume {:.0}%", self.controller.volume() * 100.0);
            }
            KeyCode::KeyS => {
                let on = self.controller.toggle_shuffle();
                info!("Shuffle {}", if on { "on" } else { "off" });
            }
            KeyCode::KeyR => {
                let on = self.controller.toggle_repeat();
                info!("Repeat {}", if on { "on" } else { "off" });
            }
            KeyCode::Digit1
            | KeyCode::Digit2
            | KeyCode::Digit3
            | KeyCode::Digit4
            | KeyCode::Digit5 => {
                let index = match code {
                    KeyCode::Digit1 => 0,
                    KeyCode::Digit2 => 1,
                    KeyCode::Digit3 => 2,
                    KeyCode::Digit4 => 3,
                    _ => 4,
                };
                if self.scheduler.select(SceneKind::ALL[index]) {
                    let now = self.elapsed_s();
                    self.camera.reset(now);
                }
            }
            _ => {}
        }
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };

        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;
        let time_s = self.start_time.elapsed().as_secs_f64();

        let snapshot = self.controller.frame_snapshot(time_s, dt);
        let frame = self.scheduler.tick(snapshot, time_s as f32);

        let (width, height) = render_system.size();
        let aspect = width as f32 / height.max(1) as f32;
        let (view_proj, view) =
            self.camera
                .create_view_proj_matrix(time_s as f32, aspect, &self.config.render);
        render_system.update_uniforms(&Uniforms::new(
            view_proj,
            view,
            (width, height),
            self.config.render.point_pixel_scale,
            time_s as f32,
        ));

        match render_system.render(frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                render_system.reconfigure()
            }
            Err(e) => warn!("Render error: {:?}", e),
        }

        report_events(&mut self.controller);
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Spectrascape")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.render.window_width,
                self.config.render.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let render_system = match pollster::block_on(RenderSystem::new(Arc::clone(&window))) {
            Ok(render_system) => render_system,
            Err(e) => {
                error!("Failed to initialize renderer: {}", e);
                event_loop.exit();
                return;
            }
        };

        let title_window = Arc::clone(&window);
        self.controller.on_source_change(move |track| {
            title_window.set_title(&format!("Spectrascape - {}", track.name()));
        });

        info!("Spectrascape is running");
        info!("Space play/pause, arrows track/volume, 1-5 scene, S shuffle, R repeat, Esc quit");

        self.window = Some(window);
        self.render_system = Some(render_system);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

fn report_events(controller: &mut PlaybackController) {
    for event in controller.drain_events() {
        match event {
            PlaybackEvent::SourceChanged { index, name } => {
                info!("Now playing [{}] {}", index + 1, name)
            }
            PlaybackEvent::PlaylistLoaded { url, tracks } => {
                info!("Loaded {} tracks from {}", tracks, url)
            }
            PlaybackEvent::Failed(e) => warn!("{}", e),
        }
    }
}

/// Drive playback and scenes without a window or audio device
fn run_headless(
    config: &VisualizerConfig,
    mut controller: PlaybackController,
    scene: SceneKind,
    frames: u64,
) {
    // give the loader a bounded head start on the first track
    let deadline = Instant::now() + Duration::from_secs(10);
    while controller.is_loading() && Instant::now() < deadline {
        controller.poll();
        std::thread::sleep(Duration::from_millis(5));
    }
    report_events(&mut controller);

    let mut scheduler = FrameScheduler::new(config.scenes.clone(), scene);
    let dt = Duration::from_secs_f64(1.0 / 60.0);
    let mut fed = 0u64;
    let mut level_sum = 0.0f64;
    let mut points = 0usize;

    for frame in 0..frames {
        let time_s = frame as f64 * dt.as_secs_f64();
        let snapshot = controller.frame_snapshot(time_s, dt);
        if let Some(snapshot) = snapshot {
            fed += 1;
            level_sum += snapshot.average_level() as f64;
        }
        let out = scheduler.tick(snapshot, time_s as f32);
        points = out.point_count() + out.vertex_count();
        report_events(&mut controller);
    }

    info!(
        frames,
        fed,
        bins = controller.analyzer().bin_count(),
        mean_level = if fed > 0 { level_sum / fed as f64 } else { 0.0 },
        last_frame_primitives = points,
        position_s = controller.current_time(),
        "Headless run finished"
    );
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.load_config()?;
    debug!("Config: {:?}", config);

    let fetcher = Arc::new(HttpClient::new(&config.playback)?);
    let backend: Box<dyn spectrascape::audio::AudioBackend> = if args.headless.is_some() {
        Box::new(OfflineBackend::default())
    } else {
        Box::new(CpalBackend::new())
    };

    let mut controller = PlaybackController::new(&config, backend, fetcher)?;
    for track in args.initial_tracks() {
        controller.enqueue(track);
    }
    if let Some(url) = &args.manifest {
        controller.load_manifest(url.clone());
    }

    if let Some(frames) = args.headless {
        run_headless(&config, controller, args.scene, frames);
        return Ok(());
    }

    let mut app = App::new(config, controller, args.scene);
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
