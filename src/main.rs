use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

use judgeline::chart::{Beat, Chart, Note, NoteKind, load_chart};
use judgeline::config::{Settings, load_settings};
use judgeline::gpu::{BuiltinShaders, GpuFrameBackend, ShaderLoader, ShaderSourceProvider};
use judgeline::logging;
use judgeline::render::{Skin, resources::load_image};
use judgeline::session::Session;

const SEEK_STEP: f64 = 2.0;
const NOTE_GRID: i32 = 16;

#[derive(Parser, Debug)]
#[command(name = "judgeline", version, about = "Plays a judge-line chart with autoplay")]
struct Args {
    /// Chart JSON file.
    #[arg(long)]
    chart: PathBuf,

    /// Settings JSON; the stock settings are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of skin images.
    #[arg(long)]
    skin: Option<PathBuf>,

    /// Directory searched for `<name>.wgsl` shaders that are not built in.
    #[arg(long)]
    shaders: Option<PathBuf>,

    #[arg(long)]
    background: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

/// Everything that can be prepared before the window exists.
struct Pending {
    chart: Chart,
    settings: Settings,
    skin: Skin,
    shaders: Box<dyn ShaderSourceProvider>,
}

struct ViewerApp {
    title: String,
    pending: Option<Pending>,
    window: Option<Arc<Window>>,
    session: Option<Session<GpuFrameBackend>>,
    modifiers: ModifiersState,
    last_tick: Instant,
    frame_interval: Duration,
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(
                pending.settings.canvas.width,
                pending.settings.canvas.height,
            ))
            .with_min_inner_size(LogicalSize::new(100, 100));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );
        let backend = GpuFrameBackend::new(window.clone(), &pending.settings, pending.shaders)
            .context("failed to init GPU renderer")?;
        self.session = Some(Session::new(
            pending.chart,
            pending.settings,
            Box::new(pending.skin),
            backend,
        ));
        self.window = Some(window);
        self.last_tick = Instant::now();
        Ok(())
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let ctrl = self.modifiers.control_key();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let result = match event.physical_key {
            PhysicalKey::Code(KeyCode::Space) => {
                session.toggle_play();
                Ok(())
            }
            PhysicalKey::Code(KeyCode::ArrowLeft) => {
                session.seek_by(-SEEK_STEP);
                Ok(())
            }
            PhysicalKey::Code(KeyCode::ArrowRight) => {
                session.seek_by(SEEK_STEP);
                Ok(())
            }
            PhysicalKey::Code(KeyCode::KeyZ) if ctrl => session.undo(),
            PhysicalKey::Code(KeyCode::KeyY) if ctrl => session.redo(),
            PhysicalKey::Code(KeyCode::KeyN) => {
                let beat = session.chart().bpm().seconds_to_beat(session.chart_time());
                let at = Beat::snapped(beat, NOTE_GRID);
                session
                    .add_note(0, Note::new(NoteKind::Tap, at, at))
                    .map(|_| ())
            }
            PhysicalKey::Code(KeyCode::Delete) => {
                let now = session.chart_time();
                let next = session.chart().lines().first().and_then(|line| {
                    line.notes
                        .iter()
                        .find(|n| n.start_seconds >= now)
                        .map(|n| n.id)
                });
                match next {
                    Some(id) => session.remove_note(0, id).map(|_| ()),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("{e}");
        }
        for change in session.take_changes() {
            log::info!(
                "{:?}: {} ({} undo, {} redo)",
                change.kind,
                change.description,
                change.undo_size,
                change.redo_size
            );
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none()
            && let Err(e) = self.init(event_loop)
        {
            log::error!("{e:#}");
            self.failure = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.session = None;
                self.window = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(session) = self.session.as_mut() {
                    session.backend_mut().resize(size);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
            WindowEvent::RedrawRequested => {
                if let Some(session) = self.session.as_mut()
                    && let Err(e) = session.render_frame()
                {
                    log::error!("frame failed: {e}");
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        if let Some(session) = self.session.as_mut() {
            session.advance(dt);
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(now + self.frame_interval));
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    // a second logger cannot be installed; keep running without the file log
    if let Err(e) = logging::init(args.log_level) {
        eprintln!("logging disabled: {e}");
    }

    let settings = match &args.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };

    let bytes = std::fs::read(&args.chart)
        .with_context(|| format!("failed to read {}", args.chart.display()))?;
    let chart = load_chart(&bytes)
        .with_context(|| format!("failed to load chart {}", args.chart.display()))?;

    let mut skin = match &args.skin {
        Some(dir) => Skin::load(dir, settings.skin.clone()),
        None => Skin::fallback(settings.skin.clone()),
    };
    if let Some(path) = &args.background {
        skin.set_background(load_image(path)?);
    }
    if let Some(dir) = args.chart.parent() {
        skin.load_line_textures(
            dir,
            chart.lines().iter().filter_map(|l| l.texture.as_deref()),
        );
    }

    let shaders: Box<dyn ShaderSourceProvider> = match args.shaders {
        Some(dir) => Box::new(ShaderLoader::spawn(dir)?),
        None => Box::new(BuiltinShaders),
    };

    let fps = settings.performance.fps_limiter.max(1.0);
    let mut app = ViewerApp {
        title: format!("{} [{}]", chart.meta().name, chart.meta().level),
        pending: Some(Pending {
            chart,
            settings,
            skin,
            shaders,
        }),
        window: None,
        session: None,
        modifiers: ModifiersState::default(),
        last_tick: Instant::now(),
        frame_interval: Duration::from_secs_f64(1.0 / fps),
        failure: None,
    };

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    event_loop.run_app(&mut app)?;
    match app.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
