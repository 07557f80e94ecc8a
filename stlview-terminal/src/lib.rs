/// Terminal host for stlview: an ASCII render surface driven by a frame clock
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};
use stlview_core::{
    mount, AssetFetcher, AttributeSource, Camera, FrameQueue, HostError, LoadOutcome, RenderError,
    RenderSurface, ResizeListener, Scene, Viewer, ViewerError, ViewerHost, Viewport,
};
use thiserror::Error;

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Orbit step per key press, in radians
const ORBIT_STEP: f32 = 0.1;
/// Zoom factor per key press
const ZOOM_STEP: f32 = 1.1;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("terminal IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Viewer(#[from] ViewerError),
}

/// Render surface that rasterizes to ASCII and presents to a terminal writer
pub struct AsciiSurface<W: Write> {
    renderer: AsciiRenderer,
    out: W,
    status: Option<String>,
}

impl<W: Write> AsciiSurface<W> {
    pub fn new(out: W, viewport: Viewport) -> Self {
        Self {
            renderer: AsciiRenderer::new(viewport.width as usize, viewport.height as usize),
            out,
            status: None,
        }
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Overlay line drawn on top of the first row
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }
}

impl<W: Write> RenderSurface for AsciiSurface<W> {
    fn resize(&mut self, viewport: Viewport) {
        self.renderer
            .resize(viewport.width as usize, viewport.height as usize);
    }

    fn viewport(&self) -> Viewport {
        self.renderer.viewport()
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        self.renderer.clear();
        self.renderer.render_scene(scene, camera);
        self.renderer.draw(&mut self.out)?;

        if let Some(status) = &self.status {
            queue!(
                self.out,
                cursor::MoveTo(0, 0),
                SetForegroundColor(Color::Yellow),
                Print(status),
                ResetColor
            )?;
        }

        self.out.flush()?;
        Ok(())
    }
}

/// The terminal as a viewer host. Hands out one surface per mount.
pub struct TerminalHost<W: Write> {
    out: Option<W>,
    viewport: Viewport,
    listeners: Vec<ResizeListener>,
}

impl<W: Write> TerminalHost<W> {
    pub fn new(out: W, viewport: Viewport) -> Self {
        Self {
            out: Some(out),
            viewport,
            listeners: Vec::new(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Forward a terminal size change to every registered listener
    pub fn notify_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for listener in &self.listeners {
            listener(viewport);
        }
    }
}

impl<W: Write + 'static> ViewerHost for TerminalHost<W> {
    type Surface = AsciiSurface<W>;

    fn attach_surface(&mut self) -> Result<AsciiSurface<W>, HostError> {
        let out = self
            .out
            .take()
            .ok_or_else(|| HostError("terminal surface already attached".to_string()))?;
        Ok(AsciiSurface::new(out, self.viewport))
    }

    fn on_resize(&mut self, listener: ResizeListener) {
        self.listeners.push(listener);
    }
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp<W: Write + 'static> {
    host: TerminalHost<W>,
    viewer: Viewer<AsciiSurface<W>>,
    frames: Rc<FrameQueue>,
    frame_time: Duration,
    running: bool,
    last_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl<W: Write + 'static> TerminalApp<W> {
    /// Mount a viewer on `out`, which must be the terminal the app draws to
    pub fn new<A: AttributeSource + ?Sized>(
        out: W,
        viewport: Viewport,
        attributes: &A,
        fps: u32,
    ) -> Result<Self, AppError> {
        let mut host = TerminalHost::new(out, viewport);
        let viewer = mount(&mut host, attributes)?;

        Ok(Self {
            host,
            viewer,
            frames: Rc::new(FrameQueue::new()),
            frame_time: Duration::from_millis(1000 / u64::from(fps.max(1))),
            running: true,
            last_sample: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn viewer(&self) -> &Viewer<AsciiSurface<W>> {
        &self.viewer
    }

    pub fn host_mut(&mut self) -> &mut TerminalHost<W> {
        &mut self.host
    }

    /// Fetch the model and start the render loop on this app's frame clock
    pub fn load<F: AssetFetcher>(&self, fetcher: &F) -> Result<LoadOutcome, AppError> {
        let outcome = pollster::block_on(self.viewer.load(fetcher, self.frames.clone()))
            .map_err(ViewerError::from)?;
        Ok(outcome)
    }

    /// Run one frame of the clock: the steps scheduled by the previous frame
    pub fn step(&mut self) -> usize {
        let ran = self.frames.run_pending();
        self.frame_count += ran as u32;

        let now = Instant::now();
        let elapsed = now - self.last_sample;
        if elapsed.as_secs() >= 1 {
            self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
            self.frame_count = 0;
            self.last_sample = now;
            let status = format!(
                "stlview | {} | FPS: {:.1} | WASD/Arrows=Orbit +/-=Zoom Q=Quit",
                self.viewer.config().model_source,
                self.fps
            );
            self.viewer.session_mut().surface_mut().set_status(status);
        }
        ran
    }

    /// Apply one key press. Returns `false` once the app should quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
            self.quit();
            return false;
        }

        let mut session = self.viewer.session_mut();
        let controller = session.controller_mut();
        match code {
            KeyCode::Char('w') | KeyCode::Up => controller.rotate_up(ORBIT_STEP),
            KeyCode::Char('s') | KeyCode::Down => controller.rotate_up(-ORBIT_STEP),
            KeyCode::Char('a') | KeyCode::Left => controller.rotate_left(ORBIT_STEP),
            KeyCode::Char('d') | KeyCode::Right => controller.rotate_left(-ORBIT_STEP),
            KeyCode::Char('+') | KeyCode::Char('=') => controller.dolly_in(ZOOM_STEP),
            KeyCode::Char('-') => controller.dolly_out(ZOOM_STEP),
            _ => {}
        }
        true
    }

    /// Dispose the viewer and let the pending frame observe it
    pub fn quit(&mut self) {
        self.running = false;
        self.viewer.dispose();
        self.frames.run_pending();
    }
}

impl TerminalApp<io::Stdout> {
    /// Take over the terminal, load the model and render until quit
    pub fn run<F: AssetFetcher>(&mut self, fetcher: &F) -> Result<(), AppError> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.load(fetcher).and_then(|_| self.main_loop());

        // Cleanup
        if self.viewer.is_active() {
            self.viewer.dispose();
        }
        terminal::disable_raw_mode()?;
        execute!(io::stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<(), AppError> {
        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(KeyEvent {
                        code,
                        kind: KeyEventKind::Press,
                        ..
                    }) => {
                        if !self.handle_key(code) {
                            return Ok(());
                        }
                    }
                    Event::Resize(width, height) => {
                        self.host
                            .notify_resize(Viewport::new(u32::from(width), u32::from(height)));
                    }
                    _ => {}
                }
            }

            self.step();

            // Frame timing
            let elapsed = frame_start.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }
        }

        Ok(())
    }
}

/// Current terminal size as a viewport
pub fn terminal_viewport() -> io::Result<Viewport> {
    let (width, height) = terminal::size()?;
    Ok(Viewport::new(u32::from(width), u32::from(height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stlview_core::loader::encode_binary_stl;
    use stlview_core::{MemoryFetcher, Mesh, SessionState};

    fn app(material: &str) -> TerminalApp<Vec<u8>> {
        let attributes = [
            ("model", "cube.stl"),
            ("color", "#ff8000"),
            ("materialType", material),
            ("auto_rotate", "true"),
        ];
        TerminalApp::new(Vec::new(), Viewport::new(40, 20), &attributes, 30).unwrap()
    }

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::new().with_asset("cube.stl", encode_binary_stl(&Mesh::cube(40.0)))
    }

    #[test]
    fn test_frames_draw_the_model() {
        let mut app = app("material");
        app.load(&fetcher()).unwrap();
        assert_eq!(app.step(), 1);

        let session = app.viewer().session();
        let renderer = session.surface().renderer();
        let drawn = (0..20)
            .flat_map(|y| (0..40).map(move |x| (x, y)))
            .filter(|&(x, y)| renderer.char_at(x, y) != Some(' '))
            .count();
        assert!(drawn > 0);
        assert!(!session.surface().writer().is_empty());
    }

    #[test]
    fn test_resize_reaches_the_surface() {
        let mut app = app("wireframe");
        app.host_mut().notify_resize(Viewport::new(60, 30));
        let session = app.viewer().session();
        assert_eq!(session.surface().viewport(), Viewport::new(60, 30));
        assert!((session.camera().aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_quit_stops_rendering() {
        let mut app = app("wireframe");
        app.load(&fetcher()).unwrap();
        app.step();
        let rendered = app.viewer().frames_rendered();

        assert!(!app.handle_key(KeyCode::Char('q')));
        assert_eq!(app.viewer().state(), SessionState::Stopped);
        assert_eq!(app.step(), 0);
        assert_eq!(app.viewer().frames_rendered(), rendered);
    }

    #[test]
    fn test_keys_orbit_the_camera() {
        let mut app = app("wireframe");
        app.load(&fetcher()).unwrap();
        let before = app.viewer().session().camera().position;
        assert!(app.handle_key(KeyCode::Left));
        app.step();
        let after = app.viewer().session().camera().position;
        assert_ne!(before, after);
    }

    #[test]
    fn test_second_surface_is_refused() {
        let mut host = TerminalHost::new(Vec::new(), Viewport::new(10, 10));
        assert!(host.attach_surface().is_ok());
        assert!(host.attach_surface().is_err());
    }
}
