/// Viewer lifecycle: mount, render loop and dispose
use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::config::{AttributeSource, ViewerConfig};
use crate::controls::OrbitController;
use crate::error::{AssetLoadError, HostError, ViewerError};
use crate::framing::{frame, Framing};
use crate::geometry::Mesh;
use crate::loader::{load_asset, AssetFetcher};
use crate::projection::{Camera, Viewport};
use crate::render::RenderSurface;
use crate::schedule::FrameScheduler;
use crate::scene::{LightRig, Scene};

/// Lifecycle of a render session. `Live` → `Stopped` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Live,
    Stopped,
}

/// Scheduling decision returned by one render step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stopped,
}

/// Result of a successful asset load
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    /// The mesh was framed and the render loop started
    Started(Framing),
    /// The session was disposed while the asset was in flight; nothing was touched
    Discarded,
}

/// Receives the container size whenever the host viewport changes
pub type ResizeListener = Box<dyn Fn(Viewport)>;

/// The environment a viewer is mounted into
pub trait ViewerHost {
    type Surface: RenderSurface + 'static;

    /// Create an isolated container in the host and attach a render surface to it
    fn attach_surface(&mut self) -> Result<Self::Surface, HostError>;

    /// Deliver container size changes to `listener`
    fn on_resize(&mut self, listener: ResizeListener);
}

/// Everything one mount renders with
pub struct RenderSession<S> {
    config: Rc<ViewerConfig>,
    camera: Camera,
    surface: S,
    scene: Scene,
    controller: OrbitController,
    state: SessionState,
    frames_rendered: u64,
    load_requested: bool,
}

impl<S> RenderSession<S> {
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Live
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn controller(&self) -> &OrbitController {
        &self.controller
    }

    /// Queue user orbit/zoom input for the next frame
    pub fn controller_mut(&mut self) -> &mut OrbitController {
        &mut self.controller
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Stop the session. Returns `true` only for the call that performed the transition.
    pub fn stop(&mut self) -> bool {
        let was_live = self.is_active();
        self.state = SessionState::Stopped;
        was_live
    }
}

impl<S: RenderSurface> RenderSession<S> {
    fn new(config: Rc<ViewerConfig>, surface: S) -> Self {
        Self {
            config,
            camera: Camera::new(surface.viewport()),
            surface,
            scene: Scene::new(LightRig::default()),
            controller: OrbitController::new(),
            state: SessionState::Live,
            frames_rendered: 0,
            load_requested: false,
        }
    }

    /// Keep camera aspect and surface size in step with the container.
    /// Ignored once the session has stopped.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        if !self.is_active() {
            return false;
        }
        self.surface.resize(viewport);
        self.camera.set_viewport(viewport);
        log::debug!("viewer resized to {}x{}", viewport.width, viewport.height);
        true
    }

    /// One render step: update the controller, draw, then decide whether to continue.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_active() {
            return TickOutcome::Stopped;
        }

        self.controller.update(&mut self.camera);
        match self.surface.render(&self.scene, &self.camera) {
            Ok(()) => self.frames_rendered += 1,
            Err(e) => log::warn!("frame {} failed to render: {}", self.frames_rendered, e),
        }

        if self.is_active() {
            TickOutcome::Continue
        } else {
            TickOutcome::Stopped
        }
    }

    /// Claim the session's one load. `None` once stopped or already claimed.
    fn begin_load(&mut self) -> Option<String> {
        if !self.is_active() || self.load_requested {
            return None;
        }
        self.load_requested = true;
        Some(self.config.model_source.clone())
    }

    fn install(&mut self, mesh: Mesh) -> Framing {
        let (framed, framing) = frame(mesh, &self.config, &mut self.camera, &mut self.controller);
        log::info!(
            "framed {} triangles, largest dimension {:.3}, camera distance {:.3}",
            framed.mesh.triangles.len(),
            framing.largest_dimension,
            framing.camera_distance
        );
        self.scene.set_mesh(framed);
        framing
    }
}

/// Non-owning reference to a session, held by scheduled steps, resize
/// listeners and in-flight loads. Inert once the session is gone.
pub struct SessionHandle<S> {
    inner: Weak<RefCell<RenderSession<S>>>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: RenderSurface + 'static> SessionHandle<S> {
    pub fn is_active(&self) -> bool {
        self.with_session(|session| session.is_active())
            .unwrap_or(false)
    }

    /// Run `f` against the session if it still exists
    pub fn with_session<R>(&self, f: impl FnOnce(&mut RenderSession<S>) -> R) -> Option<R> {
        let session = self.inner.upgrade()?;
        let mut session = session.borrow_mut();
        Some(f(&mut session))
    }

    pub fn resize(&self, viewport: Viewport) -> bool {
        self.with_session(|session| session.resize(viewport))
            .unwrap_or(false)
    }

    pub fn tick(&self) -> TickOutcome {
        self.with_session(|session| session.tick())
            .unwrap_or(TickOutcome::Stopped)
    }

    /// Load the configured asset once, then frame it and start the render loop.
    ///
    /// Failures propagate to the caller untouched; there is no retry and no
    /// placeholder. A session disposed mid-load is left alone. Only the first
    /// call fetches; later calls return [`LoadOutcome::Discarded`] and leave
    /// the running loop as it is.
    pub async fn load<F: AssetFetcher>(
        &self,
        fetcher: &F,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Result<LoadOutcome, AssetLoadError> {
        let source = match self.with_session(|session| session.begin_load()).flatten() {
            Some(source) => source,
            None => {
                log::debug!("ignoring load on a disposed or already loading viewer");
                return Ok(LoadOutcome::Discarded);
            }
        };

        let mesh = load_asset(fetcher, &source).await?;

        let framing = self.with_session(|session| {
            if session.is_active() {
                Some(session.install(mesh))
            } else {
                None
            }
        });

        match framing.flatten() {
            Some(framing) => {
                start_render_loop(self.clone(), scheduler);
                Ok(LoadOutcome::Started(framing))
            }
            None => {
                log::debug!("discarding {} loaded after the viewer was disposed", source);
                Ok(LoadOutcome::Discarded)
            }
        }
    }
}

/// Render a frame now and keep rescheduling while the session is live
pub fn start_render_loop<S: RenderSurface + 'static>(
    handle: SessionHandle<S>,
    scheduler: Rc<dyn FrameScheduler>,
) {
    if handle.tick() == TickOutcome::Continue {
        schedule_next(handle, scheduler);
    }
}

fn schedule_next<S: RenderSurface + 'static>(
    handle: SessionHandle<S>,
    scheduler: Rc<dyn FrameScheduler>,
) {
    let next = scheduler.clone();
    scheduler.schedule(Box::new(move || {
        if handle.tick() == TickOutcome::Continue {
            schedule_next(handle, next);
        }
    }));
}

/// A mounted viewer. Owns its session; dropping it disposes the session.
pub struct Viewer<S> {
    config: Rc<ViewerConfig>,
    session: Rc<RefCell<RenderSession<S>>>,
}

/// Mount a viewer into `host`.
///
/// Attributes are validated before the host is touched, so a configuration
/// error never attaches a surface.
pub fn mount<H, A>(host: &mut H, attributes: &A) -> Result<Viewer<H::Surface>, ViewerError>
where
    H: ViewerHost,
    A: AttributeSource + ?Sized,
{
    let config = Rc::new(ViewerConfig::from_attributes(attributes)?);
    let surface = host.attach_surface()?;
    let session = Rc::new(RefCell::new(RenderSession::new(config.clone(), surface)));

    let viewer = Viewer { config, session };
    let handle = viewer.handle();
    host.on_resize(Box::new(move |viewport| {
        handle.resize(viewport);
    }));

    log::debug!(
        "mounted viewer for {} ({:?}, auto-rotate {})",
        viewer.config.model_source,
        viewer.config.material_mode,
        viewer.config.auto_rotate
    );
    Ok(viewer)
}

impl<S> Viewer<S> {
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.session.borrow().state()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Live
    }

    pub fn frames_rendered(&self) -> u64 {
        self.session.borrow().frames_rendered()
    }

    pub fn session(&self) -> Ref<'_, RenderSession<S>> {
        self.session.borrow()
    }

    pub fn session_mut(&self) -> RefMut<'_, RenderSession<S>> {
        self.session.borrow_mut()
    }

    pub fn handle(&self) -> SessionHandle<S> {
        SessionHandle {
            inner: Rc::downgrade(&self.session),
        }
    }

    /// Stop rendering. Safe to call more than once.
    pub fn dispose(&self) {
        if self.session.borrow_mut().stop() {
            log::debug!("disposed viewer for {}", self.config.model_source);
        }
    }
}

impl<S: RenderSurface + 'static> Viewer<S> {
    /// See [`SessionHandle::load`]
    pub async fn load<F: AssetFetcher>(
        &self,
        fetcher: &F,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Result<LoadOutcome, AssetLoadError> {
        self.handle().load(fetcher, scheduler).await
    }
}

impl<S> Drop for Viewer<S> {
    fn drop(&mut self) {
        if let Ok(mut session) = self.session.try_borrow_mut() {
            session.stop();
        }
    }
}
