//! stlview Web - mount an STL viewer into a DOM element
//!
//! `mountViewer(element)` reads the element's `model`, `color`,
//! `auto_rotate` and `materialType` attributes, renders into a canvas
//! inside an open shadow root and returns a handle for disposal. Nothing is
//! registered globally; callers decide when and where viewers exist.

use std::fmt::Display;
use std::rc::Rc;

use js_sys::{Function, Promise, Uint8Array};
use stlview_core::{
    mount, project_scene, AssetFetcher, AssetLoadError, AttributeSource, Camera, FrameScheduler,
    FrameStep, HostError, LoadOutcome, RenderError, RenderSurface, ResizeListener, Rgb, Scene,
    Viewer, ViewerHost, Viewport,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{
    CanvasRenderingContext2d, Element, HtmlCanvasElement, HtmlElement, Response, ShadowRootInit,
    ShadowRootMode, Window,
};

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn to_js_error(err: impl Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn host_error(context: &str, value: JsValue) -> HostError {
    HostError(format!("{context}: {}", js_message(&value)))
}

/// CSS color string for a canvas fill or stroke style
pub fn css_color(color: Rgb) -> String {
    format!("rgb({}, {}, {})", color.r, color.g, color.b)
}

/// Reads viewer attributes straight from a DOM element
struct ElementAttributes<'a>(&'a Element);

impl AttributeSource for ElementAttributes<'_> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }
}

/// A 2D canvas render surface
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl RenderSurface for CanvasSurface {
    fn resize(&mut self, viewport: Viewport) {
        self.canvas.set_width(viewport.width);
        self.canvas.set_height(viewport.height);
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.canvas.width(), self.canvas.height())
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        let viewport = self.viewport();
        let ctx = &self.context;
        ctx.clear_rect(0.0, 0.0, viewport.width as f64, viewport.height as f64);

        let wireframe = scene.mesh().is_some_and(|framed| framed.material.is_wireframe());
        ctx.set_line_width(1.0);

        // Painter's algorithm: triangles arrive back to front
        for triangle in project_scene(scene, camera, viewport) {
            let [a, b, c] = triangle.points;
            let style = css_color(triangle.color);

            ctx.begin_path();
            ctx.move_to(a.x as f64, a.y as f64);
            ctx.line_to(b.x as f64, b.y as f64);
            ctx.line_to(c.x as f64, c.y as f64);
            ctx.close_path();

            ctx.set_stroke_style_str(&style);
            if !wireframe {
                ctx.set_fill_style_str(&style);
                ctx.fill();
            }
            // Stroking filled faces too hides anti-aliasing seams between them
            ctx.stroke();
        }
        Ok(())
    }
}

/// Hosts a viewer inside an element's shadow root
struct ShadowHost {
    element: Element,
    window: Window,
    container: Option<HtmlElement>,
    resize_listener: Option<Closure<dyn FnMut()>>,
}

impl ShadowHost {
    fn new(element: Element, window: Window) -> Self {
        Self {
            element,
            window,
            container: None,
            resize_listener: None,
        }
    }

    fn remove_resize_listener(&mut self) {
        if let Some(listener) = self.resize_listener.take() {
            let callback: &Function = listener.as_ref().unchecked_ref();
            if let Err(e) = self
                .window
                .remove_event_listener_with_callback("resize", callback)
            {
                log::warn!("failed to remove resize listener: {}", js_message(&e));
            }
        }
    }

    /// Drop the resize listener and take our container out of the shadow root
    fn release(&mut self) {
        self.remove_resize_listener();
        if let Some(container) = self.container.take() {
            container.remove();
        }
    }
}

fn container_viewport(container: &HtmlElement) -> Viewport {
    Viewport::new(
        container.client_width().max(0) as u32,
        container.client_height().max(0) as u32,
    )
}

fn fill_parent(element: &HtmlElement) -> Result<(), JsValue> {
    let style = element.style();
    style.set_property("width", "100%")?;
    style.set_property("height", "100%")?;
    style.set_property("display", "block")?;
    Ok(())
}

impl ViewerHost for ShadowHost {
    type Surface = CanvasSurface;

    fn attach_surface(&mut self) -> Result<CanvasSurface, HostError> {
        let document = self
            .window
            .document()
            .ok_or_else(|| HostError("window has no document".to_string()))?;

        // The shadow root keeps host page styles out of the viewer and ours out of the page.
        // An element keeps its shadow root for life, so a remount reuses and empties it.
        let shadow = match self.element.shadow_root() {
            Some(shadow) => {
                while let Some(child) = shadow.first_child() {
                    shadow
                        .remove_child(&child)
                        .map_err(|e| host_error("clearing shadow root", e))?;
                }
                shadow
            }
            None => self
                .element
                .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
                .map_err(|e| host_error("attaching shadow root", e))?,
        };

        let container: HtmlElement = document
            .create_element("div")
            .and_then(|el| el.dyn_into::<HtmlElement>().map_err(JsValue::from))
            .map_err(|e| host_error("creating container", e))?;
        fill_parent(&container).map_err(|e| host_error("styling container", e))?;
        shadow
            .append_child(&container)
            .map_err(|e| host_error("appending container", e))?;
        self.container = Some(container.clone());

        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().map_err(JsValue::from))
            .map_err(|e| host_error("creating canvas", e))?;
        fill_parent(&canvas).map_err(|e| host_error("styling canvas", e))?;
        container
            .append_child(&canvas)
            .map_err(|e| host_error("appending canvas", e))?;

        let viewport = container_viewport(&container);
        canvas.set_width(viewport.width);
        canvas.set_height(viewport.height);

        let context = canvas
            .get_context("2d")
            .map_err(|e| host_error("requesting 2d context", e))?
            .ok_or_else(|| HostError("canvas has no 2d context".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|e| host_error("casting 2d context", e.into()))?;

        Ok(CanvasSurface { canvas, context })
    }

    fn on_resize(&mut self, listener: ResizeListener) {
        let Some(container) = self.container.clone() else {
            log::warn!("resize listener registered before a surface was attached");
            return;
        };

        let closure = Closure::<dyn FnMut()>::new(move || listener(container_viewport(&container)));
        match self
            .window
            .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
        {
            Ok(()) => {
                self.remove_resize_listener();
                self.resize_listener = Some(closure);
            }
            Err(e) => log::warn!("failed to add resize listener: {}", js_message(&e)),
        }
    }
}

impl Drop for ShadowHost {
    fn drop(&mut self) {
        self.release();
    }
}

/// Schedules frame steps with `requestAnimationFrame`
pub struct AnimationFrameScheduler {
    window: Window,
}

impl AnimationFrameScheduler {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn schedule(&self, step: FrameStep) {
        let callback = Closure::once_into_js(move || step());
        if let Err(e) = self.window.request_animation_frame(callback.unchecked_ref()) {
            log::error!("requestAnimationFrame failed: {}", js_message(&e));
        }
    }
}

/// Fetches mesh assets over HTTP with `window.fetch`
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, AssetLoadError> {
        let fail = |reason: String| AssetLoadError::Fetch {
            source_uri: source.to_string(),
            reason,
        };

        let window = web_sys::window().ok_or_else(|| fail("no window".to_string()))?;
        let response = JsFuture::from(window.fetch_with_str(source))
            .await
            .map_err(|e| fail(js_message(&e)))?;
        let response: Response = response.dyn_into().map_err(|e| fail(js_message(&e)))?;

        if !response.ok() {
            return Err(fail(format!(
                "HTTP {} {}",
                response.status(),
                response.status_text()
            )));
        }

        let buffer = response.array_buffer().map_err(|e| fail(js_message(&e)))?;
        let buffer = JsFuture::from(buffer)
            .await
            .map_err(|e| fail(js_message(&e)))?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}

/// A viewer mounted into a DOM element
#[wasm_bindgen]
pub struct ViewerHandle {
    viewer: Viewer<CanvasSurface>,
    host: ShadowHost,
    ready: Promise,
}

#[wasm_bindgen]
impl ViewerHandle {
    /// Resolves to `true` once the model is framed and rendering, `false` if the
    /// viewer was disposed first. Rejects with the load error otherwise.
    #[wasm_bindgen(getter)]
    pub fn ready(&self) -> Promise {
        self.ready.clone()
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.viewer.is_active()
    }

    #[wasm_bindgen(js_name = framesRendered)]
    pub fn frames_rendered(&self) -> f64 {
        self.viewer.frames_rendered() as f64
    }

    /// Stop rendering, detach the resize listener and remove the canvas
    pub fn dispose(&mut self) {
        self.viewer.dispose();
        self.host.release();
    }
}

/// Mount a viewer into `element`.
///
/// Throws synchronously when a required attribute is missing or malformed.
/// The model is fetched once in the background; see [`ViewerHandle::ready`].
#[wasm_bindgen(js_name = mountViewer)]
pub fn mount_viewer(element: Element) -> Result<ViewerHandle, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let mut host = ShadowHost::new(element.clone(), window.clone());
    let viewer = mount(&mut host, &ElementAttributes(&element)).map_err(to_js_error)?;

    let scheduler: Rc<dyn FrameScheduler> = Rc::new(AnimationFrameScheduler::new(window));
    let handle = viewer.handle();
    let ready = future_to_promise(async move {
        let fetcher = HttpFetcher;
        match handle.load(&fetcher, scheduler).await {
            Ok(LoadOutcome::Started(_)) => Ok(JsValue::TRUE),
            Ok(LoadOutcome::Discarded) => Ok(JsValue::FALSE),
            Err(e) => {
                log::error!("{}", e);
                Err(to_js_error(e))
            }
        }
    });

    Ok(ViewerHandle {
        viewer,
        host,
        ready,
    })
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
    Ok(())
}
