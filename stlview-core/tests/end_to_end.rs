use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use stlview_core::framing::{AUTO_ROTATE_SPEED, CAMERA_HEIGHT};
use stlview_core::loader::encode_binary_stl;
use stlview_core::{
    mount, Camera, ConfigurationError, FrameQueue, HostError, LoadOutcome, Material,
    MemoryFetcher, Mesh, RenderError, RenderSurface, ResizeListener, Rgb, Scene, SessionState,
    Transform, ViewerError, ViewerHost, Viewport,
};

/// Records the camera position of every frame it is asked to draw
struct RecordingSurface {
    viewport: Viewport,
    frames: Rc<RefCell<Vec<Point3<f32>>>>,
}

impl RenderSurface for RecordingSurface {
    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn render(&mut self, _scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        self.frames.borrow_mut().push(camera.position);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingHost {
    frames: Rc<RefCell<Vec<Point3<f32>>>>,
    surfaces_attached: usize,
    listeners: Vec<ResizeListener>,
}

impl ViewerHost for RecordingHost {
    type Surface = RecordingSurface;

    fn attach_surface(&mut self) -> Result<RecordingSurface, HostError> {
        self.surfaces_attached += 1;
        Ok(RecordingSurface {
            viewport: Viewport::new(800, 500),
            frames: self.frames.clone(),
        })
    }

    fn on_resize(&mut self, listener: ResizeListener) {
        self.listeners.push(listener);
    }
}

/// A box sitting in the positive octant, so recentering has work to do
fn part() -> Mesh {
    Mesh::cuboid(Point3::origin(), Vector3::new(20.0, 10.0, 40.0))
}

#[test]
fn solid_auto_rotating_green_cube() {
    let fetcher = MemoryFetcher::new().with_asset("cube.stl", encode_binary_stl(&part()));
    let queue = Rc::new(FrameQueue::new());
    let mut host = RecordingHost::default();

    let viewer = mount(
        &mut host,
        &[
            ("model", "cube.stl"),
            ("color", "#00ff00"),
            ("materialType", "material"),
            ("auto_rotate", "true"),
        ],
    )
    .unwrap();

    let framing = match pollster::block_on(viewer.load(&fetcher, queue.clone())).unwrap() {
        LoadOutcome::Started(framing) => framing,
        LoadOutcome::Discarded => panic!("live session discarded its asset"),
    };
    assert_relative_eq!(framing.largest_dimension, 40.0);
    assert_relative_eq!(framing.camera_distance, 60.0);
    assert_relative_eq!(framing.translation, Vector3::new(-10.0, -5.0, -20.0));

    {
        let session = viewer.session();
        let scene = session.scene();
        assert_eq!(scene.child_count(), 1);

        let framed = scene.mesh().unwrap();
        let center = framed.mesh.bounding_extent().unwrap().center();
        assert_relative_eq!(center, Point3::origin(), epsilon = 1e-5);
        assert_eq!(
            framed.material,
            Material::Phong {
                color: Rgb::new(0, 255, 0),
                specular: Rgb::from_u32(0x000064),
                shininess: 100.0,
            }
        );

        let controller = session.controller();
        assert!(controller.auto_rotate);
        assert_eq!(controller.auto_rotate_speed, AUTO_ROTATE_SPEED);

        // The first frame has already nudged the camera around the vertical axis
        let camera = session.camera();
        assert_relative_eq!(camera.position.y, CAMERA_HEIGHT, epsilon = 1e-3);
        let horizontal = Vector3::new(camera.position.x, 0.0, camera.position.z).norm();
        assert_relative_eq!(horizontal, 60.0, epsilon = 1e-3);
        assert_eq!(camera.target, Point3::origin());
    }

    for _ in 0..3 {
        queue.run_pending();
    }
    let positions = host.frames.borrow().clone();
    assert_eq!(positions.len(), 4);
    assert!(positions.windows(2).all(|pair| pair[0] != pair[1]));

    viewer.dispose();
    for _ in 0..10 {
        queue.run_pending();
    }
    assert_eq!(viewer.state(), SessionState::Stopped);
    assert_eq!(host.frames.borrow().len(), 4);
    assert_eq!(viewer.frames_rendered(), 4);
}

#[test]
fn wireframe_is_the_default_material() {
    let fetcher = MemoryFetcher::new().with_asset("cube.stl", encode_binary_stl(&part()));
    let queue = Rc::new(FrameQueue::new());

    for material_type in [None, Some("wireframe"), Some("shiny")] {
        let mut host = RecordingHost::default();
        let mut attributes = vec![("model", "cube.stl"), ("color", "0x00ff00")];
        if let Some(value) = material_type {
            attributes.push(("materialType", value));
        }

        let viewer = mount(&mut host, attributes.as_slice()).unwrap();
        pollster::block_on(viewer.load(&fetcher, queue.clone())).unwrap();

        let session = viewer.session();
        let framed = session.scene().mesh().unwrap();
        assert!(framed.material.is_wireframe(), "{material_type:?}");
        assert_eq!(framed.material.color(), Rgb::new(0, 255, 0));
        assert!(!session.controller().auto_rotate);
    }
}

#[test]
fn doubling_geometry_doubles_camera_distance() {
    let mut doubled = part();
    doubled.apply_matrix(&Transform::scale_matrix(2.0, 2.0, 2.0));
    let fetcher = MemoryFetcher::new()
        .with_asset("small.stl", encode_binary_stl(&part()))
        .with_asset("large.stl", encode_binary_stl(&doubled));
    let queue = Rc::new(FrameQueue::new());

    let mut distances = Vec::new();
    for model in ["small.stl", "large.stl"] {
        let mut host = RecordingHost::default();
        let viewer = mount(&mut host, &[("model", model), ("color", "#ffffff")]).unwrap();
        match pollster::block_on(viewer.load(&fetcher, queue.clone())).unwrap() {
            LoadOutcome::Started(framing) => distances.push(framing.camera_distance),
            LoadOutcome::Discarded => panic!("unexpected discard"),
        }
    }

    assert_relative_eq!(distances[1], 2.0 * distances[0]);
}

#[test]
fn missing_model_never_attaches_a_surface() {
    let mut host = RecordingHost::default();
    let result = mount(&mut host, &[("color", "#ff0000")]);
    assert!(matches!(
        result,
        Err(ViewerError::Configuration(ConfigurationError::MissingAttribute("model")))
    ));
    assert_eq!(host.surfaces_attached, 0);
    assert!(host.listeners.is_empty());
}

#[test]
fn hash_and_hex_prefixed_colors_tint_alike() {
    let mut host = RecordingHost::default();
    let hash = mount(&mut host, &[("model", "a.stl"), ("color", "#ff0000")]).unwrap();
    let prefixed = mount(&mut host, &[("model", "a.stl"), ("color", "0xff0000")]).unwrap();
    assert_eq!(hash.config().tint, prefixed.config().tint);

    let malformed = mount(&mut host, &[("model", "a.stl"), ("color", "notahexvalue")]);
    assert!(matches!(
        malformed,
        Err(ViewerError::Configuration(ConfigurationError::MalformedColor(_)))
    ));
    assert_eq!(host.surfaces_attached, 2);
}
