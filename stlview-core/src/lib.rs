//! stlview Core Library - host-independent STL viewer sessions
//!
//! This library owns everything a viewer does between mount and dispose:
//! attribute parsing, asset loading, geometry framing, the orbit controller,
//! the light rig and the frame-scheduled render loop. Hosts supply a
//! render surface, a scheduler and an asset fetcher.

pub mod config;
pub mod controls;
pub mod error;
pub mod framing;
pub mod geometry;
pub mod loader;
pub mod projection;
pub mod render;
pub mod schedule;
pub mod scene;
pub mod session;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use config::{AttributeSource, MaterialMode, Rgb, ViewerConfig};
pub use controls::OrbitController;
pub use error::{AssetLoadError, ConfigurationError, HostError, RenderError, StlError, ViewerError};
pub use framing::{frame, Framing};
pub use geometry::{BoundingExtent, Mesh, Triangle, Vertex};
pub use loader::{load_asset, AssetFetcher, FileFetcher, MemoryFetcher};
pub use projection::{Camera, ScreenPoint, Viewport};
pub use render::{project_scene, ProjectedTriangle, RenderSurface};
pub use schedule::{FrameQueue, FrameScheduler, FrameStep};
pub use scene::{FramedMesh, LightRig, Material, Scene};
pub use session::{
    mount, LoadOutcome, RenderSession, ResizeListener, SessionHandle, SessionState, TickOutcome,
    Viewer, ViewerHost,
};
pub use transform::{RotationState, Transform};
