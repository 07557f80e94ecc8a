/// Mesh asset loading: a single fetch followed by STL decoding
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::AssetLoadError;
use crate::geometry::Mesh;
use crate::stl;

/// Retrieves the raw bytes of a mesh asset.
///
/// Implementations perform exactly one attempt; callers never retry.
#[allow(async_fn_in_trait)]
pub trait AssetFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, AssetLoadError>;
}

/// Reads assets from the local filesystem, resolving relative sources against `root`.
///
/// The read is a blocking `std::fs::read`, so the returned future completes
/// on its first poll. That suits hosts that drive loads with
/// `pollster::block_on`; an executor shared with other tasks would stall
/// for the duration of the read.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    pub root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl AssetFetcher for FileFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, AssetLoadError> {
        let path = match &self.root {
            Some(root) => root.join(source),
            None => PathBuf::from(source),
        };
        std::fs::read(&path).map_err(|e| AssetLoadError::Fetch {
            source_uri: source.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Serves assets from memory, e.g. STL text handed over by an embedding application
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(source.into(), bytes.into());
    }

    pub fn with_asset(mut self, source: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(source, bytes);
        self
    }
}

impl AssetFetcher for MemoryFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, AssetLoadError> {
        self.assets
            .get(source)
            .cloned()
            .ok_or_else(|| AssetLoadError::Fetch {
                source_uri: source.to_string(),
                reason: "no such asset".to_string(),
            })
    }
}

/// Fetch and decode the mesh at `source`. One attempt, no retry.
pub async fn load_asset<F: AssetFetcher>(
    fetcher: &F,
    source: &str,
) -> Result<Mesh, AssetLoadError> {
    let bytes = fetcher.fetch(source).await?;
    let mesh = stl::parse_stl(&bytes).map_err(|e| AssetLoadError::Parse {
        source_uri: source.to_string(),
        source: e,
    })?;

    if mesh.is_empty() {
        return Err(AssetLoadError::EmptyGeometry {
            source_uri: source.to_string(),
        });
    }

    log::debug!("decoded {} triangles from {}", mesh.triangles.len(), source);
    Ok(mesh)
}

/// Encode a mesh as binary STL, used to hand generated geometry to a fetcher
pub fn encode_binary_stl(mesh: &Mesh) -> Vec<u8> {
    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());
    for triangle in &mesh.triangles {
        let normal = triangle.calculate_normal();
        for value in normal.iter() {
            data.extend_from_slice(&value.to_le_bytes());
        }
        for vertex in &triangle.vertices {
            for value in vertex.position.coords.iter() {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        data.extend_from_slice(&[0, 0]);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StlError;

    #[test]
    fn test_memory_fetch_and_decode() {
        let fetcher = MemoryFetcher::new().with_asset("cube.stl", encode_binary_stl(&Mesh::cube(2.0)));
        let mesh = pollster::block_on(load_asset(&fetcher, "cube.stl")).unwrap();
        assert_eq!(mesh, Mesh::cube(2.0));
    }

    #[test]
    fn test_missing_asset_is_fetch_error() {
        let err = pollster::block_on(load_asset(&MemoryFetcher::new(), "missing.stl")).unwrap_err();
        assert!(matches!(err, AssetLoadError::Fetch { ref source_uri, .. } if source_uri == "missing.stl"));
    }

    #[test]
    fn test_unparseable_asset_is_parse_error() {
        let fetcher = MemoryFetcher::new().with_asset("bad.stl", vec![1u8; 12]);
        let err = pollster::block_on(load_asset(&fetcher, "bad.stl")).unwrap_err();
        assert!(matches!(
            err,
            AssetLoadError::Parse {
                source: StlError::TooSmall(12),
                ..
            }
        ));
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let fetcher = MemoryFetcher::new().with_asset("empty.stl", encode_binary_stl(&Mesh::new()));
        let err = pollster::block_on(load_asset(&fetcher, "empty.stl")).unwrap_err();
        assert!(matches!(err, AssetLoadError::EmptyGeometry { .. }));
    }

    #[test]
    fn test_file_fetcher_reports_io_errors() {
        let fetcher = FileFetcher::with_root("/nonexistent-stlview-root");
        let err = pollster::block_on(load_asset(&fetcher, "part.stl")).unwrap_err();
        assert!(matches!(err, AssetLoadError::Fetch { .. }));
    }

    #[test]
    fn test_file_fetcher_reads_relative_to_root() {
        let root = std::env::temp_dir().join(format!("stlview-fetch-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("cube.stl"), encode_binary_stl(&Mesh::cube(2.0))).unwrap();

        let mesh = pollster::block_on(load_asset(&FileFetcher::with_root(&root), "cube.stl")).unwrap();
        assert_eq!(mesh, Mesh::cube(2.0));
        std::fs::remove_dir_all(&root).unwrap();
    }
}
