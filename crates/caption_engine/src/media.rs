use std::collections::HashMap;
use std::io;

/// MIME type guessed from the file extension; unknown extensions map to JPEG.
pub fn mime_type_for(path: &str) -> &'static str {
    let ext = file_name_of(path)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Last `/`-separated segment of `path`.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Where item bytes come from.
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, path: &str) -> io::Result<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageSource;

#[async_trait::async_trait]
impl ImageSource for FsImageSource {
    async fn load(&self, path: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// In-memory source keyed by path, for demos and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryImageSource {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.images.insert(path.into(), bytes.into());
        self
    }
}

#[async_trait::async_trait]
impl ImageSource for MemoryImageSource {
    async fn load(&self, path: &str) -> io::Result<Vec<u8>> {
        self.images.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no image at {path}"))
        })
    }
}
