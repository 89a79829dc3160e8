use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use base64::Engine;

use crate::{
    core::{PixelSize, Rgba8Premul},
    error::{MaquetteError, MaquetteResult},
};

/// Prepared raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    pub fn pixel_size(&self) -> PixelSize {
        PixelSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// Resolves and decodes image sources ahead of rendering, so composite
/// passes stay deterministic and IO-free. A source is either a path
/// relative to the library root or a `data:` URI with a base64 payload.
#[derive(Debug)]
pub struct AssetLibrary {
    root: PathBuf,
    cache: HashMap<String, PreparedImage>,
}

impl AssetLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    /// Root directory used when resolving relative sources.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the prepared image for `source`, decoding on first use
    /// and serving repeats from the cache.
    pub fn prepare(&mut self, source: &str) -> MaquetteResult<PreparedImage> {
        if let Some(image) = self.cache.get(source) {
            return Ok(image.clone());
        }

        let bytes = self.read_source_bytes(source)?;
        let image = decode_image(&bytes)?;
        self.cache.insert(source.to_string(), image.clone());
        Ok(image)
    }

    fn read_source_bytes(&self, source: &str) -> MaquetteResult<Vec<u8>> {
        if source.starts_with("data:") {
            return decode_data_uri(source);
        }

        let norm = normalize_rel_path(source)?;
        let path = self.root.join(Path::new(&norm));
        std::fs::read(&path)
            .with_context(|| format!("read image bytes from '{}'", path.display()))
            .map_err(MaquetteError::from)
    }
}

pub fn decode_image(bytes: &[u8]) -> MaquetteResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| MaquetteError::asset(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(MaquetteError::asset("decoded image has a zero dimension"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn decode_data_uri(source: &str) -> MaquetteResult<Vec<u8>> {
    // data:<media-type>;base64,<payload>
    let rest = source
        .strip_prefix("data:")
        .ok_or_else(|| MaquetteError::asset("not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| MaquetteError::asset("data URI has no payload"))?;
    if !meta.ends_with(";base64") {
        return Err(MaquetteError::asset(
            "data URI sources must be base64 encoded",
        ));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| MaquetteError::asset(format!("invalid base64 payload: {e}")))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let p = Rgba8Premul::from_straight_rgba(px[0], px[1], px[2], px[3]);
        px.copy_from_slice(&p.to_array());
    }
}

/// Normalize and validate library-relative image paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> MaquetteResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(MaquetteError::validation("image paths must be relative"));
    }
    if s.is_empty() {
        return Err(MaquetteError::validation("image path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(MaquetteError::validation("image paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(MaquetteError::validation(
            "image path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}
