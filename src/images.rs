//! Pluggable image acquisition.
//!
//! Image and tileset nodes never read pixels themselves; they describe
//! what they need as an [`ImageRequest`] and hand it to the
//! [`ImageLoader`] supplied with the parse. The returned [`ImageHandle`]
//! is opaque to the graph.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use serde::Serialize;

use crate::colour::Colour;
use crate::error::{GraphError, Result};

/// A pixel rectangle within a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Everything a loader needs to produce one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequest {
    /// Source path, already resolved against the document directory.
    pub path: PathBuf,
    /// Sub-region to extract; `None` for the whole image.
    pub region: Option<Rect>,
    /// Colour to treat as transparent, as written in the document.
    pub colorkey: Option<String>,
}

impl ImageRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            region: None,
            colorkey: None,
        }
    }

    pub fn with_region(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_colorkey(mut self, colorkey: Option<String>) -> Self {
        self.colorkey = colorkey;
        self
    }
}

/// An opaque, cheaply clonable loaded image.
#[derive(Clone)]
pub struct ImageHandle {
    size: Option<(u32, u32)>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ImageHandle {
    pub fn new<T: Any + Send + Sync>(payload: T, size: Option<(u32, u32)>) -> Self {
        Self {
            size,
            payload: Arc::new(payload),
        }
    }

    /// Pixel dimensions, if the loader knows them.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Produces image handles for image and tileset nodes.
pub trait ImageLoader {
    fn load(&self, request: &ImageRequest) -> Result<ImageHandle>;
}

impl<F> ImageLoader for F
where
    F: Fn(&ImageRequest) -> Result<ImageHandle>,
{
    fn load(&self, request: &ImageRequest) -> Result<ImageHandle> {
        self(request)
    }
}

/// Loader that records requests without touching the filesystem.
///
/// The handle's payload is the [`ImageRequest`] itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredImageLoader;

impl ImageLoader for DeferredImageLoader {
    fn load(&self, request: &ImageRequest) -> Result<ImageHandle> {
        let size = request.region.map(|r| (r.width, r.height));
        Ok(ImageHandle::new(request.clone(), size))
    }
}

/// Loader that decodes pixels with the `image` crate.
///
/// Whole sheets are decoded once per path and cropped per request. The
/// handle's payload is an [`RgbaImage`].
#[derive(Debug, Default)]
pub struct RasterImageLoader {
    sheets: Mutex<HashMap<PathBuf, Arc<RgbaImage>>>,
}

impl RasterImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    fn sheet(&self, path: &Path) -> Result<Arc<RgbaImage>> {
        let mut sheets = self.sheets.lock().map_err(|_| GraphError::Image {
            path: path.to_path_buf(),
            message: "image cache lock poisoned".to_string(),
        })?;

        if let Some(sheet) = sheets.get(path) {
            return Ok(Arc::clone(sheet));
        }

        let decoded = image::open(path).map_err(|e| GraphError::Image {
            path: path.to_path_buf(),
            message: format!("Failed to decode image: {}", e),
        })?;
        let sheet = Arc::new(decoded.to_rgba8());
        sheets.insert(path.to_path_buf(), Arc::clone(&sheet));
        Ok(sheet)
    }
}

impl ImageLoader for RasterImageLoader {
    fn load(&self, request: &ImageRequest) -> Result<ImageHandle> {
        let sheet = self.sheet(&request.path)?;

        let mut pixels = match request.region {
            Some(r) => {
                if r.x.saturating_add(r.width) > sheet.width()
                    || r.y.saturating_add(r.height) > sheet.height()
                {
                    return Err(GraphError::Image {
                        path: request.path.clone(),
                        message: format!(
                            "region {}x{}+{}+{} exceeds {}x{} image",
                            r.width,
                            r.height,
                            r.x,
                            r.y,
                            sheet.width(),
                            sheet.height()
                        ),
                    });
                }
                image::imageops::crop_imm(&*sheet, r.x, r.y, r.width, r.height).to_image()
            }
            None => (*sheet).clone(),
        };

        if let Some(key) = &request.colorkey {
            let key = Colour::from_hex(key).map_err(|e| GraphError::Image {
                path: request.path.clone(),
                message: e.to_string(),
            })?;
            for pixel in pixels.pixels_mut() {
                if key.matches_rgb(pixel.0) {
                    pixel.0[3] = 0;
                }
            }
        }

        let size = (pixels.width(), pixels.height());
        Ok(ImageHandle::new(pixels, Some(size)))
    }
}
