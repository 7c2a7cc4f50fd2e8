//! Image normalization
//!
//! Turns the image references stored on blocks into raster data ready to
//! embed: decode, shrink to the quality tier's box, re-encode as JPEG
//! (DCTDecode) or deflated RGB (FlateDecode) with an optional alpha mask.
//!
//! Anything that cannot be turned into pixels becomes a [`Placeholder`]
//! instead of an error, so an export always completes.

use crate::options::{ExportLimits, Quality, QualitySettings};
use crate::types::{ExportError, Result};
use base64::Engine;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Classified image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// `data:` URL carrying the image inline
    DataUrl,
    /// Absolute URL (`https:`, `file:`, ...)
    Remote(url::Url),
    /// Path relative to the site root, e.g. `/images/castle.png`
    SiteRelative(String),
}

impl ImageRef {
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ExportError::InvalidImageReference("empty reference".into()));
        }
        if reference.starts_with("data:") {
            return Ok(ImageRef::DataUrl);
        }
        if let Ok(url) = url::Url::parse(reference) {
            return Ok(ImageRef::Remote(url));
        }
        if reference.starts_with('/') {
            return Ok(ImageRef::SiteRelative(reference.to_string()));
        }
        Err(ExportError::InvalidImageReference(reference.to_string()))
    }
}

/// Whether a reference is a data URL or a parseable URL
pub fn validate_image_url(reference: &str) -> bool {
    matches!(
        ImageRef::parse(reference),
        Ok(ImageRef::DataUrl | ImageRef::Remote(_))
    )
}

/// Resolves non-inline references to encoded image bytes.
///
/// Called from blocking worker threads.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, reference: &ImageRef) -> Result<Vec<u8>>;
}

/// Reads site-relative paths and `file:` URLs from a local directory.
/// Remote URLs are never fetched.
#[derive(Debug, Clone, Default)]
pub struct AssetDirectory {
    root: Option<PathBuf>,
}

impl AssetDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// A source that resolves nothing
    pub fn none() -> Self {
        Self::default()
    }

    fn resolve_relative(&self, path: &str) -> Result<PathBuf> {
        let root = self.root.as_ref().ok_or_else(|| {
            ExportError::ImageUnavailable(format!("no asset directory for {}", path))
        })?;
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ExportError::InvalidImageReference(path.to_string()));
        }
        Ok(root.join(relative))
    }
}

impl ImageSource for AssetDirectory {
    fn fetch(&self, reference: &ImageRef) -> Result<Vec<u8>> {
        match reference {
            ImageRef::SiteRelative(path) => Ok(std::fs::read(self.resolve_relative(path)?)?),
            ImageRef::Remote(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| ExportError::InvalidImageReference(url.to_string()))?;
                Ok(std::fs::read(path)?)
            }
            ImageRef::Remote(url) => Err(ExportError::ImageUnavailable(format!(
                "remote image {} is not fetched",
                url
            ))),
            ImageRef::DataUrl => Err(ExportError::InvalidImageReference(
                "data URLs are decoded inline".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFormat {
    /// Baseline JPEG, embedded with DCTDecode
    Jpeg,
    /// Deflated 8-bit RGB, embedded with FlateDecode
    Png,
}

/// Raster data ready to embed as an image XObject
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    /// Pixel width after resizing
    pub width: u32,
    /// Pixel height after resizing
    pub height: u32,
    pub natural_width: u32,
    pub natural_height: u32,
    pub format: EncodedFormat,
    pub data: Vec<u8>,
    /// Deflated 8-bit alpha channel, if any pixel is not opaque
    pub alpha: Option<Vec<u8>>,
}

impl ProcessedImage {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Fallback drawn in place of an image that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub caption: String,
    pub reason: String,
}

impl Placeholder {
    /// Placeholder for an image frame with no reference
    pub fn empty() -> Self {
        Self {
            caption: "No Image".into(),
            reason: "no image selected".into(),
        }
    }

    pub fn for_reference(reference: &str, reason: impl Into<String>) -> Self {
        Self {
            caption: caption_for(reference),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.caption, self.reason)
    }
}

/// Basename of a reference, used as placeholder caption
fn caption_for(reference: &str) -> String {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("data:") {
        return "Image".into();
    }
    let path = reference.split(['?', '#']).next().unwrap_or_default();
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(name) if !name.is_empty() && !name.ends_with(':') => name.to_string(),
        _ => "Image".into(),
    }
}

pub type ImageOutcome = std::result::Result<Arc<ProcessedImage>, Placeholder>;

/// Decodes, resizes and re-encodes images, memoizing by reference and tier.
///
/// Clones share one cache.
#[derive(Clone)]
pub struct ImageNormalizer {
    source: Arc<dyn ImageSource>,
    cache: Arc<Mutex<HashMap<(String, Quality), ImageOutcome>>>,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(AssetDirectory::none())
    }
}

impl fmt::Debug for ImageNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageNormalizer")
            .field("cached", &self.cache_len())
            .finish()
    }
}

impl ImageNormalizer {
    pub fn new(source: impl ImageSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Normalize one reference. Never fails; errors become placeholders.
    pub fn normalize(&self, reference: &str, quality: Quality) -> ImageOutcome {
        let key = (reference.to_string(), quality);
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return hit;
        }

        let outcome = match self.process(reference, quality) {
            Ok(image) => Ok(Arc::new(image)),
            Err(e) => {
                log::warn!("Using placeholder for image {}: {}", caption_for(reference), e);
                Err(Placeholder::for_reference(reference, e.to_string()))
            }
        };

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, outcome.clone());
        }
        outcome
    }

    /// Normalize every distinct reference on a bounded pool of blocking
    /// workers. Slow images and anything left when the overall deadline
    /// elapses resolve to placeholders.
    pub async fn normalize_all<I, S>(
        &self,
        references: I,
        quality: Quality,
        limits: &ExportLimits,
    ) -> HashMap<String, ImageOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pending: Vec<String> = Vec::new();
        for reference in references {
            let reference = reference.into();
            if !pending.contains(&reference) {
                pending.push(reference);
            }
        }

        let mut results = HashMap::with_capacity(pending.len());
        if pending.is_empty() {
            return results;
        }

        log::debug!(
            "Normalizing {} image(s) at {} quality, {} at a time",
            pending.len(),
            quality,
            limits.max_concurrent_images
        );

        let semaphore = Arc::new(Semaphore::new(limits.max_concurrent_images.max(1)));
        let per_image = limits.image_timeout();
        let mut tasks = JoinSet::new();

        for reference in pending.iter().cloned() {
            let normalizer = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let Ok(permit) = semaphore.acquire_owned().await else {
                    let placeholder = Placeholder::for_reference(&reference, "worker pool closed");
                    return (reference, Err(placeholder));
                };

                let target = reference.clone();
                // The permit lives as long as the blocking work, even past a timeout
                let work = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    normalizer.normalize(&target, quality)
                });

                let outcome = match tokio::time::timeout(per_image, work).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => Err(Placeholder::for_reference(
                        &reference,
                        format!("image worker failed: {}", e),
                    )),
                    Err(_) => {
                        log::warn!(
                            "Image {} timed out after {:?}",
                            caption_for(&reference),
                            per_image
                        );
                        Err(Placeholder::for_reference(&reference, "processing timed out"))
                    }
                };
                (reference, outcome)
            });
        }

        let deadline = limits
            .overall_timeout()
            .map(|budget| tokio::time::Instant::now() + budget);

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        log::warn!(
                            "Image deadline elapsed with {} image(s) outstanding",
                            tasks.len()
                        );
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            match next {
                Some(Ok((reference, outcome))) => {
                    results.insert(reference, outcome);
                }
                Some(Err(e)) => log::warn!("Image task failed: {}", e),
                None => break,
            }
        }

        for reference in pending {
            if !results.contains_key(&reference) {
                let placeholder = Placeholder::for_reference(&reference, "export deadline elapsed");
                results.insert(reference, Err(placeholder));
            }
        }
        results
    }

    fn process(&self, reference: &str, quality: Quality) -> Result<ProcessedImage> {
        let bytes = match ImageRef::parse(reference)? {
            ImageRef::DataUrl => decode_data_url(reference)?,
            other => self.source.fetch(&other)?,
        };

        let decoded = image::load_from_memory(&bytes)?;
        let settings = quality.settings();
        let (natural_width, natural_height) = decoded.dimensions();

        let resized = if natural_width > settings.max_image_width
            || natural_height > settings.max_image_height
        {
            decoded.resize(
                settings.max_image_width,
                settings.max_image_height,
                FilterType::Triangle,
            )
        } else {
            decoded
        };

        let has_alpha = has_transparency(&resized);
        let format = optimal_format(reference, quality, has_alpha);
        let mut image = encode(&resized, format, &settings)?;
        image.natural_width = natural_width;
        image.natural_height = natural_height;
        Ok(image)
    }
}

/// JPEG for photographs, lossless for graphics, transparency and the high tier
fn optimal_format(reference: &str, quality: Quality, has_alpha: bool) -> EncodedFormat {
    if has_alpha || quality == Quality::High {
        return EncodedFormat::Png;
    }
    let lower = reference
        .get(..reference.find(',').unwrap_or(reference.len()))
        .unwrap_or(reference)
        .to_ascii_lowercase();
    if lower.contains("icon") || lower.contains("graphic") {
        EncodedFormat::Png
    } else {
        EncodedFormat::Jpeg
    }
}

fn has_transparency(image: &DynamicImage) -> bool {
    image.color().has_alpha() && image.to_rgba8().pixels().any(|p| p.0[3] != u8::MAX)
}

fn encode(
    image: &DynamicImage,
    format: EncodedFormat,
    settings: &QualitySettings,
) -> Result<ProcessedImage> {
    let (width, height) = image.dimensions();

    let (data, alpha) = match format {
        EncodedFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let mut out = Vec::new();
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, settings.jpeg_quality());
            encoder.encode(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)?;
            (out, None)
        }
        EncodedFormat::Png => {
            let rgba = image.to_rgba8();
            let mut rgb = Vec::with_capacity((width * height * 3) as usize);
            let mut alpha = Vec::with_capacity((width * height) as usize);
            for pixel in rgba.pixels() {
                let [r, g, b, a] = pixel.0;
                rgb.extend_from_slice(&[r, g, b]);
                alpha.push(a);
            }
            let level = settings.flate_level();
            let mask = if alpha.iter().any(|a| *a != u8::MAX) {
                Some(deflate(&alpha, level)?)
            } else {
                None
            };
            (deflate(&rgb, level)?, mask)
        }
    };

    Ok(ProcessedImage {
        width,
        height,
        natural_width: width,
        natural_height: height,
        format,
        data,
        alpha,
    })
}

pub(crate) fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decode_data_url(reference: &str) -> Result<Vec<u8>> {
    let (header, payload) = reference
        .split_once(',')
        .ok_or_else(|| ExportError::InvalidImageReference("data URL without payload".into()))?;

    if header.ends_with(";base64") {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| ExportError::InvalidImageReference(format!("bad base64 data: {}", e)))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}
