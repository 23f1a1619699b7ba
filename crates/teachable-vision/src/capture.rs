//! Frame acquisition, release, and thumbnail generation.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use crate::types::{Frame, VisionError, VisionResult};

/// Default capture width and height.
pub const DEFAULT_FRAME_SIZE: u32 = 500;

/// Maximum thumbnail dimension (width or height).
const MAX_THUMBNAIL_SIZE: u32 = 128;

/// JPEG quality for thumbnails.
const THUMBNAIL_QUALITY: u8 = 85;

/// A continuous source of frames, one per call, reflecting its current state.
pub trait VideoSource {
    /// Acquire the current frame.
    fn acquire_frame(&mut self) -> VisionResult<Frame>;

    /// Hand a frame back once the iteration that owned it is done.
    fn release_frame(&mut self, frame: Frame) {
        drop(frame);
    }
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn acquire_frame(&mut self) -> VisionResult<Frame> {
        (**self).acquire_frame()
    }

    fn release_frame(&mut self, frame: Frame) {
        (**self).release_frame(frame)
    }
}

/// Scoped ownership of one frame; releases it to its source on drop.
pub struct FrameGuard<'a, S: VideoSource + ?Sized> {
    source: &'a mut S,
    frame: Option<Frame>,
}

impl<'a, S: VideoSource + ?Sized> FrameGuard<'a, S> {
    /// Acquire a frame from `source` and hold it until the guard drops.
    pub fn acquire(source: &'a mut S) -> VisionResult<Self> {
        let frame = source.acquire_frame()?;
        Ok(Self {
            source,
            frame: Some(frame),
        })
    }

    pub fn frame(&self) -> &Frame {
        match &self.frame {
            Some(frame) => frame,
            None => unreachable!("frame is only taken on drop"),
        }
    }
}

impl<S: VideoSource + ?Sized> Drop for FrameGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.source.release_frame(frame);
        }
    }
}

/// Load an image from a file path.
pub fn capture_from_file(path: &Path) -> VisionResult<DynamicImage> {
    Ok(image::open(path)?)
}

/// Cycles through the images of a directory, re-reading each file on acquire.
pub struct DirectorySource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    next_seq: u64,
}

impl DirectorySource {
    /// Open a directory of frames. Fails if it holds no supported images.
    pub fn open(dir: &Path) -> VisionResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            VisionError::CaptureUnavailable(format!("Cannot read {}: {e}", dir.display()))
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .filter(|p| p.to_str().is_some_and(is_supported_format))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(VisionError::CaptureUnavailable(format!(
                "No supported images in {}",
                dir.display()
            )));
        }

        tracing::info!("Frame directory {} ({} images)", dir.display(), files.len());
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            cursor: 0,
            next_seq: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl VideoSource for DirectorySource {
    fn acquire_frame(&mut self) -> VisionResult<Frame> {
        let path = &self.files[self.cursor];
        let image = capture_from_file(path).map_err(|e| {
            VisionError::Capture(format!("Failed to read frame {}: {e}", path.display()))
        })?;
        self.cursor = (self.cursor + 1) % self.files.len();

        let frame = Frame::new(self.next_seq, image);
        self.next_seq += 1;
        Ok(frame)
    }
}

/// Deterministic frames that switch between solid scenes at a fixed cadence.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frames_per_scene: u64,
    palette: Vec<[u8; 3]>,
    next_seq: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, frames_per_scene: u64) -> VisionResult<Self> {
        if width == 0 || height == 0 {
            return Err(VisionError::CaptureUnavailable(format!(
                "Invalid synthetic frame size {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            frames_per_scene: frames_per_scene.max(1),
            palette: vec![
                [220, 40, 40],
                [40, 180, 60],
                [40, 70, 220],
                [230, 200, 40],
                [150, 50, 180],
            ],
            next_seq: 0,
        })
    }

    /// Palette index shown for frame `seq`.
    pub fn scene_for(&self, seq: u64) -> usize {
        ((seq / self.frames_per_scene) % self.palette.len() as u64) as usize
    }

    fn render(&self, seq: u64) -> RgbImage {
        let [r, g, b] = self.palette[self.scene_for(seq)];
        RgbImage::from_fn(self.width, self.height, |x, _y| {
            // Horizontal shading so frames are not perfectly flat.
            let shade = (x * 32 / self.width) as u8;
            Rgb([r.saturating_sub(shade), g.saturating_sub(shade), b.saturating_sub(shade)])
        })
    }
}

impl VideoSource for SyntheticSource {
    fn acquire_frame(&mut self) -> VisionResult<Frame> {
        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(Frame::new(seq, DynamicImage::ImageRgb8(self.render(seq))))
    }
}

/// Generate a JPEG thumbnail, preserving aspect ratio, max 128x128.
pub fn generate_thumbnail(img: &DynamicImage) -> VisionResult<Vec<u8>> {
    let (w, h) = img.dimensions();

    let thumb = if w > MAX_THUMBNAIL_SIZE || h > MAX_THUMBNAIL_SIZE {
        img.resize(
            MAX_THUMBNAIL_SIZE,
            MAX_THUMBNAIL_SIZE,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img.clone()
    };

    let rgb = thumb.to_rgb8();
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, THUMBNAIL_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Check if a file path points to a supported image format.
pub fn is_supported_format(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    matches!(
        ext.as_str(),
        "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" | "tiff" | "tif"
    )
}
