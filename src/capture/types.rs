//! Frame and device types shared by every camera implementation.
//!
//! Frames are plain RGBA buffers, the same layout a browser canvas hands back
//! from `getImageData`.

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// JPEG quality used when a frame is uploaded for analysis.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// A decoded video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// RGBA bytes, row-major
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap an existing RGBA buffer.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    /// A frame where every pixel has the same colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * BYTES_PER_PIXEL);
        for _ in 0..pixels {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self::new(width, height, data)
    }

    /// Number of pixels the dimensions describe, saturating on overflow.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// True when the dimensions are non-zero and match the buffer length.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && (self.width as usize)
                .checked_mul(self.height as usize)
                .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
                .map_or(false, |len| len == self.data.len())
    }

    /// Iterate over the RGB triples of every `stride`-th pixel.
    pub fn sample_rgb(&self, stride: usize) -> impl Iterator<Item = (u8, u8, u8)> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .step_by(stride.max(1))
            .map(|px| (px[0], px[1], px[2]))
    }

    /// Encode the frame as JPEG for upload.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, CaptureError> {
        if !self.is_well_formed() {
            return Err(CaptureError::CaptureFailure(format!(
                "malformed frame {}x{} with {} bytes",
                self.width,
                self.height,
                self.data.len()
            )));
        }

        let rgba: RgbaImage = ImageBuffer::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| CaptureError::CaptureFailure("buffer size mismatch".to_string()))?;
        // JPEG has no alpha channel
        let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality)
            .encode_image(&rgb)
            .map_err(|e| CaptureError::CaptureFailure(e.to_string()))?;
        Ok(bytes)
    }

    /// Decode an encoded image (JPEG, PNG) into an RGBA frame.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, CaptureError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CaptureError::CaptureFailure(e.to_string()))?;
        let rgba: ImageBuffer<Rgba<u8>, Vec<u8>> = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::new(width, height, rgba.into_raw()))
    }
}

/// Which way the camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    User,
    Environment,
}

/// Requested capture settings, mirroring `getUserMedia` video constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub frame_rate: u32,
    pub facing_mode: FacingMode,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            max_width: 1280,
            max_height: 720,
            frame_rate: 30,
            facing_mode: FacingMode::User,
        }
    }
}

impl CaptureConstraints {
    /// Whether the ideal resolution fits inside the maximum.
    pub fn is_satisfiable(&self) -> bool {
        self.ideal_width > 0
            && self.ideal_height > 0
            && self.ideal_width <= self.max_width
            && self.ideal_height <= self.max_height
            && self.frame_rate > 0
    }
}

/// Errors raised while acquiring or reading from a camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user declined camera access
    PermissionDenied,
    /// No camera is attached
    DeviceNotFound,
    /// Another application holds the camera
    DeviceBusy,
    /// The device cannot satisfy the requested constraints
    UnsupportedConstraints,
    /// A frame could not be read or encoded
    CaptureFailure(String),
    /// A frame was requested before the stream was opened
    NotStarted,
}

impl CaptureError {
    /// Banner text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::PermissionDenied => {
                "Akses kamera ditolak. Silakan berikan izin kamera dan coba lagi.".to_string()
            }
            CaptureError::DeviceNotFound => {
                "Kamera tidak ditemukan. Pastikan kamera terhubung dengan benar.".to_string()
            }
            CaptureError::DeviceBusy => "Kamera sedang digunakan oleh aplikasi lain.".to_string(),
            CaptureError::UnsupportedConstraints => {
                "Kamera tidak mendukung pengaturan yang diminta.".to_string()
            }
            CaptureError::CaptureFailure(_) => {
                "Gagal mengambil gambar untuk analisis.".to_string()
            }
            CaptureError::NotStarted => "Kamera belum diaktifkan.".to_string(),
        }
    }
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::PermissionDenied => write!(f, "Camera permission denied"),
            CaptureError::DeviceNotFound => write!(f, "Camera device not found"),
            CaptureError::DeviceBusy => write!(f, "Camera is in use by another application"),
            CaptureError::UnsupportedConstraints => {
                write!(f, "Camera cannot satisfy the requested constraints")
            }
            CaptureError::CaptureFailure(e) => write!(f, "Frame capture failed: {e}"),
            CaptureError::NotStarted => write!(f, "Camera stream is not started"),
        }
    }
}

impl std::error::Error for CaptureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_frame_layout() {
        let frame = Frame::solid(4, 2, [10, 20, 30]);
        assert!(frame.is_well_formed());
        assert_eq!(frame.pixel_count(), 8);
        assert_eq!(&frame.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_malformed_frames() {
        assert!(!Frame::new(0, 0, Vec::new()).is_well_formed());
        assert!(!Frame::new(2, 2, vec![0; 7]).is_well_formed());

        let huge = Frame::new(u32::MAX, u32::MAX, Vec::new());
        assert!(!huge.is_well_formed());
    }

    #[test]
    fn test_sample_stride() {
        let frame = Frame::solid(10, 1, [1, 2, 3]);
        assert_eq!(frame.sample_rgb(1).count(), 10);
        assert_eq!(frame.sample_rgb(4).count(), 3);
        // A zero stride is treated as one
        assert_eq!(frame.sample_rgb(0).count(), 10);
    }

    #[test]
    fn test_jpeg_encoding_keeps_dimensions() {
        let frame = Frame::solid(32, 24, [128, 128, 128]);
        let jpeg = frame.to_jpeg(DEFAULT_JPEG_QUALITY).unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));

        let decoded = Frame::from_encoded(&jpeg).unwrap();
        assert_eq!((decoded.width, decoded.height), (32, 24));
        assert!(decoded.is_well_formed());
    }

    #[test]
    fn test_encoding_rejects_malformed_frame() {
        let frame = Frame::new(3, 3, vec![0; 4]);
        assert!(matches!(
            frame.to_jpeg(DEFAULT_JPEG_QUALITY),
            Err(CaptureError::CaptureFailure(_))
        ));
    }

    #[test]
    fn test_decoding_garbage_fails() {
        assert!(matches!(
            Frame::from_encoded(b"not an image"),
            Err(CaptureError::CaptureFailure(_))
        ));
    }

    #[test]
    fn test_constraint_satisfiability() {
        assert!(CaptureConstraints::default().is_satisfiable());

        let oversized = CaptureConstraints {
            ideal_width: 1920,
            ..CaptureConstraints::default()
        };
        assert!(!oversized.is_satisfiable());
    }
}
