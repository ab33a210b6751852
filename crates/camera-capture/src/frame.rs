//! Video frame types and processing

use crate::CameraError;
use face_geometry::{Rect, Size};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a frame, checking the buffer length against the dimensions
    pub fn from_rgb(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CameraError::Format(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self::new(data, width, height, timestamp_ns, sequence))
    }

    /// Frame filled with a single colour
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], timestamp_ns: u64, sequence: u32) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(data, width, height, timestamp_ns, sequence)
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Capture time in milliseconds
    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ns as f64 / 1_000_000.0
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 3;
        let pixel = self.data.get(idx..idx + 3)?;
        Some([pixel[0], pixel[1], pixel[2]])
    }

    /// Crop a region of the frame
    ///
    /// The region is rounded to whole pixels and clipped to the frame; a
    /// region with nothing left after clipping is an error.
    pub fn crop(&self, region: &Rect) -> Result<VideoFrame, CameraError> {
        let left = region.x.round().max(0.0).min(f64::from(self.width)) as u32;
        let top = region.y.round().max(0.0).min(f64::from(self.height)) as u32;
        let right = region.right().round().max(0.0).min(f64::from(self.width)) as u32;
        let bottom = region.bottom().round().max(0.0).min(f64::from(self.height)) as u32;
        if right <= left || bottom <= top {
            return Err(CameraError::Crop);
        }
        let (w, h) = (right - left, bottom - top);

        let mut cropped = Vec::with_capacity(w as usize * h as usize * 3);
        for row in top..bottom {
            let start = (row as usize * self.width as usize + left as usize) * 3;
            let end = start + w as usize * 3;
            let line = self.data.get(start..end).ok_or(CameraError::Crop)?;
            cropped.extend_from_slice(line);
        }

        Ok(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }

    /// Flip horizontally, as a front camera preview is shown
    pub fn mirrored(&self) -> VideoFrame {
        let row_len = self.width as usize * 3;
        let mut flipped = Vec::with_capacity(self.data.len());
        for row in self.data.chunks(row_len.max(1)) {
            for pixel in row.chunks(3).rev() {
                flipped.extend_from_slice(pixel);
            }
        }
        VideoFrame {
            data: flipped,
            width: self.width,
            height: self.height,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }

    pub fn to_rgb_image(&self) -> Result<RgbImage, CameraError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            CameraError::Format(format!(
                "{} bytes do not fill a {}x{} RGB image",
                self.data.len(),
                self.width,
                self.height
            ))
        })
    }

    /// Encode as JPEG, the upload format of the face recognition service
    pub fn to_jpeg(&self) -> Result<Vec<u8>, CameraError> {
        let image = DynamicImage::ImageRgb8(self.to_rgb_image()?);
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .map_err(|e| CameraError::Encode(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

/// Decode a JPEG image into an RGB frame
pub fn decode_jpeg(jpeg_data: &[u8], timestamp_ns: u64, sequence: u32) -> Result<VideoFrame, CameraError> {
    let img = image::load_from_memory_with_format(jpeg_data, ImageFormat::Jpeg)
        .map_err(|e| CameraError::Format(e.to_string()))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(VideoFrame {
        data: rgb.into_raw(),
        width,
        height,
        timestamp_ns,
        sequence,
    })
}
