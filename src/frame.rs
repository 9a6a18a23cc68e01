//! Captured framebuffer contents

use crate::error::{Result, SessionError};
use image::RgbImage;
use std::path::Path;

/// Bytes per pixel in a captured frame (8-bit R, G, B)
pub const CHANNELS: usize = 3;

/// An RGB frame laid out as (height, width, 3), row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap a raw RGB byte stream.
    ///
    /// The stream must be exactly `width * height * 3` bytes; anything else
    /// means the display resolution differs from what the caller assumed.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(SessionError::FrameSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Array shape in (rows, columns, channels) order
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGB value at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// One row of pixels as a flat RGB slice
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * CHANNELS;
        let start = y as usize * stride;
        Some(&self.data[start..start + stride])
    }

    pub fn to_image(&self) -> RgbImage {
        self.clone().into_image()
    }

    pub fn into_image(self) -> RgbImage {
        // Length was checked in Frame::from_raw, so the fallback is never taken.
        RgbImage::from_raw(self.width, self.height, self.data)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Save the frame, format chosen from the file extension.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;

        self.to_image()
            .save(path)
            .with_context(|| format!("Failed to save frame to {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        (0..Frame::byte_len(width, height))
            .map(|i| (i % 251) as u8)
            .collect()
    }

    #[test]
    fn test_shape_matches_dimensions() {
        let frame = Frame::from_raw(4, 2, gradient(4, 2)).unwrap();
        assert_eq!(frame.shape(), (2, 4, 3));
        assert_eq!(frame.as_bytes().len(), 24);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let err = Frame::from_raw(4, 2, vec![0; 23]).unwrap_err();
        match err {
            SessionError::FrameSize { expected, actual } => {
                assert_eq!(expected, 24);
                assert_eq!(actual, 23);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(Frame::from_raw(4, 2, vec![0; 25]).is_err());
        assert!(Frame::from_raw(4, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_pixel_is_row_major() {
        let frame = Frame::from_raw(2, 2, (0..12).collect()).unwrap();
        assert_eq!(frame.pixel(0, 0), Some([0, 1, 2]));
        assert_eq!(frame.pixel(1, 0), Some([3, 4, 5]));
        assert_eq!(frame.pixel(0, 1), Some([6, 7, 8]));
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.row(1), Some(&[6, 7, 8, 9, 10, 11][..]));
        assert_eq!(frame.row(2), None);
    }

    #[test]
    fn test_image_conversion() {
        let frame = Frame::from_raw(3, 2, gradient(3, 2)).unwrap();
        let img = frame.to_image();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, frame.pixel(2, 1).unwrap());
        assert_eq!(frame.clone().into_image(), img);
        assert_eq!(img.as_raw(), frame.as_bytes());
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let frame = Frame::from_raw(8, 8, gradient(8, 8)).unwrap();
        frame.save(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(loaded.as_raw(), frame.as_bytes());
    }
}
