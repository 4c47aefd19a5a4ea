use image::RgbImage;

use crate::error::{OverlayError, Result};

/// Layout of a raw pixel buffer handed over by a frame producer.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    Mono8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Mono8 => 1,
        }
    }
}

/// Dense 3-channel 8-bit image, interleaved, row-major.
///
/// The core never interprets channel order: palettes and marker colors are
/// written in whatever order the caller chose (RGB unless converted otherwise).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl Frame {
    /// Solid frame filled with one color.
    pub fn filled(width: usize, height: usize, color: [u8; 3]) -> Result<Self> {
        let len = buffer_len(width, height, 3, 0)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..len / 3 {
            data.extend_from_slice(&color);
        }
        Ok(Frame { data, width, height })
    }

    /// Wrap an interleaved 3-byte-per-pixel buffer.
    pub fn from_vec(data: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        let expected = buffer_len(width, height, 3, data.len())?;
        if data.len() != expected {
            return Err(OverlayError::FrameBuffer {
                width,
                height,
                bytes_per_pixel: 3,
                expected,
                actual: data.len(),
            });
        }
        Ok(Frame { data, width, height })
    }

    /// Internal constructor for buffers sized by construction.
    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Frame { data, width, height }
    }

    /// Convert a producer buffer into a frame. BGR orders are swapped to RGB,
    /// alpha is dropped and mono is replicated across the three channels.
    pub fn from_raw(bytes: &[u8], width: usize, height: usize, format: PixelFormat) -> Result<Self> {
        let bpp = format.bytes_per_pixel();
        let expected = buffer_len(width, height, bpp, bytes.len())?;
        if bytes.len() != expected {
            return Err(OverlayError::FrameBuffer {
                width,
                height,
                bytes_per_pixel: bpp,
                expected,
                actual: bytes.len(),
            });
        }

        let data = match format {
            PixelFormat::Rgb8 => bytes.to_vec(),
            PixelFormat::Mono8 => replicate_gray_to_rgb(bytes),
            PixelFormat::Rgba8 => bytes
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
            PixelFormat::Bgr8 => bytes
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
            PixelFormat::Bgra8 => bytes
                .chunks_exact(4)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
        };

        Ok(Frame { data, width, height })
    }

    pub fn from_rgb_image(img: RgbImage) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;
        Frame { data: img.into_raw(), width, height }
    }

    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel at (x, y); panics when out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Bounds-checked single pixel write; coordinates off the frame are clipped.
    #[inline]
    pub(crate) fn put(&mut self, x: i32, y: i32, color: [u8; 3]) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            let idx = (y as usize * self.width + x as usize) * 3;
            self.data[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

/// Byte length of a `width x height` buffer; overflow is a buffer error.
fn buffer_len(width: usize, height: usize, bytes_per_pixel: usize, actual: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
        .ok_or(OverlayError::FrameBuffer {
            width,
            height,
            bytes_per_pixel,
            expected: usize::MAX,
            actual,
        })
}

/// Replicate grayscale u8 to interleaved RGB u8.
fn replicate_gray_to_rgb(gray: &[u8]) -> Vec<u8> {
    let mut rgb = vec![0u8; gray.len() * 3];
    for (i, &val) in gray.iter().enumerate() {
        rgb[i * 3] = val;
        rgb[i * 3 + 1] = val;
        rgb[i * 3 + 2] = val;
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_bgr_swaps_channels() {
        let frame = Frame::from_raw(&[1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Bgr8).unwrap();
        assert_eq!(frame.pixel(0, 0), [3, 2, 1]);
        assert_eq!(frame.pixel(1, 0), [6, 5, 4]);
    }

    #[test]
    fn test_from_raw_drops_alpha() {
        let frame = Frame::from_raw(&[10, 20, 30, 255, 40, 50, 60, 0], 1, 2, PixelFormat::Rgba8).unwrap();
        assert_eq!(frame.dimensions(), (1, 2));
        assert_eq!(frame.pixel(0, 1), [40, 50, 60]);

        let frame = Frame::from_raw(&[10, 20, 30, 255], 1, 1, PixelFormat::Bgra8).unwrap();
        assert_eq!(frame.pixel(0, 0), [30, 20, 10]);
    }

    #[test]
    fn test_from_raw_mono_replicates() {
        let frame = Frame::from_raw(&[7, 9], 2, 1, PixelFormat::Mono8).unwrap();
        assert_eq!(frame.data(), &[7, 7, 7, 9, 9, 9]);
    }

    #[test]
    fn test_from_raw_rejects_short_buffer() {
        let err = Frame::from_raw(&[0; 11], 2, 2, PixelFormat::Rgb8).unwrap_err();
        assert_eq!(
            err,
            OverlayError::FrameBuffer {
                width: 2,
                height: 2,
                bytes_per_pixel: 3,
                expected: 12,
                actual: 11,
            }
        );
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_overflowing_dimensions_rejected() {
        let err = Frame::from_raw(&[], usize::MAX, 2, PixelFormat::Rgb8).unwrap_err();
        assert!(matches!(err, OverlayError::FrameBuffer { expected: usize::MAX, .. }));
        assert!(Frame::from_raw(&[0; 16], usize::MAX / 4 + 1, 4, PixelFormat::Mono8).is_err());
        assert!(Frame::from_vec(vec![], usize::MAX / 3 + 1, 1).is_err());
        assert!(Frame::filled(usize::MAX, usize::MAX, [0, 0, 0]).is_err());
    }

    #[test]
    fn test_from_vec_checks_length() {
        let frame = Frame::from_vec(vec![1, 2, 3, 4, 5, 6], 2, 1).unwrap();
        assert_eq!(frame.pixel(1, 0), [4, 5, 6]);
        assert!(Frame::from_vec(vec![0; 5], 2, 1).unwrap_err().is_shape_error());
    }

    #[test]
    fn test_put_clips_outside() {
        let mut frame = Frame::filled(2, 2, [0, 0, 0]).unwrap();
        frame.put(-1, 0, [255, 0, 0]);
        frame.put(2, 1, [255, 0, 0]);
        frame.put(1, 1, [255, 0, 0]);
        assert_eq!(frame.data().iter().filter(|&&b| b == 255).count(), 1);
        assert_eq!(frame.pixel(1, 1), [255, 0, 0]);
    }

    #[test]
    fn test_image_round_trip() {
        let frame = Frame::filled(3, 2, [1, 2, 3]).unwrap();
        let img = frame.to_rgb_image().unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(Frame::from_rgb_image(img), frame);
    }
}
