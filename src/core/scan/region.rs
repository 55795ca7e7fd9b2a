use super::error::ConfigError;
use super::frame::Frame;
use super::geometry::Geometry;

/// Cropped pixel block, RGB, row-major.
#[derive(Debug, Clone)]
pub struct Region {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Region {
    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }
}

/// 区域裁剪器 - 几何范围在构造时校验一次，之后每帧直接裁剪
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    geometry: Geometry,
    frame_width: u32,
    frame_height: u32,
}

impl RegionExtractor {
    pub fn new(geometry: Geometry, frame_width: u32, frame_height: u32) -> Result<Self, ConfigError> {
        geometry.validate(frame_width, frame_height)?;
        Ok(Self {
            geometry,
            frame_width,
            frame_height,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Copies `[y, y+height) x [x, x+width)` out of the frame.
    ///
    /// The frame must have the dimensions the extractor was validated for;
    /// the scan loop checks this before calling.
    pub fn extract(&self, frame: &Frame) -> Region {
        debug_assert_eq!((frame.width, frame.height), (self.frame_width, self.frame_height));

        let g = &self.geometry;
        let stride = self.frame_width as usize * 3;
        let row_bytes = g.width as usize * 3;
        let x_offset = g.x as usize * 3;

        let mut data = Vec::with_capacity(row_bytes * g.height as usize);
        for row in g.y as usize..(g.y + g.height) as usize {
            let start = row * stride + x_offset;
            data.extend_from_slice(&frame.data[start..start + row_bytes]);
        }

        Region {
            width: g.width,
            height: g.height,
            data,
        }
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    pub fn matches_frame(&self, frame: &Frame) -> bool {
        frame.width == self.frame_width && frame.height == self.frame_height
    }
}
