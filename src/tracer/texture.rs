use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use image::ColorType;
use nalgebra::Vector4;

use crate::util::{pixel_count, pixel_index};

/// [0, 1] 범위의 색을 8비트 RGBA로. 범위를 벗어난 값은 잘라냄
pub fn vec4_to_rgba(color: &Vector4<f32>) -> [u8; 4] {
    let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
    [
        quantize(color.x),
        quantize(color.y),
        quantize(color.z),
        quantize(color.w),
    ]
}

/// 렌더링 결과 이미지. 행 우선, 0번 행이 맨 위
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0, 0xFF]; pixel_count(width, height)],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [[u8; 4]] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[pixel_index(x, y, self.width)]
    }

    /// width * height * 4 바이트
    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.pixels)
    }

    /// 크기가 바뀔 때만 새로 할당함
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }

        *self = Self::new(width, height);
        true
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        image::save_buffer(path, self.as_bytes(), self.width, self.height, ColorType::Rgba8)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}
