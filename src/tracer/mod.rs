use std::time::{Duration, Instant};

use anyhow::{ensure, Result};
use log::{debug, trace};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::tracer::ray::{Intersector, LinearScan, Ray};
use crate::tracer::scene::Scene;
use crate::tracer::shading::{LightTransport, TransportSettings};
use crate::tracer::texture::{vec4_to_rgba, FrameBuffer};
use crate::util::{pixel_seed, SeedSource};

pub mod ray;
pub mod scene;
pub mod shading;
pub mod texture;

#[derive(Debug, Clone)]
pub struct Settings {
    pub samples_per_pixel: u32,
    pub transport: TransportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            samples_per_pixel: 2,
            transport: Default::default(),
        }
    }
}

impl Settings {
    // 0이면 평균을 낼 수 없으니 최소 1
    pub fn set_samples_per_pixel(&mut self, samples: u32) {
        self.samples_per_pixel = samples.max(1);
    }

    pub fn set_max_bounces(&mut self, bounces: u32) {
        self.transport.max_bounces = bounces.max(1);
    }
}

pub struct Renderer<I: Intersector = LinearScan> {
    pub settings: Settings,
    // 화면에 보여주는 쪽과 그리는 중인 쪽. 다 그리면 맞바꿈
    front: FrameBuffer,
    back: FrameBuffer,
    intersector: I,
    seeds: Box<dyn SeedSource>,
    frame_index: u64,
    last_render: Duration,
}

impl Renderer<LinearScan> {
    pub fn new(seeds: Box<dyn SeedSource>) -> Self {
        Self::with_intersector(LinearScan, seeds)
    }
}

impl<I: Intersector> Renderer<I> {
    pub fn with_intersector(intersector: I, seeds: Box<dyn SeedSource>) -> Self {
        Self {
            settings: Default::default(),
            front: FrameBuffer::default(),
            back: FrameBuffer::default(),
            intersector,
            seeds,
            frame_index: 0,
            last_render: Duration::ZERO,
        }
    }

    /// 크기가 바뀔 때만 버퍼를 다시 할당함
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.front.size() == (width, height) {
            return false;
        }

        debug!("renderer resize {:?} -> {width}x{height}", self.front.size());
        self.front.resize(width, height);
        self.back.resize(width, height);
        true
    }

    /// 가장 최근에 끝까지 그려진 이미지
    pub fn image(&self) -> &FrameBuffer {
        &self.front
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn last_render_time(&self) -> Duration {
        self.last_render
    }

    pub fn intersector(&self) -> &I {
        &self.intersector
    }

    /// 모든 픽셀을 그린 뒤에야 결과를 공개함. 실패하면 이전 이미지가 그대로 남음
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<&FrameBuffer> {
        // 잘못된 재질 번호는 픽셀을 그리다 터지기 전에 여기서 걸러냄
        scene.validate()?;

        let (width, height) = self.front.size();
        ensure!(
            camera.viewport_size() == (width, height),
            "camera viewport {:?} does not match renderer viewport {width}x{height}",
            camera.viewport_size()
        );

        // 창이 최소화되면 0x0이 될 수 있음
        if width == 0 || height == 0 {
            return Ok(&self.front);
        }

        let start = Instant::now();
        // 프레임마다 시드 하나. 픽셀과 샘플 시드는 여기서 파생됨
        let frame_seed = self.seeds.next_seed();
        let samples = self.settings.samples_per_pixel;
        let transport = LightTransport::new(scene, &self.intersector, &self.settings.transport);
        let origin = camera.position();
        let rays = camera.rays();

        // 행마다 따로 스레드에 나눠 줌. 픽셀끼리 서로 의존하지 않아서 순서는 상관없음
        self.back
            .pixels_mut()
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.iter_mut().enumerate() {
                    let index = x + y * width as usize;
                    let ray = Ray::new(origin, rays[index]);

                    // 픽셀 번호로 시드를 정해서 어느 스레드가 그려도 결과가 같음
                    let color = transport.trace_pixel(ray, samples, pixel_seed(frame_seed, index as u32));
                    // 알파는 항상 불투명
                    *pixel = vec4_to_rgba(&color.push(1.0));
                }
            });

        // 다 그린 뒤에만 바꿔서 반쯤 그려진 이미지가 보이지 않음
        std::mem::swap(&mut self.front, &mut self.back);
        self.frame_index += 1;
        self.last_render = start.elapsed();
        trace!("frame {} rendered in {:?}", self.frame_index, self.last_render);

        Ok(&self.front)
    }
}
