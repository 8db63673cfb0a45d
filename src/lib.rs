use std::path::PathBuf;

use anyhow::Result;
use eframe::egui;
use env_logger::Env;
use log::info;

use crate::app::Viewer;
use crate::camera::{Camera, CameraSettings};
use crate::tracer::scene::Scene;
use crate::tracer::texture::FrameBuffer;
use crate::tracer::{Renderer, Settings};
use crate::util::SeedSource;

pub mod app;
pub mod camera;
pub mod tracer;
pub mod util;

/// RUST_LOG가 없으면 info 수준으로. 여러 번 불려도 괜찮음
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();
}

/// 기본 장면을 한 장 그려서 돌려줌
pub fn render_showcase(
    width: u32,
    height: u32,
    settings: Settings,
    seeds: Box<dyn SeedSource>,
) -> Result<FrameBuffer> {
    let scene = Scene::showcase();

    let mut camera = Camera::new(CameraSettings::default());
    camera.resize(width, height);

    let mut renderer = Renderer::new(seeds);
    renderer.settings = settings;
    renderer.resize(width, height);
    renderer.render(&scene, &camera)?;

    info!(
        "rendered {width}x{height} ({} spp, {} bounces) in {:?}",
        renderer.settings.samples_per_pixel,
        renderer.settings.transport.max_bounces,
        renderer.last_render_time()
    );

    Ok(renderer.image().clone())
}

/// 뷰어 창을 띄우고 닫힐 때까지 돌아감
pub fn run(settings: Settings, seeds: Box<dyn SeedSource>, output_path: PathBuf) -> Result<()> {
    let options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(1280.0, 720.0)),
        ..Default::default()
    };

    info!("starting viewer");
    eframe::run_native(
        "Ember: Ray Tracer",
        options,
        Box::new(move |cc| Box::new(Viewer::new(cc, settings, seeds, output_path))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run viewer: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::FixedSeed;

    #[test]
    fn headless_showcase() {
        init_logging();
        let image = render_showcase(12, 8, Settings::default(), Box::new(FixedSeed(4))).unwrap();
        assert_eq!(image.size(), (12, 8));
        assert!(image.pixels().iter().all(|pixel| pixel[3] == 255));

        // 아래쪽 가운데는 초록 바닥
        let ground = image.pixel(6, 7);
        assert!(ground[1] > ground[2]);
    }
}
