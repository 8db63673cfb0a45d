use std::path::PathBuf;

use eframe::egui::{
    self, CentralPanel, ColorImage, ComboBox, DragValue, Key, ScrollArea, SidePanel, Slider, TextureHandle,
    TextureOptions, TopBottomPanel,
};
use log::{error, info};
use nalgebra::{Point3, Vector2, Vector3};

use crate::camera::{Camera, CameraSettings, Movement};
use crate::tracer::scene::{Material, PointLight, Scene, Sphere};
use crate::tracer::{Renderer, Settings};
use crate::util::SeedSource;

/// 장면 편집 패널과 뷰포트가 있는 창. 장면은 여기서 소유하고 프레임 사이에만 고침
pub struct Viewer {
    scene: Scene,
    camera: Camera,
    renderer: Renderer,
    texture: Option<TextureHandle>,

    is_rendering: bool,
    render_requested: bool,
    viewport_size: (u32, u32),
    output_path: PathBuf,
}

impl Viewer {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: Settings,
        seeds: Box<dyn SeedSource>,
        output_path: PathBuf,
    ) -> Self {
        let mut renderer = Renderer::new(seeds);
        renderer.settings = settings;

        Self {
            scene: Scene::showcase(),
            camera: Camera::new(CameraSettings::default()),
            renderer,
            texture: None,
            is_rendering: false,
            render_requested: true,
            viewport_size: (0, 0),
            output_path,
        }
    }

    fn render(&mut self, ctx: &egui::Context) {
        let (width, height) = self.viewport_size;
        self.camera.resize(width, height);
        self.renderer.resize(width, height);

        let image = match self.renderer.render(&self.scene, &self.camera) {
            Ok(image) if !image.pixels().is_empty() => ColorImage::from_rgba_unmultiplied(
                [image.width() as usize, image.height() as usize],
                image.as_bytes(),
            ),
            Ok(_) => return,
            Err(err) => {
                error!("frame abandoned: {err:#}");
                return;
            }
        };

        if let Some(texture) = &mut self.texture {
            texture.set(image, TextureOptions::NEAREST);
        } else {
            self.texture = Some(ctx.load_texture("ember-output", image, TextureOptions::NEAREST));
        }
    }

    fn save_image(&self) {
        match self.renderer.image().save_png(&self.output_path) {
            Ok(()) => info!("saved {}", self.output_path.display()),
            Err(err) => error!("{err:#}"),
        }
    }

    // 오른쪽 버튼을 누르고 있을 때만 카메라가 움직임
    fn handle_camera_input(&mut self, ctx: &egui::Context) -> bool {
        let (active, movement, delta, elapsed) = ctx.input(|i| {
            let movement = Movement {
                forward: i.key_down(Key::W),
                backward: i.key_down(Key::S),
                left: i.key_down(Key::A),
                right: i.key_down(Key::D),
                up: i.key_down(Key::E),
                down: i.key_down(Key::Q),
            };
            (i.pointer.secondary_down(), movement, i.pointer.delta(), i.stable_dt)
        });

        if !active {
            return false;
        }

        self.camera.apply_input(movement, Vector2::new(delta.x, delta.y), elapsed)
    }

    fn settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");

        let mut samples = self.renderer.settings.samples_per_pixel;
        ui.horizontal(|ui| {
            ui.label("Rays Count");
            ui.add(DragValue::new(&mut samples).clamp_range(1..=50));
        });
        self.renderer.settings.set_samples_per_pixel(samples);

        let mut bounces = self.renderer.settings.transport.max_bounces;
        ui.horizontal(|ui| {
            ui.label("Max Bounce Count");
            ui.add(DragValue::new(&mut bounces).clamp_range(1..=5));
        });
        self.renderer.settings.set_max_bounces(bounces);

        ui.label(format!(
            "Last render: {:.3}ms",
            self.renderer.last_render_time().as_secs_f32() * 1000.0
        ));

        if ui.button("Render").clicked() {
            self.render_requested = true;
        }
        ui.checkbox(&mut self.is_rendering, "Is Rendering");
        ui.checkbox(&mut self.renderer.settings.transport.diffuse_only, "Just Diffuse");

        if ui.button("Save PNG").clicked() {
            self.save_image();
        }
    }

    fn scene_panel(&mut self, ui: &mut egui::Ui) {
        let scene = &mut self.scene;
        let material_count = scene.materials.len();

        ui.heading("Spheres");
        let mut removed_sphere = None;
        for (index, sphere) in scene.spheres.iter_mut().enumerate() {
            ui.push_id(("sphere", index), |ui| {
                ui.label(format!("Sphere {index}"));
                point_edit(ui, "Position", &mut sphere.position, 0.01);
                ui.horizontal(|ui| {
                    ui.label("Radius");
                    ui.add(DragValue::new(&mut sphere.radius).speed(0.01).clamp_range(0.01..=f32::MAX));
                });

                ComboBox::from_label("Material")
                    .selected_text(format!("Material {}", sphere.material_index))
                    .show_ui(ui, |ui| {
                        for material in 0..material_count {
                            ui.selectable_value(&mut sphere.material_index, material, format!("Material {material}"));
                        }
                    });

                if ui.button("Remove").clicked() {
                    removed_sphere = Some(index);
                }
                ui.separator();
            });
        }
        if let Some(index) = removed_sphere {
            scene.remove_sphere(index);
        }
        if material_count > 0 && ui.button("Add Sphere").clicked() {
            scene.add_sphere(Sphere::default());
        }

        ui.separator();
        ui.heading("Materials");
        for (index, material) in scene.materials.iter_mut().enumerate() {
            ui.push_id(("material", index), |ui| {
                ui.label(format!("Material {index}"));
                color_edit(ui, "Albedo", &mut material.albedo);
                ui.add(Slider::new(&mut material.metallic, 0.0..=1.0).text("Metallic"));
                ui.add(Slider::new(&mut material.roughness, 0.0..=1.0).text("Roughness"));
                color_edit(ui, "Emission Color", &mut material.emission_color);
                ui.horizontal(|ui| {
                    ui.label("Emission Power");
                    ui.add(DragValue::new(&mut material.emission_power).speed(0.01).clamp_range(0.0..=f32::MAX));
                });
                ui.separator();
            });
        }
        if ui.button("Add Material").clicked() {
            scene.add_material(Material::default());
        }

        ui.separator();
        ui.heading("Directional Light");
        let light = &mut scene.directional_light;
        let mut direction = light.direction();
        let changed = ui
            .horizontal(|ui| {
                ui.label("Direction");
                let mut changed = false;
                for component in direction.iter_mut() {
                    changed |= ui
                        .add(DragValue::new(component).speed(0.01).clamp_range(-1.0..=1.0))
                        .changed();
                }
                changed
            })
            .inner;
        if changed {
            light.set_direction(direction);
        }
        color_edit(ui, "Color", &mut light.color);
        ui.add(Slider::new(&mut light.intensity, 0.0..=10.0).text("Intensity"));

        ui.separator();
        ui.heading("Point Lights");
        let mut removed_light = None;
        for (index, light) in scene.point_lights.iter_mut().enumerate() {
            ui.push_id(("point light", index), |ui| {
                ui.label(format!("Point Light {index}"));
                point_edit(ui, "Position", &mut light.position, 0.1);
                color_edit(ui, "Color", &mut light.color);
                ui.add(Slider::new(&mut light.intensity, 0.0..=100.0).text("Intensity"));
                ui.add(Slider::new(&mut light.range, 0.1..=50.0).text("Range"));
                if ui.button("Remove").clicked() {
                    removed_light = Some(index);
                }
                ui.separator();
            });
        }
        if let Some(index) = removed_light {
            scene.remove_point_light(index);
        }
        if ui.button("Add Point Light").clicked() {
            scene.add_point_light(PointLight {
                position: Point3::new(0.0, 3.0, 0.0),
                intensity: 5.0,
                ..Default::default()
            });
        }
    }
}

fn physical_size(points: egui::Vec2, pixels_per_point: f32) -> (u32, u32) {
    let pixels = points * pixels_per_point;
    (pixels.x.round().max(0.0) as u32, pixels.y.round().max(0.0) as u32)
}

fn point_edit(ui: &mut egui::Ui, label: &str, point: &mut Point3<f32>, speed: f64) {
    ui.horizontal(|ui| {
        ui.label(label);
        for component in point.coords.iter_mut() {
            ui.add(DragValue::new(component).speed(speed));
        }
    });
}

fn color_edit(ui: &mut egui::Ui, label: &str, color: &mut Vector3<f32>) {
    ui.horizontal(|ui| {
        ui.label(label);
        // Vector3 내부 저장소가 [[f32; 3]; 1]이라 그대로 넘길 수 있음
        ui.color_edit_button_rgb(&mut color.data.0[0]);
    });
}

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        TopBottomPanel::top("Menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Save PNG").clicked() {
                        self.save_image();
                        ui.close_menu();
                    }
                    if ui.button("Exit").clicked() {
                        frame.close();
                    }
                });
            });
        });

        SidePanel::right("Side Menu")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                ScrollArea::vertical().show(ui, |ui| {
                    self.settings_panel(ui);
                    ui.separator();
                    self.scene_panel(ui);
                });
            });

        CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                // 렌더러는 실제 화면 픽셀 크기로 그리고, 표시는 논리 좌표(points) 크기로
                let available = ui.available_size();
                self.viewport_size = physical_size(available, ctx.pixels_per_point());

                let moved = self.handle_camera_input(ctx);
                if self.is_rendering || self.render_requested || moved {
                    self.render(ctx);
                    self.render_requested = false;
                }

                if let Some(texture) = &self.texture {
                    ui.image(texture.id(), available);
                }
            });

        if self.is_rendering {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_is_sized_in_physical_pixels() {
        assert_eq!(physical_size(egui::vec2(640.0, 360.0), 1.0), (640, 360));
        assert_eq!(physical_size(egui::vec2(640.0, 360.0), 2.0), (1280, 720));
        assert_eq!(physical_size(egui::vec2(100.5, 10.0), 1.5), (151, 15));
        assert_eq!(physical_size(egui::vec2(-3.0, 0.0), 2.0), (0, 0));
    }
}
