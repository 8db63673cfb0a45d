use log::{debug, warn};
use nalgebra::{Isometry3, Perspective3, Point3, Unit, UnitQuaternion, Vector2, Vector3};
use rayon::prelude::*;

use crate::util::{pixel_count, pixel_index};

// forward의 y 성분이 이보다 커지면 up과 거의 평행해져서 right 벡터가 망가짐
const MAX_VERTICAL: f32 = 0.999;

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub vertical_fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub movement_speed: f32,
    pub rotation_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            vertical_fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            movement_speed: 2.0,
            rotation_speed: 0.8,
            mouse_sensitivity: 0.002,
        }
    }
}

/// 이번 프레임에 눌려 있는 이동 키들. 입력을 읽는 건 호스트 쪽 일
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

pub struct Camera {
    projection: Perspective3<f32>,
    view: Isometry3<f32>,

    settings: CameraSettings,

    position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    // 픽셀마다 하나. x + y * width 순서, y = 0이 화면 맨 위
    rays: Vec<Vector3<f32>>,
    generation: u64,

    viewport_width: u32,
    viewport_height: u32,
}

impl Camera {
    pub fn new(settings: CameraSettings) -> Self {
        // 원점에서 5만큼 뒤에서 -z 방향을 바라봄
        let position = Point3::new(0.0, 0.0, 5.0);
        let forward = Unit::new_unchecked(-Vector3::z());
        // 화면 크기를 아직 모르니 비율은 1로 두고 resize 때 다시 만듦
        let projection = Perspective3::new(
            1.0,
            settings.vertical_fov_degrees.to_radians(),
            settings.near,
            settings.far,
        );
        let view = Isometry3::look_at_rh(&position, &(position + forward.into_inner()), &Vector3::y());

        Self {
            projection,
            view,
            settings,
            position,
            forward,
            rays: vec![],
            generation: 0,
            viewport_width: 0,
            viewport_height: 0,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward.into_inner()
    }

    pub fn right(&self) -> Vector3<f32> {
        // forward가 up과 평행하지 않다는 걸 update_pose가 보장함
        self.forward.cross(&Vector3::y()).normalize()
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn rays(&self) -> &[Vector3<f32>] {
        &self.rays
    }

    pub fn ray_direction(&self, x: u32, y: u32) -> Vector3<f32> {
        self.rays[pixel_index(x, y, self.viewport_width)]
    }

    /// 광선 표를 다시 계산할 때마다 1씩 늘어남
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 크기가 같으면 아무것도 안 함. 다시 계산했으면 true
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == self.viewport_width && height == self.viewport_height {
            return false;
        }

        debug!("camera resize {}x{} -> {width}x{height}", self.viewport_width, self.viewport_height);
        self.viewport_width = width;
        self.viewport_height = height;

        // 비율이 바뀌니 투영부터 다시 만들고 광선 표는 그 다음에
        self.reevaluate_projection();
        self.reevaluate_rays();
        true
    }

    /// 위치와 바라보는 방향을 직접 지정. up과 거의 평행한 방향은 거부함
    pub fn set_pose(&mut self, position: Point3<f32>, forward: Vector3<f32>) -> bool {
        let Some(forward) = forward.try_normalize(1e-6) else {
            warn!("zero-length camera forward ignored");
            return false;
        };
        if forward.y.abs() > MAX_VERTICAL {
            warn!("camera forward {forward:?} is parallel to world up, ignored");
            return false;
        }

        self.position = position;
        self.forward = Unit::new_unchecked(forward);
        self.reevaluate_view();
        self.reevaluate_rays();
        true
    }

    /// translation은 월드 좌표 이동량, rotation은 (yaw, pitch) 라디안.
    /// yaw가 양수면 오른쪽, pitch가 양수면 아래를 보게 됨 (마우스 움직임과 같은 방향)
    pub fn update_pose(&mut self, translation: Vector3<f32>, rotation: Vector2<f32>) -> bool {
        let translated = translation != Vector3::zeros();
        let rotated = rotation != Vector2::zeros();
        if !translated && !rotated {
            return false;
        }

        self.position += translation;

        // 이동만 했으면 방향은 그대로
        if rotated {
            let up = Vector3::y_axis();
            let right = Unit::new_normalize(self.right());

            // 올려다보는 각도를 직접 제한해서 up과 평행해지거나 뒤로 넘어가지 않게 함
            let limit = MAX_VERTICAL.asin();
            let elevation = self.forward.y.clamp(-1.0, 1.0).asin();
            let target = (elevation - rotation.y).clamp(-limit, limit);

            // pitch는 카메라 오른쪽 축, yaw는 월드 up 축으로 돌림
            let pitch = UnitQuaternion::from_axis_angle(&right, target - elevation);
            let yaw = UnitQuaternion::from_axis_angle(&up, -rotation.x);

            // pitch를 먼저 적용해야 yaw 뒤에도 올려다본 각도가 유지됨
            let mut forward = (yaw * pitch) * self.forward;
            // 회전을 쌓다 보면 길이가 조금씩 어긋나서 다시 맞춤
            forward.renormalize_fast();
            self.forward = forward;
        }

        self.reevaluate_view();
        self.reevaluate_rays();
        true
    }

    /// 호스트가 모아 준 입력을 적용함. 움직였으면 true
    pub fn apply_input(&mut self, movement: Movement, mouse_delta: Vector2<f32>, elapsed_seconds: f32) -> bool {
        let up = Vector3::y();
        let right = self.right();
        let forward = self.forward();
        // 프레임 시간에 비례해서 움직여야 프레임레이트와 상관없이 속도가 같음
        let step = self.settings.movement_speed * elapsed_seconds;

        let mut translation = Vector3::zeros();
        if movement.forward {
            translation += forward * step;
        }
        if movement.backward {
            translation -= forward * step;
        }
        if movement.left {
            translation -= right * step;
        }
        if movement.right {
            translation += right * step;
        }
        if movement.up {
            translation += up * step;
        }
        if movement.down {
            translation -= up * step;
        }

        // 마우스 이동량(픽셀)을 라디안으로
        let rotation = mouse_delta * (self.settings.mouse_sensitivity * self.settings.rotation_speed);

        self.update_pose(translation, rotation)
    }

    fn reevaluate_projection(&mut self) {
        // 0으로 나누면 비율이 NaN이 됨
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return;
        }

        let aspect = self.viewport_width as f32 / self.viewport_height as f32;
        self.projection = Perspective3::new(
            aspect,
            self.settings.vertical_fov_degrees.to_radians(),
            self.settings.near,
            self.settings.far,
        );
    }

    fn reevaluate_view(&mut self) {
        let target = self.position + self.forward.into_inner();
        // 오른손 좌표계, 카메라는 -z를 바라봄
        self.view = Isometry3::look_at_rh(&self.position, &target, &Vector3::y());
    }

    fn reevaluate_rays(&mut self) {
        let width = self.viewport_width;
        let height = self.viewport_height;
        let projection = &self.projection;
        let view = &self.view;

        // 새 표를 다 채운 뒤에 바꿔 끼움
        let mut rays = vec![Vector3::zeros(); pixel_count(width, height)];
        rays.par_iter_mut()
            .enumerate()
            .for_each(|(index, ray_direction)| {
                let x = (index % width as usize) as u32;
                let y = (index / width as usize) as u32;

                // 픽셀 중심을 [-1, 1]로. 화면 y는 아래로 커지니 뒤집음
                let coord = Vector2::new(
                    (x as f32 + 0.5) / width as f32 * 2.0 - 1.0,
                    1.0 - (y as f32 + 0.5) / height as f32 * 2.0,
                );

                // 먼 평면 위의 점을 카메라 공간으로 되돌림
                let target = projection.unproject_point(&Point3::new(coord.x, coord.y, 1.0));
                let direction = target.coords.normalize();

                // 방향 벡터라 위치 이동은 무시하고 회전만 되돌림
                *ray_direction = view.inverse_transform_vector(&direction).normalize();
            });

        self.rays = rays;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_with_viewport(width: u32, height: u32) -> Camera {
        let mut camera = Camera::new(CameraSettings::default());
        camera.resize(width, height);
        camera
    }

    #[test]
    fn center_pixel_looks_forward() {
        let eps = 1e-5;
        let camera = camera_with_viewport(9, 9);
        let direction = camera.ray_direction(4, 4);
        assert!((direction - Vector3::new(0.0, 0.0, -1.0)).magnitude() < eps);
    }

    #[test]
    fn rays_are_unit_and_row_major() {
        let camera = camera_with_viewport(16, 8);
        assert_eq!(camera.rays().len(), 16 * 8);
        assert!(camera
            .rays()
            .iter()
            .all(|ray| (ray.magnitude() - 1.0).abs() < 1e-4));

        // 왼쪽 위 픽셀은 왼쪽 위를 향함
        let top_left = camera.ray_direction(0, 0);
        assert!(top_left.x < 0.0 && top_left.y > 0.0);
        let bottom_right = camera.ray_direction(15, 7);
        assert!(bottom_right.x > 0.0 && bottom_right.y < 0.0);
    }

    #[test]
    fn field_of_view() {
        let mut camera = Camera::new(CameraSettings {
            vertical_fov_degrees: 90.0,
            ..Default::default()
        });
        camera.resize(1, 2);

        // 위쪽 픽셀 중심은 ndc y = 0.5, tan(45°) = 1
        let up = camera.ray_direction(0, 0);
        assert!((up.y / -up.z - 0.5).abs() < 1e-4);
        assert!(up.x.abs() < 1e-5);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut camera = camera_with_viewport(32, 16);
        let generation = camera.generation();
        let table = camera.rays().as_ptr();

        assert!(!camera.resize(32, 16));
        assert_eq!(camera.generation(), generation);
        assert_eq!(camera.rays().as_ptr(), table);

        assert!(camera.resize(16, 16));
        assert_eq!(camera.generation(), generation + 1);
        assert_eq!(camera.rays().len(), 256);
    }

    #[test]
    fn empty_viewport() {
        let mut camera = camera_with_viewport(4, 4);
        assert!(camera.resize(0, 4));
        assert!(camera.rays().is_empty());
    }

    #[test]
    fn no_input_no_recompute() {
        let mut camera = camera_with_viewport(8, 8);
        let generation = camera.generation();
        assert!(!camera.apply_input(Movement::default(), Vector2::zeros(), 0.016));
        assert_eq!(camera.generation(), generation);
    }

    #[test]
    fn moving_forward() {
        let eps = 1e-5;
        let mut camera = camera_with_viewport(8, 8);
        let generation = camera.generation();

        let movement = Movement {
            forward: true,
            ..Default::default()
        };
        assert!(camera.apply_input(movement, Vector2::zeros(), 0.5));

        // 속도 2 * 0.5초 = 1
        assert!((camera.position() - Point3::new(0.0, 0.0, 4.0)).magnitude() < eps);
        assert_eq!(camera.generation(), generation + 1);

        let movement = Movement {
            right: true,
            up: true,
            ..Default::default()
        };
        camera.apply_input(movement, Vector2::zeros(), 0.5);
        assert!((camera.position() - Point3::new(1.0, 1.0, 4.0)).magnitude() < eps);
    }

    #[test]
    fn mouse_turns_the_camera() {
        let mut camera = camera_with_viewport(8, 8);
        camera.apply_input(Movement::default(), Vector2::new(100.0, 0.0), 0.016);
        assert!(camera.forward().x > 0.0);
        assert!(camera.forward().y.abs() < 1e-5);

        let mut camera = camera_with_viewport(8, 8);
        camera.apply_input(Movement::default(), Vector2::new(0.0, 100.0), 0.016);
        assert!(camera.forward().y < 0.0);
    }

    #[test]
    fn pitch_is_clamped_near_up() {
        let mut camera = camera_with_viewport(8, 8);
        for _ in 0..50 {
            camera.update_pose(Vector3::zeros(), Vector2::new(0.01, -0.3));
            assert!(camera.forward().y.abs() <= MAX_VERTICAL + 1e-4);
            assert!(camera.right().iter().all(|c| c.is_finite()));
            assert!((camera.forward().magnitude() - 1.0).abs() < 1e-3);
        }
        assert!(camera.forward().y > 0.9);
    }

    #[test]
    fn set_pose_rejects_degenerate_forward() {
        let mut camera = camera_with_viewport(4, 4);
        assert!(!camera.set_pose(Point3::origin(), Vector3::zeros()));
        assert!(!camera.set_pose(Point3::origin(), Vector3::y()));
        assert!(camera.set_pose(Point3::new(0.0, 1.0, 0.0), Vector3::new(1.0, 0.0, 0.0)));
        assert!((camera.ray_direction(2, 2) - Vector3::x()).magnitude() < 0.3);
    }
}
