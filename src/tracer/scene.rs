use anyhow::{ensure, Result};
use log::warn;
use nalgebra::{Point3, Vector3};

/// 0.04는 대부분의 비금속이 정면에서 반사하는 최소 비율
pub const MIN_REFLECTANCE: f32 = 0.04;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub albedo: Vector3<f32>,
    pub metallic: f32,
    pub roughness: f32,
    pub emission_color: Vector3<f32>,
    pub emission_power: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(0.8, 0.8, 0.8),
            metallic: 0.0,
            roughness: 0.5,
            emission_color: Vector3::zeros(),
            emission_power: 0.0,
        }
    }
}

impl Material {
    pub fn emission(&self) -> Vector3<f32> {
        self.emission_color * self.emission_power
    }

    /// Schlick 근사. cos_theta는 시선과 법선 사이 각의 코사인
    pub fn fresnel_schlick(&self, cos_theta: f32) -> Vector3<f32> {
        let reflectance = self.albedo * self.metallic
            + Vector3::repeat(MIN_REFLECTANCE) * (1.0 - self.metallic);
        let power = (1.0 - cos_theta).clamp(0.0, 1.0).powi(5);

        reflectance + (Vector3::repeat(1.0) - reflectance) * power
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub position: Point3<f32>,
    pub radius: f32,
    pub material_index: usize,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            radius: 0.5,
            material_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    // 언제나 정규화된 상태로 저장. 바꾸려면 set_direction 사용
    direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vector3::new(-1.0, -1.0, -1.0).normalize(),
            color: Vector3::new(1.0, 0.95, 0.9),
            intensity: 1.5,
        }
    }
}

impl DirectionalLight {
    pub fn new(direction: Vector3<f32>, color: Vector3<f32>, intensity: f32) -> Self {
        let mut light = Self {
            color,
            intensity: intensity.max(0.0),
            ..Default::default()
        };
        light.set_direction(direction);
        light
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// 길이가 0인 방향은 정규화할 수 없으니 무시하고 false를 돌려줌
    pub fn set_direction(&mut self, direction: Vector3<f32>) -> bool {
        match direction.try_normalize(1e-6) {
            Some(normalized) => {
                self.direction = normalized;
                true
            }
            None => {
                warn!("zero-length light direction ignored");
                false
            }
        }
    }
}

/// 지금은 저장만 하고 셰이딩에는 쓰지 않음
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Point3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
    pub range: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 5.0, 0.0),
            color: Vector3::repeat(1.0),
            intensity: 1.0,
            range: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub materials: Vec<Material>,
    pub spheres: Vec<Sphere>,
    pub directional_light: DirectionalLight,
    pub point_lights: Vec<PointLight>,
}

impl Scene {
    /// 바닥, 구리색 구, 파란 금속 구가 있는 기본 장면
    pub fn showcase() -> Self {
        let mut scene = Self::default();

        let ground = scene.add_material(Material {
            albedo: Vector3::new(0.2, 0.3, 0.1),
            roughness: 0.9,
            ..Default::default()
        });
        let copper = scene.add_material(Material {
            albedo: Vector3::new(0.8, 0.5, 0.2),
            metallic: 0.5,
            ..Default::default()
        });
        let blue = scene.add_material(Material {
            albedo: Vector3::new(0.2, 0.3, 0.8),
            metallic: 0.9,
            roughness: 0.2,
            ..Default::default()
        });

        scene.add_sphere(Sphere {
            position: Point3::new(0.0, -101.0, 0.0),
            radius: 100.0,
            material_index: ground,
        });
        scene.add_sphere(Sphere {
            position: Point3::origin(),
            radius: 1.0,
            material_index: copper,
        });
        scene.add_sphere(Sphere {
            position: Point3::new(1.7, 0.5, 0.0),
            radius: 0.7,
            material_index: blue,
        });

        scene
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// 범위 밖 번호는 호출하는 쪽 책임. 그대로 패닉함
    pub fn material(&self, index: usize) -> &Material {
        &self.materials[index]
    }

    pub fn material_mut(&mut self, index: usize) -> Option<&mut Material> {
        self.materials.get_mut(index)
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> usize {
        self.spheres.push(sphere);
        self.spheres.len() - 1
    }

    /// 뒤에 있던 구들은 번호가 하나씩 당겨짐
    pub fn remove_sphere(&mut self, index: usize) -> Option<Sphere> {
        if index >= self.spheres.len() {
            warn!("remove_sphere: index {index} out of range ({})", self.spheres.len());
            return None;
        }
        Some(self.spheres.remove(index))
    }

    pub fn add_point_light(&mut self, light: PointLight) -> usize {
        self.point_lights.push(light);
        self.point_lights.len() - 1
    }

    pub fn remove_point_light(&mut self, index: usize) -> Option<PointLight> {
        if index >= self.point_lights.len() {
            warn!(
                "remove_point_light: index {index} out of range ({})",
                self.point_lights.len()
            );
            return None;
        }
        Some(self.point_lights.remove(index))
    }

    /// 렌더링 전에 호출. 잘못된 재질 번호나 반지름이 있으면 실패
    pub fn validate(&self) -> Result<()> {
        for (index, sphere) in self.spheres.iter().enumerate() {
            ensure!(
                sphere.material_index < self.materials.len(),
                "sphere {index} uses material {} but only {} materials exist",
                sphere.material_index,
                self.materials.len()
            );
            ensure!(
                sphere.radius > 0.0,
                "sphere {index} has non-positive radius {}",
                sphere.radius
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresnel_at_normal_incidence() {
        let eps = 1e-5;
        let dielectric = Material {
            metallic: 0.0,
            ..Default::default()
        };
        let f = dielectric.fresnel_schlick(1.0);
        assert!((f.x - MIN_REFLECTANCE).abs() < eps);

        let metal = Material {
            albedo: Vector3::new(0.9, 0.6, 0.3),
            metallic: 1.0,
            ..Default::default()
        };
        let f = metal.fresnel_schlick(1.0);
        assert!((f - metal.albedo).magnitude() < eps);

        // 스치듯 보면 완전 반사
        let f = dielectric.fresnel_schlick(0.0);
        assert!((f - Vector3::repeat(1.0)).magnitude() < eps);
    }

    #[test]
    fn emission_is_color_times_power() {
        let material = Material {
            emission_color: Vector3::new(1.0, 0.5, 0.25),
            emission_power: 2.0,
            ..Default::default()
        };
        assert_eq!(material.emission(), Vector3::new(2.0, 1.0, 0.5));
    }

    #[test]
    fn light_direction_is_normalized() {
        let mut light = DirectionalLight::default();
        assert!(light.set_direction(Vector3::new(0.0, -3.0, 0.0)));
        assert_eq!(light.direction(), Vector3::new(0.0, -1.0, 0.0));

        assert!(!light.set_direction(Vector3::zeros()));
        assert_eq!(light.direction(), Vector3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn removing_point_light_shifts_the_rest() {
        let mut scene = Scene::showcase();
        let materials = scene.materials.clone();
        let spheres = scene.spheres.clone();

        for i in 0..3 {
            scene.add_point_light(PointLight {
                intensity: i as f32,
                ..Default::default()
            });
        }

        let removed = scene.remove_point_light(0).unwrap();
        assert_eq!(removed.intensity, 0.0);
        assert_eq!(scene.point_lights.len(), 2);
        assert_eq!(scene.point_lights[0].intensity, 1.0);
        assert_eq!(scene.point_lights[1].intensity, 2.0);
        assert_eq!(scene.materials, materials);
        assert_eq!(scene.spheres, spheres);

        assert!(scene.remove_point_light(2).is_none());
    }

    #[test]
    fn removing_sphere_shifts_the_rest() {
        let mut scene = Scene::showcase();
        let last = scene.spheres[2].clone();
        assert!(scene.remove_sphere(0).is_some());
        assert_eq!(scene.spheres[1], last);
        assert!(scene.remove_sphere(5).is_none());
    }

    #[test]
    fn validate_catches_bad_material() {
        let mut scene = Scene::showcase();
        assert!(scene.validate().is_ok());

        scene.add_sphere(Sphere {
            material_index: 42,
            ..Default::default()
        });
        assert!(scene.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_radius() {
        let mut scene = Scene::default();
        scene.add_material(Material::default());
        scene.add_sphere(Sphere {
            radius: 0.0,
            ..Default::default()
        });
        assert!(scene.validate().is_err());
    }
}
