use nalgebra::{Point3, Vector3};

use crate::tracer::scene::{Scene, Sphere};

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    // 단위 벡터가 아닐 수도 있음. 필요한 곳에서 정규화함
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }
}

/// 광선과 물체가 만난 결과. Cherno씨 설계처럼 색상은 나중에 따로 계산함
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    pub did_hit: bool,
    pub distance: f32,
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub material_index: usize,
}

impl Default for HitInfo {
    fn default() -> Self {
        Self {
            did_hit: false,
            distance: f32::INFINITY,
            position: Point3::origin(),
            normal: Vector3::zeros(),
            material_index: 0,
        }
    }
}

impl HitInfo {
    pub fn miss() -> Self {
        Self::default()
    }
}

// a = 빔 시작, b = 빔 방향, r = 구 반지름, t = 빔이 구와 만날 때의 길이
// (b·b) t^2 + 2 (a·b) t + (a·a - r^2) = 0
// 구가 원점에 있다고 가정한 식이라, 구 위치만큼 빔 시작점을 옮겨서 풂
pub fn intersect_sphere(ray: &Ray, sphere: &Sphere) -> HitInfo {
    let origin = ray.origin - sphere.position;

    let a = ray.direction.magnitude_squared();
    let b = 2.0 * origin.dot(&ray.direction);
    let c = origin.magnitude_squared() - sphere.radius * sphere.radius;

    // 판별식. 접하는 경우도 안 맞은 것으로 취급
    let discriminant = b * b - 4.0 * a * c;
    if discriminant <= 0.0 {
        return HitInfo::miss();
    }

    let distance = (-b - discriminant.sqrt()) / (2.0 * a);
    if distance < 0.0 {
        return HitInfo::miss();
    }

    let position = ray.at(distance);
    HitInfo {
        did_hit: true,
        distance,
        position,
        normal: (position - sphere.position).normalize(),
        material_index: sphere.material_index,
    }
}

/// 장면 전체에 대한 광선 질의. 나중에 BVH 같은 가속 구조로 바꿔 끼울 수 있도록 trait으로 둠
pub trait Intersector: Sync {
    fn intersect_closest(&self, ray: &Ray, scene: &Scene) -> HitInfo;

    /// 그림자 검사용. min_distance보다 먼 곳에서 아무거나 맞으면 true
    fn occluded(&self, ray: &Ray, scene: &Scene, min_distance: f32) -> bool;
}

/// 모든 구를 하나씩 검사함
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearScan;

impl Intersector for LinearScan {
    fn intersect_closest(&self, ray: &Ray, scene: &Scene) -> HitInfo {
        let mut closest = HitInfo::miss();
        for sphere in &scene.spheres {
            let hit = intersect_sphere(ray, sphere);
            if hit.did_hit && (!closest.did_hit || hit.distance <= closest.distance) {
                closest = hit;
            }
        }
        closest
    }

    fn occluded(&self, ray: &Ray, scene: &Scene, min_distance: f32) -> bool {
        scene.spheres.iter().any(|sphere| {
            let hit = intersect_sphere(ray, sphere);
            hit.did_hit && hit.distance > min_distance
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::scene::Material;

    fn unit_sphere_at(position: Point3<f32>, radius: f32) -> Sphere {
        Sphere {
            position,
            radius,
            material_index: 3,
        }
    }

    #[test]
    fn head_on_hit() {
        let eps = 1e-4;
        let center = Point3::new(1.0, 2.0, -3.0);
        let sphere = unit_sphere_at(center, 1.5);
        let origin = Point3::new(1.0, 2.0, 7.0);
        let ray = Ray::new(origin, center - origin);

        let hit = intersect_sphere(&ray, &sphere);
        assert!(hit.did_hit);
        assert_eq!(hit.material_index, 3);

        // 방향이 단위 벡터가 아니니 실제 거리는 t * |dir|
        let travelled = hit.distance * ray.direction.magnitude();
        assert!((travelled - ((origin - center).magnitude() - 1.5)).abs() < eps);

        let expected_normal = (hit.position - center).normalize();
        assert!((hit.normal - expected_normal).magnitude() < eps);
        assert!((hit.normal - Vector3::z()).magnitude() < eps);
    }

    #[test]
    fn unit_direction_distance() {
        let eps = 1e-4;
        let sphere = unit_sphere_at(Point3::origin(), 1.0);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        let hit = intersect_sphere(&ray, &sphere);
        assert!(hit.did_hit);
        assert!((hit.distance - 4.0).abs() < eps);
    }

    #[test]
    fn behind_origin_is_a_miss() {
        let sphere = unit_sphere_at(Point3::new(0.0, 0.0, 5.0), 1.0);
        let ray = Ray::new(Point3::origin(), -Vector3::z());
        assert!(!intersect_sphere(&ray, &sphere).did_hit);
    }

    #[test]
    fn tangent_is_a_miss() {
        let sphere = unit_sphere_at(Point3::origin(), 1.0);
        let ray = Ray::new(Point3::new(1.0, 0.0, 5.0), -Vector3::z());
        assert!(!intersect_sphere(&ray, &sphere).did_hit);
    }

    #[test]
    fn closest_of_many() {
        let mut scene = Scene::default();
        scene.add_material(Material::default());
        scene.add_material(Material::default());
        scene.add_sphere(Sphere {
            position: Point3::new(0.0, 0.0, -10.0),
            radius: 1.0,
            material_index: 0,
        });
        scene.add_sphere(Sphere {
            position: Point3::new(0.0, 0.0, -4.0),
            radius: 1.0,
            material_index: 1,
        });

        let ray = Ray::new(Point3::origin(), -Vector3::z());
        let hit = LinearScan.intersect_closest(&ray, &scene);
        assert!(hit.did_hit);
        assert_eq!(hit.material_index, 1);
        assert!((hit.distance - 3.0).abs() < 1e-4);
    }

    #[test]
    fn miss_everything() {
        let scene = Scene::showcase();
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::y());
        let hit = LinearScan.intersect_closest(&ray, &scene);
        assert!(!hit.did_hit);
        assert_eq!(hit.distance, f32::INFINITY);
    }

    #[test]
    fn occlusion() {
        let scene = Scene::showcase();
        let below = Ray::new(Point3::new(0.0, 3.0, 0.0), -Vector3::y());
        assert!(LinearScan.occluded(&below, &scene, 0.001));

        let above = Ray::new(Point3::new(0.0, 3.0, 0.0), Vector3::y());
        assert!(!LinearScan.occluded(&above, &scene, 0.001));
    }
}
