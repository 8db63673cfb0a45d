use nalgebra::{Reflection3, Unit, Vector3};

use crate::tracer::ray::{HitInfo, Intersector, Ray};
use crate::tracer::scene::Scene;
use crate::util::{random_unit_vec, sample_seed};

/// 방향만 보고 색을 정하는 하늘
#[derive(Debug, Clone, PartialEq)]
pub struct Sky {
    pub horizon: Vector3<f32>,
    pub zenith: Vector3<f32>,
    pub glow: Vector3<f32>,
    pub glow_strength: f32,
    // 지평선에서 이 높이(y)까지 천천히 천정 색으로 바뀜
    pub gradient_end: f32,
    // 1.0을 넘어도 됨. 최종 누적 단계에서 잘라냄
    pub max_radiance: f32,
}

impl Default for Sky {
    fn default() -> Self {
        Self {
            horizon: Vector3::new(0.3, 0.6, 1.0),
            zenith: Vector3::new(0.05, 0.1, 0.3),
            glow: Vector3::new(1.0, 0.7, 0.4),
            glow_strength: 0.25,
            gradient_end: 0.4,
            max_radiance: 10.0,
        }
    }
}

impl Sky {
    pub fn black() -> Self {
        Self {
            horizon: Vector3::zeros(),
            zenith: Vector3::zeros(),
            glow: Vector3::zeros(),
            ..Default::default()
        }
    }

    pub fn radiance(&self, direction: &Vector3<f32>) -> Vector3<f32> {
        // 길이 0인 방향은 지평선으로 취급
        let y = direction.try_normalize(1e-12).map_or(0.0, |dir| dir.y);

        let t = smoothstep(0.0, self.gradient_end, y);
        let horizon_intensity = 1.0 - y.abs();

        let gradient = self.horizon.lerp(&self.zenith, t);
        let glow = self.glow * (horizon_intensity * horizon_intensity * self.glow_strength);

        (gradient + glow).map(|c| c.clamp(0.0, self.max_radiance))
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    // 폭이 0이면 0/0이 되므로 계단 함수로 대신함
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub max_bounces: u32,
    pub diffuse_only: bool,
    // 그림자 안에서도 빛이 완전히 사라지지는 않음
    pub shadow_visibility: f32,
    // 자기 자신과 다시 부딪히지 않도록 법선 방향으로 살짝 띄움
    pub surface_epsilon: f32,
    pub sky: Sky,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_bounces: 2,
            diffuse_only: false,
            shadow_visibility: 0.3,
            surface_epsilon: 0.001,
            sky: Sky::default(),
        }
    }
}

/// 한 프레임 동안 장면을 빌려서 빛의 경로를 계산함
pub struct LightTransport<'a, I: Intersector> {
    scene: &'a Scene,
    intersector: &'a I,
    settings: &'a TransportSettings,
}

impl<'a, I: Intersector> LightTransport<'a, I> {
    pub fn new(scene: &'a Scene, intersector: &'a I, settings: &'a TransportSettings) -> Self {
        Self {
            scene,
            intersector,
            settings,
        }
    }

    pub fn sky(&self, ray: &Ray) -> Vector3<f32> {
        self.settings.sky.radiance(&ray.direction)
    }

    /// 방향광에 의한 직접광. 그림자는 일부만 가림
    pub fn direct_light(&self, hit: &HitInfo, ray: &Ray) -> Vector3<f32> {
        let material = self.scene.material(hit.material_index);
        let light = &self.scene.directional_light;
        let light_direction = light.direction();
        let epsilon = self.settings.surface_epsilon;

        let shadow_ray = Ray::new(hit.position + hit.normal * epsilon, -light_direction);
        let visibility = if self.intersector.occluded(&shadow_ray, self.scene, epsilon) {
            self.settings.shadow_visibility
        } else {
            1.0
        };

        let n_dot_l = hit.normal.dot(&-light_direction).max(0.0);
        let diffuse =
            material.albedo.component_mul(&light.color) * (n_dot_l * light.intensity * visibility);

        if self.settings.diffuse_only {
            return diffuse;
        }

        // Blinn-Phong 반벡터
        let view_direction = (ray.origin - hit.position)
            .try_normalize(1e-12)
            .unwrap_or(hit.normal);
        let half = (view_direction - light_direction)
            .try_normalize(1e-12)
            .unwrap_or(hit.normal);

        let roughness = material.roughness.max(0.01);
        let n_dot_h = hit.normal.dot(&half).max(0.0);
        let specular = n_dot_h.powf(1.0 / roughness) * light.intensity;

        let specular_color = if material.metallic > 0.5 {
            material.albedo
        } else {
            Vector3::repeat(0.8)
        };

        diffuse + specular_color * (specular * visibility)
    }

    /// 경로 하나를 끝까지 추적함.
    /// 재귀 대신 반복문으로 풀었고, 재귀식
    /// color = emission + albedo * (direct * kd + indirect * ks)
    /// 에서 indirect 앞에 곱해지는 값을 throughput에 누적함
    pub fn trace_path(&self, mut ray: Ray, seed: &mut u32) -> Vector3<f32> {
        let epsilon = self.settings.surface_epsilon;
        let mut color: Vector3<f32> = Vector3::zeros();
        let mut throughput: Vector3<f32> = Vector3::repeat(1.0);

        for _ in 0..self.settings.max_bounces {
            let hit = self.intersector.intersect_closest(&ray, self.scene);
            if !hit.did_hit {
                return color + throughput.component_mul(&self.sky(&ray));
            }

            let material = self.scene.material(hit.material_index);
            let direct = self.direct_light(&hit, &ray);

            let mut bounce_direction = ray.direction;
            Reflection3::new(Unit::new_unchecked(hit.normal), 0.0).reflect(&mut bounce_direction);
            bounce_direction = bounce_direction.try_normalize(1e-12).unwrap_or(hit.normal);

            if material.roughness > 0.0 {
                let mut scatter = random_unit_vec(seed);
                if scatter.dot(&hit.normal) < 0.0 {
                    scatter = -scatter;
                }
                bounce_direction = bounce_direction
                    .lerp(&scatter, material.roughness)
                    .try_normalize(1e-12)
                    .unwrap_or(hit.normal);
            }

            let cos_theta = (-ray.direction)
                .try_normalize(1e-12)
                .map_or(0.0, |incoming| incoming.dot(&hit.normal));
            let fresnel = material.fresnel_schlick(cos_theta);

            let diffuse_factor = (1.0 - material.metallic) * (1.0 - fresnel.x);
            let specular_factor = material.metallic + (1.0 - material.metallic) * fresnel.x;

            let surface = material.emission() + material.albedo.component_mul(&direct) * diffuse_factor;
            color += throughput.component_mul(&surface);
            throughput = throughput.component_mul(&material.albedo) * specular_factor;

            ray = Ray::new(hit.position + hit.normal * epsilon, bounce_direction);
        }

        // 최대 깊이에 도달하면 하늘 색으로 끝냄
        color + throughput.component_mul(&self.sky(&ray))
    }

    /// 경로를 samples번 추적해서 평균을 내고 [0, 1]로 자름
    pub fn trace_pixel(&self, ray: Ray, samples: u32, pixel_seed: u32) -> Vector3<f32> {
        let samples = samples.max(1);
        let total = (0..samples).fold(Vector3::<f32>::zeros(), |acc, sample| {
            let mut seed = sample_seed(pixel_seed, sample);
            acc + self.trace_path(ray, &mut seed)
        });

        (total / samples as f32).map(|c| c.clamp(0.0, 1.0))
    }
}
