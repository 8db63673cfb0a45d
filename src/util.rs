use std::time::{SystemTime, UNIX_EPOCH};

use nalgebra::Vector3;
use rand::{thread_rng, Rng};

// PCG 해시. 같은 입력이면 어느 플랫폼에서든 같은 비트가 나와야 함
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// 시드를 한 칸 전진시키고 [0, 1) 범위의 실수를 돌려줌
pub fn random_float(seed: &mut u32) -> f32 {
    *seed = pcg_hash(*seed);
    // f32로 u32::MAX를 정확히 표현할 수 없어서 f64로 나눈 뒤 내림.
    // 그냥 f32로 나누면 1.0이 나올 수 있음
    let value = (*seed as f64 / 4_294_967_296.0) as f32;
    value.min(1.0 - f32::EPSILON / 2.0)
}

pub fn random_vec(seed: &mut u32, min: f32, max: f32) -> Vector3<f32> {
    Vector3::new(
        random_float(seed) * (max - min) + min,
        random_float(seed) * (max - min) + min,
        random_float(seed) * (max - min) + min,
    )
}

/// 정육면체 안에서 뽑은 벡터를 정규화해서 단위 구 위의 방향으로 만듦.
/// 길이가 거의 0이면 정규화가 불가능하니 다시 뽑음
pub fn random_unit_vec(seed: &mut u32) -> Vector3<f32> {
    loop {
        let candidate = random_vec(seed, -1.0, 1.0);
        let length_squared = candidate.magnitude_squared();
        if length_squared > 1e-12 {
            return candidate / length_squared.sqrt();
        }
    }
}

/// 프레임마다 새 시드를 공급하는 쪽. 렌더러가 주입받아 사용함
pub trait SeedSource: Send {
    fn next_seed(&mut self) -> u32;
}

/// 언제나 같은 시드. 테스트나 재현 가능한 렌더링용
#[derive(Debug, Clone, Copy)]
pub struct FixedSeed(pub u32);

impl SeedSource for FixedSeed {
    fn next_seed(&mut self) -> u32 {
        self.0
    }
}

/// 시스템 시계의 나노초를 시드로 사용
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockSeed;

impl SeedSource for ClockSeed {
    fn next_seed(&mut self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u32)
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EntropySeed;

impl SeedSource for EntropySeed {
    fn next_seed(&mut self) -> u32 {
        thread_rng().gen()
    }
}

/// 픽셀 개수. u32끼리 곱하면 큰 화면에서 넘칠 수 있어서 usize로 바꾼 뒤 곱함
pub fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// 행 우선 배열에서 (x, y) 픽셀의 위치
pub fn pixel_index(x: u32, y: u32, width: u32) -> usize {
    x as usize + y as usize * width as usize
}

/// 프레임 시드와 픽셀 번호로 픽셀마다 독립적인 시드를 만듦
pub fn pixel_seed(frame_seed: u32, pixel_index: u32) -> u32 {
    pcg_hash(frame_seed ^ pcg_hash(pixel_index))
}

pub fn sample_seed(pixel_seed: u32, sample: u32) -> u32 {
    pcg_hash(pixel_seed.wrapping_add(sample.wrapping_mul(0x9E37_79B9)))
}
