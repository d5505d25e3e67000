// random.rs — 可注入的随机源
// 页码与条目的随机选择都通过 RandomSource 完成，测试可以传入确定性的序列

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// 随机源抽象
pub trait RandomSource: Send + Sync {
    /// 返回 `[0, upper)` 内均匀分布的整数，`upper` 必须大于 0
    fn below(&self, upper: usize) -> usize;
}

/// 使用线程本地 RNG，生产环境默认的随机源
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// 固定种子的随机源，`--seed` 参数与测试使用
///
/// 多个并发采集共享同一个实例时通过 Mutex 串行取数。
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn below(&self, upper: usize) -> usize {
        // 锁中毒只说明另一个线程在取数时 panic，RNG 本身的状态仍然可用
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..upper)
    }
}

/// 在 `[1, max_pages]` 内均匀抽取目录页码
pub fn draw_page(random: &dyn RandomSource, max_pages: u32) -> u32 {
    let upper = max_pages.max(1) as usize;
    random.below(upper) as u32 + 1
}
