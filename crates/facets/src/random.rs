use std::time::{SystemTime, UNIX_EPOCH};

/// Seeded sine-hash generator. The same seed always yields the same sequence.
#[derive(Debug, Clone)]
pub struct Random {
    seed: f64,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Self { seed: seed as f64 }
    }

    /// Seeds from the wall clock in milliseconds.
    pub fn from_time() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::new(millis)
    }

    /// Next value in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        let x = self.seed.sin() * 10000.0;
        self.seed += 1.0;
        x - x.floor()
    }
}
