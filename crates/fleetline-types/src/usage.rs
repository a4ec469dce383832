use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Token and cost accounting for one turn; additive across a Session's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cost_usd: f64,
}

impl AddAssign for TurnUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.cache_read_tokens += rhs.cache_read_tokens;
        self.cost_usd += rhs.cost_usd;
    }
}

impl std::iter::Sum for TurnUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(TurnUsage::default(), |mut acc, u| {
            acc += u;
            acc
        })
    }
}
