/// Lightweight wait budget: bounded spin, then yield, then report exhaustion
/// so the caller can park.
#[derive(Copy, Clone, Debug)]
pub struct WaitBudget {
    spins: u32,
    yields: u32,
    spin_cap: u32,
    yield_cap: u32,
}

impl WaitBudget {
    /// Create a hot wait budget for short, latency-sensitive waits.
    #[inline]
    pub fn hot() -> Self {
        Self::with_caps(128, 8)
    }

    /// Create a budget with explicit spin and yield caps.
    #[inline]
    pub fn with_caps(spin_cap: u32, yield_cap: u32) -> Self {
        Self {
            spins: 0,
            yields: 0,
            spin_cap,
            yield_cap,
        }
    }

    /// Reset the wait budget counters.
    #[inline]
    pub fn reset(&mut self) {
        self.spins = 0;
        self.yields = 0;
    }

    /// True once both the spin and the yield phases are used up.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.spins >= self.spin_cap && self.yields >= self.yield_cap
    }

    /// Perform one step of the wait strategy.
    ///
    /// Returns `false` when the budget is exhausted and the caller should
    /// block instead of burning more cycles.
    #[inline]
    pub fn step(&mut self) -> bool {
        if self.spins < self.spin_cap {
            core::hint::spin_loop();
            self.spins += 1;
            true
        } else if self.yields < self.yield_cap {
            std::thread::yield_now();
            self.yields += 1;
            true
        } else {
            false
        }
    }
}

impl Default for WaitBudget {
    fn default() -> Self {
        Self::with_caps(64, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_after_spins_and_yields() {
        let mut budget = WaitBudget::with_caps(3, 2);
        let mut steps = 0;
        while budget.step() {
            steps += 1;
        }
        assert_eq!(steps, 5);
        assert!(budget.is_exhausted());

        budget.reset();
        assert!(!budget.is_exhausted());
        assert!(budget.step());
    }

    #[test]
    fn zero_caps_are_immediately_exhausted() {
        let mut budget = WaitBudget::with_caps(0, 0);
        assert!(budget.is_exhausted());
        assert!(!budget.step());
    }
}
