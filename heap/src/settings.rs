/// Tuning knobs for the generational pools.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapSettings {
    /// Slots pre-allocated per object kind.
    pub initial_capacity: usize,
    /// Every n-th cycle triggered by a kind is a full cycle.
    pub full_cycle_interval: u32,
    /// After a triggered sweep, a pool doubles when its free slots fall
    /// below this fraction (0.0 - 1.0) of its capacity.
    pub growth_threshold: f64,
}

impl Default for HeapSettings {
    fn default() -> Self {
        Self {
            initial_capacity: 16_384,
            full_cycle_interval: 15,
            growth_threshold: 0.1, // 10%
        }
    }
}

impl HeapSettings {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.initial_capacity == 0 {
            return Err("initial_capacity must be > 0");
        }
        if self.initial_capacity > u32::MAX as usize {
            return Err("initial_capacity must fit a u32 handle");
        }
        if self.full_cycle_interval == 0 {
            return Err("full_cycle_interval must be > 0");
        }
        if !(self.growth_threshold > 0.0 && self.growth_threshold < 1.0) {
            return Err("growth_threshold must be in (0, 1)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = HeapSettings::default();
        assert_eq!(settings.initial_capacity, 16_384);
        assert_eq!(settings.full_cycle_interval, 15);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_values() {
        let zero = HeapSettings {
            initial_capacity: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let never_full = HeapSettings {
            full_cycle_interval: 0,
            ..Default::default()
        };
        assert!(never_full.validate().is_err());

        let threshold = HeapSettings {
            growth_threshold: 1.5,
            ..Default::default()
        };
        assert!(threshold.validate().is_err());
    }
}
