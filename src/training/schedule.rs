/// Linear warm-up to `base_lr`, then linear decay to zero at `total_steps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSchedule {
    base_lr: f64,
    warmup_steps: usize,
    total_steps: usize,
}

impl LinearSchedule {
    pub fn new(base_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self {
            base_lr,
            warmup_steps,
            total_steps,
        }
    }

    pub fn base_lr(&self) -> f64 {
        self.base_lr
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Learning rate for the optimizer step numbered `step` (0-based).
    ///
    /// Reaches exactly 0 at `total_steps` and stays there.
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_lr * step as f64 / self.warmup_steps.max(1) as f64;
        }

        let remaining = self.total_steps.saturating_sub(step) as f64;
        let decay_span = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.base_lr * (remaining / decay_span).max(0.0)
    }
}
