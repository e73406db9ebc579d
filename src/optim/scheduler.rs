//! Reduce-on-plateau learning rate scheduler
use serde::{Deserialize, Serialize};

use crate::optim::optimizer::Optimizer;

/// Plateau scheduler configuration (monitored metric is minimised)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauConfig {
    /// Multiplier applied to the learning rate on a plateau
    pub factor: f64,
    /// Bad epochs tolerated before reducing
    pub patience: usize,
    /// Relative improvement required: `metric < best * (1 - threshold)`
    pub threshold: f64,
    /// Epochs to wait after a reduction before counting bad epochs again
    pub cooldown: usize,
    /// Lower bound for the learning rate
    pub min_lr: f64,
    /// Reductions smaller than this are ignored
    pub eps: f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            factor: 0.5,
            patience: 20,
            threshold: 1e-4,
            cooldown: 0,
            min_lr: 0.0,
            eps: 1e-8,
        }
    }
}

/// Adjusts an optimizer's learning rate from a per-epoch metric.
pub trait Scheduler {
    /// Records one epoch's metric. Returns true if the learning rate was changed.
    fn step<O: Optimizer + ?Sized>(&mut self, metric: f64, optimizer: &mut O) -> bool;
}

/// Lowers the optimizer's learning rate when the monitored loss stops improving.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    config: PlateauConfig,
    best: f64,
    bad_epochs: usize,
    cooldown_left: usize,
}

impl ReduceLrOnPlateau {
    pub fn new(config: PlateauConfig) -> Self {
        Self {
            config,
            best: f64::INFINITY,
            bad_epochs: 0,
            cooldown_left: 0,
        }
    }

    pub fn config(&self) -> &PlateauConfig {
        &self.config
    }

    /// Best metric seen so far
    pub fn best(&self) -> f64 {
        self.best
    }
}

impl Scheduler for ReduceLrOnPlateau {
    fn step<O: Optimizer + ?Sized>(&mut self, metric: f64, optimizer: &mut O) -> bool {
        if metric < self.best * (1.0 - self.config.threshold) {
            self.best = metric;
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        if self.cooldown_left > 0 {
            self.cooldown_left -= 1;
            self.bad_epochs = 0;
        }

        if self.bad_epochs <= self.config.patience {
            return false;
        }

        self.bad_epochs = 0;
        self.cooldown_left = self.config.cooldown;

        let old_lr = optimizer.learning_rate();
        let new_lr = (old_lr * self.config.factor).max(self.config.min_lr);
        if old_lr - new_lr > self.config.eps {
            log::info!("reducing learning rate from {:.3e} to {:.3e}", old_lr, new_lr);
            optimizer.set_learning_rate(new_lr);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::sgd::Sgd;

    fn scheduler(patience: usize) -> ReduceLrOnPlateau {
        ReduceLrOnPlateau::new(PlateauConfig { patience, ..PlateauConfig::default() })
    }

    #[test]
    fn improvement_never_reduces() {
        let mut sched = scheduler(0);
        let mut opt = Sgd::new(1.0);
        for loss in [5.0, 4.0, 3.0, 2.0] {
            assert!(!sched.step(loss, &mut opt));
        }
        assert_eq!(opt.learning_rate, 1.0);
        assert_eq!(sched.best(), 2.0);
    }

    #[test]
    fn reduces_after_patience_is_exceeded() {
        let mut sched = scheduler(2);
        let mut opt = Sgd::new(1.0);
        assert!(!sched.step(1.0, &mut opt));
        assert!(!sched.step(1.0, &mut opt));
        assert!(!sched.step(1.0, &mut opt));
        assert!(sched.step(1.0, &mut opt));
        assert_eq!(opt.learning_rate, 0.5);
        // Counter resets after a reduction.
        assert!(!sched.step(1.0, &mut opt));
    }

    #[test]
    fn tiny_improvements_count_as_plateau() {
        let mut sched = scheduler(0);
        let mut opt = Sgd::new(1.0);
        sched.step(1.0, &mut opt);
        assert!(sched.step(0.99999, &mut opt));
    }

    #[test]
    fn cooldown_suppresses_bad_epochs() {
        let mut sched = ReduceLrOnPlateau::new(PlateauConfig {
            patience: 0,
            cooldown: 2,
            ..PlateauConfig::default()
        });
        let mut opt = Sgd::new(1.0);
        sched.step(1.0, &mut opt);
        assert!(sched.step(2.0, &mut opt));
        assert!(!sched.step(2.0, &mut opt));
        assert!(!sched.step(2.0, &mut opt));
        assert!(sched.step(2.0, &mut opt));
        assert_eq!(opt.learning_rate, 0.25);
    }

    #[test]
    fn min_lr_stops_reductions() {
        let mut sched = ReduceLrOnPlateau::new(PlateauConfig {
            patience: 0,
            min_lr: 0.5,
            ..PlateauConfig::default()
        });
        let mut opt = Sgd::new(1.0);
        sched.step(1.0, &mut opt);
        assert!(sched.step(1.0, &mut opt));
        assert!(!sched.step(1.0, &mut opt));
        assert_eq!(opt.learning_rate, 0.5);
    }
}
