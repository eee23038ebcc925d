//! In-process configuration for an arena evaluator instance.
//!
//! Nothing here is parsed from a file or environment: the evaluator has no
//! CLI surface, so callers build a [`Config`] directly and hand it to the
//! host.

use crate::error::{Error, Result};

/// Default cap on how many times a single work unit may be resuspended and
/// resubmitted before the host treats it as non-terminating.
pub const DEFAULT_MAX_RESUBMITS_PER_WORK_UNIT: u32 = 10;

/// Tunables for an [`Arena`](crate::arena::Arena) and the host/worker pool
/// built on top of it.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) initial_capacity: u32,
    pub(crate) max_capacity: u32,
    pub(crate) bucket_count: u32,
    pub(crate) worker_count: usize,
    pub(crate) sq_capacity: u32,
    pub(crate) cq_capacity: u32,
    pub(crate) max_resubmits_per_work_unit: u32,
    pub(crate) default_step_budget: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_capacity: 1 << 16,
            max_capacity: 1 << 28,
            bucket_count: 1 << 15,
            worker_count: 1,
            sq_capacity: 1 << 10,
            cq_capacity: 1 << 10,
            max_resubmits_per_work_unit: DEFAULT_MAX_RESUBMITS_PER_WORK_UNIT,
            default_step_budget: 1 << 14,
        }
    }
}

/// Builder for [`Config`], validating on commit rather than on every setter
/// call.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        ConfigBuilder { inner: Config::default() }
    }

    pub fn initial_capacity(mut self, n: u32) -> Self {
        self.inner.initial_capacity = n;
        self
    }

    pub fn max_capacity(mut self, n: u32) -> Self {
        self.inner.max_capacity = n;
        self
    }

    pub fn bucket_count(mut self, n: u32) -> Self {
        self.inner.bucket_count = n;
        self
    }

    pub fn worker_count(mut self, n: usize) -> Self {
        self.inner.worker_count = n;
        self
    }

    pub fn sq_capacity(mut self, n: u32) -> Self {
        self.inner.sq_capacity = n;
        self
    }

    pub fn cq_capacity(mut self, n: u32) -> Self {
        self.inner.cq_capacity = n;
        self
    }

    pub fn max_resubmits_per_work_unit(mut self, n: u32) -> Self {
        self.inner.max_resubmits_per_work_unit = n;
        self
    }

    pub fn default_step_budget(mut self, n: u32) -> Self {
        self.inner.default_step_budget = n;
        self
    }

    /// Validate and produce a [`Config`]. Capacities and bucket counts must
    /// be powers of two so the arena's bucket-mask indexing stays correct.
    pub fn build(self) -> Result<Config> {
        let c = self.inner;
        if !c.initial_capacity.is_power_of_two() || !c.max_capacity.is_power_of_two() {
            return Err(Error::InvalidHeader);
        }
        if !c.bucket_count.is_power_of_two() {
            return Err(Error::InvalidHeader);
        }
        if !c.sq_capacity.is_power_of_two() || !c.cq_capacity.is_power_of_two() {
            return Err(Error::InvalidHeader);
        }
        if c.initial_capacity > c.max_capacity {
            return Err(Error::InvalidHeader);
        }
        if c.worker_count == 0 {
            return Err(Error::InvalidHeader);
        }
        Ok(c)
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn initial_capacity(&self) -> u32 {
        self.initial_capacity
    }

    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn sq_capacity(&self) -> u32 {
        self.sq_capacity
    }

    pub fn cq_capacity(&self) -> u32 {
        self.cq_capacity
    }

    pub fn max_resubmits_per_work_unit(&self) -> u32 {
        self.max_resubmits_per_work_unit
    }

    pub fn default_step_budget(&self) -> u32 {
        self.default_step_budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::builder().build().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_capacity() {
        let err = Config::builder().initial_capacity(100).build().unwrap_err();
        assert_eq!(err, Error::InvalidHeader);
    }

    #[test]
    fn rejects_initial_above_max() {
        let err = Config::builder()
            .initial_capacity(1 << 20)
            .max_capacity(1 << 16)
            .build()
            .unwrap_err();
        assert_eq!(err, Error::InvalidHeader);
    }

    #[test]
    fn rejects_zero_workers() {
        let err = Config::builder().worker_count(0).build().unwrap_err();
        assert_eq!(err, Error::InvalidHeader);
    }
}
