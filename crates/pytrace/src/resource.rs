//! Resource accounting for a single traced run.
//!
//! Shrunk from the teacher's `resource.rs`: there is one tracker shape, not
//! a `ResourceTracker` trait with `NoLimitTracker`/`LimitedTracker` impls,
//! because a trace run is a single bounded execution rather than a
//! long-lived REPL heap that toggles limits on and off mid-session. The
//! error taxonomy and the allocation/operation/recursion distinctions carry
//! over unchanged.

use std::fmt;

use crate::lang::exception::PyException;

/// Error returned when a resource limit is exceeded during a trace run.
#[derive(Debug, Clone)]
pub enum ResourceError {
    /// Maximum number of heap allocations exceeded.
    Allocation { limit: usize, count: usize },
    /// Maximum number of statements/expressions evaluated exceeded.
    Operation { limit: usize, count: usize },
    /// Maximum call stack depth exceeded.
    Recursion { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => write!(f, "allocation limit exceeded: {count} > {limit}"),
            Self::Operation { limit, count } => write!(f, "operation limit exceeded: {count} > {limit}"),
            Self::Recursion { .. } => write!(f, "maximum recursion depth exceeded"),
        }
    }
}

impl std::error::Error for ResourceError {}

impl ResourceError {
    /// Maps a resource error to the Python exception kind a traced program
    /// would see: `Recursion` becomes a catchable `RecursionError`;
    /// `Allocation`/`Operation` become uncatchable-in-spirit `MemoryError`/
    /// `TimeoutError` (the interpreter still lets user `except` clauses see
    /// them, since this engine has no uncatchable-exception distinction).
    #[must_use]
    pub fn into_exception(self, line: u32) -> PyException {
        match self {
            Self::Allocation { limit, count } => {
                PyException::new("MemoryError", format!("allocation limit exceeded: {count} > {limit}"), line)
            }
            Self::Operation { limit, count } => {
                PyException::new("TimeoutError", format!("operation limit exceeded: {count} > {limit}"), line)
            }
            Self::Recursion { .. } => PyException::new("RecursionError", "maximum recursion depth exceeded", line),
        }
    }
}

/// Configuration for a single trace run's resource limits.
///
/// All limits are optional; `None` disables the corresponding check.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    pub max_allocations: Option<usize>,
    pub max_operations: Option<usize>,
    pub max_recursion_depth: Option<usize>,
}

/// Recommended maximum recursion depth if not otherwise specified, matching
/// CPython's default.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

impl Default for ResourceLimits {
    fn default() -> Self {
        Self { max_allocations: None, max_operations: None, max_recursion_depth: Some(DEFAULT_MAX_RECURSION_DEPTH) }
    }
}

impl ResourceLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_allocations(mut self, limit: usize) -> Self {
        self.max_allocations = Some(limit);
        self
    }

    #[must_use]
    pub fn max_operations(mut self, limit: usize) -> Self {
        self.max_operations = Some(limit);
        self
    }

    #[must_use]
    pub fn max_recursion_depth(mut self, limit: Option<usize>) -> Self {
        self.max_recursion_depth = limit;
        self
    }
}

/// Running counters checked against a `ResourceLimits` during one trace run.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    limits: ResourceLimits,
    allocation_count: usize,
    operation_count: usize,
}

impl ResourceTracker {
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits, allocation_count: 0, operation_count: 0 }
    }

    #[must_use]
    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operation_count
    }

    /// Checked once per statement against the heap's current live object
    /// count. There is no per-allocation hook into `Heap::allocate` (it stays
    /// infallible, matching the teacher's simple arena); instead growth is
    /// sampled at statement boundaries, which is frequent enough to catch a
    /// runaway loop without threading a `Result` through every call site that
    /// builds a list, tuple, set, dict, or instance.
    pub fn check_allocations(&mut self, live_count: usize) -> Result<(), ResourceError> {
        self.allocation_count = live_count;
        if let Some(max) = self.limits.max_allocations {
            if live_count > max {
                return Err(ResourceError::Allocation { limit: max, count: live_count });
            }
        }
        Ok(())
    }

    /// Called once per statement executed (`interp.rs`'s `execute_block` tick).
    pub fn on_statement(&mut self) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_operations {
            self.operation_count += 1;
            if self.operation_count > max {
                return Err(ResourceError::Operation { limit: max, count: self.operation_count });
            }
        }
        Ok(())
    }

    /// Called before pushing a new call frame.
    ///
    /// `current_depth` is the call stack depth before the new frame goes on.
    pub fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        let max = self.limits.max_recursion_depth.unwrap_or(DEFAULT_MAX_RECURSION_DEPTH);
        if current_depth >= max {
            Err(ResourceError::Recursion { limit: max, depth: current_depth + 1 })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursion_limit_trips_at_configured_depth() {
        let tracker = ResourceTracker::new(ResourceLimits::new().max_recursion_depth(Some(3)));
        assert!(tracker.check_recursion_depth(2).is_ok());
        assert!(tracker.check_recursion_depth(3).is_err());
    }

    #[test]
    fn operation_limit_trips_after_budget_spent() {
        let mut tracker = ResourceTracker::new(ResourceLimits::new().max_operations(2));
        assert!(tracker.on_statement().is_ok());
        assert!(tracker.on_statement().is_ok());
        assert!(tracker.on_statement().is_err());
    }

    #[test]
    fn allocation_limit_trips_once_heap_grows_past_it() {
        let mut tracker = ResourceTracker::new(ResourceLimits::new().max_allocations(10));
        assert!(tracker.check_allocations(10).is_ok());
        assert!(tracker.check_allocations(11).is_err());
    }

    #[test]
    fn unset_limits_never_trip() {
        let mut tracker = ResourceTracker::new(ResourceLimits { max_allocations: None, max_operations: None, max_recursion_depth: None });
        for _ in 0..10_000 {
            tracker.on_statement().unwrap();
        }
        assert!(tracker.check_allocations(1_000_000).is_ok());
        assert!(tracker.check_recursion_depth(999_999).is_ok());
    }
}
