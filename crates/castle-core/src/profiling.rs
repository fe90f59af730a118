//! Per-phase timing instrumentation for the tick resolver.
//!
//! [`TickProfile`] is filled in by `resolve_tick` only when the `profiling`
//! feature is enabled.

use std::time::Duration;

/// Per-phase timing from one resolved tick.
#[derive(Debug, Clone, Default)]
pub struct TickProfile {
    pub apply: Duration,
    pub production: Duration,
    pub construction: Duration,
    pub upkeep: Duration,
    pub taxes: Duration,
    pub finalize: Duration,
    pub total: Duration,
    pub turn: u64,
}

impl TickProfile {
    /// Returns the name and duration of the slowest phase.
    pub fn bottleneck_phase(&self) -> (&'static str, Duration) {
        let phases = [
            ("apply", self.apply),
            ("production", self.production),
            ("construction", self.construction),
            ("upkeep", self.upkeep),
            ("taxes", self.taxes),
            ("finalize", self.finalize),
        ];
        phases
            .into_iter()
            .max_by_key(|(_, d)| *d)
            .unwrap_or(("apply", Duration::ZERO))
    }
}
