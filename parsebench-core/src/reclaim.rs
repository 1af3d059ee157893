//! Memory Reclamation Suspension
//!
//! A single high-precision measurement must not be disturbed by a collector
//! pass. Parser runtimes that own a collector (arena compaction, ref-cycle
//! sweeps, embedded GC) expose it through [`Reclaimer`]; the measurer suspends
//! it with a [`ReclaimGuard`] that restores the prior state when dropped,
//! including during unwinding.

/// Handle to a runtime's automatic memory reclamation
pub trait Reclaimer {
    /// Whether automatic reclamation is currently active
    fn is_enabled(&self) -> bool;
    /// Stop automatic reclamation
    fn disable(&mut self);
    /// Resume automatic reclamation
    fn enable(&mut self);
}

/// Reclaimer for runtimes without a collector
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReclaim;

impl Reclaimer for NoReclaim {
    fn is_enabled(&self) -> bool {
        false
    }

    fn disable(&mut self) {}

    fn enable(&mut self) {}
}

/// Suspends reclamation for its lifetime
pub struct ReclaimGuard<'a> {
    reclaimer: &'a mut dyn Reclaimer,
    was_enabled: bool,
}

impl<'a> ReclaimGuard<'a> {
    /// Disable reclamation, remembering whether it was active
    pub fn suspend(reclaimer: &'a mut dyn Reclaimer) -> Self {
        let was_enabled = reclaimer.is_enabled();
        if was_enabled {
            reclaimer.disable();
        }
        Self {
            reclaimer,
            was_enabled,
        }
    }
}

impl Drop for ReclaimGuard<'_> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.reclaimer.enable();
        }
    }
}
