//! Progress reporting hooks for a refresh run.

use crate::refresher::RefreshReport;

/// Progress callback for reporting refresh status.
pub trait RefreshProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called each time an enriched creature is collected.
    fn creature_collected(&self, collected: usize);
    /// Called when the refresh completes successfully.
    fn done(&self, report: &RefreshReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RefreshProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn creature_collected(&self, _collected: usize) {}
    fn done(&self, _report: &RefreshReport) {}
}
