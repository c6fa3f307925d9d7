//! Progress reporting and cancellation hooks for long running phases.

/// Receiver of informational messages and solver progress.
///
/// Implementations must be callable from the solver thread while worker
/// threads are running, hence `Sync`.
pub trait Progress: Sync {
  fn message(&self, msg: &str) {
    tracing::info!("{msg}");
  }

  /// Estimated completion of the running solve in percent, `0..=100`.
  fn solver_progress(&self, percent: u32) {
    tracing::debug!("solver progress {percent}%");
  }

  /// Polled between phases. Returning `true` aborts the run.
  fn check_cancel(&self) -> bool {
    false
  }
}

/// Forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;
impl Progress for TracingProgress {}
