//! Invariant checks for the exchange's long-lived state (grid, buffers,
//! handle pools).

use crate::mesh_error::MeshHaloError;

/// Structures whose internal consistency can be verified at runtime.
pub trait DebugInvariants {
    /// Panic on a broken invariant in debug builds, or always when the
    /// `strict-invariants` / `check-invariants` features are enabled.
    fn debug_assert_invariants(&self);

    /// Return the first broken invariant as an error.
    fn validate_invariants(&self) -> Result<(), MeshHaloError>;

    /// Convenience wrapper over [`validate_invariants`](Self::validate_invariants).
    fn is_consistent(&self) -> bool {
        self.validate_invariants().is_ok()
    }
}

/// Run a fallible check and panic with context when invariant checking is on.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
