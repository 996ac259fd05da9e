/*!
 * Scoped Release
 *
 * Wraps a zero-argument cleanup action so it runs at most once: on explicit
 * release, or on drop if the caller never released. The lock guards in this
 * crate follow the same shape with their release action fixed; `ScopedRelease`
 * is the generic form for caller-supplied cleanups.
 */

/// Runs a cleanup action exactly once, on release or on drop.
///
/// # Example
///
/// ```
/// use threadkit::ScopedRelease;
///
/// let mut cleaned = false;
/// {
///     let _release = ScopedRelease::new(|| cleaned = true);
///     // work with the resource
/// } // action runs here if release() was never called
/// assert!(cleaned);
/// ```
#[must_use = "the action runs as soon as this is dropped"]
pub struct ScopedRelease<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> ScopedRelease<F> {
    /// Wrap an action to run on release.
    pub fn new(action: F) -> Self {
        Self {
            action: Some(action),
        }
    }

    /// Run the wrapped action. Idempotent: subsequent calls are no-ops.
    pub fn release(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }

    /// Check whether the action has already run (or was disarmed).
    pub fn is_released(&self) -> bool {
        self.action.is_none()
    }

    /// Cancel the pending action without running it.
    ///
    /// Use when ownership of the underlying resource is transferred elsewhere.
    pub fn disarm(&mut self) {
        self.action = None;
    }
}

impl<F: FnOnce()> Drop for ScopedRelease<F> {
    fn drop(&mut self) {
        self.release();
    }
}
