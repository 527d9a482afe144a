//! Host model-context precondition.
//!
//! The engine belongs to a larger probabilistic-programming model that
//! owns variable registration. Engine construction outside an active
//! model context is a fatal construction error. The context is a
//! thread-local stack with an RAII guard, so nesting works and a
//! forgotten guard cannot leak.

use std::cell::Cell;

thread_local! {
    static CONTEXT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII guard marking an active model context on the current thread.
///
/// # Examples
///
/// ```
/// use gp_bart::model::ModelContext;
///
/// assert!(!ModelContext::is_active());
/// {
///     let _ctx = ModelContext::enter();
///     assert!(ModelContext::is_active());
/// }
/// assert!(!ModelContext::is_active());
/// ```
#[derive(Debug)]
pub struct ModelContext {
    // Not Send: the guard must be dropped on the thread that created it.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ModelContext {
    /// Pushes a context onto the current thread's stack.
    pub fn enter() -> Self {
        CONTEXT_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: std::marker::PhantomData,
        }
    }

    /// Checks whether any context is active on the current thread.
    pub fn is_active() -> bool {
        CONTEXT_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for ModelContext {
    fn drop(&mut self) {
        CONTEXT_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}
