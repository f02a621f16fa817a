// Panic isolation for snapshot listeners
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

#[cfg(panic = "abort")]
compile_error!("snapshot listener isolation needs panic = \"unwind\"");

/// Result of a panic-guarded call
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    Success(T),
    Panicked(String),
}

/// Run `f`, catching a panic so one faulty listener cannot take the surface down
///
/// # Example
/// ```text
/// let result = execute_guarded("surface-1", || panic!("listener bug"));
/// assert!(matches!(result, PanicGuardResult::Panicked(_)));
/// ```
pub fn execute_guarded<F, T>(surface: &str, f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };

            error!(surface, panic_msg = %panic_msg, "Snapshot listener panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}
