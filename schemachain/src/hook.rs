//! Error observation hook.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Options controlling what happens after the error hook observed an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrHookOptions {
    /// Report success to the caller once the hook has seen the error.
    #[serde(default)]
    pub return_none_on_err: bool,
}

impl ErrHookOptions {
    pub fn suppress() -> Self {
        Self {
            return_none_on_err: true,
        }
    }
}

pub(crate) type ErrHookFn = Box<dyn Fn(&Error) + Send + Sync>;

/// An installed error hook and its default options.
pub(crate) struct ErrorHook {
    callback: ErrHookFn,
    options: ErrHookOptions,
}

impl std::fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHook")
            .field("options", &self.options)
            .finish()
    }
}

impl ErrorHook {
    pub(crate) fn new(callback: ErrHookFn, options: ErrHookOptions) -> Self {
        Self { callback, options }
    }

    /// Let the hook observe `err`. Returns the error the caller should see, if any.
    /// `per_call` replaces the default options for one call.
    pub(crate) fn observe(&self, err: Error, per_call: Option<&ErrHookOptions>) -> Option<Error> {
        (self.callback)(&err);
        let options = per_call.unwrap_or(&self.options);
        if options.return_none_on_err {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %err, "Error suppressed by error hook");
            None
        } else {
            Some(err)
        }
    }
}

/// Route a result through an optional hook. A suppressed error becomes `Ok(fallback())`.
pub(crate) fn route<T>(
    hook: Option<&ErrorHook>,
    per_call: Option<&ErrHookOptions>,
    result: Result<T, Error>,
    fallback: impl FnOnce() -> T,
) -> Result<T, Error> {
    match (result, hook) {
        (Ok(value), _) => Ok(value),
        (Err(err), None) => Err(err),
        (Err(err), Some(hook)) => match hook.observe(err, per_call) {
            Some(err) => Err(err),
            None => Ok(fallback()),
        },
    }
}
