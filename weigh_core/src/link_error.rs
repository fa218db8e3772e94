//! Maps `Box<dyn Error>` from the transport boundary to typed `CoreError`.
//!
//! The traits in `weigh_traits` use `Box<dyn Error + Send + Sync>` for
//! maximum flexibility; this module converts those to our typed error enum,
//! with an optional feature-gated path for `weigh_link::LinkError`
//! downcasting.

use crate::error::CoreError;

/// Map a trait-boundary error to a typed `CoreError`.
///
/// Attempts to downcast known link error types first, then falls back to
/// string-based heuristics.
pub fn map_link_error(e: &(dyn std::error::Error + 'static)) -> CoreError {
    #[cfg(feature = "link-errors")]
    {
        if let Some(le) = e.downcast_ref::<weigh_link::error::LinkError>() {
            return match le {
                weigh_link::error::LinkError::NotOpen => {
                    CoreError::State("link is not open".to_string())
                }
                other => CoreError::Link(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timed out") || s.to_lowercase().contains("timeout") {
        CoreError::Timeout
    } else {
        CoreError::Link(s)
    }
}
