//! Tracing and logging (shared setup).

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{InvalidLogFormat, LogFormat};

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_VAR: &str = "PANTRY_LOG_FORMAT";

/// Initialize process-wide observability from the environment.
///
/// Fails on an unrecognized `PANTRY_LOG_FORMAT` instead of guessing. Safe to
/// call multiple times; subsequent calls become no-ops.
pub fn init() -> Result<(), InvalidLogFormat> {
    let format = log_format_from_lookup(|var| std::env::var(var).ok())?;
    tracing::init(format);
    Ok(())
}

/// Log format from `PANTRY_LOG_FORMAT`; unset or blank means the default.
pub fn log_format_from_lookup<F>(lookup: F) -> Result<LogFormat, InvalidLogFormat>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(LOG_FORMAT_VAR) {
        Some(value) if !value.trim().is_empty() => value.parse(),
        _ => Ok(LogFormat::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_for(value: Option<&str>) -> Result<LogFormat, InvalidLogFormat> {
        log_format_from_lookup(|var| {
            assert_eq!(var, LOG_FORMAT_VAR);
            value.map(str::to_string)
        })
    }

    #[test]
    fn unset_or_blank_defaults_to_json() {
        assert_eq!(format_for(None), Ok(LogFormat::Json));
        assert_eq!(format_for(Some("  ")), Ok(LogFormat::Json));
    }

    #[test]
    fn known_formats_are_honored() {
        assert_eq!(format_for(Some("text")), Ok(LogFormat::Pretty));
        assert_eq!(format_for(Some("JSON")), Ok(LogFormat::Json));
    }

    #[test]
    fn unknown_format_is_an_error() {
        let err = format_for(Some("prety")).unwrap_err();
        assert_eq!(err.value, "prety");
        assert!(err.to_string().contains("prety"));
    }
}
