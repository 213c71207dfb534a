//! Duration parsing for config fields.
//!
//! Config durations use the compact `AhBmCs` format (`1h30m`, `10s`,
//! `250ms`). Validation normalizes bare integers to seconds before
//! parsing, so `delay: 5` means five seconds.

use std::time::Duration;

use thiserror::Error;

/// Error for unparseable duration strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration {input:?} (use 'AhBmCs' duration format)")]
pub struct ParseDurationError {
    /// The rejected input.
    pub input: String,
}

/// Parses an `AhBmCs`-format duration.
///
/// Accepted units: `h`, `m`, `s`, `ms`. Values may be fractional
/// (`1.5h`). The bare string `"0"` parses as zero.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let err = || ParseDurationError {
        input: input.to_string(),
    };

    if input.is_empty() {
        return Err(err());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_secs = 0_f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(err)?;
        if number_len == 0 {
            return Err(err());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| err())?;
        rest = &rest[number_len..];

        let (unit_secs, unit_len) = if rest.starts_with("ms") {
            (0.001, 2)
        } else if rest.starts_with('h') {
            (3600.0, 1)
        } else if rest.starts_with('m') {
            (60.0, 1)
        } else if rest.starts_with('s') {
            (1.0, 1)
        } else {
            return Err(err());
        };
        rest = &rest[unit_len..];
        total_secs += value * unit_secs;
    }

    if !total_secs.is_finite() || total_secs < 0.0 {
        return Err(err());
    }
    Ok(Duration::from_secs_f64(total_secs))
}

/// Normalizes a duration config value: bare non-negative integers get a
/// seconds suffix, everything else is left for [`parse_duration`].
pub fn normalize_duration(input: &str) -> String {
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        format!("{input}s")
    } else {
        input.to_string()
    }
}
