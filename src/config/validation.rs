//! Configuration value parsing helpers.
//!
//! These back the environment-variable overrides in [`super::service`]; each
//! maps a parse failure to a user-facing configuration error instead of a
//! raw `ParseIntError`/`ParseFloatError`.

use crate::error::{MdttsError, MdttsResult};

/// Parse an `f32`, mapping failures to a configuration error.
pub fn parse_f32(value: &str) -> MdttsResult<f32> {
    value
        .parse::<f32>()
        .map_err(|_| MdttsError::config(format!("Invalid float value: {}", value)))
}

/// Parse a `u64`, mapping failures to a configuration error.
pub fn parse_u64(value: &str) -> MdttsResult<u64> {
    value
        .parse::<u64>()
        .map_err(|_| MdttsError::config(format!("Invalid u64 value: {}", value)))
}

/// Parse a `u16`, mapping failures to a configuration error.
pub fn parse_u16(value: &str) -> MdttsResult<u16> {
    value
        .parse::<u16>()
        .map_err(|_| MdttsError::config(format!("Invalid port value: {}", value)))
}

/// Parse a `usize`, mapping failures to a configuration error.
pub fn parse_usize(value: &str) -> MdttsResult<usize> {
    value
        .parse::<usize>()
        .map_err(|_| MdttsError::config(format!("Invalid integer value: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u16_rejects_out_of_range_port() {
        assert!(parse_u16("70000").is_err());
        assert_eq!(parse_u16("5055").unwrap(), 5055);
    }
}
