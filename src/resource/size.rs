//! Memory and disk size conversion
//!
//! Sizes use binary multiples: `K` = 1024, `M` = 1024², `G` = 1024³, `T` = 1024⁴.

use crate::error::CliError;

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;
const TB: f64 = GB * 1024.0;

/// Parse a size such as `512M`, `1.5G` or `100` into bytes
pub fn parse_size(value: &str) -> Result<u64, CliError> {
    let trimmed = value.trim();
    let invalid = || CliError::parameter(format!("invalid size {}", value));

    let Some(last) = trimmed.chars().last() else {
        return Err(invalid());
    };

    let multiplier = match last.to_ascii_uppercase() {
        'T' => TB,
        'G' => GB,
        'M' => MB,
        'K' => KB,
        _ => return trimmed.parse::<u64>().map_err(|_| invalid()),
    };

    let number: f64 = trimmed[..trimmed.len() - 1]
        .parse()
        .map_err(|_| invalid())?;
    if !number.is_finite() || number < 0.0 {
        return Err(invalid());
    }

    Ok((number * multiplier) as u64)
}

/// Format a byte count using the largest unit that keeps the value ≥ 1
pub fn format_size(bytes: f64) -> String {
    let (value, suffix) = if bytes >= TB {
        (bytes / TB, "T")
    } else if bytes >= GB {
        (bytes / GB, "G")
    } else if bytes >= MB {
        (bytes / MB, "M")
    } else if bytes >= KB {
        (bytes / KB, "K")
    } else {
        (bytes, "")
    };

    let number = format!("{:.1}", value);
    let number = number.strip_suffix(".0").unwrap_or(&number);
    format!("{}{}", number, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("512M").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_size("2G").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("2g").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1T").unwrap(), 1u64 << 40);
        assert_eq!(parse_size("4k").unwrap(), 4096);
        assert_eq!(parse_size("100").unwrap(), 100);
    }

    #[test]
    fn test_parse_size_fractional() {
        assert_eq!(parse_size("1.5G").unwrap(), 1536 * 1024 * 1024);
        assert_eq!(parse_size("0.5K").unwrap(), 512);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        for bad in ["", "G", "abc", "12X", "1.5", "-1G"] {
            assert!(
                matches!(parse_size(bad), Err(CliError::Parameter(_))),
                "expected error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(1536.0), "1.5K");
        assert_eq!(format_size(1024.0), "1K");
        assert_eq!(format_size(500.0), "500");
        assert_eq!(format_size(GB), "1G");
        assert_eq!(format_size(268435456.0), "256M");
        assert_eq!(format_size(3.0 * TB), "3T");
        assert_eq!(format_size(0.0), "0");
    }

    #[test]
    fn test_round_trip_keeps_scale() {
        for input in ["512M", "2G", "1.5K", "3T"] {
            let bytes = parse_size(input).unwrap();
            assert_eq!(format_size(bytes as f64), input);
        }
    }
}
