//! Cron expression and timezone validation for scheduled triggers.
//!
//! Invalid expressions block a trigger save with a field-level error and
//! never fall back to a default schedule. The checks are syntactic:
//! resolving a timezone against the zoneinfo database and computing fire
//! times are the scheduler's concern, behind the trigger collaborator.

/// Per-field bounds of a five-field cron expression: minute, hour,
/// day of month, month, day of week (0 and 7 both mean Sunday).
const FIELD_BOUNDS: [(&str, u32, u32); 5] = [
    ("minute", 0, 59),
    ("hour", 0, 23),
    ("day of month", 1, 31),
    ("month", 1, 12),
    ("day of week", 0, 7),
];

/// Validates a five-field cron expression.
///
/// Each field accepts `*`, single values, ranges (`a-b`), comma lists,
/// and `/step` suffixes on any of those.
///
/// # Errors
///
/// Returns a human-readable reason suitable for a field-level error.
pub fn validate_cron(expression: &str) -> Result<(), String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!("expected 5 fields, got {}", fields.len()));
    }

    for (field, (name, min, max)) in fields.iter().zip(FIELD_BOUNDS) {
        validate_field(field, min, max).map_err(|reason| format!("{name}: {reason}"))?;
    }
    Ok(())
}

fn validate_field(field: &str, min: u32, max: u32) -> Result<(), String> {
    for part in field.split(',') {
        if part.is_empty() {
            return Err("empty list entry".to_string());
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (part, None),
        };

        if let Some(step) = step {
            match step.parse::<u32>() {
                Ok(0) => return Err("step must be at least 1".to_string()),
                Ok(_) => {}
                Err(_) => return Err(format!("invalid step '{step}'")),
            }
        }

        if range == "*" {
            continue;
        }

        match range.split_once('-') {
            Some((start, end)) => {
                let start = parse_bounded(start, min, max)?;
                let end = parse_bounded(end, min, max)?;
                if start > end {
                    return Err(format!("range {start}-{end} is reversed"));
                }
            }
            None => {
                parse_bounded(range, min, max)?;
            }
        }
    }
    Ok(())
}

fn parse_bounded(value: &str, min: u32, max: u32) -> Result<u32, String> {
    let parsed: u32 = value
        .parse()
        .map_err(|_| format!("invalid value '{value}'"))?;
    if parsed < min || parsed > max {
        return Err(format!("value {parsed} out of range {min}-{max}"));
    }
    Ok(parsed)
}

/// Validates the shape of an IANA timezone identifier.
///
/// Accepts `Area/Location` forms like `America/New_York` or `Etc/GMT+2`
/// and the bare `UTC`/`GMT` names.
///
/// # Errors
///
/// Returns a human-readable reason suitable for a field-level error.
pub fn validate_timezone(timezone: &str) -> Result<(), String> {
    if timezone.is_empty() {
        return Err("timezone is required".to_string());
    }

    let segments: Vec<&str> = timezone.split('/').collect();
    if segments.len() > 3 {
        return Err("too many path segments".to_string());
    }
    if segments.len() == 1 && !matches!(segments[0], "UTC" | "GMT") {
        return Err(format!(
            "'{timezone}' is not an IANA timezone identifier"
        ));
    }

    for segment in segments {
        if segment.is_empty() {
            return Err("empty path segment".to_string());
        }
        let valid = segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'));
        if !valid {
            return Err(format!("invalid characters in '{segment}'"));
        }
    }
    Ok(())
}
