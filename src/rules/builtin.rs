use uuid::Uuid;

pub(super) fn is_int(value: &str) -> bool {
    value.parse::<i64>().is_ok()
}

pub(super) fn is_float(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}

pub(super) fn is_uuid_v4(value: &str) -> bool {
    Uuid::parse_str(value).is_ok_and(|uuid| uuid.get_version_num() == 4)
}

pub(super) fn is_alphanumeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Failure to coerce is a failed check, not an error.
pub(super) fn as_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub(super) fn above(n: f64, min: f64, inclusive: bool) -> bool {
    if inclusive {
        n >= min
    } else {
        n > min
    }
}

pub(super) fn below(n: f64, max: f64, inclusive: bool) -> bool {
    if inclusive {
        n <= max
    } else {
        n < max
    }
}
