/// Shortest round-trip representation in the style of Python's `repr(float)`.
pub fn format_f64_repr(value: f64) -> String {
    if let Some(special) = non_finite(value) {
        return special;
    }
    repr_from_scientific(&format!("{value:e}"))
}

/// Like [`format_f64_repr`] but with single-precision round-tripping.
pub fn format_f32_repr(value: f32) -> String {
    if let Some(special) = non_finite(f64::from(value)) {
        return special;
    }
    repr_from_scientific(&format!("{value:e}"))
}

/// C `printf("%.17g")`.
pub fn format_g17(value: f64) -> String {
    const PRECISION: i32 = 17;
    if let Some(special) = non_finite(value) {
        return special;
    }
    let (negative, digits, exponent) = split_scientific(&format!("{value:.16e}"));
    let sign = if negative { "-" } else { "" };

    if (-4..PRECISION).contains(&exponent) {
        let (int_part, frac_part) = positional(&digits, exponent);
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            format!("{sign}{int_part}")
        } else {
            format!("{sign}{int_part}.{frac_part}")
        }
    } else {
        let mantissa_rest = digits[1..].trim_end_matches('0');
        let mantissa = if mantissa_rest.is_empty() {
            digits[..1].to_string()
        } else {
            format!("{}.{}", &digits[..1], mantissa_rest)
        };
        format!("{sign}{mantissa}{}", exponent_suffix(exponent))
    }
}

fn non_finite(value: f64) -> Option<String> {
    if value.is_nan() {
        Some("nan".to_string())
    } else if value.is_infinite() {
        Some(if value > 0.0 { "inf" } else { "-inf" }.to_string())
    } else {
        None
    }
}

fn repr_from_scientific(formatted: &str) -> String {
    let (negative, digits, exponent) = split_scientific(formatted);
    let sign = if negative { "-" } else { "" };

    if (-4..16).contains(&exponent) {
        let (int_part, frac_part) = positional(&digits, exponent);
        if frac_part.is_empty() {
            format!("{sign}{int_part}.0")
        } else {
            format!("{sign}{int_part}.{frac_part}")
        }
    } else {
        let mantissa = if digits.len() == 1 {
            digits.clone()
        } else {
            format!("{}.{}", &digits[..1], &digits[1..])
        };
        format!("{sign}{mantissa}{}", exponent_suffix(exponent))
    }
}

fn split_scientific(formatted: &str) -> (bool, String, i32) {
    let (negative, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, formatted),
    };
    let (mantissa, exponent) = unsigned.split_once('e').unwrap_or((unsigned, "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    (negative, digits, exponent.parse().unwrap_or(0))
}

fn positional(digits: &str, exponent: i32) -> (String, String) {
    if exponent >= 0 {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            let padding = "0".repeat(int_len - digits.len());
            (format!("{digits}{padding}"), String::new())
        } else {
            (digits[..int_len].to_string(), digits[int_len..].to_string())
        }
    } else {
        let zeros = "0".repeat((-exponent - 1) as usize);
        ("0".to_string(), format!("{zeros}{digits}"))
    }
}

fn exponent_suffix(exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("e{sign}{:02}", exponent.unsigned_abs())
}
