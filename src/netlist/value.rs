//! Numeric literals used in netlists and rendered equations.

use num_complex::Complex64;

/// Parse a number string with optional unit suffix.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(last) = text.chars().last() {
        let mult = match last {
            'p' => 1e-12,
            'n' => 1e-9,
            'u' | 'µ' => 1e-6,
            'm' => 1e-3,
            'k' | 'K' => 1e3,
            'M' => 1e6,
            'G' => 1e9,
            _ => 1.0,
        };
        if mult != 1.0 {
            (&text[..text.len() - last.len_utf8()], mult)
        } else {
            (text, 1.0)
        }
    } else {
        (text, 1.0)
    };

    num_str.parse::<f64>().ok().map(|v| v * multiplier)
}

/// Parse a complex literal: `5`, `10k`, `3+4j`, `3-4j`, `-2j`, `(1+1j)`.
pub fn parse_complex(text: &str) -> Option<Complex64> {
    let mut text = text.trim();
    if text.starts_with('(') && text.ends_with(')') && text.len() >= 2 {
        text = text[1..text.len() - 1].trim();
    }
    if text.is_empty() {
        return None;
    }

    let body = match text.strip_suffix(['j', 'J']) {
        Some(body) => body,
        None => return parse_value(text).map(|re| Complex64::new(re, 0.0)),
    };

    // Split at the last sign that is not a leading sign or an exponent sign.
    let bytes = body.as_bytes();
    let split = (1..bytes.len())
        .rev()
        .find(|&i| (bytes[i] == b'+' || bytes[i] == b'-') && !matches!(bytes[i - 1], b'e' | b'E'));

    let (re_text, im_text) = match split {
        Some(i) => (&body[..i], &body[i..]),
        None => ("", body),
    };

    let re = if re_text.is_empty() {
        0.0
    } else {
        parse_value(re_text)?
    };
    let im = match im_text {
        "" | "+" => 1.0,
        "-" => -1.0,
        other => parse_value(other.strip_prefix('+').unwrap_or(other))?,
    };
    Some(Complex64::new(re, im))
}

/// Render a complex value the way equations spell constants.
///
/// Real values print bare; negative or complex values are parenthesised so
/// they can be spliced into a larger expression.
pub fn format_complex(value: Complex64) -> String {
    if value.im == 0.0 {
        if value.re < 0.0 {
            format!("({})", value.re)
        } else {
            format!("{}", value.re)
        }
    } else if value.re == 0.0 {
        format!("({}j)", value.im)
    } else if value.im < 0.0 {
        format!("({}-{}j)", value.re, -value.im)
    } else {
        format!("({}+{}j)", value.re, value.im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Option<f64>, b: Option<f64>) -> bool {
        match (a, b) {
            (Some(x), Some(y)) => (x - y).abs() < x.abs() * 1e-10 + 1e-15,
            (None, None) => true,
            _ => false,
        }
    }

    #[test]
    fn test_parse_value() {
        assert!(approx_eq(parse_value("10k"), Some(10_000.0)));
        assert!(approx_eq(parse_value("100n"), Some(100e-9)));
        assert!(approx_eq(parse_value("4.7u"), Some(4.7e-6)));
        assert!(approx_eq(parse_value("2.2"), Some(2.2)));
        assert!(approx_eq(parse_value("1e-9"), Some(1e-9)));
        assert!(approx_eq(parse_value("abc"), None));
    }

    #[test]
    fn test_parse_complex() {
        assert_eq!(parse_complex("5"), Some(Complex64::new(5.0, 0.0)));
        assert_eq!(parse_complex("3+4j"), Some(Complex64::new(3.0, 4.0)));
        assert_eq!(parse_complex("3-4j"), Some(Complex64::new(3.0, -4.0)));
        assert_eq!(parse_complex("-2j"), Some(Complex64::new(0.0, -2.0)));
        assert_eq!(parse_complex("(1+1j)"), Some(Complex64::new(1.0, 1.0)));
        assert_eq!(parse_complex("j"), Some(Complex64::new(0.0, 1.0)));
        assert_eq!(parse_complex("1e-3+2e+1j"), Some(Complex64::new(1e-3, 20.0)));
        assert_eq!(parse_complex("1k"), Some(Complex64::new(1000.0, 0.0)));
        assert_eq!(parse_complex("x+1j"), None);
    }

    #[test]
    fn test_format_complex() {
        assert_eq!(format_complex(Complex64::new(0.5, 0.0)), "0.5");
        assert_eq!(format_complex(Complex64::new(-5.0, 0.0)), "(-5)");
        assert_eq!(format_complex(Complex64::new(1.0, -2.0)), "(1-2j)");
        assert_eq!(format_complex(Complex64::new(0.0, 3.0)), "(3j)");
    }
}
