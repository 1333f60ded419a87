//! Format specifications (`f"{x:>8.2f}"`, `"{}".format(x)`).

use crate::error::{ErrorKind, EvalResult, RuntimeError};
use crate::value::{format_float, CallArgs, Number, Value};

/// Parsed `[[fill]align][sign][#][0][width][,|_][.precision][type]`.
#[derive(Debug, Clone, PartialEq, Default)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    ty: Option<char>,
}

fn invalid_spec() -> RuntimeError {
    RuntimeError::value_error("Invalid format specifier")
}

impl FormatSpec {
    fn parse(spec: &str) -> EvalResult<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut out = FormatSpec::default();
        let mut i = 0;
        let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

        if chars.len() >= 2 && is_align(chars[1]) {
            out.fill = Some(chars[0]);
            out.align = Some(chars[1]);
            i = 2;
        } else if chars.first().copied().is_some_and(is_align) {
            out.align = Some(chars[0]);
            i = 1;
        }
        if let Some(&c) = chars.get(i) {
            if matches!(c, '+' | '-' | ' ') {
                out.sign = Some(c);
                i += 1;
            }
        }
        if chars.get(i) == Some(&'#') {
            out.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            if out.fill.is_none() {
                out.fill = Some('0');
            }
            if out.align.is_none() {
                out.align = Some('=');
            }
            i += 1;
        }
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if i > start {
            let digits: String = chars[start..i].iter().collect();
            out.width = digits.parse().map_err(|_| invalid_spec())?;
        }
        if let Some(&c) = chars.get(i) {
            if c == ',' || c == '_' {
                out.grouping = Some(c);
                i += 1;
            }
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            let start = i;
            while chars.get(i).is_some_and(char::is_ascii_digit) {
                i += 1;
            }
            if i == start {
                return Err(RuntimeError::value_error("Format specifier missing precision"));
            }
            let digits: String = chars[start..i].iter().collect();
            out.precision = Some(digits.parse().map_err(|_| invalid_spec())?);
        }
        if let Some(&c) = chars.get(i) {
            out.ty = Some(c);
            i += 1;
        }
        if i != chars.len() {
            return Err(invalid_spec());
        }
        Ok(out)
    }
}

fn unknown_code(code: char, value: &Value) -> RuntimeError {
    RuntimeError::value_error(format!(
        "Unknown format code '{code}' for object of type '{}'",
        value.type_name()
    ))
}

/// `format(value, spec)`
pub fn format_value(value: &Value, spec: &str) -> EvalResult<String> {
    if spec.is_empty() {
        return value.to_str();
    }
    let spec = FormatSpec::parse(spec)?;
    match value {
        Value::Str(s) => format_str(value, s, &spec),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => format_number(value, &spec),
        _ => Err(RuntimeError::type_error(format!(
            "unsupported format string passed to {}.__format__",
            value.type_name()
        ))),
    }
}

fn format_str(value: &Value, s: &str, spec: &FormatSpec) -> EvalResult<String> {
    if let Some(code) = spec.ty.filter(|&c| c != 's') {
        return Err(unknown_code(code, value));
    }
    if spec.sign.is_some() {
        return Err(RuntimeError::value_error(
            "Sign not allowed in string format specifier",
        ));
    }
    let text: String = match spec.precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    };
    Ok(pad(String::new(), text, spec, '<'))
}

fn format_number(value: &Value, spec: &FormatSpec) -> EvalResult<String> {
    let number = value.as_number().ok_or_else(invalid_spec)?;
    let (negative, body) = match (number, spec.ty) {
        (Number::Int(n), None | Some('d') | Some('n')) => {
            if spec.precision.is_some() {
                return Err(RuntimeError::value_error(
                    "Precision not allowed in integer format specifier",
                ));
            }
            (n < 0, group(&n.unsigned_abs().to_string(), spec.grouping))
        }
        (Number::Int(n), Some(code @ ('x' | 'X' | 'o' | 'b'))) => {
            let abs = n.unsigned_abs();
            let digits = match code {
                'x' => format!("{abs:x}"),
                'X' => format!("{abs:X}"),
                'o' => format!("{abs:o}"),
                _ => format!("{abs:b}"),
            };
            let prefix = if spec.alternate {
                match code {
                    'x' => "0x",
                    'X' => "0X",
                    'o' => "0o",
                    _ => "0b",
                }
            } else {
                ""
            };
            (n < 0, format!("{prefix}{digits}"))
        }
        (_, Some(code @ ('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%'))) => {
            let f = number.to_f64();
            (f.is_sign_negative() && !f.is_nan(), format_float_code(f.abs(), code, spec))
        }
        (Number::Float(f), None) => {
            let body = match spec.precision {
                Some(_) => format_float_code(f.abs(), 'g', spec),
                None => format_float(f.abs()),
            };
            (f.is_sign_negative() && !f.is_nan(), group_float(&body, spec.grouping))
        }
        (_, Some(code)) => return Err(unknown_code(code, value)),
    };
    let sign = match (negative, spec.sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    };
    Ok(pad(sign.to_string(), body, spec, '>'))
}

fn format_float_code(f: f64, code: char, spec: &FormatSpec) -> String {
    let upper = code.is_ascii_uppercase();
    if !f.is_finite() {
        let text = if f.is_nan() { "nan" } else { "inf" };
        return if upper { text.to_uppercase() } else { text.to_string() };
    }
    let precision = spec.precision.unwrap_or(6);
    let body = match code {
        'f' | 'F' => group_float(&format!("{f:.precision$}"), spec.grouping),
        'e' | 'E' => scientific(f, precision, upper),
        '%' => format!("{}%", group_float(&format!("{:.precision$}", f * 100.0), spec.grouping)),
        _ => general(f, precision.max(1), spec.alternate, upper),
    };
    if spec.alternate && matches!(code, 'f' | 'F') && precision == 0 {
        format!("{body}.")
    } else {
        body
    }
}

/// `d.ddde+XX` with Python's two-digit minimum exponent.
fn scientific(f: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{f:.precision$e}");
    let (mantissa, exp) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

/// The `g` presentation type.
fn general(f: f64, precision: usize, alternate: bool, upper: bool) -> String {
    if f == 0.0 {
        return if alternate {
            format!("{:.*}", precision - 1, 0.0)
        } else {
            "0".to_string()
        };
    }
    let sci = scientific(f, precision - 1, upper);
    let exp: i32 = sci
        .rsplit(['e', 'E'])
        .next()
        .and_then(|e| e.parse().ok())
        .unwrap_or(0);
    let text = if exp >= -4 && (exp as i64) < precision as i64 {
        let decimals = (precision as i64 - 1 - exp as i64).max(0) as usize;
        format!("{f:.decimals$}")
    } else {
        sci
    };
    if alternate {
        return text;
    }
    strip_trailing_zeros(&text)
}

fn strip_trailing_zeros(text: &str) -> String {
    let (mantissa, exp) = match text.find(['e', 'E']) {
        Some(pos) => text.split_at(pos),
        None => (text, ""),
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{mantissa}{exp}")
}

fn group(digits: &str, separator: Option<char>) -> String {
    let Some(sep) = separator else {
        return digits.to_string();
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

fn group_float(text: &str, separator: Option<char>) -> String {
    if separator.is_none() {
        return text.to_string();
    }
    let end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    let (int_part, rest) = text.split_at(end);
    format!("{}{rest}", group(int_part, separator))
}

fn pad(sign: String, body: String, spec: &FormatSpec, default_align: char) -> String {
    let len = sign.chars().count() + body.chars().count();
    if len >= spec.width {
        return sign + &body;
    }
    let fill = spec.fill.unwrap_or(' ');
    let padding = spec.width - len;
    let repeat = |n: usize| fill.to_string().repeat(n);
    match spec.align.unwrap_or(default_align) {
        '<' => format!("{sign}{body}{}", repeat(padding)),
        '^' => format!(
            "{}{sign}{body}{}",
            repeat(padding / 2),
            repeat(padding - padding / 2)
        ),
        '=' => format!("{sign}{}{body}", repeat(padding)),
        _ => format!("{}{sign}{body}", repeat(padding)),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// str.format
// ══════════════════════════════════════════════════════════════════════════════

/// `template.format(*args, **kwargs)`
pub fn format_string(template: &str, args: &CallArgs) -> EvalResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut auto_index = 0usize;
    let mut numbering: Option<bool> = None; // Some(true) = automatic

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(RuntimeError::value_error(
                    "Single '}' encountered in format string",
                ))
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c);
                }
                if !closed {
                    return Err(RuntimeError::value_error(
                        "Single '{' encountered in format string",
                    ));
                }
                let (head, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let (name, conversion) = match head.split_once('!') {
                    Some((name, conv)) => (name, Some(conv)),
                    None => (head, None),
                };

                let value = if name.is_empty() {
                    if numbering == Some(false) {
                        return Err(switch_numbering());
                    }
                    numbering = Some(true);
                    let value = positional(args, auto_index)?;
                    auto_index += 1;
                    value
                } else if let Ok(index) = name.parse::<usize>() {
                    if numbering == Some(true) {
                        return Err(switch_numbering());
                    }
                    numbering = Some(false);
                    positional(args, index)?
                } else {
                    args.keywords
                        .iter()
                        .find(|(k, _)| k == name)
                        .map(|(_, v)| v.clone())
                        .ok_or_else(|| RuntimeError::key_error(&Value::str(name)))?
                };

                let value = match conversion {
                    None => value,
                    Some("r") => Value::str(value.repr()?),
                    Some("s") => Value::str(value.to_str()?),
                    Some(other) => {
                        return Err(RuntimeError::value_error(format!(
                            "Unknown conversion specifier {other}"
                        )))
                    }
                };
                out.push_str(&format_value(&value, spec)?);
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

fn positional(args: &CallArgs, index: usize) -> EvalResult<Value> {
    args.positional.get(index).cloned().ok_or_else(|| {
        RuntimeError::new(
            ErrorKind::IndexError,
            format!("Replacement index {index} out of range for positional args tuple"),
        )
    })
}

fn switch_numbering() -> RuntimeError {
    RuntimeError::value_error(
        "cannot switch from automatic field numbering to manual field specification",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: Value, spec: &str) -> String {
        format_value(&value, spec).unwrap()
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(fmt(Value::Float(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(Value::Int(2), ".1f"), "2.0");
        assert_eq!(fmt(Value::Float(0.25), ".0%"), "25%");
    }

    #[test]
    fn test_width_and_alignment() {
        assert_eq!(fmt(Value::Int(42), "5"), "   42");
        assert_eq!(fmt(Value::Int(42), "<5"), "42   ");
        assert_eq!(fmt(Value::Int(42), "^6"), "  42  ");
        assert_eq!(fmt(Value::Int(-42), "06"), "-00042");
        assert_eq!(fmt(Value::str("ab"), "*>4"), "**ab");
        assert_eq!(fmt(Value::str("ab"), "4"), "ab  ");
    }

    #[test]
    fn test_grouping_and_bases() {
        assert_eq!(fmt(Value::Int(1234567), ","), "1,234,567");
        assert_eq!(fmt(Value::Float(1234.5), ",.1f"), "1,234.5");
        assert_eq!(fmt(Value::Int(255), "x"), "ff");
        assert_eq!(fmt(Value::Int(5), "#b"), "0b101");
    }

    #[test]
    fn test_scientific_and_general() {
        assert_eq!(fmt(Value::Float(1234.5), ".2e"), "1.23e+03");
        assert_eq!(fmt(Value::Float(0.0001234), "g"), "0.0001234");
        assert_eq!(fmt(Value::Float(1234567.0), "g"), "1.23457e+06");
        assert_eq!(fmt(Value::Float(2.50), "g"), "2.5");
        assert_eq!(fmt(Value::Float(1.0 / 3.0), ".3"), "0.333");
    }

    #[test]
    fn test_type_mismatch() {
        let err = format_value(&Value::str("a"), "d").unwrap_err();
        assert_eq!(err.message, "Unknown format code 'd' for object of type 'str'");
        let err = format_value(&Value::Float(1.0), "d").unwrap_err();
        assert_eq!(err.message, "Unknown format code 'd' for object of type 'float'");
        let err = format_value(&Value::list(vec![]), ">3").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_str_format_fields() {
        let args = CallArgs::with_keywords(
            vec![Value::str("arm"), Value::Int(90)],
            vec![("unit".to_string(), Value::str("deg"))],
        );
        assert_eq!(
            format_string("{} moved {:>4} {unit}", &args).unwrap(),
            "arm moved   90 deg"
        );
        assert_eq!(format_string("{1}-{0}", &args).unwrap(), "90-arm");
        assert_eq!(format_string("{{literal}} {0!r}", &args).unwrap(), "{literal} 'arm'");
        let err = format_string("{5}", &args).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexError);
        let err = format_string("{}{0}", &args).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueError);
    }
}
