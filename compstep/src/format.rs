//! Fixed-width formatting of the iteration table

use num_traits::Float;
use std::fmt::LowerExp;

/// Width of every column.
pub const WIDTH: usize = 12;

/// Formats a real number as `1.00e+00`, left-aligned in a column.
pub fn real<F: Float + LowerExp>(x: F) -> String
{
    let s = if x.is_nan() {
        String::from("NaN")
    }
    else if x.is_infinite() {
        String::from(if x > F::zero() {"Inf"} else {"-Inf"})
    }
    else {
        let e = format!("{:.2e}", x);
        match e.split_once('e') {
            Some((mant, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mant, sign, digits)
            },
            None => e,
        }
    };

    format!("{:<w$}", s, w = WIDTH)
}

/// Formats an integer left-aligned in a column.
pub fn int(n: usize) -> String
{
    format!("{:<w$}", n, w = WIDTH)
}

/// Formats a string left-aligned in a column.
pub fn string(s: &str) -> String
{
    format!("{:<w$}", s, w = WIDTH)
}

//

#[test]
fn test_format1()
{
    assert_eq!(real(1.), "1.00e+00    ");
    assert_eq!(real(-1.234e-5), "-1.23e-05   ");
    assert_eq!(real(6.02e123_f64), "6.02e+123   ");
    assert_eq!(real(0.), "0.00e+00    ");
    assert_eq!(real(f64::NAN), "NaN         ");
    assert_eq!(int(42), "42          ");
    assert_eq!(string("Newton"), "Newton      ");
    assert_eq!(string("Newton").len(), WIDTH);
}
