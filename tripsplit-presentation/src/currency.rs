//! Dollar formatting for display.

use tripsplit_domain::Money;

/// `$1,234.56`, `-$5.00`
pub fn format_currency(amount: Money) -> String {
    let sign = if amount.is_negative() { "-" } else { "" };
    format!("{sign}${}", format_magnitude(amount))
}

/// Like [`format_currency`] but marks positive amounts with `+`.
pub fn format_signed_currency(amount: Money) -> String {
    let sign = match amount.signum() {
        1 => "+",
        -1 => "-",
        _ => "",
    };
    format!("{sign}${}", format_magnitude(amount))
}

fn format_magnitude(amount: Money) -> String {
    let cents = amount.cents().unsigned_abs();
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{grouped}.{fraction:02}")
}
