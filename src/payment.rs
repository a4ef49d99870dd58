use chrono::{Datelike, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Card details for the simulated gateway. Nothing here is stored or
/// forwarded anywhere; validation happens before any order mutation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreditCard {
    pub number: String,
    /// Expiry in `MM/YY` form.
    pub expiry: String,
    pub cvv: String,
}

pub fn validate_card(card: &CreditCard) -> AppResult<()> {
    validate(card).map_err(AppError::PaymentValidation)
}

fn validate(card: &CreditCard) -> Result<(), String> {
    let digits: Vec<u32> = card
        .number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_digit(10).ok_or("card number must be numeric"))
        .collect::<Result<_, _>>()?;

    if !(13..=19).contains(&digits.len()) {
        return Err(format!(
            "card number must be 13-19 digits, got {}",
            digits.len()
        ));
    }
    if !luhn_check(&digits) {
        return Err("card number failed checksum".to_string());
    }

    let (month, year) = parse_expiry(&card.expiry)?;
    let now = Utc::now();
    let current = (now.year() % 100, now.month());
    if (year, month) < (current.0 as u32, current.1) {
        return Err(format!("card expired {month:02}/{year:02}"));
    }

    if !(3..=4).contains(&card.cvv.len()) || !card.cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err("CVV must be 3 or 4 digits".to_string());
    }

    Ok(())
}

fn parse_expiry(expiry: &str) -> Result<(u32, u32), String> {
    let (month, year) = expiry
        .split_once('/')
        .ok_or("expiry must be in MM/YY form")?;
    let month: u32 = month.parse().map_err(|_| "invalid expiry month")?;
    let year: u32 = year.parse().map_err(|_| "invalid expiry year")?;
    if !(1..=12).contains(&month) {
        return Err(format!("invalid expiry month {month}"));
    }
    if year > 99 {
        return Err("expiry year must be two digits".to_string());
    }
    Ok((month, year))
}

fn luhn_check(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str, expiry: &str, cvv: &str) -> CreditCard {
        CreditCard {
            number: number.to_string(),
            expiry: expiry.to_string(),
            cvv: cvv.to_string(),
        }
    }

    #[test]
    fn accepts_a_valid_card() {
        assert!(validate(&card("4111 1111 1111 1111", "12/99", "123")).is_ok());
    }

    #[test]
    fn rejects_short_numbers() {
        let err = validate(&card("4111", "12/99", "123")).unwrap_err();
        assert!(err.contains("13-19 digits"), "{err}");
    }

    #[test]
    fn rejects_bad_checksum() {
        let err = validate(&card("4111111111111112", "12/99", "123")).unwrap_err();
        assert!(err.contains("checksum"), "{err}");
    }

    #[test]
    fn rejects_expired_cards() {
        let err = validate(&card("4111111111111111", "01/20", "123")).unwrap_err();
        assert!(err.contains("expired"), "{err}");
    }

    #[test]
    fn rejects_malformed_expiry() {
        assert!(validate(&card("4111111111111111", "2027-01", "123")).is_err());
        assert!(validate(&card("4111111111111111", "13/99", "123")).is_err());
    }

    #[test]
    fn rejects_bad_cvv() {
        assert!(validate(&card("4111111111111111", "12/99", "12")).is_err());
        assert!(validate(&card("4111111111111111", "12/99", "12a")).is_err());
        assert!(validate(&card("4111111111111111", "12/99", "1234")).is_ok());
    }
}
