//! # Input Validation
//!
//! Pure checks applied to the tag registration form before anything is
//! rendered or stored. None of these functions touch shared state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TagError, TagResult};

/// Garment size grades accepted by the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GarmentSize {
    P,
    M,
    G,
    GG,
    XG,
    XGG,
}

impl GarmentSize {
    /// Every accepted grade, smallest first.
    pub const ALL: [GarmentSize; 6] = [
        GarmentSize::P,
        GarmentSize::M,
        GarmentSize::G,
        GarmentSize::GG,
        GarmentSize::XG,
        GarmentSize::XGG,
    ];

    /// Canonical upper-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            GarmentSize::P => "P",
            GarmentSize::M => "M",
            GarmentSize::G => "G",
            GarmentSize::GG => "GG",
            GarmentSize::XG => "XG",
            GarmentSize::XGG => "XGG",
        }
    }
}

impl fmt::Display for GarmentSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GarmentSize {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_size(s).ok_or_else(|| {
            TagError::validation("tamanho", "must be one of P, M, G, GG, XG, XGG", s)
                .with_recovery_suggestion(SIZE_HINT)
        })
    }
}

/// User-facing hint for a rejected size.
pub const SIZE_HINT: &str = "Tamanho inválido. Utilize P, M, G, GG, XG ou XGG.";

/// User-facing hint for text fields that contain anything but letters.
pub const LETTERS_HINT: &str =
    "Entradas inválidas. Utilize apenas letras para produto, cor e tecido.";

/// True iff `text` is non-empty and every character is a letter.
///
/// Accented letters count ("Algodão" passes); digits, whitespace and
/// punctuation do not.
pub fn validate_letters(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_alphabetic)
}

/// Normalize a size grade, returning `None` for anything outside the set.
///
/// Matching is case-insensitive: `"gg"` yields [`GarmentSize::GG`].
pub fn validate_size(text: &str) -> Option<GarmentSize> {
    let upper = text.to_uppercase();
    GarmentSize::ALL
        .into_iter()
        .find(|size| size.as_str() == upper)
}

/// Parse the price field.
///
/// Non-numeric, non-finite and non-positive values are validation errors.
pub fn parse_price(text: &str) -> TagResult<f64> {
    let trimmed = text.trim();
    let price: f64 = trimmed.parse().map_err(|e: std::num::ParseFloatError| {
        TagError::validation("preco", "must be a decimal number", trimmed)
            .with_recovery_suggestion(format!("Erro de validação: {}", e))
    })?;

    if !price.is_finite() || price <= 0.0 {
        return Err(
            TagError::validation("preco", "must be a positive amount", trimmed)
                .with_recovery_suggestion("Erro de validação: o preço deve ser maior que zero."),
        );
    }

    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HasRecoverySuggestion;

    #[test]
    fn letters_only() {
        assert!(validate_letters("Algodao"));
        assert!(validate_letters("Algodão"));
        assert!(!validate_letters("Algod4o"));
        assert!(!validate_letters("Azul Claro"));
        assert!(!validate_letters("Poli-algodao"));
        assert!(!validate_letters(""));
    }

    #[test]
    fn size_is_case_insensitive() {
        assert_eq!(validate_size("gg"), Some(GarmentSize::GG));
        assert_eq!(validate_size("m"), Some(GarmentSize::M));
        assert_eq!(validate_size("XgG"), Some(GarmentSize::XGG));
        assert_eq!(validate_size("XL"), None);
        assert_eq!(validate_size(""), None);
    }

    #[test]
    fn size_round_trips_through_display() {
        for size in GarmentSize::ALL {
            assert_eq!(size.to_string().parse::<GarmentSize>().unwrap(), size);
        }
    }

    #[test]
    fn size_parse_error_carries_hint() {
        let err = "XL".parse::<GarmentSize>().unwrap_err();
        assert_eq!(err.recovery_suggestion(), Some(SIZE_HINT));
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price("29.9").unwrap(), 29.9);
        assert_eq!(parse_price(" 10 ").unwrap(), 10.0);
        assert!(parse_price("abc").is_err());
        assert!(parse_price("0").is_err());
        assert!(parse_price("-3.5").is_err());
        assert!(parse_price("NaN").is_err());
        assert!(parse_price("inf").is_err());
    }
}
