use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A card from the fixed estimation deck.
///
/// Serde is hand-written because the backend mixes JSON numbers and
/// strings for vote values: numeric cards go over the wire as numbers,
/// `?` and `☕` as strings. No `TS` derive for the same reason; fields
/// holding a `CardValue` carry a `#[ts(type = "number | string")]`
/// override instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardValue {
    Number(u32),
    Unsure,
    Coffee,
}

/// The full deck, in display order.
pub const CARD_DECK: [CardValue; 13] = [
    CardValue::Number(0),
    CardValue::Number(1),
    CardValue::Number(2),
    CardValue::Number(3),
    CardValue::Number(5),
    CardValue::Number(8),
    CardValue::Number(13),
    CardValue::Number(21),
    CardValue::Number(34),
    CardValue::Number(55),
    CardValue::Number(89),
    CardValue::Unsure,
    CardValue::Coffee,
];

impl CardValue {
    /// Numeric value for averaging. Non-numeric cards are excluded from
    /// averages entirely, never counted as zero.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CardValue::Number(n) => Some(f64::from(*n)),
            CardValue::Unsure | CardValue::Coffee => None,
        }
    }

    /// Sort key for result display: numeric cards ascending, then `?`,
    /// then any other non-numeric card.
    pub fn display_rank(&self) -> (u8, u32) {
        match self {
            CardValue::Number(n) => (0, *n),
            CardValue::Unsure => (1, 0),
            CardValue::Coffee => (2, 0),
        }
    }

    /// Parse user input against the deck. Unknown values are rejected
    /// client-side; the backend restricts votes to the same set.
    pub fn parse(input: &str) -> Option<CardValue> {
        let input = input.trim();
        let card = match input {
            "?" => CardValue::Unsure,
            "☕" | "coffee" => CardValue::Coffee,
            _ => CardValue::Number(input.parse().ok()?),
        };
        CARD_DECK.contains(&card).then_some(card)
    }
}

impl fmt::Display for CardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardValue::Number(n) => write!(f, "{}", n),
            CardValue::Unsure => write!(f, "?"),
            CardValue::Coffee => write!(f, "☕"),
        }
    }
}

impl Serialize for CardValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CardValue::Number(n) => serializer.serialize_u32(*n),
            CardValue::Unsure => serializer.serialize_str("?"),
            CardValue::Coffee => serializer.serialize_str("☕"),
        }
    }
}

struct CardValueVisitor;

impl<'de> Visitor<'de> for CardValueVisitor {
    type Value = CardValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a card number or one of \"?\" / \"☕\"")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<CardValue, E> {
        u32::try_from(value)
            .map(CardValue::Number)
            .map_err(|_| E::custom(format!("card value {} out of range", value)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<CardValue, E> {
        u32::try_from(value)
            .map(CardValue::Number)
            .map_err(|_| E::custom(format!("card value {} out of range", value)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<CardValue, E> {
        if value.fract() == 0.0 && value >= 0.0 && value <= f64::from(u32::MAX) {
            Ok(CardValue::Number(value as u32))
        } else {
            Err(E::custom(format!("card value {} is not a whole number", value)))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<CardValue, E> {
        match value.trim() {
            "?" => Ok(CardValue::Unsure),
            "☕" => Ok(CardValue::Coffee),
            other => other
                .parse::<u32>()
                .map(CardValue::Number)
                .map_err(|_| E::custom(format!("unrecognized card value {:?}", other))),
        }
    }
}

impl<'de> Deserialize<'de> for CardValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<CardValue, D::Error> {
        deserializer.deserialize_any(CardValueVisitor)
    }
}
