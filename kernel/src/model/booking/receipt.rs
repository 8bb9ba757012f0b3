use serde::{Deserialize, Serialize};
use shared::error::AppError;

const PREFIX: &str = "ORD";

/// Human-readable receipt number, `ORD-<year>-<sequence>` with the
/// sequence zero-padded to at least three digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ReceiptId {
    year: i32,
    sequence: u32,
}

impl ReceiptId {
    pub fn new(year: i32, sequence: u32) -> Self {
        Self { year, sequence }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}-{:04}-{:03}", self.year, self.sequence)
    }
}

impl std::str::FromStr for ReceiptId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AppError::ConversionEntityError(format!("malformed receipt id: {s}"));
        let mut parts = s.splitn(3, '-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(PREFIX), Some(year), Some(sequence)) if year.len() == 4 => Ok(Self {
                year: year.parse().map_err(|_| malformed())?,
                sequence: sequence.parse().map_err(|_| malformed())?,
            }),
            _ => Err(malformed()),
        }
    }
}

impl TryFrom<String> for ReceiptId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReceiptId> for String {
    fn from(value: ReceiptId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_padded_sequence() {
        assert_eq!(ReceiptId::new(2024, 7).to_string(), "ORD-2024-007");
        assert_eq!(ReceiptId::new(2024, 1234).to_string(), "ORD-2024-1234");
    }

    #[test]
    fn parses_stored_receipts() {
        let id: ReceiptId = "ORD-2024-007".parse().unwrap();
        assert_eq!(id, ReceiptId::new(2024, 7));
        assert_eq!(id.sequence(), 7);
        assert!("ORD-24-007".parse::<ReceiptId>().is_err());
        assert!("INV-2024-007".parse::<ReceiptId>().is_err());
        assert!("ORD-2024-abc".parse::<ReceiptId>().is_err());
    }
}
