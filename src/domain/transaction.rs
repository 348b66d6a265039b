use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortName {
    Saman,
    Payline,
    #[serde(rename = "ASANPARDAKHT")]
    AsanPardakht,
    Zarinpal,
}

impl PortName {
    pub const ALL: [PortName; 4] = [
        PortName::Saman,
        PortName::Payline,
        PortName::AsanPardakht,
        PortName::Zarinpal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PortName::Saman => "SAMAN",
            PortName::Payline => "PAYLINE",
            PortName::AsanPardakht => "ASANPARDAKHT",
            PortName::Zarinpal => "ZARINPAL",
        }
    }
}

impl fmt::Display for PortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortName {
    type Err = ();

    /// Case-insensitive; `asan_pardakht` and `asan-pardakht` are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_uppercase();
        PortName::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Init,
    Succeed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Init => "INIT",
            TransactionStatus::Succeed => "SUCCEED",
            TransactionStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INIT" => Some(TransactionStatus::Init),
            "SUCCEED" => Some(TransactionStatus::Succeed),
            "FAILED" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, TransactionStatus::Init)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub port: PortName,
    pub price: i64,
    pub ref_id: Option<String>,
    pub tracking_code: Option<String>,
    pub card_number: Option<String>,
    pub status: TransactionStatus,
    pub ip: Option<String>,
    pub payment_date: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub port: PortName,
    pub price: i64,
    pub ip: Option<String>,
}

/// Values written when a transaction is marked `SUCCEED`.
#[derive(Debug, Clone, Default)]
pub struct Settlement {
    pub ref_id: Option<String>,
    pub tracking_code: Option<String>,
    pub card_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub transaction_id: i64,
    pub result_code: String,
    pub result_message: String,
    pub log_date: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub transaction_id: i64,
    pub result_code: String,
    pub result_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_names_loosely() {
        assert_eq!("saman".parse::<PortName>(), Ok(PortName::Saman));
        assert_eq!("Asan-Pardakht".parse::<PortName>(), Ok(PortName::AsanPardakht));
        assert_eq!("asan_pardakht".parse::<PortName>(), Ok(PortName::AsanPardakht));
        assert_eq!("ZARINPAL".parse::<PortName>(), Ok(PortName::Zarinpal));
        assert!("mellat".parse::<PortName>().is_err());
    }

    #[test]
    fn only_init_is_open() {
        assert!(!TransactionStatus::Init.is_final());
        assert!(TransactionStatus::Succeed.is_final());
        assert!(TransactionStatus::Failed.is_final());
        assert_eq!(TransactionStatus::parse("FAILED"), Some(TransactionStatus::Failed));
        assert_eq!(TransactionStatus::parse("DONE"), None);
    }
}
