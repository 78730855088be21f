//! Common types used across the application

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Largest precision `format_units` can scale without overflowing
pub const MAX_DECIMALS: u8 = 38;

/// Token representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub mint: Pubkey,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(mint: Pubkey, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            mint,
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Amount representation with precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount {
    pub value: u64,
    pub decimals: u8,
}

impl Amount {
    pub fn from_lamports(value: u64) -> Self {
        Self { value, decimals: 9 }
    }

    /// For display only, decisions stay in integer units.
    pub fn to_ui(&self) -> f64 {
        self.value as f64 / 10_f64.powi(self.decimals as i32)
    }

    pub fn to_ui_string(&self) -> String {
        format_units(self.value as i128, self.decimals)
    }
}

/// Snapshot of the amount carried through each hop of the route.
///
/// Field names follow the default SOL → USDT → USDC → SOL route so the JSON
/// shape stays the one browser clients already read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmounts {
    #[serde(rename = "sol", with = "u64_string")]
    pub start: u64,
    #[serde(rename = "usdt", with = "u64_string")]
    pub after_first_hop: u64,
    #[serde(rename = "usdc", with = "u64_string")]
    pub after_second_hop: u64,
    #[serde(rename = "finalSol", with = "u64_string")]
    pub end: u64,
}

/// Render an integer smallest-unit amount as a decimal string without
/// going through floating point.
pub fn format_units(amount: i128, decimals: u8) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    if decimals == 0 {
        return format!("{}{}", sign, abs);
    }
    let scale = 10u128.pow(decimals as u32);
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / scale,
        abs % scale,
        width = decimals as usize
    )
}

pub fn format_sol(lamports: i128) -> String {
    format_units(lamports, 9)
}

/// Serializes integer amounts as JSON strings, accepts strings or numbers.
pub mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s.parse().map_err(de::Error::custom),
            Raw::Num(n) => Ok(n),
        }
    }
}
