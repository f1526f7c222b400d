//! Envelope model and strict parsing.
//!
//! The wire shapes keep every number that may exceed 64 bits as a decimal
//! string so that exactness survives any JSON implementation. Parsing
//! narrows them into the integer domain types, rejecting overflow rather
//! than rounding.

use crate::errors::CodecError;
use hl_book::{OrderType, Side};
use serde::{Deserialize, Serialize};
use shared_types::Address;

/// A signed client transaction envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Order {
        order: OrderPayload,
        /// Hex-encoded 65-byte `(r, s, v)` signature, `0x` prefix optional.
        signature: String,
    },
    Cancel {
        cancel: CancelPayload,
        signature: String,
    },
}

impl Envelope {
    /// Parse an envelope from raw bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(raw).map_err(|e| CodecError::InvalidFormat(e.to_string()))
    }

    /// Serialize to the canonical JSON wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("envelope serialization cannot fail")
    }
}

/// Wire shape of an order. `side` is 1 (buy) or 2 (sell); `order_type` is
/// 1 (GTC), 2 (IOC) or 3 (ALO).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub symbol: String,
    pub side: u8,
    #[serde(rename = "type")]
    pub order_type: u8,
    pub price: String,
    pub qty: String,
    pub nonce: String,
    pub deadline: String,
    pub leverage: u32,
    pub owner: String,
    #[serde(default)]
    pub agent_mode: bool,
    #[serde(default)]
    pub delegation_id: Option<String>,
}

/// Wire shape of a cancel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPayload {
    pub order_id: String,
    pub symbol: String,
    pub nonce: String,
    pub owner: String,
}

/// An order narrowed into domain types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedOrder {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: u64,
    pub qty: u64,
    pub nonce: u64,
    pub deadline: u64,
    pub leverage: u32,
    pub owner: Address,
    pub agent_mode: bool,
    pub delegation_id: Option<String>,
}

/// A cancel narrowed into domain types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCancel {
    pub order_id: u64,
    pub symbol: String,
    pub nonce: u64,
    pub owner: Address,
}

/// A parsed transaction of either kind, paired with its signature bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedTx {
    Order(ParsedOrder),
    Cancel(ParsedCancel),
}

pub(crate) fn parse_u64(field: &'static str, value: &str) -> Result<u64, CodecError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::BadNumber {
            field,
            value: value.to_string(),
        });
    }
    value.parse::<u64>().map_err(|_| CodecError::BadNumber {
        field,
        value: value.to_string(),
    })
}

pub(crate) fn parse_address(field: &'static str, value: &str) -> Result<Address, CodecError> {
    Address::from_hex(value)
        .ok_or_else(|| CodecError::InvalidFormat(format!("bad address in {field}: {value:?}")))
}

impl OrderPayload {
    /// Narrow the wire shape into domain types.
    pub fn parse(&self) -> Result<ParsedOrder, CodecError> {
        let side = match self.side {
            1 => Side::Buy,
            2 => Side::Sell,
            other => {
                return Err(CodecError::InvalidFormat(format!("bad side: {other}")));
            }
        };
        let order_type = match self.order_type {
            1 => OrderType::Gtc,
            2 => OrderType::Ioc,
            3 => OrderType::Alo,
            other => {
                return Err(CodecError::InvalidFormat(format!("bad order type: {other}")));
            }
        };
        Ok(ParsedOrder {
            symbol: self.symbol.clone(),
            side,
            order_type,
            price: parse_u64("price", &self.price)?,
            qty: parse_u64("qty", &self.qty)?,
            nonce: parse_u64("nonce", &self.nonce)?,
            deadline: parse_u64("deadline", &self.deadline)?,
            leverage: self.leverage,
            owner: parse_address("owner", &self.owner)?,
            agent_mode: self.agent_mode,
            delegation_id: self.delegation_id.clone(),
        })
    }
}

impl CancelPayload {
    /// Narrow the wire shape into domain types.
    pub fn parse(&self) -> Result<ParsedCancel, CodecError> {
        Ok(ParsedCancel {
            order_id: parse_u64("order_id", &self.order_id)?,
            symbol: self.symbol.clone(),
            nonce: parse_u64("nonce", &self.nonce)?,
            owner: parse_address("owner", &self.owner)?,
        })
    }
}

impl ParsedOrder {
    /// Rebuild the wire shape (test and client helper).
    pub fn to_payload(&self) -> OrderPayload {
        OrderPayload {
            symbol: self.symbol.clone(),
            side: match self.side {
                Side::Buy => 1,
                Side::Sell => 2,
            },
            order_type: match self.order_type {
                OrderType::Gtc => 1,
                OrderType::Ioc => 2,
                OrderType::Alo => 3,
            },
            price: self.price.to_string(),
            qty: self.qty.to_string(),
            nonce: self.nonce.to_string(),
            deadline: self.deadline.to_string(),
            leverage: self.leverage,
            owner: self.owner.to_hex(),
            agent_mode: self.agent_mode,
            delegation_id: self.delegation_id.clone(),
        }
    }
}

impl ParsedCancel {
    /// Rebuild the wire shape (test and client helper).
    pub fn to_payload(&self) -> CancelPayload {
        CancelPayload {
            order_id: self.order_id.to_string(),
            symbol: self.symbol.clone(),
            nonce: self.nonce.to_string(),
            owner: self.owner.to_hex(),
        }
    }
}

/// Decode a hex signature string into its 65 raw bytes.
pub(crate) fn decode_signature(s: &str) -> Result<[u8; 65], CodecError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped)
        .map_err(|_| CodecError::InvalidFormat("signature is not hex".to_string()))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| CodecError::BadLength {
        expected: 65,
        actual: len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_json() -> String {
        r#"{
            "type": "order",
            "order": {
                "symbol": "HYPL-USDC",
                "side": 1,
                "type": 1,
                "price": "50000",
                "qty": "100",
                "nonce": "5",
                "deadline": "0",
                "leverage": 10,
                "owner": "0x1111111111111111111111111111111111111111"
            },
            "signature": "0x00"
        }"#
        .to_string()
    }

    #[test]
    fn parses_order_envelope() {
        let env = Envelope::from_bytes(order_json().as_bytes()).unwrap();
        let Envelope::Order { order, .. } = env else {
            panic!("expected order envelope");
        };
        let parsed = order.parse().unwrap();
        assert_eq!(parsed.side, Side::Buy);
        assert_eq!(parsed.order_type, OrderType::Gtc);
        assert_eq!(parsed.price, 50_000);
        assert_eq!(parsed.qty, 100);
        assert_eq!(parsed.nonce, 5);
        assert!(!parsed.agent_mode);
    }

    #[test]
    fn parses_cancel_envelope() {
        let raw = br#"{
            "type": "cancel",
            "cancel": {
                "order_id": "42",
                "symbol": "HYPL-USDC",
                "nonce": "6",
                "owner": "0x2222222222222222222222222222222222222222"
            },
            "signature": "0x00"
        }"#;
        let env = Envelope::from_bytes(raw).unwrap();
        let Envelope::Cancel { cancel, .. } = env else {
            panic!("expected cancel envelope");
        };
        let parsed = cancel.parse().unwrap();
        assert_eq!(parsed.order_id, 42);
        assert_eq!(parsed.nonce, 6);
    }

    #[test]
    fn rejects_unknown_discriminator_and_bad_json() {
        assert!(matches!(
            Envelope::from_bytes(br#"{"type":"stake","stake":{}}"#),
            Err(CodecError::InvalidFormat(_))
        ));
        assert!(matches!(
            Envelope::from_bytes(b"garbage"),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_bad_numbers() {
        for bad in ["", "12.5", "-3", "1e9", "0x10", "18446744073709551616"] {
            assert!(
                matches!(parse_u64("price", bad), Err(CodecError::BadNumber { .. })),
                "expected BadNumber for {bad:?}"
            );
        }
        assert_eq!(parse_u64("price", "18446744073709551615").unwrap(), u64::MAX);
    }

    #[test]
    fn rejects_out_of_range_enums() {
        let env = Envelope::from_bytes(order_json().as_bytes()).unwrap();
        let Envelope::Order { order, .. } = env else {
            unreachable!()
        };
        let mut bad_side = order.clone();
        bad_side.side = 3;
        assert!(matches!(
            bad_side.parse(),
            Err(CodecError::InvalidFormat(_))
        ));
        let mut bad_type = order;
        bad_type.order_type = 0;
        assert!(matches!(
            bad_type.parse(),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn signature_length_is_enforced() {
        assert!(matches!(
            decode_signature(&format!("0x{}", "ab".repeat(64))),
            Err(CodecError::BadLength {
                expected: 65,
                actual: 64
            })
        ));
        assert!(decode_signature(&"ab".repeat(65)).is_ok());
        assert!(matches!(
            decode_signature("0xzz"),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn wire_round_trip_preserves_payload() {
        let env = Envelope::from_bytes(order_json().as_bytes()).unwrap();
        let bytes = env.to_bytes();
        let back = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(env, back);
    }
}
