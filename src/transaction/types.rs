/// Transaction types for TallyChain
use crate::crypto::Fingerprint;
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed balance used by the registry and by balance replay.
pub type Balance = i64;

/// Opaque identity of a party to a transfer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(String);

impl PartyId {
    /// Fresh random identity.
    pub fn generate() -> Self {
        PartyId(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        PartyId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable transfer of `amount` from `sender` to `receiver`.
///
/// Serializes with the field names of the persisted chain format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transaction_id")]
    pub id: String,
    #[serde(rename = "from_person")]
    pub sender: PartyId,
    #[serde(rename = "to_person")]
    pub receiver: PartyId,
    pub amount: u64,
}

impl Transaction {
    /// Build a record without any balance checks. Use
    /// [`Transaction::new_transfer`] for sender-initiated transfers.
    pub fn new(id: impl Into<String>, sender: PartyId, receiver: PartyId, amount: u64) -> Self {
        Transaction {
            id: id.into(),
            sender,
            receiver,
            amount,
        }
    }

    /// Deterministic text committed into the block's Merkle tree.
    ///
    /// Keys appear in a fixed order with `", "` and `": "` separators; string
    /// values use JSON escaping.
    pub fn fingerprint_input(&self) -> String {
        format!(
            "{{\"transaction_id\": {}, \"from_person\": {}, \"to_person\": {}, \"amount\": {}}}",
            json_string(&self.id),
            json_string(self.sender.as_str()),
            json_string(self.receiver.as_str()),
            self.amount
        )
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self.fingerprint_input().as_bytes())
    }

    /// Amount as a signed balance delta. Amounts beyond `Balance::MAX` can
    /// only come from a hand-edited file and are rejected.
    pub fn signed_amount(&self) -> Result<Balance, ChainError> {
        Balance::try_from(self.amount).map_err(|_| {
            ChainError::BalanceOverflow(format!(
                "amount {} of transaction {} does not fit a balance",
                self.amount, self.id
            ))
        })
    }
}

/// JSON string literal with every non-ASCII character written as a
/// lowercase `\uXXXX` escape (UTF-16 surrogate pairs above the BMP).
fn json_string(value: &str) -> String {
    // Serializing a &str cannot fail.
    let quoted = serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value));
    if quoted.is_ascii() {
        return quoted;
    }

    let mut escaped = String::with_capacity(quoted.len() + 8);
    let mut units = [0u16; 2];
    for c in quoted.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            for unit in c.encode_utf16(&mut units).iter() {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    escaped
}
