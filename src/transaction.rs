//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;

    fn party(s: &str) -> PartyId {
        PartyId::new(s)
    }

    #[test]
    fn test_fingerprint_input_layout() {
        let tx = Transaction::new("t-1", party("alice"), party("bob"), 1500);
        assert_eq!(
            tx.fingerprint_input(),
            r#"{"transaction_id": "t-1", "from_person": "alice", "to_person": "bob", "amount": 1500}"#
        );
    }

    #[test]
    fn test_fingerprint_input_escapes_strings() {
        let tx = Transaction::new("quote\"id", party("a\\b"), party("c"), 0);
        assert!(tx.fingerprint_input().contains(r#""transaction_id": "quote\"id""#));
        assert!(tx.fingerprint_input().contains(r#""from_person": "a\\b""#));
    }

    #[test]
    fn test_fingerprint_tracks_amount() {
        let mut tx = Transaction::new("t-1", party("alice"), party("bob"), 10);
        let before = tx.fingerprint();
        tx.amount = 11;
        assert_ne!(before, tx.fingerprint());
    }

    #[test]
    fn test_transfer_success() {
        let tx = Transaction::new_transfer(party("alice"), party("bob"), 100, 500).unwrap();
        assert_eq!(tx.amount, 100);
        assert_eq!(tx.sender, party("alice"));
        assert_eq!(tx.receiver, party("bob"));
        assert_eq!(tx.id.len(), 36);
    }

    #[test]
    fn test_transfer_ids_are_unique() {
        let a = Transaction::new_transfer(party("alice"), party("bob"), 1, 10).unwrap();
        let b = Transaction::new_transfer(party("alice"), party("bob"), 1, 10).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let result = Transaction::new_transfer(party("alice"), party("bob"), 501, 500);
        assert_eq!(
            result,
            Err(ChainError::InsufficientBalance {
                requested: 501,
                available: 500
            })
        );
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let result = Transaction::new_transfer(party("alice"), party("alice"), 1, 500);
        assert!(matches!(result, Err(ChainError::SelfTransfer(_))));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = Transaction::new_transfer(party("alice"), party("bob"), -5, 500);
        assert_eq!(result, Err(ChainError::NegativeAmount(-5)));
    }

    #[test]
    fn test_zero_amount_allowed() {
        assert!(Transaction::new_transfer(party("alice"), party("bob"), 0, 0).is_ok());
    }

    #[test]
    fn test_serde_uses_persisted_field_names() {
        let tx = Transaction::new("t-9", party("a"), party("b"), 7);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["transaction_id"], "t-9");
        assert_eq!(json["from_person"], "a");
        assert_eq!(json["to_person"], "b");
        assert_eq!(json["amount"], 7);
    }

    #[test]
    fn test_fingerprint_input_escapes_non_ascii() {
        let tx = Transaction::new("t-é", party("Zoë"), party("😀"), 1);
        assert_eq!(
            tx.fingerprint_input(),
            r#"{"transaction_id": "t-\u00e9", "from_person": "Zo\u00eb", "to_person": "\ud83d\ude00", "amount": 1}"#
        );
    }

    #[test]
    fn test_signed_amount_rejects_out_of_range() {
        let tx = Transaction::new("t-1", party("alice"), party("bob"), i64::MAX as u64);
        assert_eq!(tx.signed_amount(), Ok(i64::MAX));

        let too_big = Transaction::new("t-2", party("alice"), party("bob"), i64::MAX as u64 + 1);
        assert!(matches!(too_big.signed_amount(), Err(ChainError::BalanceOverflow(_))));
    }
}
