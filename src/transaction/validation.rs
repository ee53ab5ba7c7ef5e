/// Validation logic for transfers separated from type definitions
use crate::error::ChainError;
use crate::transaction::types::{Balance, PartyId, Transaction};

impl Transaction {
    /// Create a sender-initiated transfer, checking it against the sender's
    /// currently available balance.
    ///
    /// Checks run in order: insufficient balance, transfer to self, negative
    /// amount. The receiver is not resolved here; routing does that.
    pub fn new_transfer(
        sender: PartyId,
        receiver: PartyId,
        amount: i64,
        available: Balance,
    ) -> Result<Self, ChainError> {
        if amount > available {
            return Err(ChainError::InsufficientBalance {
                requested: amount.max(0) as u64,
                available,
            });
        }

        if sender == receiver {
            return Err(ChainError::SelfTransfer(sender.to_string()));
        }

        if amount < 0 {
            return Err(ChainError::NegativeAmount(amount));
        }

        Ok(Transaction::new(
            uuid::Uuid::new_v4().to_string(),
            sender,
            receiver,
            amount as u64,
        ))
    }
}
