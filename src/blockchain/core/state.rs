use crate::error::ChainError;
use crate::transaction::{Balance, PartyId, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::chain::{Block, Blockchain};

/// Running balance of one party during a replay, with the lowest balance it
/// reached as a sender and the highest it reached as a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRange {
    pub current: Balance,
    pub min: Balance,
    pub max: Balance,
}

impl BalanceRange {
    pub fn starting_at(balance: Balance) -> Self {
        BalanceRange {
            current: balance,
            min: balance,
            max: balance,
        }
    }
}

/// Per-party balances produced by a replay, ordered by party id.
pub type BalanceSheet = BTreeMap<PartyId, BalanceRange>;

/// Source of the balance each party held before the first block.
pub trait StartingBalances {
    fn starting_balance(&self, party: &PartyId) -> Option<Balance>;
}

impl StartingBalances for HashMap<PartyId, Balance> {
    fn starting_balance(&self, party: &PartyId) -> Option<Balance> {
        self.get(party).copied()
    }
}

impl StartingBalances for BTreeMap<PartyId, Balance> {
    fn starting_balance(&self, party: &PartyId) -> Option<Balance> {
        self.get(party).copied()
    }
}

fn entry<'a, S: StartingBalances + ?Sized>(
    sheet: &'a mut BalanceSheet,
    party: &PartyId,
    starting: &S,
) -> Result<&'a mut BalanceRange, ChainError> {
    if !sheet.contains_key(party) {
        let balance = starting
            .starting_balance(party)
            .ok_or_else(|| ChainError::UnresolvedIdentity(party.to_string()))?;
        sheet.insert(party.clone(), BalanceRange::starting_at(balance));
    }
    sheet
        .get_mut(party)
        .ok_or_else(|| ChainError::UnresolvedIdentity(party.to_string()))
}

/// Fold one transaction into `sheet`.
pub fn apply_transaction<S: StartingBalances + ?Sized>(
    sheet: &mut BalanceSheet,
    tx: &Transaction,
    starting: &S,
) -> Result<(), ChainError> {
    let amount = tx.signed_amount()?;
    let overflow = |party: &PartyId| {
        ChainError::BalanceOverflow(format!(
            "replaying transaction {} overflows the balance of {}",
            tx.id, party
        ))
    };

    // Both parties are initialised before either balance moves.
    entry(sheet, &tx.receiver, starting)?;
    let sender = entry(sheet, &tx.sender, starting)?;
    sender.current = sender
        .current
        .checked_sub(amount)
        .ok_or_else(|| overflow(&tx.sender))?;
    sender.min = sender.min.min(sender.current);

    let receiver = entry(sheet, &tx.receiver, starting)?;
    receiver.current = receiver
        .current
        .checked_add(amount)
        .ok_or_else(|| overflow(&tx.receiver))?;
    receiver.max = receiver.max.max(receiver.current);

    Ok(())
}

/// Fold every transaction of `block`, in order, into `sheet`.
pub fn apply_block<S: StartingBalances + ?Sized>(
    sheet: &mut BalanceSheet,
    block: &Block,
    starting: &S,
) -> Result<(), ChainError> {
    for tx in &block.transactions {
        apply_transaction(sheet, tx, starting)?;
    }
    Ok(())
}

impl Blockchain {
    /// Replay blocks `0..=up_to_index` from scratch and report each party's
    /// current, minimum and maximum balance.
    pub fn replay_balances<S: StartingBalances + ?Sized>(
        &self,
        up_to_index: usize,
        starting: &S,
    ) -> Result<BalanceSheet, ChainError> {
        if up_to_index >= self.blocks.len() {
            return Err(ChainError::IndexOutOfRange {
                index: up_to_index,
                len: self.blocks.len(),
            });
        }

        let mut sheet = BalanceSheet::new();
        for block in &self.blocks[..=up_to_index] {
            apply_block(&mut sheet, block, starting)?;
        }
        Ok(sheet)
    }
}
