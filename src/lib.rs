//! TallyChain - A minimal append-only ledger with Merkle commitments and proof-of-work
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, chain validation and balance replay
//! - [`transaction`] - Transfer types and creation checks
//!
//! ## Commitments & Consensus
//! - [`merkle`] - Merkle commitment tree
//! - [`miner`] - Cancellable, budgeted proof-of-work
//! - [`crypto`] - SHA-256 fingerprints
//!
//! ## State Management
//! - [`registry`] - Party registry with live balances
//! - [`persistence`] - JSON chain storage
//! - [`node`] - Node context tying ledger and registry together
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Commitments & Consensus
// ============================================================================
pub mod crypto;
pub mod merkle;
pub mod miner;

// ============================================================================
// State Management
// ============================================================================
pub mod node;
pub mod persistence;
pub mod registry;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
