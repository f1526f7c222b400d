//! # Signed-Transaction Codec
//!
//! Client transactions arrive as JSON envelopes with a `type`
//! discriminator (`"order"` or `"cancel"`), big integers as decimal
//! strings, and a hex-encoded 65-byte recoverable signature. This crate
//! owns:
//!
//! - the envelope model and its strict parsing into integer domain types
//! - EIP-712 typed-data digests (orders) and domain-bound canonical-string
//!   digests (cancels, agent delegations)
//! - signature verification: recover the signer and compare to `owner`
//! - the agent delegation registry
//!
//! Replay protection (strictly increasing per-account nonces) is enforced
//! by the ledger during execution; this crate only carries the nonce.

pub mod delegation;
pub mod envelope;
pub mod errors;
pub mod typed_data;
pub mod verify;

pub use delegation::{Delegation, DelegationRegistry};
pub use envelope::{
    CancelPayload, Envelope, OrderPayload, ParsedCancel, ParsedOrder, ParsedTx,
};
pub use errors::CodecError;
pub use typed_data::{cancel_digest, delegation_digest, order_digest, TypedDomain};
pub use verify::{check_deadline, sign_cancel, sign_order, verify_envelope, VerifiedTx};
