//! On-chain game contract interaction: call encoding, stats decoding, and
//! the default [`ActionEncoder`](crate::external::ActionEncoder)
//! implementation.
//!
//! Always available — encoding is pure and WASM-safe. Transport lives
//! behind the `rpc` feature in [`crate::rpc`].

pub mod calls;
pub mod constants;

pub use calls::{
    decode_player_stats, encode_get_player_stats, encode_perform_action, GameCallEncoder,
};
