//! Strong-RSA accumulator fingerprinting for hierarchical,
//! multi-agent execution traces.
//!
//! An execution trace is a tree of agent actions. Each action folds
//! its identity into a running accumulator value `T` over `Z_M*`;
//! ordered sub-traces (`SwarmScope`) thread that fold sequentially,
//! concurrent fan-out (`ParallelScope`) exploits commutativity of
//! multiplication in `Z_M*` to merge branches order-independently.
//! Deep traces periodically fold into an archived `Snapshot` so `T`
//! never needs to track unbounded depth directly. A `StateSealer`
//! binds a final state to a payload digest; a `TraceInspector`
//! replays a claimed path against a sealed state to check it produced
//! that state.

pub mod accumulator;
pub mod bigint;
pub mod config;
pub mod context;
pub mod error;
pub mod meta;
pub mod primes;
pub mod registry;
pub mod scope;
pub mod sealer;
pub mod serialize;
pub mod verifier;

pub use accumulator::{AccumulatorStatus, Snapshot, SnapshotAccumulator};
pub use context::CryptoContext;
pub use error::{Result, SighaError};
pub use meta::HolographicMeta;
pub use registry::PrimeRegistry;
pub use scope::{compute_branch, ParallelScope, SwarmScope};
pub use sealer::{Seal, StateSealer};
pub use serialize::{decode_state, encode_state};
pub use verifier::TraceInspector;
