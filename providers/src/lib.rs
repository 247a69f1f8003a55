//! Veilkit Providers
//!
//! One uniform interface over heterogeneous privacy backends.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Application                              │
//! │                            │                                    │
//! │                 SelectionCriteria / requests                    │
//! │                            ▼                                    │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                     ProviderRouter                        │  │
//! │  │        filter → estimate → constrain → score              │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │        │              │              │              │           │
//! │        ▼              ▼              ▼              ▼           │
//! │  ┌──────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐    │
//! │  │ShadowWire│  │  Arcium   │  │PrivacyCash │  │   Noir    │    │
//! │  │ REST +   │  │ MPC/C-SPL │  │ note pool  │  │ ZK proofs │    │
//! │  │ relayer  │  │ encrypted │  │ + Merkle   │  │ + circuits│    │
//! │  └──────────┘  └───────────┘  └────────────┘  └───────────┘    │
//! │        │              │              │              │           │
//! │        ▼              ▼              ▼              ▼           │
//! │     HTTP API       Chain          Chain + indexer  Chain        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wallet signing and chain submission are capabilities injected by the
//! application; every adapter validates requests against the shared token
//! registry and its own capability matrix before touching a collaborator.

pub mod adapter;
pub mod adapters;
pub mod error;
pub mod registry;
pub mod retry;
pub mod router;
pub mod types;
pub mod wallet;

pub use adapter::{precheck, PrivacyProvider};
pub use adapters::{
    ArciumAdapter, CircuitBackend, CircuitDefinition, MockCircuitBackend, NoirAdapter,
    PrivacyCashAdapter, ShadowWireAdapter,
};
pub use error::{ExclusionReason, ProviderError, Result};
pub use registry::{FeeTable, TokenInfo, TokenRegistry};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use router::ProviderRouter;
pub use types::{
    Balance, CostEstimate, DepositRequest, EstimateRequest, OperationReceipt, PrivacyLevel,
    ProofBundle, ProveRequest, ProviderId, ScoredCandidate, SelectionCriteria, SelectionResult,
    TokenSupport, TransferRequest, WithdrawRequest,
};
pub use wallet::{Chain, Wallet};
