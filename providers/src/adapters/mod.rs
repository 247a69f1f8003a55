//! Backend Adapters
//!
//! Each module binds the abstract provider contract to one concrete
//! protocol: a remote REST relayer, an MPC confidential-token program, a ZK
//! circuit prover, and a note-based shielded pool.

pub mod arcium;
pub mod noir;
pub mod privacy_cash;
pub mod shadowwire;

pub use arcium::ArciumAdapter;
pub use noir::{CircuitBackend, CircuitDefinition, MockCircuitBackend, NoirAdapter};
pub use privacy_cash::PrivacyCashAdapter;
pub use shadowwire::ShadowWireAdapter;
