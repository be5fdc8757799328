//! The consumer side of the protocol.
//!
//! Runs outside the custodian's trust boundary: it splits the master secret,
//! keeps one share on the device, hands one to the user and seals the third
//! for the custodian over a fresh session.

pub mod device;
pub mod orchestrator;
pub mod sharing;
pub mod transport;
pub mod wallet;

pub use device::{DeviceShareStore, MemoryDeviceStore};
pub use orchestrator::{RecoveryClient, RecoveryExport};
pub use sharing::{SecretSharing, ShamirSharing};
pub use transport::{CustodianTransport, HttpCustodian, LocalCustodian, SessionHandshake};
pub use wallet::Wallet;
