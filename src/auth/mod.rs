//! Token lifecycle: storage, validation, refresh, and first-time grants.

pub mod device_code;
pub mod flow;
pub mod record;
pub mod refresh;
pub mod secret;
pub mod session;
pub mod store;

pub use device_code::{DeviceCodePoll, DeviceCodeSession};
pub use flow::{AuthorizationFlow, FlowFailure, FlowState};
pub use record::{TokenRecord, TokenStatus};
pub use refresh::RefreshCoordinator;
pub use secret::SecretString;
pub use session::{GrantStatus, SessionManager};
pub use store::{CredentialStore, FileCredentialStore};
