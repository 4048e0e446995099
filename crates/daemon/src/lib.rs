// Service modules (daemon functionality)
pub mod books;
pub mod http_server;
pub mod process;
pub mod service_config;
pub mod service_state;

// Client side of the key exchange
pub mod client_session;

// App state (configuration, paths)
pub mod state;

pub use client_session::{ClientError, ClientSession, SessionError};
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use state::{AppConfig, AppState, StateError};
