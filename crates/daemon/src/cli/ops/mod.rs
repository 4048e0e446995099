pub mod book;
pub mod daemon;
pub mod health;
pub mod init;
pub mod keys;
pub mod version;

pub use book::Book;
pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use keys::Keys;
pub use version::Version;
