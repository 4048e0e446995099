pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Book, Daemon, Health, Init, Keys, Version};
