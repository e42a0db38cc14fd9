pub mod amqp;
pub mod bus;
pub mod event;
pub mod memory;
pub mod valkey;
#[cfg(test)]
mod tests;

pub use bus::{connect_sign_bus, SignBus};
pub use event::SignUpdate;
pub use memory::MemoryBus;
