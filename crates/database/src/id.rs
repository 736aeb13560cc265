//! Record id generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Produces ids for records inserted without one.
pub trait IdGenerator {
    fn generate(&mut self) -> String;
}

/// 16 random bytes from the OS, hex encoded (32 characters).
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&mut self) -> String {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

/// `<prefix><n>` with `n` counting from 1. Deterministic, for tests and
/// fixtures.
#[derive(Clone, Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

impl<F: FnMut() -> String> IdGenerator for F {
    fn generate(&mut self) -> String {
        self()
    }
}
