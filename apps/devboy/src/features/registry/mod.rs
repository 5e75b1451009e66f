pub mod repo;

pub use repo::{RegistryError, RegistryStore};
