mod collaborator;
mod registry_index;

pub use collaborator::{Checkout, RegistryCollaborator};
pub use registry_index::RegistryIndex;

#[cfg(test)]
mod tests;
