mod identity;
mod seed;
mod store;

pub use identity::MemoryIdentityProvider;
pub use seed::{CatalogSeed, CourseSeed, InstructorSeed};
pub use store::MemoryStore;
