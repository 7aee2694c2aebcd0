pub mod filesystem;
pub mod resource;

pub use filesystem::FilesystemResourceProvider;
pub use resource::{
    InMemoryResourceProvider, ResourceError, ResourceProvider, ResourceStream, SharedResourceData,
};
