pub mod local;

pub use local::LocalDirectoryStorage;
