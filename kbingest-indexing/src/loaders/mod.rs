//! Loaders are the starting point of the pipeline; they emit one node per source file.
pub mod file_loader;

pub use file_loader::FileLoader;
