pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod layout;
pub mod popup;
pub mod scene;
pub mod texture;
pub mod tasks {
    pub mod loader;
    pub mod session;
}

pub use error::Error;
