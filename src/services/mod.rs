pub mod catalog;
pub mod feeds;
pub mod providers;
pub mod recommendations;
pub mod refresher;
pub mod tracking;

pub use providers::{MetadataProvider, TmdbProvider};
pub use refresher::{Refresher, RefresherHandle};
