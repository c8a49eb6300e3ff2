pub mod data_io;
pub mod duration;
pub mod extract;
pub mod fetch;
pub mod index;
pub mod location;
pub mod runtime;
pub mod scrape;
pub mod types;
