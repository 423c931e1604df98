pub mod args;
pub mod config;
pub mod html;
pub mod http_client;
pub mod logging;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod paginate;
pub mod predict;
pub mod rating;
pub mod scrape;
pub mod session;
pub mod store;
