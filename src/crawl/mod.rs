//! Activity crawl: fetchers, repository selection and the concurrent
//! orchestrator that assembles an [`ActivityAggregate`].

pub mod fetchers;
pub mod model;
pub mod orchestrator;
pub mod patch;
pub mod select;

pub use model::ActivityAggregate;
pub use orchestrator::Crawler;
