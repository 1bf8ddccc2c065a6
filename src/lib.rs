// Library for tests to access modules

pub mod aggregation_cache;
pub mod config;
pub mod history_repo;
pub mod models;
pub mod routes;
pub mod status_repo;
pub mod tracker;
pub mod version;
pub mod worker;
