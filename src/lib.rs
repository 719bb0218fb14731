pub mod config;
pub mod download;
pub mod http_client;
pub mod orchestrator;
pub mod protocol;
pub mod selection;
pub mod state;
pub mod transport;
pub mod upload;
pub mod viewer;
pub mod worker;
