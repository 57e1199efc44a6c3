//! Nacos config backend
//!
//! Talks to the Nacos v1 open API over HTTP. Each tenant/project maps to a
//! Nacos namespace that is provisioned together with its principals.

pub mod backend;
pub mod client;
pub mod mapper;
pub mod types;

pub use backend::NacosConfigBackend;
pub use client::{ConfigAddress, NacosClient};
pub use mapper::NacosKeyMapper;
