//! etcd v3 config backend
//!
//! Keys are laid out under a configurable root, provisioning goes through the
//! etcd auth RPCs and history is reconstructed from MVCC revisions.

pub mod access;
pub mod backend;
pub mod mapper;
pub mod transport;

pub use access::EtcdAccessControl;
pub use backend::EtcdConfigBackend;
pub use mapper::{prefix_range_end, EtcdKeyMapper};
#[cfg(feature = "etcd")]
pub use transport::EtcdClientTransport;
pub use transport::{EtcdTransport, KvRecord};
