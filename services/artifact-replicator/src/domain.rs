// Domain layer modules
pub mod custom_resource_event;
pub mod lifecycle_response;
pub mod replication_request;

// Re-exports
pub use custom_resource_event::{CustomResourceEvent, EventParseError, RequestType};
pub use lifecycle_response::{
    physical_resource_id, CustomResourceResponse, LifecycleResponse, ResponseStatus,
};
pub use replication_request::{
    prefixed_keys, ReplicationRequest, ReplicationRequestError, RequestKind,
};
