// Infrastructure layer modules
pub mod cfn_responder;
pub mod logging;
pub mod replicator_config;
pub mod s3_ops;

// Re-exports
pub use cfn_responder::{HttpCfnResponder, LifecycleResponder, ResponderError};
pub use logging::{init_logging, invocation_span};
pub use replicator_config::{ReplicatorConfig, ReplicatorConfigError};
pub use s3_ops::{AwsS3Ops, ObjectStoreError, ObjectStoreOps};
