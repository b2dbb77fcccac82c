mod column;
mod partition;
mod types;

pub use column::{Column, FieldMode};
pub use partition::{PartitionConfig, PartitionType};
pub use types::{BqType, HostType};
