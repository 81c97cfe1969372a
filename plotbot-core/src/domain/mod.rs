//! Domain types: time ranges, the data-type schema table, and instances.

pub mod datatype;
pub mod instance;
pub mod time;

pub use datatype::{
    CoverageGranularity, DataTypeKey, DataTypeSpec, FieldSpec, UnknownDataType, VectorSpec,
};
pub use instance::{DataTypeInstance, Field, InstanceError, MergeStats, RawData};
pub use time::{
    epoch_nanos, epoch_seconds, from_epoch_nanos, parse_time, to_epoch_seconds, TimeError,
    TimeRange,
};
