pub mod apps;
pub mod kv;
pub mod partition;
pub mod rpc;
pub mod storage;
pub mod task;

pub use apps::{app_by_name, InvertedIndex, MapReduceApp, WordCount};
pub use kv::KeyValue;
pub use partition::{bucket_by_partition, ihash, partition_for};
pub use rpc::{
    FetchStatus, GetJobRequest, GetJobResponse, IsDoneResponse, JobStatusResponse, Phase,
    ReportJobRequest, ReportJobResponse, TaskCounts, TaskView,
};
pub use storage::{
    output_file_name, partition_file_name, write_output_atomically, IntermediateStore,
    LocalIntermediateStore, StoreError,
};
pub use task::{TaskDescriptor, TaskId, TaskKind, TaskState, WorkerId};
