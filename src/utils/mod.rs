pub mod shutdown;
pub mod task_supervisor;
