//! Services shared by every TomTimer client

mod tasks;

pub use tasks::TaskService;
