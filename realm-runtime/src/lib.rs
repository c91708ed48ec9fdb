//! Realm runtime: task dispatch, realm hierarchy and lifecycle operations.
//!
//! Open a [`RealmContext`] once per process, open realms through it, and
//! [`connect`](Realm::connect) them before dispatching with
//! [`run_and_wait`](Realm::run_and_wait).

mod context;
pub mod core_tasks;
mod error;
pub mod lifecycle;
mod realm;
pub mod registry;
pub mod task;

pub use context::RealmContext;
pub use core_tasks::CoreTasks;
pub use error::RuntimeError;
pub use lifecycle::{
    create, fork, merge, mount, CreateOptions, ForkOptions, MergeOptions, MergedRealm, RealmRef,
    RealmScaffold, ScaffoldFile,
};
pub use realm::{ConnectOptions, Realm, RealmInfo, SuperRealm, OPT_DIR};
pub use registry::{LoadPolicy, TaskDescriptor, TaskEntry, TaskOrigin, TaskRegistry};
pub use task::{task_fn, CommandTask, Task, TaskContext, UnboundTask};
