pub mod command_executor;

pub use command_executor::{
    CommandResult, CommandRunner, ExecutorError, ShellRunner, ABNORMAL_EXIT,
    DEFAULT_COMMAND_TIMEOUT,
};
