pub mod constants;
pub mod errors;
pub mod file_operations;
pub mod logger;

use std::thread;

/// Name of the current thread, used as the prefix of most log lines.
pub(crate) fn thread_name() -> String {
    thread::current().name().unwrap_or_default().to_string()
}
