//! Terminal feedback shown while a command runs.

mod pod_wait_spinner;

pub use self::pod_wait_spinner::PodWaitSpinner;
