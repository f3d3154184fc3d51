pub mod caller;
pub mod dispatch;
pub mod library;

pub use caller::resolve_caller_environment;
pub use dispatch::{stop_bad_element_length, stop_bad_element_type, stop_bad_type};
