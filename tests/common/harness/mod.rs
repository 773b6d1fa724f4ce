//! Test harness for integration tests.
//!
//! Provides isolated library directories, direct file manipulation and CLI
//! assertion helpers using `assert_cmd`.

mod command;
mod env;

#[allow(unused_imports)]
pub use command::QuireCommand;
#[allow(unused_imports)]
pub use env::TestEnv;
