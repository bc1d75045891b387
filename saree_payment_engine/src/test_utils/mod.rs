mod prepare_env;

pub use prepare_env::{create_database, prepare_test_env, TestDatabase};
