pub(crate) mod fixtures;

mod state_tests;
