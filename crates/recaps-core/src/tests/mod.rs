mod fixtures;

mod hook_tests;
mod workflow_tests;
