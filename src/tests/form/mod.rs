mod controller_tests;
mod selector_tests;
