// Extension system test module
#[cfg(test)]
mod broker_tests;
#[cfg(test)]
mod loader_tests;
