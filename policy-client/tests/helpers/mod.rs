pub mod tests_controller;
