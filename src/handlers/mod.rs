pub mod datasets;
pub mod forms;
pub mod integration;
pub mod sheets;
