pub mod csv_source;
pub mod dir_sink;
pub mod memory_source;
