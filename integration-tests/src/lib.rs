/// In-process stand-in for the datapipeline API.
pub mod fake_backend;
