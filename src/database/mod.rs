pub mod connection;
pub mod subject;
