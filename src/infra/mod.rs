pub mod bulk_export;
pub mod dom;
pub mod http;
pub mod openai;
pub mod query_api;
pub mod store;
