pub mod errors;
pub mod graphql;
pub mod json_schema;
pub mod server;
pub(crate) mod tools;
