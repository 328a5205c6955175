pub mod bindings;
pub mod engine;
pub mod error;
pub mod invariants;
pub mod records;
pub mod rows;
pub mod rpc_tools;
pub mod schema;
pub mod semantic;
pub mod settings;
pub mod violation;
pub mod vocab_store;
pub mod vocabulary;
