/// Data model shared by every score store backend.
pub mod models;
/// Score store contract and its backends.
pub mod score_store;
/// Storage error taxonomy.
pub mod storage;
