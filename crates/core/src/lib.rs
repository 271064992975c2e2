pub mod catalog;
pub mod intent;
pub mod models;
pub mod responder;

pub use catalog::{CatalogError, SiteCatalog};
pub use intent::{classify_intent, response_text, KEYWORD_TABLE};
pub use models::*;
pub use responder::{select_records, ChatError, Responder, MAX_REFERENCE_RECORDS};
