use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::catalog::SiteCatalog;
use crate::intent::{classify_intent, response_text};
use crate::models::{ChatReply, IntentCategory, ReferenceRecord};

pub const MAX_REFERENCE_RECORDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Message is required")]
    EmptyMessage,
}

/// Records to show alongside a reply. `General` gets the head of the whole
/// list; every other intent gets its own category only.
pub fn select_records(
    intent: IntentCategory,
    records: &[ReferenceRecord],
) -> Vec<ReferenceRecord> {
    match intent {
        IntentCategory::General => records.iter().take(MAX_REFERENCE_RECORDS).cloned().collect(),
        _ => records
            .iter()
            .filter(|record| record.category == intent)
            .take(MAX_REFERENCE_RECORDS)
            .cloned()
            .collect(),
    }
}

#[derive(Debug, Clone)]
pub struct Responder {
    catalog: Arc<SiteCatalog>,
}

impl Responder {
    pub fn new(catalog: Arc<SiteCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SiteCatalog {
        &self.catalog
    }

    pub fn respond(&self, message: &str) -> Result<ChatReply, ChatError> {
        self.respond_at(message, Utc::now())
    }

    pub fn respond_at(&self, message: &str, now: DateTime<Utc>) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let intent = classify_intent(message);
        Ok(ChatReply {
            intent,
            response: response_text(intent),
            records: select_records(intent, &self.catalog.records),
            timestamp: now,
        })
    }
}
