use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Education,
    Food,
    Employment,
    Health,
    Housing,
    Sanitation,
    General,
}

impl IntentCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "education" => Some(Self::Education),
            "food" => Some(Self::Food),
            "employment" => Some(Self::Employment),
            "health" => Some(Self::Health),
            "housing" => Some(Self::Housing),
            "sanitation" => Some(Self::Sanitation),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Education => "education",
            Self::Food => "food",
            Self::Employment => "employment",
            Self::Health => "health",
            Self::Housing => "housing",
            Self::Sanitation => "sanitation",
            Self::General => "general",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An aid organisation surfaced to users as a chat reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: u32,
    pub name: String,
    pub category: IntentCategory,
    pub services: String,
    pub contact: String,
    pub address: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: u32,
    pub name: String,
    pub role: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: u32,
    pub title: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactFigures {
    pub families: u32,
    pub ngos: u32,
    pub volunteers: u32,
    pub success_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteStats {
    pub education: ChartSeries,
    pub sanitation: ChartSeries,
    pub impact: ImpactFigures,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub intent: IntentCategory,
    pub response: &'static str,
    #[serde(rename = "ngos")]
    pub records: Vec<ReferenceRecord>,
    pub timestamp: DateTime<Utc>,
}
