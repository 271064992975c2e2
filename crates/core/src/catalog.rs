use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    ChartSeries, GalleryImage, ImpactFigures, IntentCategory, ReferenceRecord, SiteStats,
    TeamMember,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate reference record id {0}")]
    DuplicateRecordId(u32),
}

/// All static site content: reference records, team, gallery and statistics.
///
/// Built once at start-up and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteCatalog {
    pub records: Vec<ReferenceRecord>,
    pub team_members: Vec<TeamMember>,
    pub gallery_images: Vec<GalleryImage>,
    pub stats: SiteStats,
}

impl SiteCatalog {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog: Self = serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for record in &self.records {
            if !seen.insert(record.id) {
                return Err(CatalogError::DuplicateRecordId(record.id));
            }
        }
        Ok(())
    }

    pub fn records_in(&self, category: IntentCategory) -> impl Iterator<Item = &ReferenceRecord> {
        self.records
            .iter()
            .filter(move |record| record.category == category)
    }

    pub fn builtin() -> Self {
        Self {
            records: vec![
                record(
                    1,
                    "Delhi Education Foundation",
                    IntentCategory::Education,
                    "Free Education, Mid-day Meals, School Supplies",
                    "011-28765432, 9876543210",
                    "Karol Bagh, Delhi - 110005",
                    "Provides free education with meals to underprivileged children",
                ),
                record(
                    2,
                    "Food For All NGO",
                    IntentCategory::Food,
                    "Daily Meal Distribution, Nutrition Programs",
                    "011-29876543, 9876543222",
                    "Lajpat Nagar, Delhi - 110024",
                    "Distributes free meals to slum dwellers daily",
                ),
                record(
                    3,
                    "Employment Generation Trust",
                    IntentCategory::Employment,
                    "Skill Training, Job Placement, Resume Building",
                    "011-31234567, 9876543233",
                    "Paharganj, Delhi - 110055",
                    "Vocational training and job placement services",
                ),
                record(
                    4,
                    "Health Care Delhi",
                    IntentCategory::Health,
                    "Medical Camps, Medicines, Hygiene Kits",
                    "011-29887766, 9876543244",
                    "Malviya Nagar, Delhi - 110017",
                    "Organizes free health checkups and distributes medicines",
                ),
            ],
            team_members: vec![
                member(1, "Bhavya Jha", "Team Leader & Concept Developer", "bhavya"),
                member(2, "Vritika", "Web Designer & Prototype Developer", "vritika"),
                member(3, "Aayushi", "Chatbot Developer & User Interaction", "aayushi"),
                member(4, "Ebbani", "Documentation & Logbook Maintenance", "ebbani"),
                member(5, "Shruti", "Data Research & Validation Support", "shruti"),
                member(6, "Avi", "Survey & Field Data Collection", "avi"),
            ],
            gallery_images: vec![
                image(1, "Community Education", "Children learning in slum schools"),
                image(2, "Food Distribution", "NGO distributing meals"),
                image(3, "Medical Camp", "Healthcare services in slums"),
                image(4, "Job Training", "Vocational skills workshop"),
                image(5, "Sanitation Project", "Clean water initiative"),
                image(6, "Community Meeting", "Planning development projects"),
            ],
            stats: SiteStats {
                education: series(
                    &["Currently Attending", "Never Attended", "Dropped Out"],
                    &[54.5, 21.3, 24.2],
                    &["#4CAF50", "#FF9800", "#F44336"],
                ),
                sanitation: series(
                    &["Private Toilet", "Community Toilet", "No Toilet"],
                    &[18.02, 60.79, 21.61],
                    &["#2196F3", "#9C27B0", "#FF5722"],
                ),
                impact: ImpactFigures {
                    families: 12_500,
                    ngos: 243,
                    volunteers: 567,
                    success_rate: 98,
                },
            },
        }
    }
}

impl Default for SiteCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn record(
    id: u32,
    name: &str,
    category: IntentCategory,
    services: &str,
    contact: &str,
    address: &str,
    description: &str,
) -> ReferenceRecord {
    ReferenceRecord {
        id,
        name: name.to_string(),
        category,
        services: services.to_string(),
        contact: contact.to_string(),
        address: address.to_string(),
        description: description.to_string(),
    }
}

fn member(id: u32, name: &str, role: &str, slug: &str) -> TeamMember {
    TeamMember {
        id,
        name: name.to_string(),
        role: role.to_string(),
        image: format!("/static/assets/team/{slug}.png"),
    }
}

fn image(id: u32, title: &str, desc: &str) -> GalleryImage {
    GalleryImage {
        id,
        title: title.to_string(),
        desc: desc.to_string(),
    }
}

fn series(labels: &[&str], data: &[f64], colors: &[&str]) -> ChartSeries {
    ChartSeries {
        labels: labels.iter().map(ToString::to_string).collect(),
        data: data.to_vec(),
        colors: colors.iter().map(ToString::to_string).collect(),
    }
}
