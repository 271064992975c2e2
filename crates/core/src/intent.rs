use crate::models::IntentCategory;

/// Trigger substrings per category. Order is precedence: the first category
/// with a matching trigger wins.
pub const KEYWORD_TABLE: &[(IntentCategory, &[&str])] = &[
    (
        IntentCategory::Education,
        &[
            "school",
            "education",
            "study",
            "learn",
            "student",
            "teacher",
            "book",
            "class",
        ],
    ),
    (
        IntentCategory::Food,
        &[
            "food", "hunger", "meal", "eat", "hungry", "starving", "rice", "bread",
        ],
    ),
    (
        IntentCategory::Employment,
        &[
            "job",
            "work",
            "employment",
            "salary",
            "wage",
            "income",
            "earn",
        ],
    ),
    (
        IntentCategory::Health,
        &[
            "health", "doctor", "medicine", "sick", "hospital", "clinic", "fever",
        ],
    ),
    (
        IntentCategory::Housing,
        &["house", "home", "shelter", "live", "room", "stay", "rent"],
    ),
    (
        IntentCategory::Sanitation,
        &[
            "toilet",
            "bathroom",
            "water",
            "clean",
            "sanitation",
            "hygiene",
        ],
    ),
];

pub fn classify_intent(message: &str) -> IntentCategory {
    let lower = message.to_lowercase();

    KEYWORD_TABLE
        .iter()
        .find(|(_, triggers)| contains_any(&lower, triggers))
        .map(|(category, _)| *category)
        .unwrap_or(IntentCategory::General)
}

pub fn response_text(intent: IntentCategory) -> &'static str {
    match intent {
        IntentCategory::Education => {
            "I found educational NGOs that can help with schooling and mid-day meals."
        }
        IntentCategory::Food => "Here are food aid organizations that provide meals.",
        IntentCategory::Employment => {
            "These organizations offer job training and placement services."
        }
        IntentCategory::Health => "I found healthcare NGOs that provide medical services.",
        IntentCategory::Housing => "These organizations can help with shelter and housing.",
        IntentCategory::Sanitation => "Here are NGOs working on clean water and sanitation.",
        IntentCategory::General => "I can help you connect with NGOs for various services.",
    }
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
