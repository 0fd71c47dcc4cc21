//! Core types for NameGuard

use serde::{Deserialize, Serialize};

/// Classification of the name content found in a payment comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameCategory {
    /// Surname, given name, and patronymic
    FullName,
    /// Surname and given name
    SurnameName,
    /// Surname alone
    SurnameOnly,
    /// Given name or patronymic alone, no surname
    NameOnly,
    /// No person name present
    NoName,
}

impl NameCategory {
    /// Whether this category represents a detected name
    pub fn has_name(&self) -> bool {
        !matches!(self, Self::NoName)
    }

    /// Completeness rank used to compare results (higher is more complete)
    pub fn completeness(&self) -> u8 {
        match self {
            Self::FullName => 4,
            Self::SurnameName => 3,
            Self::SurnameOnly => 2,
            Self::NameOnly => 1,
            Self::NoName => 0,
        }
    }

    /// Wire name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullName => "FULL_NAME",
            Self::SurnameName => "SURNAME_NAME",
            Self::SurnameOnly => "SURNAME_ONLY",
            Self::NameOnly => "NAME_ONLY",
            Self::NoName => "NO_NAME",
        }
    }
}

/// Final output of the detection pipeline for one comment
///
/// Invariant: `has_name == (category != NoName)` and `detected_name` is
/// present iff `has_name`. Use the constructors to preserve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether a person name was found
    pub has_name: bool,

    /// Name category
    pub category: NameCategory,

    /// The detected name text, present iff `has_name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_name: Option<String>,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Tier that produced the decision (1 = regex, 2 = NER, 3 = verifier)
    pub tier_used: u8,

    /// Sub-tier identifier (e.g. which adapter or backend decided)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_detail: Option<String>,

    /// Wall-clock processing time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,

    /// Sanctions screening outcome, attached when a name was detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanctions_check: Option<SanctionsCheckResult>,
}

impl DetectionResult {
    /// Create a no-name result
    pub fn no_name(confidence: f32, tier_used: u8) -> Self {
        Self {
            has_name: false,
            category: NameCategory::NoName,
            detected_name: None,
            confidence,
            tier_used,
            tier_detail: None,
            processing_time_ms: None,
            sanctions_check: None,
        }
    }

    /// Create a detected-name result
    ///
    /// `category` must not be `NoName`; callers that concluded no name is
    /// present use [`DetectionResult::no_name`] instead.
    pub fn detected(
        category: NameCategory,
        name: impl Into<String>,
        confidence: f32,
        tier_used: u8,
    ) -> Self {
        debug_assert!(category.has_name());
        Self {
            has_name: true,
            category,
            detected_name: Some(name.into()),
            confidence,
            tier_used,
            tier_detail: None,
            processing_time_ms: None,
            sanctions_check: None,
        }
    }

    /// Set the sub-tier identifier
    pub fn with_tier_detail(mut self, detail: impl Into<String>) -> Self {
        self.tier_detail = Some(detail.into());
        self
    }

    /// Set the processing time
    pub fn with_timing(mut self, elapsed_ms: f64) -> Self {
        self.processing_time_ms = Some(elapsed_ms);
        self
    }

    /// Attach a sanctions screening outcome
    pub fn with_sanctions_check(mut self, check: SanctionsCheckResult) -> Self {
        self.sanctions_check = Some(check);
        self
    }
}

/// Segmented parts of an extracted name, produced by every extraction path
/// before being folded into a [`DetectionResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameParts {
    /// Surname, when identified
    pub surname: Option<String>,

    /// Given name, when identified
    pub first_name: Option<String>,

    /// Patronymic, when identified
    pub patronymic: Option<String>,

    /// The source text the parts were extracted from
    pub raw_text: String,

    /// Extraction confidence in [0, 1]
    pub confidence: f32,
}

impl NameParts {
    /// Create name parts from raw text with a confidence score
    pub fn new(raw_text: impl Into<String>, confidence: f32) -> Self {
        Self {
            surname: None,
            first_name: None,
            patronymic: None,
            raw_text: raw_text.into(),
            confidence,
        }
    }

    /// Number of filled slots
    pub fn filled_slots(&self) -> usize {
        [
            self.surname.is_some(),
            self.first_name.is_some(),
            self.patronymic.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }

    /// Whether all three slots are filled
    pub fn is_complete(&self) -> bool {
        self.filled_slots() == 3
    }
}

/// One row of the sanctions registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanctionsRecord {
    /// Registry identifier
    pub sid: String,

    /// Canonical name
    pub name: String,

    /// Transliterated name
    pub translit_name: String,

    /// Alternative spellings
    pub aliases: Vec<String>,

    /// Sanction status
    pub status: SanctionsStatus,
}

/// Status of a sanctions registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanctionsStatus {
    Active,
    Expired,
    Unknown,
}

impl SanctionsStatus {
    /// Parse a status column value, tolerant to case and unknown values
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "active" | "чинний" => Self::Active,
            "expired" | "втратив чинність" => Self::Expired,
            _ => Self::Unknown,
        }
    }

    /// Wire name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

/// How a detected name matched the sanctions registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Partial,
    None,
}

/// Outcome of screening a detected name against the sanctions registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanctionsCheckResult {
    /// Whether screening was performed at all
    pub checked: bool,

    /// Whether a registry match was found
    pub found: bool,

    /// Kind of match
    pub match_type: MatchType,

    /// The matched registry name, when found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,

    /// Status of the matched record, when found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SanctionsStatus>,

    /// Match confidence in [0, 1]
    pub confidence: f32,
}

impl SanctionsCheckResult {
    /// Screening was not performed (registry unavailable)
    pub fn not_checked() -> Self {
        Self {
            checked: false,
            found: false,
            match_type: MatchType::None,
            matched_name: None,
            status: None,
            confidence: 0.0,
        }
    }

    /// Screening ran and found nothing
    pub fn not_found() -> Self {
        Self {
            checked: true,
            found: false,
            match_type: MatchType::None,
            matched_name: None,
            status: None,
            confidence: 0.0,
        }
    }

    /// Exact full-name or alias match
    pub fn exact(matched_name: impl Into<String>, status: SanctionsStatus) -> Self {
        Self {
            checked: true,
            found: true,
            match_type: MatchType::Exact,
            matched_name: Some(matched_name.into()),
            status: Some(status),
            confidence: 1.0,
        }
    }

    /// Partial token-overlap match
    pub fn partial(
        matched_name: impl Into<String>,
        status: SanctionsStatus,
        confidence: f32,
    ) -> Self {
        Self {
            checked: true,
            found: true,
            match_type: MatchType::Partial,
            matched_name: Some(matched_name.into()),
            status: Some(status),
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_has_name() {
        assert!(NameCategory::FullName.has_name());
        assert!(NameCategory::NameOnly.has_name());
        assert!(!NameCategory::NoName.has_name());
    }

    #[test]
    fn test_completeness_ordering() {
        assert!(NameCategory::FullName.completeness() > NameCategory::SurnameName.completeness());
        assert!(NameCategory::SurnameName.completeness() > NameCategory::SurnameOnly.completeness());
        assert!(NameCategory::SurnameOnly.completeness() > NameCategory::NameOnly.completeness());
        assert!(NameCategory::NameOnly.completeness() > NameCategory::NoName.completeness());
    }

    #[test]
    fn test_result_invariant() {
        let none = DetectionResult::no_name(1.0, 1);
        assert!(!none.has_name);
        assert_eq!(none.category, NameCategory::NoName);
        assert!(none.detected_name.is_none());

        let found = DetectionResult::detected(NameCategory::FullName, "Булатов Руслан Рустемович", 0.95, 2);
        assert!(found.has_name);
        assert_eq!(found.detected_name.as_deref(), Some("Булатов Руслан Рустемович"));
    }

    #[test]
    fn test_category_wire_format() {
        let json = serde_json::to_string(&NameCategory::FullName).unwrap();
        assert_eq!(json, "\"FULL_NAME\"");
        let json = serde_json::to_string(&NameCategory::NoName).unwrap();
        assert_eq!(json, "\"NO_NAME\"");

        let parsed: NameCategory = serde_json::from_str("\"SURNAME_NAME\"").unwrap();
        assert_eq!(parsed, NameCategory::SurnameName);
    }

    #[test]
    fn test_name_parts_slots() {
        let mut parts = NameParts::new("Іванов Петро", 0.8);
        parts.surname = Some("Іванов".to_string());
        parts.first_name = Some("Петро".to_string());
        assert_eq!(parts.filled_slots(), 2);
        assert!(!parts.is_complete());

        parts.patronymic = Some("Олександрович".to_string());
        assert!(parts.is_complete());
    }

    #[test]
    fn test_sanctions_status_parse() {
        assert_eq!(SanctionsStatus::parse("Active"), SanctionsStatus::Active);
        assert_eq!(SanctionsStatus::parse("expired"), SanctionsStatus::Expired);
        assert_eq!(SanctionsStatus::parse("???"), SanctionsStatus::Unknown);
    }

    #[test]
    fn test_sanctions_check_constructors() {
        let exact = SanctionsCheckResult::exact("Булатов Руслан Рустемович", SanctionsStatus::Active);
        assert!(exact.found);
        assert_eq!(exact.match_type, MatchType::Exact);
        assert_eq!(exact.confidence, 1.0);

        let missing = SanctionsCheckResult::not_found();
        assert!(missing.checked);
        assert!(!missing.found);

        let skipped = SanctionsCheckResult::not_checked();
        assert!(!skipped.checked);
    }
}
