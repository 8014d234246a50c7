use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ApiError;
use crate::users::dto::{InterestsInput, NumberOrText, Patch, RoommateParams, UpdateProfileRequest};

pub const ALLOWED_AVAILABILITY: [&str; 3] = ["looking", "matched", "not-looking"];
pub const ALLOWED_GENDERS: [&str; 3] = ["male", "female", "other"];
pub const MAX_INTERESTS: usize = 10;
pub const MAX_TEXT_LEN: usize = 500;
pub const AGE_MIN: i32 = 18;
pub const AGE_MAX: i32 = 80;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// The set of columns a profile update wants to touch. Outer `None` means
/// "leave the column alone"; for the nullable columns an inner `None` means
/// "clear it".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Option<String>>,
    pub age: Option<Option<i32>>,
    pub city: Option<String>,
    pub budget: Option<Option<f64>>,
    pub bio: Option<String>,
    pub preferences: Option<String>,
    pub availability: Option<String>,
    pub interests: Option<Vec<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.gender.is_none()
            && self.age.is_none()
            && self.city.is_none()
            && self.budget.is_none()
            && self.bio.is_none()
            && self.preferences.is_none()
            && self.availability.is_none()
            && self.interests.is_none()
    }
}

/// Apply the per-field normalization rules of the profile-update contract
/// and re-validate the result against the entity invariants.
///
/// Field absent => untouched. String fields: null untouched, otherwise
/// trimmed and set. Gender: empty string clears to null. Availability:
/// unknown values are ignored, empty falls back to "looking". Age/budget:
/// empty string or null clears, non-numeric text is silently dropped.
/// Interests: list or comma-separated string; entries trimmed, empties
/// removed, capped at ten.
pub fn normalize_update(payload: UpdateProfileRequest) -> Result<ProfileChanges, ApiError> {
    let mut changes = ProfileChanges::default();

    changes.name = trimmed_string(payload.name);
    changes.phone = trimmed_string(payload.phone);
    changes.city = trimmed_string(payload.city);
    changes.bio = trimmed_string(payload.bio);
    changes.preferences = trimmed_string(payload.preferences);

    if let Patch::Value(value) = payload.gender {
        let value = value.trim();
        if value.is_empty() {
            changes.gender = Some(None);
        } else if ALLOWED_GENDERS.contains(&value) {
            changes.gender = Some(Some(value.to_string()));
        } else {
            return Err(ApiError::validation(
                "Gender must be one of male, female or other",
            ));
        }
    }

    if let Patch::Value(value) = payload.availability {
        let value = value.trim();
        if value.is_empty() {
            changes.availability = Some("looking".to_string());
        } else if ALLOWED_AVAILABILITY.contains(&value) {
            changes.availability = Some(value.to_string());
        }
        // unknown availability values are ignored, not rejected
    }

    changes.age = match numeric_patch(payload.age) {
        NumericOutcome::Untouched => None,
        NumericOutcome::Clear => Some(None),
        NumericOutcome::Set(value) => {
            let age = value as i32;
            if !(AGE_MIN..=AGE_MAX).contains(&age) {
                return Err(ApiError::validation(format!(
                    "Age must be between {AGE_MIN} and {AGE_MAX}"
                )));
            }
            Some(Some(age))
        }
    };

    changes.budget = match numeric_patch(payload.budget) {
        NumericOutcome::Untouched => None,
        NumericOutcome::Clear => Some(None),
        NumericOutcome::Set(value) => {
            if value < 0.0 {
                return Err(ApiError::validation("Budget cannot be negative"));
            }
            Some(Some(value))
        }
    };

    if let Patch::Value(value) = payload.interests {
        changes.interests = Some(normalize_interests(value));
    }

    if changes.is_empty() {
        return Err(ApiError::validation("No updates provided"));
    }

    if changes.name.as_deref() == Some("") {
        return Err(ApiError::validation("Name cannot be empty"));
    }

    if changes.bio.as_ref().is_some_and(|b| b.chars().count() > MAX_TEXT_LEN) {
        return Err(ApiError::validation(format!(
            "Bio cannot exceed {MAX_TEXT_LEN} characters"
        )));
    }

    if changes
        .preferences
        .as_ref()
        .is_some_and(|p| p.chars().count() > MAX_TEXT_LEN)
    {
        return Err(ApiError::validation(format!(
            "Preferences cannot exceed {MAX_TEXT_LEN} characters"
        )));
    }

    Ok(changes)
}

fn trimmed_string(patch: Patch<String>) -> Option<String> {
    match patch {
        Patch::Value(value) => Some(value.trim().to_string()),
        Patch::Missing | Patch::Null => None,
    }
}

enum NumericOutcome {
    Untouched,
    Clear,
    Set(f64),
}

fn numeric_patch(patch: Patch<NumberOrText>) -> NumericOutcome {
    match patch {
        Patch::Missing => NumericOutcome::Untouched,
        Patch::Null => NumericOutcome::Clear,
        Patch::Value(NumberOrText::Number(n)) if n.is_finite() => NumericOutcome::Set(n),
        Patch::Value(NumberOrText::Number(_)) => NumericOutcome::Untouched,
        Patch::Value(NumberOrText::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                NumericOutcome::Clear
            } else {
                match s.parse::<f64>() {
                    Ok(n) if n.is_finite() => NumericOutcome::Set(n),
                    // non-numeric input drops the field for this request
                    _ => NumericOutcome::Untouched,
                }
            }
        }
    }
}

fn normalize_interests(input: InterestsInput) -> Vec<String> {
    let entries: Vec<String> = match input {
        InterestsInput::List(items) => items,
        InterestsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };
    entries
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .take(MAX_INTERESTS)
        .map(str::to_string)
        .collect()
}

/// Normalized roommate-search filters. Blank city, "any" gender and
/// non-numeric budget ceilings all collapse to "no constraint".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RoommateQuery {
    pub city: Option<String>,
    pub gender: Option<String>,
    pub budget_max: Option<f64>,
}

impl From<RoommateParams> for RoommateQuery {
    fn from(params: RoommateParams) -> Self {
        Self {
            city: params
                .city
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            gender: params
                .gender
                .filter(|g| !g.is_empty() && g != "any"),
            budget_max: params
                .budget_max
                .and_then(|b| b.trim().parse::<f64>().ok())
                .filter(|b| b.is_finite()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::dto::UpdateProfileRequest;

    fn normalize(json: &str) -> Result<ProfileChanges, ApiError> {
        let payload: UpdateProfileRequest = serde_json::from_str(json).unwrap();
        normalize_update(payload)
    }

    #[test]
    fn empty_payload_is_rejected() {
        let err = normalize("{}").unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m == "No updates provided"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = normalize(r#"{"name": "  "}"#).unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m == "Name cannot be empty"));
    }

    #[test]
    fn string_fields_are_trimmed() {
        let changes = normalize(r#"{"name": "  Dana ", "city": " Austin "}"#).unwrap();
        assert_eq!(changes.name.as_deref(), Some("Dana"));
        assert_eq!(changes.city.as_deref(), Some("Austin"));
        assert!(changes.phone.is_none());
    }

    #[test]
    fn empty_string_is_accepted_for_other_text_fields() {
        let changes = normalize(r#"{"bio": "", "phone": " "}"#).unwrap();
        assert_eq!(changes.bio.as_deref(), Some(""));
        assert_eq!(changes.phone.as_deref(), Some(""));
    }

    #[test]
    fn null_string_field_is_untouched() {
        // null name alone means nothing recognized changed
        let err = normalize(r#"{"name": null}"#).unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m == "No updates provided"));
    }

    #[test]
    fn empty_string_clears_age() {
        let changes = normalize(r#"{"age": ""}"#).unwrap();
        assert_eq!(changes.age, Some(None));
    }

    #[test]
    fn null_clears_budget() {
        let changes = normalize(r#"{"budget": null}"#).unwrap();
        assert_eq!(changes.budget, Some(None));
    }

    #[test]
    fn non_numeric_age_is_silently_dropped() {
        // the unparseable age is the only field, so nothing remains
        let err = normalize(r#"{"age": "abc"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m == "No updates provided"));
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let changes = normalize(r#"{"age": "25", "budget": " 900 "}"#).unwrap();
        assert_eq!(changes.age, Some(Some(25)));
        assert_eq!(changes.budget, Some(Some(900.0)));
    }

    #[test]
    fn age_range_is_enforced() {
        let err = normalize(r#"{"age": 15}"#).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = normalize(r#"{"age": 81}"#).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(normalize(r#"{"age": 18}"#).unwrap().age, Some(Some(18)));
        assert_eq!(normalize(r#"{"age": 80}"#).unwrap().age, Some(Some(80)));
    }

    #[test]
    fn negative_budget_is_rejected() {
        let err = normalize(r#"{"budget": -1}"#).unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m == "Budget cannot be negative"));
    }

    #[test]
    fn gender_empty_clears_and_invalid_rejects() {
        let changes = normalize(r#"{"gender": ""}"#).unwrap();
        assert_eq!(changes.gender, Some(None));

        let changes = normalize(r#"{"gender": "female"}"#).unwrap();
        assert_eq!(changes.gender, Some(Some("female".to_string())));

        let err = normalize(r#"{"gender": "unicorn"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn invalid_availability_is_ignored_not_rejected() {
        let changes = normalize(r#"{"availability": "retired", "city": "Austin"}"#).unwrap();
        assert!(changes.availability.is_none());
        assert_eq!(changes.city.as_deref(), Some("Austin"));
    }

    #[test]
    fn empty_availability_defaults_to_looking() {
        let changes = normalize(r#"{"availability": ""}"#).unwrap();
        assert_eq!(changes.availability.as_deref(), Some("looking"));
    }

    #[test]
    fn valid_availability_is_set() {
        let changes = normalize(r#"{"availability": "matched"}"#).unwrap();
        assert_eq!(changes.availability.as_deref(), Some("matched"));
    }

    #[test]
    fn interests_csv_is_split_trimmed_and_filtered() {
        let changes = normalize(r#"{"interests": "Yoga, Cooking, , Gaming"}"#).unwrap();
        assert_eq!(
            changes.interests,
            Some(vec!["Yoga".to_string(), "Cooking".to_string(), "Gaming".to_string()])
        );
    }

    #[test]
    fn interests_list_is_trimmed_and_filtered() {
        let changes =
            normalize(r#"{"interests": [" Yoga ", "", "  ", "Hiking"]}"#).unwrap();
        assert_eq!(
            changes.interests,
            Some(vec!["Yoga".to_string(), "Hiking".to_string()])
        );
    }

    #[test]
    fn interests_cap_at_ten() {
        let csv = (1..=12).map(|i| format!("i{i}")).collect::<Vec<_>>().join(",");
        let changes = normalize(&format!(r#"{{"interests": "{csv}"}}"#)).unwrap();
        assert_eq!(changes.interests.as_ref().map(Vec::len), Some(10));
        assert_eq!(
            changes.interests.unwrap().last().cloned(),
            Some("i10".to_string())
        );
    }

    #[test]
    fn long_bio_is_rejected() {
        let bio = "x".repeat(501);
        let err = normalize(&format!(r#"{{"bio": "{bio}"}}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let bio = "x".repeat(500);
        assert!(normalize(&format!(r#"{{"bio": "{bio}"}}"#)).is_ok());
    }

    #[test]
    fn roommate_params_normalize() {
        let q = RoommateQuery::from(RoommateParams {
            city: Some("  Austin ".into()),
            gender: Some("any".into()),
            budget_max: Some("1000".into()),
        });
        assert_eq!(q.city.as_deref(), Some("Austin"));
        assert_eq!(q.gender, None);
        assert_eq!(q.budget_max, Some(1000.0));
    }

    #[test]
    fn roommate_params_ignore_blank_and_non_numeric() {
        let q = RoommateQuery::from(RoommateParams {
            city: Some("  ".into()),
            gender: Some(String::new()),
            budget_max: Some("cheap".into()),
        });
        assert_eq!(q, RoommateQuery::default());
    }

    #[test]
    fn resubmitting_serialized_profile_is_idempotent() {
        // the editable fields of a fully populated profile, exactly as the
        // read endpoint serializes them
        let changes = normalize(
            r#"{
                "name": "Dana",
                "phone": "555-0101",
                "gender": "female",
                "age": 25,
                "city": "Austin",
                "budget": 900.0,
                "bio": "early riser",
                "preferences": "quiet",
                "availability": "looking",
                "interests": ["Yoga", "Cooking"]
            }"#,
        )
        .unwrap();
        assert_eq!(
            changes,
            ProfileChanges {
                name: Some("Dana".into()),
                phone: Some("555-0101".into()),
                gender: Some(Some("female".into())),
                age: Some(Some(25)),
                city: Some("Austin".into()),
                budget: Some(Some(900.0)),
                bio: Some("early riser".into()),
                preferences: Some("quiet".into()),
                availability: Some("looking".into()),
                interests: Some(vec!["Yoga".into(), "Cooking".into()]),
            }
        );
    }

    #[test]
    fn resubmitting_sparse_profile_keeps_unset_fields_unset() {
        // a fresh profile serializes gender/age/budget as null; feeding that
        // back must leave gender untouched and the numeric fields cleared
        let changes = normalize(
            r#"{
                "name": "Dana",
                "phone": "",
                "gender": null,
                "age": null,
                "city": "",
                "budget": null,
                "bio": "",
                "preferences": "",
                "availability": "looking",
                "interests": []
            }"#,
        )
        .unwrap();
        assert_eq!(
            changes,
            ProfileChanges {
                name: Some("Dana".into()),
                phone: Some(String::new()),
                gender: None,
                age: Some(None),
                city: Some(String::new()),
                budget: Some(None),
                bio: Some(String::new()),
                preferences: Some(String::new()),
                availability: Some("looking".into()),
                interests: Some(Vec::new()),
            }
        );
    }

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("dana@example.com"));
        assert!(!is_valid_email("dana@example"));
        assert!(!is_valid_email("not-an-email"));
    }
}
