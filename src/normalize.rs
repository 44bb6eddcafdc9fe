//! Maps one raw Greenhouse job posting onto the fixed destination schema.
//!
//! Everything here is pure: no I/O, no shared state. Optional fields that are
//! missing or malformed degrade to empty text or `None`; only the required
//! upstream fields (`id`, `title`, `updated_at`, `absolute_url`) can fail.

use crate::constants::{
    EMPLOYMENT_TYPE_KEY, EXPERIENCE_LEVEL_KEY, GREENHOUSE_SOURCE, INDUSTRY_KEY, JOB_TYPE_KEY,
};
use crate::error::{ImporterError, Result};
use crate::types::{NormalizedJobRecord, RawJobRecord};
use serde_json::Value;

/// Fields that fall back to keyword inference when the record carries no value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferredField {
    EmploymentType,
    JobType,
    ExperienceLevel,
}

type KeywordRule = (&'static [&'static str], &'static str);

// Precedence is the slice order: first rule with any matching keyword wins.
const EMPLOYMENT_TYPE_RULES: &[KeywordRule] = &[
    (&["remote"], "Remote"),
    (&["hybrid"], "Hybrid"),
    (&["on-site", "onsite"], "On-site"),
];

const JOB_TYPE_RULES: &[KeywordRule] = &[
    (&["intern"], "Internship"),
    (&["part-time", "part time"], "Part-Time"),
    (&["full-time", "full time"], "Full-Time"),
];

const EXPERIENCE_LEVEL_RULES: &[KeywordRule] = &[
    (&["entry", "junior"], "Entry"),
    (&["mid", "intermediate"], "Mid"),
    (&["senior", "lead"], "Senior"),
];

impl InferredField {
    fn rules(self) -> &'static [KeywordRule] {
        match self {
            InferredField::EmploymentType => EMPLOYMENT_TYPE_RULES,
            InferredField::JobType => JOB_TYPE_RULES,
            InferredField::ExperienceLevel => EXPERIENCE_LEVEL_RULES,
        }
    }

    /// Direct key on the raw record and the metadata entry name for this field
    fn keys(self) -> (&'static str, &'static str) {
        match self {
            InferredField::EmploymentType => ("employment_type", EMPLOYMENT_TYPE_KEY),
            InferredField::JobType => ("job_type", JOB_TYPE_KEY),
            InferredField::ExperienceLevel => ("experience_level", EXPERIENCE_LEVEL_KEY),
        }
    }
}

/// Flattens line breaks into spaces and trims the ends.
pub fn clean(text: Option<&str>) -> String {
    text.unwrap_or_default()
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Returns the `value` of the first `{name, value}` entry whose name equals `key`.
///
/// Anything other than an array of such entries yields `None`, as does a
/// matching entry whose value is not text.
pub fn extract_metadata_value(metadata: &Value, key: &str) -> Option<String> {
    metadata
        .as_array()?
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(key))?
        .get("value")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Keyword scan over case-folded text; `None` when nothing matches.
pub fn infer_from_text(text: &str, field: InferredField) -> Option<&'static str> {
    let folded = text.to_lowercase();
    field
        .rules()
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| folded.contains(kw)))
        .map(|(_, label)| *label)
}

/// Builds a destination record from a raw posting and the caller's company name.
pub fn normalize(raw: &RawJobRecord, company: &str) -> Result<NormalizedJobRecord> {
    let id = required_id(raw)?;
    let title = required_str(raw, "title")?;
    let updated_at = required_str(raw, "updated_at")?;
    let url = required_str(raw, "absolute_url")?;

    let description = clean(raw.get("content").and_then(Value::as_str));
    let metadata = raw.get("metadata").unwrap_or(&Value::Null);
    let search_text = format!("{} {}", title, description);

    let resolve = |field: InferredField| {
        let (direct_key, metadata_key) = field.keys();
        structured_value(raw, metadata, direct_key, metadata_key)
            .or_else(|| infer_from_text(&search_text, field).map(str::to_string))
    };

    Ok(NormalizedJobRecord {
        id,
        title: title.to_string(),
        company: company.to_string(),
        location: location_name(raw),
        url: url.to_string(),
        date_posted: updated_at.chars().take(10).collect(),
        source: GREENHOUSE_SOURCE.to_string(),
        department: department_name(raw),
        employment_type: resolve(InferredField::EmploymentType),
        job_type: resolve(InferredField::JobType),
        experience_level: resolve(InferredField::ExperienceLevel),
        industry: structured_value(raw, metadata, "industry", INDUSTRY_KEY),
        description,
    })
}

fn required_str<'a>(raw: &'a RawJobRecord, field: &'static str) -> Result<&'a str> {
    raw.get(field)
        .and_then(Value::as_str)
        .ok_or(ImporterError::MissingRequiredField(field))
}

fn required_id(raw: &RawJobRecord) -> Result<String> {
    match raw.get("id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ImporterError::MissingRequiredField("id")),
    }
}

fn location_name(raw: &RawJobRecord) -> String {
    match raw.get("location") {
        Some(Value::String(name)) => name.clone(),
        Some(location) => location
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        None => String::new(),
    }
}

fn department_name(raw: &RawJobRecord) -> Option<String> {
    ["department", "departments"]
        .iter()
        .filter_map(|key| raw.get(*key))
        .find_map(|value| match value {
            Value::Object(_) => value.get("name").and_then(Value::as_str),
            Value::Array(items) => items
                .iter()
                .find_map(|item| item.get("name").and_then(Value::as_str)),
            _ => None,
        })
        .map(str::to_string)
}

/// Direct field first, then metadata. Metadata may be a `{name, value}` list
/// or a mapping keyed by field name.
fn structured_value(
    raw: &RawJobRecord,
    metadata: &Value,
    direct_key: &str,
    metadata_key: &str,
) -> Option<String> {
    if let Some(direct) = raw.get(direct_key).and_then(Value::as_str) {
        return Some(direct.to_string());
    }
    match metadata {
        Value::Array(_) => extract_metadata_value(metadata, metadata_key),
        Value::Object(map) => map
            .get(metadata_key)
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_job() -> Value {
        json!({
            "id": 7,
            "title": "Warehouse Associate",
            "absolute_url": "https://boards.greenhouse.io/acme/jobs/7",
            "updated_at": "2024-03-09T08:15:00-05:00"
        })
    }

    #[test]
    fn test_clean_flattens_line_breaks() {
        assert_eq!(clean(Some("  <p>One\r\nTwo</p>\n")), "<p>One  Two</p>");
        assert_eq!(clean(None), "");
    }

    #[test]
    fn test_extract_metadata_value_named_lookup() {
        let metadata = json!([{"name": "Employment Type", "value": "Full-time"}]);
        assert_eq!(
            extract_metadata_value(&metadata, "Employment Type"),
            Some("Full-time".to_string())
        );
        assert_eq!(extract_metadata_value(&json!([]), "Employment Type"), None);
    }

    #[test]
    fn test_extract_metadata_value_is_case_sensitive_and_not_positional() {
        let metadata = json!([
            {"name": "Job Type", "value": "Contract"},
            {"name": "employment type", "value": "Part-time"}
        ]);
        assert_eq!(extract_metadata_value(&metadata, "Employment Type"), None);
    }

    #[test]
    fn test_extract_metadata_value_tolerates_malformed_input() {
        assert_eq!(extract_metadata_value(&json!({"Industry": "Retail"}), "Industry"), None);
        assert_eq!(extract_metadata_value(&json!("Industry"), "Industry"), None);
        assert_eq!(
            extract_metadata_value(&json!([1, null, {"name": "Industry", "value": null}]), "Industry"),
            None
        );
    }

    #[test]
    fn test_infer_employment_type_precedence() {
        assert_eq!(
            infer_from_text("Senior Backend Engineer, remote", InferredField::EmploymentType),
            Some("Remote")
        );
        assert_eq!(
            infer_from_text("Hybrid role, REMOTE fridays", InferredField::EmploymentType),
            Some("Remote")
        );
        assert_eq!(
            infer_from_text("Onsite in Austin", InferredField::EmploymentType),
            Some("On-site")
        );
    }

    #[test]
    fn test_infer_job_type_precedence() {
        assert_eq!(
            infer_from_text("Part-Time Intern", InferredField::JobType),
            Some("Internship")
        );
        assert_eq!(
            infer_from_text("Barista (part time)", InferredField::JobType),
            Some("Part-Time")
        );
        assert_eq!(infer_from_text("Full time chef", InferredField::JobType), Some("Full-Time"));
    }

    #[test]
    fn test_infer_experience_level() {
        assert_eq!(
            infer_from_text("Junior Analyst", InferredField::ExperienceLevel),
            Some("Entry")
        );
        assert_eq!(
            infer_from_text("Team Lead, Fulfillment", InferredField::ExperienceLevel),
            Some("Senior")
        );
        assert_eq!(infer_from_text("Chef", InferredField::ExperienceLevel), None);
    }

    #[test]
    fn test_infer_every_label_in_precedence_order() {
        let cases = [
            (InferredField::EmploymentType, "Fully remote", Some("Remote")),
            (InferredField::EmploymentType, "Remote or hybrid", Some("Remote")),
            (InferredField::EmploymentType, "Hybrid, on-site twice a week", Some("Hybrid")),
            (InferredField::EmploymentType, "On-site cook", Some("On-site")),
            (InferredField::EmploymentType, "Store Manager", None),
            (InferredField::JobType, "Summer Internship", Some("Internship")),
            (InferredField::JobType, "Part-time or full-time barista", Some("Part-Time")),
            (InferredField::JobType, "Full time, not part time", Some("Part-Time")),
            (InferredField::JobType, "Full-Time Driver", Some("Full-Time")),
            (InferredField::JobType, "Driver", None),
            (InferredField::ExperienceLevel, "Entry Level Cook", Some("Entry")),
            (InferredField::ExperienceLevel, "Junior to Senior", Some("Entry")),
            (InferredField::ExperienceLevel, "Intermediate Lead", Some("Mid")),
            (InferredField::ExperienceLevel, "Mid-level Analyst", Some("Mid")),
            (InferredField::ExperienceLevel, "Senior Buyer", Some("Senior")),
            (InferredField::ExperienceLevel, "Lead Baker", Some("Senior")),
        ];

        for (field, text, expected) in cases {
            assert_eq!(infer_from_text(text, field), expected, "{:?} over {:?}", field, text);
        }
    }

    #[test]
    fn test_normalize_minimal_record_degrades_optional_fields() {
        let job = minimal_job();
        let record = normalize(&job, "Acme").unwrap();

        assert_eq!(record.id, "7");
        assert_eq!(record.location, "");
        assert_eq!(record.description, "");
        assert_eq!(record.date_posted, "2024-03-09");
        assert_eq!(record.source, "greenhouse");
        assert_eq!(record.department, None);
        assert_eq!(record.industry, None);
    }

    #[test]
    fn test_normalize_missing_required_fields() {
        for field in ["id", "title", "updated_at", "absolute_url"] {
            let mut job = minimal_job();
            job.as_object_mut().unwrap().remove(field);
            match normalize(&job, "Acme") {
                Err(ImporterError::MissingRequiredField(missing)) => assert_eq!(missing, field),
                other => panic!("expected missing {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_normalize_null_id_is_missing() {
        let mut job = minimal_job();
        job["id"] = Value::Null;
        assert!(matches!(
            normalize(&job, "Acme"),
            Err(ImporterError::MissingRequiredField("id"))
        ));
    }

    #[test]
    fn test_normalize_end_to_end() {
        let job = json!({
            "id": 42,
            "title": "Data Engineer",
            "location": {"name": "Remote"},
            "content": "Line1\nLine2",
            "absolute_url": "https://x/42",
            "updated_at": "2024-05-01T12:00:00Z",
            "metadata": [{"name": "Industry", "value": "Retail"}]
        });

        let record = normalize(&job, "Acme").unwrap();

        assert_eq!(
            record,
            NormalizedJobRecord {
                id: "42".to_string(),
                title: "Data Engineer".to_string(),
                company: "Acme".to_string(),
                location: "Remote".to_string(),
                description: "Line1 Line2".to_string(),
                url: "https://x/42".to_string(),
                date_posted: "2024-05-01".to_string(),
                source: "greenhouse".to_string(),
                department: None,
                employment_type: None,
                job_type: None,
                experience_level: None,
                industry: Some("Retail".to_string()),
            }
        );
    }

    #[test]
    fn test_structured_values_win_over_inference() {
        let mut job = minimal_job();
        job["title"] = json!("Remote Senior Intern");
        job["metadata"] = json!([
            {"name": "Employment Type", "value": "Contractor"},
            {"name": "Experience Level", "value": "Staff"}
        ]);
        job["job_type"] = json!("Seasonal");

        let record = normalize(&job, "Acme").unwrap();

        assert_eq!(record.employment_type.as_deref(), Some("Contractor"));
        assert_eq!(record.job_type.as_deref(), Some("Seasonal"));
        assert_eq!(record.experience_level.as_deref(), Some("Staff"));
    }

    #[test]
    fn test_inference_reads_description() {
        let mut job = minimal_job();
        job["content"] = json!("&lt;p&gt;This is a hybrid,\nfull-time position&lt;/p&gt;");

        let record = normalize(&job, "Acme").unwrap();

        assert_eq!(record.employment_type.as_deref(), Some("Hybrid"));
        assert_eq!(record.job_type.as_deref(), Some("Full-Time"));
        // "Associate" carries none of the experience keywords
        assert_eq!(record.experience_level, None);
    }

    #[test]
    fn test_industry_is_never_inferred() {
        let mut job = minimal_job();
        job["title"] = json!("Retail Industry Specialist");
        assert_eq!(normalize(&job, "Acme").unwrap().industry, None);
    }

    #[test]
    fn test_metadata_mapping_shape() {
        let mut job = minimal_job();
        job["metadata"] = json!({"Industry": "Food & Beverage", "Job Type": "Seasonal"});

        let record = normalize(&job, "Acme").unwrap();

        assert_eq!(record.industry.as_deref(), Some("Food & Beverage"));
        assert_eq!(record.job_type.as_deref(), Some("Seasonal"));
    }

    #[test]
    fn test_department_resolution() {
        let mut job = minimal_job();
        job["department"] = json!({"name": "Operations"});
        assert_eq!(normalize(&job, "Acme").unwrap().department.as_deref(), Some("Operations"));

        let mut job = minimal_job();
        job["departments"] = json!([{"id": 1}, {"name": "Engineering"}, {"name": "Data"}]);
        assert_eq!(normalize(&job, "Acme").unwrap().department.as_deref(), Some("Engineering"));

        let mut job = minimal_job();
        job["departments"] = json!([]);
        assert_eq!(normalize(&job, "Acme").unwrap().department, None);
    }

    #[test]
    fn test_normalize_is_deterministic_and_leaves_input_untouched() {
        let job = json!({
            "id": "abc-1",
            "title": "Store Manager",
            "location": {"name": "Denver, CO"},
            "content": "Lead the team\r\n",
            "absolute_url": "https://x/abc-1",
            "updated_at": "2024-01-02"
        });
        let before = job.clone();

        let first = normalize(&job, "Sweetgreen").unwrap();
        let second = normalize(&job, "Sweetgreen").unwrap();

        assert_eq!(first, second);
        assert_eq!(job, before);
        assert_eq!(first.experience_level.as_deref(), Some("Senior"));
    }

    #[test]
    fn test_short_updated_at_is_kept_whole() {
        let mut job = minimal_job();
        job["updated_at"] = json!("2024-05");
        assert_eq!(normalize(&job, "Acme").unwrap().date_posted, "2024-05");
    }
}
