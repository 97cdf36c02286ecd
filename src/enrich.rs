use std::collections::HashMap;
use std::path::Path;

use crate::{Category, Finding, Severity};

fn category_table() -> HashMap<&'static str, Category> {
    use Category::*;
    [
        ("aws_access_key_id", Secret),
        ("aws_secret_access_key", Secret),
        ("gcp_service_account_key", Secret),
        ("gcp_api_key", Secret),
        ("azure_storage_key", Secret),
        ("github_token", Secret),
        ("github_fine_grained", Secret),
        ("gitlab_personal_token", Secret),
        ("bitbucket_app_password", Secret),
        ("stripe_secret_key", Secret),
        ("stripe_restricted_key", Secret),
        ("paypal_bearer_token", Secret),
        ("google_oauth_client_id", Secret),
        ("google_oauth_client_secret", Secret),
        ("firebase_api_key", Secret),
        ("telegram_bot_token", Secret),
        ("discord_bot_token", Secret),
        ("slack_token", Secret),
        ("twilio_api_key", Secret),
        ("pg_connection_uri", Infra),
        ("mysql_connection_uri", Infra),
        ("mongodb_connection_uri", Infra),
        ("redis_connection_uri", Infra),
        ("generic_password", Secret),
        ("generic_secret", Secret),
        ("jwt_token", Secret),
        ("private_key_header", Secret),
        ("email", Pii),
        ("phone", Pii),
        ("high_entropy", Secret),
    ]
    .into_iter()
    .collect()
}

fn base_severity_table() -> HashMap<&'static str, Severity> {
    use Severity::*;
    [
        ("aws_secret_access_key", Critical),
        ("private_key_header", Critical),
        ("stripe_secret_key", Critical),
        ("stripe_restricted_key", Critical),
        ("paypal_bearer_token", Critical),
        ("github_token", High),
        ("github_fine_grained", High),
        ("gitlab_personal_token", High),
        ("bitbucket_app_password", High),
        ("telegram_bot_token", High),
        ("discord_bot_token", High),
        ("slack_token", High),
        ("twilio_api_key", High),
        ("gcp_service_account_key", High),
        ("gcp_api_key", High),
        ("firebase_api_key", High),
        ("azure_storage_key", High),
        ("pg_connection_uri", High),
        ("mysql_connection_uri", High),
        ("mongodb_connection_uri", High),
        ("redis_connection_uri", High),
        ("generic_password", Medium),
        ("generic_secret", Medium),
        ("jwt_token", Medium),
        ("aws_access_key_id", Medium),
        ("google_oauth_client_id", Low),
        ("google_oauth_client_secret", Medium),
        ("email", Low),
        ("phone", Low),
        ("high_entropy", Medium),
    ]
    .into_iter()
    .collect()
}

fn max_severity(a: Severity, b: Severity) -> Severity {
    a.max(b)
}

/// Elevate severity to `High` (never downgrading) if the path looks like a
/// secrets/config/production artifact. Metadata-kind findings (docx/xlsx/
/// pptx/pdf/exif) already carry their own fixed severity from the
/// extractor and are not subject to this table lookup, but the uplift
/// still applies to them per spec.
fn path_uplift(path: &str, severity: Severity) -> Severity {
    let lower = path.to_lowercase();
    let filename = Path::new(&lower)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&lower);

    let mut severity = severity;
    if filename.starts_with(".env") || filename == "env" || filename == "secrets" {
        severity = max_severity(severity, Severity::High);
    }
    if filename.contains("config") || lower.contains("/config/") {
        severity = max_severity(severity, Severity::High);
    }
    if ["/prod", "/production", "k8s", "kubernetes", "docker-compose"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        severity = max_severity(severity, Severity::High);
    }
    severity
}

fn hint_for(category: Category) -> Option<String> {
    match category {
        Category::Secret => Some(
            "Rotate this credential and move it into a secret store (CI secrets or environment variables)."
                .to_string(),
        ),
        Category::Infra => {
            Some("Verify this infrastructure detail is not exposed outside its intended network.".to_string())
        }
        Category::Pii => Some("Confirm this personal data needs to be disclosed here.".to_string()),
        Category::Config => Some("Review this configuration artifact for correctness and safety.".to_string()),
        Category::Metadata => None,
    }
}

/// Assign category, severity (with path-aware uplift), and a remediation
/// hint to a deduplicated finding, in place.
///
/// Metadata findings (docx/xlsx/pptx/pdf/exif, and the text-artifact
/// companion pass) already carry their extractor-assigned category and
/// base severity and keep them; every other finding gets its
/// category/severity from the lookup tables below. The path-aware uplift
/// and hint assignment apply uniformly regardless of origin.
pub fn enrich(finding: &mut Finding) {
    if finding.category != Category::Metadata {
        let categories = category_table();
        let severities = base_severity_table();
        finding.category = categories
            .get(finding.kind.as_str())
            .copied()
            .unwrap_or(Category::Secret);
        finding.severity = severities
            .get(finding.kind.as_str())
            .copied()
            .unwrap_or(Severity::Medium);
    }

    finding.severity = path_uplift(&finding.path, finding.severity);
    if finding.category != Category::Metadata {
        finding.hint = hint_for(finding.category);
    }
}

/// Deduplicate on `(source, path, kind, excerpt)`, first occurrence wins,
/// then enrich every survivor in place.
pub fn dedup_and_enrich(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = std::collections::HashSet::new();
    let mut survivors = Vec::with_capacity(findings.len());
    for finding in findings {
        let key = (
            finding.source.clone(),
            finding.path.clone(),
            finding.kind.clone(),
            finding.excerpt.clone(),
        );
        if seen.insert(key) {
            survivors.push(finding);
        }
    }
    for finding in &mut survivors {
        enrich(finding);
    }
    survivors
}
