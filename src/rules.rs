use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::error::ScanError;

/// A named, compiled regular expression. Capture groups are never inspected;
/// only the overall match span is used downstream.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub regex: Regex,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    name: Option<String>,
    pattern: Option<String>,
}

/// `(name, pattern)` pairs for the built-in rule set. Kept as raw strings
/// (rather than pre-compiled statics) so `default_rules()` and tests can
/// both construct a fresh `Vec<Rule>` without sharing a global.
const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("aws_access_key_id", r"AKIA[0-9A-Z]{16}"),
    // Exactly 40 base64-ish chars; isolation from a longer run is validated
    // in `matchers::match_aws_secret_access_key` rather than baked into the
    // pattern as a lookaround (the `regex` crate has none) — see DESIGN.md.
    ("aws_secret_access_key", r"[A-Za-z0-9/+=]{40}"),
    ("gcp_service_account_key", r#""type":\s*"service_account""#),
    ("gcp_api_key", r"AIza[0-9A-Za-z\-_]{35}"),
    (
        "azure_storage_key",
        r"(?i)AccountKey\s*=\s*[A-Za-z0-9+/=]{40,}",
    ),
    ("github_token", r"ghp_[A-Za-z0-9]{36}"),
    ("github_fine_grained", r"github_pat_[A-Za-z0-9_]{82,110}"),
    ("gitlab_personal_token", r"glpat-[A-Za-z0-9-_]{20,40}"),
    ("bitbucket_app_password", r"x-token-auth:[A-Za-z0-9]{20,40}"),
    ("stripe_secret_key", r"sk_live_[0-9a-zA-Z]{24,99}"),
    ("stripe_restricted_key", r"rk_live_[0-9a-zA-Z]{24,99}"),
    (
        "paypal_bearer_token",
        r"access_token\$production\$[A-Za-z0-9._-]{10,}",
    ),
    (
        "google_oauth_client_id",
        r"[0-9]{10,}-[0-9a-z]{32}\.apps\.googleusercontent\.com",
    ),
    (
        "google_oauth_client_secret",
        r#"(?i)google.*client.*secret['"]?\s*[:=]\s*['"][0-9A-Za-z-_]{8,}"#,
    ),
    ("firebase_api_key", r"AIza[0-9A-Za-z\-_]{35}"),
    ("telegram_bot_token", r"\b\d{8,12}:[A-Za-z0-9_-]{30,60}\b"),
    ("discord_bot_token", r"[\w-]{24}\.[\w-]{6}\.[\w-]{27}"),
    ("slack_token", r"xox[baprs]-[A-Za-z0-9]{10,48}"),
    ("twilio_api_key", r"SK[0-9a-fA-F]{32}"),
    ("pg_connection_uri", r"postgres(?:ql)?://\S+"),
    ("mysql_connection_uri", r"mysql://\S+"),
    ("mongodb_connection_uri", r"mongodb(?:\+srv)?://\S+"),
    ("redis_connection_uri", r"redis://\S+"),
    (
        "generic_password",
        r#"(?i)password\s*[:=]\s*["']?[^"'\s]{6,}"#,
    ),
    (
        "generic_secret",
        r#"(?i)secret\s*[:=]\s*["']?[A-Za-z0-9/+_.-]{8,}"#,
    ),
    (
        "jwt_token",
        r"eyJ[A-Za-z0-9_-]+?\.[A-Za-z0-9_-]+?\.[A-Za-z0-9_-]{10,}",
    ),
    (
        "private_key_header",
        r"-----BEGIN (RSA|DSA|EC|OPENSSH|PGP) PRIVATE KEY-----",
    ),
    ("email", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
    (
        "phone",
        r"\+?\d{1,3}[\s-]?\(?\d{2,4}\)?[\s-]\d{3,4}[\s-]?\d{3,4}",
    ),
];

/// Build the built-in rule set. Every name referenced by the severity table
/// in `enrich.rs` appears here.
pub fn default_rules() -> Vec<Rule> {
    DEFAULT_PATTERNS
        .iter()
        .filter_map(|(name, pattern)| {
            Regex::new(pattern).ok().map(|regex| Rule {
                name: (*name).to_string(),
                regex,
            })
        })
        .collect()
}

/// Parse a rules-config JSON document (`{ "rules": [ {"name", "pattern"}, ... ] }`).
/// Entries missing a name/pattern, or whose pattern fails to compile, are
/// skipped individually.
fn parse_rules_json(text: &str) -> Result<Vec<Rule>, serde_json::Error> {
    let parsed: RuleFile = serde_json::from_str(text)?;
    let mut rules = Vec::new();
    for entry in parsed.rules {
        let (Some(name), Some(pattern)) = (entry.name, entry.pattern) else {
            continue;
        };
        match Regex::new(&pattern) {
            Ok(regex) => rules.push(Rule { name, regex }),
            Err(err) => {
                warn!(pattern = %pattern, error = %err, "skipping unparseable rule pattern")
            }
        }
    }
    Ok(rules)
}

/// Load rules from an explicit config path. Fails the scan (per the fatal
/// taxonomy in `error.rs`) if the file cannot be read or is not valid JSON;
/// an all-unusable-entries result falls back to defaults rather than failing.
pub fn load_rules_from_path(path: &Path) -> Result<Vec<Rule>, ScanError> {
    let text = fs::read_to_string(path).map_err(|source| ScanError::RuleFileUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let rules = parse_rules_json(&text).map_err(|source| ScanError::RuleFileMalformed {
        path: path.to_path_buf(),
        source,
    })?;
    if rules.is_empty() {
        warn!(path = %path.display(), "rule config has no usable entries, falling back to defaults");
        Ok(default_rules())
    } else {
        Ok(rules)
    }
}

/// Resolve the active rule store per the lookup order in §6: explicit
/// `rules_config_path`, then `<repo_path>/rules.json`, then built-in
/// defaults.
pub fn resolve_rules(
    repo_path: &Path,
    rules_config_path: Option<&Path>,
) -> Result<Vec<Rule>, ScanError> {
    if let Some(path) = rules_config_path {
        return load_rules_from_path(path);
    }
    let repo_rules = repo_path.join("rules.json");
    if repo_rules.exists() {
        return load_rules_from_path(&repo_rules);
    }
    Ok(default_rules())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_nonempty_and_compile() {
        let rules = default_rules();
        assert!(rules.len() >= 20);
        assert!(rules.iter().any(|r| r.name == "aws_access_key_id"));
        assert!(rules.iter().any(|r| r.name == "private_key_header"));
    }

    #[test]
    fn parse_rules_json_skips_bad_entries() {
        let json = r#"{ "rules": [
            {"name": "good", "pattern": "abc"},
            {"name": "bad_regex", "pattern": "("},
            {"pattern": "no-name"},
            {"name": "no-pattern"}
        ] }"#;
        let rules = parse_rules_json(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "good");
    }

    #[test]
    fn parse_rules_json_all_unusable_is_empty_not_error() {
        let json = r#"{ "rules": [ {"name": "bad", "pattern": "("} ] }"#;
        let rules = parse_rules_json(json).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn parse_rules_json_malformed_errors() {
        let err = parse_rules_json("not json");
        assert!(err.is_err());
    }

    #[test]
    fn generic_password_matches_single_quoted_value() {
        let rules = default_rules();
        let rule = rules.iter().find(|r| r.name == "generic_password").unwrap();
        assert!(rule.regex.is_match("password: 'hunter2xyz'"));
        assert!(rule.regex.is_match(r#"password: "hunter2xyz""#));
        assert!(rule.regex.is_match("password: hunter2xyz"));
    }

    #[test]
    fn generic_secret_matches_quoted_value() {
        let rules = default_rules();
        let rule = rules.iter().find(|r| r.name == "generic_secret").unwrap();
        assert!(rule.regex.is_match(r#"secret: "abc12345""#));
        assert!(rule.regex.is_match("secret: 'abc12345'"));
        assert!(rule.regex.is_match("secret: abc12345"));
    }
}
