use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader as XmlReader;
use regex::Regex;
use tracing::debug;

use crate::{Category, Finding, Severity};

fn meta_finding(path: &str, kind: &str, excerpt: String, severity: Severity, hint: &str) -> Finding {
    Finding {
        source: "workdir".to_string(),
        path: path.to_string(),
        kind: kind.to_string(),
        excerpt,
        start: 0,
        end: 0,
        entropy: None,
        category: Category::Metadata,
        severity,
        hint: Some(hint.to_string()),
    }
}

/// Read a single part of a zip-based OOXML container (`.docx`/`.xlsx`/`.pptx`)
/// as a UTF-8 string, or `None` if the archive or the part is missing.
fn read_zip_part(path: &Path, part: &str) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut archive = zip::ZipArchive::new(file).ok()?;
    let mut entry = archive.by_name(part).ok()?;
    let mut buf = String::new();
    entry.read_to_string(&mut buf).ok()?;
    Some(buf)
}

/// Pull out the text content of every leaf element in `xml`, keyed by local
/// tag name (namespace prefix stripped). Good enough for the flat Dublin
/// Core / extended-properties documents OOXML uses for `docProps/core.xml`
/// and `docProps/app.xml`.
fn flat_xml_fields(xml: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut reader = XmlReader::from_str(xml);

    let mut current_tag: Option<String> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                current_tag = Some(name);
            }
            Ok(Event::Text(e)) => {
                if let Some(tag) = &current_tag {
                    if let Ok(text) = e.unescape() {
                        if !text.trim().is_empty() {
                            fields.insert(tag.clone(), text.trim().to_string());
                        }
                    }
                }
            }
            Ok(Event::End(_)) => current_tag = None,
            Ok(Event::Eof) => break,
            Err(err) => {
                debug!(error = %err, "malformed OOXML properties part");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    fields
}

fn core_properties(path: &Path) -> HashMap<String, String> {
    read_zip_part(path, "docProps/core.xml")
        .map(|xml| flat_xml_fields(&xml))
        .unwrap_or_default()
}

fn app_properties(path: &Path) -> HashMap<String, String> {
    read_zip_part(path, "docProps/app.xml")
        .map(|xml| flat_xml_fields(&xml))
        .unwrap_or_default()
}

fn emit_ooxml_fields(path: &Path, format: &str, fields: &[(&str, &str)]) -> Vec<Finding> {
    let path_str = path.to_string_lossy();
    let core = core_properties(path);
    let app = app_properties(path);
    let mut findings = Vec::new();
    for (out_name, xml_tag) in fields {
        let value = core.get(*xml_tag).or_else(|| app.get(*xml_tag));
        if let Some(value) = value {
            findings.push(meta_finding(
                &path_str,
                &format!("{format}_{out_name}"),
                format!("{out_name}: {value}"),
                Severity::Low,
                &format!("{format} document metadata may expose internal authorship or tooling information."),
            ));
        }
    }
    findings
}

fn scan_docx(path: &Path) -> Vec<Finding> {
    emit_ooxml_fields(
        path,
        "docx",
        &[
            ("author", "creator"),
            ("company", "Company"),
            ("comments", "description"),
            ("category", "category"),
            ("last_modified_by", "lastModifiedBy"),
        ],
    )
}

fn scan_xlsx(path: &Path) -> Vec<Finding> {
    emit_ooxml_fields(
        path,
        "xlsx",
        &[
            ("creator", "creator"),
            ("last_modified_by", "lastModifiedBy"),
            ("title", "title"),
            ("description", "description"),
            ("subject", "subject"),
        ],
    )
}

fn scan_pptx(path: &Path) -> Vec<Finding> {
    emit_ooxml_fields(
        path,
        "pptx",
        &[
            ("author", "creator"),
            ("company", "Company"),
            ("comments", "description"),
        ],
    )
}

fn scan_pdf(path: &Path) -> Vec<Finding> {
    let path_str = path.to_string_lossy();
    let doc = match lopdf::Document::load(path) {
        Ok(doc) => doc,
        Err(err) => {
            debug!(path = %path_str, error = %err, "could not parse pdf");
            return Vec::new();
        }
    };
    let info = match doc
        .trailer
        .get(b"Info")
        .and_then(|obj| doc.get_object(obj.as_reference()?))
        .and_then(|obj| obj.as_dict())
    {
        Ok(dict) => dict,
        Err(_) => return Vec::new(),
    };

    let mut findings = Vec::new();
    for (key, value) in info.iter() {
        let key_str = String::from_utf8_lossy(key).trim_start_matches('/').to_lowercase();
        let value_str = match value {
            lopdf::Object::String(bytes, _) => String::from_utf8_lossy(bytes).to_string(),
            lopdf::Object::Name(bytes) => String::from_utf8_lossy(bytes).to_string(),
            _ => continue,
        };
        if value_str.trim().is_empty() {
            continue;
        }
        findings.push(meta_finding(
            &path_str,
            &format!("pdf_{key_str}"),
            format!("{key_str}: {value_str}"),
            Severity::Low,
            "PDF metadata can contain the author, organization, or authoring software.",
        ));
    }
    findings
}

const NAMED_EXIF_TAGS: &[exif::Tag] = &[
    exif::Tag::Artist,
    exif::Tag::Copyright,
    exif::Tag::Software,
    exif::Tag::Make,
    exif::Tag::Model,
    exif::Tag::UserComment,
];

fn scan_image_exif(path: &Path) -> Vec<Finding> {
    let path_str = path.to_string_lossy();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };
    let mut reader = BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(err) => {
            debug!(path = %path_str, error = %err, "no readable exif data");
            return Vec::new();
        }
    };

    let mut findings = Vec::new();
    let has_gps = exif
        .fields()
        .any(|f| f.ifd_num == exif::In::PRIMARY && f.tag.to_string().starts_with("GPS"));
    if has_gps {
        findings.push(meta_finding(
            &path_str,
            "exif_gps",
            "GPS coordinates embedded".to_string(),
            Severity::Medium,
            "This image embeds a geolocation. Strip metadata before publishing it.",
        ));
    }

    for field in exif.fields() {
        if let Some(tag) = NAMED_EXIF_TAGS.iter().find(|t| **t == field.tag) {
            let value = field.display_value().with_unit(&exif).to_string();
            if value.trim().is_empty() {
                continue;
            }
            let tag_name = tag.to_string().to_lowercase();
            findings.push(meta_finding(
                &path_str,
                &format!("exif_{tag_name}"),
                format!("{tag}: {value}", tag = tag.to_string()),
                Severity::Low,
                "EXIF metadata can reveal the capturing device, software, or author.",
            ));
        }
    }
    findings
}

struct TextHeuristic {
    pattern: Regex,
    kind: &'static str,
    severity: Severity,
    hint: &'static str,
}

fn text_heuristics() -> Vec<TextHeuristic> {
    vec![
        TextHeuristic {
            pattern: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
            kind: "email_in_text",
            severity: Severity::Low,
            hint: "An email address appears in source or logs. Confirm it is not private data.",
        },
        TextHeuristic {
            pattern: Regex::new(r"(?i)\b[A-Za-z0-9.-]*\.(?:local|corp|intranet|internal)\b")
                .unwrap(),
            kind: "internal_network_artifact",
            severity: Severity::Medium,
            hint: "An internal hostname was found. This can aid reconnaissance if exposed.",
        },
        TextHeuristic {
            pattern: Regex::new(r"(?i)\b(?:dev|staging|test|qa)[.-][A-Za-z0-9.-]+\b").unwrap(),
            kind: "internal_network_artifact",
            severity: Severity::Medium,
            hint: "An internal hostname was found. This can aid reconnaissance if exposed.",
        },
        TextHeuristic {
            pattern: Regex::new(r"\b192\.168\.\d{1,3}\.\d{1,3}\b").unwrap(),
            kind: "internal_network_artifact",
            severity: Severity::Medium,
            hint: "An internal hostname was found. This can aid reconnaissance if exposed.",
        },
        TextHeuristic {
            pattern: Regex::new(r"\b10\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap(),
            kind: "internal_network_artifact",
            severity: Severity::Medium,
            hint: "An internal hostname was found. This can aid reconnaissance if exposed.",
        },
        TextHeuristic {
            pattern: Regex::new(r"\b172\.(?:1[6-9]|2[0-9]|3[01])\.\d{1,3}\.\d{1,3}\b").unwrap(),
            kind: "internal_network_artifact",
            severity: Severity::Medium,
            hint: "An internal hostname was found. This can aid reconnaissance if exposed.",
        },
        TextHeuristic {
            pattern: Regex::new(r"[\\/](?:home|Users|user|users)[\\/][A-Za-z0-9_-]{3,}").unwrap(),
            kind: "username_in_path",
            severity: Severity::Low,
            hint: "An operating-system username appears in a path. Can be used in targeted attacks.",
        },
    ]
}

fn debug_artifact_patterns() -> Vec<Regex> {
    vec![
        Regex::new(r"(?i)//\s*TODO.*").unwrap(),
        Regex::new(r"(?i)//\s*FIXME.*").unwrap(),
        Regex::new(r"(?i)<!--.*debug.*-->").unwrap(),
        Regex::new(r"(?i)#\s*DEBUG.*").unwrap(),
        Regex::new(r"(?i)console\.log\(").unwrap(),
        Regex::new(r"(?i)print\(").unwrap(),
        Regex::new(r"(?i)log\(").unwrap(),
    ]
}

/// Email, internal-network artifacts, username-in-path, and debug-artifact
/// heuristics over a lossily-decoded text blob. Shared by the metadata
/// extractor's companion pass.
pub fn scan_text_artifacts(text: &str, path: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for heuristic in text_heuristics() {
        for m in heuristic.pattern.find_iter(text) {
            let excerpt = if heuristic.kind == "username_in_path" {
                format!("User path: {}", m.as_str())
            } else {
                m.as_str().to_string()
            };
            findings.push(meta_finding(path, heuristic.kind, excerpt, heuristic.severity, heuristic.hint));
        }
    }
    for pattern in debug_artifact_patterns() {
        for m in pattern.find_iter(text) {
            let excerpt: String = m.as_str().chars().take(100).collect();
            findings.push(meta_finding(
                path,
                "debug_artifact",
                excerpt,
                Severity::Info,
                "A debug trace was left in the code. Undesirable in production.",
            ));
        }
    }
    findings
}

/// Dispatch on lowercase extension to the right structured extractor, then
/// opportunistically run the text-artifact companion pass on the same
/// bytes decoded lossily. Every failure is swallowed; metadata extraction
/// is strictly best-effort.
pub fn scan_metadata(path: &Path, max_size: u64) -> Vec<Finding> {
    let Ok(meta) = std::fs::metadata(path) else {
        return Vec::new();
    };
    if meta.len() > max_size {
        return Vec::new();
    }

    let suffix = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());

    let mut findings = match suffix.as_deref() {
        Some("docx") => scan_docx(path),
        Some("xlsx") => scan_xlsx(path),
        Some("pptx") => scan_pptx(path),
        Some("pdf") => scan_pdf(path),
        Some("jpg") | Some("jpeg") | Some("png") => scan_image_exif(path),
        _ => Vec::new(),
    };

    if let Ok(bytes) = std::fs::read(path) {
        let text = String::from_utf8_lossy(&bytes).to_string();
        let path_str = path.to_string_lossy().to_string();
        findings.extend(scan_text_artifacts(&text, &path_str));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_email_in_text() {
        let findings = scan_text_artifacts("contact: alice@example.com", "notes.txt");
        assert!(findings.iter().any(|f| f.kind == "email_in_text"));
    }

    #[test]
    fn finds_internal_hostname() {
        let findings = scan_text_artifacts("connect to db.internal now", "notes.txt");
        assert!(findings.iter().any(|f| f.kind == "internal_network_artifact"));
    }

    #[test]
    fn finds_rfc1918_address() {
        let findings = scan_text_artifacts("host 192.168.1.5 reachable", "notes.txt");
        assert!(findings.iter().any(|f| f.kind == "internal_network_artifact"));
    }

    #[test]
    fn finds_username_in_path() {
        let findings = scan_text_artifacts("see /home/jdoe/project for details", "notes.txt");
        let f = findings
            .iter()
            .find(|f| f.kind == "username_in_path")
            .unwrap();
        assert!(f.excerpt.starts_with("User path: "));
    }

    #[test]
    fn finds_debug_artifacts() {
        let findings = scan_text_artifacts("// TODO: remove before release", "notes.txt");
        assert!(findings.iter().any(|f| f.kind == "debug_artifact"));
    }

    #[test]
    fn debug_artifact_logging_calls_are_case_insensitive() {
        assert!(scan_text_artifacts("Console.Log(\"x\")", "a.js")
            .iter()
            .any(|f| f.kind == "debug_artifact"));
        assert!(scan_text_artifacts("PRINT(\"x\")", "a.py")
            .iter()
            .any(|f| f.kind == "debug_artifact"));
        assert!(scan_text_artifacts("LOG(\"x\")", "a.log")
            .iter()
            .any(|f| f.kind == "debug_artifact"));
    }
}
