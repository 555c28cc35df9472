//! Error response rules.
//!
//! Each predicate inspects a [`Candidate::Status`] and ignores every other
//! candidate kind. Paths are relative to `ctx.base`, which is `error` for an
//! enveloped payload and the root for a bare one.

use crate::codes::CanonicalCode;
use crate::model::{DetailType, MessageBindings, StatusPayload};
use crate::registry::{Candidate, CheckContext, Finding};
use aipcheck_common_config::CodeConvention;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use url::Url;

pub const MAX_REASON_LEN: usize = 63;
pub const MAX_METADATA_KEY_LEN: usize = 64;

pub static REASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]+[A-Z0-9]$").expect("reason pattern is valid"));

pub static METADATA_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9_-]+$").expect("metadata key pattern is valid"));

/// Dotted DNS-style name with at least two labels, e.g. `pubsub.googleapis.com`.
static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+$")
        .expect("domain pattern is valid")
});

/// BCP-47 language tag: language, script, region, variants, then extension
/// and private-use subtags.
static LOCALE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[A-Za-z]{2,3}(-[A-Za-z]{4})?(-([A-Za-z]{2}|[0-9]{3}))?",
        r"(-([A-Za-z0-9]{5,8}|[0-9][A-Za-z0-9]{3}))*",
        r"(-[0-9A-WY-Za-wy-z](-[A-Za-z0-9]{2,8})+)*",
        r"(-x(-[A-Za-z0-9]{1,8})+)?$",
    ))
    .expect("locale pattern is valid")
});

/// Does `reason` satisfy both the pattern and the length limit?
pub fn is_valid_reason(reason: &str) -> bool {
    reason.len() <= MAX_REASON_LEN && REASON.is_match(reason)
}

pub fn is_valid_metadata_key(key: &str) -> bool {
    key.len() <= MAX_METADATA_KEY_LEN && METADATA_KEY.is_match(key)
}

pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN.is_match(domain)
}

pub fn is_valid_locale(locale: &str) -> bool {
    LOCALE.is_match(locale)
}

fn status_of<'a>(candidate: &Candidate<'a>) -> Option<&'a StatusPayload> {
    match candidate {
        Candidate::Status(status) => Some(status),
        _ => None,
    }
}

fn convention_name(convention: CodeConvention) -> &'static str {
    match convention {
        CodeConvention::Http => "HTTP status",
        CodeConvention::Grpc => "google.rpc.Code",
    }
}

pub(crate) fn invalid_code(candidate: &Candidate<'_>, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let mut findings = Vec::new();

    let convention = ctx.options.code_convention;
    if CanonicalCode::matching(status.code, convention).is_empty() {
        findings.push(Finding::new(
            ctx.base.field("code"),
            format!(
                "code {} is not a canonical {} code",
                status.code,
                convention_name(convention)
            ),
        ));
    }

    match status.status.as_deref() {
        Some(name) if CanonicalCode::from_name(name).is_none() => findings.push(Finding::new(
            ctx.base.field("status"),
            format!("`{name}` is not a canonical status name"),
        )),
        None if ctx.options.require_status_name => findings.push(Finding::new(
            ctx.base.field("status"),
            "status name is required",
        )),
        _ => {}
    }

    findings
}

pub(crate) fn status_code_mismatch(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let Some(named) = status.status.as_deref().and_then(CanonicalCode::from_name) else {
        return Vec::new();
    };

    let convention = ctx.options.code_convention;
    let matching = CanonicalCode::matching(status.code, convention);
    if matching.is_empty() || matching.contains(&named) {
        return Vec::new();
    }

    vec![Finding::new(
        ctx.base.field("status"),
        format!(
            "status `{named}` corresponds to code {} but code is {}",
            named.code_for(convention),
            status.code
        ),
    )]
}

pub(crate) fn ok_status_in_error(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let named = status.status.as_deref().and_then(CanonicalCode::from_name);

    match named {
        Some(CanonicalCode::Ok) => vec![Finding::new(
            ctx.base.field("status"),
            "error payload carries status OK",
        )],
        Some(_) => Vec::new(),
        None if CanonicalCode::matching(status.code, ctx.options.code_convention)
            .contains(&CanonicalCode::Ok) =>
        {
            vec![Finding::new(
                ctx.base.field("code"),
                format!("error payload carries code {}, which means OK", status.code),
            )]
        }
        None => Vec::new(),
    }
}

pub(crate) fn missing_error_info(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    if status.error_infos().next().is_some() {
        return Vec::new();
    }
    vec![Finding::new(
        ctx.base.field("details"),
        "details must contain exactly one ErrorInfo; none present",
    )]
}

pub(crate) fn duplicate_error_info(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let indexes: Vec<usize> = status.error_infos().map(|(i, _)| i).collect();
    match indexes.get(1) {
        Some(&second) => vec![Finding::new(
            ctx.base.field("details").index(second),
            format!(
                "details must contain exactly one ErrorInfo; found {}",
                indexes.len()
            ),
        )],
        None => Vec::new(),
    }
}

pub(crate) fn malformed_reason(candidate: &Candidate<'_>, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    status
        .error_infos()
        .filter(|(_, info)| !is_valid_reason(&info.reason))
        .map(|(i, info)| {
            let message = if info.reason.len() > MAX_REASON_LEN {
                format!(
                    "reason `{}` is {} characters; the limit is {MAX_REASON_LEN}",
                    info.reason,
                    info.reason.len()
                )
            } else {
                format!(
                    "reason `{}` must be UPPER_SNAKE_CASE matching {}",
                    info.reason,
                    REASON.as_str()
                )
            };
            Finding::new(details.index(i).field("reason"), message)
        })
        .collect()
}

pub(crate) fn missing_domain(candidate: &Candidate<'_>, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    status
        .error_infos()
        .filter_map(|(i, info)| {
            let path = details.index(i).field("domain");
            if info.domain.trim().is_empty() {
                Some(Finding::new(path, "domain is required"))
            } else if !is_valid_domain(&info.domain) {
                Some(Finding::new(
                    path,
                    format!(
                        "domain `{}` is not a globally scoped name such as `pubsub.googleapis.com`",
                        info.domain
                    ),
                ))
            } else {
                None
            }
        })
        .collect()
}

pub(crate) fn malformed_metadata_key(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    let mut findings = Vec::new();
    for (i, info) in status.error_infos() {
        for key in info.metadata.keys().filter(|k| !is_valid_metadata_key(k)) {
            findings.push(Finding::new(
                details.index(i).field("metadata"),
                format!(
                    "metadata key `{key}` must match {} and be at most {MAX_METADATA_KEY_LEN} characters",
                    METADATA_KEY.as_str()
                ),
            ));
        }
    }
    findings
}

/// Bindings that apply to an `ErrorInfo`: explicit ones first, then configured.
fn bindings_for<'a>(ctx: &CheckContext<'a>, reason: &str) -> Option<&'a MessageBindings> {
    ctx.bindings
        .filter(|b| !b.is_empty())
        .or_else(|| ctx.options.bindings_for(reason))
}

pub(crate) fn missing_dynamic_metadata(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    let mut findings = Vec::new();
    for (i, info) in status.error_infos() {
        let Some(bindings) = bindings_for(ctx, &info.reason) else {
            continue;
        };
        for (variable, key) in bindings.iter() {
            if !info.metadata.contains_key(key) {
                findings.push(Finding::new(
                    details.index(i).field("metadata"),
                    format!(
                        "message variable `{variable}` needs metadata key `{key}`, which is missing"
                    ),
                ));
            }
        }
    }
    findings
}

pub(crate) fn unverifiable_dynamic_content(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    if ctx.bindings.is_some_and(|b| !b.is_empty()) {
        return Vec::new();
    }

    let mut infos = status.error_infos().peekable();
    let configured = infos.peek().is_some()
        && infos.all(|(_, info)| ctx.options.bindings_for(&info.reason).is_some());
    if configured {
        return Vec::new();
    }

    let path = if !status.message.is_empty() {
        ctx.base.field("message")
    } else {
        match status
            .localized_messages()
            .find(|(_, msg)| !msg.message.is_empty())
        {
            Some((i, _)) => ctx.base.field("details").index(i).field("message"),
            None => return Vec::new(),
        }
    };

    vec![Finding::new(
        path,
        "message text is present but no bindings relate it to ErrorInfo.metadata",
    )]
}

pub(crate) fn duplicate_detail_type(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    let mut seen: BTreeMap<DetailType, usize> = BTreeMap::new();
    let mut findings = Vec::new();
    for (i, detail) in status.details.iter().enumerate() {
        let kind = detail.detail_type();
        let count = seen.entry(kind.clone()).or_insert(0);
        *count += 1;
        if *count == 2 {
            findings.push(Finding::new(
                details.index(i),
                format!("detail type `{kind}` appears more than once"),
            ));
        }
    }
    findings
}

pub(crate) fn incomplete_localized_message(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    status
        .localized_messages()
        .filter_map(|(i, msg)| {
            let at = details.index(i);
            match (msg.locale.is_empty(), msg.message.is_empty()) {
                (true, false) => Some(Finding::new(
                    at.field("locale"),
                    "locale is required when message is set",
                )),
                (false, true) => Some(Finding::new(
                    at.field("message"),
                    "message is required when locale is set",
                )),
                _ => None,
            }
        })
        .collect()
}

pub(crate) fn malformed_locale(candidate: &Candidate<'_>, ctx: &CheckContext<'_>) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    status
        .localized_messages()
        .filter(|(_, msg)| !msg.locale.is_empty() && !is_valid_locale(&msg.locale))
        .map(|(i, msg)| {
            Finding::new(
                details.index(i).field("locale"),
                format!("locale `{}` is not a BCP-47 language tag", msg.locale),
            )
        })
        .collect()
}

pub(crate) fn missing_help_description(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    let mut findings = Vec::new();
    for (i, help) in status.helps() {
        for (j, link) in help.links.iter().enumerate() {
            if link.description.trim().is_empty() {
                findings.push(Finding::new(
                    details.index(i).field("links").index(j).field("description"),
                    "help link has no description",
                ));
            }
        }
    }
    findings
}

pub(crate) fn malformed_help_url(
    candidate: &Candidate<'_>,
    ctx: &CheckContext<'_>,
) -> Vec<Finding> {
    let Some(status) = status_of(candidate) else {
        return Vec::new();
    };
    let details = ctx.base.field("details");

    let mut findings = Vec::new();
    for (i, help) in status.helps() {
        for (j, link) in help.links.iter().enumerate() {
            let path = details.index(i).field("links").index(j).field("url");
            if link.url.is_empty() {
                findings.push(Finding::new(path, "help link url is required"));
                continue;
            }
            match Url::parse(&link.url) {
                Err(e) => findings.push(Finding::new(
                    path,
                    format!("`{}` is not an absolute URL: {e}", link.url),
                )),
                Ok(url) if !matches!(url.scheme(), "http" | "https") => {
                    findings.push(Finding::new(
                        path,
                        format!("`{}` must use http or https, not {}", link.url, url.scheme()),
                    ))
                }
                Ok(_) => {}
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Detail, ErrorInfo, Help, HelpLink, LocalizedMessage};
    use crate::options::CheckOptions;
    use crate::path::FieldPath;
    use test_case::test_case;

    fn run(
        predicate: crate::registry::Predicate,
        status: &StatusPayload,
        bindings: Option<&MessageBindings>,
    ) -> Vec<Finding> {
        let options = CheckOptions::default();
        let base = FieldPath::root();
        let ctx = CheckContext {
            base: &base,
            options: &options,
            bindings,
        };
        predicate(&Candidate::Status(status), &ctx)
    }

    fn with_details(details: Vec<Detail>) -> StatusPayload {
        StatusPayload {
            code: 400,
            status: Some("INVALID_ARGUMENT".to_string()),
            message: String::new(),
            details,
        }
    }

    fn info(reason: &str) -> Detail {
        Detail::ErrorInfo(ErrorInfo::new(reason, "library.example.com"))
    }

    #[test_case("RESOURCE_AVAILABILITY", true)]
    #[test_case("AB1", true)]
    #[test_case("A1", false)]
    #[test_case("AB_", false)]
    #[test_case("_AB", false)]
    #[test_case("A", false)]
    #[test_case("resource_availability", false)]
    #[test_case("Resource_Availability", false)]
    fn test_reason_pattern(reason: &str, valid: bool) {
        assert_eq!(is_valid_reason(reason), valid);
    }

    #[test]
    fn test_reason_length_limit() {
        let at_limit = format!("A{}", "B".repeat(MAX_REASON_LEN - 1));
        assert!(is_valid_reason(&at_limit));
        let over = format!("{at_limit}C");
        let findings = run(malformed_reason, &with_details(vec![info(&over)]), None);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("limit"));
    }

    #[test_case("zone", true)]
    #[test_case("instanceName", true)]
    #[test_case("resource-type_2", true)]
    #[test_case("Zone", false)]
    #[test_case("z", false)]
    #[test_case("1zone", false)]
    #[test_case("zone name", false)]
    fn test_metadata_key_pattern(key: &str, valid: bool) {
        assert_eq!(is_valid_metadata_key(key), valid);
    }

    #[test_case("pubsub.googleapis.com", true)]
    #[test_case("compute.googleapis.com", true)]
    #[test_case("example.com", true)]
    #[test_case("pubsub", false)]
    #[test_case("Pubsub.Googleapis.com", false)]
    #[test_case("-bad.example.com", false)]
    fn test_domain_pattern(domain: &str, valid: bool) {
        assert_eq!(is_valid_domain(domain), valid);
    }

    #[test_case("en", true)]
    #[test_case("en-US", true)]
    #[test_case("zh-Hant-TW", true)]
    #[test_case("es-419", true)]
    #[test_case("en-US-u-ca-gregory", true)]
    #[test_case("sr-Latn-RS-u-nu-latn", true)]
    #[test_case("de-CH-x-phonebk", true)]
    #[test_case("english", false)]
    #[test_case("en_US", false)]
    #[test_case("en-US-u", false)]
    #[test_case("de-x", false)]
    fn test_locale_pattern(locale: &str, valid: bool) {
        assert_eq!(is_valid_locale(locale), valid);
    }

    #[test_case(429, "RESOURCE_EXHAUSTED", 0)]
    #[test_case(600, "RESOURCE_EXHAUSTED", 1)]
    #[test_case(400, "EXHAUSTED", 1)]
    #[test_case(999, "NOPE", 2)]
    fn test_invalid_code(code: i64, name: &str, expected: usize) {
        let status = StatusPayload {
            code,
            status: Some(name.to_string()),
            ..Default::default()
        };
        assert_eq!(run(invalid_code, &status, None).len(), expected);
    }

    #[test]
    fn test_status_code_mismatch() {
        let status = StatusPayload {
            code: 404,
            status: Some("RESOURCE_EXHAUSTED".to_string()),
            ..Default::default()
        };
        let findings = run(status_code_mismatch, &status, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path.as_str(), "status");

        // 400 is shared by several codes.
        let shared = StatusPayload {
            code: 400,
            status: Some("FAILED_PRECONDITION".to_string()),
            ..Default::default()
        };
        assert!(run(status_code_mismatch, &shared, None).is_empty());
    }

    #[test]
    fn test_ok_in_error_payload() {
        let named = StatusPayload {
            code: 200,
            status: Some("OK".to_string()),
            ..Default::default()
        };
        assert_eq!(run(ok_status_in_error, &named, None)[0].path.as_str(), "status");

        let unnamed = StatusPayload {
            code: 200,
            ..Default::default()
        };
        assert_eq!(run(ok_status_in_error, &unnamed, None)[0].path.as_str(), "code");
    }

    #[test]
    fn test_error_info_cardinality() {
        let none = with_details(vec![]);
        assert_eq!(run(missing_error_info, &none, None).len(), 1);
        assert!(run(duplicate_error_info, &none, None).is_empty());

        let two = with_details(vec![info("A_B"), Detail::Opaque(DetailType::BadRequest), info("C_D")]);
        let findings = run(duplicate_error_info, &two, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path.as_str(), "details[2]");
    }

    #[test]
    fn test_missing_domain() {
        let status = with_details(vec![Detail::ErrorInfo(ErrorInfo::new("A_B", " "))]);
        let findings = run(missing_domain, &status, None);
        assert_eq!(findings[0].message, "domain is required");
        assert_eq!(findings[0].path.as_str(), "details[0].domain");
    }

    #[test]
    fn test_bindings_require_metadata() {
        let status = with_details(vec![Detail::ErrorInfo(
            ErrorInfo::new("RESOURCE_AVAILABILITY", "compute.googleapis.com")
                .with_metadata("zone", "us-east1-a"),
        )]);
        let ok = MessageBindings::new().bind("zone_name", "zone");
        assert!(run(missing_dynamic_metadata, &status, Some(&ok)).is_empty());

        let missing = ok.bind("vm", "instance");
        let findings = run(missing_dynamic_metadata, &status, Some(&missing));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path.as_str(), "details[0].metadata");
        assert!(findings[0].message.contains("`instance`"));
    }

    #[test]
    fn test_unverifiable_content_needs_text() {
        let mut status = with_details(vec![info("A_B")]);
        assert!(run(unverifiable_dynamic_content, &status, None).is_empty());

        status.details.push(Detail::LocalizedMessage(LocalizedMessage {
            locale: "en-US".to_string(),
            message: "Zone us-east1-a is out of capacity.".to_string(),
        }));
        let findings = run(unverifiable_dynamic_content, &status, None);
        assert_eq!(findings[0].path.as_str(), "details[1].message");

        status.message = "Zone us-east1-a is out of capacity.".to_string();
        assert_eq!(run(unverifiable_dynamic_content, &status, None)[0].path.as_str(), "message");

        let bindings = MessageBindings::new().bind("zone_name", "zone");
        assert!(run(unverifiable_dynamic_content, &status, Some(&bindings)).is_empty());
    }

    #[test]
    fn test_duplicate_detail_type_once_per_type() {
        let status = with_details(vec![
            info("A_B"),
            info("C_D"),
            info("E_F"),
            Detail::Opaque(DetailType::RetryInfo),
            Detail::Opaque(DetailType::RetryInfo),
        ]);
        let paths: Vec<String> = run(duplicate_detail_type, &status, None)
            .into_iter()
            .map(|f| f.path.to_string())
            .collect();
        assert_eq!(paths, vec!["details[1]", "details[4]"]);
    }

    #[test]
    fn test_localized_message_completeness() {
        let status = with_details(vec![Detail::LocalizedMessage(LocalizedMessage {
            locale: String::new(),
            message: "hello".to_string(),
        })]);
        assert_eq!(
            run(incomplete_localized_message, &status, None)[0].path.as_str(),
            "details[0].locale"
        );
        assert!(run(malformed_locale, &status, None).is_empty());
    }

    #[test]
    fn test_help_links() {
        let status = with_details(vec![Detail::Help(Help {
            links: vec![
                HelpLink {
                    description: "Quota docs".to_string(),
                    url: "https://cloud.example.com/quotas".to_string(),
                },
                HelpLink {
                    description: String::new(),
                    url: "/docs/quotas".to_string(),
                },
                HelpLink {
                    description: "FTP".to_string(),
                    url: "ftp://example.com/x".to_string(),
                },
            ],
        })]);

        let missing = run(missing_help_description, &status, None);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].path.as_str(), "details[0].links[1].description");

        let bad: Vec<String> = run(malformed_help_url, &status, None)
            .into_iter()
            .map(|f| f.path.to_string())
            .collect();
        assert_eq!(bad, vec!["details[0].links[1].url", "details[0].links[2].url"]);
    }

    #[test]
    fn test_other_candidates_ignored() {
        let options = CheckOptions::default();
        let base = FieldPath::root();
        let ctx = CheckContext {
            base: &base,
            options: &options,
            bindings: None,
        };
        let revisions: [crate::model::ResourceRevision; 0] = [];
        assert!(missing_error_info(&Candidate::History(&revisions), &ctx).is_empty());
    }
}
