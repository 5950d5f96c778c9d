use crate::api::handlers::{admin, generate, health, settings};
use utoipa::{
    OpenApi,
    openapi::{Contact, License},
};

/// Add new endpoints to `paths(...)` so they show up in the OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        settings::put_api_key,
        settings::get_api_key,
        settings::delete_api_key,
        generate::generate,
        admin::reset_rate_limit,
    ),
    components(schemas(
        health::Health,
        settings::ApiKeyRequest,
        settings::ApiKeyStatus,
        generate::GenerateRequest,
        generate::GenerateResponse,
    )),
    tags(
        (name = "health", description = "Service probes"),
        (name = "settings", description = "Per-user AI API key, encrypted at rest"),
        (name = "ai", description = "Rate-limited relay to the generative-language API"),
        (name = "admin", description = "Operator tooling"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata for the document info.
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = cargo_license();
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(':').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    let Some(start) = author.find('<') else {
        let name = author.trim();
        return (Some(name).filter(|n| !n.is_empty()), None);
    };

    let name = author[..start].trim();
    let email = author[start + 1..].trim_end_matches('>').trim();
    (
        Some(name).filter(|n| !n.is_empty()),
        Some(email).filter(|e| !e.is_empty()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_author_splits_name_and_email() {
        assert_eq!(
            parse_author("Team Taleem <team@taleem.dev>"),
            (Some("Team Taleem"), Some("team@taleem.dev"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
        assert_eq!(parse_author("<only@mail>"), (None, Some("only@mail")));
    }

    #[test]
    fn openapi_documents_every_route() {
        let doc = openapi();
        for path in [
            "/health",
            "/v1/settings/api-key",
            "/v1/ai/generate",
            "/v1/admin/rate-limits/{identity}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(
            doc.info.contact.and_then(|c| c.email).as_deref(),
            Some("team@taleem.dev")
        );
    }
}
