use chartgate::handlers::*;
use chartgate_core::{
    Mediator, MediatorConfig, MediatorError, RequestContext, RequestKind, Transport,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

// ============================================================================
// URL Input Tests
// ============================================================================

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "wikiraw:///Main_Page")?;
    writeln!(temp_file, "# a comment")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "  tabular:///Data.tab  ")?;

    let urls = load_urls_from_file(temp_file.path())?;

    assert_eq!(urls, vec!["wikiraw:///Main_Page", "tabular:///Data.tab"]);
    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();
    writeln!(temp_file, "# only comments").unwrap();

    let result = load_urls_from_file(temp_file.path());

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("No URLs found"));
}

#[test]
fn test_collect_urls_arguments_then_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "map:///B.map").unwrap();

    let urls = collect_urls(&["map:///A.map".to_string()], Some(temp_file.path())).unwrap();
    assert_eq!(urls, vec!["map:///A.map", "map:///B.map"]);
}

#[test]
fn test_collect_urls_no_input() {
    let result = collect_urls(&[], None);
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .contains("Either URL arguments or --urls-file must be provided")
    );
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_write_default_config_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chartgate").join("config.toml");

    assert!(write_default_config(&path, false).unwrap());
    let config = load_config(path.to_str().unwrap()).unwrap();
    assert_eq!(config, MediatorConfig::wikimedia_defaults());
}

#[test]
fn test_write_default_config_keeps_existing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "is_trusted = true\n").unwrap();

    assert!(!write_default_config(&path, false).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "is_trusted = true\n");

    assert!(write_default_config(&path, true).unwrap());
    assert!(!load_config(path.to_str().unwrap()).unwrap().is_trusted);
}

#[test]
fn test_load_config_missing_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.toml");

    let err = load_config(path.to_str().unwrap()).unwrap_err();
    assert!(format!("{:#}", err).contains("missing.toml"));
}

#[test]
fn test_load_config_invalid_toml() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "domains = 3").unwrap();

    assert!(load_config(temp_file.path().to_str().unwrap()).is_err());
}

// ============================================================================
// Output Helper Tests
// ============================================================================

#[test]
fn test_build_context() {
    let context = build_context("sec.org", Some("de"), true);
    assert_eq!(context.kind, RequestKind::Navigate);
    assert_eq!(context.default_domain, "sec.org");
    assert_eq!(context.site_language.as_deref(), Some("de"));

    let context = build_context("sec.org", None, false);
    assert_eq!(context, RequestContext::fetch("sec.org"));
}

#[test]
fn test_describe_translation() {
    let mediator = Mediator::new(
        MediatorConfig::default()
            .with_domains("https", ["sec.org"])
            .with_domains("wikidatasparql", ["query.sec.org"]),
    );
    let context = RequestContext::fetch("sec.org");

    let translation = mediator.translate("wikiapi:///?action=query", &context).unwrap();
    assert_eq!(
        describe_translation(&translation),
        "https://sec.org/w/api.php?action=query&format=json&formatversion=2  [cors]"
    );

    let translation = mediator.translate("wikidatasparql:///?query=ASK", &context).unwrap();
    assert_eq!(
        describe_translation(&translation),
        "https://query.sec.org/bigdata/namespace/wdq/sparql?query=ASK  [Accept: application/sparql-results+json]"
    );
}

#[test]
fn test_describe_host() {
    let mediator = Mediator::new(
        MediatorConfig::default()
            .with_domains("http", ["nonsec.org"])
            .with_alias("nonsec", "nonsec.org"),
    );

    let sanitized = mediator.sanitize_host("nonsec").unwrap();
    assert_eq!(sanitized.protocol, Transport::Http);
    assert_eq!(describe_host(&sanitized), "http://nonsec.org");

    assert_eq!(
        mediator.sanitize_host("sec.org"),
        Err(MediatorError::HostNotAllowed("sec.org".to_string()))
    );
}
