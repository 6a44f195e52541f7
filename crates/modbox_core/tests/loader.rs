use modbox_core::{load_modules, DomAdapter, LoaderConfig, LoaderConfigError, MemoryDocument};
use std::io::Write;

fn page_with(ids: &[&str]) -> MemoryDocument {
    let doc = MemoryDocument::new();
    let body = doc.body().expect("body");
    for id in ids {
        doc.insert_element(body, "div", &[("id", *id)]);
    }
    doc
}

fn injected_scripts(doc: &MemoryDocument) -> Vec<String> {
    doc.query("script", None)
        .into_iter()
        .filter_map(|script| doc.attribute(script, "src"))
        .collect()
}

#[test]
fn injects_enabled_modules_with_containers_only() {
    let doc = page_with(&["example", "gallery", "disabled"]);
    let config = LoaderConfig::from_json_str(
        r#"{
            "base_path": "/static/modules/",
            "modules": {"example": 1, "gallery": 1, "disabled": 0, "absent": 1}
        }"#,
    )
    .expect("valid config");

    let loaded = load_modules(&config, &doc);
    assert_eq!(
        loaded,
        vec!["/static/modules/example.js", "/static/modules/gallery.js"]
    );
    assert_eq!(injected_scripts(&doc), loaded);

    let body = doc.body().expect("body");
    let scripts = doc.query("script", None);
    assert!(scripts
        .iter()
        .all(|script| doc.parent_of(*script) == Some(body)));
}

#[test]
fn injects_scripts_in_declaration_order() {
    let doc = page_with(&["alpha", "zeta", "mid"]);
    let config = LoaderConfig::from_json_str(r#"{"modules": {"zeta": 1, "mid": 1, "alpha": 1}}"#)
        .expect("valid config");

    let loaded = load_modules(&config, &doc);
    assert_eq!(loaded, vec!["zeta.js", "mid.js", "alpha.js"]);
    assert_eq!(injected_scripts(&doc), loaded);
}

#[test]
fn empty_table_injects_nothing() {
    let doc = page_with(&["example"]);
    let loaded = load_modules(&LoaderConfig::default(), &doc);
    assert!(loaded.is_empty());
    assert!(injected_scripts(&doc).is_empty());
}

#[test]
fn reads_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{"modules": {{"example": 1}}}}"#).expect("write config");

    let config = LoaderConfig::from_path(file.path()).expect("config from file");
    let doc = page_with(&["example"]);
    assert_eq!(load_modules(&config, &doc), vec!["example.js"]);
}

#[test]
fn reports_missing_config_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = LoaderConfig::from_path(dir.path().join("absent.json"))
        .expect_err("missing file must fail");
    assert!(matches!(err, LoaderConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}
