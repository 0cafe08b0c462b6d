use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ng12_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ng12");
    path
}

const GUIDELINE_PAGES: &[&str] = &[
    "Lung and pleural cancers. Refer people using a suspected cancer pathway referral for lung cancer if their chest X-ray findings suggest lung cancer.",
    "",
    "Upper gastrointestinal tract cancers. Offer urgent direct access upper gastrointestinal endoscopy to people with dysphagia or aged 55 and over with weight loss and dyspepsia.",
    "Skin cancers. Refer people using a suspected cancer pathway referral for melanoma if dermoscopy suggests melanoma of the skin.",
];

fn setup_test_env(chunking: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(data_dir.join("ng12.txt"), GUIDELINE_PAGES.join("\x0c")).unwrap();
    fs::write(
        data_dir.join("patients.json"),
        r#"[{"patient_id": "PT-101", "age": 55, "symptoms": ["dysphagia"]}]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/vector_store/index.sqlite"

{chunking}

[embedding]
provider = "hash"
dims = 256

[index]
collection = "ng12"

[ingest]
pdf_path = "{root}/data/ng12.pdf"

[retrieval]
top_n = 2

[patients]
path = "{root}/data/patients.json"
"#,
        root = root.display(),
        chunking = chunking,
    );

    let config_path = config_dir.join("ng12.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn default_env() -> (TempDir, PathBuf) {
    setup_test_env("[chunking]\nmax_tokens = 1000\noverlap_tokens = 100")
}

fn text_path(tmp: &TempDir) -> String {
    tmp.path()
        .join("data")
        .join("ng12.txt")
        .to_string_lossy()
        .to_string()
}

fn run_ng12(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ng12_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ng12 binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn ingest_text(tmp: &TempDir, config_path: &Path) -> String {
    let text = text_path(tmp);
    let (stdout, stderr, success) = run_ng12(config_path, &["ingest", "--text", &text]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

#[test]
fn test_init_creates_store() {
    let (tmp, config_path) = default_env();
    let (stdout, _, success) = run_ng12(&config_path, &["init"]);
    assert!(success);
    assert!(stdout.contains("Store initialized"));
    assert!(tmp.path().join("vector_store").join("index.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = default_env();
    let (_, _, s1) = run_ng12(&config_path, &["init"]);
    let (_, _, s2) = run_ng12(&config_path, &["init"]);
    assert!(s1 && s2);
}

#[test]
fn test_ingest_text_pages() {
    let (tmp, config_path) = default_env();
    let stdout = ingest_text(&tmp, &config_path);
    assert!(stdout.contains("pages: 4"), "got: {}", stdout);
    assert!(stdout.contains("pages with text: 3"), "got: {}", stdout);
    assert!(stdout.contains("total chunks: 3"), "got: {}", stdout);
    assert!(stdout.contains("max chunk length (words):"), "got: {}", stdout);
    assert!(stdout.contains("collection: ng12 (3 entries)"), "got: {}", stdout);
    assert!(stdout.trim_end().ends_with("ok"));
}

#[test]
fn test_ingest_dry_run_writes_nothing() {
    let (tmp, config_path) = default_env();
    let text = text_path(&tmp);
    let (stdout, _, success) = run_ng12(&config_path, &["ingest", "--text", &text, "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("(dry-run)"));
    assert!(stdout.contains("total chunks: 3"));

    let (stdout, _, success) = run_ng12(&config_path, &["collections"]);
    assert!(success);
    assert!(stdout.contains("No collections"), "got: {}", stdout);
}

#[test]
fn test_ingest_small_window_counts() {
    let (tmp, config_path) = setup_test_env("[chunking]\nmax_tokens = 10\noverlap_tokens = 2");
    let stdout = ingest_text(&tmp, &config_path);
    // Pages of 23, 25 and 19 words, step 8: 3 windows each
    assert!(stdout.contains("total chunks: 9"), "got: {}", stdout);
    assert!(stdout.contains("max chunk length (words): 10"), "got: {}", stdout);
}

#[test]
fn test_reingest_and_rebuild_keep_count() {
    let (tmp, config_path) = default_env();
    ingest_text(&tmp, &config_path);
    ingest_text(&tmp, &config_path);

    let text = text_path(&tmp);
    let (stdout, _, success) = run_ng12(&config_path, &["ingest", "--text", &text, "--rebuild"]);
    assert!(success);
    assert!(stdout.contains("collection: ng12 (3 entries)"), "got: {}", stdout);
}

#[test]
fn test_search_returns_matching_page() {
    let (tmp, config_path) = default_env();
    ingest_text(&tmp, &config_path);

    let (stdout, stderr, success) = run_ng12(
        &config_path,
        &["search", "dyspepsia weight loss endoscopy", "--json"],
    );
    assert!(success, "search failed: {}", stderr);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = v["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["metadata"]["page"], 3);
    assert_eq!(results[0]["metadata"]["chunk_id"], "ng12_0003_01");
    assert_eq!(results[0]["metadata"]["source"], "NG12 PDF");
}

#[test]
fn test_search_top_n() {
    let (tmp, config_path) = default_env();
    ingest_text(&tmp, &config_path);

    let (stdout, _, success) =
        run_ng12(&config_path, &["search", "melanoma", "--top-n", "1", "--json"]);
    assert!(success);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["results"].as_array().unwrap().len(), 1);
    assert_eq!(v["results"][0]["metadata"]["page"], 4);
}

#[test]
fn test_search_text_output() {
    let (tmp, config_path) = default_env();
    ingest_text(&tmp, &config_path);

    let (stdout, _, success) = run_ng12(&config_path, &["search", "chest X-ray lung"]);
    assert!(success);
    assert!(stdout.contains("[page 1] ng12_0001_00"), "got: {}", stdout);
}

#[test]
fn test_search_empty_query() {
    let (tmp, config_path) = default_env();
    ingest_text(&tmp, &config_path);

    let (stdout, _, success) = run_ng12(&config_path, &["search", "   "]);
    assert!(success);
    assert!(stdout.contains("No relevant guideline sections found."));
}

#[test]
fn test_search_before_ingest_fails() {
    let (_tmp, config_path) = default_env();
    run_ng12(&config_path, &["init"]);
    let (_, stderr, success) = run_ng12(&config_path, &["search", "lung cancer"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"), "got: {}", stderr);
}

#[test]
fn test_collections_lists_ingested() {
    let (tmp, config_path) = default_env();
    ingest_text(&tmp, &config_path);

    let (stdout, _, success) = run_ng12(&config_path, &["collections"]);
    assert!(success);
    let row = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("ng12"))
        .unwrap_or_else(|| panic!("no ng12 row in: {}", stdout));
    let cols: Vec<&str> = row.split_whitespace().collect();
    assert_eq!(cols, vec!["ng12", "cosine", "256", "3"]);
}

#[test]
fn test_invalid_window_rejected() {
    let (_tmp, config_path) = setup_test_env("[chunking]\nmax_tokens = 100\noverlap_tokens = 100");
    let (_, stderr, success) = run_ng12(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("invalid chunk window"), "got: {}", stderr);
}

#[test]
fn test_ingest_corrupt_pdf_fails() {
    let (tmp, config_path) = default_env();
    let pdf = tmp.path().join("data").join("bad.pdf");
    fs::write(&pdf, b"not a valid pdf").unwrap();
    let (_, stderr, success) =
        run_ng12(&config_path, &["ingest", "--pdf", pdf.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Failed to extract"), "got: {}", stderr);
}

#[test]
fn test_ingest_missing_default_pdf_fails() {
    let (_tmp, config_path) = default_env();
    let (_, stderr, success) = run_ng12(&config_path, &["ingest"]);
    assert!(!success);
    assert!(stderr.contains("ng12.pdf"), "got: {}", stderr);
}

#[test]
fn test_patient_lookup() {
    let (_tmp, config_path) = default_env();
    let (stdout, _, success) = run_ng12(&config_path, &["patient", "PT-101"]);
    assert!(success);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["age"], 55);

    let (stdout, _, success) = run_ng12(&config_path, &["patient", "PT-999"]);
    assert!(success);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["found"], false);
    assert_eq!(v["patient_id"], "PT-999");
}
