use std::fs;
use std::path::Path;
use tempfile::TempDir;
use toolsmith::tools::{Registry, ToolLoader};

fn write_tool(dir: &Path, file: &str, name: &str) {
    let script = format!(
        "tools:\n  - name: {}\n    description: {} tool\n    handler:\n      shell:\n        command: \"true\"\n",
        name, name
    );
    fs::write(dir.join(file), script).unwrap();
}

#[test]
fn test_load_counts_valid_and_invalid_files() {
    let temp_dir = TempDir::new().unwrap();
    write_tool(temp_dir.path(), "a.yaml", "alpha");
    write_tool(temp_dir.path(), "b.yml", "beta");
    write_tool(temp_dir.path(), "c.yaml", "gamma");
    fs::write(temp_dir.path().join("broken.yaml"), "tools: [this is: not valid").unwrap();
    fs::write(
        temp_dir.path().join("bad_ref.yaml"),
        "tools:\n  - name: bad\n    handler: { http: { url: \"https://x.test/{nope}\" } }\n",
    )
    .unwrap();

    let registry = Registry::default();
    let summary = ToolLoader::new(temp_dir.path()).load(&registry).unwrap();

    assert_eq!(summary.files_processed, 5);
    assert_eq!(summary.files_failed, 2);
    assert_eq!(summary.tools_loaded, 3);
    assert!(!summary.is_clean());
    assert_eq!(registry.len(), 3);
    assert!(registry.find("bad").is_none());

    let failed: Vec<_> = summary
        .failures
        .iter()
        .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(failed, vec!["bad_ref.yaml", "broken.yaml"]);
    assert_eq!(summary.to_string(), "loaded 3 tools from 5 files (2 failed)");
}

#[test]
fn test_reload_reflects_added_and_deleted_files() {
    let temp_dir = TempDir::new().unwrap();
    write_tool(temp_dir.path(), "b.yaml", "beta");
    let loader = ToolLoader::new(temp_dir.path());
    let registry = Registry::default();
    loader.load(&registry).unwrap();
    assert!(registry.find("beta").is_some());

    write_tool(temp_dir.path(), "a.yaml", "alpha");
    fs::remove_file(temp_dir.path().join("b.yaml")).unwrap();
    let summary = loader.reload(&registry).unwrap();

    assert!(summary.is_clean());
    assert!(registry.find("alpha").is_some());
    assert!(registry.find("beta").is_none());
}

#[test]
fn test_reload_does_not_clash_with_previous_generation() {
    let temp_dir = TempDir::new().unwrap();
    write_tool(temp_dir.path(), "a.yaml", "alpha");
    let loader = ToolLoader::new(temp_dir.path());
    let registry = Registry::default();

    loader.load(&registry).unwrap();
    let summary = loader.reload(&registry).unwrap();

    assert!(summary.is_clean());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_missing_directory_loads_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::default();
    let summary = ToolLoader::new(temp_dir.path().join("absent"))
        .load(&registry)
        .unwrap();

    assert_eq!(summary.files_processed, 0);
    assert_eq!(summary.tools_loaded, 0);
    assert!(summary.is_clean());
    assert!(registry.is_empty());
}

#[test]
fn test_nested_directories_and_other_files() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("team").join("infra");
    fs::create_dir_all(&nested).unwrap();
    write_tool(&nested, "deep.yaml", "deep");
    write_tool(temp_dir.path(), "top.yaml", "top");
    fs::write(temp_dir.path().join("README.md"), "not a tool").unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "tools: [").unwrap();

    let registry = Registry::default();
    let loader = ToolLoader::new(temp_dir.path());
    assert_eq!(loader.discover().unwrap().len(), 2);

    let summary = loader.load(&registry).unwrap();
    assert_eq!(summary.files_processed, 2);
    assert!(registry.find("deep").is_some());
    assert!(registry.find("top").is_some());
}

#[test]
fn test_duplicate_across_files_rejects_later_file() {
    let temp_dir = TempDir::new().unwrap();
    write_tool(temp_dir.path(), "a.yaml", "shared");
    write_tool(temp_dir.path(), "b.yaml", "shared");

    let registry = Registry::default();
    let summary = ToolLoader::new(temp_dir.path()).load(&registry).unwrap();

    assert_eq!(summary.files_failed, 1);
    assert!(summary.failures[0].path.ends_with("b.yaml"));
    assert_eq!(
        registry.find("shared").unwrap().source().file_name().unwrap(),
        "a.yaml"
    );
}
