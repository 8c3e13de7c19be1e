use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use toolsmith::tools::{DuplicatePolicy, HandlerConfig, Registry, ShellHandler, ToolDefinition};

fn tool(name: &str, source: &str) -> ToolDefinition {
    ToolDefinition::new(
        name,
        format!("{} tool", name),
        vec![],
        HandlerConfig::Shell(ShellHandler {
            command: vec!["true".to_string()],
            timeout_secs: None,
            working_dir: None,
            env: BTreeMap::new(),
            max_output_bytes: None,
        }),
        source,
    )
    .unwrap()
}

#[test]
fn test_register_and_find() {
    let registry = Registry::default();
    registry.register(tool("alpha", "a.yaml")).unwrap();
    registry.register(tool("beta", "a.yaml")).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.find("alpha").unwrap().name(), "alpha");
    assert!(registry.find("gamma").is_none());
    assert_eq!(registry.all().names(), vec!["alpha", "beta"]);
}

#[test]
fn test_duplicate_rejected_by_default() {
    let registry = Registry::default();
    assert_eq!(registry.policy(), DuplicatePolicy::Reject);

    registry.register(tool("alpha", "a.yaml")).unwrap();
    let err = registry.register(tool("alpha", "b.yaml")).unwrap_err();

    assert_eq!(err.name, "alpha");
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.find("alpha").unwrap().source().to_str(), Some("a.yaml"));
}

#[test]
fn test_duplicate_overwrite_policy() {
    let registry = Registry::new(DuplicatePolicy::Overwrite);
    registry.register(tool("alpha", "a.yaml")).unwrap();
    registry.register(tool("beta", "a.yaml")).unwrap();
    registry.register(tool("alpha", "b.yaml")).unwrap();

    let catalog = registry.all();
    assert_eq!(catalog.names(), vec!["alpha", "beta"]);
    assert_eq!(catalog.get("alpha").unwrap().source().to_str(), Some("b.yaml"));
    assert_eq!(catalog.overwritten(), ["alpha".to_string()]);
}

#[test]
fn test_register_all_is_all_or_nothing() {
    let registry = Registry::default();
    registry.register(tool("existing", "a.yaml")).unwrap();

    let result = registry.register_all(vec![tool("fresh", "b.yaml"), tool("existing", "b.yaml")]);

    assert!(result.is_err());
    assert!(registry.find("fresh").is_none());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_snapshot_is_stable() {
    let registry = Registry::default();
    registry.register(tool("alpha", "a.yaml")).unwrap();

    let snapshot = registry.all();
    registry.register(tool("beta", "a.yaml")).unwrap();
    registry.clear();

    assert_eq!(snapshot.len(), 1);
    assert!(registry.is_empty());
}

#[test]
fn test_concurrent_readers_see_whole_generations() {
    let registry = Arc::new(Registry::default());
    let batch = |prefix: &str| -> Vec<ToolDefinition> {
        (0..20).map(|i| tool(&format!("{}_{}", prefix, i), "gen.yaml")).collect()
    };
    registry.register_all(batch("first")).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..500 {
                    let catalog = registry.all();
                    assert!(catalog.len() == 20 || catalog.len() == 40);
                }
            })
        })
        .collect();

    registry.register_all(batch("second")).unwrap();

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(registry.len(), 40);
}

#[test]
fn test_policy_from_str() {
    assert_eq!("reject".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::Reject));
    assert_eq!("Overwrite".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::Overwrite));
    assert!("merge".parse::<DuplicatePolicy>().is_err());
}
