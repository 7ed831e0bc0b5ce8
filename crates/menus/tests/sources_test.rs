#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Source discovery tests: data-defined sources, attachments and
//! nodes hanging off another source's tree.

use cms_menus::source::SourceDefinition;
use cms_menus::{MenuError, MenuPool, MenuResult, MenuSource};
use cms_menus_test_utils::{CountingSource, anonymous_request, assert, test_env, test_node};

const DEFINITIONS: &str = r#"[
    {
        "name": "Pages",
        "label": "Pages",
        "nodes": [
            {"id": "home", "title": "Home", "url": "/"},
            {"id": "blog", "title": "Blog", "url": "/blog/"}
        ]
    },
    {
        "name": "Blog",
        "label": "Blog categories",
        "attributes": {"cms_enabled": true},
        "instances": [
            {
                "id": "main",
                "nodes": [
                    {"id": "rust", "title": "Rust", "url": "/blog/rust/",
                     "parent_id": "blog", "parent_namespace": "Pages"}
                ]
            }
        ]
    }
]"#;

fn register_definitions(pool: &MenuPool) -> MenuResult<()> {
    let definitions =
        SourceDefinition::from_plugin_results(vec![("blog".to_string(), DEFINITIONS.to_string())]);
    for definition in definitions {
        let (name, source) = definition.into_source()?;
        pool.register_source(name, source)?;
    }
    Ok(())
}

#[tokio::test]
async fn discovery_hook_registers_data_defined_sources() {
    let env = test_env(1, &["en"]);
    env.pool
        .add_discovery_hook(Box::new(|pool: &MenuPool| -> MenuResult<()> {
            register_definitions(pool)
        }));

    let renderer = env.pool.renderer(anonymous_request("/blog/rust/")).await.unwrap();
    let namespaces: Vec<&str> = renderer.sources().iter().map(|s| s.namespace()).collect();
    assert_eq!(namespaces, ["Pages", "Blog:main"]);

    let menu = renderer.get_nodes(None, None, false).await;
    assert::has_node(&menu, "Blog:main", "rust");

    let rust = menu.find("Blog:main", "rust").unwrap();
    assert!(rust.selected);
    assert_eq!(rust.level, 1);
    assert!(menu.find("Pages", "blog").unwrap().ancestor);
    assert!(!menu.find("Pages", "home").unwrap().ancestor);
}

#[tokio::test]
async fn menus_by_attribute_finds_data_defined_sources() {
    let env = test_env(1, &["en"]);
    register_definitions(&env.pool).unwrap();
    env.pool.initialize().unwrap();

    let found = env
        .pool
        .menus_by_attribute("cms_enabled", &serde_json::json!(true))
        .await;
    assert_eq!(found, [("Blog".to_string(), "Blog categories".to_string())]);
}

#[tokio::test]
async fn failing_discovery_hook_is_retried() {
    let env = test_env(1, &["en"]);
    env.pool
        .add_discovery_hook(Box::new(|pool: &MenuPool| -> MenuResult<()> {
            pool.register_source(
                "Pages",
                MenuSource::plain(CountingSource::new(vec![test_node("home")])),
            )
        }));
    env.pool
        .register_source("Pages", MenuSource::plain(CountingSource::new(Vec::new())))
        .unwrap();

    let err = env.pool.renderer(anonymous_request("/")).await.unwrap_err();
    assert!(matches!(err, MenuError::DuplicateRegistration { ref name } if name == "Pages"));
    assert!(!env.pool.is_initialized());
}

#[tokio::test]
async fn definition_with_nodes_and_instances_is_rejected() {
    let json = r#"[{"name": "Odd", "nodes": [], "instances": []}]"#;
    let mut definitions =
        SourceDefinition::from_plugin_results(vec![("odd".to_string(), json.to_string())]);
    assert_eq!(definitions.len(), 1);

    let err = definitions.remove(0).into_source().unwrap_err();
    assert!(matches!(err, MenuError::InvalidSource { ref name, .. } if name == "Odd"));
}
