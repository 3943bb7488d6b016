use serial_test::serial;

use studium::config::Config;
use studium::extract::DEFAULT_FETCH_ATTEMPTS;
use studium::grading::DEFAULT_MODEL;
use studium::index::DEFAULT_INDEX;

#[test]
#[serial]
fn config_defaults_apply_when_env_is_empty() {
    for key in ["ELASTIC_SEARCH_URL", "EMBEDDER_URL", "GEMINI_MODEL", "MATERIAL_INDEX"] {
        std::env::remove_var(key);
    }
    let config = Config::from_env();
    assert_eq!(config.elastic_url, None);
    assert_eq!(config.embedder_url, None);
    assert_eq!(config.gemini_model, DEFAULT_MODEL);
    assert_eq!(config.index_name, DEFAULT_INDEX);
    assert_eq!(config.fetch_attempts, DEFAULT_FETCH_ATTEMPTS);
}

#[test]
#[serial]
fn config_reads_endpoints_from_env() {
    std::env::set_var("ELASTIC_SEARCH_URL", "http://localhost:9200");
    std::env::set_var("MATERIAL_INDEX", "course_resources_test");
    let config = Config::from_env();
    assert_eq!(
        config.elastic_url.as_deref(),
        Some("http://localhost:9200")
    );
    assert_eq!(config.index_name, "course_resources_test");
    std::env::remove_var("ELASTIC_SEARCH_URL");
    std::env::remove_var("MATERIAL_INDEX");
}

#[tokio::test]
#[serial]
async fn offline_config_builds_an_assistant() {
    for key in ["ELASTIC_SEARCH_URL", "EMBEDDER_URL", "GEMINI_API_KEY"] {
        std::env::remove_var(key);
    }
    let config = Config::from_env();
    // No endpoints configured: encoder and index degrade to the offline
    // substitutes and construction must still succeed.
    assert!(config.build_assistant().await.is_ok());
}
