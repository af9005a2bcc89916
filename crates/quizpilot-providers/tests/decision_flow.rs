//! End-to-end decision flow against a mocked Gemini endpoint.

use std::sync::Arc;

use wiremock::matchers::{body_string_contains, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quizpilot_core::engine::{DecisionEngine, ResolutionSource};
use quizpilot_core::harvest::{GradedObservation, HarvestImporter};
use quizpilot_core::text::QuestionKey;
use quizpilot_core::traits::AlwaysRotate;
use quizpilot_providers::mock::MockSelector;
use quizpilot_providers::{create_selector, QuizpilotConfig};

fn opts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn gemini_reply(text: &str) -> serde_json::Value {
    serde_json::json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
}

#[tokio::test]
async fn inference_then_harvest_then_memory() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("key", "k1"))
        .and(body_string_contains("Capital of France?"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_reply("{\"answerText\":\"Lyon\",\"answerIndex\":1}")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = QuizpilotConfig {
        api_keys: vec!["k1".into()],
        base_url: server.uri(),
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let selector = create_selector(&config, Arc::new(AlwaysRotate)).unwrap();
    let engine = DecisionEngine::new(config.memory_repository(), selector);
    let options = opts(&["Paris", "Lyon", "Nice"]);

    let first = engine.resolve("Capital of France?", &options).await.unwrap();
    assert_eq!(first.source, ResolutionSource::Inference);
    assert_eq!(first.chosen_text, "Lyon");

    // Grading shows Paris was the right answer.
    let importer = HarvestImporter::new(config.memory_repository());
    let report = importer
        .import(&[GradedObservation {
            question: Some("Capital of France?".into()),
            answers: options.clone(),
            correct: true,
            chosen_index: Some(0),
        }])
        .unwrap();
    assert_eq!(report.learned_correct, 1);

    // Fresh repository over the same files: the answer comes from memory,
    // and the mock's expect(1) proves no second request was sent.
    let engine = DecisionEngine::new(
        config.memory_repository(),
        create_selector(&config, Arc::new(AlwaysRotate)).unwrap(),
    );
    let second = engine
        .resolve("  capital of   FRANCE? ", &opts(&["Nice", "Paris"]))
        .await
        .unwrap();
    assert_eq!(second.source, ResolutionSource::Memory);
    assert_eq!(second.chosen_index, 1);
    assert!(!second.used_inference);

    let stored = config
        .memory_repository()
        .get(&QuestionKey::from_question("Capital of France?"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.options.len(), 3);
}

#[tokio::test]
async fn eliminated_options_are_not_offered() {
    let dir = tempfile::tempdir().unwrap();
    let config = QuizpilotConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let memory = config.memory_repository();
    let key = QuestionKey::from_question("Largest planet?");
    memory.add_wrong(&key, "Mars").unwrap();

    let mock = Arc::new(MockSelector::with_fixed_reply("{\"answerText\":\"Jupiter\"}"));
    let engine = DecisionEngine::new(memory, mock.clone());

    let r = engine
        .resolve("Largest planet?", &opts(&["Mars", "Jupiter", "Venus"]))
        .await
        .unwrap();
    assert_eq!(r.chosen_index, 1);
    assert_eq!(r.source, ResolutionSource::Inference);
    assert_eq!(mock.last_candidates(), opts(&["Jupiter", "Venus"]));
}

#[tokio::test]
async fn rotation_is_persisted_to_the_data_dir() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("key", "k1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("key", "k2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("{\"answerIndex\":0}")))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = QuizpilotConfig {
        api_keys: vec!["k1".into(), "k2".into()],
        base_url: server.uri(),
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let engine = DecisionEngine::new(
        config.memory_repository(),
        create_selector(&config, Arc::new(AlwaysRotate)).unwrap(),
    );
    engine.resolve("Q?", &opts(&["A", "B"])).await.unwrap();

    let saved = std::fs::read_to_string(config.credentials_path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json["cursor"], 1);
}
