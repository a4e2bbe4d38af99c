use super::*;

#[test]
fn model_names_must_not_be_blank() {
    assert!(non_empty_model(&"llama3.2:latest".to_string()).is_ok());
    assert!(non_empty_model(&String::new()).is_err());
    assert!(non_empty_model(&"   ".to_string()).is_err());
}

#[test]
fn unreachable_ollama_reports_failure() {
    let ollama = OllamaConfig {
        host: "127.0.0.1".to_string(),
        port: 9, // discard port, nothing listens there
        ..OllamaConfig::default()
    };

    assert!(!test_ollama_connection(&ollama));
}
