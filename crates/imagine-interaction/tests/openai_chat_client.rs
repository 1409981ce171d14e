use imagine_core::agent::ResponseGenerator;
use imagine_core::persona::CharacterSuggestionService;
use imagine_core::session::TranscriptLine;
use imagine_core::ImagineError;
use imagine_interaction::OpenAiChatClient;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(contents: &[&str]) -> serde_json::Value {
    let choices: Vec<_> = contents
        .iter()
        .enumerate()
        .map(|(index, content)| {
            json!({
                "index": index,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            })
        })
        .collect();
    json!({ "id": "chatcmpl-test", "object": "chat.completion", "choices": choices })
}

fn client_for(server: &MockServer) -> OpenAiChatClient {
    OpenAiChatClient::new("sk-test", "gpt-3.5-turbo")
        .with_base_url(server.uri())
        .with_max_tokens(50)
}

#[tokio::test]
async fn generate_sends_persona_then_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "max_tokens": 50,
            "messages": [
                { "role": "system", "content": "Your name is Elaine." },
                { "role": "user", "content": "Jerry: Elaine, what do you think?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&["Get out!"])))
        .expect(1)
        .mount(&server)
        .await;

    let transcript = vec![TranscriptLine::new("Jerry", "Elaine, what do you think?")];
    let candidates = client_for(&server)
        .generate("Your name is Elaine.", &transcript)
        .await
        .unwrap();

    assert_eq!(candidates, vec!["Get out!"]);
}

#[tokio::test]
async fn generate_returns_every_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(&["First.", "Second."])),
        )
        .mount(&server)
        .await;

    let candidates = client_for(&server).generate("persona", &[]).await.unwrap();
    assert_eq!(candidates, vec!["First.", "Second."]);
}

#[tokio::test]
async fn upstream_error_becomes_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached", "type": "requests" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("persona", &[]).await.unwrap_err();
    match err {
        ImagineError::Generation(message) => {
            assert!(message.contains("429"));
            assert!(message.contains("Rate limit reached"));
        }
        other => panic!("Expected Generation error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(&["Too late."]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).with_timeout(Duration::from_millis(100));
    let err = client.generate("persona", &[]).await.unwrap_err();
    assert!(matches!(err, ImagineError::Generation(_)));
}

#[tokio::test]
async fn suggest_parses_semicolon_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 100
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&[
            "Jerry Seinfeld; George Costanza ; Elaine Benes; Cosmo Kramer;",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server)
        .with_suggestion_model("gpt-4o-mini")
        .with_suggestion_max_tokens(100);
    let names = client.suggest("Seinfeld").await.unwrap();

    assert_eq!(
        names,
        vec!["Jerry Seinfeld", "George Costanza", "Elaine Benes", "Cosmo Kramer"]
    );
}

#[tokio::test]
async fn suggest_without_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&[])))
        .mount(&server)
        .await;

    let err = client_for(&server).suggest("Seinfeld").await.unwrap_err();
    assert!(matches!(err, ImagineError::Suggestion(_)));
}
