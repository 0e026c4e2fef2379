//! End-to-end pipeline tests against scripted model and runner doubles.

use async_trait::async_trait;
use opsmcp_core::*;
use opsmcp_executor::CommandRunner;
use opsmcp_providers::{ChatFormat, ChatModel, ProviderError};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct ChatCall {
    model: String,
    system_prompt: String,
    payload: String,
}

/// Replies are queued per model; an empty queue answers with an API error.
#[derive(Default)]
struct ScriptedChat {
    replies: Mutex<HashMap<String, VecDeque<Result<String, String>>>>,
    calls: Mutex<Vec<ChatCall>>,
}

impl ScriptedChat {
    fn reply(&self, model: &str, text: impl Into<String>) -> &Self {
        self.replies
            .lock()
            .entry(model.to_string())
            .or_default()
            .push_back(Ok(text.into()));
        self
    }

    fn fail(&self, model: &str, reason: &str) -> &Self {
        self.replies
            .lock()
            .entry(model.to_string())
            .or_default()
            .push_back(Err(reason.to_string()));
        self
    }

    fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().clone()
    }

    fn calls_to(&self, model: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.model == model).count()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_payload: &str,
        _format: ChatFormat,
    ) -> Result<String, ProviderError> {
        self.calls.lock().push(ChatCall {
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            payload: user_payload.to_string(),
        });

        let next = self
            .replies
            .lock()
            .get_mut(model)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(ProviderError::Http(reason)),
            None => Err(ProviderError::Api(format!("no scripted reply for {}", model))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Records commands; any command containing "fail" exits 1.
#[derive(Default)]
struct RecordingRunner {
    commands: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str) -> CommandResult {
        self.commands.lock().push(command.to_string());
        let failed = command.contains("fail");
        CommandResult {
            command: command.to_string(),
            exit_code: if failed { 1 } else { 0 },
            stdout: if failed { String::new() } else { format!("ran {}", command) },
            stderr: if failed { "boom".to_string() } else { String::new() },
        }
    }
}

fn test_config() -> DispatchConfig {
    let mut chains = HashMap::new();
    chains.insert(
        Category::ServerOperation,
        vec!["ops-a".to_string(), "ops-b".to_string()],
    );
    chains.insert(Category::CodeGeneration, vec!["code-a".to_string()]);
    chains.insert(Category::Explanatory, vec!["explain-a".to_string()]);
    chains.insert(Category::Unknown, vec!["unknown-a".to_string()]);

    DispatchConfig {
        classifier_model: "classifier".to_string(),
        model_chains: chains,
        context: ContextSettings {
            base_dir: PathBuf::from("/nonexistent/opsmcp-test"),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn classification(nature: &str, confidence: f64) -> String {
    json!({
        "nature": nature,
        "rewritten_request": "normalized request",
        "confidence": confidence
    })
    .to_string()
}

fn build(chat: &Arc<ScriptedChat>, runner: &Arc<RecordingRunner>) -> Dispatcher {
    build_with(chat, runner, test_config())
}

fn build_with(
    chat: &Arc<ScriptedChat>,
    runner: &Arc<RecordingRunner>,
    config: DispatchConfig,
) -> Dispatcher {
    Dispatcher::new(chat.clone(), runner.clone(), config).unwrap()
}

#[tokio::test]
async fn low_confidence_routes_to_unknown_chain() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("server_operation", 0.4));
    chat.reply("unknown-a", r#"{"description": "noop", "commands": []}"#);
    let runner = Arc::new(RecordingRunner::default());

    let outcome = build(&chat, &runner).handle("check nginx").await.unwrap();

    assert_eq!(outcome.mode(), "NO_EXEC");
    assert_eq!(chat.calls_to("unknown-a"), 1);
    assert_eq!(chat.calls_to("ops-a"), 0);
}

#[tokio::test]
async fn empty_plan_is_no_exec_and_runs_nothing() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("server_operation", 0.95));
    chat.reply(
        "ops-a",
        r#"{"description": "Refusing: deleting system files is unsafe", "commands": [], "output_file": null}"#,
    );
    let runner = Arc::new(RecordingRunner::default());

    let outcome = build(&chat, &runner).handle("delete /etc").await.unwrap();

    match outcome {
        DispatchOutcome::NoExec { description } => assert!(description.contains("unsafe")),
        other => panic!("expected NO_EXEC, got {:?}", other),
    }
    assert!(runner.commands.lock().is_empty());
}

#[tokio::test]
async fn every_command_runs_in_order_despite_failures() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("server_operation", 0.9));
    chat.reply(
        "ops-a",
        r#"```json
{"description": "inspect", "commands": ["uptime", "fail-me", "df -h"], "output_file": null}
```"#,
    );
    let runner = Arc::new(RecordingRunner::default());

    let outcome = build(&chat, &runner).handle("inspect host").await.unwrap();

    let DispatchOutcome::Execute { results, saved_to, .. } = outcome else {
        panic!("expected EXECUTE");
    };
    let commands: Vec<&str> = results.iter().map(|r| r.command.as_str()).collect();
    assert_eq!(commands, vec!["uptime", "fail-me", "df -h"]);
    assert_eq!(results[1].exit_code, 1);
    assert_eq!(results[2].exit_code, 0);
    assert!(saved_to.is_none());
    assert_eq!(*runner.commands.lock(), vec!["uptime", "fail-me", "df -h"]);
}

#[tokio::test]
async fn results_are_appended_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("result.txt");

    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("server_operation", 0.9));
    chat.reply(
        "ops-a",
        json!({
            "description": "uptime",
            "commands": ["uptime"],
            "output_file": out.to_string_lossy()
        })
        .to_string(),
    );
    let runner = Arc::new(RecordingRunner::default());

    let outcome = build(&chat, &runner).handle("uptime to file").await.unwrap();

    let DispatchOutcome::Execute { saved_to, .. } = outcome else {
        panic!("expected EXECUTE");
    };
    assert_eq!(saved_to.as_deref(), Some(out.as_path()));
    let saved = std::fs::read_to_string(&out).unwrap();
    assert!(saved.contains("$ uptime"));
    assert!(saved.contains("ran uptime"));
}

#[tokio::test]
async fn identical_request_is_classified_once() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("code_generation", 0.8));
    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = build(&chat, &runner);

    let context = FileContext::new();
    let first = dispatcher.classifier().classify("write a script", &context).await;
    let second = dispatcher.classifier().classify("write a script", &context).await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(chat.calls_to("classifier"), 1);
    assert_eq!(dispatcher.metrics().snapshot().classify_cache_hits, 1);
}

#[tokio::test]
async fn classifier_transport_failure_degrades_and_is_retried() {
    let chat = Arc::new(ScriptedChat::default());
    chat.fail("classifier", "connection refused");
    chat.reply("classifier", classification("explanatory", 0.9));
    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = build(&chat, &runner);

    let context = FileContext::new();
    let first = dispatcher.classifier().classify("what is swap", &context).await;
    assert_eq!(*first, ClassificationResult::fallback("what is swap"));

    let second = dispatcher.classifier().classify("what is swap", &context).await;
    assert_eq!(second.category, Category::Explanatory);
    assert_eq!(chat.calls_to("classifier"), 2);
}

#[tokio::test]
async fn unparsable_classification_is_cached_as_fallback() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", "I think this is about servers");
    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = build(&chat, &runner);

    let context = FileContext::new();
    let first = dispatcher.classifier().classify("hmm", &context).await;
    let second = dispatcher.classifier().classify("hmm", &context).await;

    assert_eq!(first.category, Category::Unknown);
    assert_eq!(first.confidence, 0.0);
    assert_eq!(first.rewritten_request, "hmm");
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn report_trigger_beats_confident_server_operation() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("server_operation", 0.97));
    chat.reply(
        "ops-a",
        r#"{"summary": "Disk is 40% used", "steps": [], "risk": "low", "commands": ["df -h"]}"#,
    );
    let runner = Arc::new(RecordingRunner::default());

    let outcome = build(&chat, &runner)
        .handle("show disk usage [REPORT]")
        .await
        .unwrap();

    match outcome {
        DispatchOutcome::Report {
            body: ReportBody::Structured(report),
        } => {
            assert_eq!(report["summary"], "Disk is 40% used");
            assert!(report.get("commands").is_none());
        }
        other => panic!("expected REPORT, got {:?}", other),
    }
    assert!(runner.commands.lock().is_empty());
    assert!(chat
        .calls()
        .iter()
        .all(|c| c.system_prompt != prompts::PLANNER_PROMPT));
}

#[tokio::test]
async fn explanatory_category_yields_free_text_report() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("explanatory", 0.9));
    chat.reply("explain-a", "Swap is disk space used as overflow memory.");
    let runner = Arc::new(RecordingRunner::default());

    let outcome = build(&chat, &runner).handle("what is swap?").await.unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Report {
            body: ReportBody::Summary("Swap is disk space used as overflow memory.".to_string())
        }
    );
    let report_call = chat.calls().into_iter().find(|c| c.model == "explain-a").unwrap();
    assert!(report_call.payload.contains("normalized request"));
}

#[tokio::test]
async fn fallback_uses_second_model_when_first_fails() {
    let chat = Arc::new(ScriptedChat::default());
    chat.fail("A", "timeout");
    chat.reply("B", r#"{"answer": "from B"}"#);

    let invoker = FallbackInvoker::new(chat.clone(), Arc::new(SilentProgress), Metrics::new());
    let models = vec!["A".to_string(), "B".to_string()];

    let invocation = invoker
        .invoke(&models, "system", &json!({"q": 1}), ResponseFormat::Json)
        .await
        .unwrap();

    assert_eq!(invocation.model, "B");
    assert_eq!(invocation.reply, Reply::Json(json!({"answer": "from B"})));
    assert_eq!(invocation.failures.len(), 1);
    assert_eq!(invocation.failures[0].model, "A");
    assert!(invocation.failures[0].reason.contains("timeout"));

    let order: Vec<String> = chat.calls().into_iter().map(|c| c.model).collect();
    assert_eq!(order, vec!["A", "B"]);
}

#[tokio::test]
async fn malformed_reply_counts_as_failure() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("A", "not json at all");
    chat.reply("B", r#"{"ok": true}"#);

    let invoker = FallbackInvoker::new(chat.clone(), Arc::new(SilentProgress), Metrics::new());
    let models = vec!["A".to_string(), "B".to_string()];

    let invocation = invoker
        .invoke(&models, "system", &json!({}), ResponseFormat::Json)
        .await
        .unwrap();

    assert_eq!(invocation.model, "B");
    assert!(invocation.failures[0].reason.contains("malformed JSON"));
}

#[tokio::test]
async fn exhausted_chain_is_a_hard_error() {
    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("server_operation", 0.9));
    chat.fail("ops-a", "401 unauthorized");
    chat.fail("ops-b", "rate limited");
    let runner = Arc::new(RecordingRunner::default());
    let dispatcher = build(&chat, &runner);

    let err = dispatcher.handle("restart nothing").await.unwrap_err();

    match err {
        DispatchError::ModelsExhausted { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(last.contains("ops-b"));
            assert!(last.contains("rate limited"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(dispatcher.metrics().snapshot().dispatch_errors, 1);
    assert!(runner.commands.lock().is_empty());
}

#[tokio::test]
async fn empty_chain_is_exhausted_immediately() {
    let chat = Arc::new(ScriptedChat::default());
    let invoker = FallbackInvoker::new(chat.clone(), Arc::new(SilentProgress), Metrics::new());

    let err = invoker
        .invoke(&[], "system", &json!({}), ResponseFormat::Json)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("empty model chain"));
    assert!(chat.calls().is_empty());
}

#[tokio::test]
async fn context_trigger_attaches_masked_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.py"), "password = 'hunter2'").unwrap();

    let mut config = test_config();
    config.context.base_dir = dir.path().to_path_buf();

    let chat = Arc::new(ScriptedChat::default());
    chat.reply("classifier", classification("code_generation", 0.9));
    chat.reply("code-a", r#"{"description": "review only", "commands": []}"#);
    let runner = Arc::new(RecordingRunner::default());

    let outcome = build_with(&chat, &runner, config)
        .handle("review the project code")
        .await
        .unwrap();

    assert_eq!(outcome.mode(), "NO_EXEC");
    let classify_call = chat.calls().into_iter().find(|c| c.model == "classifier").unwrap();
    assert!(classify_call.payload.contains("app.py"));
    assert!(classify_call.payload.contains("[MASKED]"));
    assert!(!classify_call.payload.contains("password"));
}
