//! End-to-end pipeline tests over an in-memory store and a scripted
//! model client: plan in, note files and an activity log out.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use quill_core::llm::{Attachment, LlmClient, LlmError};
use quill_core::orchestrator::{GenerationConfig, Orchestrator};
use quill_core::parse_plan;
use quill_core::store::{ActivityLog, FileStore, MemoryStore};

/// Replays a fixed sequence of responses, one per call.
struct ScriptedLlm {
    responses: std::sync::Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str, _: &[Attachment]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Err(LlmError::Transport("script exhausted".to_string())),
        }
    }
}

const PLAN: &str = "\
---
main_topic: Information Theory
source: Cover & Thomas
---

- **Entropy** `(Core)`
\t- *Average surprise of a distribution.*
- **Entropy vs Energy** `(Comparison)`
\t- *How entropy differs from thermodynamic energy.*
";

const CORE_TEMPLATE: &str = "\
# {{concept_name}}

{{summary.one_liner}}

## Mechanism
{{details.steps_bullets}}

tags:{{tags_yaml}}
";

fn entropy_answer() -> String {
    // Fenced, with prose around it, the way models actually reply.
    "Here is the note:\n```json\n".to_string()
        + r#"{"concept_name": "Entropy",
             "tags_keywords": ["information-theory"],
             "related_links_for_yaml": [],
             "summary": {"one_liner": "Average surprise."},
             "details": {"steps_bullets": [
                 {"content": "step one"},
                 {"content": "$$H(X) = -\sum p \log p$$"}
             ]}}"#
        + "\n```\n"
}

struct Fixture {
    store: Arc<MemoryStore>,
    llm: Arc<ScriptedLlm>,
    orchestrator: Orchestrator,
}

async fn fixture(responses: Vec<Result<String, LlmError>>) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    store.insert("templates/core.md", CORE_TEMPLATE).await;
    store
        .insert("templates/comparison.md", "# {{concept_name}}\n")
        .await;
    let llm = Arc::new(ScriptedLlm::new(responses));
    let log = ActivityLog::new(store.clone(), "activity.md");
    let orchestrator = Orchestrator::new(
        store.clone(),
        llm.clone(),
        log,
        GenerationConfig::default(),
    );
    Fixture {
        store,
        llm,
        orchestrator,
    }
}

fn comparison_answer() -> String {
    r#"{"concept_name": "Entropy vs Energy",
        "tags_keywords": ["comparison"],
        "related_links_for_yaml": ["Entropy"]}"#
        .to_string()
}

#[tokio::test]
async fn plan_to_written_notes() {
    let fx = fixture(vec![Ok(entropy_answer()), Ok(comparison_answer())]).await;
    let plan = parse_plan(PLAN);
    let cancel = CancellationToken::new();

    let summary = fx.orchestrator.run(&plan, &cancel).await;

    assert_eq!(summary.generated_count(), 2);
    assert_eq!(summary.failed_count(), 0);
    assert!(!summary.interrupted);
    assert_eq!(fx.llm.call_count(), 2);

    let note = fx.store.read("notes/Entropy.md").await.unwrap();
    // The standalone formula node merges onto the preceding bullet line.
    assert!(
        note.contains("## Mechanism\n- step one $$H(X) = -\\sum p \\log p$$"),
        "{note}"
    );
    assert!(note.starts_with("# Entropy\n\nAverage surprise."));
    // tags_yaml was never supplied; its placeholder renders empty.
    assert!(note.contains("tags:\n"));
    assert!(!note.contains("{{"), "unreplaced placeholder in {note}");

    assert!(fx.store.exists("notes/Entropy vs Energy.md").await);
    let structural = summary.results.iter().find(|r| r.is_structural).unwrap();
    assert_eq!(structural.link, "Entropy vs Energy");

    let log = fx.store.read("activity.md").await.unwrap();
    assert!(log.contains("generation run: generated=2 failed=0"), "{log}");
}

#[tokio::test]
async fn existing_note_skips_without_calling_the_model() {
    let fx = fixture(vec![Ok(comparison_answer())]).await;
    fx.store.insert("notes/Entropy.md", "already here").await;
    let plan = parse_plan(PLAN);

    let summary = fx
        .orchestrator
        .run(&plan, &CancellationToken::new())
        .await;

    assert_eq!(summary.skipped_existing, vec!["Entropy".to_string()]);
    assert_eq!(summary.generated_count(), 1);
    // Only the second proposal reached the model.
    assert_eq!(fx.llm.call_count(), 1);
    assert_eq!(
        fx.store.read("notes/Entropy.md").await.unwrap(),
        "already here"
    );
}

#[tokio::test]
async fn missing_template_skips_without_calling_the_model() {
    let store = Arc::new(MemoryStore::new());
    // Only the core template exists; the comparison proposal has nothing.
    store.insert("templates/core.md", CORE_TEMPLATE).await;
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(entropy_answer())]));
    let log = ActivityLog::new(store.clone(), "activity.md");
    let orchestrator = Orchestrator::new(
        store.clone(),
        llm.clone(),
        log,
        GenerationConfig::default(),
    );
    let plan = parse_plan(PLAN);

    let summary = orchestrator.run(&plan, &CancellationToken::new()).await;

    assert_eq!(
        summary.skipped_no_template,
        vec!["Entropy vs Energy".to_string()]
    );
    assert_eq!(summary.generated_count(), 1);
    assert_eq!(llm.call_count(), 1);
    assert!(!store.exists("notes/Entropy vs Energy.md").await);
}

#[tokio::test]
async fn failure_is_recorded_and_resume_retries_only_it() {
    // First proposal gets an unusable answer, second succeeds.
    let fx = fixture(vec![
        Ok("sorry, I cannot produce JSON today".to_string()),
        Ok(comparison_answer()),
    ])
    .await;
    let plan = parse_plan(PLAN);
    let cancel = CancellationToken::new();

    let summary = fx.orchestrator.run(&plan, &cancel).await;
    assert_eq!(summary.generated_count(), 1);
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.failed[0].title, "Entropy");
    assert!(!fx.store.exists("notes/Entropy.md").await);

    let log = fx.store.read("activity.md").await.unwrap();
    assert!(log.contains("failed: Entropy\n"), "{log}");

    // Resume with a healthy model: only the failed title is attempted.
    let retry_llm = Arc::new(ScriptedLlm::new(vec![Ok(entropy_answer())]));
    let orchestrator = Orchestrator::new(
        fx.store.clone(),
        retry_llm.clone(),
        ActivityLog::new(fx.store.clone(), "activity.md"),
        GenerationConfig::default(),
    );
    let resumed = orchestrator.resume(&plan, &cancel).await.unwrap();

    assert_eq!(resumed.generated_count(), 1);
    assert_eq!(resumed.failed_count(), 0);
    assert_eq!(retry_llm.call_count(), 1);
    assert!(fx.store.exists("notes/Entropy.md").await);
}

#[tokio::test]
async fn resume_with_clean_log_is_an_error() {
    let fx = fixture(vec![]).await;
    let plan = parse_plan(PLAN);

    let result = fx.orchestrator.resume(&plan, &CancellationToken::new()).await;
    assert!(result.is_err());
    assert_eq!(fx.llm.call_count(), 0);
}

#[tokio::test]
async fn cancelled_token_stops_before_any_work() {
    let fx = fixture(vec![Ok(entropy_answer())]).await;
    let plan = parse_plan(PLAN);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = fx.orchestrator.run(&plan, &cancel).await;

    assert!(summary.interrupted);
    assert!(summary.results.is_empty());
    assert_eq!(fx.llm.call_count(), 0);
    // The interrupted run is still recorded.
    let log = fx.store.read("activity.md").await.unwrap();
    assert!(log.contains("interrupted=true"), "{log}");
}

#[tokio::test]
async fn cheatsheet_contract_flows_through() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert("templates/cheatsheet.md", "{{cheatsheet_content}}\n")
        .await;
    // Raw line breaks inside the string value; the repair pass escapes
    // them before parsing.
    let answer =
        "```json\n{\"cheatsheet_content\": \"# Git quick ref\n\n- `git status`\"}\n```";
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(answer.to_string())]));
    let log = ActivityLog::new(store.clone(), "activity.md");
    let orchestrator = Orchestrator::new(
        store.clone(),
        llm,
        log,
        GenerationConfig::default(),
    );

    let plan = parse_plan(
        "- **Git Basics** `(Cheatsheet)`\n\t- *Everyday git commands.*\n",
    );
    let summary = orchestrator.run(&plan, &CancellationToken::new()).await;

    assert_eq!(summary.generated_count(), 1);
    let note = store.read("notes/Git Basics.md").await.unwrap();
    assert_eq!(note, "# Git quick ref\n\n- `git status`\n");
}
