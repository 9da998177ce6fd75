//! Narrative pipeline behaviour against in-memory backends.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use vidcraft_models::{Task, TaskStatus, TaskType};
use vidcraft_queue::{StatusStore, TaskQueue};
use vidcraft_storage::MemoryArtifactStore;
use vidcraft_worker::{NarrativeRequest, WorkerError};

use common::*;

fn novel_to_video() -> NarrativeRequest {
    NarrativeRequest::NovelToVideo {
        novel: "A lighthouse keeper finds a message in a bottle.".to_string(),
    }
}

#[tokio::test]
async fn test_script_retries_until_valid_array() {
    let text = Arc::new(ScriptedText::new(vec![
        "I cannot do that.",
        "Here you go: not json at all",
        r#"["A stormy coast", "A bottle in the surf", "The keeper reads by lamplight"]"#,
    ]));
    let images = Arc::new(FakeImages::default());
    let speech = Arc::new(FakeSpeech::default());
    let store = Arc::new(MemoryArtifactStore::new());
    let h = NarrativeHarness::new(text.clone(), images.clone(), speech.clone(), store.clone());

    let task = h.pipeline.submit(novel_to_video()).await.unwrap();
    h.pipeline.dispatch(task.clone()).await.unwrap();

    let record = h.record(&task.id).await;
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.progress, 100);
    assert_eq!(text.calls(), 3);
    assert_eq!(images.calls(), 3);

    let result = record.result.unwrap();
    assert_eq!(result["panels"].as_array().unwrap().len(), 3);
    assert_eq!(result["images"].as_array().unwrap().len(), 3);
    assert_eq!(
        result["url"],
        json!(format!("memory://narratives/{}/video.mp4", task.id))
    );
    assert!(store
        .contains(&format!("narratives/{}/panel_2.png", task.id))
        .await);

    assert_eq!(
        speech.texts.lock().unwrap()[0],
        "A stormy coast. A bottle in the surf. The keeper reads by lamplight."
    );
    assert_eq!(h.compositor.slideshows.lock().unwrap()[0].images.len(), 3);
}

#[tokio::test]
async fn test_script_gives_up_after_three_attempts() {
    let text = Arc::new(ScriptedText::new(vec!["still not an array"]));
    let images = Arc::new(FakeImages::default());
    let h = NarrativeHarness::new(
        text.clone(),
        images.clone(),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
    );

    let task = h.pipeline.submit(novel_to_video()).await.unwrap();
    let err = h.pipeline.dispatch(task.clone()).await.unwrap_err();
    assert!(matches!(err, WorkerError::ProcessingFailed(_)));

    let record = h.record(&task.id).await;
    assert_eq!(record.status, TaskStatus::Failed);
    let error = record.error.unwrap();
    assert!(error.starts_with("script generation failed after 3 attempts"), "{}", error);
    assert_eq!(text.calls(), 3);
    assert_eq!(images.calls(), 0);
}

#[tokio::test]
async fn test_backend_errors_count_as_attempts() {
    let text = Arc::new(BrokenText::default());
    let h = NarrativeHarness::new(
        text.clone(),
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
    );

    let task = h.pipeline.submit(novel_to_video()).await.unwrap();
    let _ = h.pipeline.dispatch(task.clone()).await;

    let record = h.record(&task.id).await;
    assert_eq!(record.status, TaskStatus::Failed);
    assert!(record.error.unwrap().contains("connection reset"));
    assert_eq!(text.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_image_failure_names_panel_and_stops() {
    let text = Arc::new(ScriptedText::new(vec![
        r#"["one", "two", "three", "four", "five"]"#,
    ]));
    let images = Arc::new(FakeImages::failing_on(3));
    let speech = Arc::new(FakeSpeech::default());
    let h = NarrativeHarness::new(
        text,
        images.clone(),
        speech.clone(),
        Arc::new(MemoryArtifactStore::new()),
    );

    let task = h.pipeline.submit(novel_to_video()).await.unwrap();
    let _ = h.pipeline.dispatch(task.clone()).await;

    let record = h.record(&task.id).await;
    assert_eq!(record.status, TaskStatus::Failed);
    let error = record.error.unwrap();
    assert!(error.contains("panel 3"), "{}", error);
    assert!(error.contains("out of memory"), "{}", error);
    assert_eq!(*images.prompts.lock().unwrap(), vec!["one", "two", "three"]);
    assert!(speech.texts.lock().unwrap().is_empty());

    // panels 1 and 2 advanced progress linearly from 20 towards 60
    assert_eq!(record.progress, 36);
}

#[tokio::test]
async fn test_progress_never_goes_backwards() {
    let text = Arc::new(ScriptedText::new(vec![r#"["a", "b", "c", "d"]"#]));
    let h = NarrativeHarness::new(
        text,
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
    );

    let task = h.pipeline.submit(novel_to_video()).await.unwrap();
    h.pipeline.dispatch(task.clone()).await.unwrap();

    let history = h.status.history_of(&task.id);
    assert_monotonic(&history);
    assert_eq!(history.first(), Some(&(TaskStatus::Pending, 0)));
    assert_eq!(history.last(), Some(&(TaskStatus::Completed, 100)));
    for checkpoint in [20, 30, 40, 50, 60, 70, 90] {
        assert!(
            history.iter().any(|(_, p)| *p == checkpoint),
            "missing checkpoint {} in {:?}",
            checkpoint,
            history
        );
    }
}

#[tokio::test]
async fn test_publish_failure_leaves_task_processing() {
    let text = Arc::new(ScriptedText::new(vec![r#"["a", "b"]"#]));
    let h = NarrativeHarness::new(
        text,
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech::default()),
        Arc::new(UploadFailingStore::default()),
    );

    let task = h.pipeline.submit(novel_to_video()).await.unwrap();
    let err = h.pipeline.dispatch(task.clone()).await.unwrap_err();
    assert!(matches!(err, WorkerError::Storage(_)));

    let record = h.record(&task.id).await;
    assert_eq!(record.status, TaskStatus::Processing);
    assert_eq!(record.progress, 90);
    assert!(record.error.is_none());
}

#[tokio::test]
async fn test_speech_failure_is_fatal() {
    let text = Arc::new(ScriptedText::new(vec![r#"["a"]"#]));
    let h = NarrativeHarness::new(
        text,
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech {
            fail: true,
            ..Default::default()
        }),
        Arc::new(MemoryArtifactStore::new()),
    );

    let task = h.pipeline.submit(novel_to_video()).await.unwrap();
    let _ = h.pipeline.dispatch(task.clone()).await;

    let record = h.record(&task.id).await;
    assert_eq!(record.status, TaskStatus::Failed);
    assert!(record.error.unwrap().starts_with("speech synthesis failed"));
    assert!(h.compositor.slideshows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_line_fallback_when_array_is_not_strings() {
    let text = Arc::new(ScriptedText::new(vec![
        "[{\"shot\": 1}]\n1. A red door\n2. A long hallway",
    ]));
    let images = Arc::new(FakeImages::default());
    let h = NarrativeHarness::new(
        text,
        images.clone(),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
    );

    let task = h.pipeline.submit(novel_to_video()).await.unwrap();
    h.pipeline.dispatch(task.clone()).await.unwrap();

    let prompts = images.prompts.lock().unwrap().clone();
    assert!(prompts.contains(&"A red door".to_string()));
    assert!(prompts.contains(&"A long hallway".to_string()));
}

#[tokio::test]
async fn test_generate_novel_task() {
    let text = Arc::new(ScriptedText::new(vec!["Chapter one. The tide came in."]));
    let h = NarrativeHarness::new(
        text.clone(),
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
    );

    let task = h
        .pipeline
        .submit(NarrativeRequest::GenerateNovel {
            novel_prompt: "a town that floods every spring".to_string(),
            title: Some("High Water".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(task.task_type, TaskType::AiText);
    assert_eq!(task.params["novel"], "a town that floods every spring");

    h.pipeline.dispatch(task.clone()).await.unwrap();

    let record = h.record(&task.id).await;
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(
        record.result.unwrap(),
        json!({"title": "High Water", "text": "Chapter one. The tide came in."})
    );
    assert_eq!(text.calls(), 1);
    assert_monotonic(&h.status.history_of(&task.id));
}

#[tokio::test]
async fn test_render_task_on_narrative_queue_is_rejected() {
    let h = NarrativeHarness::new(
        Arc::new(ScriptedText::new(vec![])),
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
    );

    let task = Task::new(TaskType::Render, json!({}));
    h.status.put(&task).await.unwrap();
    assert!(h.pipeline.dispatch(task.clone()).await.is_err());

    let record = h.record(&task.id).await;
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("unsupported task type: render"));
}

#[tokio::test]
async fn test_full_queue_rejects_and_marks_failed() {
    let h = NarrativeHarness::with_capacity(
        Arc::new(ScriptedText::new(vec![])),
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
        1,
    );

    let first = h.pipeline.submit(novel_to_video()).await.unwrap();
    let err = h.pipeline.submit(novel_to_video()).await.unwrap_err();
    assert!(err.is_queue_full());
    assert_eq!(h.queue.len(), 1);

    assert_eq!(h.record(&first.id).await.status, TaskStatus::Pending);
    let rejected = h
        .status
        .history
        .lock()
        .unwrap()
        .iter()
        .rev()
        .find(|t| t.id != first.id)
        .cloned()
        .unwrap();
    assert_eq!(rejected.status, TaskStatus::Failed);
    assert_eq!(rejected.error.as_deref(), Some("narrative queue is full"));
}

#[tokio::test]
async fn test_empty_story_is_rejected_before_enqueue() {
    let h = NarrativeHarness::new(
        Arc::new(ScriptedText::new(vec![])),
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
    );

    let err = h
        .pipeline
        .submit(NarrativeRequest::NovelToVideo { novel: "  ".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::InvalidRequest(_)));
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn test_worker_pool_drains_submissions() {
    let text = Arc::new(ScriptedText::new(vec![r#"["a", "b"]"#]));
    let h = NarrativeHarness::new(
        text,
        Arc::new(FakeImages::default()),
        Arc::new(FakeSpeech::default()),
        Arc::new(MemoryArtifactStore::new()),
    );
    let pool = h.queue.start(2, h.pipeline.clone());

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(h.pipeline.submit(novel_to_video()).await.unwrap().id);
    }

    for id in &ids {
        let mut record = h.record(id).await;
        for _ in 0..200 {
            if record.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            record = h.record(id).await;
        }
        assert_eq!(record.status, TaskStatus::Completed, "{:?}", record.error);
    }

    pool.shutdown().await;
}
