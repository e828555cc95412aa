mod common;

use common::{Fixture, at, write_with_mtime};
use duplex::{CandidateError, DuplexError, Outcome, PairingOutcome, StateStore};
use std::path::PathBuf;

#[tokio::test]
async fn test_offline_files_processed_oldest_first() {
    let fx = Fixture::new();
    // Name order disagrees with arrival order on purpose.
    fx.scan("c.pdf", 0);
    fx.scan("a.pdf", 200);
    fx.scan("b.pdf", 400);

    let mut pipeline = fx.pipeline();
    pipeline.restore().await.unwrap();
    let processed = pipeline.reconcile().await.unwrap();

    assert_eq!(processed, 3);
    assert_eq!(fx.recognizer.recognized_names(), ["c.pdf", "a.pdf", "b.pdf"]);
    assert_eq!(fx.output_dirs().len(), 3);
    assert!(fx.merger.calls().is_empty());
    assert_eq!(
        pipeline.window().latest().unwrap().source_path,
        fx.input.join("b.pdf")
    );
}

#[tokio::test]
async fn test_resume_after_restart_processes_only_new_files() {
    let fx = Fixture::new();
    fx.scan("a.pdf", 0);
    {
        let mut pipeline = fx.pipeline();
        pipeline.restore().await.unwrap();
        assert_eq!(pipeline.reconcile().await.unwrap(), 1);
    }

    fx.scan("b.pdf", 30);
    let mut pipeline = fx.pipeline();
    let latest = pipeline.restore().await.unwrap().cloned().unwrap();
    assert_eq!(latest.source_path, fx.input.join("a.pdf"));

    assert_eq!(pipeline.reconcile().await.unwrap(), 1);
    assert_eq!(fx.recognizer.recognized_names(), ["a.pdf", "b.pdf"]);

    // A was restored from disk, so it can still be the front of B.
    let calls = fx.merger.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, latest.output_file("eng", false).unwrap());

    // Nothing left on a third start.
    let mut pipeline = fx.pipeline();
    pipeline.restore().await.unwrap();
    assert_eq!(pipeline.reconcile().await.unwrap(), 0);
}

#[tokio::test]
async fn test_pairing_threshold_is_strict() {
    let fx = Fixture::new();
    fx.scan("a.pdf", 0);
    fx.scan("b.pdf", 60);

    let mut pipeline = fx.pipeline();
    pipeline.reconcile().await.unwrap();
    assert!(fx.merger.calls().is_empty());
    assert_eq!(
        pipeline.window().latest().unwrap().pairing,
        PairingOutcome::Standalone
    );

    fx.scan("c.pdf", 119);
    pipeline.reconcile().await.unwrap();
    let calls = fx.merger.calls();
    assert_eq!(calls.len(), 2, "one collation per language");
    assert_eq!(
        pipeline.window().latest().unwrap().pairing,
        PairingOutcome::Merged
    );

    let front = pipeline.window().previous.as_ref().unwrap();
    let back = pipeline.window().latest().unwrap();
    for (call, language) in calls.iter().zip(["eng", "deu"]) {
        assert_eq!(call.0, front.output_file(language, false).unwrap());
        assert_eq!(call.1, back.output_file(language, false).unwrap());
        assert_eq!(call.2, front.output_file(language, true).unwrap());
        assert!(call.2.exists());
    }
}

#[tokio::test]
async fn test_first_file_is_never_front_twice() {
    let fx = Fixture::new();
    fx.scan("a.pdf", 0);
    fx.scan("b.pdf", 20);
    fx.scan("c.pdf", 40);

    let mut pipeline = fx.pipeline();
    pipeline.reconcile().await.unwrap();

    let a_dir = fx.output.join(&fx.output_dirs()[0]);
    let calls = fx.merger.calls();
    // A+B, then B+C; never A+C.
    assert_eq!(calls.len(), 4);
    let fronts_in_a = calls.iter().filter(|c| c.0.starts_with(&a_dir)).count();
    assert_eq!(fronts_in_a, 2);
    assert!(calls[2..].iter().all(|c| !c.0.starts_with(&a_dir)));
}

#[tokio::test]
async fn test_collision_suffixes_then_abandon() {
    let fx = Fixture::new();
    // Twelve files within the same second share a label.
    for i in 0..12u64 {
        let path = fx.input.join(format!("scan{i:02}.pdf"));
        write_with_mtime(
            &path,
            b"%PDF",
            at(0) + std::time::Duration::from_millis(i * 10),
        );
    }

    let mut pipeline = fx.pipeline();
    let arrivals: Vec<PathBuf> = (0..12)
        .map(|i| fx.input.join(format!("scan{i:02}.pdf")))
        .collect();
    let mut outcomes = Vec::new();
    for path in &arrivals {
        outcomes.push(pipeline.process_candidate(path).await.unwrap());
    }

    assert!(outcomes[..11].iter().all(Outcome::is_processed));
    assert!(matches!(
        outcomes[11],
        Outcome::Abandoned(CandidateError::TooManyCollisions { .. })
    ));

    let dirs = fx.output_dirs();
    assert_eq!(dirs.len(), 11);
    assert!(dirs.iter().any(|d| d.ends_with("_01")));
    assert!(dirs.iter().any(|d| d.ends_with("_10")));
    assert!(fx.hidden_entries().is_empty(), "scratch left behind");
}

#[tokio::test]
async fn test_file_filled_during_readiness_wait_is_processed() {
    let fx = Fixture::new();
    let path = fx.input.join("slow.pdf");
    std::fs::write(&path, b"").unwrap();

    let writer = {
        let path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            std::fs::write(&path, b"%PDF-1.4").unwrap();
        })
    };

    let mut pipeline = fx.pipeline();
    let outcome = pipeline.process_candidate(&path).await.unwrap();
    writer.await.unwrap();
    assert!(outcome.is_processed());
}

#[tokio::test]
async fn test_empty_file_is_abandoned_and_next_still_runs() {
    let fx = Fixture::new();
    write_with_mtime(&fx.input.join("empty.pdf"), b"", at(0));
    fx.scan("next.pdf", 100);

    let mut pipeline = fx.pipeline();
    let empty = pipeline
        .process_candidate(&fx.input.join("empty.pdf"))
        .await
        .unwrap();
    assert!(matches!(
        empty,
        Outcome::Abandoned(CandidateError::NotReady { attempts: 5, .. })
    ));
    assert!(pipeline.window().is_empty());

    let next = pipeline
        .process_candidate(&fx.input.join("next.pdf"))
        .await
        .unwrap();
    assert!(next.is_processed());
    assert_eq!(fx.recognizer.recognized_names(), ["next.pdf"]);
}

#[tokio::test]
async fn test_recognition_failure_leaves_nothing_behind() {
    let fx = Fixture::new();
    fx.scan("good.pdf", 0);
    fx.scan("bad.pdf", 30);
    fx.recognizer.fail_for("bad.pdf");

    let mut pipeline = fx.pipeline();
    pipeline.reconcile().await.unwrap();

    assert_eq!(fx.output_dirs().len(), 1);
    assert!(fx.hidden_entries().is_empty());
    assert_eq!(
        pipeline.window().latest().unwrap().source_path,
        fx.input.join("good.pdf")
    );
    assert!(fx.merger.calls().is_empty());

    let saved = StateStore::in_dir(&fx.output).load().await.unwrap().unwrap();
    assert_eq!(&saved, pipeline.window());
}

#[tokio::test]
async fn test_merge_failure_keeps_standalone_outputs() {
    let fx = Fixture::new();
    fx.scan("front.pdf", 0);
    fx.scan("back.pdf", 10);
    fx.merger.set_failing(true);

    let mut pipeline = fx.pipeline();
    assert_eq!(pipeline.reconcile().await.unwrap(), 2);

    let back = pipeline.window().latest().unwrap();
    assert_eq!(back.pairing, PairingOutcome::MergeFailed);
    let front = pipeline.window().previous.as_ref().unwrap();
    for language in ["eng", "deu"] {
        assert!(front.output_file(language, false).unwrap().exists());
        assert!(back.output_file(language, false).unwrap().exists());
        assert!(!front.output_file(language, true).unwrap().exists());
    }
}

#[tokio::test]
async fn test_already_covered_candidate_is_skipped() {
    let fx = Fixture::new();
    let a = fx.scan("a.pdf", 0);
    let old = write_with_mtime(
        &fx.input.join("old.pdf"),
        b"%PDF",
        at(0) - std::time::Duration::from_secs(5),
    );

    let mut pipeline = fx.pipeline();
    assert!(pipeline.process_candidate(&a).await.unwrap().is_processed());
    assert!(matches!(
        pipeline.process_candidate(&a).await.unwrap(),
        Outcome::AlreadyCovered
    ));
    assert!(matches!(
        pipeline.process_candidate(&old).await.unwrap(),
        Outcome::AlreadyCovered
    ));
    assert_eq!(fx.recognizer.recognized_names(), ["a.pdf"]);
}

#[tokio::test]
async fn test_vanished_candidate_is_abandoned() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    let outcome = pipeline
        .process_candidate(&fx.input.join("gone.pdf"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        Outcome::Abandoned(CandidateError::Vanished(_))
    ));
}

#[tokio::test]
async fn test_corrupt_state_is_fatal() {
    let fx = Fixture::new();
    std::fs::write(StateStore::in_dir(&fx.output).path(), b"{ not json").unwrap();

    let mut pipeline = fx.pipeline();
    let err = pipeline.restore().await.unwrap_err();
    assert!(matches!(err, DuplexError::StateCorrupt { .. }));
}

#[tokio::test]
async fn test_hidden_inputs_are_ignored() {
    let fx = Fixture::new();
    fx.scan(".upload.pdf.part", 0);
    fx.scan("visible.pdf", 10);

    let mut pipeline = fx.pipeline();
    assert_eq!(pipeline.reconcile().await.unwrap(), 1);
    assert_eq!(fx.recognizer.recognized_names(), ["visible.pdf"]);
}

#[tokio::test]
async fn test_interrupted_before_state_save_reprocesses_into_suffix() {
    let fx = Fixture::new();
    let a = fx.scan("a.pdf", 0);

    let mut pipeline = fx.pipeline();
    assert!(pipeline.process_candidate(&a).await.unwrap().is_processed());
    // Output placed, but the run died before state reached disk.
    std::fs::remove_file(StateStore::in_dir(&fx.output).path()).unwrap();

    let mut pipeline = fx.pipeline();
    assert!(pipeline.restore().await.unwrap().is_none());
    assert_eq!(pipeline.reconcile().await.unwrap(), 1);

    let dirs = fx.output_dirs();
    assert_eq!(dirs.len(), 2);
    assert_eq!(dirs[1], format!("{}_01", dirs[0]));
    let latest = pipeline.window().latest().unwrap();
    assert_eq!(latest.output_dir, Some(fx.output.join(&dirs[1])));
}

#[tokio::test]
async fn test_state_save_failure_is_fatal() {
    let fx = Fixture::new();
    let a = fx.scan("a.pdf", 0);
    std::fs::create_dir(StateStore::in_dir(&fx.output).path()).unwrap();

    let mut pipeline = fx.pipeline();
    let err = pipeline.process_candidate(&a).await.unwrap_err();
    assert!(matches!(err, DuplexError::StateSave { .. }));
}

