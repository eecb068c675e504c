//! End-to-end scenario tests, run against a real (ephemeral, per-test)
//! Postgres database via `#[sqlx::test]`. Each test drives the engine the
//! way a client + worker pair would: register, start, poll, complete/fail,
//! and check `GetStatus`.

use std::time::Duration;

use db::models::ClaimCheck;
use db::BlobStore;
use serde_json::{json, Value};
use sha2::Digest;
use sqlx::PgPool;

use crate::scheduler::Scheduler;
use crate::{lifecycle, sweeper, tasks, ticker};

fn scheduler(pool: &PgPool, blobs: &BlobStore) -> Scheduler {
    Scheduler::new(pool.clone(), blobs.clone())
}

fn blob_store() -> (tempfile::TempDir, BlobStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = BlobStore::new(dir.path());
    (dir, store)
}

/// Scenario 1: linear chain.
#[sqlx::test(migrations = "../../migrations")]
async fn linear_chain_completes(pool: PgPool) {
    let (_dir, blobs) = blob_store();
    let scheduler = scheduler(&pool, &blobs);

    let ir = r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}, "b": {"type": "COMPUTE", "dependencies": ["a"]}}}"#;
    lifecycle::register_workflow(&pool, "wf-linear", "v1", ir).await.unwrap();
    let execution_id = lifecycle::start_execution(&pool, &scheduler, "wf-linear", "v1", r#"{"q":"x"}"#)
        .await
        .unwrap();

    let task_a = tasks::poll_task(&pool, "worker-1", "v1", 30)
        .await
        .unwrap()
        .expect("a should be ready");
    assert_eq!(task_a.node_id, "a");
    tasks::complete_task(&pool, &blobs, &scheduler, task_a.task_id, br#"{"val":1}"#, 1024)
        .await
        .unwrap();

    let task_b = tasks::poll_task(&pool, "worker-1", "v1", 30)
        .await
        .unwrap()
        .expect("b should be ready once a is done");
    assert_eq!(task_b.node_id, "b");
    tasks::complete_task(&pool, &blobs, &scheduler, task_b.task_id, br#"{"s":"done"}"#, 1024)
        .await
        .unwrap();

    let execution = lifecycle::get_status(&pool, execution_id).await.unwrap();
    assert_eq!(execution.status, "COMPLETED");
    let completed: Value = serde_json::from_str(&execution.completed_nodes_json).unwrap();
    assert_eq!(completed["a"], json!({"val": 1}));
    assert_eq!(completed["b"], json!({"s": "done"}));
}

/// Scenario 2: fan-in — `merge` becomes ready exactly once, after both of
/// its dependencies complete, and sees both values in `deps`.
#[sqlx::test(migrations = "../../migrations")]
async fn fan_in_merge_ready_exactly_once(pool: PgPool) {
    let (_dir, blobs) = blob_store();
    let scheduler = scheduler(&pool, &blobs);

    let ir = r#"{"nodes": {
        "a": {"type": "EFFECT", "dependencies": []},
        "b": {"type": "EFFECT", "dependencies": []},
        "merge": {"type": "COMPUTE", "dependencies": ["a", "b"]}
    }}"#;
    lifecycle::register_workflow(&pool, "wf-fan-in", "v1", ir).await.unwrap();
    let execution_id = lifecycle::start_execution(&pool, &scheduler, "wf-fan-in", "v1", "{}")
        .await
        .unwrap();

    assert!(
        tasks::poll_task(&pool, "worker-merge", "v1", 30).await.unwrap().is_none(),
        "merge must not be claimable before a and b complete"
    );

    let first = tasks::poll_task(&pool, "worker-1", "v1", 30).await.unwrap().unwrap();
    let second = tasks::poll_task(&pool, "worker-2", "v1", 30).await.unwrap().unwrap();
    let mut by_node = std::collections::HashMap::new();
    by_node.insert(first.node_id.clone(), first.task_id);
    by_node.insert(second.node_id.clone(), second.task_id);
    assert_eq!(by_node.len(), 2, "a and b must claim distinct tasks");

    tasks::complete_task(&pool, &blobs, &scheduler, by_node["a"], br#"{"x":1}"#, 1024).await.unwrap();
    tasks::complete_task(&pool, &blobs, &scheduler, by_node["b"], br#"{"y":2}"#, 1024).await.unwrap();

    let merge_task = tasks::poll_task(&pool, "worker-3", "v1", 30)
        .await
        .unwrap()
        .expect("merge should be ready now");
    assert_eq!(merge_task.node_id, "merge");

    let input: Value = serde_json::from_str(&merge_task.input_json).unwrap();
    assert_eq!(input["deps"]["a"], json!({"x": 1}));
    assert_eq!(input["deps"]["b"], json!({"y": 2}));

    assert!(
        tasks::poll_task(&pool, "worker-4", "v1", 30).await.unwrap().is_none(),
        "merge must be scheduled exactly once"
    );

    tasks::complete_task(&pool, &blobs, &scheduler, merge_task.task_id, br#"{"ok":true}"#, 1024)
        .await
        .unwrap();

    let execution = lifecycle::get_status(&pool, execution_id).await.unwrap();
    assert_eq!(execution.status, "COMPLETED");
}

/// Scenario 3: a worker holds a lease past its TTL without completing it
/// (standing in for a crashed worker / restarted engine). The lease
/// sweeper reclaims it and a fresh worker resumes exactly where the
/// previous one stalled, without re-running already-`DONE` steps.
#[sqlx::test(migrations = "../../migrations")]
async fn lease_sweeper_recovers_a_stalled_step(pool: PgPool) {
    let (_dir, blobs) = blob_store();
    let scheduler = scheduler(&pool, &blobs);

    let ir = r#"{"nodes": {
        "step_1": {"type": "EFFECT", "dependencies": []},
        "step_2": {"type": "EFFECT", "dependencies": ["step_1"]},
        "step_3": {"type": "EFFECT", "dependencies": ["step_2"]},
        "step_4": {"type": "EFFECT", "dependencies": ["step_3"]}
    }}"#;
    lifecycle::register_workflow(&pool, "wf-crash", "v1", ir).await.unwrap();
    let execution_id = lifecycle::start_execution(&pool, &scheduler, "wf-crash", "v1", "{}")
        .await
        .unwrap();

    let t1 = tasks::poll_task(&pool, "w1", "v1", 30).await.unwrap().unwrap();
    assert_eq!(t1.node_id, "step_1");
    tasks::complete_task(&pool, &blobs, &scheduler, t1.task_id, br#"{"n":1}"#, 1024).await.unwrap();

    let t2 = tasks::poll_task(&pool, "w1", "v1", 30).await.unwrap().unwrap();
    assert_eq!(t2.node_id, "step_2");
    tasks::complete_task(&pool, &blobs, &scheduler, t2.task_id, br#"{"n":2}"#, 1024).await.unwrap();

    // step_3 gets claimed with a one-second lease and then abandoned,
    // simulating the worker (or the whole engine process) dying mid-task.
    let t3_first_attempt = tasks::poll_task(&pool, "w-crashed", "v1", 1).await.unwrap().unwrap();
    assert_eq!(t3_first_attempt.node_id, "step_3");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    sweeper::sweep_once(&pool, &scheduler).await.unwrap();

    // step_1/step_2 must never be re-leased — only step_3 comes back.
    let t3_second_attempt = tasks::poll_task(&pool, "w-fresh", "v1", 30)
        .await
        .unwrap()
        .expect("step_3 should be claimable again after the sweep");
    assert_eq!(t3_second_attempt.node_id, "step_3");
    assert_eq!(t3_second_attempt.attempt, 2);

    tasks::complete_task(&pool, &blobs, &scheduler, t3_second_attempt.task_id, br#"{"n":3}"#, 1024)
        .await
        .unwrap();

    let t4 = tasks::poll_task(&pool, "w-fresh", "v1", 30).await.unwrap().unwrap();
    assert_eq!(t4.node_id, "step_4");
    tasks::complete_task(&pool, &blobs, &scheduler, t4.task_id, br#"{"n":4}"#, 1024).await.unwrap();

    let execution = lifecycle::get_status(&pool, execution_id).await.unwrap();
    assert_eq!(execution.status, "COMPLETED");
    let completed: Value = serde_json::from_str(&execution.completed_nodes_json).unwrap();
    assert_eq!(completed["step_1"], json!({"n": 1}));
    assert_eq!(completed["step_2"], json!({"n": 2}));
    assert_eq!(completed["step_3"], json!({"n": 3}));
    assert_eq!(completed["step_4"], json!({"n": 4}));
}

/// Scenario 4: a large output is rewritten to a claim-check pointer backed
/// by the blob sidecar, never stored inline.
#[sqlx::test(migrations = "../../migrations")]
async fn large_output_goes_through_the_blob_sidecar(pool: PgPool) {
    let (_dir, blobs) = blob_store();
    let scheduler = scheduler(&pool, &blobs);

    let ir = r#"{"nodes": {"big": {"type": "EFFECT", "dependencies": []}}}"#;
    lifecycle::register_workflow(&pool, "wf-big", "v1", ir).await.unwrap();
    let execution_id = lifecycle::start_execution(&pool, &scheduler, "wf-big", "v1", "{}")
        .await
        .unwrap();

    let task = tasks::poll_task(&pool, "w1", "v1", 30).await.unwrap().unwrap();
    let big_value = "x".repeat(1024 * 1024);
    let output = json!({ "s": big_value }).to_string();

    tasks::complete_task(&pool, &blobs, &scheduler, task.task_id, output.as_bytes(), 1024)
        .await
        .unwrap();

    let execution = lifecycle::get_status(&pool, execution_id).await.unwrap();
    assert_eq!(execution.status, "COMPLETED");

    let completed: Value = serde_json::from_str(&execution.completed_nodes_json).unwrap();
    let pointer_value = &completed["big"];
    assert!(
        serde_json::to_string(pointer_value).unwrap().len() < 1024,
        "the stored pointer must be far smaller than the original payload"
    );

    let pointer = ClaimCheck::from_value(pointer_value).expect("output must be a claim-check pointer");
    let bytes = tokio::fs::read(&pointer.path).await.expect("blob file must exist");
    assert_eq!(bytes.len() as u64, pointer.size);
    assert_eq!(bytes, output.as_bytes());

    let actual_sha256 = hex::encode(sha2::Sha256::digest(&bytes));
    assert_eq!(actual_sha256, pointer.sha256);
}

/// Scenario 5: a `TIMER` node fires itself, with no worker involved.
#[sqlx::test(migrations = "../../migrations")]
async fn timer_fires_after_its_delay(pool: PgPool) {
    let (_dir, blobs) = blob_store();
    let scheduler = scheduler(&pool, &blobs);

    let ir = r#"{"nodes": {"wait": {"type": "TIMER", "dependencies": [], "delay_seconds": 2}}}"#;
    lifecycle::register_workflow(&pool, "wf-timer", "v1", ir).await.unwrap();
    let execution_id = lifecycle::start_execution(&pool, &scheduler, "wf-timer", "v1", "{}")
        .await
        .unwrap();

    assert!(
        tasks::poll_task(&pool, "w1", "v1", 30).await.unwrap().is_none(),
        "a TIMER node is fired by the tick loop, never claimed by a worker"
    );

    let start = tokio::time::Instant::now();
    loop {
        ticker::tick_once(&pool, &scheduler).await.unwrap();
        let execution = lifecycle::get_status(&pool, execution_id).await.unwrap();
        if execution.status == "COMPLETED" {
            break;
        }
        assert!(start.elapsed() < Duration::from_secs(5), "timer never fired");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(start.elapsed() >= Duration::from_secs(2), "timer fired too early");
}

/// Scenario 6: an `EFFECT` that always fails exhausts its retry budget and
/// the execution terminates `FAILED`, with the node absent from
/// `completed_nodes`.
#[sqlx::test(migrations = "../../migrations")]
async fn retry_exhaustion_fails_the_execution(pool: PgPool) {
    let (_dir, blobs) = blob_store();
    let scheduler = scheduler(&pool, &blobs);

    let ir = r#"{"nodes": {"flaky": {"type": "EFFECT", "dependencies": []}}}"#;
    lifecycle::register_workflow(&pool, "wf-flaky", "v1", ir).await.unwrap();
    let execution_id = lifecycle::start_execution(&pool, &scheduler, "wf-flaky", "v1", "{}")
        .await
        .unwrap();

    for attempt in 1..=3u32 {
        let task = tasks::poll_task(&pool, "w1", "v1", 30)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("attempt {attempt} should be claimable"));
        assert_eq!(task.attempt, attempt as i32);
        tasks::fail_task(&pool, &scheduler, task.task_id, "boom").await.unwrap();

        if attempt < 3 {
            let execution = lifecycle::get_status(&pool, execution_id).await.unwrap();
            assert_eq!(execution.status, "RUNNING");
            // Wait out the exponential backoff before the next attempt unlocks.
            tokio::time::sleep(nodes::retry::backoff(attempt + 1) + Duration::from_millis(200)).await;
        }
    }

    let execution = lifecycle::get_status(&pool, execution_id).await.unwrap();
    assert_eq!(execution.status, "FAILED");
    let completed: Value = serde_json::from_str(&execution.completed_nodes_json).unwrap();
    assert!(completed.get("flaky").is_none());
}

/// P6: re-registering an identical `ir_json` is a no-op that reports
/// `compatibility = "identical"`.
#[sqlx::test(migrations = "../../migrations")]
async fn reregistering_identical_ir_is_a_no_op(pool: PgPool) {
    let ir = r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}}}"#;

    let first = lifecycle::register_workflow(&pool, "wf-idem", "v1", ir).await.unwrap();
    assert_eq!(first.compatibility, "compatible");

    let second = lifecycle::register_workflow(&pool, "wf-idem", "v1", ir).await.unwrap();
    assert_eq!(second.compatibility, "identical");
}

/// Changing an existing node's dependencies is classified as breaking.
#[sqlx::test(migrations = "../../migrations")]
async fn changing_dependencies_is_a_breaking_change(pool: PgPool) {
    let v1 = r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}, "b": {"type": "COMPUTE", "dependencies": []}}}"#;
    let v2 = r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}, "b": {"type": "COMPUTE", "dependencies": ["a"]}}}"#;

    lifecycle::register_workflow(&pool, "wf-breaking", "v1", v1).await.unwrap();
    let outcome = lifecycle::register_workflow(&pool, "wf-breaking", "v2", v2).await.unwrap();
    assert_eq!(outcome.compatibility, "breaking");
}
