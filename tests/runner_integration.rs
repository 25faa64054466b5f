//! Deadlines, output caps and spawn failures with real processes

use cmdbridge::operations::OperationPlan;
use cmdbridge::subprocess::{
    ExitStatus, ProcessCommandBuilder, ProcessRunner, TokioProcessRunner,
};
use cmdbridge::{Classification, ClassificationPolicy, Engine, EngineConfig};
use std::time::{Duration, Instant};

fn sh(script: &str, deadline: Duration) -> OperationPlan {
    OperationPlan::new("shell_test", "sh", deadline).args(["-c", script])
}

#[tokio::test]
async fn test_deadline_exceeded_is_timed_out() {
    let engine = Engine::production(EngineConfig::default());
    let started = Instant::now();

    let envelope = engine
        .execute_plan(
            sh("echo partial; sleep 10", Duration::from_secs(1))
                .policy(ClassificationPolicy::GIT_CONFLICT),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(envelope.classification, Classification::TimedOut);
    assert!(envelope.records.is_empty());
    assert!(envelope.error_message.contains("timed out after 1s"));
}

#[tokio::test]
async fn test_background_children_are_killed_with_the_group() {
    let runner = TokioProcessRunner;
    let started = Instant::now();

    let command = ProcessCommandBuilder::new("sh")
        .args(["-c", "sleep 30 & sleep 30"])
        .timeout(Duration::from_millis(500))
        .build();
    let output = runner.run(command).await.unwrap();

    assert_eq!(output.status, ExitStatus::Timeout);
    assert!(output.stdout.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_configured_deadline_overrides_builtin() {
    let mut config = EngineConfig::default();
    config
        .deadlines
        .insert("shell_test".to_string(), Duration::from_millis(300));
    let engine = Engine::production(config);

    let envelope = engine
        .execute_plan(sh("sleep 5", Duration::from_secs(60)))
        .await
        .unwrap();

    assert_eq!(envelope.classification, Classification::TimedOut);
    assert!(envelope.duration_seconds < 4.0);
}

#[tokio::test]
async fn test_output_over_limit_is_a_failure() {
    let config = EngineConfig {
        max_output_bytes: 1024,
        ..Default::default()
    };
    let engine = Engine::production(config);

    let envelope = engine
        .execute_plan(sh(
            "i=0; while [ $i -lt 500 ]; do echo 0123456789; i=$((i+1)); done",
            Duration::from_secs(10),
        ))
        .await
        .unwrap();

    match envelope.classification {
        Classification::Failure { diagnostic } => {
            assert!(diagnostic.contains("capture limit"))
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(envelope.records.is_empty());
}

#[tokio::test]
async fn test_missing_binary_is_reported_in_the_envelope() {
    let engine = Engine::production(EngineConfig::default());
    let plan = OperationPlan::new(
        "missing_tool",
        "cmdbridge-no-such-binary",
        Duration::from_secs(5),
    );

    let envelope = engine.execute_plan(plan).await.unwrap();

    match &envelope.classification {
        Classification::Failure { diagnostic } => {
            assert!(diagnostic.starts_with("failed to spawn"))
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_exit_code_and_stderr_reach_the_diagnostic() {
    let engine = Engine::production(EngineConfig::default());

    let envelope = engine
        .execute_plan(sh("echo boom >&2; exit 3", Duration::from_secs(10)))
        .await
        .unwrap();

    assert_eq!(
        envelope.classification,
        Classification::Failure {
            diagnostic: "exited with code 3: boom".to_string()
        }
    );
    assert!(envelope.error_message.starts_with("command `sh -c"));
}

#[tokio::test]
async fn test_environment_is_per_invocation() {
    let runner = TokioProcessRunner;
    std::env::set_var("CMDBRIDGE_TEST_LEAK", "leaked");

    let command = ProcessCommandBuilder::new("sh")
        .args(["-c", "echo \"${CMDBRIDGE_TEST_LEAK:-unset} $GIVEN\""])
        .env("GIVEN", "given")
        .timeout(Duration::from_secs(10))
        .build();
    let output = runner.run(command).await.unwrap();

    assert_eq!(output.stdout_text().trim(), "unset given");
}
