//! Integration tests for the perception-action loop

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scene_vision::{
    AgentError, AnalysisOutcome, AnalysisRunner, CameraCommand, CameraPoseTransport, CapturedFrame, Config,
    Coordinator, FailureKind, FrameSource, Immediate, Pose, SceneCamera, SharedCamera, SnapshotError,
    SnapshotResult, VisionClient, VisionMode, VisionRequest, VlmError, VlmResult,
};

const START: Pose = Pose {
    translation: [0.0, -1500.0, 170.0],
    rotation: [90.0, 0.0, 0.0],
};

/// Hands out made-up frame paths; fails from a given iteration on
struct FakeFrames {
    captured: u32,
    fail_at: Option<u32>,
}

impl FakeFrames {
    fn new() -> Self {
        Self {
            captured: 0,
            fail_at: None,
        }
    }

    fn failing_at(iteration: u32) -> Self {
        Self {
            captured: 0,
            fail_at: Some(iteration),
        }
    }
}

#[async_trait]
impl FrameSource for FakeFrames {
    async fn capture(&mut self) -> SnapshotResult<CapturedFrame> {
        self.captured += 1;
        if self.fail_at.is_some_and(|n| self.captured >= n) {
            return Err(SnapshotError::Unstable {
                path: PathBuf::from("/tmp/never.png"),
                polls: 40,
            });
        }
        Ok(CapturedFrame::new(
            PathBuf::from(format!("/tmp/frame_{}.jpg", self.captured)),
            640,
            480,
        ))
    }
}

type Script = Box<dyn Fn(&VisionRequest) -> VlmResult<CameraCommand> + Send + Sync>;

/// Client that answers from a closure and records every request
struct ScriptedClient {
    script: Script,
    requests: Arc<Mutex<Vec<VisionRequest>>>,
    delay: Duration,
}

impl ScriptedClient {
    fn new(script: impl Fn(&VisionRequest) -> VlmResult<CameraCommand> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn requests(&self) -> Arc<Mutex<Vec<VisionRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl VisionClient for ScriptedClient {
    async fn call(&self, request: &VisionRequest) -> VlmResult<CameraCommand> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)(request)
    }

    fn mode(&self) -> VisionMode {
        VisionMode::ChatStyle
    }
}

fn answer(text: &str) -> CameraCommand {
    CameraCommand {
        answer: Some(text.to_string()),
        done: true,
        explanation: format!("I can see it: {}", text),
        ..Default::default()
    }
}

fn step(explanation: String, forward: i32, right: i32, pitch: i32, yaw: i32) -> CameraCommand {
    CameraCommand {
        explanation,
        forward,
        right,
        pitch,
        yaw,
        ..Default::default()
    }
}

fn coordinator(camera: &SharedCamera, frames: FakeFrames, client: ScriptedClient) -> Coordinator {
    Coordinator::new(Box::new(camera.clone()), Box::new(frames), Box::new(client)).with_settle(Immediate)
}

fn start_camera() -> SharedCamera {
    SharedCamera::new(SceneCamera::new(START))
}

#[tokio::test]
async fn test_answer_on_first_iteration() {
    let camera = start_camera();
    let client = ScriptedClient::new(|_| Ok(answer("red")));
    let requests = client.requests();
    let mut agent = coordinator(&camera, FakeFrames::new(), client);

    let outcome = agent.analyze("What color is the car?").await.unwrap();

    match &outcome {
        AnalysisOutcome::Done { answer, metrics, .. } => {
            assert_eq!(answer.as_deref(), Some("red"));
            assert_eq!(metrics.iterations, 1);
            assert_eq!(metrics.total_translation, 0.0);
            assert_eq!(metrics.total_rotation, 0.0);
            assert_eq!(metrics.initial_pose, START);
        }
        other => panic!("expected Done, got {:?}", other),
    }
    assert_eq!(camera.pose(), START);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].iteration, 1);
    assert_eq!(requests[0].question, "What color is the car?");
    assert_eq!(requests[0].previous_frame, None);
    assert_eq!(requests[0].last_action_summary, None);
}

#[tokio::test]
async fn test_capture_failure_on_first_iteration() {
    let camera = start_camera();
    let client = ScriptedClient::new(|_| Ok(answer("unused")));
    let requests = client.requests();
    let mut agent = coordinator(&camera, FakeFrames::failing_at(1), client);

    let outcome = agent.analyze("Where is the robot?").await.unwrap();

    assert!(matches!(outcome, AnalysisOutcome::CaptureFailed { .. }), "{:?}", outcome);
    assert_eq!(outcome.iterations(), 1);
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_capture_failure_keeps_totals_so_far() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| Ok(step(format!("step {}", req.iteration), 100, 0, 0, 10)));
    let mut agent = coordinator(&camera, FakeFrames::failing_at(3), client);

    let outcome = agent.analyze("Count the columns").await.unwrap();

    assert!(matches!(outcome, AnalysisOutcome::CaptureFailed { .. }));
    let m = outcome.metrics();
    assert_eq!(m.iterations, 3);
    assert_eq!(m.total_translation, 200.0);
    assert_eq!(m.total_rotation, 20.0);
}

#[tokio::test]
async fn test_exhausts_after_ten_iterations() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| Ok(step(format!("step {}", req.iteration), 100, 0, 0, 0)));
    let requests = client.requests();
    let mut agent = coordinator(&camera, FakeFrames::new(), client);

    let outcome = agent.analyze("Is there a forklift?").await.unwrap();

    match &outcome {
        AnalysisOutcome::Exhausted {
            last_explanation,
            metrics,
        } => {
            assert_eq!(last_explanation, "step 10");
            assert_eq!(metrics.iterations, 10);
            assert_eq!(metrics.total_translation, 1000.0);
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
    assert_eq!(requests.lock().unwrap().len(), 10);
    // Upright camera looks along +Y
    assert_eq!(camera.pose().translation, [0.0, -500.0, 170.0]);
}

#[tokio::test]
async fn test_iteration_budget_is_configurable() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| Ok(step(format!("step {}", req.iteration), 0, 0, 0, 5)));
    let mut agent = coordinator(&camera, FakeFrames::new(), client).max_iterations(3);

    let outcome = agent.analyze("Anything blue?").await.unwrap();

    assert_eq!(outcome.iterations(), 3);
    assert_eq!(camera.pose().rotation, [90.0, 0.0, -15.0]);
}

#[tokio::test]
async fn test_history_carries_previous_frame_and_action() {
    let camera = start_camera();
    let first = step("turn right to find the car".to_string(), 0, 0, 0, 30);
    let first_reply = first.clone();
    let client = ScriptedClient::new(move |req| {
        if req.iteration == 1 {
            Ok(first_reply.clone())
        } else {
            Ok(answer("red"))
        }
    });
    let requests = client.requests();
    let mut agent = coordinator(&camera, FakeFrames::new(), client);

    agent.analyze("What color is the car?").await.unwrap();

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].iteration, 2);
    assert_eq!(requests[1].current_frame, PathBuf::from("/tmp/frame_2.jpg"));
    assert_eq!(requests[1].previous_frame, Some(PathBuf::from("/tmp/frame_1.jpg")));
    assert_eq!(requests[1].last_action_summary, Some(first.summary()));
}

#[tokio::test]
async fn test_totals_accumulate_per_step() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| match req.iteration {
        1 => Ok(step("a".to_string(), 30, 40, -10, 5)),
        2 => Ok(step("b".to_string(), -30, -40, 10, -5)),
        _ => Ok(answer("done")),
    });
    let mut agent = coordinator(&camera, FakeFrames::new(), client);

    let outcome = agent.analyze("Where is the workstation?").await.unwrap();

    let m = outcome.metrics();
    assert_eq!(m.iterations, 3);
    assert_eq!(m.total_translation, 100.0);
    assert_eq!(m.total_rotation, 30.0);
    assert!(m.elapsed_time >= 0.0);
}

#[tokio::test]
async fn test_done_reply_with_movement_is_not_applied() {
    let camera = start_camera();
    let client = ScriptedClient::new(|_| {
        Ok(CameraCommand {
            forward: 500,
            yaw: 45,
            ..answer("red")
        })
    });
    let mut agent = coordinator(&camera, FakeFrames::new(), client);

    let outcome = agent.analyze("What color is the car?").await.unwrap();

    assert!(outcome.is_done());
    assert_eq!(outcome.metrics().total_translation, 0.0);
    assert_eq!(camera.pose(), START);
}

#[tokio::test]
async fn test_validation_failure_aborts_run() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| {
        if req.iteration == 1 {
            Ok(step("closer".to_string(), 200, 0, 0, 0))
        } else {
            Err(VlmError::Contract("missing field `explanation`".to_string()))
        }
    });
    let mut agent = coordinator(&camera, FakeFrames::new(), client);

    let err = agent.analyze("What color is the car?").await.unwrap_err();

    match err {
        AgentError::Vision(e) => assert_eq!(e.kind(), FailureKind::Validation),
        other => panic!("expected a vision error, got {}", other),
    }
    // The first move stays applied
    assert_eq!(camera.pose().translation, [0.0, -1300.0, 170.0]);
}

#[tokio::test]
async fn test_empty_question_is_rejected() {
    let camera = start_camera();
    let mut agent = coordinator(&camera, FakeFrames::new(), ScriptedClient::new(|_| Ok(answer("x"))));
    assert!(matches!(agent.analyze("   ").await, Err(AgentError::EmptyQuestion)));
}

#[test]
fn test_unknown_mode_rejected_at_construction() {
    let mut config = Config::defaults();
    config.vision.endpoint = "http://localhost:8080/v1".to_string();
    config.vision.api_key = "key".to_string();
    config.vision.model = "model".to_string();
    config.vision.mode = "Assistants API".to_string();

    let result = Coordinator::from_config(&config, Box::new(start_camera()), Box::new(FakeFrames::new()));
    assert!(matches!(result, Err(AgentError::Configuration(_))));
}

#[tokio::test]
async fn test_runner_rejects_second_start_while_busy() {
    let camera = start_camera();
    let client = ScriptedClient::new(|_| Ok(answer("red"))).slow(Duration::from_secs(30));
    let mut runner = AnalysisRunner::new(coordinator(&camera, FakeFrames::new(), client));

    runner.start("What color is the car?").await.unwrap();
    assert!(runner.is_running());
    assert!(matches!(runner.start("Another question").await, Err(AgentError::Busy)));

    assert!(runner.cancel().await);
    assert!(!runner.is_running());
    assert!(matches!(runner.wait().await, Err(AgentError::Idle)));
}

#[tokio::test]
async fn test_runner_cancel_mid_run_then_restart() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| {
        if req.question.starts_with("slow") {
            Ok(step("keep looking".to_string(), 100, 0, 0, 0))
        } else {
            Ok(answer("red"))
        }
    })
    .slow(Duration::from_millis(200));
    let mut runner = AnalysisRunner::new(coordinator(&camera, FakeFrames::new(), client));

    runner.start("slow search").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(runner.cancel().await);
    assert!(runner.last_outcome().is_none());

    let outcome = runner.run("What color is the car?").await.unwrap();
    assert!(outcome.is_done());
}

#[tokio::test]
async fn test_runner_wait_is_cancel_safe() {
    let camera = start_camera();
    let client = ScriptedClient::new(|_| Ok(answer("red"))).slow(Duration::from_millis(100));
    let mut runner = AnalysisRunner::new(coordinator(&camera, FakeFrames::new(), client));

    runner.start("What color is the car?").await.unwrap();
    let early = tokio::time::timeout(Duration::from_millis(10), runner.wait()).await;
    assert!(early.is_err());
    assert!(runner.is_running());

    let outcome = runner.wait().await.unwrap();
    assert!(outcome.is_done());
}

#[tokio::test]
async fn test_reset_camera_restores_initial_pose() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| Ok(step(format!("step {}", req.iteration), 150, -50, 10, 20)));
    let mut runner = AnalysisRunner::new(coordinator(&camera, FakeFrames::new(), client));

    assert_eq!(runner.reset_camera().await.unwrap(), None);

    let outcome = runner.run("Find the exit").await.unwrap();
    assert!(matches!(outcome, AnalysisOutcome::Exhausted { .. }));
    assert_ne!(camera.pose(), START);

    assert_eq!(runner.reset_camera().await.unwrap(), Some(START));
    assert_eq!(camera.pose(), START);
    assert_eq!(runner.camera_pose().await, START);
}

#[tokio::test]
async fn test_finished_run_is_kept_when_not_awaited() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| {
        if req.question == "first" {
            Ok(step("closer".to_string(), 100, 0, 0, 0))
        } else {
            Ok(answer("red"))
        }
    });
    let agent = coordinator(&camera, FakeFrames::new(), client).max_iterations(1);
    let mut runner = AnalysisRunner::new(agent);

    runner.run("first").await.unwrap();
    let second_start = camera.pose();
    assert_ne!(second_start, START);

    runner.start("second").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!runner.is_running());

    // Nothing is in flight, so there is nothing to cancel
    assert!(!runner.cancel().await);
    let last = runner.last_outcome().expect("second run recorded");
    assert!(last.is_done());
    assert_eq!(last.metrics().initial_pose, second_start);
    assert_eq!(runner.reset_camera().await.unwrap(), Some(second_start));
}

#[tokio::test]
async fn test_start_after_unobserved_finish_records_outcome() {
    let camera = start_camera();
    let client = ScriptedClient::new(|req| Ok(answer(&req.question)));
    let mut runner = AnalysisRunner::new(coordinator(&camera, FakeFrames::new(), client));

    runner.start("blue").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    runner.start("green").await.unwrap();

    match runner.last_outcome() {
        Some(AnalysisOutcome::Done { answer, .. }) => assert_eq!(answer.as_deref(), Some("blue")),
        other => panic!("expected the first answer, got {:?}", other),
    }
    let outcome = runner.wait().await.unwrap();
    assert!(matches!(outcome, AnalysisOutcome::Done { answer: Some(ref a), .. } if a == "green"));
}
