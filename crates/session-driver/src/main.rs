//! Liveness Session - Demo Entry Point
//!
//! Runs one session over synthetic frames with a simulated user who follows
//! every requested bearing. Set `LIVENESS_RECOGNITION_URL` to use a real
//! recognition service instead of the in-process mock.

use anyhow::Context;
use camera_capture::{CameraConfig, SyntheticFrameSource, VideoFrame};
use face_recognition::{FaceRecognition, HttpFaceRecognition, MockFaceRecognition, RecognitionConfig};
use liveness::requirements::IdealFace;
use liveness::{Face, FaceDetector, FaceRequirements, LivenessDetectionSession, LivenessError, SessionSettings};
use session_driver::{capture_faces, init_logging};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::info;

/// Poses the face as the session's current requirements ask
struct CooperativeUser {
    target: Arc<Mutex<Option<IdealFace>>>,
}

impl FaceDetector for CooperativeUser {
    fn detect_face(&mut self, _frame: &VideoFrame) -> Result<Option<Face>, LivenessError> {
        let target = self
            .target
            .lock()
            .map_err(|_| LivenessError::DetectorUnavailable("pose state poisoned".into()))?;
        Ok(target.map(|ideal| Face::new(ideal.bounds, ideal.angle)))
    }
}

fn recognition_service() -> anyhow::Result<Arc<dyn FaceRecognition>> {
    match std::env::var("LIVENESS_RECOGNITION_URL") {
        Ok(service_url) => {
            let config = RecognitionConfig {
                service_url,
                ..Default::default()
            };
            let client = HttpFaceRecognition::new(&config).context("Failed to create recognition client")?;
            info!(url = client.service_url(), "Using face recognition service");
            Ok(Arc::new(client))
        }
        Err(_) => Ok(Arc::new(MockFaceRecognition::new())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("=== Liveness Session v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = SessionSettings::load(config_path.as_deref()).context("Failed to load settings")?;
    let camera = CameraConfig::for_front_camera(settings.use_front_camera);

    let target = Arc::new(Mutex::new(None));
    let listener_target = Arc::clone(&target);
    let mut session = LivenessDetectionSession::new(settings, recognition_service()?)?;
    session.register_face_requirement_listener(Box::new(move |requirements: &FaceRequirements| {
        info!(angle = ?requirements.ideal.angle, "Face requirements changed");
        if let Ok(mut target) = listener_target.lock() {
            *target = Some(requirements.ideal);
        }
    }));

    let frame_count = (session.settings().max_duration * f64::from(camera.fps)) as u32;
    let mut source = SyntheticFrameSource::new(&camera, frame_count);
    let mut user = CooperativeUser { target };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    match capture_faces(&mut session, &mut user, &mut source, cancel_rx).await? {
        Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        None => info!("Session cancelled"),
    }
    Ok(())
}
