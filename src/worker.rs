//! Background submit pipeline: composite, report, then call the generator.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use image::RgbaImage;

use crate::annotation::Polygon;
use crate::compositor::{spawn_composite, EncodingError, MaskVariant};
use crate::config::MaskProfiles;
use crate::generation::{GenerationError, GenerationRequest, ImageGenerator};
use crate::state::PendingRequest;

pub struct SubmitJob {
    pub kind: PendingRequest,
    pub image: Arc<RgbaImage>,
    pub polygon: Polygon,
    pub prompt: String,
    pub profiles: MaskProfiles,
}

pub enum WorkerEvent {
    /// Every composite of the job is encoded; the request is about to go out.
    /// `preview` is only produced for a fresh submit.
    Composed {
        kind: PendingRequest,
        preview: Option<RgbaImage>,
    },
    CompositeFailed(EncodingError),
    Generated(RgbaImage),
    GenerationFailed(GenerationError),
}

pub struct SubmitWorker {
    jobs: Sender<SubmitJob>,
    events: Receiver<WorkerEvent>,
    _worker: thread::JoinHandle<()>,
}

impl SubmitWorker {
    pub fn new(generator: Box<dyn ImageGenerator>) -> Self {
        let (jobs, job_rx) = mpsc::channel::<SubmitJob>();
        let (event_tx, events) = mpsc::channel::<WorkerEvent>();

        let worker = thread::spawn(move || {
            log::debug!("submit worker started");
            for job in job_rx {
                if !run_job(generator.as_ref(), job, &event_tx) {
                    break;
                }
            }
            log::debug!("submit worker stopped");
        });

        Self {
            jobs,
            events,
            _worker: worker,
        }
    }

    pub fn submit(&self, job: SubmitJob) -> bool {
        self.jobs.send(job).is_ok()
    }

    pub fn try_recv(&self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }
}

/// Returns `false` once the UI side has hung up.
fn run_job(generator: &dyn ImageGenerator, job: SubmitJob, tx: &Sender<WorkerEvent>) -> bool {
    let SubmitJob {
        kind,
        image,
        polygon,
        prompt,
        profiles,
    } = job;

    let submission = spawn_composite(
        Arc::clone(&image),
        polygon.clone(),
        MaskVariant::Submission,
        profiles.submission,
    );
    let preview = match kind {
        PendingRequest::Submit => Some(spawn_composite(
            image,
            polygon,
            MaskVariant::Preview,
            profiles.preview,
        )),
        PendingRequest::Resubmit => None,
    };

    let submission = submission.wait();
    let preview = preview.map(|pending| pending.wait()).transpose();

    let (request_image, preview) = match (submission, preview) {
        (Ok(request_image), Ok(preview)) => (request_image, preview),
        (Err(err), _) | (_, Err(err)) => {
            return tx.send(WorkerEvent::CompositeFailed(err)).is_ok();
        }
    };

    let preview = preview.and_then(|bytes| match image::load_from_memory(&bytes) {
        Ok(decoded) => Some(decoded.to_rgba8()),
        Err(err) => {
            log::warn!("preview composite cannot be decoded: {err}");
            None
        }
    });

    if tx.send(WorkerEvent::Composed { kind, preview }).is_err() {
        return false;
    }

    let request = GenerationRequest {
        image: request_image,
        encoding: profiles.submission.encoding,
        prompt,
    };
    let event = match generator.generate(&request) {
        Ok(generated) => {
            log::info!(
                "generated {}x{} image",
                generated.width(),
                generated.height()
            );
            WorkerEvent::Generated(generated)
        }
        Err(err) => {
            log::error!("generation failed: {err}");
            WorkerEvent::GenerationFailed(err)
        }
    };
    tx.send(event).is_ok()
}
