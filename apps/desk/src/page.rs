//! Page event loop.
//!
//! One task owns the controller. User events and finished I/O both arrive in
//! the same `select!` loop, so the controller never needs a lock. Backend and
//! clipboard calls run in a `JoinSet` and report back as `Completion`s. A task
//! that dies is still reported to the flow that started it. After every step
//! the current view is published on a `watch` channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error};

use crate::api_client::{ApiError, BackendApi};
use crate::clipboard::{Clipboard, ClipboardError};
use crate::controller::view::PageView;
use crate::controller::UploadAndGenerateController;
use crate::models::upload::UploadedFile;

const EVENT_BUFFER: usize = 32;

#[derive(Debug)]
pub enum PageEvent {
    ResumeSelected(UploadedFile),
    JobDescriptionInput(String),
    GenerateClicked,
    CopyClicked,
}

enum Completion {
    Extraction(Result<String, ApiError>),
    Generation(Result<String, ApiError>),
    Copy(Result<(), ClipboardError>),
}

/// Which flow a spawned task belongs to.
#[derive(Debug, Clone, Copy)]
enum Flow {
    Extraction,
    Generation,
    Copy,
}

/// Outstanding I/O, keyed so a failed task can still be routed to its flow.
#[derive(Default)]
struct Pending {
    tasks: JoinSet<Completion>,
    flows: HashMap<task::Id, Flow>,
}

impl Pending {
    fn spawn<F>(&mut self, flow: Flow, future: F)
    where
        F: std::future::Future<Output = Completion> + Send + 'static,
    {
        let handle = self.tasks.spawn(future);
        self.flows.insert(handle.id(), flow);
    }
}

/// Handle to a running page. Dropping `events` closes the page once
/// outstanding requests have landed; `task` then yields the controller.
pub struct PageHandle {
    pub events: mpsc::Sender<PageEvent>,
    pub view: watch::Receiver<PageView>,
    pub task: JoinHandle<UploadAndGenerateController>,
}

pub fn spawn_page(
    controller: UploadAndGenerateController,
    api: Arc<dyn BackendApi>,
    clipboard: Arc<dyn Clipboard>,
) -> PageHandle {
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (view_tx, view_rx) = watch::channel(controller.view().clone());
    let task = tokio::spawn(run_page(controller, api, clipboard, events_rx, view_tx));

    PageHandle {
        events: events_tx,
        view: view_rx,
        task,
    }
}

pub async fn run_page(
    mut controller: UploadAndGenerateController,
    api: Arc<dyn BackendApi>,
    clipboard: Arc<dyn Clipboard>,
    mut events: mpsc::Receiver<PageEvent>,
    view_tx: watch::Sender<PageView>,
) -> UploadAndGenerateController {
    let mut pending = Pending::default();

    loop {
        let copy_deadline = controller.view().copy_feedback.as_ref().map(|f| f.until);

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                dispatch(&mut controller, &api, &clipboard, &mut pending, event);
            }
            Some(joined) = pending.tasks.join_next_with_id() => {
                complete(&mut controller, &mut pending.flows, joined);
            }
            _ = sleep_until(copy_deadline.unwrap_or_else(Instant::now)), if copy_deadline.is_some() => {
                controller.clear_expired_copy_feedback(Instant::now());
            }
        }
        view_tx.send_replace(controller.view().clone());
    }

    // Input closed: let in-flight requests land so their results are published.
    while let Some(joined) = pending.tasks.join_next_with_id().await {
        complete(&mut controller, &mut pending.flows, joined);
        view_tx.send_replace(controller.view().clone());
    }

    debug!("Page closed");
    controller
}

fn dispatch(
    controller: &mut UploadAndGenerateController,
    api: &Arc<dyn BackendApi>,
    clipboard: &Arc<dyn Clipboard>,
    pending: &mut Pending,
    event: PageEvent,
) {
    match event {
        PageEvent::ResumeSelected(file) => {
            if controller.begin_upload(&file).is_ok() {
                let api = Arc::clone(api);
                pending.spawn(Flow::Extraction, async move {
                    Completion::Extraction(api.extract_text(&file).await)
                });
            }
        }
        PageEvent::JobDescriptionInput(text) => controller.set_job_description(text),
        PageEvent::GenerateClicked => {
            if controller.is_generating() {
                debug!("Generate clicked while a request is outstanding; ignored");
                return;
            }
            if let Ok(request) = controller.begin_generate() {
                let api = Arc::clone(api);
                pending.spawn(Flow::Generation, async move {
                    Completion::Generation(api.generate_cover_letter(&request).await)
                });
            }
        }
        PageEvent::CopyClicked => match controller.copy_text() {
            Some(text) => {
                let clipboard = Arc::clone(clipboard);
                pending.spawn(Flow::Copy, async move {
                    Completion::Copy(clipboard.write_text(&text).await)
                });
            }
            None => debug!("Copy clicked with no cover letter shown"),
        },
    }
}

fn complete(
    controller: &mut UploadAndGenerateController,
    flows: &mut HashMap<task::Id, Flow>,
    joined: Result<(task::Id, Completion), JoinError>,
) {
    let (id, completion) = match joined {
        Ok(done) => done,
        Err(e) => {
            error!("Page task failed: {e}");
            let reason = e.to_string();
            match flows.remove(&e.id()) {
                Some(Flow::Extraction) => {
                    controller.finish_upload(Err(ApiError::TaskFailed(reason)));
                }
                Some(Flow::Generation) => {
                    controller.finish_generate(Err(ApiError::TaskFailed(reason)));
                }
                Some(Flow::Copy) => {
                    controller.finish_copy(Err(ClipboardError::Unavailable(reason)));
                }
                None => {}
            }
            return;
        }
    };

    flows.remove(&id);
    match completion {
        Completion::Extraction(result) => {
            controller.finish_upload(result);
        }
        Completion::Generation(result) => {
            controller.finish_generate(result);
        }
        Completion::Copy(result) => controller.finish_copy(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
    use crate::controller::tests::{file, Canned, FakeBackend, FakeClipboard};
    use crate::controller::view::{FlowState, COPIED_LABEL, COPY_LABEL};
    use crate::errors::{EXTRACTION_FALLBACK, GENERATION_FALLBACK};
    use crate::models::api::GenerateCoverLetterRequest;
    use crate::models::upload::{MIME_DOCX, MIME_PDF};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Extraction blocks until the test opens the gate.
    struct GatedBackend {
        gate: Notify,
        extract_calls: AtomicUsize,
    }

    #[async_trait]
    impl BackendApi for GatedBackend {
        async fn extract_text(&self, _file: &UploadedFile) -> Result<String, ApiError> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok("gated resume".into())
        }

        async fn generate_cover_letter(
            &self,
            _request: &GenerateCoverLetterRequest,
        ) -> Result<String, ApiError> {
            Ok("Letter".into())
        }
    }

    /// Panics on the first call of each endpoint, then answers normally.
    #[derive(Default)]
    struct PanicsFirstBackend {
        extract_calls: AtomicUsize,
        generate_calls: AtomicUsize,
    }

    #[async_trait]
    impl BackendApi for PanicsFirstBackend {
        async fn extract_text(&self, _file: &UploadedFile) -> Result<String, ApiError> {
            if self.extract_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("extraction blew up");
            }
            Ok("second try".into())
        }

        async fn generate_cover_letter(
            &self,
            _request: &GenerateCoverLetterRequest,
        ) -> Result<String, ApiError> {
            if self.generate_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("generation blew up");
            }
            Ok("Letter".into())
        }
    }

    fn controller() -> UploadAndGenerateController {
        UploadAndGenerateController::new(DEFAULT_MAX_UPLOAD_BYTES)
    }

    async fn wait_for(
        view: &mut watch::Receiver<PageView>,
        predicate: impl FnMut(&PageView) -> bool,
    ) -> PageView {
        tokio::time::timeout(Duration::from_secs(5), view.wait_for(predicate))
            .await
            .expect("view never reached expected state")
            .expect("page closed")
            .clone()
    }

    #[tokio::test]
    async fn test_full_flow_through_events() {
        let api = Arc::new(FakeBackend::new(
            Canned::Ok("Rust engineer"),
            Canned::Ok("Dear Hiring Manager,\n\nI am excited...\n"),
        ));
        let clipboard = Arc::new(FakeClipboard::new(false));
        let mut page = spawn_page(controller(), api.clone(), clipboard.clone());

        page.events
            .send(PageEvent::ResumeSelected(file(MIME_PDF)))
            .await
            .unwrap();
        page.events
            .send(PageEvent::JobDescriptionInput("Backend role".into()))
            .await
            .unwrap();
        wait_for(&mut page.view, |v| v.generate_button.enabled).await;

        page.events.send(PageEvent::GenerateClicked).await.unwrap();
        let view = wait_for(&mut page.view, |v| v.result.is_some()).await;
        assert_eq!(view.result.unwrap().paragraphs().len(), 2);

        page.events.send(PageEvent::CopyClicked).await.unwrap();
        let view = wait_for(&mut page.view, |v| v.copy_feedback.is_some()).await;
        assert_eq!(view.copy_feedback.unwrap().label, COPIED_LABEL);
        assert_eq!(
            clipboard.written.lock().unwrap().as_slice(),
            &["Dear Hiring Manager,\n\nI am excited...".to_string()]
        );

        drop(page.events);
        let controller = page.task.await.unwrap();
        assert_eq!(controller.extracted_resume_text(), "Rust engineer");
        assert_eq!(api.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_upload_rejected_while_first_in_flight() {
        let api = Arc::new(GatedBackend {
            gate: Notify::new(),
            extract_calls: AtomicUsize::new(0),
        });
        let mut page = spawn_page(
            controller(),
            api.clone(),
            Arc::new(FakeClipboard::new(false)),
        );

        page.events
            .send(PageEvent::ResumeSelected(file(MIME_PDF)))
            .await
            .unwrap();
        wait_for(&mut page.view, |v| v.upload == FlowState::InProgress).await;

        page.events
            .send(PageEvent::ResumeSelected(file(MIME_DOCX)))
            .await
            .unwrap();
        let view = wait_for(&mut page.view, |v| !v.upload_error.is_empty()).await;
        assert_eq!(view.upload_error, "A resume is already being processed");
        assert_eq!(view.upload, FlowState::InProgress);

        api.gate.notify_one();
        let view = wait_for(&mut page.view, |v| v.upload == FlowState::Succeeded).await;
        assert_eq!(view.resume_preview.as_deref(), Some("gated resume"));
        assert_eq!(api.extract_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closing_page_drains_outstanding_requests() {
        let api = Arc::new(FakeBackend::new(Canned::Ok("late text"), Canned::Malformed));
        let page = spawn_page(controller(), api, Arc::new(FakeClipboard::new(false)));

        page.events
            .send(PageEvent::ResumeSelected(file(MIME_PDF)))
            .await
            .unwrap();
        drop(page.events);

        let controller = page.task.await.unwrap();
        assert_eq!(controller.extracted_resume_text(), "late text");
        assert_eq!(controller.view().upload, FlowState::Succeeded);
    }

    #[tokio::test]
    async fn test_generate_click_without_input_sets_error() {
        let api = Arc::new(FakeBackend::new(Canned::Ok("T"), Canned::Ok("L")));
        let mut page = spawn_page(
            controller(),
            api.clone(),
            Arc::new(FakeClipboard::new(false)),
        );

        page.events.send(PageEvent::GenerateClicked).await.unwrap();
        let view = wait_for(&mut page.view, |v| !v.generate_error.is_empty()).await;
        assert_eq!(
            view.generate_error,
            "Please upload a resume and enter a job description"
        );
        assert_eq!(api.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicked_extraction_fails_flow_and_allows_retry() {
        let api = Arc::new(PanicsFirstBackend::default());
        let mut page = spawn_page(
            controller(),
            api.clone(),
            Arc::new(FakeClipboard::new(false)),
        );

        page.events
            .send(PageEvent::ResumeSelected(file(MIME_PDF)))
            .await
            .unwrap();
        let view = wait_for(&mut page.view, |v| v.upload == FlowState::Failed).await;
        assert_eq!(view.upload_error, EXTRACTION_FALLBACK);

        page.events
            .send(PageEvent::ResumeSelected(file(MIME_PDF)))
            .await
            .unwrap();
        let view = wait_for(&mut page.view, |v| v.upload == FlowState::Succeeded).await;
        assert_eq!(view.resume_preview.as_deref(), Some("second try"));
        assert!(view.upload_error.is_empty());
        assert_eq!(api.extract_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicked_generation_fails_flow_and_reenables_button() {
        let api = Arc::new(PanicsFirstBackend::default());
        api.extract_calls.store(1, Ordering::SeqCst);
        let mut page = spawn_page(
            controller(),
            api.clone(),
            Arc::new(FakeClipboard::new(false)),
        );

        page.events
            .send(PageEvent::ResumeSelected(file(MIME_PDF)))
            .await
            .unwrap();
        page.events
            .send(PageEvent::JobDescriptionInput("Backend role".into()))
            .await
            .unwrap();
        wait_for(&mut page.view, |v| v.generate_button.enabled).await;

        page.events.send(PageEvent::GenerateClicked).await.unwrap();
        let view = wait_for(&mut page.view, |v| v.generate == FlowState::Failed).await;
        assert_eq!(view.generate_error, GENERATION_FALLBACK);
        assert!(view.generate_button.enabled);

        page.events.send(PageEvent::GenerateClicked).await.unwrap();
        let view = wait_for(&mut page.view, |v| v.generate == FlowState::Succeeded).await;
        assert_eq!(view.result.unwrap().paragraphs(), &["Letter".to_string()]);
        assert_eq!(api.generate_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_label_revert_is_published() {
        let api = Arc::new(FakeBackend::new(Canned::Ok("T"), Canned::Ok("Letter")));
        let mut page = spawn_page(controller(), api, Arc::new(FakeClipboard::new(false)));

        page.events
            .send(PageEvent::ResumeSelected(file(MIME_PDF)))
            .await
            .unwrap();
        page.events
            .send(PageEvent::JobDescriptionInput("JD".into()))
            .await
            .unwrap();
        wait_for(&mut page.view, |v| v.generate_button.enabled).await;
        page.events.send(PageEvent::GenerateClicked).await.unwrap();
        wait_for(&mut page.view, |v| v.result.is_some()).await;

        page.events.send(PageEvent::CopyClicked).await.unwrap();
        let view = wait_for(&mut page.view, |v| v.copy_feedback.is_some()).await;
        assert_eq!(view.copy_button_label(), COPIED_LABEL);

        let view = wait_for(&mut page.view, |v| v.copy_feedback.is_none()).await;
        assert_eq!(view.copy_button_label(), COPY_LABEL);
    }
}
