//! End-to-end behaviour of the uploader, driven through its public API.

use std::cell::RefCell;
use std::rc::Rc;

use fileuploader::{Candidate, QueueSummary, RejectReason, UploadConfig, UploadOptions, Uploader};
use fileuploader_transfer::test_helpers::serve;
use fileuploader_transfer::{HttpTransport, TransferError, Transport, TransportEvent, UploadRequest};

type Log = Rc<RefCell<Vec<String>>>;

/// Transport that records each attempt into the shared log and keeps the
/// request so the test can answer it.
struct Recorder {
    log: Log,
    requests: Rc<RefCell<Vec<UploadRequest>>>,
    in_flight: Rc<RefCell<usize>>,
}

impl Transport for Recorder {
    type Handle = InFlightGuard;

    fn begin(&mut self, request: UploadRequest) -> Result<InFlightGuard, TransferError> {
        let mut in_flight = self.in_flight.borrow_mut();
        assert_eq!(*in_flight, 0, "second upload started while one was in flight");
        *in_flight += 1;

        self.log
            .borrow_mut()
            .push(format!("transport:{}", request.entry.name()));
        self.requests.borrow_mut().push(request);
        Ok(InFlightGuard(self.in_flight.clone()))
    }
}

struct InFlightGuard(Rc<RefCell<usize>>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        *self.0.borrow_mut() -= 1;
    }
}

struct Harness {
    uploader: Uploader<Recorder>,
    log: Log,
    requests: Rc<RefCell<Vec<UploadRequest>>>,
}

impl Harness {
    fn new(options: UploadOptions) -> Self {
        let log: Log = Rc::default();
        let requests: Rc<RefCell<Vec<UploadRequest>>> = Rc::default();
        let transport = Recorder {
            log: log.clone(),
            requests: Rc::clone(&requests),
            in_flight: Rc::default(),
        };
        let config = UploadConfig::configure(options.server("http://uploads.test/up")).unwrap();
        let mut uploader = Uploader::new(config, transport).unwrap();

        let l = log.clone();
        uploader.on_file_queued(move |_, e| l.borrow_mut().push(format!("queued:{}", e.name())));
        let l = log.clone();
        uploader.on_file_queued_error(move |_, e, reason| {
            l.borrow_mut()
                .push(format!("rejected:{}:{}", e.name(), reason.code()))
        });
        let l = log.clone();
        uploader.on_files_queued_complete(move |_, s| {
            l.borrow_mut()
                .push(format!("batch:{}/{}", s.selected, s.queued))
        });
        let l = log.clone();
        uploader.on_upload_success(move |_, e, body| {
            l.borrow_mut().push(format!("success:{}:{body}", e.name()))
        });
        let l = log.clone();
        uploader.on_upload_error(move |_, e, failure| {
            l.borrow_mut().push(format!("error:{}:{failure}", e.name()))
        });
        let l = log.clone();
        uploader.on_upload_complete(move |_| l.borrow_mut().push("complete".into()));

        Self {
            uploader,
            log,
            requests,
        }
    }

    fn answer(&mut self, index: usize, status: u16) {
        let attempt = self.requests.borrow()[index].attempt;
        self.uploader.handle(TransportEvent::Completed {
            attempt,
            status,
            body: format!("reply-{index}"),
        });
    }

    fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.log.borrow().iter().filter(|l| l.starts_with(prefix)).count()
    }
}

fn three_files() -> Vec<Candidate> {
    vec![
        Candidate::new("/photos/one.png", 100, "image/png"),
        Candidate::new("/photos/two.png", 2_000_000, "image/png"),
        Candidate::new("/photos/three.png", 300, "image/png"),
    ]
}

fn limited() -> UploadOptions {
    UploadOptions::default().file_size_limit(1_000_000)
}

#[test]
fn oversized_file_is_rejected_and_rest_queued() {
    let mut h = Harness::new(limited());

    let summary = h.uploader.select_files(three_files());

    assert_eq!(summary, QueueSummary { selected: 3, queued: 2 });
    assert_eq!(
        h.log(),
        vec![
            "queued:one.png".to_string(),
            format!("rejected:two.png:{}", RejectReason::SizeLimitExceeded.code()),
            "queued:three.png".to_string(),
            "batch:3/2".to_string(),
        ]
    );
    assert_eq!(h.count("transport:"), 0);
}

#[test]
fn auto_mode_uploads_queued_files_one_after_another() {
    let mut h = Harness::new(limited().auto(true));

    h.uploader.select_files(three_files());
    assert_eq!(h.count("transport:"), 1);
    h.answer(0, 200);
    assert_eq!(h.count("transport:"), 2);
    h.answer(1, 200);

    let log = h.log();
    let tail: Vec<_> = log.iter().skip_while(|l| !l.starts_with("batch:")).collect();
    assert_eq!(
        tail,
        vec![
            "batch:3/2",
            "transport:one.png",
            "success:one.png:reply-0",
            "transport:three.png",
            "success:three.png:reply-1",
            "complete",
        ]
    );
    assert!(h.uploader.is_idle());
}

#[test]
fn empty_selection_still_reports_batch_and_completes_on_start() {
    let mut h = Harness::new(limited());

    let summary = h.uploader.select_files(Vec::new());
    assert_eq!(summary, QueueSummary { selected: 0, queued: 0 });
    assert_eq!(h.log(), vec!["batch:0/0"]);

    h.uploader.start_upload();
    assert_eq!(h.log(), vec!["batch:0/0", "complete"]);
    assert_eq!(h.count("transport:"), 0);
}

#[test]
fn server_error_skips_success_but_queue_advances() {
    let mut h = Harness::new(limited().auto(true));
    h.uploader.select_files(vec![
        Candidate::new("/photos/a.png", 1, "image/png"),
        Candidate::new("/photos/b.png", 1, "image/png"),
    ]);

    h.answer(0, 500);
    h.answer(1, 200);

    assert_eq!(h.count("success:"), 1);
    assert_eq!(h.count("success:b.png"), 1);
    assert_eq!(h.count("error:a.png:server responded with status 500"), 1);
    assert_eq!(h.count("complete"), 1);
}

#[test]
fn completion_fires_once_per_batch() {
    let mut h = Harness::new(limited().auto(true));
    h.uploader
        .select_files(vec![Candidate::new("/photos/a.png", 1, "image/png")]);
    h.answer(0, 200);

    h.uploader.start_upload();
    h.uploader.start_upload();
    assert_eq!(h.count("complete"), 1);

    // A new selection opens a new batch.
    h.uploader
        .select_files(vec![Candidate::new("/photos/b.png", 1, "image/png")]);
    h.answer(1, 200);
    assert_eq!(h.count("complete"), 2);
}

#[test]
fn selecting_during_upload_joins_current_batch() {
    let mut h = Harness::new(limited().auto(true));
    h.uploader
        .select_files(vec![Candidate::new("/photos/a.png", 1, "image/png")]);
    h.uploader
        .select_files(vec![Candidate::new("/photos/b.png", 1, "image/png")]);
    assert_eq!(h.count("transport:"), 1);

    h.answer(0, 200);
    assert_eq!(h.count("transport:b.png"), 1);
    assert_eq!(h.count("complete"), 0);
    h.answer(1, 200);
    assert_eq!(h.count("complete"), 1);
}

#[test]
fn type_rejection_uses_its_own_code() {
    let mut h = Harness::new(limited());
    h.uploader
        .select_files(vec![Candidate::new("/docs/report.pdf", 10, "application/pdf")]);
    assert_eq!(
        h.log(),
        vec![
            format!("rejected:report.pdf:{}", RejectReason::TypeNotAccepted.code()),
            "batch:1/0".to_string(),
        ]
    );
}

#[tokio::test]
async fn uploads_files_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.png");
    let second = dir.path().join("second.gif");
    std::fs::write(&first, b"PNG-BYTES").unwrap();
    std::fs::write(&second, b"GIF-BYTES").unwrap();

    let (url, server) = serve(vec![500, 200]).await;
    let (transport, mut events) = HttpTransport::channel(None).unwrap();
    let config = UploadConfig::configure(UploadOptions::default().server(url).auto(true)).unwrap();
    let mut uploader = Uploader::new(config, transport).unwrap();
    uploader.set_post_param("album", "holiday");

    let outcomes = Rc::new(RefCell::new(Vec::new()));
    let o = outcomes.clone();
    uploader.on_upload_success(move |_, e, body| {
        o.borrow_mut().push(format!("{}:{body}", e.name()))
    });
    let o = outcomes.clone();
    uploader.on_upload_error(move |_, e, f| o.borrow_mut().push(format!("{}:{f}", e.name())));

    let candidates = fileuploader::candidates_from_paths([&first, &second]).unwrap();
    uploader.select_files(candidates);
    uploader.run_until_idle(&mut events).await.unwrap();

    assert_eq!(
        *outcomes.borrow(),
        vec![
            "first.png:server responded with status 500".to_string(),
            "second.gif:ok".to_string(),
        ]
    );

    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains("name=\"xeditorfile\"; filename=\"first.png\""));
    assert!(requests[0].contains("name=\"album\""));
    assert!(requests[1].contains("GIF-BYTES"));
}
