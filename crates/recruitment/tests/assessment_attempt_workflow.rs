//! End-to-end scenarios for the single-attempt assessment.
//!
//! A real HTTP server hosts the applicant and score endpoints; attempts run through the public
//! runner with the HTTP score client and an on-disk completion cache, the way the terminal client
//! does.

mod common {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use recruitment::workflows::applicants::{
        applicant_router, ApplicantId, ApplicantRegistration, ApplicantRepository,
        ApplicantService, InMemoryApplicantRepository,
    };
    use recruitment::workflows::assessment::{
        assessment_router, AssessmentRunner, AssessmentService, AssessmentSettings, AttemptGuard,
        FileCompletionCache, HttpScoreAuthority, QuestionBank, ScoringPolicy,
    };

    pub(super) type Runner = AssessmentRunner<FileCompletionCache, HttpScoreAuthority>;

    pub(super) struct Platform {
        pub(super) base_url: String,
        pub(super) repository: Arc<InMemoryApplicantRepository>,
        pub(super) bank: Arc<QuestionBank>,
    }

    pub(super) fn settings(duration_secs: u64) -> AssessmentSettings {
        AssessmentSettings {
            policy: ScoringPolicy::default(),
            duration: Duration::from_secs(duration_secs),
            questions_per_page: 5,
        }
    }

    pub(super) async fn spawn_platform() -> Platform {
        let repository = Arc::new(InMemoryApplicantRepository::new());
        let bank = Arc::new(QuestionBank::builtin().expect("builtin bank"));
        let applicants = Arc::new(ApplicantService::new(repository.clone()));
        let assessment = Arc::new(AssessmentService::new(
            repository.clone(),
            bank.clone(),
            settings(1200),
        ));
        let app = applicant_router(applicants).merge(assessment_router(assessment));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server runs");
        });

        Platform {
            base_url: format!("http://{addr}"),
            repository,
            bank,
        }
    }

    impl Platform {
        pub(super) fn register(&self, email: &str) -> ApplicantId {
            self.repository
                .insert(ApplicantRegistration {
                    first_name: "Kemi".to_string(),
                    last_name: "Ade".to_string(),
                    email: email.to_string(),
                    phone: None,
                    job_id: Some(9),
                })
                .expect("registered")
                .id
        }

        pub(super) fn stored_score(&self, id: ApplicantId) -> Option<f64> {
            self.repository
                .fetch(id)
                .expect("repository reachable")
                .and_then(|applicant| applicant.assessment)
                .map(|record| record.score)
        }

        pub(super) fn device(&self, cache_dir: &std::path::Path, duration_secs: u64) -> Runner {
            let authority =
                Arc::new(HttpScoreAuthority::new(&self.base_url).expect("http client builds"));
            let cache = Arc::new(FileCompletionCache::in_dir(cache_dir).expect("cache opens"));
            let guard = Arc::new(AttemptGuard::new(cache, authority));
            AssessmentRunner::new(guard, self.bank.clone(), settings(duration_secs))
        }
    }
}

use common::*;
use recruitment::workflows::assessment::{
    AttemptState, CompletionCache, FileCompletionCache, GuardError, SubmissionOutcome,
    SubmitTrigger,
};

#[tokio::test]
async fn applicant_completes_once_and_is_blocked_everywhere_afterwards() {
    let platform = spawn_platform().await;
    let applicant = platform.register("kemi@example.com");
    let laptop_dir = tempfile::tempdir().expect("temp dir");
    let laptop = platform.device(laptop_dir.path(), 600);

    let attempt = laptop.open(applicant).await.expect("attempt opens");
    assert_eq!(attempt.state().await, AttemptState::InProgress);
    for question in platform.bank.questions().iter().take(16) {
        attempt
            .answer(question.id, &question.correct_option)
            .await
            .expect("answer accepted");
    }
    while !attempt.is_final_page().await {
        attempt.next_page().await.expect("page advances");
    }

    let outcome = attempt.submit().await.expect("submission accepted");
    match outcome {
        SubmissionOutcome::Recorded { result, trigger } => {
            assert_eq!(trigger, SubmitTrigger::Manual);
            assert_eq!(result.score, 80.0);
            assert!(result.passed);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(platform.stored_score(applicant), Some(80.0));

    let marker = FileCompletionCache::in_dir(laptop_dir.path())
        .expect("cache reopens")
        .get(applicant)
        .expect("cache readable")
        .expect("marker written");
    assert!(marker.confirmed);

    let again = laptop.open(applicant).await.expect("attempt opens");
    assert_eq!(
        again.state().await,
        AttemptState::Blocked {
            prior_score: Some(80.0)
        }
    );

    let phone_dir = tempfile::tempdir().expect("temp dir");
    let phone = platform.device(phone_dir.path(), 600);
    let elsewhere = phone.open(applicant).await.expect("attempt opens");
    assert_eq!(
        elsewhere.state().await,
        AttemptState::Blocked {
            prior_score: Some(80.0)
        }
    );
}

#[tokio::test]
async fn simultaneous_devices_store_exactly_one_score() {
    let platform = spawn_platform().await;
    let applicant = platform.register("race@example.com");
    let left_dir = tempfile::tempdir().expect("temp dir");
    let right_dir = tempfile::tempdir().expect("temp dir");
    let left = platform.device(left_dir.path(), 600);
    let right = platform.device(right_dir.path(), 600);

    let first = left.open(applicant).await.expect("attempt opens");
    let second = right.open(applicant).await.expect("attempt opens");
    for attempt in [&first, &second] {
        while !attempt.is_final_page().await {
            attempt.next_page().await.expect("page advances");
        }
    }

    let (a, b) = tokio::join!(first.submit(), second.submit());
    let outcomes = [a.expect("handled"), b.expect("handled")];

    let recorded = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, SubmissionOutcome::Recorded { .. }))
        .count();
    let blocked = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, SubmissionOutcome::Blocked { .. }))
        .count();
    assert_eq!((recorded, blocked), (1, 1));
    assert_eq!(platform.stored_score(applicant), Some(0.0));
}

#[tokio::test]
async fn countdown_expiry_submits_over_http() {
    let platform = spawn_platform().await;
    let applicant = platform.register("slow@example.com");
    let dir = tempfile::tempdir().expect("temp dir");
    let device = platform.device(dir.path(), 1);

    let attempt = device.open(applicant).await.expect("attempt opens");
    let question = &platform.bank.questions()[0];
    attempt
        .answer(question.id, &question.correct_option)
        .await
        .expect("answer accepted");

    let outcome = attempt.wait_for_completion().await;

    assert!(matches!(
        outcome,
        SubmissionOutcome::Recorded {
            trigger: SubmitTrigger::Timeout,
            ..
        }
    ));
    assert_eq!(platform.stored_score(applicant), Some(5.0));
}

#[tokio::test]
async fn unknown_applicant_cannot_open_an_attempt() {
    let platform = spawn_platform().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let device = platform.device(dir.path(), 600);

    let err = device
        .open(recruitment::workflows::applicants::ApplicantId(404))
        .await
        .err()
        .expect("open refused");

    assert!(matches!(err, GuardError::UnknownApplicant(_)));
}
