use crate::infra::{format_clock, load_bank};
use clap::Args;
use recruitment::config::AssessmentConfig;
use recruitment::error::AppError;
use recruitment::workflows::applicants::{
    ApplicantId, ApplicantRegistration, ApplicantRepository, ApplicantService,
    InMemoryApplicantRepository,
};
use recruitment::workflows::assessment::{
    AssessmentRunner, AssessmentSettings, Attempt, AttemptGuard, AttemptState,
    InMemoryCompletionCache, QuestionBank, RepositoryScoreAuthority, ScoringPolicy,
    SubmissionOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

type DemoAuthority = RepositoryScoreAuthority<InMemoryApplicantRepository>;
type DemoRunner = AssessmentRunner<InMemoryCompletionCache, DemoAuthority>;
type DemoAttempt = Attempt<InMemoryCompletionCache, DemoAuthority>;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Countdown used for the timed-out attempt in the walkthrough
    #[arg(long, default_value_t = 3)]
    pub(crate) timer_secs: u64,
    /// Number of questions answered correctly by the first applicant
    #[arg(long, default_value_t = 15)]
    pub(crate) correct: usize,
    /// Skip the two-device race portion of the demo.
    #[arg(long)]
    pub(crate) skip_race: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct BankReportArgs {
    /// Question bank JSON file (defaults to the configured or built-in bank)
    #[arg(long)]
    pub(crate) path: Option<PathBuf>,
    /// Questions per page used for the layout summary
    #[arg(long)]
    pub(crate) per_page: Option<usize>,
}

pub(crate) fn run_bank_report(args: BankReportArgs) -> Result<(), AppError> {
    let defaults = AssessmentConfig::default();
    let config = AssessmentConfig {
        question_bank: args.path,
        questions_per_page: args.per_page.unwrap_or(defaults.questions_per_page),
        ..defaults
    };
    let bank = load_bank(&config)?;

    println!("Question bank {}", bank.version());
    println!(
        "- {} questions | {} per page | {} pages",
        bank.len(),
        config.questions_per_page,
        bank.page_count(config.questions_per_page)
    );
    println!(
        "- pass mark {:.0}% ({} correct answers needed)",
        config.pass_threshold,
        answers_needed(bank.len(), config.pass_threshold)
    );
    for question in bank.questions() {
        println!("  {}. {} ({} options)", question.id, question.prompt, question.options.len());
    }
    Ok(())
}

/// Smallest number of correct answers whose score reaches `threshold`.
fn answers_needed(total: usize, threshold: f64) -> usize {
    (0..=total)
        .find(|correct| 100.0 * (*correct as f64) / (total as f64) >= threshold)
        .unwrap_or(total)
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        timer_secs,
        correct,
        skip_race,
    } = args;

    let bank = Arc::new(QuestionBank::builtin()?);
    let repository = Arc::new(InMemoryApplicantRepository::new());
    let applicants = ApplicantService::new(repository.clone());
    let authority = Arc::new(RepositoryScoreAuthority::new(repository.clone()));
    let settings = AssessmentSettings {
        policy: ScoringPolicy::default(),
        duration: Duration::from_secs(timer_secs.max(1)),
        questions_per_page: 2,
    };
    let device = |cache: Arc<InMemoryCompletionCache>| -> DemoRunner {
        let guard = Arc::new(AttemptGuard::new(cache, authority.clone()));
        AssessmentRunner::new(guard, bank.clone(), settings)
    };

    println!("Assessment attempt guard demo");
    println!(
        "- {} questions, pass mark {:.0}%, countdown {}",
        bank.len(),
        settings.policy.pass_threshold,
        format_clock(settings.duration)
    );

    let first = register_demo_applicant(&applicants, "Ada", "ada.demo@example.com")?;

    println!("\n1. Manual submission from the final page");
    let laptop = device(Arc::new(InMemoryCompletionCache::new()));
    let attempt = laptop.open(first).await?;
    answer_correctly(&attempt, &bank, correct).await;
    finish_pages(&attempt).await;
    match attempt.submit().await {
        Ok(outcome) => describe("   ", &outcome),
        Err(err) => println!("   Submission refused: {}", err),
    }

    println!("\n2. Returning to the assessment on the same device");
    let reopened = laptop.open(first).await?;
    describe_state("   ", reopened.state().await);

    println!("\n3. Returning from a fresh device with no local marker");
    let tablet = device(Arc::new(InMemoryCompletionCache::new()));
    let fresh = tablet.open(first).await?;
    describe_state("   ", fresh.state().await);

    println!("\n4. Timer expiry submits whatever was answered");
    let second = register_demo_applicant(&applicants, "Bayo", "bayo.demo@example.com")?;
    let timed = laptop.open(second).await?;
    answer_correctly(&timed, &bank, 4).await;
    println!("   Answered 4 questions, waiting {} for the countdown...", format_clock(settings.duration));
    describe("   ", &timed.wait_for_completion().await);

    if !skip_race {
        println!("\n5. Two devices submitting at the same moment");
        let third = register_demo_applicant(&applicants, "Chioma", "chioma.demo@example.com")?;
        let phone = device(Arc::new(InMemoryCompletionCache::new()));
        let desktop = device(Arc::new(InMemoryCompletionCache::new()));
        let on_phone = phone.open(third).await?;
        let on_desktop = desktop.open(third).await?;
        answer_correctly(&on_phone, &bank, bank.len()).await;
        finish_pages(&on_phone).await;
        finish_pages(&on_desktop).await;

        let (left, right) = tokio::join!(on_phone.submit(), on_desktop.submit());
        for (label, result) in [("phone", left), ("desktop", right)] {
            match result {
                Ok(outcome) => describe(&format!("   {label}: "), &outcome),
                Err(err) => println!("   {label}: submission refused: {}", err),
            }
        }
        report_stored(&repository, third);
    }

    println!("\nStored scores");
    report_stored(&repository, first);
    report_stored(&repository, second);
    Ok(())
}

fn register_demo_applicant(
    applicants: &ApplicantService<InMemoryApplicantRepository>,
    first_name: &str,
    email: &str,
) -> Result<ApplicantId, AppError> {
    let applicant = applicants.register(ApplicantRegistration {
        first_name: first_name.to_string(),
        last_name: "Demo".to_string(),
        email: email.to_string(),
        phone: None,
        job_id: Some(1),
    })?;
    Ok(applicant.id)
}

async fn answer_correctly(attempt: &DemoAttempt, bank: &QuestionBank, count: usize) {
    for question in bank.questions().iter().take(count) {
        if let Err(err) = attempt.answer(question.id, &question.correct_option).await {
            println!("   Answer rejected: {}", err);
        }
    }
}

async fn finish_pages(attempt: &DemoAttempt) {
    while !attempt.is_final_page().await {
        if attempt.next_page().await.is_err() {
            break;
        }
    }
}

fn describe(prefix: &str, outcome: &SubmissionOutcome) {
    match outcome {
        SubmissionOutcome::Recorded { result, trigger } => println!(
            "{prefix}recorded ({trigger:?}): {:.1}% with {}/{} correct, {}",
            result.score,
            result.correct,
            result.total,
            if result.passed { "passed" } else { "not passed" }
        ),
        SubmissionOutcome::PendingSync { result, reason, .. } => println!(
            "{prefix}graded {:.1}% but not yet stored: {reason}",
            result.score
        ),
        SubmissionOutcome::Blocked { prior_score } => match prior_score {
            Some(score) => println!("{prefix}blocked, existing score {score:.1}%"),
            None => println!("{prefix}blocked, already taken"),
        },
    }
}

fn describe_state(prefix: &str, state: AttemptState) {
    match state {
        AttemptState::Blocked {
            prior_score: Some(score),
        } => println!("{prefix}blocked before any question is shown (score {score:.1}%)"),
        AttemptState::Blocked { prior_score: None } => {
            println!("{prefix}blocked before any question is shown")
        }
        other => println!("{prefix}unexpected state: {}", other.label()),
    }
}

fn report_stored(repository: &InMemoryApplicantRepository, applicant_id: ApplicantId) {
    match repository.fetch(applicant_id) {
        Ok(Some(applicant)) => match applicant.assessment {
            Some(record) => println!(
                "- applicant {}: {:.1}% ({}) stage {}",
                applicant_id,
                record.score,
                if record.passed { "passed" } else { "not passed" },
                applicant.stage.label()
            ),
            None => println!("- applicant {}: no score stored", applicant_id),
        },
        Ok(None) => println!("- applicant {}: not found", applicant_id),
        Err(err) => println!("- applicant {}: repository unavailable ({})", applicant_id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_mark_needs_fourteen_of_twenty() {
        assert_eq!(answers_needed(20, 70.0), 14);
        assert_eq!(answers_needed(20, 0.0), 0);
        assert_eq!(answers_needed(3, 100.0), 3);
    }

    #[tokio::test]
    async fn demo_runs_to_completion() {
        let args = DemoArgs {
            timer_secs: 1,
            correct: 20,
            skip_race: false,
        };
        run_demo(args).await.expect("demo completes");
    }

    #[test]
    fn rejected_registration_is_returned_as_an_error() {
        let applicants = ApplicantService::new(Arc::new(InMemoryApplicantRepository::new()));
        register_demo_applicant(&applicants, "Ada", "ada.demo@example.com")
            .expect("first registration");

        let err = register_demo_applicant(&applicants, "Ada", "ada.demo@example.com")
            .expect_err("duplicate email");
        assert!(matches!(err, AppError::Applicant(_)));
    }
}
