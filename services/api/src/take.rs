use crate::infra::{format_clock, load_bank};
use clap::Args;
use recruitment::config::AppConfig;
use recruitment::error::AppError;
use recruitment::telemetry::{self, LogSink};
use recruitment::workflows::applicants::ApplicantId;
use recruitment::workflows::assessment::{
    AssessmentRunner, AssessmentSettings, Attempt, AttemptGuard, AttemptState, CompletionCache,
    FileCompletionCache, GuardError, HttpScoreAuthority, NavigationEvent, PageView,
    QuestionId, ScoreAuthority, SubmissionOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args, Debug)]
pub(crate) struct TakeArgs {
    /// Applicant identifier issued at registration
    pub(crate) applicant_id: u64,
    /// Base URL of the recruitment service
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    pub(crate) server: String,
    /// Directory holding the local completion markers
    #[arg(long, default_value = ".recruitment")]
    pub(crate) cache_dir: PathBuf,
}

/// A line typed during the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Answer { question: QuestionId, letter: char },
    Next,
    Previous,
    Submit,
    Time,
    Navigate(NavigationEvent),
    Help,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("n"), None, None) => Input::Next,
        (Some("p"), None, None) => Input::Previous,
        (Some("s"), None, None) => Input::Submit,
        (Some("t"), None, None) => Input::Time,
        (Some("back"), None, None) => Input::Navigate(NavigationEvent::Back),
        (Some("reload"), None, None) => Input::Navigate(NavigationEvent::Reload),
        (Some("h" | "?"), None, None) => Input::Help,
        (Some(number), Some(letter), None) => {
            let mut chars = letter.chars();
            match (number.parse::<u32>(), chars.next(), chars.next()) {
                (Ok(id), Some(letter), None) if letter.is_ascii_alphabetic() => Input::Answer {
                    question: QuestionId(id),
                    letter: letter.to_ascii_lowercase(),
                },
                _ => Input::Unknown(line.trim().to_string()),
            }
        }
        _ => Input::Unknown(line.trim().to_string()),
    }
}

fn option_letter(index: usize) -> char {
    (b'a' + (index % 26) as u8) as char
}

fn option_index(letter: char) -> usize {
    (letter as u8).saturating_sub(b'a') as usize
}

pub(crate) async fn run_take(args: TakeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_with_sink(&config.telemetry, LogSink::Stderr)?;

    let bank = load_bank(&config.assessment)?;
    let settings = AssessmentSettings::from(&config.assessment);
    let authority = Arc::new(HttpScoreAuthority::new(&args.server)?);
    let cache = Arc::new(FileCompletionCache::in_dir(&args.cache_dir)?);
    let guard = Arc::new(AttemptGuard::new(cache, authority));
    let runner = AssessmentRunner::new(guard, bank, settings);

    println!("Checking assessment eligibility...");
    let attempt = match runner.open(ApplicantId(args.applicant_id)).await {
        Ok(attempt) => attempt,
        Err(GuardError::EligibilityUnavailable(err)) => {
            println!("Could not confirm eligibility right now. Please try again later.");
            return Err(GuardError::EligibilityUnavailable(err).into());
        }
        Err(err) => {
            println!("{err}");
            return Err(err.into());
        }
    };

    if let AttemptState::Blocked { prior_score } = attempt.state().await {
        render_blocked(prior_score);
        return Ok(());
    }

    println!(
        "You have {} to answer {} questions. You may only take this assessment once.",
        format_clock(settings.duration),
        attempt.page_view().await.total_questions
    );
    print_help();
    render_page(&attempt.page_view().await, &attempt);

    let outcome = drive(&attempt).await;
    render_outcome(&outcome);
    Ok(())
}

async fn drive<C, A>(attempt: &Attempt<C, A>) -> SubmissionOutcome
where
    C: CompletionCache,
    A: ScoreAuthority,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        if !stdin_open {
            return attempt.wait_for_completion().await;
        }

        tokio::select! {
            outcome = attempt.wait_for_completion() => {
                if matches!(outcome, SubmissionOutcome::Recorded { .. } | SubmissionOutcome::PendingSync { .. }) {
                    println!("\nTime is up. Your answers were submitted automatically.");
                }
                return outcome;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(outcome) = handle_input(attempt, parse_input(&line)).await {
                        return outcome;
                    }
                }
                Ok(None) | Err(_) => {
                    println!("Input closed; the attempt ends when the timer runs out.");
                    stdin_open = false;
                }
            }
        }
    }
}

async fn handle_input<C, A>(attempt: &Attempt<C, A>, input: Input) -> Option<SubmissionOutcome>
where
    C: CompletionCache,
    A: ScoreAuthority,
{
    match input {
        Input::Answer { question, letter } => {
            let view = attempt.page_view().await;
            let Some(slot) = view.slots.iter().find(|slot| slot.question.id == question) else {
                println!("Question {question} is not on this page.");
                return None;
            };
            let Some(option) = slot.question.options.get(option_index(letter)) else {
                println!("Question {question} has no option ({letter}).");
                return None;
            };
            match attempt.answer(question, option).await {
                Ok(()) => render_page(&attempt.page_view().await, attempt),
                Err(err) => println!("{err}"),
            }
        }
        Input::Next => match attempt.next_page().await {
            Ok(view) => render_page(&view, attempt),
            Err(err) => println!("{err}"),
        },
        Input::Previous => match attempt.previous_page().await {
            Ok(view) => render_page(&view, attempt),
            Err(err) => println!("{err}"),
        },
        Input::Submit => match attempt.submit().await {
            Ok(outcome) => return Some(outcome),
            Err(err) => println!("{err}"),
        },
        Input::Time => {
            if let Some(remaining) = attempt.remaining() {
                println!("Time left: {}", format_clock(remaining));
            }
        }
        Input::Navigate(event) => {
            let decision = attempt.navigate(event).await;
            println!("Navigation {event:?} -> {decision:?}; finish the assessment first.");
        }
        Input::Help => print_help(),
        Input::Unknown(raw) => println!("Unrecognised input '{raw}'. Type h for help."),
    }
    None
}

fn print_help() {
    println!("Commands: '<question> <letter>' to answer, n next page, p previous page,");
    println!("          s submit (final page only), t time left, h help");
}

fn render_page<C, A>(view: &PageView, attempt: &Attempt<C, A>)
where
    C: CompletionCache,
    A: ScoreAuthority,
{
    let clock = attempt
        .remaining()
        .map(format_clock)
        .unwrap_or_else(|| "--:--".to_string());
    println!(
        "\nPage {}/{} | answered {}/{} | time left {}",
        view.number, view.total_pages, view.answered, view.total_questions, clock
    );
    for slot in &view.slots {
        println!("{}. {}", slot.question.id, slot.question.prompt);
        for (index, option) in slot.question.options.iter().enumerate() {
            let marker = if slot.selected.as_deref() == Some(option.as_str()) {
                "x"
            } else {
                " "
            };
            println!("   [{marker}] ({}) {option}", option_letter(index));
        }
    }
    if view.number == view.total_pages {
        println!("Final page: type s to submit.");
    }
}

fn render_blocked(prior_score: Option<f64>) {
    match prior_score {
        Some(score) => println!(
            "You have already taken this assessment (score {score:.1}%). Only one attempt is allowed."
        ),
        None => println!("You have already taken this assessment. Only one attempt is allowed."),
    }
}

fn render_outcome(outcome: &SubmissionOutcome) {
    match outcome {
        SubmissionOutcome::Recorded { result, .. } => {
            println!(
                "\nScore: {:.1}% ({} of {} correct). {}",
                result.score,
                result.correct,
                result.total,
                if result.passed { "Passed" } else { "Not passed" }
            );
        }
        SubmissionOutcome::PendingSync { result, reason, .. } => {
            println!(
                "\nScore: {:.1}% ({} of {} correct). {}",
                result.score,
                result.correct,
                result.total,
                if result.passed { "Passed" } else { "Not passed" }
            );
            println!("The score is saved on this device and will be sent on your next visit ({reason}).");
        }
        SubmissionOutcome::Blocked { prior_score } => render_blocked(*prior_score),
    }
}
