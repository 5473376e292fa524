//! Interactive exam loop on stdin/stdout.

use std::io::Write as _;

use anyhow::bail;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use exam_core::model::{ExamId, ExamineeId, FinalResult, Question};
use exam_core::{BASE_QUESTION_COUNT, Decision};
use services::{
    ControllerState, ExamError, ExamServices, NextStep, SessionController, SessionProgress,
};
use storage::repository::SessionRecord;

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Reads one trimmed line; `None` once stdin is closed.
    async fn ask(&mut self, text: &str) -> anyhow::Result<Option<String>> {
        print!("{text}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }

    async fn confirm(&mut self, text: &str) -> anyhow::Result<bool> {
        let answer = self.ask(&format!("{text} [y/N] ")).await?;
        Ok(matches!(answer.as_deref(), Some("y" | "Y" | "yes")))
    }
}

/// Progress line printed above every question.
fn question_heading(progress: &SessionProgress) -> String {
    if progress.base_remaining > 0 {
        format!("Question {} of {BASE_QUESTION_COUNT}", progress.answered + 1)
    } else {
        format!("Extra question {}", progress.extra_answered + 1)
    }
}

fn show_question(controller: &SessionController, question: &Question) {
    if let Some(progress) = controller.progress() {
        println!("\n{}", question_heading(&progress));
    }
    println!("  {}", question.text);
}

fn show_current_question(controller: &SessionController) {
    if let Some(question) = controller.current_question() {
        show_question(controller, question);
    }
}

fn show_result(result: &FinalResult) {
    println!(
        "\nFinal score {} of {BASE_QUESTION_COUNT}: {} ({})",
        result.score,
        result.grade,
        result.grade.value()
    );
    if result.went_to_extra() {
        println!(
            "Base total {} was settled after {} extra question(s).",
            result.base_score,
            result.questions_answered - BASE_QUESTION_COUNT
        );
    }
}

/// Runs one exam sitting until the result is saved or the examiner gives up.
pub async fn run(
    services: &ExamServices,
    examinee_id: ExamineeId,
    exam_id: ExamId,
) -> anyhow::Result<()> {
    let mut controller = services.controller();
    let mut prompt = Prompt::new();

    loop {
        match controller.start(examinee_id, exam_id).await {
            Ok(_) => break,
            Err(e @ ExamError::QuestionFetch(_)) => {
                eprintln!("{e}");
                break;
            }
            Err(e @ ExamError::SessionCreate(_)) => {
                eprintln!("{e}");
                if !prompt.confirm("Retry?").await? {
                    return Err(e.into());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    println!("Exam {exam_id} for student {examinee_id} started.");
    show_current_question(&controller);

    loop {
        match controller.state() {
            ControllerState::Finalized => return Ok(()),
            ControllerState::NotStarted => bail!("session was not started"),
            ControllerState::AwaitingSave => {
                if !prompt.confirm("Final result was not saved. Retry?").await? {
                    bail!("final result was not saved");
                }
                match controller.finalize().await {
                    Ok(result) => show_result(&result),
                    Err(e) => eprintln!("{e}"),
                }
            }
            ControllerState::InProgress(_) if controller.current_question().is_none() => {
                if !prompt.confirm("No question loaded. Fetch again?").await? {
                    bail!("exam abandoned without a question");
                }
                match controller.fetch_question().await {
                    Ok(_) => show_current_question(&controller),
                    Err(e) => eprintln!("{e}"),
                }
            }
            ControllerState::InProgress(_) => {
                let Some(input) = prompt.ask("score [0 / 0.5 / 1, a = answer, q = quit]: ").await?
                else {
                    bail!("input closed; exam abandoned");
                };
                match input.as_str() {
                    "a" => {
                        if let Some(q) = controller.current_question() {
                            println!("  answer: {}", q.answer);
                        }
                        continue;
                    }
                    "q" => bail!("exam abandoned by examiner"),
                    _ => {}
                }
                let Ok(raw) = input.parse::<f64>() else {
                    println!("Enter 0, 0.5 or 1.");
                    continue;
                };
                submit(&mut controller, raw).await?;
            }
        }
    }
}

async fn submit(controller: &mut SessionController, raw: f64) -> anyhow::Result<()> {
    match controller.submit_raw(raw).await {
        Ok(outcome) => {
            if !outcome.entry.persisted {
                println!("(answer recorded, not confirmed saved)");
            }
            if let Decision::EnterExtra { base_score } = outcome.decision {
                println!("Base total {base_score}: extra questions decide the grade.");
            }
            match outcome.next {
                NextStep::Question(question) => show_question(controller, &question),
                NextStep::Finished(result) => show_result(&result),
            }
            Ok(())
        }
        Err(ExamError::InvalidScore(e)) => {
            println!("{e}");
            Ok(())
        }
        Err(e @ ExamError::Finalize { .. }) => {
            if let Some(result) = e.unsaved_result() {
                show_result(result);
            }
            eprintln!("{e}");
            Ok(())
        }
        Err(e @ ExamError::QuestionFetch(_)) => {
            eprintln!("{e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints a stored session, answer by answer.
pub fn print_record(record: &SessionRecord) {
    println!(
        "Session {} (student {}, exam {})",
        record.id, record.examinee_id, record.exam_id
    );
    for (i, answer) in record.answers.iter().enumerate() {
        let text = answer.question.as_deref().unwrap_or("<question removed>");
        println!("{:>3}. [{}] {}", i + 1, answer.value, text);
        if let Some(correct) = &answer.correct_answer {
            println!("       {correct}");
        }
    }
    match &record.result {
        Some(result) => println!(
            "Score {}: {} ({})",
            result.score,
            result.grade,
            result.grade.value()
        ),
        None => println!("Not finalized."),
    }
}
