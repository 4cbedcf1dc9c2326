//! Console UI context: renders questionnaires, collects answers, plays the
//! notification bell. Runs as the single consumer of UI operations, so
//! every render and visibility toggle is serialized on this task.

use canvass_core::{AnswerSheet, Form, FormKind, FREQUENCY_CHOICES};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

/// Operation posted to the UI context.
#[derive(Debug)]
pub enum UiOp {
    RenderForm(Form),
    ShowAnswers(AnswerSheet),
    PlayNotification,
    SetConfigureVisibility(bool),
}

/// UI loop. Completed sheets go back through `submissions` for fan-out.
pub async fn run_ui(
    mut ops: mpsc::UnboundedReceiver<UiOp>,
    submissions: mpsc::UnboundedSender<AnswerSheet>,
    bell: bool,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(op) = ops.recv().await {
        match op {
            UiOp::RenderForm(form) => match fill_form(&form, &mut lines).await {
                Ok(sheet) => {
                    println!("submitting answers (score {})", sheet.score);
                    if submissions.send(sheet).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    log::warn!("no interactive input; dropping form: {e}");
                }
            },
            UiOp::ShowAnswers(sheet) => {
                println!("-- completed sheet (score {}) --", sheet.score);
                for (i, answer) in sheet.answers.iter().enumerate() {
                    println!("  {}: {answer}", i + 1);
                }
            }
            UiOp::PlayNotification => {
                if bell {
                    ring_bell();
                }
            }
            UiOp::SetConfigureVisibility(visible) => {
                if visible {
                    println!("(no peers in range; open the mesh settings to configure)");
                } else {
                    println!("(peers in range; configuration hidden)");
                }
            }
        }
    }
}

fn ring_bell() {
    use std::io::Write;
    print!("\x07");
    let _ = std::io::stdout().flush();
}

/// Walk the form: profile prompts first, then the screening questions on
/// the four-point scale. Returns the completed sheet.
async fn fill_form<R>(form: &Form, lines: &mut Lines<R>) -> std::io::Result<AnswerSheet>
where
    R: AsyncBufRead + Unpin,
{
    let mut answers = Vec::with_capacity(form.items.len());
    for item in &form.items {
        println!("{}", item.prompt());
        answers.push(read_line(lines).await?);
    }
    let mut selections = Vec::new();
    if let Some(id) = form.form_id {
        match FormKind::from_id(id) {
            Some(kind) => {
                println!("{}", kind.preamble());
                for question in kind.questions() {
                    println!("{question}");
                    for (i, choice) in FREQUENCY_CHOICES.iter().enumerate() {
                        println!("  {i}) {choice}");
                    }
                    selections.push(read_selection(lines).await?);
                }
            }
            None => log::warn!("unknown form id {id}; skipping scale section"),
        }
    }
    Ok(AnswerSheet::new(answers, &selections))
}

async fn read_line<R>(lines: &mut Lines<R>) -> std::io::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    match lines.next_line().await? {
        Some(line) => Ok(line.trim().to_string()),
        None => Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "input closed",
        )),
    }
}

/// Read a 0-based scale selection; re-prompt until it parses and is in
/// range.
async fn read_selection<R>(lines: &mut Lines<R>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line = read_line(lines).await?;
        match line.parse::<usize>() {
            Ok(n) if n < FREQUENCY_CHOICES.len() => return Ok(n),
            _ => println!(
                "enter a number between 0 and {}",
                FREQUENCY_CHOICES.len() - 1
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_core::decode_form;

    #[tokio::test]
    async fn fill_form_collects_answers_and_score() {
        let form = decode_form(b"?*+-,1").unwrap();
        let input = b"Alice\n30\nF\n123\n0\n1\n2\n3\n0\n1\n2\n3\n0\n";
        let mut lines = BufReader::new(&input[..]).lines();

        let sheet = fill_form(&form, &mut lines).await.unwrap();
        assert_eq!(sheet.answers, vec!["Alice", "30", "F", "123"]);
        assert_eq!(sheet.score, 12);
    }

    #[tokio::test]
    async fn fill_form_without_form_id_has_no_scale() {
        let form = decode_form(b"?+").unwrap();
        let input = b"Bob\nM\n";
        let mut lines = BufReader::new(&input[..]).lines();

        let sheet = fill_form(&form, &mut lines).await.unwrap();
        assert_eq!(sheet.answers, vec!["Bob", "M"]);
        assert_eq!(sheet.score, 0);
    }

    #[tokio::test]
    async fn unknown_form_id_skips_scale() {
        let form = decode_form(b"?,42").unwrap();
        let input = b"Carol\n";
        let mut lines = BufReader::new(&input[..]).lines();

        let sheet = fill_form(&form, &mut lines).await.unwrap();
        assert_eq!(sheet.answers, vec!["Carol"]);
        assert_eq!(sheet.score, 0);
    }

    #[tokio::test]
    async fn selection_reprompts_until_valid() {
        let mut lines = BufReader::new(&b"9\nabc\n3\n"[..]).lines();
        assert_eq!(read_selection(&mut lines).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn closed_input_is_an_error() {
        let form = decode_form(b"?").unwrap();
        let mut lines = BufReader::new(&b""[..]).lines();
        assert!(fill_form(&form, &mut lines).await.is_err());
    }
}
