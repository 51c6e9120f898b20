//! rerun-style console front-end.
//!
//! every line you type is one turn; the whole history is reprinted after each.
//! - `/mode <Auto|Swahili-only|English-only>` switches the language mode
//! - `/clear` resets the chat
//! - `/quit` exits
//!
//! needs `GROQ_API_KEY` (a `.env` file is honored). `DUALBOT_MODEL` and
//! `DUALBOT_ENDPOINT` override the model and endpoint.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use dualbot::transcript::is_blank;
use dualbot::{Config, Engine, LanguageMode, Transcript};
use tracing_subscriber::EnvFilter;

fn print_transcript(transcript: &Transcript) {
    println!("---- history ({} turns) ----", transcript.len());
    for turn in transcript {
        println!("you: {}", turn.user);
        println!("bot: {}", turn.assistant_text());
    }
    println!("----------------------------");
}

/// `/mode` or `/mode <label>`; anything else (e.g. `/modern art`) is a message.
fn mode_command(line: &str) -> Option<&str> {
    if line.trim_end() == "/mode" {
        return Some("");
    }
    line.strip_prefix("/mode ")
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(target: "console", "starting with {:?}", config);

    let engine = Engine::from_config(config);
    let mut transcript = Transcript::new();
    let mut mode = LanguageMode::default();

    println!("Teknolojia - your bilingual AI assistant (English & Kiswahili)");
    println!("mode: {mode}. commands: /mode <label>, /clear, /quit");

    let stdin = io::stdin();
    loop {
        print!("[{mode}] > ");
        io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                eprintln!("stdin error: {err}");
                break;
            }
        }
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(label) = mode_command(line) {
            match label.parse::<LanguageMode>() {
                Ok(m) => {
                    mode = m;
                    println!("mode set to {mode}");
                }
                Err(err) => println!("{err}"),
            }
            continue;
        }
        match line.trim() {
            "/quit" => break,
            "/clear" => {
                transcript.clear();
                println!("chat cleared");
                continue;
            }
            _ => {}
        }
        if is_blank(line) {
            continue;
        }

        engine.respond(line, &mut transcript, mode).await;
        print_transcript(&transcript);
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_command_needs_a_word_boundary() {
        assert_eq!(mode_command("/mode Swahili-only"), Some("Swahili-only"));
        assert_eq!(mode_command("/mode"), Some(""));
        assert_eq!(mode_command("/modern art is confusing"), None);
        assert_eq!(mode_command("tell me about /mode"), None);
    }
}
