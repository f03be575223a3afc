use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Rendering and prompting surface. The aggregators only ever see this trait,
/// so every flow behaves identically under the rich and plain consoles.
#[async_trait]
pub trait Console: Send + Sync {
    fn line(&self, text: &str);
    fn heading(&self, text: &str);
    fn status(&self, text: &str);
    fn notice(&self, text: &str);
    fn alert(&self, text: &str);

    fn progress(&self, total: u64, label: &str) -> Progress;

    /// Prints `question: ` and reads one trimmed line. EOF on stdin is an error.
    async fn prompt(&self, question: &str) -> io::Result<String>;

    async fn confirm(&self, question: &str) -> io::Result<bool> {
        loop {
            let answer = self.prompt(&format!("{} (y/n)", question)).await?;
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.alert("Please answer y or n."),
            }
        }
    }
}

/// Picks the console implementation once at startup.
pub fn build_console(force_plain: bool) -> Box<dyn Console> {
    if force_plain || !io::stdout().is_terminal() {
        Box::new(PlainConsole::new())
    } else {
        Box::new(RichConsole::new())
    }
}

// One buffered stdin reader per console, shared across prompts so type-ahead
// answers are not lost between questions.
struct LineReader {
    input: Mutex<BufReader<Stdin>>,
}

impl LineReader {
    fn new() -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    async fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for input",
            ));
        }
        Ok(line.trim().to_string())
    }
}

pub struct RichConsole {
    reader: LineReader,
}

impl RichConsole {
    pub fn new() -> Self {
        Self {
            reader: LineReader::new(),
        }
    }
}

#[async_trait]
impl Console for RichConsole {
    fn line(&self, text: &str) {
        println!("{}", text);
    }

    fn heading(&self, text: &str) {
        println!("{}", text.cyan().bold());
    }

    fn status(&self, text: &str) {
        println!("{}", text.green());
    }

    fn notice(&self, text: &str) {
        println!("{}", text.yellow());
    }

    fn alert(&self, text: &str) {
        println!("{}", text.red());
    }

    fn progress(&self, total: u64, label: &str) -> Progress {
        let pb = ProgressBar::new(total);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"));
        pb.set_message(label.to_string());
        Progress::Bar(pb)
    }

    async fn prompt(&self, question: &str) -> io::Result<String> {
        print!("{}: ", question);
        io::stdout().flush()?;
        self.reader.read_line().await
    }
}

pub struct PlainConsole {
    reader: LineReader,
}

impl PlainConsole {
    pub fn new() -> Self {
        Self {
            reader: LineReader::new(),
        }
    }
}

#[async_trait]
impl Console for PlainConsole {
    fn line(&self, text: &str) {
        println!("{}", text);
    }

    fn heading(&self, text: &str) {
        println!("{}", text);
    }

    fn status(&self, text: &str) {
        println!("{}", text);
    }

    fn notice(&self, text: &str) {
        println!("{}", text);
    }

    fn alert(&self, text: &str) {
        println!("{}", text);
    }

    fn progress(&self, total: u64, label: &str) -> Progress {
        Progress::Text {
            label: label.to_string(),
            total,
            done: AtomicU64::new(0),
        }
    }

    async fn prompt(&self, question: &str) -> io::Result<String> {
        print!("{}: ", question);
        io::stdout().flush()?;
        self.reader.read_line().await
    }
}

/// Handle to an in-flight progress display: an indicatif bar under the rich
/// console, an in-place text meter under the plain one.
pub enum Progress {
    Bar(ProgressBar),
    Text {
        label: String,
        total: u64,
        done: AtomicU64,
    },
}

impl Progress {
    pub fn tick(&self) {
        match self {
            Progress::Bar(pb) => pb.inc(1),
            Progress::Text { label, total, done } => {
                let done = done.fetch_add(1, Ordering::Relaxed) + 1;
                let percent = if *total == 0 {
                    100.0
                } else {
                    done as f64 / *total as f64 * 100.0
                };
                print!("\r{} [{}/{}] {:.0}%", label, done, total, percent);
                let _ = io::stdout().flush();
            }
        }
    }

    // The bar already renders its own completion state; the text meter needs a
    // newline to get off the meter line, so only it prints the note.
    pub fn finish(&self, note: &str) {
        match self {
            Progress::Bar(pb) => pb.finish(),
            Progress::Text { .. } => println!("\n{}", note),
        }
    }
}
