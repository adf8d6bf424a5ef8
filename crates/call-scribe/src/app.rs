//! Interactive command loop driving the recording session lifecycle.
//!
//! Reads line commands from stdin and dispatches to the session manager.
//! An interrupt signal is handled exactly like typing `stop` followed by
//! `quit`: the active session is flushed to disk before the process exits.
//! A further interrupt while transcription is running abandons the
//! transcript; the WAV file is already on disk by then.

use crate::{AppCommand, AppResult};

use std::{
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use call_scribe_core::{AudioError, FinishedSession, SessionManager, language};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, instrument, warn};

/// Longest transcript prefix echoed to the terminal after a session.
const PREVIEW_CHARS: usize = 300;

/// Main application state: one long-lived session manager, one stdin loop.
pub struct App {
    manager: SessionManager,
}

impl App {
    /// Wrap a session manager in the interactive loop.
    pub fn new(manager: SessionManager) -> Self {
        Self { manager }
    }

    /// Run the command loop until `quit`, stdin EOF, or an interrupt.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> AppResult<()> {
        info!("Call-scribe starting");
        print_banner(self.manager.language());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            prompt("Enter command: ")?;

            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        None => {
                            // stdin closed; treat like quit so nothing is lost.
                            println!();
                            self.shutdown().await?;
                            break;
                        }
                        Some(line) => {
                            if !self.dispatch(line.trim(), &mut lines).await? {
                                break;
                            }
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    println!("Interrupted.");
                    self.shutdown().await?;
                    break;
                }
            }
        }

        println!("Goodbye!");
        info!("Call-scribe shut down");

        Ok(())
    }

    /// Handle one command line. Returns `false` when the loop should exit.
    async fn dispatch(
        &mut self,
        line: &str,
        lines: &mut Lines<BufReader<Stdin>>,
    ) -> AppResult<bool> {
        if line.is_empty() {
            return Ok(true);
        }

        match AppCommand::parse(line) {
            Some(AppCommand::Start) => self.handle_start(),
            Some(AppCommand::Stop) => {
                if !self.stop_and_transcribe().await? {
                    return Ok(false);
                }
            }
            Some(AppCommand::Language) => {
                if !self.handle_language(lines).await? {
                    self.shutdown().await?;
                    return Ok(false);
                }
            }
            Some(AppCommand::Quit) => {
                self.shutdown().await?;
                return Ok(false);
            }
            None => {
                println!("Unknown command. Use: start, stop, language, or quit");
            }
        }

        Ok(true)
    }

    fn handle_start(&mut self) {
        match self.manager.start_recording() {
            Ok(paths) => {
                println!();
                println!("RECORDING IN PROGRESS");
                println!("Recording folder: {}", paths.folder.display());
                println!("Audio file:       {}", paths.audio_file.display());
                println!("Transcript file:  {}", paths.transcript_file.display());
                println!("Type 'stop' (or press Ctrl+C) to end the session.");
                println!();
            }
            Err(AudioError::AlreadyRecording { .. }) => {
                println!("Already recording! Type 'stop' to end the current session.");
            }
            Err(e) => {
                println!("Could not start recording: {}", e);
                println!("Session is idle; fix the microphone and try 'start' again.");
            }
        }
    }

    /// Stop the active session, write the WAV, then transcribe.
    ///
    /// Returns `false` when an interrupt arrived while the engine was
    /// running; the transcript is abandoned (the WAV is already saved) and
    /// the loop should exit. Every other outcome is reported to the user;
    /// only a model-load failure is returned as an error, which terminates
    /// the process (no transcription will ever succeed without a model).
    pub(crate) async fn stop_and_transcribe(&mut self) -> AppResult<bool> {
        let finished = match self.manager.stop_recording() {
            Ok(f) => f,
            Err(AudioError::NotRecording { .. }) => {
                println!("Nothing to stop: no recording in progress.");
                return Ok(true);
            }
            Err(AudioError::NoAudioCaptured { .. }) => {
                println!("No audio captured; nothing was saved. Session is idle.");
                return Ok(true);
            }
            Err(e) => {
                println!("Failed to stop recording: {}", e);
                println!("Session is idle.");
                return Ok(true);
            }
        };

        println!("Audio saved: {}", finished.paths.audio_file.display());
        println!(
            "Transcribing ({})... this may take a while.",
            language::display_name(self.manager.language())
        );

        // The engine is a long blocking call that cannot be cancelled once
        // started. A watcher task records any interrupt so the transcript
        // can be abandoned as soon as the engine returns, and the user gets
        // immediate feedback instead of a silently ignored Ctrl+C.
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flag.store(true, Ordering::SeqCst);
                println!();
                println!("Interrupt received; the transcript will be abandoned.");
            }
        });

        let result = tokio::task::block_in_place(|| self.manager.transcribe(&finished));
        watcher.abort();

        if interrupted.load(Ordering::SeqCst) {
            println!(
                "The recording is kept at {}; no transcript was written.",
                finished.paths.audio_file.display()
            );
            return Ok(false);
        }

        match result {
            Ok(text) => self.save_transcript(&finished, &text),
            Err(e) if is_fatal(&e) => {
                println!("Transcription is unavailable: {}", e);
                println!(
                    "The recording is kept at {}",
                    finished.paths.audio_file.display()
                );
                return Err(e.into());
            }
            Err(e) => {
                println!("Transcription failed: {}", e);
                println!(
                    "The recording is kept at {}; no transcript was written.",
                    finished.paths.audio_file.display()
                );
            }
        }

        Ok(true)
    }

    fn save_transcript(&mut self, finished: &FinishedSession, text: &str) {
        match self.manager.write_transcript(finished, text) {
            Ok(()) => {
                println!(
                    "Transcript saved: {}",
                    finished.paths.transcript_file.display()
                );
                print_preview(text);
            }
            Err(e) => {
                println!("Failed to save transcript: {}", e);
                println!(
                    "The recording is kept at {}.",
                    finished.paths.audio_file.display()
                );
            }
        }
    }

    /// Nested single-line prompt for a language code or `list`.
    ///
    /// Returns `false` when the prompt was interrupted; the caller shuts
    /// down exactly as if the interrupt had arrived at the main prompt.
    async fn handle_language(&mut self, lines: &mut Lines<BufReader<Stdin>>) -> AppResult<bool> {
        println!();
        println!(
            "Current language: {}",
            language::display_name(self.manager.language())
        );
        println!();
        println!("Common languages:");
        for (code, name) in language::COMMON_LANGUAGES {
            println!("  {} - {}", code, name);
        }
        println!();
        println!("Or type 'list' to see all available languages");
        prompt("Enter language code: ")?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Interrupted.");
                return Ok(false);
            }
        };

        let Some(line) = line else {
            return Ok(true);
        };
        let input = line.trim().to_lowercase();

        if input.is_empty() {
            return Ok(true);
        }

        if input == "list" {
            println!();
            println!("All available languages:");
            for (code, name) in language::LANGUAGES {
                println!("  {} - {}", code, name);
            }
            println!();
            return Ok(true);
        }

        match self.manager.set_language(&input) {
            Ok(()) => {
                println!("Language changed to: {}", language::display_name(&input));
            }
            Err(e) => {
                println!("{}", e);
                println!("Language unchanged. Type 'language' then 'list' to see valid codes.");
            }
        }

        Ok(true)
    }

    /// Implicit `stop` before exit so no audio is lost.
    pub(crate) async fn shutdown(&mut self) -> AppResult<()> {
        if !self.manager.is_recording() {
            return Ok(());
        }

        println!("Stopping active recording before exit...");
        match self.stop_and_transcribe().await {
            Ok(_) => Ok(()),
            Err(e) => {
                // Already exiting; the audio file is on disk, so just log it.
                warn!(error = ?e, "Transcription unavailable during shutdown");
                Ok(())
            }
        }
    }
}

fn is_fatal(e: &AudioError) -> bool {
    matches!(
        e,
        AudioError::ModelLoadFailed { .. } | AudioError::ModelNotFound { .. }
    )
}

fn print_banner(current_language: &str) {
    println!();
    println!("Call-Scribe: microphone recording with local transcription");
    println!("Language: {}", language::display_name(current_language));
    println!();
    println!("Commands:");
    println!("  'start'    - Begin recording");
    println!("  'stop'     - Stop recording and transcribe");
    println!("  'language' - Change transcription language");
    println!("  'quit'     - Exit program");
    println!();
}

fn print_preview(text: &str) {
    println!();
    println!("Transcript preview:");
    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        println!("{}...", preview);
    } else {
        println!("{}", preview);
    }
    println!();
}

fn prompt(text: &str) -> AppResult<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}
