/// Commands accepted by the interactive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Begin a new recording session.
    Start,
    /// Stop the current session and transcribe it.
    Stop,
    /// Change the transcription language.
    Language,
    /// Exit the program, stopping any active session first.
    Quit,
}

impl AppCommand {
    /// Parse one input line. Unrecognized input yields `None`; the caller
    /// prints the help text and state is unchanged.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "language" | "lang" => Some(Self::Language),
            "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}
