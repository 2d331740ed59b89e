use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
struct DialogueSession {
    lines: Vec<String>,
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueStep {
    /// Now showing the line at this index.
    Showing(usize),
    Finished,
    /// `advance` was called with no dialogue open.
    Inactive,
}

/// Line-by-line message box. While a session is open the world routes all
/// input here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueEngine {
    session: Option<DialogueSession>,
}

impl DialogueEngine {
    pub fn is_talking(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_line(&self) -> Option<&str> {
        let session = self.session.as_ref()?;
        session.lines.get(session.index).map(String::as_str)
    }

    pub fn progress(&self) -> Option<(usize, usize)> {
        self.session
            .as_ref()
            .map(|session| (session.index, session.lines.len()))
    }

    /// Opens a session on `lines[0]`. Empty input is ignored.
    pub fn start_talk(&mut self, lines: &[String]) -> bool {
        if lines.is_empty() {
            return false;
        }
        self.session = Some(DialogueSession {
            lines: lines.to_vec(),
            index: 0,
        });
        info!(line_count = lines.len(), "dialogue_started");
        true
    }

    pub fn advance(&mut self) -> DialogueStep {
        let Some(session) = self.session.as_mut() else {
            return DialogueStep::Inactive;
        };
        session.index += 1;
        if session.index < session.lines.len() {
            return DialogueStep::Showing(session.index);
        }
        self.end_talk();
        DialogueStep::Finished
    }

    pub fn end_talk(&mut self) {
        if let Some(session) = self.session.take() {
            info!(line_count = session.lines.len(), "dialogue_finished");
        }
    }
}
