//! A line-based console front-end.

use std::io::{self, BufRead, Stdout, StdinLock, Write};
use std::time::Duration;

use duelnet_protocol::GameId;
use duelnet_transport::TcpClient;

use crate::{AfterPeer, CommandError, ErrorState, Intent, State, UserInteraction};

const PROMPT: &str = "Connection to the central server established successfully.\n\
    Type \"new game\" to create a new game or \"join game <game_id>\" to join an existing game.\n\
    >>> ";

const NEW_GAME: &str = "new game";
const JOIN_GAME: &str = "join game ";

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NewGame,
    JoinGame(GameId),
    Exit,
}

/// Parses one line of input. Surrounding whitespace and case of the
/// keywords are ignored.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let lower = line.to_ascii_lowercase();
    if line.is_empty() {
        Err(CommandError::Empty)
    } else if lower == NEW_GAME {
        Ok(Command::NewGame)
    } else if lower.starts_with(JOIN_GAME) {
        let id = line[JOIN_GAME.len()..].parse::<GameId>()?;
        Ok(Command::JoinGame(id))
    } else if lower == "exit" || lower == "quit" {
        Ok(Command::Exit)
    } else {
        Err(CommandError::Unknown(line.to_string()))
    }
}

/// [`UserInteraction`] over a reader and a writer, normally stdin/stdout.
///
/// Unparseable input is reported and the prompt repeated. End of input
/// counts as "quit". Write errors on the output are ignored: there is
/// nobody left to tell.
#[derive(Debug)]
pub struct ConsoleUser<R, W> {
    input: R,
    output: W,
}

impl ConsoleUser<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleUser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Gives the writer back, e.g. to inspect what a test printed.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Reads one line; `None` on end of input or a read error.
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(err) => {
                tracing::warn!(%err, "failed to read console input");
                None
            }
        }
    }

    fn say(&mut self, text: &str) {
        let _ = self.output.write_all(text.as_bytes());
        let _ = self.output.flush();
    }
}

impl<R: BufRead, W: Write> UserInteraction for ConsoleUser<R, W> {
    fn choose_intent(&mut self) -> Intent {
        loop {
            self.say(PROMPT);
            let Some(line) = self.read_line() else {
                return Intent::Quit;
            };
            match parse_command(&line) {
                Ok(Command::NewGame) => return Intent::CreateNewGame,
                Ok(Command::JoinGame(id)) => return Intent::JoinGame(id),
                Ok(Command::Exit) => return Intent::Quit,
                Err(CommandError::Empty) => {}
                Err(err) => self.say(&format!("{err}\n")),
            }
        }
    }

    fn game_created(&mut self, game_id: GameId, wait: Duration) {
        self.say(&format!(
            "Successfully created new game with id {game_id}.\n\
             Tell this game id to the other player and ask them to make a \
             \"join game\" request with this game id.\n\
             Waiting for the other player to join the game for {} seconds...\n",
            wait.as_secs()
        ));
    }

    fn peer_connected(&mut self, link: &mut TcpClient) -> AfterPeer {
        let peer = link
            .peer_addr()
            .map_or_else(|_| "the other player".to_string(), |addr| addr.to_string());
        self.say(&format!(
            "Connected directly to {peer}.\n\
             Type \"again\" to go back to the central server, anything else to exit.\n>>> "
        ));
        match self.read_line() {
            Some(line) if line.trim().eq_ignore_ascii_case("again") => AfterPeer::PlayAgain,
            _ => AfterPeer::Exit,
        }
    }

    fn report_failure(&mut self, state: &State, error: &ErrorState) {
        let mut text = format!("{state}: {}\n", error.description);
        if let Some(hint) = &error.hint {
            text.push_str(&format!("Hint: {hint}\n"));
        }
        self.say(&text);
    }
}
