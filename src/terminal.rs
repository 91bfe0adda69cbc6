// src/terminal.rs
//! Line-oriented front end: commands on stdin, frames on stdout.

use chrono::Local;
use std::{fmt, io::Write};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};
use tracing::{debug, warn};

use crate::{
    app::{Notice, PresentationSink, UiEvent},
    catalog::SongRecord,
    requests::RequestRecord,
    submit::RequestForm,
};

pub const HELP: &str = "\
commands:
  search <text>   filter songs by title or artist
  genre [<name>]  restrict to one genre (no name clears it)
  pick <id>       copy a song's title into the request form
  title <text>    set the requested song title
  name <text>     set your name
  submit          send the request
  help            show this text
  quit            leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(UiEvent),
    Help,
    Quit,
    Empty,
}

/// Parse one input line. The argument is everything after the first space,
/// kept verbatim.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    let (word, arg) = line.split_once(' ').unwrap_or((line, ""));

    let event = match word {
        "" => return Ok(Command::Empty),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "q" | "exit" => return Ok(Command::Quit),
        "search" | "s" => UiEvent::SearchInput(arg.to_string()),
        "genre" | "g" => UiEvent::GenreSelected(arg.to_string()),
        "title" | "t" => UiEvent::TitleEdited(arg.to_string()),
        "name" | "n" => UiEvent::NameEdited(arg.to_string()),
        "submit" => UiEvent::FormSubmitted,
        "pick" | "p" => {
            let id = arg
                .trim()
                .parse()
                .map_err(|_| format!("`{}` is not a song number", arg.trim()))?;
            UiEvent::CatalogRowClicked(id)
        }
        other => return Err(format!("unknown command `{other}`, try `help`")),
    };
    Ok(Command::Event(event))
}

/// Read commands from `input` and forward them until `quit`, end of input,
/// or the app going away.
pub async fn forward_commands<R>(input: R, events: mpsc::Sender<UiEvent>) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Event(event)) => {
                if events.send(event).await.is_err() {
                    debug!("app gone, stop reading input");
                    break;
                }
            }
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Quit) => break,
            Ok(Command::Empty) => {}
            Err(hint) => println!("{hint}"),
        }
    }
    Ok(())
}

/// Prints every frame to `out`.
pub struct TerminalSink<W: Write> {
    out: W,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.flush()) {
            warn!(error = %e, "terminal write failed");
        }
    }
}

fn request_time(request: &RequestRecord) -> String {
    match request.parsed_timestamp() {
        Some(ts) => ts.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => request.timestamp.clone(),
    }
}

impl<W: Write> PresentationSink for TerminalSink<W> {
    fn populate_genres(&mut self, genres: &[String]) {
        if genres.is_empty() {
            return;
        }
        self.emit(format_args!("genres: {}\n", genres.join(", ")));
    }

    fn render_results(&mut self, songs: &[&SongRecord]) {
        if songs.is_empty() {
            self.emit(format_args!("No songs found matching your search.\n"));
            return;
        }
        let mut frame = String::new();
        for song in songs {
            frame.push_str(&format!("[{:>3}] {} - {}\n", song.id, song.title, song.artist));
        }
        self.emit(format_args!("{frame}"));
    }

    fn render_requests(&mut self, pending: &[&RequestRecord], total: usize) {
        if total == 0 {
            self.emit(format_args!(
                "No requests yet. Be the first to request a song!\n"
            ));
            return;
        }
        let mut frame = String::from("pending requests:\n");
        for request in pending {
            frame.push_str(&format!(
                "  {}  (requested by: {}, {})\n",
                request.song_title,
                request.requested_by,
                request_time(request)
            ));
        }
        self.emit(format_args!("{frame}"));
    }

    fn render_form(&mut self, form: &RequestForm) {
        self.emit(format_args!(
            "request form: title={:?} name={:?}\n",
            form.song_title, form.requester_name
        ));
    }

    fn notify(&mut self, notice: Notice) {
        self.emit(format_args!("* {}\n", notice.message()));
    }
}
