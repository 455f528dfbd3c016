//! Interactive commands
//!
//! One command per input line. Parsing is separate from execution so the
//! grammar can be tested without a running coordinator.

use crate::error::{CliError, Result};
use beat_catalog::CatalogCache;
use beat_core::{format_time, Song, SongId};
use beat_playback::{CoordinatorHandle, PlaybackSnapshot};
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

pub const HELP: &str = "\
commands:
  play <id>          load and play a song
  toggle | p         play/pause (starts the first song when idle)
  next | n           next song in play order
  prev | b           previous song in play order
  seek <pos>         jump to a position (ms or m:ss)
  scrub <pos>        drag the slider to a position and release
  shuffle [on|off]   toggle or set shuffle
  repeat [on|off]    toggle or set repeat-one
  volume <0-100>     set volume
  mute | unmute      mute control
  songs              list the catalog
  search <query>     find songs by title or artist
  status             show the playback snapshot
  refresh            reload the catalog
  help               this text
  quit               exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(SongId),
    Toggle,
    Next,
    Previous,
    Seek(i64),
    Scrub(i64),
    Shuffle(Option<bool>),
    Repeat(Option<bool>),
    Volume(u8),
    Mute,
    Unmute,
    Songs,
    Search(String),
    Status,
    Refresh,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "play" if !rest.is_empty() => Command::Play(SongId::new(rest)),
            "play" => return Err(CliError::Usage("play <id>")),
            "toggle" | "p" | "pause" => Command::Toggle,
            "next" | "n" => Command::Next,
            "prev" | "previous" | "b" => Command::Previous,
            "seek" => Command::Seek(
                parse_position(rest).ok_or(CliError::Usage("seek <ms|m:ss>"))?,
            ),
            "scrub" => Command::Scrub(
                parse_position(rest).ok_or(CliError::Usage("scrub <ms|m:ss>"))?,
            ),
            "shuffle" => Command::Shuffle(
                parse_switch(rest).ok_or(CliError::Usage("shuffle [on|off]"))?,
            ),
            "repeat" => Command::Repeat(
                parse_switch(rest).ok_or(CliError::Usage("repeat [on|off]"))?,
            ),
            "volume" | "vol" => Command::Volume(
                rest.parse::<u8>()
                    .ok()
                    .filter(|level| *level <= 100)
                    .ok_or(CliError::Usage("volume <0-100>"))?,
            ),
            "mute" => Command::Mute,
            "unmute" => Command::Unmute,
            "songs" | "ls" => Command::Songs,
            "search" | "find" => Command::Search(rest.to_string()),
            "status" | "s" => Command::Status,
            "refresh" => Command::Refresh,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(CliError::UnknownCommand(line.to_string())),
        };

        Ok(command)
    }
}

/// Parse `12345` (ms), `-500` or `m:ss` into milliseconds
fn parse_position(input: &str) -> Option<i64> {
    match input.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: i64 = minutes.parse().ok()?;
            let seconds: i64 = seconds.parse().ok()?;
            if minutes < 0 || !(0..60).contains(&seconds) {
                return None;
            }
            minutes.checked_mul(60)?.checked_add(seconds)?.checked_mul(1000)
        }
        None => input.parse().ok(),
    }
}

/// Empty means toggle
fn parse_switch(input: &str) -> Option<Option<bool>> {
    match input.to_ascii_lowercase().as_str() {
        "" => Some(None),
        "on" | "true" | "1" => Some(Some(true)),
        "off" | "false" | "0" => Some(Some(false)),
        _ => None,
    }
}

/// What the session loop should do after a command
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

/// Everything a command can act on
pub struct Session {
    pub catalog: Arc<CatalogCache>,
    pub player: CoordinatorHandle,
}

impl Session {
    pub async fn execute(&self, command: Command) -> Result<Outcome> {
        let output = match command {
            Command::Play(id) => {
                let song = self
                    .catalog
                    .get(&id)
                    .ok_or_else(|| CliError::UnknownSong(id.to_string()))?;
                let line = format!("Loading {}", describe(&song));
                self.player.play_song(song).await?;
                line
            }
            Command::Toggle => {
                self.player.toggle_play_pause().await?;
                render_status(&self.player.snapshot())
            }
            Command::Next => {
                self.player.skip_to_next().await?;
                render_status(&self.player.snapshot())
            }
            Command::Previous => {
                self.player.skip_to_previous().await?;
                render_status(&self.player.snapshot())
            }
            Command::Seek(position_ms) => {
                let position = self.player.seek_to(position_ms).await?;
                format!("Seeked to {}", format_time(position))
            }
            Command::Scrub(position_ms) => {
                self.player.begin_scrub().await?;
                let position = self.player.end_scrub(position_ms).await?;
                format!("Scrubbed to {}", format_time(position))
            }
            Command::Shuffle(enabled) => {
                match enabled {
                    Some(enabled) => self.player.set_shuffle(enabled).await?,
                    None => self.player.toggle_shuffle().await?,
                }
                format!("Shuffle {}", on_off(self.player.snapshot().shuffle))
            }
            Command::Repeat(enabled) => {
                match enabled {
                    Some(enabled) => self.player.set_repeat_one(enabled).await?,
                    None => self.player.toggle_repeat_one().await?,
                }
                format!("Repeat-one {}", on_off(self.player.snapshot().repeat_one))
            }
            Command::Volume(level) => {
                self.player.set_volume(level).await?;
                format!("Volume {}%", level)
            }
            Command::Mute => {
                self.player.mute().await?;
                "Muted".to_string()
            }
            Command::Unmute => {
                self.player.unmute().await?;
                "Unmuted".to_string()
            }
            Command::Songs => render_songs(&self.catalog.current()),
            Command::Search(query) => render_songs(&self.catalog.search(&query)),
            Command::Status => render_status(&self.player.snapshot()),
            Command::Refresh => {
                self.catalog.refresh().await?;
                let notice = self.catalog.status().borrow().error.clone();
                notice.unwrap_or_else(|| format!("{} songs", self.catalog.len()))
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };

        Ok(Outcome::Continue(output))
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn describe(song: &Song) -> String {
    format!("{} - {} [{}]", song.artist, song.title, song.id)
}

fn render_songs(songs: &[Song]) -> String {
    if songs.is_empty() {
        return "No songs".to_string();
    }

    let mut out = String::new();
    for song in songs {
        let _ = writeln!(out, "  {}", describe(song));
    }
    out.trim_end().to_string()
}

/// One-line summary of a snapshot
pub fn render_status(snapshot: &PlaybackSnapshot) -> String {
    let mut out = format!("[{:?}]", snapshot.status);

    if let Some(song) = &snapshot.current_song {
        let _ = write!(
            out,
            " {} {}/{}",
            describe(song),
            format_time(snapshot.position_ms),
            format_time(snapshot.duration_ms)
        );
    }

    let _ = write!(
        out,
        " vol {}%{}",
        snapshot.volume,
        if snapshot.muted { " (muted)" } else { "" }
    );
    if snapshot.shuffle {
        out.push_str(" shuffle");
    }
    if snapshot.repeat_one {
        out.push_str(" repeat-one");
    }
    if let Some(error) = &snapshot.error {
        let _ = write!(out, " ! {}", error);
    }

    out
}
