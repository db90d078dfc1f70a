//! Console runner (default binary).
//!
//! Plays one networked game from the terminal. There is no board here: moves
//! typed at the prompt go to the opponent as they are, and opponent moves are
//! printed.
//!
//! ```text
//! checkers-link listen
//! checkers-link invite <peer> [taunt]
//! ```

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use checkers_link::adapter::{GameFrontend, Link};
use checkers_link::types::Move;

const HELP: &str = "\
commands:
  move <sx> <sy> <dx> <dy>  queue one move of this turn
  end                       send the turn
  say <text>                taunt sent with the next turn or quit
  pause | resume            suspend or continue (datagram only)
  concede                   quit with \"You Win!\"
  quit                      leave the game
  state                     show the session state";

#[derive(Default)]
struct ConsoleFrontend {
    taunt: Mutex<Option<String>>,
}

impl GameFrontend for ConsoleFrontend {
    fn apply_remote_move(&self, mv: Move) {
        println!("opponent moved {mv}");
    }

    fn apply_end_of_remote_turn(&self, taunt: Option<&str>) {
        if let Some(taunt) = taunt {
            println!("opponent says: {taunt}");
        }
        println!("your turn");
    }

    fn invitation_received(&self, taunt: Option<&str>, peer: &str) {
        println!("{peer} wants to play");
        if let Some(taunt) = taunt {
            println!("opponent says: {taunt}");
        }
        println!("you move first");
    }

    fn game_over(&self, taunt: Option<&str>) {
        if let Some(taunt) = taunt {
            println!("opponent says: {taunt}");
        }
        println!("game over");
    }

    fn transport_error(&self, message: &str) {
        println!("connection problem: {message}");
    }

    fn take_outgoing_taunt(&self) -> Option<String> {
        self.taunt.lock().take()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let peer = match args.first().map(String::as_str) {
        None | Some("listen") => None,
        Some("invite") => Some(
            args.get(1)
                .cloned()
                .context("usage: checkers-link invite <peer> [taunt]")?,
        ),
        Some(other) => bail!("unknown command {other:?}; expected `listen` or `invite <peer>`"),
    };

    let frontend = Arc::new(ConsoleFrontend::default());
    if let Some(taunt) = args.get(2) {
        *frontend.taunt.lock() = Some(taunt.clone());
    }

    let Some(link) = Link::start_from_env(frontend.clone(), peer.as_deref())? else {
        println!("networking disabled");
        return Ok(());
    };
    println!("{}", link.state());

    let result = run(&link, &frontend);
    link.shutdown();
    result
}

fn run(link: &Link, frontend: &ConsoleFrontend) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if link.is_finished() {
            return Ok(());
        }
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line?;
        let mut words = line.split_whitespace();
        let outcome = match words.next() {
            None => continue,
            Some("move") => match parse_move(words) {
                Some(mv) => link.move_piece(mv),
                None => {
                    println!("usage: move <sx> <sy> <dx> <dy>");
                    continue;
                }
            },
            Some("end") => link.end_turn(),
            Some("say") => {
                let text = line.trim_start()["say".len()..].trim();
                *frontend.taunt.lock() = Some(text.to_string());
                continue;
            }
            Some("pause") => link.pause(),
            Some("resume") => link.resume().map(|_| ()),
            Some("concede") => {
                link.concede();
                Ok(())
            }
            Some("quit") => {
                link.quit();
                Ok(())
            }
            Some("state") => Ok(()),
            Some(_) => {
                println!("{HELP}");
                continue;
            }
        };

        match outcome {
            Ok(()) => println!("{}", link.state()),
            Err(err) => println!("error: {err}"),
        }
    }
}

fn parse_move<'a>(mut words: impl Iterator<Item = &'a str>) -> Option<Move> {
    let mut coords = [0i8; 4];
    for slot in coords.iter_mut() {
        *slot = words.next()?.parse().ok()?;
    }
    Move::new(coords[0], coords[1], coords[2], coords[3])
}
