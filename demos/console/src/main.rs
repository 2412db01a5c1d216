//! Plays Turncoat from a terminal.
//!
//! Each input line is `<room> <player> <verb> [args]`, for example:
//!
//! ```text
//! -100 1 start
//! -100 2 join Ada
//! -100 1 begin
//! -100 1 day-in 90        # vote in 90 minutes
//! -100 3 press -100:vote:2
//! ```
//!
//! Outbound messages are printed with the tokens of their options, so
//! they can be pasted back with `press`. State is kept in the file named
//! by `TURNCOAT_STATE` (default `turncoat_state.json`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use turncoat::prelude::*;

// ---------------------------------------------------------------------------
// Printing gateway
// ---------------------------------------------------------------------------

/// Writes every outbound message to stdout.
#[derive(Default)]
struct ConsoleGateway {
    next_id: AtomicU64,
}

impl ConsoleGateway {
    fn print(&self, audience: Audience, notice: &Notice, options: &[Choice]) -> MessageHandle {
        let message_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let lock = if notice.is_private() { " (private)" } else { "" };
        println!("[{audience}#{message_id}]{lock} {notice:?}");
        for option in options {
            println!("    > {}", option.token());
        }
        MessageHandle {
            audience,
            message_id,
        }
    }
}

impl Gateway for ConsoleGateway {
    async fn send_to_room(
        &self,
        room: RoomId,
        notice: &Notice,
        options: &[Choice],
    ) -> Result<MessageHandle, GatewayError> {
        Ok(self.print(Audience::Room(room), notice, options))
    }

    async fn send_private(
        &self,
        player: PlayerId,
        notice: &Notice,
        options: &[Choice],
    ) -> Result<MessageHandle, GatewayError> {
        Ok(self.print(Audience::Player(player), notice, options))
    }

    async fn edit_message(
        &self,
        handle: MessageHandle,
        notice: &Notice,
        options: &[Choice],
    ) -> Result<(), GatewayError> {
        println!("[{handle} edited] {notice:?}");
        for option in options {
            println!("    > {}", option.token());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(RoomId, PlayerId, Command),
    /// A pressed option, as its token.
    Press(PlayerId, String),
    Show(RoomId),
    Rooms,
}

fn parse_line(line: &str, now: Timestamp) -> Result<Input, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.as_slice() == ["rooms"] {
        return Ok(Input::Rooms);
    }
    let [room, player, verb, args @ ..] = words.as_slice() else {
        return Err("expected: <room> <player> <verb> [args]".into());
    };
    let room = RoomId(room.parse().map_err(|_| format!("bad room id {room:?}"))?);
    let player = PlayerId(player.parse().map_err(|_| format!("bad player id {player:?}"))?);

    let command = match (*verb, args) {
        ("start", []) => Command::StartGame,
        ("join", [_, ..]) => Command::Join {
            name: args.join(" "),
        },
        ("begin", []) => Command::Begin,
        ("day", []) => Command::DayNow,
        ("day-in", [minutes]) => {
            let minutes: u64 = minutes
                .parse()
                .map_err(|_| format!("bad minute count {minutes:?}"))?;
            Command::DayAt(now + Duration::from_secs(minutes * 60))
        }
        ("night", []) => Command::StartNight,
        ("remove", [target]) => Command::Remove(PlayerId(
            target.parse().map_err(|_| format!("bad player id {target:?}"))?,
        )),
        ("end", []) => Command::EndGame,
        ("press", [token]) => return Ok(Input::Press(player, token.to_string())),
        ("show", []) => return Ok(Input::Show(room)),
        _ => return Err(format!("unknown command {verb:?} with {} argument(s)", args.len())),
    };
    Ok(Input::Command(room, player, command))
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), TurncoatError> {
    turncoat::init_logging();

    let path = std::env::var("TURNCOAT_STATE").unwrap_or_else(|_| "turncoat_state.json".into());
    let engine = TurncoatBuilder::new()
        .state_path(&path)
        .build(ConsoleGateway::default())
        .await?;
    eprintln!("turncoat console ready (state in {path}); type commands, Ctrl-D to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let input = match parse_line(&line, Timestamp::now()) {
            Ok(input) => input,
            Err(e) => {
                eprintln!("?? {e}");
                continue;
            }
        };
        let result = match input {
            Input::Command(room, player, command) => engine.execute(room, player, command).await,
            Input::Press(player, token) => engine.choose(player, &token).await,
            Input::Show(room) => engine.room(room).await.map(|room| println!("{room:#?}")),
            Input::Rooms => {
                println!("{:?}", engine.rooms().await);
                Ok(())
            }
        };
        if let Err(e) = result {
            eprintln!("!! {e}");
        }
        // Let the courier print before the next prompt.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    engine.shutdown().await;
    tracing::info!("bye");
    Ok(())
}
