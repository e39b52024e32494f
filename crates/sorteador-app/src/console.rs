// Line-oriented console front end.
//
// Reads commands from stdin, forwards them to the app loop and prints the
// updates it sends back. Logging goes to a file, so stdout is ours.

use std::path::PathBuf;

use chrono::Local;
use sorteador_core::{DrawResult, ImportSummary};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::protocol::{Notice, NoticeEvent, NoticeLevel, RosterSnapshot, UiUpdate, UserCommand};

pub const HELP: &str = "\
Commands:
  add <name>        add a name to the roster
  rm <name>         remove a name
  clear             remove every name
  import <file>     add names from a text file, one per line
  export [file]     write the roster to a text file
  draw              draw one name
  teams [n]         split the roster into n teams (2-10)
  set-teams <n>     change the team count without drawing
  hide              hide the last result
  list              show the roster
  save              save now
  help              show this text
  quit              save and exit";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("unknown command `{0}`, type `help` for a list")]
    Unknown(String),

    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("`{0}` is not a number")]
    InvalidNumber(String),
}

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(UserCommand),
    Help,
    Blank,
}

/// Parse one input line. The first word picks the command and the rest of
/// the line, trimmed, is its argument, so names may contain spaces.
pub fn parse_line(line: &str) -> Result<Input, CommandParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Blank);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let cmd = match word.to_lowercase().as_str() {
        "add" => UserCommand::Add(required(rest, "add", "a name")?.to_string()),
        "rm" | "remove" => UserCommand::Remove(required(rest, "rm", "a name")?.to_string()),
        "clear" => UserCommand::Clear,
        "import" => UserCommand::Import(PathBuf::from(required(rest, "import", "a file")?)),
        "export" => UserCommand::Export(optional(rest).map(PathBuf::from)),
        "draw" => UserCommand::DrawSingle,
        "teams" => UserCommand::DrawTeams(optional(rest).map(parse_count).transpose()?),
        "set-teams" => UserCommand::SetTeams(parse_count(required(
            rest,
            "set-teams",
            "a team count",
        )?)?),
        "hide" => UserCommand::HideResults,
        "list" | "ls" => UserCommand::Refresh,
        "save" => UserCommand::Save,
        "quit" | "exit" | "q" => UserCommand::Quit,
        "help" | "?" => return Ok(Input::Help),
        _ => return Err(CommandParseError::Unknown(word.to_string())),
    };
    Ok(Input::Command(cmd))
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, CommandParseError> {
    optional(rest).ok_or(CommandParseError::MissingArgument { command, what })
}

fn optional(rest: &str) -> Option<&str> {
    (!rest.is_empty()).then_some(rest)
}

fn parse_count(s: &str) -> Result<usize, CommandParseError> {
    s.parse()
        .map_err(|_| CommandParseError::InvalidNumber(s.to_string()))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Text to print for an update, or `None` if it has no console output.
pub fn render(update: &UiUpdate) -> Option<String> {
    match update {
        UiUpdate::Snapshot(snapshot) => Some(render_snapshot(snapshot)),
        UiUpdate::Result { result, drawn_at } => {
            let at = drawn_at.with_timezone(&Local).format("%H:%M:%S");
            Some(format!("{}\n(drawn at {})", render_result(result), at))
        }
        UiUpdate::ResultHidden => Some("Results hidden.".to_string()),
        UiUpdate::Notice(notice) => Some(render_notice(notice)),
        // Printed lines cannot be taken back.
        UiUpdate::NoticeExpired(_) => None,
    }
}

fn render_snapshot(snapshot: &RosterSnapshot) -> String {
    let mut out = format!("Roster ({}/{}):", snapshot.count(), snapshot.capacity);
    if snapshot.names.is_empty() {
        out.push_str("\n  (empty)");
    }
    for (i, name) in snapshot.names.iter().enumerate() {
        out.push_str(&format!("\n  {:>3}. {}", i + 1, name));
    }
    let teams = snapshot.teams.get();
    if snapshot.can_draw_teams() {
        out.push_str(&format!("\nTeams: {}", teams));
    } else {
        out.push_str(&format!(
            "\nTeams: {} (needs {} more)",
            teams, snapshot.teams_shortfall
        ));
    }
    out
}

fn render_result(result: &DrawResult) -> String {
    match result {
        DrawResult::SingleWinner(name) => format!("Winner: {}", name),
        DrawResult::TeamPartition(teams) => teams
            .iter()
            .map(|team| format!("Team {}: {}", team.number, team.members.join(", ")))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warn",
        NoticeLevel::Error => "error",
    };
    format!("[{}] {}", tag, describe(&notice.event))
}

fn describe(event: &NoticeEvent) -> String {
    match event {
        NoticeEvent::Added { name } => format!("Added {}.", name),
        NoticeEvent::Removed { name } => format!("Removed {}.", name),
        NoticeEvent::Cleared { removed } => format!("Removed all {} names.", removed),
        NoticeEvent::Imported(summary) => describe_import(summary),
        NoticeEvent::Exported { path, count } => {
            format!("Exported {} names to {}.", count, path.display())
        }
        NoticeEvent::Drawn => "Draw complete.".to_string(),
        NoticeEvent::Saved => "Roster saved.".to_string(),
        NoticeEvent::Rejected(e) => format!("Not done: {}.", e),
        NoticeEvent::DrawRejected(e) => format!("Cannot draw: {}.", e),
        NoticeEvent::ImportFailed { reason, .. } => format!("Import failed: {}.", reason),
        NoticeEvent::ExportFailed { reason, .. } => format!("Export failed: {}.", reason),
        NoticeEvent::SaveFailed => "Could not save the roster.".to_string(),
    }
}

fn describe_import(summary: &ImportSummary) -> String {
    let reasons: Vec<String> = [
        (summary.duplicates, "already listed"),
        (summary.too_long, "too long"),
        (summary.over_capacity, "with the roster full"),
        (summary.beyond_batch, "past the import limit"),
    ]
    .into_iter()
    .filter(|&(count, _)| count > 0)
    .map(|(count, reason)| format!("{count} {reason}"))
    .collect();

    if reasons.is_empty() {
        format!("Imported {} names.", summary.added)
    } else {
        format!("Imported {} names, skipped {}.", summary.added, reasons.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the console until the user quits or stdin ends.
///
/// Quitting sends `UserCommand::Quit` and keeps printing updates until the
/// app loop closes its side of the channel.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type `help` for commands.");

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => print_update(&update),
                    // App loop is gone
                    None => return Ok(()),
                }
            }

            line = lines.next_line() => {
                match line? {
                    Some(line) => match parse_line(&line) {
                        Ok(Input::Command(UserCommand::Quit)) => break,
                        Ok(Input::Command(cmd)) => {
                            if cmd_tx.send(cmd).await.is_err() {
                                break;
                            }
                        }
                        Ok(Input::Help) => println!("{}", HELP),
                        Ok(Input::Blank) => {}
                        Err(e) => println!("{}", e),
                    },
                    // stdin closed
                    None => break,
                }
            }
        }
    }

    let _ = cmd_tx.send(UserCommand::Quit).await;
    while let Some(update) = ui_rx.recv().await {
        print_update(&update);
    }
    Ok(())
}

fn print_update(update: &UiUpdate) {
    if let Some(text) = render(update) {
        println!("{}", text);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sorteador_core::{DrawError, RosterError, Team, TeamCount};

    fn cmd(line: &str) -> UserCommand {
        match parse_line(line) {
            Ok(Input::Command(cmd)) => cmd,
            other => panic!("expected a command for {:?}, got {:?}", line, other),
        }
    }

    fn notice(event: NoticeEvent) -> UiUpdate {
        UiUpdate::Notice(Notice {
            id: 1,
            level: event.level(),
            event,
        })
    }

    // -- parsing --

    #[test]
    fn add_keeps_inner_spaces() {
        assert_eq!(cmd("add  Ana Maria  "), UserCommand::Add("Ana Maria".into()));
        assert_eq!(cmd("ADD Bruno"), UserCommand::Add("Bruno".into()));
    }

    #[test]
    fn commands_without_arguments() {
        assert_eq!(cmd("clear"), UserCommand::Clear);
        assert_eq!(cmd("draw"), UserCommand::DrawSingle);
        assert_eq!(cmd("teams"), UserCommand::DrawTeams(None));
        assert_eq!(cmd("hide"), UserCommand::HideResults);
        assert_eq!(cmd("list"), UserCommand::Refresh);
        assert_eq!(cmd("save"), UserCommand::Save);
        assert_eq!(cmd("export"), UserCommand::Export(None));
        assert_eq!(cmd("quit"), UserCommand::Quit);
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(cmd("rm Ana"), UserCommand::Remove("Ana".into()));
        assert_eq!(cmd("teams 4"), UserCommand::DrawTeams(Some(4)));
        assert_eq!(cmd("set-teams 12"), UserCommand::SetTeams(12));
        assert_eq!(
            cmd("import nomes.txt"),
            UserCommand::Import(PathBuf::from("nomes.txt"))
        );
        assert_eq!(
            cmd("export out/lista.txt"),
            UserCommand::Export(Some(PathBuf::from("out/lista.txt")))
        );
    }

    #[test]
    fn blank_and_help_lines() {
        assert_eq!(parse_line("   "), Ok(Input::Blank));
        assert_eq!(parse_line("help"), Ok(Input::Help));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            parse_line("shuffle"),
            Err(CommandParseError::Unknown("shuffle".into()))
        );
        assert!(matches!(
            parse_line("add"),
            Err(CommandParseError::MissingArgument { command: "add", .. })
        ));
        assert!(matches!(
            parse_line("set-teams"),
            Err(CommandParseError::MissingArgument { .. })
        ));
        assert_eq!(
            parse_line("teams many"),
            Err(CommandParseError::InvalidNumber("many".into()))
        );
    }

    // -- rendering --

    #[test]
    fn snapshot_lists_names_and_shortfall() {
        let text = render(&UiUpdate::Snapshot(RosterSnapshot {
            names: vec!["Ana".into(), "Bruno".into()],
            capacity: 100,
            teams: TeamCount::clamped(3),
            teams_shortfall: 1,
        }))
        .unwrap();
        assert!(text.starts_with("Roster (2/100):"));
        assert!(text.contains("1. Ana"));
        assert!(text.contains("2. Bruno"));
        assert!(text.ends_with("Teams: 3 (needs 1 more)"));
    }

    #[test]
    fn empty_snapshot_says_so() {
        let text = render(&UiUpdate::Snapshot(RosterSnapshot {
            names: Vec::new(),
            capacity: 100,
            teams: TeamCount::default(),
            teams_shortfall: 2,
        }))
        .unwrap();
        assert!(text.contains("(empty)"));
    }

    #[test]
    fn team_partition_renders_one_line_per_team() {
        let result = DrawResult::TeamPartition(vec![
            Team {
                number: 1,
                members: vec!["Ana".into(), "Carla".into()],
            },
            Team {
                number: 2,
                members: vec!["Bruno".into()],
            },
        ]);
        let text = render(&UiUpdate::Result {
            result,
            drawn_at: Utc::now(),
        })
        .unwrap();
        assert!(text.starts_with("Team 1: Ana, Carla\nTeam 2: Bruno\n(drawn at "));
    }

    #[test]
    fn winner_is_rendered() {
        let text = render(&UiUpdate::Result {
            result: DrawResult::SingleWinner("Ana".into()),
            drawn_at: Utc::now(),
        })
        .unwrap();
        assert!(text.starts_with("Winner: Ana"));
    }

    #[test]
    fn notices_carry_level_tag() {
        assert_eq!(
            render(&notice(NoticeEvent::Added { name: "Ana".into() })).unwrap(),
            "[ok] Added Ana."
        );
        assert_eq!(
            render(&notice(NoticeEvent::Rejected(RosterError::EmptyName))).unwrap(),
            "[warn] Not done: name is empty."
        );
        assert!(render(&notice(NoticeEvent::Rejected(RosterError::RosterFull {
            max: 100
        })))
        .unwrap()
        .starts_with("[error]"));
        assert!(render(&notice(NoticeEvent::DrawRejected(DrawError::EmptyRoster)))
            .unwrap()
            .starts_with("[warn] Cannot draw"));
    }

    #[test]
    fn import_notice_names_skip_reasons() {
        let text = render(&notice(NoticeEvent::Imported(ImportSummary {
            read: 5,
            added: 2,
            duplicates: 2,
            too_long: 1,
            beyond_batch: 4,
            ..ImportSummary::default()
        })))
        .unwrap();
        assert_eq!(
            text,
            "[ok] Imported 2 names, skipped 2 already listed, 1 too long, 4 past the import limit."
        );
    }

    #[test]
    fn clean_import_notice_has_no_reasons() {
        let text = render(&notice(NoticeEvent::Imported(ImportSummary {
            read: 3,
            added: 3,
            ..ImportSummary::default()
        })))
        .unwrap();
        assert_eq!(text, "[ok] Imported 3 names.");
    }

    #[test]
    fn expired_notice_prints_nothing() {
        assert_eq!(render(&UiUpdate::NoticeExpired(3)), None);
    }
}
