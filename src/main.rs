use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use casefile::content::{
    load_case_catalog, BoardItem, CaseCatalog, CharacterId, ClueId, Language, LocationId, Message,
    NodeId, NoteId, OptionId, SlotId, StringTable, Translator,
};
use casefile::core::serialization::{save_snapshot_to_path, SaveSnapshot};
use casefile::persistence::SqliteSaveRepository;
use casefile::simulation::{DialogueState, Investigation};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SAVE_SLOTS: [SlotId; 3] = [1, 2, 3];

const HELP: &str = "Commands: look | go <location|none> | examine <clue> | clues | board | connect <a> <b> | clear | analyze | suspects | talk <suspect> | ask <question> | pick <option> | confirm | next | leave | notes | note add <title> | <content> | note edit <id> <title> | <content> | note rm <id> | lang <fr|en|pl> | saves | save <slot> | load <slot> | unsave <slot> | export <path> | reset | quit";

#[derive(Parser, Debug)]
#[command(name = "casefile")]
#[command(about = "Rules debug console for the investigation engine")]
struct Cli {
    /// Case JSON to play instead of the built-in one.
    #[arg(long)]
    case: Option<PathBuf>,
    /// SQLite file for save slots. Saves stay in memory when omitted.
    #[arg(long)]
    saves: Option<PathBuf>,
    #[arg(long, default_value = "fr")]
    lang: Language,
    /// Extra string table merged over the built-in one.
    #[arg(long)]
    strings: Option<PathBuf>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let catalog = match &cli.case {
        Some(path) => load_case_catalog(path),
        None => CaseCatalog::builtin(),
    };
    let catalog = match catalog {
        Ok(catalog) => Arc::new(catalog),
        Err(err) => {
            eprintln!("Failed to load case: {}", err);
            std::process::exit(1);
        }
    };

    let mut strings = match StringTable::builtin() {
        Ok(strings) => strings,
        Err(err) => {
            eprintln!("Failed to load strings: {}", err);
            std::process::exit(1);
        }
    };
    if let Some(path) = &cli.strings {
        match StringTable::load(path) {
            Ok(extra) => strings.merge(extra),
            Err(err) => eprintln!("Ignoring string table: {}", err),
        }
    }

    let mut builder = Investigation::builder(Arc::clone(&catalog)).language(cli.lang);
    if let Some(path) = &cli.saves {
        match SqliteSaveRepository::open(path) {
            Ok(repo) => builder = builder.saves(repo),
            Err(err) => {
                eprintln!("Failed to open save DB: {}", err);
                std::process::exit(1);
            }
        }
    }
    let mut inv = builder.build();

    println!("{}", tr(&strings, &inv, catalog.title()));
    println!("{}", HELP);
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "look" => print_locations(&strings, &inv),
            "go" => match parts.next() {
                Some("none") => report(inv.set_current_location(None)),
                Some(id) => {
                    let id = LocationId::from(id);
                    if inv.set_current_location(Some(&id)).is_ok() {
                        print_current_location(&strings, &inv);
                    } else {
                        println!("Unknown location {}", id);
                    }
                }
                None => println!("Usage: go <location|none>"),
            },
            "examine" => match parts.next() {
                Some(id) => {
                    let id = ClueId::from(id);
                    match inv.discover_clue(&id) {
                        Ok(newly) => {
                            if newly {
                                println!("New clue!");
                            }
                            print_clue(&strings, &inv, &id);
                        }
                        Err(err) => println!("{}", err),
                    }
                }
                None => println!("Usage: examine <clue>"),
            },
            "clues" => {
                for clue in inv.discovered_clues() {
                    println!("  {} {}", clue.id, tr(&strings, &inv, &clue.title));
                }
            }
            "board" => print_board(&strings, &inv),
            "connect" => match (parts.next(), parts.next()) {
                (Some(a), Some(b)) => {
                    let left = board_item(inv.catalog(), a);
                    let right = board_item(inv.catalog(), b);
                    match inv.add_connection(left, right) {
                        Ok(true) => println!("{}", tr(&strings, &inv, "connection.key")),
                        Ok(false) => println!("{}", tr(&strings, &inv, "connection.circumstantial")),
                        Err(err) => println!("{}", err),
                    }
                }
                _ => println!("Usage: connect <a> <b>"),
            },
            "clear" => {
                inv.clear_connections();
                println!("{}", tr(&strings, &inv, "deduction.reset_message"));
            }
            "analyze" => {
                let analysis = inv.analyze_case();
                println!("{}", tr(&strings, &inv, analysis.verdict.label_key()));
                if let Some(accused) = &analysis.accused {
                    let name = inv
                        .character(accused)
                        .map(|c| tr(&strings, &inv, &c.name))
                        .unwrap_or_else(|| accused.to_string());
                    println!("{}: {}", tr(&strings, &inv, "conclusion.culprit"), name);
                }
                println!(
                    "{}: {} | {}: {}",
                    tr(&strings, &inv, "conclusion.connections_made"),
                    analysis.total_connections,
                    tr(&strings, &inv, "conclusion.correct_connections"),
                    analysis.key_connections
                );
                println!("{}", strings.render(inv.language(), &analysis.explanation));
            }
            "suspects" => {
                for suspect in inv.suspects() {
                    println!(
                        "  {} {} ({}) suspicion={}",
                        suspect.id,
                        tr(&strings, &inv, &suspect.name),
                        tr(&strings, &inv, &suspect.role),
                        suspect.suspicion_level
                    );
                }
            }
            "talk" => match parts.next() {
                Some(id) => match inv.select_suspect(&CharacterId::from(id)) {
                    Ok(()) => print_questions(&strings, &inv),
                    Err(err) => println!("{}", err),
                },
                None => println!("Usage: talk <suspect>"),
            },
            "ask" => match parts.next() {
                Some(id) => match inv.start_question(&NodeId::from(id)) {
                    Ok(()) => print_options(&strings, &inv),
                    Err(err) => println!("{}", err),
                },
                None => println!("Usage: ask <question>"),
            },
            "pick" => match parts.next() {
                Some(id) => report(inv.choose_option(&OptionId::from(id))),
                None => println!("Usage: pick <option>"),
            },
            "confirm" => match inv.confirm_choice() {
                Ok(outcome) => {
                    println!(
                        "{}: {}",
                        tr(&strings, &inv, "interrogation.response"),
                        tr(&strings, &inv, &outcome.response)
                    );
                    if let Some(clue) = &outcome.revealed_clue {
                        println!("New clue!");
                        print_clue(&strings, &inv, clue);
                    }
                    if outcome.suspicion_raised > 0 {
                        println!("Suspicion +{}", outcome.suspicion_raised);
                    }
                }
                Err(err) => println!("{}", err),
            },
            "next" => match inv.continue_dialogue() {
                Ok(_) => match inv.dialogue_state() {
                    DialogueState::Asking { .. } => print_options(&strings, &inv),
                    _ => print_questions(&strings, &inv),
                },
                Err(err) => println!("{}", err),
            },
            "leave" => inv.leave_interrogation(),
            "notes" => {
                for note in inv.notes() {
                    let clue = note
                        .clue_id
                        .as_ref()
                        .map(|c| format!(" [{}]", c))
                        .unwrap_or_default();
                    println!("  {} {}{}: {}", note.id, note.title, clue, note.content);
                }
            }
            "note" => {
                let rest: Vec<&str> = parts.collect();
                handle_note(&mut inv, &rest);
            }
            "lang" => match parts.next().map(str::parse::<Language>) {
                Some(Ok(language)) => {
                    inv.set_language(language);
                    println!("{}: {}", tr(&strings, &inv, "settings.language"), language);
                }
                Some(Err(err)) => println!("{}", err),
                None => println!("Usage: lang <fr|en|pl>"),
            },
            "saves" => print_saves(&strings, &inv),
            "save" => match parse_slot(parts.next()) {
                Some(slot) => match inv.save_game(slot) {
                    Ok(()) => println!("{}", tr(&strings, &inv, "settings.game_saved")),
                    Err(err) => println!("{}", err),
                },
                None => println!("Usage: save <1-3>"),
            },
            "load" => match parse_slot(parts.next()) {
                Some(slot) => match inv.load_game(slot) {
                    Ok(()) => println!("{}", tr(&strings, &inv, "settings.game_loaded")),
                    Err(err) => println!("{}", err),
                },
                None => println!("Usage: load <1-3>"),
            },
            "unsave" => match parse_slot(parts.next()) {
                Some(slot) => match inv.delete_save(slot) {
                    Ok(_) => println!("{}", tr(&strings, &inv, "settings.save_deleted")),
                    Err(err) => println!("{}", err),
                },
                None => println!("Usage: unsave <1-3>"),
            },
            "export" => match parts.next() {
                Some(path) => {
                    let snapshot = SaveSnapshot::capture(inv.catalog(), inv.state());
                    match save_snapshot_to_path(&snapshot, path) {
                        Ok(()) => println!("Exported to {}", path),
                        Err(err) => println!("Export failed: {}", err),
                    }
                }
                None => println!("Usage: export <path>"),
            },
            "reset" => {
                inv.reset_game();
                println!("{}", tr(&strings, &inv, "conclusion.restart"));
            }
            _ => println!("Unknown command. Type help."),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CASEFILE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn tr(strings: &StringTable, inv: &Investigation, key: &str) -> String {
    strings.translate(inv.language(), key, None).to_string()
}

fn report<E: std::fmt::Display>(result: Result<(), E>) {
    if let Err(err) = result {
        println!("{}", err);
    }
}

fn parse_slot(raw: Option<&str>) -> Option<SlotId> {
    raw.and_then(|value| value.parse::<SlotId>().ok())
        .filter(|slot| SAVE_SLOTS.contains(slot))
}

/// Bare ids are resolved against the catalog; unknown ids are passed through as clues.
fn board_item(catalog: &CaseCatalog, raw: &str) -> BoardItem {
    let character = CharacterId::from(raw);
    if catalog.character(&character).is_some() {
        BoardItem::character(&character)
    } else {
        BoardItem::clue(&ClueId::from(raw))
    }
}

fn print_locations(strings: &StringTable, inv: &Investigation) {
    for location in inv.locations() {
        let (found, total) = inv.location_progress(&location.id).unwrap_or((0, 0));
        println!(
            "  {} {} [{}]",
            location.id,
            tr(strings, inv, &location.name),
            strings.render(
                inv.language(),
                &Message::new("location.progress")
                    .with_arg("found", found)
                    .with_arg("total", total)
            )
        );
    }
    print_current_location(strings, inv);
}

fn print_current_location(strings: &StringTable, inv: &Investigation) {
    let Some(location) = inv.current_location() else {
        println!("No location selected.");
        return;
    };
    println!(
        "{}: {}",
        tr(strings, inv, &location.name),
        tr(strings, inv, &location.description)
    );
    for clue_id in &location.clues {
        if let Some(clue) = inv.clue(clue_id) {
            let title = if clue.is_discovered {
                tr(strings, inv, &clue.title)
            } else {
                "???".to_string()
            };
            println!("  {} {}", clue.id, title);
        }
    }
    for character_id in &location.characters {
        if let Some(character) = inv.character(character_id) {
            println!("  {} {}", character.id, tr(strings, inv, &character.name));
        }
    }
}

fn print_clue(strings: &StringTable, inv: &Investigation, id: &ClueId) {
    let Some(clue) = inv.clue(id) else {
        return;
    };
    println!("{} [{:?}]", tr(strings, inv, &clue.title), clue.clue_type);
    println!("  {}", tr(strings, inv, &clue.description));
    if let Some(content) = &clue.content {
        println!("  \"{}\"", tr(strings, inv, content));
    }
}

fn print_board(strings: &StringTable, inv: &Investigation) {
    println!(
        "{} ({})",
        tr(strings, inv, "deduction.connections"),
        inv.connections().len()
    );
    for connection in inv.connections() {
        println!(
            "  {} {} <-> {}: {}",
            connection.id,
            connection.left,
            connection.right,
            tr(strings, inv, &connection.reason)
        );
    }
}

fn print_questions(strings: &StringTable, inv: &Investigation) {
    for node in inv.available_questions() {
        println!("  {} {}", node.id, tr(strings, inv, &node.question));
    }
}

fn print_options(strings: &StringTable, inv: &Investigation) {
    let DialogueState::Asking { node, .. } = inv.dialogue_state() else {
        return;
    };
    let Some(node) = inv.catalog().node(node) else {
        return;
    };
    println!(
        "{}: {}",
        tr(strings, inv, "interrogation.question"),
        tr(strings, inv, &node.question)
    );
    for option in &node.options {
        println!("  {} {}", option.id, tr(strings, inv, &option.text));
    }
}

fn print_saves(strings: &StringTable, inv: &Investigation) {
    let slots = match inv.save_slots() {
        Ok(slots) => slots,
        Err(err) => {
            println!("{}", err);
            return;
        }
    };
    for slot in SAVE_SLOTS {
        match slots.iter().find(|s| s.slot == slot) {
            Some(save) => {
                let saved_at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(save.saved_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| save.saved_at.to_string());
                println!(
                    "  {} {}: {} {} | {} clues",
                    tr(strings, inv, "settings.save_slot"),
                    slot,
                    tr(strings, inv, "settings.save_time"),
                    saved_at,
                    save.discovered_clues()
                );
            }
            None => println!(
                "  {} {}: {}",
                tr(strings, inv, "settings.save_slot"),
                slot,
                tr(strings, inv, "settings.no_saves")
            ),
        }
    }
}

fn handle_note(inv: &mut Investigation, args: &[&str]) {
    match args.split_first() {
        Some((&"add", rest)) => {
            let (title, content) = split_note(rest);
            match inv.add_note(title, content, None) {
                Ok(id) => println!("Note {} created", id),
                Err(err) => println!("{}", err),
            }
        }
        Some((&"edit", [id, rest @ ..])) => {
            let (title, content) = split_note(rest);
            report(inv.update_note(&NoteId::from(*id), title, content));
        }
        Some((&"rm", [id])) => report(inv.delete_note(&NoteId::from(*id))),
        Some((&"clue", [clue, rest @ ..])) => {
            let (title, content) = split_note(rest);
            match inv.add_note(title, content, Some(ClueId::from(*clue))) {
                Ok(id) => println!("Note {} created", id),
                Err(err) => println!("{}", err),
            }
        }
        _ => println!("Usage: note add <title> | <content> | note clue <clue> <title> | <content> | note edit <id> <title> | <content> | note rm <id>"),
    }
}

fn split_note(words: &[&str]) -> (String, String) {
    let joined = words.join(" ");
    match joined.split_once('|') {
        Some((title, content)) => (title.trim().to_string(), content.trim().to_string()),
        None => (joined.trim().to_string(), String::new()),
    }
}
