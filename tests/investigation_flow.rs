use std::sync::Arc;

use casefile::content::{
    BoardItem, CaseCatalog, CharacterId, ClueId, Language, LocationId, NodeId, NoteId, OptionId,
    StringTable, Translator,
};
use casefile::core::SequentialIds;
use casefile::persistence::{SaveRepository, SqliteSaveRepository};
use casefile::rules::Verdict;
use casefile::simulation::{DialogueState, Investigation, InvestigationError, ManualClock};

const LOCKED_ROOM: &str = r#"{
  "schema_version": 1,
  "id": "locked_room",
  "title": "case.locked_room",
  "clues": [
    { "id": "k1", "title": "clue.k1", "description": "clue.k1.d", "type": "medical", "location_id": "study", "is_discovered": true },
    { "id": "k2", "title": "clue.k2", "description": "clue.k2.d", "type": "visual", "location_id": "study" },
    { "id": "k3", "title": "clue.k3", "description": "clue.k3.d", "type": "financial", "location_id": "hall" },
    { "id": "decoy", "title": "clue.decoy", "description": "clue.decoy.d", "type": "document", "location_id": "hall", "is_misleading": true }
  ],
  "characters": [
    { "id": "butler", "name": "char.butler", "role": "role.butler", "description": "d", "portrait": "butler.png", "is_suspect": true },
    { "id": "maid", "name": "char.maid", "role": "role.maid", "description": "d", "portrait": "maid.png", "is_suspect": false }
  ],
  "locations": [
    { "id": "study", "name": "loc.study", "description": "d", "image": "study.png", "clues": ["k1", "k2"], "characters": [] },
    { "id": "hall", "name": "loc.hall", "description": "d", "image": "hall.png", "clues": ["k3", "decoy"], "characters": ["butler", "maid"] }
  ],
  "dialogues": [
    {
      "id": "b1", "character_id": "butler", "question": "q.b1",
      "options": [
        { "id": "calm", "text": "t", "response": "r.calm", "next_node": "b2" },
        { "id": "press", "text": "t", "response": "r.press", "suspicion_delta": 2, "reveal_clue": "k3", "next_node": "b2" }
      ]
    },
    {
      "id": "b2", "character_id": "butler", "question": "q.b2",
      "options": [
        { "id": "done", "text": "t", "response": "r.done", "suspicion_delta": 1 }
      ]
    }
  ],
  "answer_key": {
    "key_pairs": [
      { "label": "contradiction", "a": "k1", "b": "k2" },
      { "label": "motive", "a": "butler", "b": "k3" }
    ],
    "solve_threshold": 1,
    "culprit": "butler",
    "solved_explanation": "explain.solved",
    "incomplete_explanation": "explain.incomplete",
    "not_started_explanation": "explain.not_started"
  }
}"#;

fn locked_room() -> Investigation {
    let catalog = Arc::new(CaseCatalog::from_json(LOCKED_ROOM).expect("fixture case validates"));
    Investigation::builder(catalog)
        .clock(Arc::new(ManualClock::new(0)))
        .ids(SequentialIds::default())
        .build()
}

fn clue(id: &str) -> BoardItem {
    BoardItem::clue(&ClueId::from(id))
}

#[test]
fn contradiction_alone_solves_with_threshold_one() {
    let mut inv = locked_room();
    assert_eq!(inv.analyze_case().verdict, Verdict::NotStarted);

    inv.discover_clue(&ClueId::from("k2")).unwrap();
    assert!(inv.add_connection(clue("k2"), clue("k1")).unwrap());
    let analysis = inv.analyze_case();
    assert!(analysis.solved);
    assert_eq!(analysis.accused, Some(CharacterId::from("butler")));
    assert_eq!(analysis.key_connections, 1);
    assert_eq!(analysis.explanation.key, "explain.solved");
}

#[test]
fn interrogation_chains_and_reveals_once() {
    let mut inv = locked_room();
    let butler = CharacterId::from("butler");

    assert!(matches!(
        inv.select_suspect(&CharacterId::from("maid")),
        Err(InvestigationError::Dialogue(_))
    ));

    inv.select_suspect(&butler).unwrap();
    inv.start_question(&NodeId::from("b1")).unwrap();
    inv.choose_option(&OptionId::from("press")).unwrap();
    let outcome = inv.confirm_choice().unwrap();
    assert_eq!(outcome.response, "r.press");
    assert_eq!(outcome.revealed_clue, Some(ClueId::from("k3")));
    assert_eq!(inv.character(&butler).unwrap().suspicion_level, 2);

    inv.continue_dialogue().unwrap();
    assert_eq!(
        inv.dialogue_state(),
        &DialogueState::Asking {
            character: butler.clone(),
            node: NodeId::from("b2"),
        }
    );
    inv.choose_option(&OptionId::from("done")).unwrap();
    inv.confirm_choice().unwrap();
    inv.continue_dialogue().unwrap();
    assert_eq!(inv.character(&butler).unwrap().suspicion_level, 3);
    assert!(inv.start_question(&NodeId::from("b1")).is_err());

    inv.leave_interrogation();
    inv.select_suspect(&butler).unwrap();
    inv.start_question(&NodeId::from("b1")).unwrap();
    inv.choose_option(&OptionId::from("press")).unwrap();
    let again = inv.confirm_choice().unwrap();
    assert_eq!(again.revealed_clue, None);
    assert_eq!(again.suspicion_raised, 0);
    assert_eq!(inv.character(&butler).unwrap().suspicion_level, 3);
    assert_eq!(inv.dialogue_history().len(), 2);
}

#[test]
fn board_refuses_bystanders_and_unfound_evidence() {
    let mut inv = locked_room();
    let maid = BoardItem::character(&CharacterId::from("maid"));
    let butler = BoardItem::character(&CharacterId::from("butler"));

    assert!(matches!(
        inv.add_connection(maid, clue("k1")),
        Err(InvestigationError::NotASuspect(_))
    ));
    assert!(matches!(
        inv.add_connection(butler.clone(), clue("k3")),
        Err(InvestigationError::UndiscoveredClue(_))
    ));
    assert!(inv.connections().is_empty());

    inv.select_suspect(&CharacterId::from("butler")).unwrap();
    inv.start_question(&NodeId::from("b1")).unwrap();
    inv.choose_option(&OptionId::from("press")).unwrap();
    inv.confirm_choice().unwrap();
    assert!(inv.add_connection(butler, clue("k3")).unwrap());
    assert!(inv.analyze_case().solved);
}

#[test]
fn reset_restores_authored_state_but_keeps_saves_and_language() {
    let mut inv = locked_room();
    inv.set_language(Language::Pl);
    inv.discover_clue(&ClueId::from("k2")).unwrap();
    inv.set_current_location(Some(&LocationId::from("hall"))).unwrap();
    inv.discover_clue(&ClueId::from("decoy")).unwrap();
    inv.add_connection(clue("k1"), clue("decoy")).unwrap();
    inv.add_note("t", "c", Some(ClueId::from("k2"))).unwrap();
    inv.save_game(3).unwrap();

    inv.reset_game();
    assert_eq!(inv.language(), Language::Pl);
    assert!(inv.current_location().is_none());
    assert!(!inv.clue(&ClueId::from("k2")).unwrap().is_discovered);
    assert!(inv.clue(&ClueId::from("k1")).unwrap().is_discovered);
    assert_eq!(inv.notes().count(), 0);
    assert!(inv.connections().is_empty());
    assert_eq!(inv.save_slots().unwrap().len(), 1);
}

#[test]
fn builtin_case_end_to_end() {
    let catalog = Arc::new(CaseCatalog::builtin().unwrap());
    let strings = StringTable::builtin().unwrap();
    let mut inv = Investigation::builder(catalog)
        .language(Language::En)
        .clock(Arc::new(ManualClock::new(0)))
        .build();

    inv.set_current_location(Some(&LocationId::from("loc1"))).unwrap();
    inv.discover_clue(&ClueId::from("c5")).unwrap();
    inv.discover_clue(&ClueId::from("c8")).unwrap();
    assert_eq!(inv.location_progress(&LocationId::from("loc1")), Some((2, 9)));

    for id in ["c1", "c2", "c6", "c7", "c12", "c23"] {
        inv.discover_clue(&ClueId::from(id)).unwrap();
    }

    inv.add_connection(clue("c1"), clue("c2")).unwrap();
    inv.add_connection(clue("c6"), clue("c7")).unwrap();
    let incomplete = inv.analyze_case();
    assert_eq!(incomplete.verdict, Verdict::Incomplete);
    assert_eq!(incomplete.key_connections, 0);
    assert_eq!(incomplete.total_connections, 2);
    assert!(strings
        .render(inv.language(), &incomplete.explanation)
        .contains("You made 2 connection(s)"));

    inv.add_connection(clue("c4"), clue("c5")).unwrap();
    inv.add_connection(clue("c23"), clue("c8")).unwrap();
    inv.add_connection(BoardItem::character(&CharacterId::from("char1")), clue("c12"))
        .unwrap();
    let solved = inv.analyze_case();
    assert!(solved.solved);
    assert_eq!(solved.total_connections, 5);
    assert_eq!(
        strings.translate(Language::Fr, solved.verdict.label_key(), None),
        "AFFAIRE RÉSOLUE"
    );
    assert_eq!(
        strings.translate(inv.language(), &inv.connections()[2].reason, None),
        "Relevant connection detected!"
    );
}

#[test]
fn sqlite_saves_survive_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saves.db");
    let catalog = Arc::new(CaseCatalog::builtin().unwrap());

    let saved_state = {
        let mut inv = Investigation::builder(Arc::clone(&catalog))
            .saves(SqliteSaveRepository::open(&path).unwrap())
            .clock(Arc::new(ManualClock::new(42)))
            .build();
        inv.discover_clue(&ClueId::from("c14")).unwrap();
        inv.discover_clue(&ClueId::from("c21")).unwrap();
        inv.add_connection(clue("c14"), clue("c21")).unwrap();
        inv.add_note("Parking", "20h25", Some(ClueId::from("c14"))).unwrap();
        inv.save_game(2).unwrap();
        inv.state().clone()
    };

    let repo = SqliteSaveRepository::open(&path).unwrap();
    let stored = repo.get(2).unwrap().expect("slot 2 persisted");
    assert_eq!(stored.saved_at, 42);
    assert_eq!(stored.discovered_clues(), 3);

    let mut inv = Investigation::builder(Arc::clone(&catalog))
        .saves(repo)
        .ids(SequentialIds::default())
        .build();
    assert!(matches!(
        inv.load_game(1),
        Err(InvestigationError::EmptySaveSlot(1))
    ));
    inv.load_game(2).unwrap();
    assert_eq!(inv.state(), &saved_state);

    let fresh = inv.add_note("Suite", "", None).unwrap();
    assert_eq!(fresh, NoteId::from("note-3"));
    assert_eq!(inv.notes().count(), 2);
}

#[test]
fn saves_from_another_case_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saves.db");

    let mut other = locked_room_with_saves(SqliteSaveRepository::open(&path).unwrap());
    other.save_game(1).unwrap();
    drop(other);

    let catalog = Arc::new(CaseCatalog::builtin().unwrap());
    let mut inv = Investigation::builder(catalog)
        .saves(SqliteSaveRepository::open(&path).unwrap())
        .build();
    inv.discover_clue(&ClueId::from("c1")).unwrap();
    assert!(matches!(
        inv.load_game(1),
        Err(InvestigationError::IncompatibleSave { .. })
    ));
    assert!(inv.clue(&ClueId::from("c1")).unwrap().is_discovered);
}

fn locked_room_with_saves(saves: SqliteSaveRepository) -> Investigation {
    let catalog = Arc::new(CaseCatalog::from_json(LOCKED_ROOM).unwrap());
    Investigation::builder(catalog).saves(saves).build()
}
