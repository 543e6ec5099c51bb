//! End-to-end runs over seeded stores: full backfill, idempotent reruns,
//! malformed-event isolation, and incremental equivalence.

use chrono::{DateTime, TimeZone, Utc};
use jass_elo::config::EloConfig;
use jass_elo::event::EventKind;
use jass_elo::ledger::WriteMode;
use jass_elo::pipeline::{self, RunMode, RunOptions};
use jass_elo::store::{
    JsonStore, MemoryStore, PasseRecord, RawRoster, STATUS_COMPLETED, SessionGameRecord,
    SessionRecord, Store, StricheMarks, TeamMarks, TournamentRecord, WeisPoints,
};
use std::collections::BTreeMap;
use std::path::Path;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn roster(top: [&str; 2], bottom: [&str; 2]) -> RawRoster {
    RawRoster {
        top: top.iter().map(|s| s.to_string()).collect(),
        bottom: bottom.iter().map(|s| s.to_string()).collect(),
    }
}

fn wins(n: u32) -> StricheMarks {
    StricheMarks { win: n, ..StricheMarks::default() }
}

fn game(number: u32, secs: i64, top: u32, bottom: u32) -> SessionGameRecord {
    SessionGameRecord {
        game_number: number,
        completed_at: Some(ts(secs)),
        teams: None,
        striche: TeamMarks { top: wins(top), bottom: wins(bottom) },
        weis_points: WeisPoints::default(),
    }
}

fn session(id: &str, group: &str, secs: i64, games: Vec<SessionGameRecord>) -> SessionRecord {
    SessionRecord {
        id: id.into(),
        group_id: group.into(),
        status: STATUS_COMPLETED.into(),
        completed_at: Some(ts(secs)),
        teams: roster(["anna", "beat"], ["cora", "dave"]),
        games,
    }
}

fn classic() -> EloConfig {
    EloConfig { k: 32.0, scale: 400.0, default_rating: 1000.0 }
}

fn commit(write_mode: WriteMode) -> RunOptions {
    RunOptions {
        mode: RunMode::Commit,
        write_mode,
        ..RunOptions::default()
    }
}

#[test]
fn backfill_replays_history_and_publishes_snapshots() {
    let mut store = MemoryStore::new();
    store.add_session(session(
        "s1",
        "g1",
        0,
        vec![game(1, 10, 5, 0), game(2, 20, 2, 3)],
    ));

    let report = pipeline::run(&mut store, &classic(), &commit(WriteMode::Backfill)).unwrap();
    assert_eq!(report.events_processed, 2);
    assert_eq!(report.events_dropped, 0);
    assert_eq!(report.players, 4);
    assert_eq!(report.entries_written, 8);
    assert!(report.committed);

    let anna = store.player_history("anna").unwrap();
    assert_eq!(anna.len(), 2);

    let snap = store.snapshot("anna").unwrap().unwrap();
    assert!((snap.current_rating - 1006.03).abs() < 0.01);
    assert_eq!(snap.total_games_played, 2);
    assert_eq!(snap.peak_rating, 1008.0);
    assert_eq!(snap.peak_rating_date, ts(10));
    assert_eq!(snap.lowest_rating, 1000.0);
    assert_eq!(snap.last_updated, ts(20));
    assert!(snap.last_delta < 0.0);

    let cora = store.snapshot("cora").unwrap().unwrap();
    assert!((cora.current_rating - 993.97).abs() < 0.01);
    assert_eq!(cora.lowest_rating, 992.0);

    // Zero-sum across the whole run.
    let total: f64 = ["anna", "beat", "cora", "dave"]
        .iter()
        .map(|p| store.snapshot(p).unwrap().unwrap().current_rating - 1000.0)
        .sum();
    assert!(total.abs() < 1e-9);

    let summary = store
        .container_summary("g1", "s1", EventKind::SessionGame)
        .unwrap();
    let anna_final = &summary.final_ratings["anna"];
    assert!((anna_final.rating - 1006.03).abs() < 0.01);
    assert_eq!(anna_final.games_played, 2);
    assert!((anna_final.delta - 6.03).abs() < 0.01);
}

#[test]
fn tournament_passes_and_sessions_merge_into_one_order() {
    let mut store = MemoryStore::new();
    // Session in one group, tournament in another, interleaved in time.
    store.add_session(session("s1", "g1", 0, vec![game(1, 10, 5, 0), game(2, 200, 0, 3)]));
    store.add_tournament(TournamentRecord {
        id: "t1".into(),
        group_id: "g2".into(),
        status: STATUS_COMPLETED.into(),
        passes: vec![PasseRecord {
            passe_number: 1,
            completed_at: Some(ts(100)),
            teams: roster(["anna", "cora"], ["beat", "dave"]),
            striche_top: 4,
            striche_bottom: 1,
        }],
    });

    let report = pipeline::run(&mut store, &classic(), &commit(WriteMode::Backfill)).unwrap();
    assert_eq!(report.groups, 2);
    assert_eq!(report.events_processed, 3);

    // The passe sits between the two session games chronologically, so
    // anna's ledger shows game -> passe -> game.
    let mut anna = store.player_history("anna").unwrap();
    anna.sort_by(|a, b| a.chronological_cmp(b));
    let kinds: Vec<EventKind> = anna.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            EventKind::SessionGame,
            EventKind::TournamentPasse,
            EventKind::SessionGame,
        ]
    );
    // The middle entry starts from the rating the first game produced.
    assert_eq!(anna[1].rating_before, anna[0].rating);
}

#[test]
fn malformed_events_leave_no_trace_and_move_nobody() {
    let valid_games = vec![game(1, 10, 5, 0)];

    let mut clean = MemoryStore::new();
    clean.add_session(session("s1", "g1", 0, valid_games.clone()));

    let mut tainted = MemoryStore::new();
    tainted.add_session(session("s1", "g1", 0, valid_games));
    // Three-player roster: the bottom team lost a seat.
    let mut broken = session("s2", "g1", 100, vec![game(1, 110, 7, 0)]);
    broken.teams = roster(["anna", "beat"], ["cora", "dave"]);
    broken.teams.bottom.pop();
    tainted.add_session(broken);

    let clean_report =
        pipeline::run(&mut clean, &classic(), &commit(WriteMode::Backfill)).unwrap();
    let tainted_report =
        pipeline::run(&mut tainted, &classic(), &commit(WriteMode::Backfill)).unwrap();

    assert_eq!(clean_report.events_dropped, 0);
    assert_eq!(tainted_report.events_dropped, 1);
    assert_eq!(tainted_report.events_processed, clean_report.events_processed);

    for player in ["anna", "beat", "cora", "dave"] {
        let clean_history = clean.player_history(player).unwrap();
        let tainted_history = tainted.player_history(player).unwrap();
        assert_eq!(clean_history, tainted_history);
        assert!(tainted_history.iter().all(|e| e.container_id != "s2"));
    }
}

#[test]
fn dry_run_previews_without_writing() {
    let mut store = MemoryStore::new();
    store.add_session(session("s1", "g1", 0, vec![game(1, 10, 5, 0)]));

    let options = RunOptions::default();
    let report = pipeline::run(&mut store, &classic(), &options).unwrap();

    assert!(!report.committed);
    assert_eq!(report.entries_written, 0);
    assert_eq!(report.events_processed, 1);
    // The preview still carries the would-be snapshots.
    assert_eq!(report.snapshots.len(), 4);
    assert!(store.players_with_history().unwrap().is_empty());
    assert!(store.snapshot("anna").unwrap().is_none());
}

#[test]
fn incremental_append_matches_a_full_backfill() {
    let first = session("s1", "g1", 0, vec![game(1, 10, 5, 0)]);
    let second = session("s2", "g1", 100, vec![game(1, 110, 1, 4)]);

    let mut full = MemoryStore::new();
    full.add_session(first.clone());
    full.add_session(second.clone());
    pipeline::run(&mut full, &classic(), &commit(WriteMode::Backfill)).unwrap();

    // Live store: backfill the first session, then append the second.
    let mut live = MemoryStore::new();
    live.add_session(first);
    pipeline::run(&mut live, &classic(), &commit(WriteMode::Backfill)).unwrap();
    live.add_session(second);
    let report =
        pipeline::run(&mut live, &classic(), &commit(WriteMode::Incremental)).unwrap();

    // Only the new session's game was rated; the old one was filtered out.
    assert_eq!(report.events_processed, 1);
    for player in ["anna", "beat", "cora", "dave"] {
        assert_eq!(
            full.snapshot(player).unwrap(),
            live.snapshot(player).unwrap(),
            "snapshots diverged for {player}"
        );
        assert_eq!(
            full.player_history(player).unwrap().len(),
            live.player_history(player).unwrap().len()
        );
    }
}

fn directory_contents(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for dirent in std::fs::read_dir(dir).unwrap() {
            let path = dirent.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                out.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[test]
fn double_backfill_is_byte_identical_on_disk() {
    let dir = Path::new("temp_dir_backfill_idempotence");
    let mut store = JsonStore::open(dir).unwrap();

    // Seed the input collection directly in the store's on-disk layout.
    let record = session("s1", "g1", 0, vec![game(1, 10, 5, 0), game(2, 20, 2, 3)]);
    let sessions_dir = dir.join("groups").join("g1").join("sessions");
    std::fs::create_dir_all(&sessions_dir).unwrap();
    std::fs::write(
        sessions_dir.join("s1.json"),
        serde_json::to_string_pretty(&record).unwrap(),
    )
    .unwrap();

    pipeline::run(&mut store, &classic(), &commit(WriteMode::Backfill)).unwrap();
    let first_pass = directory_contents(dir);
    assert!(!first_pass.is_empty());

    pipeline::run(&mut store, &classic(), &commit(WriteMode::Backfill)).unwrap();
    let second_pass = directory_contents(dir);

    assert_eq!(first_pass, second_pass);
    std::fs::remove_dir_all(dir).unwrap();
}
