//! Performance benchmarks for critical board operations

use server::board::{Board, BoardConfig, BoardState};
use server::dispatcher::dispatch;
use shared::{NoteFilter, Request};
use std::time::Instant;

fn config() -> BoardConfig {
    BoardConfig::new((10_000, 10_000), (10, 10), ["red", "blue", "green"]).unwrap()
}

/// A board with one note per 10x10 cell along the top rows
fn filled_state(config: &BoardConfig, notes: i32) -> BoardState {
    let mut state = BoardState::new();
    for i in 0..notes {
        let color = ["red", "blue", "green"][(i % 3) as usize];
        state
            .post(config, (i % 1000) * 10, (i / 1000) * 10, color, "milk and bread")
            .unwrap();
    }
    state
}

/// Benchmarks posting notes, each of which scans for overlaps and pins
#[test]
fn benchmark_post() {
    let config = config();
    let iterations = 2_000;
    let start = Instant::now();

    let state = filled_state(&config, iterations);

    let duration = start.elapsed();
    println!(
        "Post: {} notes in {:?} ({:.2} μs/note)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(state.note_count(), iterations as usize);
    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks filtered GET over a populated board
#[test]
fn benchmark_filtered_get() {
    let config = config();
    let state = filled_state(&config, 3_000);
    let filter = NoteFilter::default()
        .with_color("red")
        .referring_to("MILK");

    let iterations = 200;
    let start = Instant::now();

    let mut found = 0;
    for _ in 0..iterations {
        found = state.notes(&filter).len();
    }

    let duration = start.elapsed();
    println!(
        "Filtered get: {} queries over {} notes in {:?} ({:.2} μs/query)",
        iterations,
        state.note_count(),
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(found, 1_000);
    // Should complete in under 3 seconds
    assert!(duration.as_millis() < 3000);
}

/// Benchmarks pinning, shaking and the invariant audit
#[test]
fn benchmark_pin_and_shake() {
    let config = config();
    let mut state = filled_state(&config, 2_000);

    let start = Instant::now();
    for i in (0..2_000).step_by(2) {
        state.pin_at((i % 1000) * 10 + 5, (i / 1000) * 10 + 5).unwrap();
    }
    let removal = state.shake();
    let duration = start.elapsed();

    println!(
        "Pin and shake: 1000 pins, {} notes removed in {:?}",
        removal.notes, duration
    );

    assert_eq!(removal.notes, 1_000);
    assert!(state.audit(&config).is_empty());
    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks request line parsing
#[test]
fn benchmark_request_parsing() {
    let lines = [
        "POST 10 20 red buy milk on the way home",
        "PIN 15 25",
        "UNPIN 15 25",
        "GET color=red contains=15 25 refersTo=milk",
        "GET PINS",
        "SHAKE",
    ];

    let iterations = 50_000;
    let start = Instant::now();

    for i in 0..iterations {
        let _ = lines[i % lines.len()].parse::<Request>().unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Request parsing: {} lines in {:?} ({:.2} ns/line)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks the full dispatch path including the board lock
#[tokio::test]
async fn benchmark_dispatch() {
    let board = Board::new(config());

    let iterations = 5_000;
    let start = Instant::now();

    for i in 0..iterations {
        let line = match i % 4 {
            0 => format!("POST {} {} red note {}", (i % 900) * 10, (i / 900) * 10, i),
            1 => format!("PIN {} {}", ((i - 1) % 900) * 10 + 1, ((i - 1) / 900) * 10 + 1),
            2 => "GET color=red".to_string(),
            _ => "GET PINS".to_string(),
        };
        let _ = dispatch(&line, &board).await;
    }

    let duration = start.elapsed();
    println!(
        "Dispatch: {} requests in {:?} ({:.2} μs/request)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(board.audit().await.is_empty());
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}
