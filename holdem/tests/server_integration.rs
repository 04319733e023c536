//! Socket-level integration tests: a real server thread driven by
//! blocking clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use holdem::errors::{Error, GameError, ServerError};
use holdem::game::constants::{BIG_BLIND, MAX_CONNECTIONS, SMALL_BLIND};
use holdem::game::entities::{Chips, PlayerId};
use holdem::game::table::Event;
use holdem::net::client::Client;
use holdem::net::server::Server;

struct TestServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    fn start(seed: u64) -> Self {
        let mut server = Server::bind("127.0.0.1:0".parse().unwrap(), seed).unwrap();
        let addr = server.local_addr().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::spawn(move || {
            server.run(&flag).unwrap();
        });
        Self {
            addr,
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn dealt_to(events: &[Event]) -> Vec<PlayerId> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::DealtHole { who, .. } => Some(*who),
            _ => None,
        })
        .collect()
}

#[test]
fn seats_players_and_deals_privately() {
    let server = TestServer::start(0);
    let mut alice = Client::connect(&server.addr).unwrap();
    assert_eq!(
        alice.recv_events().unwrap(),
        vec![Event::PlayerAdded { who: 1 }]
    );

    let mut bob = Client::connect(&server.addr).unwrap();
    assert_eq!(
        alice.recv_events().unwrap(),
        vec![Event::PlayerAdded { who: 2 }]
    );
    assert_eq!(
        bob.recv_events().unwrap(),
        vec![Event::PlayerAdded { who: 2 }]
    );

    // Two players suffice: the hand starts on its own.
    let to_alice = alice.recv_events().unwrap();
    let to_bob = bob.recv_events().unwrap();

    assert_eq!(to_alice[0], Event::HandStarted);
    assert_eq!(dealt_to(&to_alice), vec![1], "alice sees only her cards");
    assert_eq!(dealt_to(&to_bob), vec![2], "bob sees only his cards");

    // Public events reach both, identically.
    let blinds = |events: &[Event]| -> Vec<(PlayerId, Chips)> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::BetPlaced { who, amount } => Some((*who, *amount)),
                _ => None,
            })
            .collect()
    };
    assert_eq!(blinds(&to_alice), vec![(1, SMALL_BLIND), (2, BIG_BLIND)]);
    assert_eq!(blinds(&to_alice), blinds(&to_bob));
    assert!(to_alice.contains(&Event::TurnAdvanced { next: 1 }));
}

#[test]
fn errors_reach_only_the_offender() {
    let server = TestServer::start(0);
    let mut alice = Client::connect(&server.addr).unwrap();
    alice.recv_events().unwrap();
    let mut bob = Client::connect(&server.addr).unwrap();
    alice.recv_events().unwrap();
    bob.recv_events().unwrap();
    alice.recv_events().unwrap();
    bob.recv_events().unwrap();

    // It is alice's turn; bob jumps the queue and is told off alone.
    bob.check().unwrap();
    assert_eq!(
        bob.recv_error().unwrap(),
        Error::Game(GameError::OutOfTurn)
    );

    // Alice's next frame is her own call, not bob's error.
    alice.bet(SMALL_BLIND).unwrap();
    let events = alice.recv_events().unwrap();
    assert_eq!(events[0], Event::BetPlaced { who: 1, amount: SMALL_BLIND });
}

#[test]
fn malformed_frames_get_invalid_action() {
    use std::io::Write;

    let server = TestServer::start(0);
    let mut alice = Client::connect(&server.addr).unwrap();
    alice.recv_events().unwrap();

    // A framed payload that is no Action at all.
    let garbage = [0u8, 0, 0, 3, 9, 9, 9];
    alice.stream.write_all(&garbage).unwrap();
    assert_eq!(
        alice.recv_error().unwrap(),
        Error::Game(GameError::InvalidAction)
    );
}

#[test]
fn departures_surface_through_the_next_game_event() {
    let server = TestServer::start(0);
    let mut alice = Client::connect(&server.addr).unwrap();
    alice.recv_events().unwrap();
    let mut bob = Client::connect(&server.addr).unwrap();
    alice.recv_events().unwrap();
    bob.recv_events().unwrap();
    alice.recv_events().unwrap();
    bob.recv_events().unwrap();

    // Alice hangs up mid-hand, on her turn. No notification goes out.
    drop(alice);
    thread::sleep(Duration::from_millis(300));

    // Bob checks: with alice gone he takes the blinds immediately.
    bob.check().unwrap();
    let events = bob.recv_events().unwrap();
    assert!(events.contains(&Event::BetPlaced { who: 2, amount: 0 }));
    assert!(events.contains(&Event::WonPot {
        who: 2,
        amount: SMALL_BLIND + BIG_BLIND,
    }));
}

#[test]
fn overflow_connections_are_rejected() {
    let server = TestServer::start(0);

    let mut held = Vec::new();
    for _ in 0..MAX_CONNECTIONS {
        held.push(Client::connect(&server.addr).unwrap());
    }

    let mut unlucky = Client::connect(&server.addr).unwrap();
    assert_eq!(
        unlucky.recv_error().unwrap(),
        Error::Server(ServerError::TooManyClients)
    );
}
