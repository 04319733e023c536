//! Session router and the readiness-driven server loop.
//!
//! A single thread owns every connection and every table. The
//! [`Server`] assigns each accepted connection a player id and a seat,
//! forwards decoded actions to the owning table, and fans the resulting
//! events back out with per-recipient visibility: hole cards reach only
//! their owner, errors reach only the offender, and everything else
//! reaches the whole table.

use log::{debug, info, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::messages::{Action, Response};
use super::utils::{self, FrameBuffer};
use crate::errors::{Error, GameError, ServerError};
use crate::game::constants::MAX_CONNECTIONS;
use crate::game::entities::{PlayerId, TableId};
use crate::game::table::{Event, Table};

const LISTENER: Token = Token(0);
const EVENT_CAPACITY: usize = 64;
const READ_CHUNK: usize = 1024;
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// One client socket and its session state.
pub struct Connection {
    stream: TcpStream,
    inbound: FrameBuffer,
    outbound: Vec<u8>,
    pub player_id: PlayerId,
    /// `0` until the session assigns a table.
    pub table_id: TableId,
    /// Dead connections are kept just long enough to flush any pending
    /// error frame, then reaped.
    pub is_dead: bool,
}

/// What to deliver: a batch of events or a single error.
pub enum Outbound {
    Events(Vec<Event>),
    Error(Error),
}

/// The result of accepting a connection. Events produced here are the
/// caller's to publish to the appropriate audience.
pub struct ConnectOutcome {
    pub player_id: PlayerId,
    pub table_id: TableId,
    pub result: Result<Event, Error>,
}

fn event_visible_to(event: &Event, viewer: PlayerId) -> bool {
    match event {
        Event::DealtHole { who, .. } => *who == viewer,
        _ => true,
    }
}

pub struct Server {
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<PlayerId, Connection>,
    tables: HashMap<TableId, Table>,
    next_player_id: PlayerId,
    next_table_id: TableId,
    seed: u64,
}

impl Server {
    /// Bind the listener and set up the poll registry. `seed` is the
    /// base for per-table RNG seeds.
    pub fn bind(addr: SocketAddr, seed: u64) -> io::Result<Self> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(addr)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        Ok(Self {
            poll,
            listener,
            connections: HashMap::new(),
            tables: HashMap::new(),
            next_player_id: 1,
            next_table_id: 1,
            seed,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Register a fresh connection, allocate its player id, and seat it
    /// at a table with room, creating a table if every table is full.
    pub fn handle_connect(&mut self, stream: TcpStream) -> io::Result<ConnectOutcome> {
        let player_id = self.next_player_id;
        self.next_player_id += 1;
        let mut conn = Connection {
            stream,
            inbound: FrameBuffer::default(),
            outbound: Vec::new(),
            player_id,
            table_id: 0,
            is_dead: true,
        };
        self.poll.registry().register(
            &mut conn.stream,
            Token(player_id as usize),
            Interest::READABLE | Interest::WRITABLE,
        )?;
        self.connections.insert(player_id, conn);
        info!("accepted connection for player {player_id}");

        if self.connections.len() > MAX_CONNECTIONS {
            warn!(
                "too many clients connected ({}), rejecting player {player_id}",
                self.connections.len()
            );
            return Ok(ConnectOutcome {
                player_id,
                table_id: 0,
                result: Err(ServerError::TooManyClients.into()),
            });
        }

        let table_id = self.find_or_create_table();
        let result = match self.tables.get_mut(&table_id) {
            Some(table) => table.add_player(player_id).map_err(Error::from),
            None => Err(ServerError::AllTablesFull.into()),
        };
        if let Some(conn) = self.connections.get_mut(&player_id) {
            conn.table_id = table_id;
            conn.is_dead = result.is_err();
        }
        match &result {
            Ok(_) => info!("seated player {player_id} at table {table_id}"),
            Err(error) => {
                warn!("failed to seat player {player_id} at table {table_id}: {error}");
            }
        }
        Ok(ConnectOutcome {
            player_id,
            table_id,
            result,
        })
    }

    /// Tear down a connection: drop it from the session, deregister its
    /// socket, and pull the player from their table. Removal events are
    /// intentionally not broadcast; peers learn of the departure from
    /// subsequent game events.
    pub fn handle_close(&mut self, id: PlayerId) {
        let Some(mut conn) = self.connections.remove(&id) else {
            warn!("attempted close on player {id} which does not exist");
            return;
        };
        if let Err(error) = self.poll.registry().deregister(&mut conn.stream) {
            debug!("failed to deregister player {id}: {error}");
        }
        if conn.table_id != 0 {
            if let Some(table) = self.tables.get_mut(&conn.table_id) {
                if let Err(error) = table.remove_player(id) {
                    warn!(
                        "failed to remove player {id} from table {}: {error}",
                        conn.table_id
                    );
                }
            }
        }
        info!("closed connection for player {id}");
    }

    /// Start a hand if the table is idle and has at least two players,
    /// returning the start-of-hand events for the caller to publish.
    pub fn maybe_start_hand(&mut self, table_id: TableId) -> Option<Vec<Event>> {
        let table = self.tables.get_mut(&table_id)?;
        if !table.can_start_hand() {
            return None;
        }
        match table.handle_new_hand() {
            Ok(events) => Some(events),
            Err(error) => {
                debug!("table {table_id} could not start a hand: {error}");
                None
            }
        }
    }

    /// Route a decoded wire action to the sender's table.
    pub fn apply_action(&mut self, action: Action, id: PlayerId) -> Result<Vec<Event>, Error> {
        let table_id = match self.connections.get(&id) {
            Some(conn) if conn.table_id != 0 => conn.table_id,
            _ => return Err(ServerError::IllegalAction.into()),
        };
        let Some(table) = self.tables.get_mut(&table_id) else {
            return Err(ServerError::IllegalAction.into());
        };
        table.on_action(action.into_game(id)).map_err(Error::from)
    }

    /// Queue an outbound frame for a single player. This is the only
    /// path by which errors reach a client.
    pub fn push_one(&mut self, id: PlayerId, outbound: &Outbound) {
        let response = match outbound {
            Outbound::Events(events) => Response::from_events(events),
            Outbound::Error(error) => Response::from_error(*error),
        };
        self.enqueue(id, &response);
        self.update_interest(id);
    }

    /// Queue an outbound frame for every member of a table, filtered to
    /// what each recipient may see. Errors are never broadcast.
    pub fn push_table(&mut self, table_id: TableId, outbound: &Outbound) {
        let events = match outbound {
            Outbound::Events(events) => events,
            Outbound::Error(_) => {
                warn!("attempted to broadcast an error to table {table_id}; dropping");
                return;
            }
        };
        let members: Vec<PlayerId> = self
            .connections
            .values()
            .filter(|conn| conn.table_id == table_id)
            .map(|conn| conn.player_id)
            .collect();
        for id in members {
            let visible: Vec<Event> = events
                .iter()
                .filter(|event| event_visible_to(event, id))
                .cloned()
                .collect();
            if !visible.is_empty() {
                self.enqueue(id, &Response::from_events(&visible));
            }
            self.update_interest(id);
        }
    }

    /// Run the event loop until `stop` is raised. Each readiness batch
    /// is processed to completion before the thread sleeps again.
    pub fn run(&mut self, stop: &AtomicBool) -> io::Result<()> {
        let mut events = Events::with_capacity(EVENT_CAPACITY);
        info!("started server on {}", self.local_addr()?);
        while !stop.load(Ordering::Relaxed) {
            if let Err(error) = self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                if error.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(error);
            }
            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_clients(),
                    Token(raw) => {
                        let id = raw as PlayerId;
                        if event.is_readable() {
                            self.drain_inbound(id);
                        }
                        if event.is_writable() {
                            self.flush_outbound(id);
                        }
                        self.reap_or_refresh(id);
                    }
                }
            }
        }
        info!("server stopping");
        Ok(())
    }

    fn find_or_create_table(&mut self) -> TableId {
        if let Some((&id, _)) = self.tables.iter().find(|(_, table)| table.has_open_seat()) {
            return id;
        }
        let id = self.next_table_id;
        self.next_table_id += 1;
        let rng = StdRng::seed_from_u64(self.seed ^ id);
        self.tables.insert(id, Table::new(rng));
        info!("created table {id}");
        id
    }

    fn accept_clients(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    debug!("accepted connection from {addr}");
                    match self.handle_connect(stream) {
                        Ok(outcome) => self.greet(outcome),
                        Err(error) => warn!("failed to register connection: {error}"),
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) => {
                    warn!("accept failed: {error}");
                    break;
                }
            }
        }
    }

    /// Publish a connect outcome: announce the seat and start a hand if
    /// one can start, or deliver the rejection to the newcomer alone.
    fn greet(&mut self, outcome: ConnectOutcome) {
        match outcome.result {
            Ok(event) => {
                self.push_table(outcome.table_id, &Outbound::Events(vec![event]));
                if let Some(started) = self.maybe_start_hand(outcome.table_id) {
                    self.push_table(outcome.table_id, &Outbound::Events(started));
                }
            }
            Err(error) => {
                self.push_one(outcome.player_id, &Outbound::Error(error));
                self.flush_outbound(outcome.player_id);
                self.reap_or_refresh(outcome.player_id);
            }
        }
    }

    fn drain_inbound(&mut self, id: PlayerId) {
        enum ReadOutcome {
            Open,
            Closed,
        }
        let outcome = {
            let Some(conn) = self.connections.get_mut(&id) else {
                return;
            };
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                match conn.stream.read(&mut chunk) {
                    Ok(0) => {
                        info!("peer closed connection for player {id}");
                        break ReadOutcome::Closed;
                    }
                    Ok(n) => conn.inbound.extend(&chunk[..n]),
                    Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                        break ReadOutcome::Open;
                    }
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                    Err(error) => {
                        warn!("read error for player {id}: {error}");
                        break ReadOutcome::Closed;
                    }
                }
            }
        };
        if matches!(outcome, ReadOutcome::Closed) {
            self.handle_close(id);
            return;
        }

        let mut frames = Vec::new();
        if let Some(conn) = self.connections.get_mut(&id) {
            loop {
                match conn.inbound.try_parse_frame() {
                    Ok(Some(frame)) => frames.push(frame),
                    Ok(None) => break,
                    Err(error) => {
                        warn!("unframeable bytes from player {id}: {error}");
                        conn.is_dead = true;
                        break;
                    }
                }
            }
        }
        for frame in frames {
            self.dispatch_frame(id, &frame);
        }
    }

    /// Decode one inbound frame and route it. The outcome goes to the
    /// whole table on success and only to the offender on failure.
    fn dispatch_frame(&mut self, id: PlayerId, frame: &[u8]) {
        let action: Action = match utils::decode(frame) {
            Ok(action) => action,
            Err(_) => {
                warn!("invalid action payload from player {id}");
                self.push_one(id, &Outbound::Error(GameError::InvalidAction.into()));
                return;
            }
        };
        info!("received action from player {id}: {action}");
        let table_id = self.connections.get(&id).map_or(0, |conn| conn.table_id);
        match self.apply_action(action, id) {
            Ok(events) => {
                self.push_table(table_id, &Outbound::Events(events));
                if let Some(started) = self.maybe_start_hand(table_id) {
                    self.push_table(table_id, &Outbound::Events(started));
                }
            }
            Err(error) => {
                info!("action rejected for player {id}: {error}");
                self.push_one(id, &Outbound::Error(error));
            }
        }
    }

    fn enqueue(&mut self, id: PlayerId, response: &Response) {
        if let Some(conn) = self.connections.get_mut(&id) {
            if let Err(error) = utils::write_prefixed(&mut conn.outbound, response) {
                warn!("failed to encode response for player {id}: {error}");
            }
        }
    }

    /// Write as much of the outbound buffer as the socket accepts;
    /// partial writes resume from the remaining tail on the next
    /// write-readiness.
    fn flush_outbound(&mut self, id: PlayerId) {
        let Some(conn) = self.connections.get_mut(&id) else {
            return;
        };
        while !conn.outbound.is_empty() {
            match conn.stream.write(&conn.outbound) {
                Ok(written) => {
                    conn.outbound.drain(..written);
                    debug!("wrote {written} bytes to player {id}");
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    warn!("write error for player {id}: {error}");
                    conn.is_dead = true;
                    break;
                }
            }
        }
    }

    fn reap_or_refresh(&mut self, id: PlayerId) {
        let is_dead = match self.connections.get(&id) {
            Some(conn) => conn.is_dead,
            None => return,
        };
        if is_dead {
            self.handle_close(id);
        } else {
            self.update_interest(id);
        }
    }

    /// Ask for write-readiness only while bytes are pending.
    fn update_interest(&mut self, id: PlayerId) {
        let registry = self.poll.registry();
        if let Some(conn) = self.connections.get_mut(&id) {
            let interest = if conn.outbound.is_empty() {
                Interest::READABLE
            } else {
                Interest::READABLE | Interest::WRITABLE
            };
            if let Err(error) =
                registry.reregister(&mut conn.stream, Token(conn.player_id as usize), interest)
            {
                warn!("failed to update interest for player {id}: {error}");
            }
        }
    }
}
