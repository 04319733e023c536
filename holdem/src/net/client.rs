//! A low-level TCP poker client.
//!
//! This client is blocking and so is primarily used as a testing
//! utility rather than an actual poker client.

use anyhow::{Error, bail};
use std::{
    net::{SocketAddr, TcpStream},
    thread,
    time::Duration,
};

use super::{
    messages::{Action, Message, Response},
    utils,
};
use crate::game::entities::Chips;
use crate::game::table::Event;

/// Default timeout for reading from the server.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for writing to the server.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A blocking TCP client for driving a poker server.
pub struct Client {
    /// The underlying TCP stream.
    pub stream: TcpStream,
}

impl Client {
    /// Connect to a poker server.
    ///
    /// Connection attempts back off over three tries with decreasing
    /// timeouts. The server assigns the player id; the first response
    /// frames either the seat announcement or a rejection.
    ///
    /// # Errors
    ///
    /// Returns an error if no attempt gets through.
    pub fn connect(addr: &SocketAddr) -> Result<Self, Error> {
        let mut connect_timeouts = vec![
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        ];
        while let Some(connect_timeout) = connect_timeouts.pop() {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                    return Ok(Self { stream });
                }
                _ => thread::sleep(connect_timeout),
            }
        }
        bail!("couldn't connect to {addr}")
    }

    pub fn fold(&mut self) -> Result<(), Error> {
        self.take_action(Action::Fold)
    }

    pub fn bet(&mut self, amount: Chips) -> Result<(), Error> {
        self.take_action(Action::Bet { amount })
    }

    /// Check: a bet of zero chips.
    pub fn check(&mut self) -> Result<(), Error> {
        self.bet(0)
    }

    pub fn take_action(&mut self, action: Action) -> Result<(), Error> {
        utils::write_prefixed(&mut self.stream, &action)?;
        Ok(())
    }

    /// Receive the next response frame as-is, errors included.
    pub fn recv(&mut self) -> Result<Response, Error> {
        match utils::read_prefixed::<Response, TcpStream>(&mut self.stream) {
            Ok(response) => Ok(response),
            Err(error) => bail!(error),
        }
    }

    /// Receive the next response frame, failing if it carries an error.
    pub fn recv_events(&mut self) -> Result<Vec<Event>, Error> {
        let response = self.recv()?;
        let mut events = Vec::with_capacity(response.messages.len());
        for message in response.messages {
            match message {
                Message::Event(event) => events.push(event),
                Message::Error(error) => bail!(error),
            }
        }
        Ok(events)
    }

    /// Receive the next response frame, failing unless it is a single
    /// error.
    pub fn recv_error(&mut self) -> Result<crate::errors::Error, Error> {
        let response = self.recv()?;
        match response.messages.as_slice() {
            [Message::Error(error)] => Ok(*error),
            _ => bail!("expected an error response"),
        }
    }
}
