//! A minimal client for the SAM v3 bridge: the line protocol I2P routers
//! expose for applications.
//!
//! Only the subset the tracker needs is implemented: the HELLO handshake,
//! destination generation, STREAM sessions, NAMING lookups and STREAM
//! ACCEPT. Control connections stay open for the lifetime of the session,
//! as the bridge tears the tunnel down when they close.
use std::collections::HashMap;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::network::Error;

const SAM_HELLO: &str = "HELLO VERSION MIN=3.0 MAX=3.1\n";

/// A freshly generated or loaded I2P destination key pair, in the transport
/// encoding the bridge hands out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestKeys {
    /// The public destination: what other peers dial.
    pub public: String,
    /// The private key blob the session is created from.
    pub private: String,
}

/// It reads one `\n`-terminated line without buffering past it, so the
/// stream can be handed over as a raw connection afterwards.
async fn read_line(stream: &mut TcpStream) -> Result<String, Error> {
    let mut line = Vec::with_capacity(128);
    loop {
        let byte = stream.read_u8().await?;
        if byte == b'\n' {
            break;
        }
        line.push(byte);
        if line.len() > 8192 {
            return Err(Error::Sam("oversized reply line".to_string()));
        }
    }
    String::from_utf8(line).map_err(|_| Error::Sam("reply is not utf-8".to_string()))
}

/// It parses a SAM reply line into its `KEY=VALUE` pairs, skipping the two
/// leading verb tokens.
fn parse_reply(line: &str) -> HashMap<String, String> {
    line.split_whitespace()
        .skip(2)
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn expect_ok(verb: &str, reply: &HashMap<String, String>) -> Result<(), Error> {
    match reply.get("RESULT").map(String::as_str) {
        Some("OK") => Ok(()),
        Some(result) => {
            let message = reply.get("MESSAGE").cloned().unwrap_or_default();
            Err(Error::Sam(format!("{verb} failed: {result} {message}")))
        }
        None => Err(Error::Sam(format!("{verb} reply carries no result"))),
    }
}

/// A handle to the SAM bridge.
pub struct Sam {
    address: String,
}

impl Sam {
    #[must_use]
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }

    /// It opens a fresh bridge connection and completes the HELLO handshake.
    async fn handshake(&self) -> Result<TcpStream, Error> {
        let mut stream = TcpStream::connect(&self.address).await?;

        stream.write_all(SAM_HELLO.as_bytes()).await?;
        let reply = read_line(&mut stream).await?;
        expect_ok("HELLO", &parse_reply(&reply))?;

        Ok(stream)
    }

    /// It asks the bridge for a new destination key pair.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the bridge is unreachable or refuses.
    pub async fn generate_destination(&self) -> Result<DestKeys, Error> {
        let mut stream = self.handshake().await?;

        stream.write_all(b"DEST GENERATE\n").await?;
        let reply = parse_reply(&read_line(&mut stream).await?);

        match (reply.get("PUB"), reply.get("PRIV")) {
            (Some(public), Some(private)) => Ok(DestKeys {
                public: public.clone(),
                private: private.clone(),
            }),
            _ => Err(Error::Sam("DEST GENERATE reply carries no keys".to_string())),
        }
    }

    /// It creates a STREAM session bound to the given keys. The returned
    /// session owns the control connection; dropping it closes the tunnel.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if session creation fails, e.g. a duplicate
    /// session id.
    pub async fn create_stream_session(
        &self,
        id: &str,
        keys: &DestKeys,
        options: &HashMap<String, String>,
    ) -> Result<Session, Error> {
        let mut control = self.handshake().await?;

        let mut command = format!("SESSION CREATE STYLE=STREAM ID={id} DESTINATION={}", keys.private);
        for (key, value) in options {
            command.push_str(&format!(" {key}={value}"));
        }
        command.push('\n');

        control.write_all(command.as_bytes()).await?;
        let reply = parse_reply(&read_line(&mut control).await?);
        expect_ok("SESSION CREATE", &reply)?;

        Ok(Session {
            sam_address: self.address.clone(),
            id: id.to_string(),
            keys: keys.clone(),
            _control: Mutex::new(control),
        })
    }
}

/// An established STREAM session.
pub struct Session {
    sam_address: String,
    id: String,
    keys: DestKeys,
    /// Held open for the session lifetime; the bridge closes the tunnel with
    /// it.
    _control: Mutex<TcpStream>,
}

impl Session {
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.keys.public
    }

    /// It resolves a symbolic name (`x.i2p`, `x.b32.i2p`) to a destination.
    ///
    /// Lookups run on a dedicated bridge connection so they never interleave
    /// with accepts.
    ///
    /// # Errors
    ///
    /// Will return an `Error` for unknown names or bridge failures.
    pub async fn lookup(&self, name: &str) -> Result<String, Error> {
        let mut stream = Sam::new(&self.sam_address).handshake().await?;

        stream.write_all(format!("NAMING LOOKUP NAME={name}\n").as_bytes()).await?;
        let reply = parse_reply(&read_line(&mut stream).await?);
        expect_ok("NAMING LOOKUP", &reply)?;

        reply
            .get("VALUE")
            .cloned()
            .ok_or_else(|| Error::Sam(format!("no value for name {name}")))
    }

    /// It blocks until a peer dials the session's destination, then returns
    /// the raw stream and the peer's destination.
    ///
    /// The bridge protocol sends one line carrying the remote destination
    /// before the payload bytes; everything after it belongs to the peer.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the bridge refuses the accept.
    pub async fn accept(&self) -> Result<(TcpStream, String), Error> {
        let mut stream = Sam::new(&self.sam_address).handshake().await?;

        stream
            .write_all(format!("STREAM ACCEPT ID={} SILENT=false\n", self.id).as_bytes())
            .await?;
        let reply = parse_reply(&read_line(&mut stream).await?);
        expect_ok("STREAM ACCEPT", &reply)?;

        let preamble = read_line(&mut stream).await?;
        let destination = preamble
            .split_whitespace()
            .next()
            .ok_or_else(|| Error::Sam("accept preamble carries no destination".to_string()))?
            .to_string();

        Ok((stream, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::{expect_ok, parse_reply};

    #[test]
    fn it_should_parse_key_value_pairs_from_a_reply_line() {
        let reply = parse_reply("SESSION STATUS RESULT=OK DESTINATION=abcd");

        assert_eq!(reply.get("RESULT").unwrap(), "OK");
        assert_eq!(reply.get("DESTINATION").unwrap(), "abcd");
    }

    #[test]
    fn it_should_accept_an_ok_result() {
        let reply = parse_reply("STREAM STATUS RESULT=OK");

        assert!(expect_ok("STREAM ACCEPT", &reply).is_ok());
    }

    #[test]
    fn it_should_reject_a_failed_result_with_its_message() {
        let reply = parse_reply("SESSION STATUS RESULT=DUPLICATED_ID MESSAGE=busy");

        let error = expect_ok("SESSION CREATE", &reply).unwrap_err();

        assert!(error.to_string().contains("DUPLICATED_ID"));
    }

    #[test]
    fn it_should_reject_a_reply_without_a_result() {
        let reply = parse_reply("NAMING REPLY NAME=tracker.i2p");

        assert!(expect_ok("NAMING LOOKUP", &reply).is_err());
    }
}
