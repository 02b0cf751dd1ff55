use std::{borrow::Cow, ops::ControlFlow, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::{mpsc, oneshot},
    time::{Instant, MissedTickBehavior},
};

use crate::{
    chunk::{self, MAX_LINE_LENGTH},
    command::{numeric, ERROR, JOIN, NICK, PASS, PING, PONG, PRIVMSG, QUIT, USER},
    config::Channel,
    Config, Error, Event, Frame, Pacer, PendingSend, Privmsg,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const EVENT_BUFFER: usize = 256;

pub type Events = mpsc::Receiver<Event>;

/// Where a session is in its lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    HandshakePending,
    NickNegotiating,
    Registered,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SendOptions {
    /// Terminate the line with `\r\n` if it isn't already
    pub crlf: bool,
    /// Queue the line behind the pacer instead of writing it now
    pub throttle: bool,
}

impl SendOptions {
    pub const IMMEDIATE: Self = Self {
        crlf: true,
        throttle: false,
    };

    pub const THROTTLED: Self = Self {
        crlf: true,
        throttle: true,
    };
}

impl Default for SendOptions {
    fn default() -> Self {
        Self::IMMEDIATE
    }
}

type NickReply = oneshot::Sender<Result<String, Error>>;

enum Request {
    Send {
        data: String,
        options: SendOptions,
        chunk: Option<(usize, usize)>,
    },
    Nick {
        nickname: String,
        reply: NickReply,
    },
    Quit {
        reason: Option<String>,
    },
}

/// A nickname we've asked for and are waiting to hear back about
struct NickAttempt {
    proposed: String,
    tries: usize,
    /// Set until the session registered for the first time
    initial: bool,
    reply: Option<NickReply>,
}

enum Outcome {
    InUse,
    Accepted,
}

/// Sends requests to a running [`Session`].
#[derive(Clone, Debug)]
pub struct Handle {
    requests: mpsc::UnboundedSender<Request>,
}

impl Handle {
    fn request(&self, request: Request) -> Result<(), Error> {
        self.requests
            .send(request)
            .map_err(|_| Error::NotConnected)
    }

    pub fn send(&self, data: impl Into<String>, options: SendOptions) -> Result<(), Error> {
        self.request(Request::Send {
            data: data.into(),
            options,
            chunk: None,
        })
    }

    /// Writes a line right away
    pub fn raw(&self, data: impl Into<String>) -> Result<(), Error> {
        self.send(data, SendOptions::IMMEDIATE)
    }

    /// Sends `text` to `target` as paced `PRIVMSG` lines, returning the lines
    pub fn privmsg(&self, target: &str, text: &str) -> Result<Vec<String>, Error> {
        let lines = chunk::reply_lines(target, text);
        let total = lines.len();
        for (index, line) in lines.iter().enumerate() {
            self.request(Request::Send {
                data: line.clone(),
                options: SendOptions::THROTTLED,
                chunk: (total > 1).then_some((index + 1, total)),
            })?;
        }
        Ok(lines)
    }

    /// Answers a message where it came from
    pub fn reply(&self, msg: &Privmsg, text: &str) -> Result<Vec<String>, Error> {
        self.privmsg(msg.reply_target(), text)
    }

    pub fn join(&self, channel: &str, password: Option<&str>) -> Result<(), Error> {
        let frame = Frame::new(JOIN).param(channel);
        let frame = match password {
            Some(password) => frame.param(password),
            None => frame,
        };
        self.raw(frame.to_string())
    }

    /// Asks for a new nickname and waits for the server's verdict
    pub async fn nick(&self, nickname: &str) -> Result<String, Error> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Nick {
            nickname: nickname.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| Error::NotConnected)?
    }

    pub fn quit(&self, reason: Option<&str>) -> Result<(), Error> {
        self.request(Request::Quit {
            reason: reason.map(ToString::to_string),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }
}

/// One connection to one server.
///
/// Everything happens on the task that calls [`Session::run`]: reading
/// lines, answering requests from [`Handle`]s and draining the [`Pacer`].
pub struct Session<R, W> {
    reader: R,
    writer: W,
    buf: Vec<u8>,
    /// Set while skipping the rest of a line that was too long
    discarding: bool,

    config: Arc<Config>,
    phase: Phase,
    nickname: Option<String>,
    awaiting: Option<NickAttempt>,
    pacer: Pacer,

    events: mpsc::Sender<Event>,
    requests: mpsc::UnboundedReceiver<Request>,
}

impl Session<BufReader<OwnedReadHalf>, OwnedWriteHalf> {
    pub async fn connect(config: Config) -> Result<(Self, Handle, Events), Error> {
        let addr = config.addr();
        log::info!("connecting to {addr} ({})", config.server_name);

        let stream = match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(Error::Connect { addr, source }),
            Err(..) => {
                let source = std::io::Error::from(std::io::ErrorKind::TimedOut);
                return Err(Error::Connect { addr, source });
            }
        };

        let (read, write) = stream.into_split();
        Ok(Self::new(BufReader::new(read), write, config))
    }
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a session over an already connected stream
    pub fn new(reader: R, writer: W, config: Config) -> (Self, Handle, Events) {
        let (events, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let handle = Handle {
            requests: requests_tx,
        };

        let mut this = Self {
            reader,
            writer,
            buf: Vec::with_capacity(MAX_LINE_LENGTH),
            discarding: false,

            pacer: Pacer::new(config.throttle()),
            config: Arc::new(config),
            phase: Phase::Connecting,
            nickname: None,
            awaiting: None,

            events,
            requests,
        };
        this.transition(Phase::HandshakePending);

        (this, handle, events_rx)
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The nickname the server last confirmed
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Registers and then processes lines until the connection ends.
    ///
    /// A `QUIT` or the server closing the socket is a normal end, socket
    /// errors are returned.
    pub async fn run(mut self) -> Result<(), Error> {
        let result = self.drive().await;
        if let Err(err) = &result {
            log::warn!("{}: session failed: {err}", self.config.server_name);
        }

        self.transition(Phase::Disconnected);
        self.emit(Event::Disconnected).await;
        result
    }

    async fn drive(&mut self) -> Result<(), Error> {
        self.handshake().await?;

        let mut tick = tokio::time::interval(Pacer::TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                read = read_line(&mut self.reader, &mut self.buf) => {
                    if read? == 0 {
                        log::info!("{}: connection closed", self.config.server_name);
                        return Ok(());
                    }
                    if let Some(line) = self.take_line() {
                        self.process_line(&line).await?;
                    }
                }

                Some(request) = self.requests.recv() => {
                    if self.handle_request(request).await?.is_break() {
                        return Ok(());
                    }
                }

                _ = tick.tick() => {
                    if let Some(send) = self.pacer.poll(Instant::now()) {
                        if let Some((index, total)) = send.chunk {
                            log::trace!(target: "perch_irc", "chunk {index}/{total}");
                        }
                        self.transmit(&send.line).await?;
                    }
                }
            }
        }
    }

    /// Takes a complete line out of the buffer. Lines longer than
    /// [`MAX_LINE_LENGTH`] are thrown away whole.
    fn take_line(&mut self) -> Option<String> {
        if self.buf.last() != Some(&b'\n') {
            if self.buf.len() >= MAX_LINE_LENGTH {
                if !self.discarding {
                    log::warn!(
                        "{}: discarding a line longer than {MAX_LINE_LENGTH} bytes",
                        self.config.server_name
                    );
                }
                self.discarding = true;
                self.buf.clear();
            }
            return None;
        }

        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        Some(line)
    }

    async fn handshake(&mut self) -> Result<(), Error> {
        let config = Arc::clone(&self.config);

        if let Some(password) = &config.password {
            self.send_frame(Frame::new(PASS).param(password.value()))
                .await?;
        }

        self.propose(NickAttempt {
            proposed: config.nickname.clone(),
            tries: 0,
            initial: true,
            reply: None,
        })
        .await?;

        let user = Frame::new(USER)
            .param(config.username())
            .param(config.user_mode().to_string())
            .param("*")
            .trailing(config.real_name());
        self.send_frame(user).await
    }

    /// Sends a line now, or hands it to the pacer.
    pub async fn send(&mut self, data: &str, options: SendOptions) -> Result<(), Error> {
        self.send_chunk(data, options, None).await
    }

    async fn send_chunk(
        &mut self,
        data: &str,
        options: SendOptions,
        chunk: Option<(usize, usize)>,
    ) -> Result<(), Error> {
        if matches!(self.phase, Phase::Disconnected | Phase::Connecting) {
            return Err(Error::NotConnected);
        }

        let line = terminate(data, options.crlf);
        if options.throttle {
            self.pacer.enqueue(PendingSend {
                line: line.into_owned(),
                chunk,
            });
            return Ok(());
        }

        self.transmit(&line).await?;
        self.pacer.sent(Instant::now());
        Ok(())
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), Error> {
        self.send(&frame.to_string(), SendOptions::IMMEDIATE).await
    }

    async fn transmit(&mut self, line: &str) -> Result<(), Error> {
        log::trace!(target: "perch_irc", "-> {}", line.escape_debug());
        self.emit(Event::RawSent(line.trim_end_matches(['\r', '\n']).to_string()))
            .await;

        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn process_line(&mut self, line: &str) -> Result<(), Error> {
        log::trace!(target: "perch_irc", "<- {}", line.escape_debug());

        let frame = Frame::decode(line);
        if frame.is_malformed() {
            log::warn!("ignoring malformed line: {}", line.escape_debug());
            return Ok(());
        }

        self.emit(Event::Frame(frame.clone())).await;

        match frame.command.as_str() {
            PING => {
                let token = frame.last_arg().unwrap_or_default();
                self.send_frame(Frame::new(PONG).trailing(token)).await?;
            }
            PRIVMSG => {
                if let Some(msg) = Privmsg::from_frame(&frame, self.nickname()) {
                    log::debug!("[{}] {}: {}", msg.target, msg.sender, msg.text);
                    self.emit(Event::Privmsg(msg)).await;
                }
            }
            ERROR => {
                log::warn!(
                    "{}: server error: {}",
                    self.config.server_name,
                    frame.last_arg().unwrap_or_default()
                );
            }
            _ => {}
        }

        self.resolve_nick(&frame).await
    }

    async fn resolve_nick(&mut self, frame: &Frame) -> Result<(), Error> {
        let Some(attempt) = self.awaiting.take() else {
            self.track_nick(frame);
            return Ok(());
        };

        match self.outcome(frame, &attempt) {
            Some(Outcome::InUse) => self.retry(attempt).await,
            Some(Outcome::Accepted) => self.accept(attempt).await,
            None => {
                self.awaiting.replace(attempt);
                self.track_nick(frame);
                Ok(())
            }
        }
    }

    fn outcome(&self, frame: &Frame, attempt: &NickAttempt) -> Option<Outcome> {
        match frame.command.as_str() {
            numeric::ERR_NICKNAMEINUSE => Some(Outcome::InUse),
            numeric::RPL_WELCOME => Some(Outcome::Accepted),
            NICK if self.is_own(frame) && frame.arg(0) == Some(&*attempt.proposed) => {
                Some(Outcome::Accepted)
            }
            _ => None,
        }
    }

    fn is_own(&self, frame: &Frame) -> bool {
        matches!((frame.nickname(), self.nickname()), (Some(from), Some(own)) if from == own)
    }

    // the server renamed us without being asked
    fn track_nick(&mut self, frame: &Frame) {
        if frame.command != NICK || !self.is_own(frame) {
            return;
        }
        if let Some(nickname) = frame.arg(0) {
            log::info!("{}: nickname is now {nickname}", self.config.server_name);
            self.nickname.replace(nickname.to_string());
        }
    }

    async fn propose(&mut self, attempt: NickAttempt) -> Result<(), Error> {
        log::debug!(
            "{}: proposing nickname {} (attempt {})",
            self.config.server_name,
            attempt.proposed,
            attempt.tries + 1
        );

        let nick = Frame::new(NICK).param(attempt.proposed.as_str());
        if self.phase != Phase::Registered {
            self.transition(Phase::NickNegotiating);
        }
        self.awaiting.replace(attempt);
        self.send_frame(nick).await
    }

    async fn retry(&mut self, attempt: NickAttempt) -> Result<(), Error> {
        let tries = attempt.tries + 1;
        if !self.config.autotry_next_nick || tries >= self.config.max_nick_tries {
            self.exhausted(attempt).await;
            return Ok(());
        }

        log::info!(
            "{}: nickname {} is in use",
            self.config.server_name,
            attempt.proposed
        );
        let proposed = format!("{}0", attempt.proposed);
        self.propose(NickAttempt {
            proposed,
            tries,
            ..attempt
        })
        .await
    }

    async fn exhausted(&mut self, attempt: NickAttempt) {
        log::warn!(
            "{}: giving up on nickname {} after {} attempts",
            self.config.server_name,
            attempt.proposed,
            attempt.tries + 1
        );

        match attempt.reply {
            Some(reply) => {
                let _ = reply.send(Err(Error::NickExhausted(attempt.proposed)));
            }
            None => {
                let nickname = attempt.proposed;
                self.emit(Event::NickExhausted { nickname }).await
            }
        }
    }

    async fn accept(&mut self, attempt: NickAttempt) -> Result<(), Error> {
        let NickAttempt {
            proposed,
            initial,
            reply,
            ..
        } = attempt;

        log::info!("{}: registered as {proposed}", self.config.server_name);
        self.nickname.replace(proposed.clone());
        self.transition(Phase::Registered);

        if let Some(reply) = reply {
            let _ = reply.send(Ok(proposed.clone()));
        }

        if initial {
            if let Some(join) = join_line(&self.config.initial_channels) {
                self.send_frame(join).await?;
            }
            self.emit(Event::Connected { nickname: proposed }).await;
        }
        Ok(())
    }

    async fn handle_request(&mut self, request: Request) -> Result<ControlFlow<()>, Error> {
        match request {
            Request::Send {
                data,
                options,
                chunk,
            } => self.send_chunk(&data, options, chunk).await?,

            Request::Nick { nickname, reply } => {
                if let Some(pending) = &self.awaiting {
                    let _ = reply.send(Err(Error::NickPending(pending.proposed.clone())));
                } else if self.nickname() == Some(&*nickname) {
                    let _ = reply.send(Ok(nickname));
                } else {
                    let initial = self.phase != Phase::Registered;
                    self.propose(NickAttempt {
                        proposed: nickname,
                        tries: 0,
                        initial,
                        reply: Some(reply),
                    })
                    .await?
                }
            }

            Request::Quit { reason } => {
                let quit = match reason {
                    Some(reason) => Frame::new(QUIT).trailing(reason),
                    None => Frame::new(QUIT),
                };
                self.send_frame(quit).await?;
                let _ = self.writer.shutdown().await;
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn emit(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            log::trace!(target: "perch_irc", "nobody is listening for events");
        }
    }

    fn transition(&mut self, next: Phase) {
        if self.phase != next {
            log::debug!(
                "{}: {:?} -> {:?}",
                self.config.server_name,
                self.phase,
                next
            );
            self.phase = next;
        }
    }
}

/// Reads until a newline, but never lets `buf` grow past [`MAX_LINE_LENGTH`]
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_LINE_LENGTH.saturating_sub(buf.len()).max(1);
    reader.take(limit as u64).read_until(b'\n', buf).await
}

fn terminate(data: &str, crlf: bool) -> Cow<'_, str> {
    if !crlf || data.ends_with("\r\n") {
        return Cow::Borrowed(data);
    }
    Cow::Owned(format!("{}\r\n", data.trim_end_matches(['\r', '\n'])))
}

/// One `JOIN` for every channel. Keyed channels go first so the keys line up
/// with their channels by position.
fn join_line(channels: &[Channel]) -> Option<Frame> {
    if channels.is_empty() {
        return None;
    }

    let (keyed, open): (Vec<_>, Vec<_>) = channels.iter().partition(|c| c.password.is_some());

    let names = keyed
        .iter()
        .chain(&open)
        .map(|c| &*c.name)
        .collect::<Vec<_>>()
        .join(",");

    let keys = keyed
        .iter()
        .filter_map(|c| c.password.as_deref())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");

    let join = Frame::new(JOIN).param(names);
    Some(if keys.is_empty() {
        join
    } else {
        join.param(keys)
    })
}
