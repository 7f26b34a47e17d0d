//! Session state machine.
//!
//! A `Session` owns everything for one room membership: the handshake, both
//! identities, the message log, typing state and the departure countdown. It
//! consumes [`SessionEvent`]s and returns [`SessionAction`]s; the caller
//! performs all I/O.
//!
//! # Failure Containment
//!
//! Inbound frames never produce errors. A frame that fails to decode, decrypt
//! or apply is logged and dropped, and the session continues. Errors are only
//! returned for local intents that cannot be carried out.
//!
//! # Teardown
//!
//! Exit, countdown expiry, room-full rejection and transport closure all tear
//! the session down: secrets are zeroized, the log is cleared and every later
//! event returns no actions.

use burner_core::{
    Author, Content, DepartureCountdown, EditOrigin, Environment, MessageItem, MessageLog,
    TypingState,
};
use burner_crypto::{Envelope, NONCE_SIZE, SharedSecret, open, seal};
use burner_proto::{
    EncodedEnvelope, Frame, Inbound, MAX_FRAME_SIZE, MessageBody, ProtocolError, decode,
    decode_text,
};
use serde_json::Value;

use crate::{
    config::SessionConfig,
    error::SessionError,
    event::{SessionAction, SessionEvent, TeardownReason},
    handshake::{Handshake, HandshakeState, PeerKeyOutcome},
};

/// System notice recorded when the peer leaves.
const DEPARTURE_NOTICE: &str = "Peer has left. You will be redirected in";

/// AES-GCM tag length added to every sealed payload.
const TAG_SIZE: usize = 16;

/// Room for the JSON keys and MIME type around an image payload.
const IMG_FRAME_OVERHEAD: usize = 256;

/// Two-party chat session.
pub struct Session<E: Environment> {
    /// Environment for randomness and time.
    env: E,

    /// Timing configuration.
    config: SessionConfig,

    /// Our display name.
    local_name: String,

    /// Peer display name, fixed once received.
    peer_name: Option<String>,

    /// Keypair and shared secret.
    handshake: Handshake,

    /// Indexed conversation.
    log: MessageLog,

    /// Local debounce and remote typing flag.
    typing: TypingState<E::Instant>,

    /// Running while the peer is gone.
    departure: Option<DepartureCountdown<E::Instant>>,

    /// Set once; every later event is ignored.
    torn_down: bool,
}

impl<E: Environment> Session<E> {
    /// Join a room: generate the ephemeral keypair.
    ///
    /// # Errors
    ///
    /// - `KeyGeneration` if no keypair can be generated (fatal)
    pub fn join(
        env: E,
        local_name: impl Into<String>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let mut handshake = Handshake::new();
        handshake
            .generate(|buf| env.random_bytes(buf))
            .map_err(|err| SessionError::KeyGeneration { reason: err.to_string() })?;

        Ok(Self {
            env,
            config,
            local_name: local_name.into(),
            peer_name: None,
            handshake,
            log: MessageLog::new(),
            typing: TypingState::new(),
            departure: None,
            torn_down: false,
        })
    }

    /// Our display name.
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Peer display name, once announced.
    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.as_deref()
    }

    /// Handshake progress.
    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    /// True once the shared secret exists.
    pub fn is_established(&self) -> bool {
        self.handshake.is_established()
    }

    /// True after teardown.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// The message log.
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Whether the peer is typing.
    pub fn peer_typing(&self) -> bool {
        self.typing.remote()
    }

    /// Remaining departure countdown steps, if the peer has left.
    pub fn countdown(&self) -> Option<u8> {
        self.departure.as_ref().map(DepartureCountdown::remaining)
    }

    /// Configuration in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Only local intents fail: sending before the handshake completes,
    /// empty text, or addressing an index that cannot be used.
    pub fn handle(
        &mut self,
        event: SessionEvent<E::Instant>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.torn_down {
            tracing::trace!(?event, "ignoring event after teardown");
            return Ok(Vec::new());
        }

        match event {
            SessionEvent::Connected => Ok(self.handle_connected()),
            SessionEvent::FrameReceived(text) => Ok(self.handle_frame(&text)),
            SessionEvent::Tick { now } => Ok(self.handle_tick(now)),
            SessionEvent::SendText { text, reply_to } => self.handle_send_text(text, reply_to),
            SessionEvent::SendImage { mime, bytes } => self.handle_send_image(mime, bytes),
            SessionEvent::EditMessage { index, text } => self.handle_edit(index, text),
            SessionEvent::React { index, emoji } => self.handle_react(index, emoji),
            SessionEvent::Keystroke => Ok(self.handle_keystroke()),
            SessionEvent::Exit => Ok(self.teardown(TeardownReason::Exit)),
            SessionEvent::TransportClosed => Ok(self.teardown(TeardownReason::TransportClosed)),
        }
    }

    fn handle_connected(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::with_capacity(2);

        if let Some(own_key) = self.handshake.announce() {
            actions.push(SessionAction::Send(Frame::Key { data: own_key.to_json() }));
        }
        actions.push(SessionAction::Send(Frame::Name { data: self.local_name.clone() }));

        tracing::debug!(name = %self.local_name, "announced key and name");
        actions
    }

    fn handle_frame(&mut self, text: &str) -> Vec<SessionAction> {
        let inbound = match decode(text) {
            Ok(inbound) => inbound,
            Err(err) => {
                tracing::warn!(%err, "dropping undecodable frame");
                return Vec::new();
            },
        };

        match inbound {
            Inbound::RoomFull => {
                tracing::warn!("relay rejected join: room full");
                let mut actions = vec![SessionAction::RoomFull];
                actions.extend(self.teardown(TeardownReason::RoomFull));
                actions
            },
            Inbound::Unknown { kind } => {
                tracing::debug!(%kind, "ignoring unknown frame type");
                Vec::new()
            },
            Inbound::Frame(frame) => self.handle_inbound(frame),
        }
    }

    fn handle_inbound(&mut self, frame: Frame) -> Vec<SessionAction> {
        match frame {
            Frame::Key { data } => self.handle_peer_key(&data),
            Frame::Name { data } => self.handle_peer_name(data),
            Frame::Msg { data, iv } => self.handle_peer_msg(&EncodedEnvelope { data, iv }),
            Frame::Img { data, iv, mime } => self.handle_peer_img(&EncodedEnvelope { data, iv }, mime),
            Frame::Edit { index, data, iv } => {
                self.handle_peer_edit(index, &EncodedEnvelope { data, iv })
            },
            Frame::Reaction { index, emoji } => self.handle_peer_reaction(index, emoji),
            Frame::Typing => self.handle_peer_typing(true),
            Frame::StoppedTyping => self.handle_peer_typing(false),
            Frame::PeerLeft => self.handle_peer_left(),
        }
    }

    fn handle_peer_key(&mut self, jwk: &Value) -> Vec<SessionAction> {
        match self.handshake.receive_peer_key(jwk) {
            Ok(PeerKeyOutcome::Established { own_key }) => {
                tracing::info!("handshake established");
                vec![
                    SessionAction::Established,
                    SessionAction::Send(Frame::Key { data: own_key.to_json() }),
                    SessionAction::Send(Frame::Name { data: self.local_name.clone() }),
                ]
            },
            Ok(PeerKeyOutcome::Ignored) => {
                tracing::debug!("ignoring repeated peer key");
                Vec::new()
            },
            Err(err) => {
                tracing::warn!(%err, "rejected peer key");
                vec![SessionAction::HandshakeFailed { reason: err.to_string() }]
            },
        }
    }

    fn handle_peer_name(&mut self, name: String) -> Vec<SessionAction> {
        if let Some(existing) = &self.peer_name {
            if *existing != name {
                tracing::warn!(%existing, attempted = %name, "ignoring peer rename");
            }
            return Vec::new();
        }

        tracing::info!(peer = %name, "peer identified");
        self.peer_name = Some(name.clone());
        vec![SessionAction::PeerIdentified { name }]
    }

    fn handle_peer_msg(&mut self, envelope: &EncodedEnvelope) -> Vec<SessionAction> {
        let Some(secret) = self.handshake.secret() else {
            tracing::debug!("dropping msg received before handshake");
            return Vec::new();
        };

        let body = match open_encoded(secret, envelope)
            .and_then(|plaintext| MessageBody::decode(&plaintext).map_err(SessionError::from))
        {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(%err, "dropping undecryptable msg");
                return Vec::new();
            },
        };

        let reply_to = body.reply_to();
        let content = Content::Text(body.as_text().to_owned());
        self.append(Author::Peer, content, reply_to)
    }

    fn handle_peer_img(&mut self, envelope: &EncodedEnvelope, mime: String) -> Vec<SessionAction> {
        let Some(secret) = self.handshake.secret() else {
            tracing::debug!("dropping img received before handshake");
            return Vec::new();
        };

        let bytes = match open_encoded(secret, envelope) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(%err, "dropping undecryptable img");
                return Vec::new();
            },
        };

        self.append(Author::Peer, Content::Image { mime, bytes }, None)
    }

    fn handle_peer_edit(&mut self, index: u64, envelope: &EncodedEnvelope) -> Vec<SessionAction> {
        let Some(secret) = self.handshake.secret() else {
            tracing::debug!(index, "dropping edit received before handshake");
            return Vec::new();
        };

        let text = match open_encoded(secret, envelope)
            .and_then(|plaintext| decode_text(&plaintext).map_err(SessionError::from))
        {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(index, %err, "dropping undecryptable edit");
                return Vec::new();
            },
        };

        match self.log.edit_at(index, text.clone(), EditOrigin::Remote) {
            Ok(()) => vec![SessionAction::MessageEdited { index, text }],
            Err(err) => {
                tracing::warn!(index, %err, "rejected remote edit");
                Vec::new()
            },
        }
    }

    fn handle_peer_reaction(&mut self, index: u64, emoji: Option<String>) -> Vec<SessionAction> {
        match self.log.set_reaction(index, emoji.clone()) {
            Ok(()) => vec![SessionAction::ReactionChanged { index, emoji }],
            Err(err) => {
                tracing::warn!(index, %err, "ignoring reaction");
                Vec::new()
            },
        }
    }

    fn handle_peer_typing(&mut self, typing: bool) -> Vec<SessionAction> {
        if self.typing.set_remote(typing) {
            vec![SessionAction::PeerTyping(typing)]
        } else {
            Vec::new()
        }
    }

    fn handle_peer_left(&mut self) -> Vec<SessionAction> {
        if self.departure.is_some() {
            tracing::debug!("ignoring duplicate peer_left");
            return Vec::new();
        }

        let countdown = self.config.departure_countdown;
        tracing::info!(countdown, "peer left, starting departure countdown");

        let notice = format!("{DEPARTURE_NOTICE} {}s...", self.config.departure_grace().as_secs());
        self.log.push_notice(notice, self.env.wall_clock_ms());

        let departure =
            DepartureCountdown::start(self.env.now(), countdown, self.config.departure_tick);
        let expired = departure.is_expired();
        self.departure = Some(departure);

        let mut actions = vec![SessionAction::PeerLeft { countdown }];
        if self.typing.set_remote(false) {
            actions.push(SessionAction::PeerTyping(false));
        }
        if expired {
            actions.extend(self.teardown(TeardownReason::PeerDeparted));
        }
        actions
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if self.typing.poll(now) {
            actions.push(SessionAction::Send(Frame::StoppedTyping));
        }

        let mut expired = false;
        if let Some(departure) = self.departure.as_mut() {
            for remaining in departure.poll(now) {
                tracing::debug!(remaining, "departure countdown");
                actions.push(SessionAction::CountdownTick { remaining });
            }
            expired = departure.is_expired();
        }

        if expired {
            actions.extend(self.teardown(TeardownReason::PeerDeparted));
        }

        actions
    }

    fn handle_send_text(
        &mut self,
        text: String,
        reply_to: Option<u64>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.require_established()?;
        if let Some(target) = reply_to {
            self.require_index(target)?;
        }

        let plaintext = MessageBody::text(text.clone(), reply_to).encode()?;
        let frame = Frame::msg(self.seal_payload(&plaintext)?);

        let mut actions = vec![SessionAction::Send(frame)];
        actions.extend(self.append(Author::Local, Content::Text(text), reply_to));
        Ok(actions)
    }

    fn handle_send_image(
        &mut self,
        mime: String,
        bytes: Vec<u8>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if bytes.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.require_established()?;

        let size = encoded_len(bytes.len() + TAG_SIZE) + mime.len() + IMG_FRAME_OVERHEAD;
        if size > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size, max: MAX_FRAME_SIZE }.into());
        }

        let frame = Frame::img(self.seal_payload(&bytes)?, mime.clone());

        let mut actions = vec![SessionAction::Send(frame)];
        actions.extend(self.append(Author::Local, Content::Image { mime, bytes }, None));
        Ok(actions)
    }

    fn handle_edit(&mut self, index: u64, text: String) -> Result<Vec<SessionAction>, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.require_established()?;
        self.require_index(index)?;
        self.log
            .check_edit(index, EditOrigin::Local)
            .map_err(|reason| SessionError::NotEditable { index, reason })?;

        let frame = Frame::edit(index, self.seal_payload(text.as_bytes())?);

        self.log
            .edit_at(index, text.clone(), EditOrigin::Local)
            .map_err(|reason| SessionError::NotEditable { index, reason })?;

        Ok(vec![SessionAction::Send(frame), SessionAction::MessageEdited { index, text }])
    }

    fn handle_react(
        &mut self,
        index: u64,
        emoji: Option<String>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.require_established()?;
        self.require_index(index)?;

        let len = self.log.len();
        self.log
            .set_reaction(index, emoji.clone())
            .map_err(|_| SessionError::InvalidIndex { index, len })?;

        Ok(vec![
            SessionAction::Send(Frame::Reaction { index, emoji: emoji.clone() }),
            SessionAction::ReactionChanged { index, emoji },
        ])
    }

    fn handle_keystroke(&mut self) -> Vec<SessionAction> {
        if !self.handshake.is_established() {
            return Vec::new();
        }

        if self.typing.keystroke(self.env.now(), self.config.typing_debounce) {
            vec![SessionAction::Send(Frame::Typing)]
        } else {
            Vec::new()
        }
    }

    fn append(
        &mut self,
        author: Author,
        content: Content,
        reply_to: Option<u64>,
    ) -> Vec<SessionAction> {
        let index = self.log.append(author, content, reply_to, self.env.wall_clock_ms());
        tracing::debug!(index, ?author, "message appended");

        self.log.get(index).cloned().map(SessionAction::MessageAppended).into_iter().collect()
    }

    fn require_established(&self) -> Result<&SharedSecret, SessionError> {
        self.handshake.secret().ok_or(SessionError::NotEstablished)
    }

    fn require_index(&self, index: u64) -> Result<&MessageItem, SessionError> {
        self.log.get(index).ok_or(SessionError::InvalidIndex { index, len: self.log.len() })
    }

    fn seal_payload(&self, plaintext: &[u8]) -> Result<EncodedEnvelope, SessionError> {
        let secret = self.require_established()?;

        let mut nonce = [0u8; NONCE_SIZE];
        self.env.random_bytes(&mut nonce);
        let envelope = seal(secret, plaintext, nonce);

        Ok(EncodedEnvelope::encode(&envelope.nonce, &envelope.ciphertext))
    }

    fn teardown(&mut self, reason: TeardownReason) -> Vec<SessionAction> {
        self.torn_down = true;
        self.handshake.clear();
        self.log.clear();
        self.typing.reset();
        self.departure = None;
        self.peer_name = None;

        tracing::info!(?reason, "session torn down");

        let mut actions = Vec::with_capacity(2);
        if reason != TeardownReason::TransportClosed {
            actions.push(SessionAction::CloseTransport);
        }
        actions.push(SessionAction::TornDown { reason });
        actions
    }
}

/// Decode and open the base64 envelope fields of a frame.
fn open_encoded(secret: &SharedSecret, encoded: &EncodedEnvelope) -> Result<Vec<u8>, SessionError> {
    let envelope = Envelope::from_parts(&encoded.nonce()?, encoded.ciphertext()?)?;
    Ok(open(secret, &envelope)?)
}

/// Length of padded base64 for `len` bytes.
fn encoded_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use burner_core::{env::test_utils::MockEnv, message_log::Entry};
    use burner_crypto::{KeyPair, PortableKey};
    use serde_json::json;

    use super::*;

    /// Remote side of a session, holding the keys the session talks to.
    struct Peer {
        secret: SharedSecret,
        nonce: u8,
    }

    impl Peer {
        fn seal(&mut self, plaintext: &[u8]) -> EncodedEnvelope {
            self.nonce = self.nonce.wrapping_add(1);
            let envelope = seal(&self.secret, plaintext, [self.nonce; NONCE_SIZE]);
            EncodedEnvelope::encode(&envelope.nonce, &envelope.ciphertext)
        }

        fn msg(&mut self, text: &str, reply_to: Option<u64>) -> String {
            let plaintext = MessageBody::text(text, reply_to).encode().unwrap();
            Frame::msg(self.seal(&plaintext)).encode().unwrap()
        }

        fn open(&self, frame: &Frame) -> Vec<u8> {
            open_encoded(&self.secret, &frame.envelope().unwrap()).unwrap()
        }
    }

    fn session() -> (Session<MockEnv>, MockEnv) {
        let env = MockEnv::with_seed(1);
        let session = Session::join(env.clone(), "alice", SessionConfig::default()).unwrap();
        (session, env)
    }

    fn frame(text: &str) -> SessionEvent<<MockEnv as Environment>::Instant> {
        SessionEvent::FrameReceived(text.to_owned())
    }

    fn sent(actions: &[SessionAction]) -> Vec<Frame> {
        actions
            .iter()
            .filter_map(|action| match action {
                SessionAction::Send(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    fn peer_keypair() -> KeyPair {
        let mut next = 0x5Au8;
        KeyPair::generate(|buf: &mut [u8]| {
            for byte in buf.iter_mut() {
                next = next.wrapping_mul(31).wrapping_add(7);
                *byte = next;
            }
        })
        .unwrap()
    }

    /// Connect and complete the handshake against a scripted peer.
    fn established() -> (Session<MockEnv>, MockEnv, Peer) {
        let (mut session, env) = session();
        let announced = session.handle(SessionEvent::Connected).unwrap();
        let Some(Frame::Key { data }) = sent(&announced).into_iter().next() else {
            unreachable!("connect announces a key first");
        };

        let keypair = peer_keypair();
        let peer_key = Frame::Key { data: keypair.export_public().to_json() }.encode().unwrap();
        session.handle(frame(&peer_key)).unwrap();

        let secret = keypair.derive(&PortableKey::from_json(&data).unwrap());
        (session, env, Peer { secret, nonce: 0 })
    }

    #[test]
    fn connect_announces_key_then_name() {
        let (mut session, _) = session();

        let frames = sent(&session.handle(SessionEvent::Connected).unwrap());

        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], Frame::Key { data } if data["crv"] == "P-256"));
        assert_eq!(frames[1], Frame::Name { data: "alice".to_owned() });
        assert_eq!(session.handshake_state(), HandshakeState::AwaitingPeerKey);
    }

    #[test]
    fn peer_key_establishes_and_reannounces() {
        let (mut session, _) = session();
        session.handle(SessionEvent::Connected).unwrap();
        let peer_key = Frame::Key { data: peer_keypair().export_public().to_json() };

        let actions = session.handle(frame(&peer_key.encode().unwrap())).unwrap();

        assert_eq!(actions[0], SessionAction::Established);
        let frames = sent(&actions);
        assert!(matches!(frames[0], Frame::Key { .. }));
        assert_eq!(frames[1], Frame::Name { data: "alice".to_owned() });
        assert!(session.is_established());

        // Re-delivered key produces nothing
        assert!(session.handle(frame(&peer_key.encode().unwrap())).unwrap().is_empty());
    }

    #[test]
    fn malformed_key_reports_failure_and_keeps_waiting() {
        let (mut session, _) = session();
        session.handle(SessionEvent::Connected).unwrap();

        let bad = json!({"type": "key", "data": {"kty": "EC", "crv": "P-384"}}).to_string();
        let actions = session.handle(frame(&bad)).unwrap();

        assert!(matches!(actions[..], [SessionAction::HandshakeFailed { .. }]));
        assert_eq!(session.handshake_state(), HandshakeState::AwaitingPeerKey);

        let good = Frame::Key { data: peer_keypair().export_public().to_json() };
        let actions = session.handle(frame(&good.encode().unwrap())).unwrap();
        assert_eq!(actions[0], SessionAction::Established);
    }

    #[test]
    fn first_peer_name_wins() {
        let (mut session, _) = session();

        let actions = session.handle(frame(r#"{"type":"name","data":"bob"}"#)).unwrap();
        assert_eq!(actions, vec![SessionAction::PeerIdentified { name: "bob".to_owned() }]);

        assert!(session.handle(frame(r#"{"type":"name","data":"mallory"}"#)).unwrap().is_empty());
        assert_eq!(session.peer_name(), Some("bob"));
    }

    #[test]
    fn msg_before_handshake_is_dropped() {
        let (mut session, _) = session();

        let actions = session.handle(frame(r#"{"type":"msg","data":"AAAA","iv":"AAAA"}"#)).unwrap();

        assert!(actions.is_empty());
        assert!(session.log().is_empty());
    }

    #[test]
    fn peer_msg_is_appended() {
        let (mut session, _, mut peer) = established();

        let actions = session.handle(frame(&peer.msg("hello", None))).unwrap();

        let [SessionAction::MessageAppended(item)] = &actions[..] else {
            unreachable!("expected one append, got {actions:?}");
        };
        assert_eq!(item.index, 0);
        assert_eq!(item.author, Author::Peer);
        assert_eq!(item.text(), Some("hello"));
        assert_eq!(item.reply_to, None);
    }

    #[test]
    fn legacy_plain_text_payload_is_accepted() {
        let (mut session, _, mut peer) = established();
        let legacy = Frame::msg(peer.seal(b"from an old client")).encode().unwrap();

        session.handle(frame(&legacy)).unwrap();

        let item = session.log().get(0).unwrap();
        assert_eq!(item.text(), Some("from an old client"));
        assert_eq!(item.reply_to, None);
    }

    #[test]
    fn tampered_msg_is_dropped_and_session_continues() {
        let (mut session, _, mut peer) = established();
        let mut envelope = peer.seal(br#"{"kind":"text","text":"x","replyTo":null}"#);
        envelope.data = EncodedEnvelope::encode(&[0; 12], b"garbage that will not verify").data;

        let actions = session.handle(frame(&Frame::msg(envelope).encode().unwrap())).unwrap();
        assert!(actions.is_empty());

        session.handle(frame(&peer.msg("still here", None))).unwrap();
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn bad_base64_is_dropped() {
        let (mut session, _, _) = established();

        let actions = session.handle(frame(r#"{"type":"msg","data":"!!","iv":"??"}"#)).unwrap();

        assert!(actions.is_empty());
        assert!(!session.is_torn_down());
    }

    #[test]
    fn peer_image_is_appended_with_mime() {
        let (mut session, _, mut peer) = established();
        let img = Frame::img(peer.seal(&[0x89, b'P', b'N', b'G']), "image/png").encode().unwrap();

        session.handle(frame(&img)).unwrap();

        let item = session.log().get(0).unwrap();
        assert_eq!(
            item.content,
            Content::Image { mime: "image/png".to_owned(), bytes: vec![0x89, b'P', b'N', b'G'] }
        );
    }

    #[test]
    fn send_text_seals_then_appends() {
        let (mut session, _, peer) = established();

        let actions =
            session.handle(SessionEvent::SendText { text: "hi".to_owned(), reply_to: None }).unwrap();

        let [SessionAction::Send(msg), SessionAction::MessageAppended(item)] = &actions[..] else {
            unreachable!("expected send then append, got {actions:?}");
        };
        let body = MessageBody::decode(&peer.open(msg)).unwrap();
        assert_eq!(body, MessageBody::text("hi", None));
        assert_eq!(item.author, Author::Local);
        assert_eq!(item.index, 0);
    }

    #[test]
    fn send_rejections() {
        let (mut unestablished, _) = session();
        assert_eq!(
            unestablished.handle(SessionEvent::SendText { text: "hi".to_owned(), reply_to: None }),
            Err(SessionError::NotEstablished)
        );

        let (mut session, _, _) = established();
        assert_eq!(
            session.handle(SessionEvent::SendText { text: "  \n".to_owned(), reply_to: None }),
            Err(SessionError::EmptyMessage)
        );
        assert_eq!(
            session.handle(SessionEvent::SendText { text: "re".to_owned(), reply_to: Some(3) }),
            Err(SessionError::InvalidIndex { index: 3, len: 0 })
        );
        assert!(session.log().is_empty());
    }

    #[test]
    fn nonces_are_fresh_per_send() {
        let (mut session, _, _) = established();

        // Nonces come from the environment's randomness on every seal
        let mut nonces = std::collections::HashSet::new();
        for i in 0..10_000 {
            let actions = session
                .handle(SessionEvent::SendText { text: format!("m{i}"), reply_to: None })
                .unwrap();
            let envelope = sent(&actions)[0].envelope().unwrap();
            assert!(nonces.insert(envelope.iv), "nonce repeated after {i} sends");
        }
    }

    #[test]
    fn remote_edit_applies_to_peer_items_only() {
        let (mut session, _, mut peer) = established();
        session.handle(frame(&peer.msg("hello", None))).unwrap();
        session.handle(SessionEvent::SendText { text: "mine".to_owned(), reply_to: None }).unwrap();

        let edit = Frame::edit(0, peer.seal(b"HELLO")).encode().unwrap();
        let actions = session.handle(frame(&edit)).unwrap();
        assert_eq!(actions, vec![SessionAction::MessageEdited { index: 0, text: "HELLO".to_owned() }]);

        let hijack = Frame::edit(1, peer.seal(b"rewritten")).encode().unwrap();
        assert!(session.handle(frame(&hijack)).unwrap().is_empty());

        let mine = session.log().get(1).unwrap();
        assert_eq!(mine.text(), Some("mine"));
        assert!(!mine.edited);
    }

    #[test]
    fn local_edit_only_on_own_text() {
        let (mut session, _, mut peer) = established();
        session.handle(frame(&peer.msg("theirs", None))).unwrap();
        session.handle(SessionEvent::SendText { text: "mine".to_owned(), reply_to: None }).unwrap();

        let refused = session.handle(SessionEvent::EditMessage { index: 0, text: "x".to_owned() });
        assert!(matches!(refused, Err(SessionError::NotEditable { index: 0, .. })));

        let actions =
            session.handle(SessionEvent::EditMessage { index: 1, text: "MINE".to_owned() }).unwrap();
        let frames = sent(&actions);
        assert!(matches!(frames[..], [Frame::Edit { index: 1, .. }]));
        assert_eq!(peer.open(&frames[0]), b"MINE");
        assert!(session.log().get(1).unwrap().edited);
    }

    #[test]
    fn reactions_round_trip_through_log() {
        let (mut session, _, mut peer) = established();
        session.handle(frame(&peer.msg("hello", None))).unwrap();

        let actions = session
            .handle(SessionEvent::React { index: 0, emoji: Some("👍".to_owned()) })
            .unwrap();
        assert_eq!(sent(&actions), vec![Frame::Reaction { index: 0, emoji: Some("👍".to_owned()) }]);

        session.handle(frame(r#"{"type":"reaction","index":0,"emoji":null}"#)).unwrap();
        assert_eq!(session.log().get(0).unwrap().reaction, None);

        // Out of range is ignored
        assert!(session.handle(frame(r#"{"type":"reaction","index":9,"emoji":"x"}"#)).unwrap().is_empty());
    }

    #[test]
    fn unknown_frame_leaves_state_unchanged() {
        let (mut session, _, mut peer) = established();
        session.handle(frame(&peer.msg("hello", None))).unwrap();
        let before = session.log().items().to_vec();

        let actions = session.handle(frame(r#"{"type":"call_offer","sdp":"..."}"#)).unwrap();

        assert!(actions.is_empty());
        assert_eq!(session.log().items(), before.as_slice());
        assert!(session.is_established());
    }

    #[test]
    fn remote_typing_reports_changes() {
        let (mut session, _, _) = established();

        assert_eq!(
            session.handle(frame(r#"{"type":"typing"}"#)).unwrap(),
            vec![SessionAction::PeerTyping(true)]
        );
        assert!(session.handle(frame(r#"{"type":"typing"}"#)).unwrap().is_empty());
        assert_eq!(
            session.handle(frame(r#"{"type":"stopped_typing"}"#)).unwrap(),
            vec![SessionAction::PeerTyping(false)]
        );
    }

    #[test]
    fn typing_debounce_emits_one_pair() {
        let (mut session, env, _) = established();

        let mut frames = Vec::new();
        for _ in 0..5 {
            frames.extend(sent(&session.handle(SessionEvent::Keystroke).unwrap()));
            env.advance(Duration::from_millis(300));
            frames.extend(sent(&session.handle(SessionEvent::Tick { now: env.now() }).unwrap()));
        }
        assert_eq!(frames, vec![Frame::Typing]);

        env.advance(Duration::from_millis(1000));
        frames.extend(sent(&session.handle(SessionEvent::Tick { now: env.now() }).unwrap()));
        assert_eq!(frames, vec![Frame::Typing, Frame::StoppedTyping]);
    }

    #[test]
    fn keystrokes_before_handshake_send_nothing() {
        let (mut session, _) = session();

        assert!(session.handle(SessionEvent::Keystroke).unwrap().is_empty());
    }

    #[test]
    fn departure_countdown_tears_down_after_five_ticks() {
        let (mut session, env, mut peer) = established();
        session.handle(frame(&peer.msg("hello", None))).unwrap();
        session.handle(frame(r#"{"type":"typing"}"#)).unwrap();

        let actions = session.handle(frame(r#"{"type":"peer_left"}"#)).unwrap();
        assert_eq!(
            actions,
            vec![SessionAction::PeerLeft { countdown: 5 }, SessionAction::PeerTyping(false)]
        );
        assert_eq!(session.countdown(), Some(5));

        for remaining in (1..5u8).rev() {
            env.advance(Duration::from_secs(1));
            let actions = session.handle(SessionEvent::Tick { now: env.now() }).unwrap();
            assert_eq!(actions, vec![SessionAction::CountdownTick { remaining }]);
        }

        env.advance(Duration::from_secs(1));
        let actions = session.handle(SessionEvent::Tick { now: env.now() }).unwrap();
        assert_eq!(
            actions,
            vec![
                SessionAction::CountdownTick { remaining: 0 },
                SessionAction::CloseTransport,
                SessionAction::TornDown { reason: TeardownReason::PeerDeparted },
            ]
        );
        assert!(session.is_torn_down());
        assert!(!session.is_established());
        assert!(session.log().is_empty());
    }

    #[test]
    fn departure_notice_is_out_of_band() {
        let (mut session, _, mut peer) = established();
        session.handle(frame(&peer.msg("hello", None))).unwrap();

        session.handle(frame(r#"{"type":"peer_left"}"#)).unwrap();

        assert_eq!(session.log().len(), 1);
        let entries = session.log().entries();
        assert!(matches!(entries[..], [Entry::Item(_), Entry::Notice(notice)]
            if notice.text == "Peer has left. You will be redirected in 5s..."));
    }

    #[test]
    fn duplicate_peer_left_is_ignored() {
        let (mut session, env, _) = established();
        session.handle(frame(r#"{"type":"peer_left"}"#)).unwrap();
        env.advance(Duration::from_secs(2));
        session.handle(SessionEvent::Tick { now: env.now() }).unwrap();

        assert!(session.handle(frame(r#"{"type":"peer_left"}"#)).unwrap().is_empty());
        assert_eq!(session.countdown(), Some(3));
        assert_eq!(session.log().notices().len(), 1);
    }

    #[test]
    fn exit_cancels_countdown() {
        let (mut session, env, _) = established();
        session.handle(frame(r#"{"type":"peer_left"}"#)).unwrap();

        let actions = session.handle(SessionEvent::Exit).unwrap();
        assert_eq!(
            actions,
            vec![SessionAction::CloseTransport, SessionAction::TornDown { reason: TeardownReason::Exit }]
        );

        env.advance(Duration::from_secs(10));
        assert!(session.handle(SessionEvent::Tick { now: env.now() }).unwrap().is_empty());
    }

    #[test]
    fn room_full_aborts_before_handshake() {
        let (mut session, _) = session();
        session.handle(SessionEvent::Connected).unwrap();

        let actions = session.handle(frame("ROOM_FULL")).unwrap();

        assert_eq!(
            actions,
            vec![
                SessionAction::RoomFull,
                SessionAction::CloseTransport,
                SessionAction::TornDown { reason: TeardownReason::RoomFull },
            ]
        );
        assert_eq!(session.handshake_state(), HandshakeState::NoKey);
    }

    #[test]
    fn transport_closed_tears_down_without_close() {
        let (mut session, _, _) = established();

        let actions = session.handle(SessionEvent::TransportClosed).unwrap();

        assert_eq!(
            actions,
            vec![SessionAction::TornDown { reason: TeardownReason::TransportClosed }]
        );
    }

    #[test]
    fn everything_is_ignored_after_teardown() {
        let (mut session, _, mut peer) = established();
        session.handle(SessionEvent::Exit).unwrap();

        assert!(session.handle(frame(&peer.msg("late", None))).unwrap().is_empty());
        assert!(session.handle(SessionEvent::Connected).unwrap().is_empty());
        assert!(session.handle(SessionEvent::Keystroke).unwrap().is_empty());
        assert_eq!(
            session.handle(SessionEvent::SendText { text: "x".to_owned(), reply_to: None }),
            Ok(Vec::new())
        );
        assert!(session.handle(SessionEvent::Exit).unwrap().is_empty());
        assert!(session.log().is_empty());
    }

    #[test]
    fn oversized_image_is_refused() {
        let (mut session, _, _) = established();

        let result = session.handle(SessionEvent::SendImage {
            mime: "image/png".to_owned(),
            bytes: vec![0; MAX_FRAME_SIZE],
        });

        assert!(matches!(result, Err(SessionError::Protocol(ProtocolError::FrameTooLarge { .. }))));
        assert!(session.log().is_empty());
    }
}
