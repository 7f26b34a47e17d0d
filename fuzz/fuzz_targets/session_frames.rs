//! Fuzz target for the session state machine
//!
//! Two sessions are wired back to back. The fuzzer interleaves user intents,
//! clock advances, and arbitrary raw frames injected into one side.
//!
//! # Invariants
//!
//! - NEVER panic, whatever the relay or peer sends
//! - Errors returned by `handle` are never fatal after a successful join
//! - Every log item's index equals its position
//! - Both logs hold the same number of items unless raw frames were injected
//! - After teardown every event yields no actions

#![no_main]

use std::{collections::VecDeque, time::Duration};

use arbitrary::Arbitrary;
use burner_client::{Session, SessionAction, SessionConfig, SessionEvent};
use burner_core::env::test_utils::MockEnv;
use burner_core::Environment;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Side {
    Alice,
    Bob,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Send { side: Side, text: String, reply_to: Option<u8> },
    Edit { side: Side, index: u8, text: String },
    React { side: Side, index: u8, emoji: Option<String> },
    Keystroke { side: Side },
    Advance { millis: u16 },
    Inject { text: String },
    BobLeaves,
    AliceExits,
}

struct Pair {
    env: MockEnv,
    alice: Session<MockEnv>,
    bob: Session<MockEnv>,
    to_alice: VecDeque<String>,
    to_bob: VecDeque<String>,
}

impl Pair {
    fn handle(&mut self, side: &Side, event: SessionEvent<<MockEnv as Environment>::Instant>) {
        let (session, outbox) = match side {
            Side::Alice => (&mut self.alice, &mut self.to_bob),
            Side::Bob => (&mut self.bob, &mut self.to_alice),
        };

        let was_torn_down = session.is_torn_down();
        match session.handle(event) {
            Ok(actions) => {
                assert!(!was_torn_down || actions.is_empty(), "actions after teardown");
                for action in actions {
                    if let SessionAction::Send(frame) = action {
                        outbox.push_back(frame.encode().expect("outbound frames encode"));
                    }
                }
            }
            Err(err) => assert!(!err.is_fatal(), "fatal error after join: {err}"),
        }
    }

    fn deliver(&mut self) {
        while !self.to_alice.is_empty() || !self.to_bob.is_empty() {
            if let Some(text) = self.to_bob.pop_front() {
                self.handle(&Side::Bob, SessionEvent::FrameReceived(text));
            }
            if let Some(text) = self.to_alice.pop_front() {
                self.handle(&Side::Alice, SessionEvent::FrameReceived(text));
            }
        }
    }

    fn tick(&mut self) {
        let now = self.env.now();
        self.handle(&Side::Alice, SessionEvent::Tick { now });
        self.handle(&Side::Bob, SessionEvent::Tick { now });
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let env = MockEnv::with_seed(7);
    let alice = Session::join(env.clone(), "alice", SessionConfig::default()).expect("join");
    let bob = Session::join(env.clone(), "bob", SessionConfig::default()).expect("join");
    let mut pair =
        Pair { env, alice, bob, to_alice: VecDeque::new(), to_bob: VecDeque::new() };

    pair.handle(&Side::Alice, SessionEvent::Connected);
    pair.handle(&Side::Bob, SessionEvent::Connected);
    pair.deliver();

    let mut injected = false;
    for op in ops.into_iter().take(256) {
        match op {
            Op::Send { side, text, reply_to } => {
                let reply_to = reply_to.map(u64::from);
                pair.handle(&side, SessionEvent::SendText { text, reply_to });
            }
            Op::Edit { side, index, text } => {
                pair.handle(&side, SessionEvent::EditMessage { index: u64::from(index), text });
            }
            Op::React { side, index, emoji } => {
                pair.handle(&side, SessionEvent::React { index: u64::from(index), emoji });
            }
            Op::Keystroke { side } => pair.handle(&side, SessionEvent::Keystroke),
            Op::Advance { millis } => {
                pair.env.advance(Duration::from_millis(u64::from(millis)));
                pair.tick();
            }
            Op::Inject { text } => {
                injected = true;
                pair.handle(&Side::Alice, SessionEvent::FrameReceived(text));
            }
            Op::BobLeaves => {
                pair.handle(&Side::Bob, SessionEvent::Exit);
                pair.handle(&Side::Alice, SessionEvent::FrameReceived(r#"{"type":"peer_left"}"#.into()));
            }
            Op::AliceExits => pair.handle(&Side::Alice, SessionEvent::Exit),
        }
        pair.deliver();

        for session in [&pair.alice, &pair.bob] {
            for (position, item) in session.log().items().iter().enumerate() {
                assert_eq!(item.index, position as u64);
            }
        }

        if !injected && !pair.alice.is_torn_down() && !pair.bob.is_torn_down() {
            assert_eq!(pair.alice.log().len(), pair.bob.log().len());
        }
    }
});
