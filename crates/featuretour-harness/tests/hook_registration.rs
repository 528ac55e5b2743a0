#![forbid(unsafe_code)]

//! Hook registration through the session facade.
//!
//! Run:
//!   cargo test -p featuretour-harness --test hook_registration

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use featuretour::{ActionCategory, ActionKey, FeatureTour, Release, Step, WindowId};
use featuretour_harness::{TestHost, linear_tour};
use proptest::prelude::*;

const IDS: [&str; 3] = ["Alpha", "beta", "GAMMA"];

#[derive(Debug, Clone)]
enum Op {
    Register { id: usize, upper: bool },
    Release { token: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..IDS.len(), any::<bool>()).prop_map(|(id, upper)| Op::Register { id, upper }),
        (0usize..16).prop_map(|token| Op::Release { token }),
    ]
}

fn entered_key(id: &str) -> ActionKey {
    ActionKey::step(ActionCategory::StepEntered, id)
}

proptest! {
    /// A token only ever removes the registration it was issued for.
    #[test]
    fn release_removes_only_its_own_registration(ops in proptest::collection::vec(op(), 1..40)) {
        let session = FeatureTour::new();
        let mut tokens: Vec<Option<Release>> = Vec::new();
        // Model: lower-cased id -> index of the token that owns the entry.
        let mut owner: HashMap<String, usize> = HashMap::new();
        let mut token_keys: Vec<String> = Vec::new();

        for op in ops {
            match op {
                Op::Register { id, upper } => {
                    let name = if upper { IDS[id].to_uppercase() } else { IDS[id].to_lowercase() };
                    tokens.push(Some(session.on_step_entered(&name).execute(|_| {})));
                    token_keys.push(name.to_lowercase());
                    owner.insert(name.to_lowercase(), tokens.len() - 1);
                }
                Op::Release { token } => {
                    if let Some(slot) = tokens.get_mut(token)
                        && let Some(release) = slot.take()
                    {
                        release.release();
                        let key = &token_keys[token];
                        if owner.get(key) == Some(&token) {
                            owner.remove(key);
                        }
                    }
                }
            }
        }

        for id in IDS {
            let lower = id.to_lowercase();
            prop_assert_eq!(
                session.actions().contains(&entered_key(id)),
                owner.contains_key(&lower),
                "mismatch for {}", id
            );
        }
    }
}

// ── Facade ──────────────────────────────────────────────────────────────

#[test]
fn hook_keys_ignore_case() {
    let host = TestHost::new();
    host.anchor("Search", &WindowId::MAIN);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _token = host
        .session
        .on_step_entered("SEARCH")
        .execute(move |s: &Step| sink.borrow_mut().push(s.id().to_owned()));
    host.start(&linear_tour("t", &["Search"])).unwrap();
    assert_eq!(*seen.borrow(), vec!["Search".to_owned()]);
}

#[test]
fn empty_step_id_registers_nothing() {
    let session = FeatureTour::new();
    let token = session.on_step_entering("").execute(|_| {});
    assert!(token.is_empty());
    assert!(session.for_step("").attach_doable(|_| {}).is_empty());
    assert!(session.actions().is_empty());
}

#[test]
fn reset_forgets_hooks_and_run() {
    let host = TestHost::new();
    host.anchor("a", &WindowId::MAIN);
    let _token = host.session.on_step_left("a").execute(|_| {});
    host.start(&linear_tour("t", &["a"])).unwrap();

    host.session.reset();
    assert!(!host.session.is_running());
    assert!(host.session.actions().is_empty());
}

#[test]
fn hooks_may_register_more_hooks() {
    let host = TestHost::new();
    host.anchor("a", &WindowId::MAIN);
    host.anchor("b", &WindowId::MAIN);
    let session = host.session.clone();
    let _token = host.session.on_step_entered("a").execute(move |_| {
        let _nested = session.on_step_entered("b").execute(|_| {});
    });
    host.start(&linear_tour("t", &["a", "b"])).unwrap();
    assert!(host.session.actions().contains(&entered_key("b")));
}
