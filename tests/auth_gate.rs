use std::rc::Rc;

use bookshelf::auth::{
    AuthError, ChallengeOptions, ChallengeResult, Unavailable, FALLBACK_LABEL, PROMPT_MESSAGE,
};
use bookshelf::db::MemoryStore;
use bookshelf::{App, AuthGate, AuthStatus, LocalAuthenticator, PasscodeVault, SharedStore};

/// Authenticator backed by a real vault, answering the challenge with a fixed
/// entry instead of reading the keyboard.
struct TypedEntry<'a> {
    vault: &'a PasscodeVault,
    entry: &'a str,
    prompts: Vec<ChallengeOptions>,
}

impl LocalAuthenticator for TypedEntry<'_> {
    fn has_hardware(&mut self) -> Result<bool, AuthError> {
        Ok(true)
    }

    fn is_enrolled(&mut self) -> Result<bool, AuthError> {
        self.vault
            .is_enrolled()
            .map_err(|err| AuthError(err.to_string()))
    }

    fn authenticate(&mut self, options: &ChallengeOptions) -> Result<ChallengeResult, AuthError> {
        self.prompts.push(options.clone());
        let ok = self
            .vault
            .verify(self.entry)
            .map_err(|err| AuthError(err.to_string()))?;
        Ok(if ok {
            ChallengeResult::succeeded()
        } else {
            ChallengeResult::failed("mismatch")
        })
    }
}

fn vault() -> PasscodeVault {
    let store: SharedStore = Rc::new(MemoryStore::new());
    PasscodeVault::new(store)
}

#[test]
fn unenrolled_device_is_unavailable() {
    let vault = vault();
    let mut gate = AuthGate::new();
    let mut platform = TypedEntry {
        vault: &vault,
        entry: "2468",
        prompts: Vec::new(),
    };

    let status = gate.authenticate(&mut platform, || panic!("must stay locked"));
    assert_eq!(status, AuthStatus::Unavailable(Unavailable::NotEnrolled));
    assert!(platform.prompts.is_empty());
}

#[test]
fn wrong_then_right_passcode() {
    let vault = vault();
    vault.enroll("2468").unwrap();
    let mut gate = AuthGate::new();
    let mut unlocked = 0;

    let mut wrong = TypedEntry {
        vault: &vault,
        entry: "1111",
        prompts: Vec::new(),
    };
    assert_eq!(gate.authenticate(&mut wrong, || unlocked += 1), AuthStatus::Failed);
    assert_eq!(gate.notice().unwrap().message, "Authentication failed, try again.");

    gate.retry();
    let mut right = TypedEntry {
        vault: &vault,
        entry: "2468",
        prompts: Vec::new(),
    };
    assert_eq!(
        gate.authenticate(&mut right, || unlocked += 1),
        AuthStatus::Authenticated
    );
    assert_eq!(unlocked, 1);
    assert_eq!(right.prompts[0].prompt_message, PROMPT_MESSAGE);
    assert_eq!(right.prompts[0].fallback_label, FALLBACK_LABEL);
}

#[test]
fn app_unlocks_only_with_the_enrolled_passcode() {
    let store: SharedStore = Rc::new(MemoryStore::new());
    let vault = PasscodeVault::new(Rc::clone(&store));
    vault.enroll("2468").unwrap();
    let mut app = App::new(store);

    let mut wrong = TypedEntry {
        vault: &vault,
        entry: "0000",
        prompts: Vec::new(),
    };
    app.run_authentication(&mut wrong);
    assert!(!app.is_authenticated());
    assert!(!app.needs_authentication());

    app.handle_key(crossterm::event::KeyCode::Char('r')).unwrap();
    assert!(app.needs_authentication());

    let mut right = TypedEntry {
        vault: &vault,
        entry: "2468",
        prompts: Vec::new(),
    };
    app.run_authentication(&mut right);
    assert!(app.is_authenticated());
}
