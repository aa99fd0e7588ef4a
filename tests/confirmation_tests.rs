use repo_capture::config::TimingConfig;
use repo_capture::facts::{CandidateFact, FactType};
use repo_capture::kernel::confirm::{ConfirmationMachine, ItemOutcome, ItemState};
use repo_capture::kernel::router::Lane;
use repo_capture::kernel::scheduler::SideEffect;
use repo_capture::kernel::time::Tick;

fn machine() -> ConfirmationMachine {
    ConfirmationMachine::new(&TimingConfig::default())
}

fn skill(value: &str, confidence: f32) -> CandidateFact {
    CandidateFact::new(FactType::Skill, vec![value.to_string()], confidence, format!("I know {}", value))
}

fn surfaced_id(effects: &[SideEffect]) -> String {
    match effects {
        [SideEffect::ItemSurfaced(view)] => view.id.clone(),
        other => panic!("expected one ItemSurfaced, got {:?}", other),
    }
}

fn commits(effects: &[SideEffect]) -> Vec<bool> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Commit { validated, .. } => Some(*validated),
            _ => None,
        })
        .collect()
}

#[test]
fn test_soft_item_fades_then_auto_saves() {
    let mut m = machine();
    let id = surfaced_id(&m.admit(skill("Python", 0.65), Lane::SoftConfirm, Tick::ZERO));
    assert_eq!(m.get(&id).unwrap().state, ItemState::Soft);
    assert_eq!(m.get(&id).unwrap().fade_at, Some(Tick::from_millis(5000)));

    // t=4.9s: still plain soft
    assert!(m.advance(Tick::from_millis(4900)).is_empty());

    // t=5s: fading at reduced opacity, nothing committed
    let effects = m.advance(Tick::from_millis(5000));
    assert!(commits(&effects).is_empty());
    let view = m.get(&id).unwrap();
    assert_eq!(view.state, ItemState::Fading);
    assert!((view.opacity - 0.6).abs() < f32::EPSILON);

    // t=7.9s: still fading
    assert!(m.advance(Tick::from_millis(7900)).is_empty());

    // t=8s: auto-saved unvalidated and removed
    let effects = m.advance(Tick::from_millis(8000));
    assert_eq!(commits(&effects), vec![false]);
    assert!(effects.contains(&SideEffect::ItemRemoved { id: id.clone(), outcome: ItemOutcome::AutoSaved }));
    assert!(m.get(&id).is_none());
    assert!(m.is_empty());

    println!("Soft lifecycle passed");
}

#[test]
fn test_large_time_jump_cascades_to_auto_save() {
    let mut m = machine();
    let id = surfaced_id(&m.admit(skill("Rust", 0.6), Lane::SoftConfirm, Tick::ZERO));

    let effects = m.advance(Tick::from_millis(20_000));
    assert_eq!(commits(&effects), vec![false]);
    assert!(m.get(&id).is_none());
}

#[test]
fn test_confirm_before_auto_save_commits_once_validated() {
    let mut m = machine();
    let id = surfaced_id(&m.admit(skill("Go", 0.7), Lane::SoftConfirm, Tick::ZERO));

    m.advance(Tick::from_millis(5000));
    assert_eq!(m.get(&id).unwrap().state, ItemState::Fading);

    // confirm at t=6s, during fade
    let effects = m.confirm(&id, Tick::from_millis(6000));
    assert_eq!(commits(&effects), vec![true]);
    assert_eq!(m.get(&id).unwrap().state, ItemState::Confirmed);

    // second confirm is a no-op
    assert!(m.confirm(&id, Tick::from_millis(6100)).is_empty());

    // auto-save deadline passes: no second commit; confirmed display ends at 7s
    let effects = m.advance(Tick::from_millis(8000));
    assert!(commits(&effects).is_empty(), "auto-save must not fire after confirm");
    assert!(effects.contains(&SideEffect::ItemRemoved { id: id.clone(), outcome: ItemOutcome::Confirmed }));
    assert!(m.is_empty());
}

#[test]
fn test_confirmed_item_lingers_for_display_delay() {
    let mut m = machine();
    let id = surfaced_id(&m.admit(skill("SQL", 0.7), Lane::SoftConfirm, Tick::ZERO));

    m.confirm(&id, Tick::from_millis(1000));
    assert!(m.advance(Tick::from_millis(1999)).is_empty());
    assert!(m.get(&id).is_some());

    let effects = m.advance(Tick::from_millis(2000));
    assert_eq!(effects, vec![SideEffect::ItemRemoved { id, outcome: ItemOutcome::Confirmed }]);
}

#[test]
fn test_hard_item_waits_for_user() {
    let mut m = machine();
    let fact = CandidateFact::new(FactType::Location, vec!["remote".into()], 0.9, "I only want remote").strict(true);
    let id = surfaced_id(&m.admit(fact, Lane::HardConfirm, Tick::ZERO));
    assert_eq!(m.get(&id).unwrap().fade_at, None);

    // an hour later, nothing happened
    assert!(m.advance(Tick::from_millis(3_600_000)).is_empty());
    assert_eq!(m.get(&id).unwrap().state, ItemState::Hard);

    let effects = m.confirm(&id, Tick::from_millis(3_600_000));
    assert_eq!(commits(&effects), vec![true]);
}

#[test]
fn test_dismiss_never_writes() {
    let mut m = machine();
    let soft = surfaced_id(&m.admit(skill("Java", 0.6), Lane::SoftConfirm, Tick::ZERO));
    let hard = surfaced_id(&m.admit(skill("Kotlin", 0.6).strict(true), Lane::HardConfirm, Tick::ZERO));

    let effects = m.dismiss(&soft, Tick::from_millis(5500));
    assert_eq!(effects, vec![SideEffect::ItemRemoved { id: soft.clone(), outcome: ItemOutcome::Dismissed }]);
    let effects = m.dismiss(&hard, Tick::from_millis(5500));
    assert!(commits(&effects).is_empty());

    // the soft item's auto-save timer is gone too
    assert!(m.advance(Tick::from_millis(60_000)).is_empty());
    assert!(m.is_empty());

    // unknown ids are no-ops
    assert!(m.dismiss(&soft, Tick::from_millis(60_000)).is_empty());
    assert!(m.confirm("nope", Tick::from_millis(60_000)).is_empty());
}

#[test]
fn test_dismiss_after_confirm_is_noop() {
    let mut m = machine();
    let id = surfaced_id(&m.admit(skill("C", 0.6), Lane::SoftConfirm, Tick::ZERO));
    m.confirm(&id, Tick::from_millis(100));
    assert!(m.dismiss(&id, Tick::from_millis(200)).is_empty());
    assert_eq!(m.get(&id).unwrap().state, ItemState::Confirmed);
}

#[test]
fn test_duplicate_content_is_suppressed() {
    let mut m = machine();
    surfaced_id(&m.admit(skill("Python", 0.6), Lane::SoftConfirm, Tick::ZERO));

    // same content after normalization
    let effects = m.admit(skill("  PYTHON ", 0.7), Lane::SoftConfirm, Tick::from_millis(100));
    assert!(matches!(effects.as_slice(), [SideEffect::Suppressed { .. }]));
    assert_eq!(m.len(), 1);

    // prefix overlap is different content
    let effects = m.admit(skill("Python scripting", 0.7), Lane::SoftConfirm, Tick::from_millis(200));
    assert!(matches!(effects.as_slice(), [SideEffect::ItemSurfaced(_)]));
    assert_eq!(m.len(), 2);
}

#[test]
fn test_auto_commit_and_discard_lanes_are_never_listed() {
    let mut m = machine();

    let effects = m.admit(skill("Rust", 0.9), Lane::AutoCommit, Tick::ZERO);
    assert_eq!(commits(&effects), vec![false]);
    assert!(matches!(effects[0], SideEffect::Commit { item_id: None, .. }));

    assert!(m.admit(skill("Perl", 0.2), Lane::Discard, Tick::ZERO).is_empty());
    assert!(m.is_empty());
}

#[test]
fn test_items_listed_in_arrival_order() {
    let mut m = machine();
    let a = surfaced_id(&m.admit(skill("A lang", 0.6), Lane::SoftConfirm, Tick::ZERO));
    let b = surfaced_id(&m.admit(skill("B lang", 0.6).strict(true), Lane::HardConfirm, Tick::from_millis(10)));
    let c = surfaced_id(&m.admit(skill("C lang", 0.6), Lane::SoftConfirm, Tick::from_millis(20)));

    let ids: Vec<String> = m.items().into_iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![a, b, c]);
    assert_eq!(m.next_deadline(), Some(Tick::from_millis(5000)));
}
