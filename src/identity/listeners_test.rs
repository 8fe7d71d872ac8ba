use super::*;
use std::sync::atomic::AtomicUsize;
use uuid::Uuid;

use crate::identity::types::UserMetadata;

fn counting_handler(counter: &Arc<AtomicUsize>) -> IdentityHandler {
    let counter = Arc::clone(counter);
    Arc::new(move |_: IdentityEvent, _: Option<Identity>| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

fn principal() -> Identity {
    Identity { id: Uuid::new_v4(), email: Some("host@example.com".into()), user_metadata: UserMetadata::default() }
}

// =============================================================================
// Subscription
// =============================================================================

#[test]
fn listener_ids_increase() {
    let a = next_listener_id();
    let b = next_listener_id();
    assert!(b > a);
}

#[test]
fn subscription_cancel_runs_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    let sub = Subscription::new(7, move |id| {
        assert_eq!(id, 7);
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert!(sub.is_active());
    assert!(sub.cancel());
    assert!(!sub.cancel());
    assert!(!sub.is_active());
    drop(sub);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn subscription_drop_cancels() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    {
        let _sub = Subscription::new(1, move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn subscription_debug_reports_state() {
    let sub = Subscription::new(3, |_| {});
    assert!(format!("{sub:?}").contains("active: true"));
    sub.cancel();
    assert!(format!("{sub:?}").contains("active: false"));
}

// =============================================================================
// ListenerRegistry
// =============================================================================

#[test]
fn register_and_cancel_removes_listener() {
    let registry = ListenerRegistry::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let sub = registry.register(counting_handler(&counter));
    assert_eq!(registry.len(), 1);

    registry.emit(IdentityEvent::SignedIn, None);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    sub.cancel();
    assert!(registry.is_empty());
    registry.emit(IdentityEvent::SignedOut, None);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn emit_passes_event_and_identity() {
    let registry = ListenerRegistry::new();
    let seen: Arc<Mutex<Vec<(IdentityEvent, Option<Identity>)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let _sub = registry.register(Arc::new(move |event: IdentityEvent, identity: Option<Identity>| {
        seen_clone.lock().unwrap().push((event, identity));
    }));

    let who = principal();
    assert_eq!(registry.emit(IdentityEvent::SignedIn, Some(&who)), 1);
    assert_eq!(registry.emit(IdentityEvent::SignedOut, None), 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], (IdentityEvent::SignedIn, Some(who)));
    assert_eq!(seen[1], (IdentityEvent::SignedOut, None));
}

#[test]
fn emit_delivers_in_registration_order() {
    let registry = ListenerRegistry::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut subs = Vec::new();
    for tag in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        subs.push(registry.register(Arc::new(move |_: IdentityEvent, _: Option<Identity>| order.lock().unwrap().push(tag))));
    }

    registry.emit(IdentityEvent::TokenRefreshed, None);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn panicking_listener_does_not_stop_others() {
    let registry = ListenerRegistry::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let _bad = registry.register(Arc::new(|_: IdentityEvent, _: Option<Identity>| panic!("listener fault")));
    let _good = registry.register(counting_handler(&counter));

    let delivered = registry.emit(IdentityEvent::SignedIn, None);
    assert_eq!(delivered, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn emit_to_targets_single_listener() {
    let registry = ListenerRegistry::new();
    let a = Arc::new(AtomicUsize::new(0));
    let b = Arc::new(AtomicUsize::new(0));
    let sub_a = registry.register(counting_handler(&a));
    let _sub_b = registry.register(counting_handler(&b));

    assert!(registry.emit_to(sub_a.id(), IdentityEvent::InitialSession, None));
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 0);

    sub_a.cancel();
    assert!(!registry.emit_to(sub_a.id(), IdentityEvent::InitialSession, None));
}

#[test]
fn listener_may_cancel_itself_during_emit() {
    let registry = ListenerRegistry::new();
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let slot_clone = Arc::clone(&slot);
    let sub = registry.register(Arc::new(move |_: IdentityEvent, _: Option<Identity>| {
        if let Some(sub) = slot_clone.lock().unwrap().take() {
            sub.cancel();
        }
    }));
    *slot.lock().unwrap() = Some(sub);

    registry.emit(IdentityEvent::SignedOut, None);
    assert!(registry.is_empty());
}

#[test]
fn cancel_after_registry_dropped_is_noop() {
    let registry = ListenerRegistry::new();
    let sub = registry.register(Arc::new(|_: IdentityEvent, _: Option<Identity>| {}));
    drop(registry);
    assert!(sub.cancel());
}

#[test]
fn insert_and_remove_without_handle() {
    let registry = ListenerRegistry::new();
    let id = registry.insert(Arc::new(|_: IdentityEvent, _: Option<Identity>| {}));
    assert!(registry.remove(id));
    assert!(!registry.remove(id));
}
