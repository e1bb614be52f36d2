//! Integration Tests for Reactive System
//!
//! These tests verify that signals, memos, and effects work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pulse_core::graph::pending_tasks;
use pulse_core::reactive::ReactiveContext;
use pulse_core::{flush, settle, untrack, Effect, Memo, ReactiveError, Runtime, Signal};

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    (count.clone(), count)
}

/// A memo computes at most once between two reads, however many writes.
#[test]
fn memo_is_lazy_across_many_writes() {
    let (compute_count, compute_clone) = counter();
    let signal = Signal::new(0);

    let source = signal.clone();
    let memo = Memo::new(move || {
        compute_clone.set(compute_clone.get() + 1);
        source.get() * 2
    });

    // Nothing computed before the first read
    signal.set(1);
    assert_eq!(compute_count.get(), 0);

    assert_eq!(memo.get(), 2);
    for value in 2..50 {
        signal.set(value);
    }
    assert_eq!(compute_count.get(), 1);

    assert_eq!(memo.get(), 98);
    assert_eq!(memo.get(), 98);
    assert_eq!(compute_count.get(), 2);
}

/// A -> B, A -> C, B,C -> D: one write to A recomputes D once.
#[test]
fn diamond_recomputes_once() {
    let (d_count, d_clone) = counter();
    let a = Signal::new(1);

    let source = a.clone();
    let b = Memo::new(move || source.get() + 1);
    let source = a.clone();
    let c = Memo::new(move || source.get() * 10);

    let (left, right) = (b.clone(), c.clone());
    let d = Memo::new(move || {
        d_clone.set(d_clone.get() + 1);
        left.get() + right.get()
    });

    assert_eq!(d.get(), 12);
    assert_eq!(d_count.get(), 1);

    a.set(2);
    assert!(d.is_dirty());
    assert_eq!(d.get(), 23);
    assert_eq!(d_count.get(), 2);
}

/// An effect reading N signals written in one turn reruns once.
#[test]
fn effect_batches_synchronous_writes() {
    let (run_count, run_clone) = counter();
    let signals: Vec<Signal<i32>> = (0..8).map(Signal::new).collect();

    let sources = signals.clone();
    let effect = Effect::new(move || {
        let _sum: i32 = sources.iter().map(Signal::get).sum();
        run_clone.set(run_clone.get() + 1);
    });
    flush();
    assert_eq!(run_count.get(), 1);
    assert_eq!(effect.dependency_count(), 8);

    for signal in &signals {
        signal.update(|v| v + 100);
    }
    assert_eq!(pending_tasks(), 1);

    let report = flush();
    assert_eq!(report.executed, 1);
    assert_eq!(run_count.get(), 2);
}

/// After destroy, writes never run the effect and it is no longer a subscriber.
#[test]
fn destroyed_effect_is_fully_detached() {
    let (run_count, run_clone) = counter();
    let a = Signal::new(0);

    let source = a.clone();
    let b = Memo::new(move || source.get() + 1);

    let (signal, memo) = (a.clone(), b.clone());
    let effect = Effect::new(move || {
        signal.get();
        memo.get();
        run_clone.set(run_clone.get() + 1);
    });
    flush();
    assert!(a.has_subscriber(effect.id()));
    assert_eq!(b.subscriber_count(), 1);

    effect.destroy();
    assert!(!a.has_subscriber(effect.id()));
    assert_eq!(b.subscriber_count(), 0);

    for value in 1..5 {
        a.set(value);
        flush();
    }
    assert_eq!(run_count.get(), 1);
    assert_eq!(Runtime::live_effect_count(), 0);
}

/// A memo stops listening to a branch it no longer takes.
#[test]
fn dynamic_dependencies_are_pruned() {
    let (compute_count, compute_clone) = counter();
    let flag = Signal::new(true);
    let x = Signal::new(1);
    let y = Signal::new(2);

    let (f, xs, ys) = (flag.clone(), x.clone(), y.clone());
    let memo = Memo::new(move || {
        compute_clone.set(compute_clone.get() + 1);
        if f.get() {
            xs.get()
        } else {
            ys.get()
        }
    });

    assert_eq!(memo.get(), 1);
    assert!(x.has_subscriber(memo.id()));

    flag.set(false);
    assert_eq!(memo.get(), 2);
    assert!(!x.has_subscriber(memo.id()));
    assert!(!memo.depends_on(x.id()));

    // Writes to the abandoned branch no longer dirty the memo
    x.set(100);
    assert!(!memo.is_dirty());
    assert_eq!(memo.get(), 2);
    assert_eq!(compute_count.get(), 2);
}

/// Writing an equal value propagates nothing.
#[test]
fn equal_write_does_not_rerun_effects() {
    let (run_count, run_clone) = counter();
    let signal = Signal::new(0);

    let source = signal.clone();
    Effect::new(move || {
        source.get();
        run_clone.set(run_clone.get() + 1);
    });
    flush();

    assert!(!signal.set(0));
    assert_eq!(pending_tasks(), 0);
    assert_eq!(flush().executed, 0);
    assert_eq!(run_count.get(), 1);
}

/// The canonical signal -> memo -> effect chain.
#[test]
fn signal_memo_effect_chain() {
    let results = Rc::new(RefCell::new(Vec::new()));
    let a = Signal::new(1);

    let source = a.clone();
    let b = Memo::new(move || source.get() * 2);

    let log = results.clone();
    Effect::new(move || log.borrow_mut().push(b.get()));

    flush();
    assert_eq!(*results.borrow(), vec![2]);

    a.set(5);
    assert_eq!(*results.borrow(), vec![2]);
    flush();
    assert_eq!(*results.borrow(), vec![2, 10]);
}

/// A memo nobody holds is released even though its source still lists it.
#[test]
fn dropped_memo_is_not_kept_alive_by_its_source() {
    let (compute_count, compute_clone) = counter();
    let signal = Signal::new(1);

    let source = signal.clone();
    let memo = Memo::new(move || {
        compute_clone.set(compute_clone.get() + 1);
        source.get()
    });
    assert_eq!(memo.get(), 1);
    assert_eq!(signal.subscriber_count(), 1);

    drop(memo);
    assert_eq!(signal.subscriber_count(), 0);

    // Propagation prunes the dead entry and computes nothing
    signal.set(2);
    assert_eq!(compute_count.get(), 1);
}

/// Nested evaluation restores the outer evaluator, even after a panic.
#[test]
fn context_survives_panicking_inner_memo() {
    let broken: Memo<i32> = Memo::new(|| panic!("inner failure"));
    let (run_count, run_clone) = counter();
    let signal = Signal::new(1);

    let (inner, source) = (broken.clone(), signal.clone());
    let outer = Memo::new(move || {
        let fallback = inner.try_get().unwrap_or(-1);
        run_clone.set(run_clone.get() + 1);
        // Still tracked as `outer` after the inner failure
        fallback + source.get()
    });

    assert_eq!(outer.get(), 0);
    assert!(outer.depends_on(signal.id()));
    assert!(outer.depends_on(broken.id()));
    assert!(!ReactiveContext::is_active());

    signal.set(2);
    assert_eq!(outer.get(), 1);
    assert_eq!(run_count.get(), 2);
}

/// Reads wrapped in `untrack` create no edges.
#[test]
fn untracked_reads_do_not_subscribe() {
    let tracked = Signal::new(1);
    let ignored = Signal::new(10);

    let (t, i) = (tracked.clone(), ignored.clone());
    let memo = Memo::new(move || t.get() + untrack(|| i.get()));

    assert_eq!(memo.get(), 11);
    assert_eq!(ignored.subscriber_count(), 0);

    ignored.set(20);
    assert!(!memo.is_dirty());
    assert_eq!(memo.get(), 11);

    tracked.set(2);
    assert_eq!(memo.get(), 22);
}

/// Effects that write signals read by other effects settle within one flush.
#[test]
fn chained_effects_settle_in_one_flush() {
    let a = Signal::new(0);
    let b = Signal::new(0);
    let seen = Rc::new(Cell::new(0));

    let (source, target) = (a.clone(), b.clone());
    Effect::new(move || {
        target.set(source.get() * 3);
    });
    let (source, sink) = (b.clone(), seen.clone());
    Effect::new(move || sink.set(source.get()));

    flush();
    a.set(4);
    let report = flush();
    assert_eq!(report.executed, 2);
    assert_eq!(seen.get(), 12);
}

/// A memo reading itself reports a cycle instead of overflowing the stack.
#[test]
fn cyclic_memo_read_is_an_error() {
    let slot: Rc<RefCell<Option<Memo<i32>>>> = Rc::new(RefCell::new(None));

    let inner = slot.clone();
    let memo = Memo::new(move || {
        let me = inner.borrow().clone();
        match me.map(|memo| memo.try_get()) {
            Some(Ok(value)) => value,
            Some(Err(ReactiveError::CyclicRead { .. })) => -1,
            _ => 0,
        }
    });
    *slot.borrow_mut() = Some(memo.clone());

    assert_eq!(memo.get(), -1);
    slot.borrow_mut().take();
}

/// `settle` drives the queue from a tokio runtime.
#[tokio::test]
async fn settle_runs_deferred_effects() {
    let results = Rc::new(RefCell::new(Vec::new()));
    let signal = Signal::new("a".to_string());

    let (source, log) = (signal.clone(), results.clone());
    let effect = Effect::new(move || log.borrow_mut().push(source.get()));

    let report = settle().await;
    assert_eq!(report.executed, 1);

    signal.set("b".to_string());
    signal.set("c".to_string());
    let report = settle().await;
    assert!(report.is_ok());
    assert_eq!(*results.borrow(), vec!["a".to_string(), "c".to_string()]);

    effect.destroy();
    signal.set("d".to_string());
    assert_eq!(settle().await.executed, 0);
}
