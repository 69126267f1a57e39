//! Lockctx Core Integration Tests

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use lockctx_core::prelude::*;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn lock_ids_fixture(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

fn holds_all(holder: &impl HoldsLocks, ids: &[String]) -> bool {
    ids.iter().all(|id| holder.holds_lock(id))
}

fn holds_any(holder: &impl HoldsLocks, ids: &[String]) -> bool {
    ids.iter().any(|id| holder.holds_lock(id))
}

fn expect_violation(f: impl FnOnce()) -> ContractViolation {
    let payload = panic::catch_unwind(AssertUnwindSafe(f)).expect_err("expected a panic");
    payload
        .downcast_ref::<ContractViolation>()
        .cloned()
        .expect("panic payload should be a ContractViolation")
}

#[test]
fn test_no_policy_acquire_and_release() {
    init_tracing();
    let manager = Manager::new(["a", "b"], NoPolicy);
    let mut ctx = manager.new_context();

    ctx.acquire_lock("a").unwrap();
    assert!(ctx.holds_lock("a"));
    assert!(!ctx.holds_lock("b"));

    ctx.release();
    assert!(!ctx.holds_lock("a"));
}

#[test]
fn test_no_policy_any_order() {
    init_tracing();
    let lock_ids = lock_ids_fixture(5);
    let manager = Manager::new(lock_ids.clone(), NoPolicy);
    let mut ctx = manager.new_context();

    for id in lock_ids.iter().rev() {
        ctx.acquire_lock(id).unwrap();
    }
    assert!(holds_all(&ctx, &lock_ids));
}

#[test]
fn test_total_order_rejection_never_touches_lock() {
    init_tracing();
    let manager = Arc::new(Manager::new(["a", "b"], TotalOrderPolicy));
    let mut ctx = manager.new_context();

    ctx.acquire_lock("b").unwrap();
    let err = ctx.acquire_lock("a").unwrap_err();
    assert!(err.is_policy_violation());

    // another context can take "a" right away
    let (tx, rx) = mpsc::channel();
    let other = Arc::clone(&manager);
    thread::spawn(move || {
        let mut ctx = other.new_context();
        ctx.acquire_lock("a").unwrap();
        tx.send(ctx.holds_lock("a")).unwrap();
    });
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));

    ctx.release();
}

#[test]
fn test_total_order_skipped_locks() {
    init_tracing();
    let lock_ids = lock_ids_fixture(5);
    let manager = Manager::new(lock_ids.clone(), TotalOrderPolicy);
    let mut ctx = manager.new_context();

    for id in lock_ids.iter().skip(1).step_by(2) {
        ctx.acquire_lock(id).unwrap();
    }
    assert_eq!(ctx.holding(), ["1", "3"]);
}

#[test]
fn test_empty_dag_allows_single_lock_only() {
    init_tracing();
    let lock_ids = lock_ids_fixture(5);
    let manager = Manager::new(lock_ids.clone(), DagPolicy::builder().build());

    for id1 in &lock_ids {
        let mut ctx = manager.new_context();
        ctx.acquire_lock(id1).unwrap();
        for id2 in &lock_ids {
            assert!(ctx.acquire_lock(id2).unwrap_err().is_policy_violation());
        }
        ctx.release();
    }
}

#[test]
fn test_linear_dag_enforces_order() {
    init_tracing();
    let lock_ids = lock_ids_fixture(5);
    let policy = DagPolicyBuilder::new()
        .add(&lock_ids[0], &lock_ids[1])
        .add(&lock_ids[1], &lock_ids[2])
        .add(&lock_ids[2], &lock_ids[3])
        .add(&lock_ids[3], &lock_ids[4])
        .build();
    let manager = Manager::new(lock_ids.clone(), policy);

    for (i, id) in lock_ids.iter().enumerate() {
        let mut ctx = manager.new_context();
        ctx.acquire_lock(id).unwrap();
        for (j, id2) in lock_ids.iter().enumerate() {
            let result = ctx.acquire_lock(id2);
            if j > i {
                assert!(result.is_ok(), "{} after {} should be allowed", id2, id);
            } else {
                assert!(result.unwrap_err().is_policy_violation());
            }
        }
        ctx.release();
    }
}

#[test]
fn test_unknown_lock_is_distinct_for_every_policy() {
    init_tracing();
    let policies: Vec<Box<dyn Policy>> = vec![
        Box::new(NoPolicy),
        Box::new(TotalOrderPolicy),
        Box::new(DagPolicy::builder().add("a", "b").build()),
    ];

    for policy in policies {
        let manager = Manager::new(["a", "b"], policy);
        let mut ctx = manager.new_context();

        let violation = expect_violation(|| {
            let _ = ctx.acquire_lock("z");
        });
        assert_eq!(violation, ContractViolation::UnknownLock("z".to_string()));
    }
}

#[test]
fn test_concurrent_contexts() {
    init_tracing();
    let lock_ids = lock_ids_fixture(5);
    let manager = Manager::new(lock_ids.clone(), NoPolicy);
    let workers = 8;

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                let mut ctx = manager.new_context();
                assert!(!holds_any(&ctx, &lock_ids));

                for j in 0..lock_ids.len() {
                    ctx.acquire_lock(&lock_ids[j]).unwrap();
                    assert!(holds_all(&ctx, &lock_ids[..=j]));
                    assert!(!holds_any(&ctx, &lock_ids[j + 1..]));
                }

                ctx.release();
                assert!(!holds_any(&ctx, &lock_ids));
            });
        }
    });
}

#[test]
fn test_locks_provide_mutual_exclusion() {
    init_tracing();
    let manager = Manager::new(["counter"], NoPolicy);
    let inside = AtomicUsize::new(0);
    let entries = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..25 {
                    manager.scoped(|ctx| {
                        ctx.acquire_lock("counter").unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                        entries.fetch_add(1, Ordering::SeqCst);
                    });
                }
            });
        }
    });

    assert_eq!(entries.load(Ordering::SeqCst), 100);
}

#[test]
fn test_dag_policy_under_contention() {
    init_tracing();
    let policy = DagPolicy::builder()
        .add("catalog", "index")
        .add("catalog", "queue")
        .add("index", "queue")
        .build();
    let manager = Manager::new(["catalog", "index", "queue"], policy);

    thread::scope(|scope| {
        for worker in 0..6 {
            let manager = &manager;
            scope.spawn(move || {
                for _ in 0..20 {
                    let mut ctx = manager.new_context();
                    ctx.acquire_lock("catalog").unwrap();
                    if worker % 2 == 0 {
                        ctx.acquire_lock("index").unwrap();
                    }
                    ctx.acquire_lock("queue").unwrap();
                    ctx.release();
                }
            });
        }
    });
}

const LOCK_X: &str = "X";
const LOCK_Y: &str = "Y";

/// Must be called while `X` is held
fn low_level_operation_x(proof: Proof<'_>) -> LockResult<()> {
    proof.require(LOCK_X)
}

/// Must be called while `Y` is held
fn low_level_operation_y(proof: Proof<'_>) -> LockResult<()> {
    proof.require(LOCK_Y)
}

/// Performs operations that need several locks
struct HighLevelComponent<'a> {
    manager: &'a Manager,
}

impl HighLevelComponent<'_> {
    fn do_something(&self) -> anyhow::Result<()> {
        self.manager.scoped(|ctx| -> anyhow::Result<()> {
            ctx.acquire_lock(LOCK_X)
                .with_context(|| format!("could not acquire lock {}", LOCK_X))?;
            ctx.acquire_lock(LOCK_Y)
                .with_context(|| format!("could not acquire lock {}", LOCK_Y))?;

            low_level_operation_x(ctx.proof())?;
            low_level_operation_y(ctx.proof())?;
            Ok(())
        })
    }

    fn forgets_lock_y(&self) -> anyhow::Result<()> {
        self.manager.scoped(|ctx| -> anyhow::Result<()> {
            ctx.acquire_lock(LOCK_X)?;
            low_level_operation_x(ctx.proof())?;
            low_level_operation_y(ctx.proof())?;
            Ok(())
        })
    }
}

#[test]
fn test_high_level_component() {
    init_tracing();
    let manager = Manager::new([LOCK_X, LOCK_Y], TotalOrderPolicy);
    let component = HighLevelComponent { manager: &manager };

    component.do_something().unwrap();
    // everything was released, so it can run again
    component.do_something().unwrap();

    let err = component.forgets_lock_y().unwrap_err();
    assert_eq!(
        err.downcast_ref::<LockError>(),
        Some(&LockError::NotHeld(LOCK_Y.to_string()))
    );
}

#[test]
fn test_high_level_component_reports_policy_violation() {
    init_tracing();
    // Y may not follow X under this policy
    let policy = DagPolicy::builder().add(LOCK_Y, LOCK_X).build();
    let manager = Manager::new([LOCK_X, LOCK_Y], policy);
    let component = HighLevelComponent { manager: &manager };

    let err = component.do_something().unwrap_err();
    assert!(err.to_string().contains("could not acquire lock Y"));
    assert!(
        err.downcast_ref::<LockError>()
            .is_some_and(LockError::is_policy_violation)
    );
}

#[test]
fn test_manager_from_config_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locks.toml");
    std::fs::write(
        &path,
        r#"
locks = ["X", "Y"]

[policy]
kind = "dag"
edges = [["X", "Y"]]
"#,
    )
    .unwrap();

    let manager = ManagerConfig::load(&path).unwrap().build_manager().unwrap();
    let component = HighLevelComponent { manager: &manager };
    component.do_something().unwrap();
}
