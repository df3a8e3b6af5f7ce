//! Tracing engine: a worklist-based marker with two interchangeable
//! backends. The serial backend traces with an owned stack; the parallel
//! backend spreads the same worklist over steal-able deques and a
//! termination barrier, but is observably identical at the object level.
//!
//! The marker does not know how a mark is recorded — the mark-byte
//! mark-sweep variant stores it in an external mark-byte table, the
//! legacy variant stores it in the header word. Both implement
//! `Traceable` and hand the marker a simple winner-takes-it
//! compare-then-write primitive.

use crate::object_model::ObjectModel;
use crate::util::{Address, ObjectReference};
use crossbeam::deque::{Injector, Steal, Stealer, Worker as Deque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

/// What a collector variant must provide so the marker can trace its
/// heap: a way to claim the mark "first" and a way to recover an
/// object's kind for dispatch to its `visit_fields`.
pub trait Traceable<OM: ObjectModel> {
    /// Attempt to mark `obj`. Returns `true` exactly once per object per
    /// cycle — to whichever caller's attempt observed it unmarked first.
    fn try_mark(&self, obj: ObjectReference) -> bool;

    /// The kind of `obj`, read from its live header. Implementations may
    /// abort (treating this as heap corruption) if the header does not
    /// decode to a known kind.
    fn kind_of(&self, obj: ObjectReference) -> OM::Kind;
}

#[inline]
fn read_slot(slot: Address) -> Option<ObjectReference> {
    let raw = unsafe { slot.load_usize() };
    (raw != 0).then(|| ObjectReference::from_address(Address::from_usize(raw)))
}

/// How many worker threads `Marker::trace` should use. `Serial` and
/// `Parallel(1)` behave identically but the latter still pays thread
/// setup cost, so callers should prefer `Serial` for single-threaded
/// configurations.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MarkerMode {
    Serial,
    Parallel(usize),
}

/// The marker owned by a heap/space. Roots accumulate in `pending_roots`
/// between `prepare` and `trace`; `trace` drains them (and everything
/// they lead to) to a fixed point.
pub struct Marker {
    mode: MarkerMode,
    pending_roots: Vec<ObjectReference>,
}

impl Marker {
    pub fn new(mode: MarkerMode) -> Marker {
        Marker {
            mode,
            pending_roots: Vec::new(),
        }
    }

    /// Reset any state left over from the previous cycle.
    pub fn prepare(&mut self) {
        self.pending_roots.clear();
    }

    pub fn enqueue_roots(&mut self, objs: &[ObjectReference]) {
        self.pending_roots.extend_from_slice(objs);
    }

    /// Drain the worklist to a fixed point, calling `target.try_mark` and
    /// `OM::visit_fields` to discover new work.
    pub fn trace<OM, T>(&mut self, target: &T)
    where
        OM: ObjectModel,
        T: Traceable<OM> + Sync,
    {
        match self.mode {
            MarkerMode::Serial => self.trace_serial::<OM, T>(target),
            MarkerMode::Parallel(n) if n <= 1 => self.trace_serial::<OM, T>(target),
            MarkerMode::Parallel(n) => self.trace_parallel::<OM, T>(target, n),
        }
    }

    fn trace_serial<OM, T>(&mut self, target: &T)
    where
        OM: ObjectModel,
        T: Traceable<OM>,
    {
        let mut worklist = std::mem::take(&mut self.pending_roots);
        while let Some(obj) = worklist.pop() {
            let kind = target.kind_of(obj);
            OM::visit_fields(kind, obj, &mut |slot: Address| {
                if let Some(child) = read_slot(slot) {
                    if target.try_mark(child) {
                        worklist.push(child);
                    }
                }
            });
        }
    }

    fn trace_parallel<OM, T>(&mut self, target: &T, num_workers: usize)
    where
        OM: ObjectModel,
        T: Traceable<OM> + Sync,
    {
        let roots = std::mem::take(&mut self.pending_roots);
        let locals: Vec<Deque<ObjectReference>> = (0..num_workers).map(|_| Deque::new_lifo()).collect();
        let stealers: Vec<Stealer<ObjectReference>> = locals.iter().map(Deque::stealer).collect();
        let injector = Injector::new();
        for obj in roots {
            injector.push(obj);
        }
        let barrier = TerminationBarrier::new(num_workers);
        let victim_cursor = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for (id, local) in locals.into_iter().enumerate() {
                let stealers = &stealers;
                let injector = &injector;
                let barrier = &barrier;
                let victim_cursor = &victim_cursor;
                scope.spawn(move || {
                    worker_loop::<OM, T>(target, &local, injector, stealers, id, barrier, victim_cursor);
                });
            }
        });
    }
}

/// Pop from the local deque; failing that, steal a batch from the shared
/// injector; failing that, steal a single item from a randomly chosen
/// peer. crossbeam's `Stealer::steal` always takes from the opposite end
/// of a LIFO `Worker` deque, so peer theft never contends with the
/// owner's own pops.
fn find_task<T>(
    local: &Deque<T>,
    injector: &Injector<T>,
    stealers: &[Stealer<T>],
    self_id: usize,
    victim_cursor: &AtomicUsize,
) -> Option<T> {
    if let Some(t) = local.pop() {
        return Some(t);
    }
    loop {
        match injector.steal_batch_and_pop(local) {
            Steal::Success(t) => return Some(t),
            Steal::Retry => continue,
            Steal::Empty => break,
        }
    }
    let n = stealers.len();
    if n <= 1 {
        return None;
    }
    let start = victim_cursor.fetch_add(1, Ordering::Relaxed) % n;
    for offset in 0..n {
        let idx = (start + offset) % n;
        if idx == self_id {
            continue;
        }
        loop {
            match stealers[idx].steal() {
                Steal::Success(t) => return Some(t),
                Steal::Retry => continue,
                Steal::Empty => break,
            }
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn worker_loop<OM, T>(
    target: &T,
    local: &Deque<ObjectReference>,
    injector: &Injector<ObjectReference>,
    stealers: &[Stealer<ObjectReference>],
    self_id: usize,
    barrier: &TerminationBarrier,
    victim_cursor: &AtomicUsize,
) where
    OM: ObjectModel,
    T: Traceable<OM>,
{
    loop {
        match find_task(local, injector, stealers, self_id, victim_cursor) {
            Some(obj) => {
                barrier.note_progress();
                let kind = target.kind_of(obj);
                OM::visit_fields(kind, obj, &mut |slot: Address| {
                    if let Some(child) = read_slot(slot) {
                        if target.try_mark(child) {
                            local.push(child);
                        }
                    }
                });
            }
            None => {
                if barrier.idle_and_wait() {
                    return;
                }
            }
        }
    }
}

/// The termination-detection barrier for the parallel marker. A worker
/// that finds no work anywhere declares itself idle; if every worker is
/// simultaneously idle, the whole trace is done. If any worker produces
/// new work while others are waiting, the barrier "re-opens": the idle
/// count resets and waiting workers wake up to look for work again.
struct TerminationBarrier {
    num_workers: usize,
    state: Mutex<BarrierState>,
    cv: Condvar,
}

struct BarrierState {
    idle: usize,
    generation: u64,
    terminated: bool,
}

impl TerminationBarrier {
    fn new(num_workers: usize) -> TerminationBarrier {
        TerminationBarrier {
            num_workers,
            state: Mutex::new(BarrierState {
                idle: 0,
                generation: 0,
                terminated: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Called whenever a worker has just found (or produced) work, so
    /// that any peer mid-way through declaring termination backs off.
    fn note_progress(&self) {
        let mut state = self.state.lock().unwrap();
        if state.idle > 0 {
            state.idle = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cv.notify_all();
        }
    }

    /// Returns `true` once every worker has simultaneously observed
    /// local-deque emptiness and steal failure.
    fn idle_and_wait(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.idle += 1;
        if state.idle == self.num_workers {
            state.terminated = true;
            self.cv.notify_all();
            return true;
        }
        let my_generation = state.generation;
        loop {
            state = self.cv.wait(state).unwrap();
            if state.terminated {
                return true;
            }
            if state.generation != my_generation {
                return false;
            }
        }
    }
}
