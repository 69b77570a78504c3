//! The single background thread that runs path searches.

use std::any::Any;
use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use lamplight_core::{Context, Tile};
use lamplight_paths::{Cancelled, MapData, PathSearch, SearchLimits, WallOverrides};
use log::{error, warn};

use crate::fixture::FixtureId;
use crate::result::{NavigationResult, Shared, TargetKind};

/// Name of the worker thread.
pub const WORKER_THREAD_NAME: &str = "lamplight-pathfinder";

#[derive(Debug, Clone)]
pub(crate) enum Request {
    /// Path to a single utility target.
    Route {
        player: Tile,
        target: Tile,
        kind: TargetKind,
    },
    /// Path to whichever target is nearest.
    Nearest {
        player: Tile,
        targets: Vec<Tile>,
        walls: WallOverrides,
        fixtures: HashMap<Tile, FixtureId>,
    },
}

#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) ctx: Context,
    pub(crate) generation: u64,
    pub(crate) limits: SearchLimits,
    pub(crate) request: Request,
}

pub(crate) struct Worker {
    tx: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn(map: Arc<MapData>, shared: Arc<Shared>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run(map, shared, rx))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue `job`. Gives the job back if the worker is gone.
    pub(crate) fn submit(&self, job: Job) -> Result<(), Job> {
        match &self.tx {
            Some(tx) => tx.send(job).map_err(|e| e.0),
            None => Err(job),
        }
    }

    /// Close the queue and wait for the thread to finish. Idempotent.
    pub(crate) fn shut_down(&mut self) {
        self.tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("{WORKER_THREAD_NAME} thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shut_down();
    }
}

/// Marks the current job finished when dropped, on every exit path.
struct JobDone<'a>(&'a Shared);

impl Drop for JobDone<'_> {
    fn drop(&mut self) {
        self.0.job_done();
    }
}

fn run(map: Arc<MapData>, shared: Arc<Shared>, rx: mpsc::Receiver<Job>) {
    for job in rx {
        let _done = JobDone(&shared);
        if job.ctx.is_done() {
            continue;
        }
        let search = PathSearch::with_limits(Arc::clone(&map), job.limits);
        let result = match guarded(|| compute(&search, &job.request, &job.ctx)) {
            Some(Ok(result)) => Some(result),
            Some(Err(Cancelled)) => None,
            None => guarded(|| failure(&job.request)),
        };
        if let Some(result) = result {
            shared.publish_if_current(job.generation, &job.ctx, result);
        }
    }
}

/// Run `f`, logging and swallowing any panic.
fn guarded<T>(f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            error!(
                "path computation panicked: {}",
                panic_message(payload.as_ref())
            );
            None
        }
    }
}

pub(crate) fn compute(
    search: &PathSearch,
    request: &Request,
    ctx: &Context,
) -> Result<NavigationResult, Cancelled> {
    match request {
        Request::Route {
            player,
            target,
            kind,
        } => {
            let path = search.find_path_with(*player, *target, ctx)?;
            if path.is_empty() {
                Ok(NavigationResult::fallback(*player, *target, *kind))
            } else {
                Ok(NavigationResult::found(path, *kind, None))
            }
        }
        Request::Nearest {
            player,
            targets,
            walls,
            fixtures,
        } => Ok(match search.find_nearest_with(*player, targets, walls, ctx)? {
            Some(nearest) => NavigationResult::found(
                nearest.path,
                TargetKind::NearestFixture,
                fixtures.get(&nearest.target).copied(),
            ),
            None => NavigationResult::cleared(TargetKind::NearestFixture),
        }),
    }
}

/// What to publish when a computation fails unexpectedly.
pub(crate) fn failure(request: &Request) -> NavigationResult {
    match request {
        Request::Route {
            player,
            target,
            kind,
        } => NavigationResult::fallback(*player, *target, *kind),
        Request::Nearest { .. } => NavigationResult::cleared(TargetKind::NearestFixture),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

pub(crate) fn warn_dropped(job: &Job) {
    warn!(
        "{WORKER_THREAD_NAME} is not running, dropped request {:?}",
        job.request
    );
}
