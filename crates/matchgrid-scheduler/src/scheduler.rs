//! Scheduler — the run/match state machine and worker dispatch.
//!
//! The `Scheduler` is the control loop that:
//! - Promotes queued runs to RUNNING, one at a time
//! - Fills each worker's capacity (fresh scrimmages, then fresh run
//!   matches, then redundant copies of running work)
//! - Validates and persists completion reports, discarding stale
//!   duplicates from losing racers
//! - Emits notifications for every observable state change
//!
//! Every mutating operation runs under one mutex; all scheduling
//! decisions serialize so match status can never be raced. The
//! lock is never held across network or blocking I/O: outbound messages
//! are queued on per-connection channels and persistence is prompt local
//! I/O.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use matchgrid_artifacts::{ArtifactStore, EngineUpdate, plan_match, plan_scrimmage};
use matchgrid_notify::{Channel, Command, NotificationBus};
use matchgrid_proto::{ReportOutcome, ToWorker};
use matchgrid_state::*;

use crate::error::{SchedulerError, SchedulerResult};
use crate::worker::{Assignment, ConnectionInfo, WorkerHandle, WorkerId};

/// Mutable scheduler state, guarded by the scheduler's mutex.
struct Core {
    state: StateStore,
    artifacts: ArtifactStore,
    bus: NotificationBus,
    workers: HashMap<WorkerId, WorkerHandle>,
    next_worker_id: WorkerId,
}

/// The run/match scheduler service.
///
/// Constructed once and shared by handle; the connection layer, the API
/// layer, and the background rescan task all call into the same
/// instance.
pub struct Scheduler {
    core: Mutex<Core>,
}

impl Scheduler {
    /// Create a new scheduler over the given store, artifact root, and
    /// notification bus.
    pub fn new(state: StateStore, artifacts: ArtifactStore, bus: NotificationBus) -> Self {
        Self {
            core: Mutex::new(Core {
                state,
                artifacts,
                bus,
                workers: HashMap::new(),
                next_worker_id: 1,
            }),
        }
    }

    // ── Run lifecycle ──────────────────────────────────────────────

    /// Create a QUEUED run with one match per (map x seed) and try to
    /// start it.
    pub fn queue_run(
        &self,
        team_a: PlayerId,
        team_b: PlayerId,
        seeds: &[u64],
        map_ids: &[MapId],
    ) -> SchedulerResult<RunId> {
        let mut guard = self.lock();
        let core = &mut *guard;

        if seeds.is_empty() || map_ids.is_empty() {
            return Err(SchedulerError::EmptyRun);
        }
        let player_a = core
            .state
            .get_player(team_a)?
            .ok_or(SchedulerError::PlayerNotFound(team_a))?;
        let player_b = core
            .state
            .get_player(team_b)?
            .ok_or(SchedulerError::PlayerNotFound(team_b))?;
        let mut maps = Vec::with_capacity(map_ids.len());
        for id in map_ids {
            maps.push(
                core.state
                    .get_map(*id)?
                    .ok_or(SchedulerError::MapNotFound(*id))?,
            );
        }

        let run_id = core.state.next_id("run")?;
        core.state.put_run(&Run {
            id: run_id,
            team_a,
            team_b,
            status: RunStatus::Queued,
            started: None,
            ended: None,
            a_wins: 0,
            b_wins: 0,
        })?;
        for map in &maps {
            for seed in seeds {
                let match_id = core.state.next_id("match")?;
                core.state.put_match(&Match {
                    id: match_id,
                    run: run_id,
                    map: map.id,
                    seed: *seed,
                    status: MatchStatus::Queued,
                    result: None,
                })?;
            }
        }

        core.bus.publish(
            Channel::Runs,
            Command::InsertRow,
            vec![run_id.to_string(), player_a.name, player_b.name],
        );
        info!(
            run = run_id,
            matches = maps.len() * seeds.len(),
            "queued new run"
        );
        try_start_next_run(core)?;
        Ok(run_id)
    }

    /// Cancel the run if it is currently RUNNING, otherwise delete it
    /// and its matches (and the replays of completed matches) outright.
    pub fn cancel_or_delete_run(&self, run_id: RunId) -> SchedulerResult<()> {
        let mut guard = self.lock();
        let core = &mut *guard;
        let run = core
            .state
            .get_run(run_id)?
            .ok_or(SchedulerError::RunNotFound(run_id))?;

        if run.status == RunStatus::Running {
            info!(run = run_id, "canceling active run");
            stop_current_run(core, run_id, RunStatus::Canceled)?;
            try_start_next_run(core)?;
        } else {
            info!(run = run_id, "deleting run");
            for m in core.state.matches_for_run(run_id)? {
                if m.status == MatchStatus::Complete {
                    let map_name = core
                        .state
                        .get_map(m.map)?
                        .map(|mi| mi.name)
                        .unwrap_or_default();
                    core.artifacts.delete_replay(run_id, &map_name, m.seed);
                }
                core.state.delete_match(m.id)?;
            }
            core.state.delete_run(run_id)?;
            core.bus.publish(
                Channel::Runs,
                Command::DeleteRow,
                vec![run_id.to_string()],
            );
        }
        Ok(())
    }

    /// Promote the oldest queued run if no run is active; with an empty
    /// run queue, nudge dispatch when scrimmages are waiting.
    pub fn try_start_next_run(&self) -> SchedulerResult<()> {
        try_start_next_run(&mut self.lock())
    }

    // ── Scrimmage lifecycle ────────────────────────────────────────

    /// Store an uploaded scrimmage file and queue it for analysis.
    pub fn queue_scrimmage(&self, file_name: &str, bytes: &[u8]) -> SchedulerResult<ScrimmageId> {
        let mut guard = self.lock();
        let core = &mut *guard;

        let id = core.state.next_id("scrimmage")?;
        core.artifacts.store_scrimmage(id, bytes)?;
        core.state.put_scrimmage(&ScrimmageSet {
            id,
            file_name: file_name.to_string(),
            status: MatchStatus::Queued,
            result: None,
            submitted_at: epoch_secs(),
        })?;
        core.bus.publish(
            Channel::Scrimmages,
            Command::InsertRow,
            vec![id.to_string(), file_name.to_string()],
        );
        info!(scrimmage = id, file = file_name, "queued scrimmage analysis");

        // Scrimmages are served even while a run is active, so nudge
        // every worker rather than waiting for the next completion.
        for wid in worker_ids(core) {
            dispatch(core, wid);
        }
        Ok(id)
    }

    /// Delete a scrimmage that is not currently being analyzed.
    pub fn delete_scrimmage(&self, id: ScrimmageId) -> SchedulerResult<()> {
        let mut guard = self.lock();
        let core = &mut *guard;
        let scrim = core
            .state
            .get_scrimmage(id)?
            .ok_or(SchedulerError::ScrimmageNotFound(id))?;
        if scrim.status == MatchStatus::Running {
            return Err(SchedulerError::ScrimmageBusy(id));
        }
        core.artifacts.delete_scrimmage(id);
        core.state.delete_scrimmage(id)?;
        core.bus.publish(
            Channel::Scrimmages,
            Command::DeleteRow,
            vec![id.to_string()],
        );
        Ok(())
    }

    // ── Worker connections ─────────────────────────────────────────

    /// Register a new worker connection and immediately attempt
    /// dispatch (a no-op until its handshake supplies a capacity).
    pub fn worker_connected(
        &self,
        addr: String,
        outbox: mpsc::UnboundedSender<ToWorker>,
    ) -> WorkerId {
        let mut guard = self.lock();
        let core = &mut *guard;
        let id = core.next_worker_id;
        core.next_worker_id += 1;
        let worker = WorkerHandle::new(id, addr, outbox);
        info!(worker = %worker.label(), "worker connected");
        core.bus.publish(
            Channel::Connections,
            Command::InsertRow,
            vec![worker.label()],
        );
        core.workers.insert(id, worker);
        dispatch(core, id);
        id
    }

    /// Record the capacity from a worker's handshake and fill it.
    pub fn worker_handshake(&self, id: WorkerId, capacity: u32) {
        let mut guard = self.lock();
        let core = &mut *guard;
        let Some(worker) = core.workers.get_mut(&id) else {
            warn!(worker = id, "handshake from unknown worker");
            return;
        };
        worker.set_capacity(capacity as usize);
        info!(worker = %worker.label(), capacity, "worker handshake");
        dispatch(core, id);
    }

    /// Deregister a worker. Its in-flight matches stay RUNNING and are
    /// picked up by the redundancy pass of later dispatches elsewhere.
    pub fn worker_disconnected(&self, id: WorkerId) {
        let mut guard = self.lock();
        let core = &mut *guard;
        if let Some(worker) = core.workers.remove(&id) {
            info!(worker = %worker.label(), "worker disconnected");
            core.bus.publish(
                Channel::Connections,
                Command::DeleteRow,
                vec![worker.label()],
            );
        }
    }

    /// Snapshot of the connected workers for the control surface.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        let core = self.lock();
        let mut infos: Vec<ConnectionInfo> =
            core.workers.values().map(WorkerHandle::snapshot).collect();
        infos.sort_by_key(|c| c.id);
        infos
    }

    // ── Completion reports ─────────────────────────────────────────

    /// Handle a worker's match completion report.
    ///
    /// Stale reports (the match is no longer RUNNING, its run is no
    /// longer RUNNING, or the match no longer exists) are discarded
    /// without mutating state: some other worker's redundant copy
    /// already won the race, or the run was canceled.
    pub fn match_completed(
        &self,
        worker_id: WorkerId,
        match_id: MatchId,
        outcome: ReportOutcome,
        result: Option<MatchResult>,
        replay: &[u8],
    ) -> SchedulerResult<()> {
        let mut guard = self.lock();
        let core = &mut *guard;

        let worker_label = if let Some(worker) = core.workers.get_mut(&worker_id) {
            worker.complete(Assignment::Match(match_id));
            worker.label()
        } else {
            format!("worker-{worker_id} (gone)")
        };
        // The worker is no longer executing this match from the
        // caller's point of view, whatever we decide about the report.
        core.bus.publish(
            Channel::Connections,
            Command::RemoveAssignment,
            vec![worker_label, format!("match-{match_id}")],
        );

        let Some(mut m) = core.state.get_match(match_id)? else {
            info!(match_id = match_id, "discarding completion for unknown match");
            dispatch(core, worker_id);
            return Ok(());
        };
        let run = core.state.get_run(m.run)?;
        let Some(mut run) = run.filter(|r| r.status == RunStatus::Running) else {
            info!(match_id = match_id, "discarding stale completion (run stopped)");
            dispatch(core, worker_id);
            return Ok(());
        };
        if m.status != MatchStatus::Running {
            info!(match_id = match_id, "discarding stale completion (already finished)");
            dispatch(core, worker_id);
            return Ok(());
        }

        match (outcome, result) {
            (ReportOutcome::Success, Some(result)) => {
                m.result = Some(result);
                m.status = MatchStatus::Complete;
                core.state.put_match(&m)?;

                match result.winner {
                    Team::A => run.a_wins += 1,
                    Team::B => run.b_wins += 1,
                }
                core.state.put_run(&run)?;

                let map_name = core
                    .state
                    .get_map(m.map)?
                    .map(|mi| mi.name)
                    .unwrap_or_default();
                core.artifacts.write_replay(run.id, &map_name, m.seed, replay)?;

                let total = core.state.count_matches_for_run(run.id)?;
                let complete = core
                    .state
                    .count_matches_for_run_by_status(run.id, MatchStatus::Complete)?;
                let percent = if total == 0 { 100 } else { complete * 100 / total };
                info!(
                    match_id = match_id,
                    run = run.id,
                    winner = %result.winner,
                    "match finished"
                );
                core.bus.publish(
                    Channel::Runs,
                    Command::MatchFinished,
                    vec![
                        run.id.to_string(),
                        result.winner.to_string(),
                        run.a_wins.to_string(),
                        run.b_wins.to_string(),
                        percent.to_string(),
                    ],
                );
            }
            _ => {
                // The match stays RUNNING and therefore redundancy-
                // eligible; a later dispatch pass will re-send it.
                warn!(match_id = match_id, run = run.id, "match failed on worker");
            }
        }

        let remaining = core.state.count_matches_for_run(run.id)?
            - core
                .state
                .count_matches_for_run_by_status(run.id, MatchStatus::Complete)?;
        if remaining == 0 {
            stop_current_run(core, run.id, RunStatus::Complete)?;
            try_start_next_run(core)?;
        } else {
            dispatch(core, worker_id);
        }
        Ok(())
    }

    /// Handle a worker's scrimmage analysis report. Simpler than match
    /// completion: no win counters and no run-completion cascade.
    pub fn scrimmage_completed(
        &self,
        worker_id: WorkerId,
        scrimmage_id: ScrimmageId,
        outcome: ReportOutcome,
        result: Option<ScrimmageAnalysis>,
    ) -> SchedulerResult<()> {
        let mut guard = self.lock();
        let core = &mut *guard;

        let worker_label = if let Some(worker) = core.workers.get_mut(&worker_id) {
            worker.complete(Assignment::Scrimmage(scrimmage_id));
            worker.label()
        } else {
            format!("worker-{worker_id} (gone)")
        };
        core.bus.publish(
            Channel::Connections,
            Command::RemoveAssignment,
            vec![worker_label, format!("scrimmage-{scrimmage_id}")],
        );

        let Some(mut scrim) = core.state.get_scrimmage(scrimmage_id)? else {
            info!(scrimmage = scrimmage_id, "discarding report for unknown scrimmage");
            dispatch(core, worker_id);
            return Ok(());
        };
        if scrim.status != MatchStatus::Running {
            info!(scrimmage = scrimmage_id, "discarding stale scrimmage report");
            dispatch(core, worker_id);
            return Ok(());
        }

        match (outcome, result) {
            (ReportOutcome::Success, Some(result)) => {
                scrim.status = MatchStatus::Complete;
                scrim.result = Some(result.clone());
                core.state.put_scrimmage(&scrim)?;
                info!(scrimmage = scrimmage_id, winner = %result.winner, "scrimmage analyzed");
                core.bus.publish(
                    Channel::Scrimmages,
                    Command::FinishScrimmage,
                    vec![scrimmage_id.to_string(), result.winner.to_string()],
                );
            }
            _ => {
                warn!(scrimmage = scrimmage_id, "scrimmage analysis failed on worker");
            }
        }

        dispatch(core, worker_id);
        Ok(())
    }

    // ── Artifacts ──────────────────────────────────────────────────

    /// Stage a new engine version. Applied immediately when no run is
    /// active, otherwise flushed when the current run stops.
    pub fn stage_engine_update(&self, update: EngineUpdate) -> SchedulerResult<()> {
        let mut guard = self.lock();
        let core = &mut *guard;
        core.artifacts.stage_engine_update(update);
        let active = core.state.find_run_by_status(RunStatus::Running)?;
        if active.is_none() {
            core.artifacts.apply_pending_update()?;
        }
        Ok(())
    }

    /// Fold newly discovered map files into the catalog. Called
    /// periodically by the daemon's background task.
    pub fn rescan_maps(&self) -> SchedulerResult<()> {
        let mut guard = self.lock();
        let core = &mut *guard;
        let Some(found) = core.artifacts.scan_maps()? else {
            return Ok(());
        };
        for (name, hash) in found {
            match core.state.find_map_by_name(&name)? {
                Some(mut existing) => {
                    if existing.hash != hash {
                        existing.hash = hash;
                        core.state.put_map(&existing)?;
                        info!(map = %name, "map file changed; catalog hash refreshed");
                    }
                }
                None => {
                    let id = core.state.next_id("map")?;
                    core.state.put_map(&MapInfo {
                        id,
                        name: name.clone(),
                        hash,
                        discovered_at: epoch_secs(),
                    })?;
                    info!(map = %name, id, "discovered new map");
                }
            }
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Core> {
        self.core.lock().expect("scheduler core lock")
    }
}

// ── Internal scheduling passes ─────────────────────────────────────

fn worker_ids(core: &Core) -> Vec<WorkerId> {
    let mut ids: Vec<WorkerId> = core.workers.keys().copied().collect();
    ids.sort_unstable();
    ids
}

/// Promote the oldest QUEUED run when no run is active.
///
/// Runs whose team packages are missing are marked ERROR and skipped.
/// With an empty run queue, waiting scrimmages still trigger a dispatch
/// pass so they can run without an active run.
fn try_start_next_run(core: &mut Core) -> SchedulerResult<()> {
    if core.state.find_run_by_status(RunStatus::Running)?.is_some() {
        return Ok(());
    }

    loop {
        let Some(mut run) = core.state.find_run_by_status(RunStatus::Queued)? else {
            break;
        };

        let player_a = core.state.get_player(run.team_a)?;
        let player_b = core.state.get_player(run.team_b)?;
        let packages_ok = match (&player_a, &player_b) {
            (Some(a), Some(b)) => {
                core.artifacts.team_exists(&a.name) && core.artifacts.team_exists(&b.name)
            }
            _ => false,
        };
        if !packages_ok {
            warn!(run = run.id, "team package missing; marking run as errored");
            run.status = RunStatus::Error;
            run.ended = Some(epoch_secs());
            core.state.put_run(&run)?;
            core.bus.publish(
                Channel::Runs,
                Command::FinishRun,
                vec![run.id.to_string(), RunStatus::Error.to_string()],
            );
            continue;
        }

        run.status = RunStatus::Running;
        run.started = Some(epoch_secs());
        core.state.put_run(&run)?;
        let total = core.state.count_matches_for_run(run.id)?;
        info!(run = run.id, matches = total, "run started");
        core.bus.publish(
            Channel::Runs,
            Command::StartRun,
            vec![run.id.to_string(), total.to_string()],
        );
        for wid in worker_ids(core) {
            dispatch(core, wid);
        }
        return Ok(());
    }

    if !core.state.scrimmages_by_status(MatchStatus::Queued)?.is_empty() {
        for wid in worker_ids(core) {
            dispatch(core, wid);
        }
    }
    Ok(())
}

/// Terminate the active run with the given status: stamp it, drop its
/// unfinished matches, stop every worker, and flush any staged engine
/// update.
fn stop_current_run(core: &mut Core, run_id: RunId, status: RunStatus) -> SchedulerResult<()> {
    let mut run = core
        .state
        .get_run(run_id)?
        .ok_or(SchedulerError::RunNotFound(run_id))?;
    info!(run = run_id, %status, "stopping current run");
    run.status = status;
    run.ended = Some(epoch_secs());
    core.state.put_run(&run)?;

    // Unfinished matches die with the run; any late completion for them
    // will resolve as stale.
    for m in core.state.matches_for_run(run_id)? {
        if m.status != MatchStatus::Complete {
            core.state.delete_match(m.id)?;
        }
    }

    core.bus.publish(
        Channel::Runs,
        Command::FinishRun,
        vec![run_id.to_string(), status.to_string()],
    );
    core.bus
        .publish(Channel::Connections, Command::FinishRun, vec![]);
    for worker in core.workers.values_mut() {
        worker.stop_all();
    }

    if let Err(e) = core.artifacts.apply_pending_update() {
        error!(error = %e, "failed to apply staged engine update");
    }
    Ok(())
}

/// One atomic assignment pass for a single worker.
///
/// Precedence: queued scrimmages, queued run matches, redundant copies
/// of running matches, redundant copies of running scrimmages. Fresh
/// work always precedes re-sends, and run matches outrank scrimmages
/// for redundancy.
///
/// A state-store fault aborts the pass (logged, nothing propagates); an
/// artifact read fault additionally stops the worker's current work so
/// the next pass starts from a clean resync.
fn dispatch(core: &mut Core, wid: WorkerId) {
    if let Err(e) = dispatch_pass(core, wid) {
        match e {
            DispatchAbort::Artifact(key, err) => {
                let Core { bus, workers, .. } = core;
                if let Some(worker) = workers.get_mut(&wid) {
                    error!(
                        worker = %worker.label(),
                        assignment = %key,
                        error = %err,
                        "artifact read failed; stopping worker for resync"
                    );
                    bus.publish(
                        Channel::Connections,
                        Command::RemoveAssignment,
                        vec![worker.label(), key],
                    );
                    worker.stop_all();
                }
            }
            DispatchAbort::State(err) => {
                error!(worker = wid, error = %err, "dispatch pass aborted on state error");
            }
        }
    }
}

/// Why a dispatch pass stopped early.
enum DispatchAbort {
    /// Reading an artifact for the keyed assignment failed.
    Artifact(String, matchgrid_artifacts::ArtifactError),
    State(StateError),
}

impl From<StateError> for DispatchAbort {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

fn dispatch_pass(core: &mut Core, wid: WorkerId) -> Result<(), DispatchAbort> {
    let Core {
        state,
        artifacts,
        bus,
        workers,
        ..
    } = core;
    let Some(worker) = workers.get_mut(&wid) else {
        return Ok(());
    };
    // Nothing to do for a full worker or one that has not handshaken.
    if !worker.is_free() {
        return Ok(());
    }

    // 1. Fresh scrimmages. Cheap jobs that must not starve, but they
    // still yield to run matches for redundancy below.
    for mut scrim in state.scrimmages_by_status(MatchStatus::Queued)? {
        if !worker.is_free() {
            break;
        }
        let key = format!("scrimmage-{}", scrim.id);
        let label = scrimmage_label(&scrim);
        let file = artifacts
            .read_scrimmage(scrim.id)
            .map_err(|e| DispatchAbort::Artifact(key.clone(), e))?;
        let deps = plan_scrimmage(artifacts, &mut worker.known)
            .map_err(|e| DispatchAbort::Artifact(key.clone(), e))?;
        scrim.status = MatchStatus::Running;
        state.put_scrimmage(&scrim)?;
        info!(worker = %worker.label(), scrimmage = scrim.id, "assigning scrimmage");
        bus.publish(
            Channel::Connections,
            Command::AddAssignment,
            vec![worker.label(), key, label.clone()],
        );
        worker.assign_scrimmage(scrim.id, &scrim.file_name, file, deps, label);
    }

    // 2. Fresh matches of the active run.
    let active = state.find_run_by_status(RunStatus::Running)?;
    if let Some(run) = &active {
        let team_a = match state.get_player(run.team_a)? {
            Some(p) => p.name,
            None => {
                error!(run = run.id, "active run references a missing player");
                return Ok(());
            }
        };
        let team_b = match state.get_player(run.team_b)? {
            Some(p) => p.name,
            None => {
                error!(run = run.id, "active run references a missing player");
                return Ok(());
            }
        };

        for mut m in state.matches_for_run_by_status(run.id, MatchStatus::Queued)? {
            if !worker.is_free() {
                break;
            }
            let Some(map) = state.get_map(m.map)? else {
                error!(match_id = m.id, "match references a missing map");
                continue;
            };
            let key = format!("match-{}", m.id);
            let label = match_label(&map.name, m.seed);
            let deps = plan_match(artifacts, &mut worker.known, &map.name, &team_a, &team_b)
                .map_err(|e| DispatchAbort::Artifact(key.clone(), e))?;
            m.status = MatchStatus::Running;
            state.put_match(&m)?;
            info!(worker = %worker.label(), match_id = m.id, map = %map.name, "assigning match");
            bus.publish(
                Channel::Connections,
                Command::AddAssignment,
                vec![worker.label(), key, label.clone()],
            );
            worker.assign_match(m.id, run.id, &map.name, m.seed, &team_a, &team_b, deps, label);
        }

        // 3. Redundancy over running matches: spare capacity re-runs
        // work that is already assigned elsewhere, so a slow or dead
        // worker cannot stall the run. Candidates are sampled without
        // replacement; a worker never holds two copies of one match.
        if worker.is_free() {
            let mut candidates: Vec<Match> = state
                .matches_for_run_by_status(run.id, MatchStatus::Running)?
                .into_iter()
                .filter(|m| !worker.has(Assignment::Match(m.id)))
                .collect();
            candidates.shuffle(&mut rand::thread_rng());

            for m in candidates {
                if !worker.is_free() {
                    break;
                }
                let Some(map) = state.get_map(m.map)? else {
                    continue;
                };
                let key = format!("match-{}", m.id);
                let label = match_label(&map.name, m.seed);
                let deps = plan_match(artifacts, &mut worker.known, &map.name, &team_a, &team_b)
                    .map_err(|e| DispatchAbort::Artifact(key.clone(), e))?;
                info!(
                    worker = %worker.label(),
                    match_id = m.id,
                    map = %map.name,
                    "assigning redundant match"
                );
                bus.publish(
                    Channel::Connections,
                    Command::AddAssignment,
                    vec![worker.label(), key, label.clone()],
                );
                worker.assign_match(m.id, run.id, &map.name, m.seed, &team_a, &team_b, deps, label);
            }
        }
    }

    // 4. Redundancy over running scrimmages, last in line.
    if worker.is_free() {
        let mut candidates: Vec<ScrimmageSet> = state
            .scrimmages_by_status(MatchStatus::Running)?
            .into_iter()
            .filter(|s| !worker.has(Assignment::Scrimmage(s.id)))
            .collect();
        candidates.shuffle(&mut rand::thread_rng());

        for scrim in candidates {
            if !worker.is_free() {
                break;
            }
            let key = format!("scrimmage-{}", scrim.id);
            let label = scrimmage_label(&scrim);
            let file = artifacts
                .read_scrimmage(scrim.id)
                .map_err(|e| DispatchAbort::Artifact(key.clone(), e))?;
            let deps = plan_scrimmage(artifacts, &mut worker.known)
                .map_err(|e| DispatchAbort::Artifact(key.clone(), e))?;
            info!(
                worker = %worker.label(),
                scrimmage = scrim.id,
                "assigning redundant scrimmage"
            );
            bus.publish(
                Channel::Connections,
                Command::AddAssignment,
                vec![worker.label(), key, label.clone()],
            );
            worker.assign_scrimmage(scrim.id, &scrim.file_name, file, deps, label);
        }
    }

    Ok(())
}

fn match_label(map: &str, seed: u64) -> String {
    format!("{map} ({seed})")
}

fn scrimmage_label(s: &ScrimmageSet) -> String {
    format!("{} [scrimmage-{}]", s.file_name, s.id)
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
