//! Jobs of one downstream connection, keyed by stream id.

use std::collections::HashMap;

use super::job::Job;
use super::StreamId;

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: HashMap<StreamId, Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a job, returning the one it replaced for the same stream id.
    pub fn insert(&mut self, stream: StreamId, job: Job) -> Option<Job> {
        self.jobs.insert(stream, job)
    }

    pub fn get(&self, stream: StreamId) -> Option<&Job> {
        self.jobs.get(&stream)
    }

    pub fn get_mut(&mut self, stream: StreamId) -> Option<&mut Job> {
        self.jobs.get_mut(&stream)
    }

    pub fn remove(&mut self, stream: StreamId) -> Option<Job> {
        self.jobs.remove(&stream)
    }

    pub fn contains(&self, stream: StreamId) -> bool {
        self.jobs.contains_key(&stream)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Stream ids in ascending order (stable iteration for pacing and logs).
    pub fn stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.jobs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (StreamId, &Job)> {
        self.jobs.iter().map(|(id, job)| (*id, job))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (StreamId, &mut Job)> {
        self.jobs.iter_mut().map(|(id, job)| (*id, job))
    }

    /// Removes and returns the ids of jobs not marked alive.
    pub(crate) fn reap_dead(&mut self) -> Vec<StreamId> {
        let mut dead: Vec<StreamId> = self
            .jobs
            .iter()
            .filter(|(_, job)| !job.is_alive())
            .map(|(id, _)| *id)
            .collect();
        dead.sort_unstable();
        for id in &dead {
            self.jobs.remove(id);
        }
        dead
    }
}
