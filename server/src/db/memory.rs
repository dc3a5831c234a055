//! An in-memory [`Db`](super::Db) used by the test suite in place of
//! Postgres. It mirrors the store semantics the handlers rely on:
//! submitter identity keyed on email, status forced to `new` on
//! creation, the status gate on update, wholesale image replacement
//! and newest-first listing.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::errors::BackendError;
use crate::submission::{
    Status, SubmissionPayload, SubmissionSummary, SubmissionView, Submitter, UpdateOutcome,
};

#[derive(Default)]
pub struct MemoryDb {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    submitters: Vec<StoredSubmitter>,
    submissions: Vec<StoredSubmission>,
}

struct StoredSubmitter {
    id: i32,
    submitter: Submitter,
}

struct StoredSubmission {
    id: i32,
    submitter_id: i32,
    status: Status,
    add_time: DateTime<Utc>,
    // the user block inside is ignored on reads; the registry's
    // first-written submitter wins, as in the real store
    payload: SubmissionPayload,
}

/// Row counts per entity, for tests that assert nothing was written.
/// Coordinates are the 1:1 child of a submission here, so their count
/// equals the submission count by construction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Counts {
    pub submitters: usize,
    pub coords: usize,
    pub submissions: usize,
    pub images: usize,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips a submission's status, standing in for the external
    /// review process. Returns false if the ID is unknown.
    pub fn set_status(&self, id: i32, status: Status) -> bool {
        let mut state = self.state.write().unwrap();

        match state.submissions.iter_mut().find(|s| s.id == id) {
            Some(submission) => {
                submission.status = status;
                true
            }
            None => false,
        }
    }

    pub fn counts(&self) -> Counts {
        let state = self.state.read().unwrap();

        Counts {
            submitters: state.submitters.len(),
            coords: state.submissions.len(),
            submissions: state.submissions.len(),
            images: state.submissions.iter().map(|s| s.payload.images.len()).sum(),
        }
    }

    pub fn submitter_id(&self, email: &str) -> Option<i32> {
        let state = self.state.read().unwrap();

        state
            .submitters
            .iter()
            .find(|s| s.submitter.email == email)
            .map(|s| s.id)
    }
}

impl super::Db for MemoryDb {
    fn create_submission(
        &self,
        payload: SubmissionPayload,
    ) -> BoxFuture<Result<i32, BackendError>> {
        let mut state = self.state.write().unwrap();

        let existing = state
            .submitters
            .iter()
            .find(|s| s.submitter.email == payload.user.email)
            .map(|s| s.id);

        let submitter_id = match existing {
            Some(id) => id,
            None => {
                let id = state.submitters.len() as i32 + 1;

                state.submitters.push(StoredSubmitter {
                    id,
                    submitter: payload.user.clone(),
                });

                id
            }
        };

        let id = state.submissions.len() as i32 + 1;

        state.submissions.push(StoredSubmission {
            id,
            submitter_id,
            status: Status::New,
            add_time: Utc::now(),
            payload,
        });

        async move { Ok(id) }.boxed()
    }

    fn retrieve_submission(
        &self,
        id: i32,
    ) -> BoxFuture<Result<Option<SubmissionView>, BackendError>> {
        let state = self.state.read().unwrap();

        let view = state.submissions.iter().find(|s| s.id == id).map(|s| {
            let submitter = state
                .submitters
                .iter()
                .find(|submitter| submitter.id == s.submitter_id)
                .expect("submission without submitter");

            SubmissionView {
                submission: SubmissionPayload {
                    user: submitter.submitter.clone(),
                    ..s.payload.clone()
                },
                status: s.status,
            }
        });

        async move { Ok(view) }.boxed()
    }

    fn update_submission(
        &self,
        id: i32,
        payload: SubmissionPayload,
    ) -> BoxFuture<Result<UpdateOutcome, BackendError>> {
        let mut state = self.state.write().unwrap();

        let outcome = match state.submissions.iter_mut().find(|s| s.id == id) {
            None => UpdateOutcome::NotFound,
            Some(s) if s.status != Status::New => UpdateOutcome::NotEditable { status: s.status },
            Some(s) => {
                let SubmissionPayload {
                    user: _,
                    coords,
                    level,
                    images,
                    beauty_title,
                    title,
                    other_titles,
                    connect,
                } = payload;

                s.payload.coords = coords;
                s.payload.level = level;
                s.payload.images = images;
                s.payload.beauty_title = beauty_title;
                s.payload.title = title;
                s.payload.other_titles = other_titles;
                s.payload.connect = connect;

                UpdateOutcome::Updated
            }
        };

        async move { Ok(outcome) }.boxed()
    }

    fn list_by_submitter_email(
        &self,
        email: String,
    ) -> BoxFuture<Result<Vec<SubmissionSummary>, BackendError>> {
        let state = self.state.read().unwrap();

        let submitter_id = state
            .submitters
            .iter()
            .find(|s| s.submitter.email == email)
            .map(|s| s.id);

        let mut summaries: Vec<_> = match submitter_id {
            Some(submitter_id) => state
                .submissions
                .iter()
                .filter(|s| s.submitter_id == submitter_id)
                .map(|s| SubmissionSummary {
                    id: s.id,
                    status: s.status,
                    title: s.payload.title.clone(),
                    beauty_title: s.payload.beauty_title.clone(),
                    date_added: s.add_time,
                })
                .collect(),
            None => vec![],
        };

        summaries.sort_by(|a, b| b.date_added.cmp(&a.date_added).then(b.id.cmp(&a.id)));

        async move { Ok(summaries) }.boxed()
    }
}
