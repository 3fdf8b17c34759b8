//! Mock GitLab implementation for testing.
//!
//! Provides [`MockGitLab`] for unit testing without network access.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use crate::api::{MergeRequest, MergeRequestApi, Note, NoteStream, Project};
use crate::error::{RemoteError, RemoteErrorKind};

const BACKEND: &str = "Mock";

/// Default number of notes served per page.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Operation of the [`MergeRequestApi`] trait, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `get_project`
    GetProject,
    /// `get_merge_request`
    GetMergeRequest,
    /// Fetching a page of `list_notes`
    ListNotes,
    /// `create_note`
    CreateNote,
    /// `update_note`
    UpdateNote,
}

/// Number of calls made against a [`MockGitLab`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `get_project` calls.
    pub get_project: usize,
    /// `get_merge_request` calls.
    pub get_merge_request: usize,
    /// `list_notes` calls (streams opened).
    pub list_notes: usize,
    /// Note pages fetched by all streams.
    pub pages_fetched: usize,
    /// `create_note` calls.
    pub create_note: usize,
    /// `update_note` calls.
    pub update_note: usize,
}

impl CallCounts {
    /// Total number of remote requests (stream creation alone is free).
    #[must_use]
    pub fn requests(&self) -> usize {
        self.get_project
            + self.get_merge_request
            + self.pages_fetched
            + self.create_note
            + self.update_note
    }
}

#[derive(Debug, Default)]
struct MockState {
    projects: HashMap<u64, Project>,
    merge_requests: HashMap<(u64, u64), MergeRequest>,
    notes: HashMap<(u64, u64), Vec<Note>>,
    next_note_id: u64,
    failures: HashMap<Operation, RemoteErrorKind>,
    calls: CallCounts,
}

/// Mock GitLab for testing.
///
/// Stores projects, merge requests and notes in memory and serves notes in
/// pages, oldest first. Use the builder methods to configure the mock with
/// test data.
///
/// # Example
///
/// ```ignore
/// use mrc_notes::{MergeRequestApi, MockGitLab};
///
/// let gitlab = MockGitLab::new()
///     .with_merge_request(123, 45)
///     .with_note(123, 45, "LGTM");
///
/// let project = gitlab.get_project(123).unwrap();
/// let mr = gitlab.get_merge_request(&project, 45).unwrap();
/// assert_eq!(gitlab.list_notes(&mr).count(), 1);
/// ```
#[derive(Debug)]
pub struct MockGitLab {
    state: RwLock<MockState>,
    page_size: usize,
}

impl Default for MockGitLab {
    fn default() -> Self {
        Self {
            state: RwLock::new(MockState {
                next_note_id: 1,
                ..MockState::default()
            }),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MockGitLab {
    /// Create a new empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of notes served per page.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be positive");
        self.page_size = page_size;
        self
    }

    /// Add a merge request (and its project, if new).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_merge_request(self, project_id: u64, mr_iid: u64) -> Self {
        {
            let mut state = self.state.write().unwrap();
            state.projects.entry(project_id).or_insert_with(|| Project {
                id: project_id,
                path_with_namespace: format!("group/project-{project_id}"),
            });
            state
                .merge_requests
                .entry((project_id, mr_iid))
                .or_insert_with(|| MergeRequest {
                    project_id,
                    iid: mr_iid,
                });
            state.notes.entry((project_id, mr_iid)).or_default();
        }
        self
    }

    /// Add a note to a merge request, creating the merge request if needed.
    ///
    /// Notes receive increasing IDs in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_note(self, project_id: u64, mr_iid: u64, body: impl Into<String>) -> Self {
        let mock = self.with_merge_request(project_id, mr_iid);
        {
            let mut state = mock.state.write().unwrap();
            let id = state.next_note_id;
            state.next_note_id += 1;
            state
                .notes
                .entry((project_id, mr_iid))
                .or_default()
                .push(Note {
                    id,
                    body: body.into(),
                });
        }
        mock
    }

    /// Make every call of `operation` fail with `kind`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn failing(self, operation: Operation, kind: RemoteErrorKind) -> Self {
        self.state.write().unwrap().failures.insert(operation, kind);
        self
    }

    /// Current notes on a merge request, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn notes(&self, project_id: u64, mr_iid: u64) -> Vec<Note> {
        self.state
            .read()
            .unwrap()
            .notes
            .get(&(project_id, mr_iid))
            .cloned()
            .unwrap_or_default()
    }

    /// Calls made so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.state.read().unwrap().calls
    }

    fn check_failure(state: &MockState, operation: Operation) -> Result<(), RemoteError> {
        match state.failures.get(&operation) {
            Some(kind) => Err(RemoteError::new(*kind)
                .with_backend(BACKEND)
                .with_resource(format!("{operation:?}"))),
            None => Ok(()),
        }
    }

    /// Serve one page of notes. Returns the page and whether more pages follow.
    fn fetch_page(&self, key: (u64, u64), page: usize) -> Result<(Vec<Note>, bool), RemoteError> {
        let mut state = self.state.write().unwrap();
        state.calls.pages_fetched += 1;
        Self::check_failure(&state, Operation::ListNotes)?;

        let notes = state.notes.get(&key).ok_or_else(|| {
            RemoteError::not_found(format!("project {} !{}", key.0, key.1)).with_backend(BACKEND)
        })?;
        let start = page * self.page_size;
        let end = (start + self.page_size).min(notes.len());
        let items = notes.get(start..end).map(<[Note]>::to_vec).unwrap_or_default();
        Ok((items, end < notes.len()))
    }
}

impl MergeRequestApi for MockGitLab {
    fn get_project(&self, project_id: u64) -> Result<Project, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.calls.get_project += 1;
        Self::check_failure(&state, Operation::GetProject)?;
        state.projects.get(&project_id).cloned().ok_or_else(|| {
            RemoteError::not_found(format!("project {project_id}")).with_backend(BACKEND)
        })
    }

    fn get_merge_request(
        &self,
        project: &Project,
        mr_iid: u64,
    ) -> Result<MergeRequest, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.calls.get_merge_request += 1;
        Self::check_failure(&state, Operation::GetMergeRequest)?;
        state
            .merge_requests
            .get(&(project.id, mr_iid))
            .cloned()
            .ok_or_else(|| {
                RemoteError::not_found(format!("project {} !{mr_iid}", project.id))
                    .with_backend(BACKEND)
            })
    }

    fn list_notes<'a>(&'a self, mr: &MergeRequest) -> NoteStream<'a> {
        self.state.write().unwrap().calls.list_notes += 1;
        Box::new(MockPager {
            mock: self,
            key: (mr.project_id, mr.iid),
            next_page: Some(0),
            buffer: VecDeque::new(),
        })
    }

    fn create_note(&self, mr: &MergeRequest, body: &str) -> Result<Note, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.calls.create_note += 1;
        Self::check_failure(&state, Operation::CreateNote)?;

        let id = state.next_note_id;
        let notes = state
            .notes
            .get_mut(&(mr.project_id, mr.iid))
            .ok_or_else(|| {
                RemoteError::not_found(format!("project {} !{}", mr.project_id, mr.iid))
                    .with_backend(BACKEND)
            })?;
        let note = Note {
            id,
            body: body.to_owned(),
        };
        notes.push(note.clone());
        state.next_note_id += 1;
        Ok(note)
    }

    fn update_note(
        &self,
        mr: &MergeRequest,
        note_id: u64,
        body: &str,
    ) -> Result<Note, RemoteError> {
        let mut state = self.state.write().unwrap();
        state.calls.update_note += 1;
        Self::check_failure(&state, Operation::UpdateNote)?;

        let note = state
            .notes
            .get_mut(&(mr.project_id, mr.iid))
            .and_then(|notes| notes.iter_mut().find(|n| n.id == note_id))
            .ok_or_else(|| RemoteError::not_found(format!("note {note_id}")).with_backend(BACKEND))?;
        body.clone_into(&mut note.body);
        Ok(note.clone())
    }
}

/// Lazy page-by-page note iterator over a [`MockGitLab`].
struct MockPager<'a> {
    mock: &'a MockGitLab,
    key: (u64, u64),
    next_page: Option<usize>,
    buffer: VecDeque<Note>,
}

impl Iterator for MockPager<'_> {
    type Item = Result<Note, RemoteError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(note) = self.buffer.pop_front() {
                return Some(Ok(note));
            }
            let page = self.next_page.take()?;
            match self.mock.fetch_page(self.key, page) {
                Ok((notes, has_more)) => {
                    self.buffer.extend(notes);
                    if has_more {
                        self.next_page = Some(page + 1);
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
