//! Note operations for GitLab API.

use std::collections::VecDeque;

use serde_json::json;
use tracing::{debug, info};

use mrc_notes::{Note, RemoteError};

use super::{GitLabClient, WriteMethod, notes_path, read_json};
use crate::error::GitLabError;

/// Response header naming the next page (empty on the last page).
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// One page of notes plus the number of the page after it.
#[derive(Debug)]
pub(crate) struct NotesPage {
    pub(crate) notes: Vec<Note>,
    pub(crate) next_page: Option<u32>,
}

impl GitLabClient {
    /// Get one page of notes on a merge request, oldest first.
    pub(crate) fn fetch_notes_page(
        &self,
        project_id: u64,
        mr_iid: u64,
        page: u32,
    ) -> Result<NotesPage, GitLabError> {
        let url = format!(
            "{}{}?sort=asc&order_by=created_at&per_page={}&page={}",
            self.api_url(),
            notes_path(project_id, mr_iid),
            self.per_page,
            page
        );

        info!(
            "Getting notes page {} for merge request !{} in project {}",
            page, mr_iid, project_id
        );

        let response = self.get(&url)?;
        let next_header = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let notes: Vec<Note> = read_json(response)?;
        let next_page = next_page(next_header.as_deref(), page, notes.len(), self.per_page);
        debug!(
            "Page {} returned {} notes, next page {:?}",
            page,
            notes.len(),
            next_page
        );
        Ok(NotesPage { notes, next_page })
    }

    /// Create a note on a merge request.
    pub(crate) fn post_note(
        &self,
        project_id: u64,
        mr_iid: u64,
        body: &str,
    ) -> Result<Note, GitLabError> {
        let url = format!("{}{}", self.api_url(), notes_path(project_id, mr_iid));

        info!(
            "Creating note on merge request !{} in project {}",
            mr_iid, project_id
        );

        let note: Note = read_json(self.write_json(
            WriteMethod::Post,
            &url,
            &json!({ "body": body }),
        )?)?;
        info!("Created note {}", note.id);
        Ok(note)
    }

    /// Replace the body of a note on a merge request.
    pub(crate) fn put_note(
        &self,
        project_id: u64,
        mr_iid: u64,
        note_id: u64,
        body: &str,
    ) -> Result<Note, GitLabError> {
        let url = format!(
            "{}{}/{}",
            self.api_url(),
            notes_path(project_id, mr_iid),
            note_id
        );

        info!(
            "Updating note {} on merge request !{} in project {}",
            note_id, mr_iid, project_id
        );

        read_json(self.write_json(WriteMethod::Put, &url, &json!({ "body": body }))?)
    }
}

/// Work out the page after `current`.
///
/// Prefers the `x-next-page` header; an empty header marks the last page. When
/// the header is absent, a full page is taken to mean more may follow. A next
/// page that does not advance ends pagination.
fn next_page(header: Option<&str>, current: u32, received: usize, per_page: u32) -> Option<u32> {
    let next = match header {
        Some(value) => value.trim().parse::<u32>().ok()?,
        None if u32::try_from(received).is_ok_and(|n| n >= per_page) => current.checked_add(1)?,
        None => return None,
    };
    (next > current).then_some(next)
}

/// Lazy iterator over the notes of a merge request.
///
/// Requests the next page only after every note of the current page has been
/// consumed, so a scan that stops early never fetches later pages. After a
/// failed request the error is yielded once and the iterator ends.
pub struct NotesPager<'a> {
    client: &'a GitLabClient,
    project_id: u64,
    mr_iid: u64,
    next_page: Option<u32>,
    buffer: VecDeque<Note>,
}

impl<'a> NotesPager<'a> {
    pub(crate) fn new(client: &'a GitLabClient, project_id: u64, mr_iid: u64) -> Self {
        Self {
            client,
            project_id,
            mr_iid,
            next_page: Some(1),
            buffer: VecDeque::new(),
        }
    }
}

impl Iterator for NotesPager<'_> {
    type Item = Result<Note, RemoteError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(note) = self.buffer.pop_front() {
                return Some(Ok(note));
            }
            let page = self.next_page.take()?;
            match self
                .client
                .fetch_notes_page(self.project_id, self.mr_iid, page)
            {
                Ok(fetched) => {
                    self.buffer.extend(fetched.notes);
                    self.next_page = fetched.next_page;
                }
                Err(err) => {
                    return Some(Err(err.into_remote(format!(
                        "notes of project {} !{} (page {page})",
                        self.project_id, self.mr_iid
                    ))));
                }
            }
        }
    }
}
