//! Comment upsert engine.
//!
//! Finds the comment that already carries a slot's marker and overwrites it,
//! or creates one when none exists. Concurrent runs for the same slot are not
//! coordinated and may produce a duplicate.

use std::io::{self, Write};

use tracing::{debug, info};

use mrc_config::{Connection, ConnectionSettings, EnvSnapshot, Target, TargetSettings};
use mrc_gitlab::GitLabClient;
use mrc_notes::{MergeRequest, MergeRequestApi, RemoteError};

use crate::error::CommentError;
use crate::marker::{CommentSlot, Marker, render_body};

/// Header written once before local output.
pub const LOCAL_HEADER: &str = "== Merge request output: ==";

/// Prefix of each content line in local output.
const LOCAL_LINE_PREFIX: &str = "## ";

/// What [`Commenter::post`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// A new note was created.
    Created {
        /// ID of the new note.
        note_id: u64,
    },
    /// An existing note carrying the slot's marker was overwritten.
    Updated {
        /// ID of the updated note.
        note_id: u64,
    },
    /// Local mode: the content was written to the output sink.
    Printed,
}

enum Backend<A, W> {
    Remote(A),
    Local(W),
}

/// Posts slot-identified comments on merge requests.
///
/// In remote mode it talks to a [`MergeRequestApi`]; in local mode it writes
/// the content to `W` and never makes a remote call.
pub struct Commenter<A, W> {
    backend: Backend<A, W>,
    env: EnvSnapshot,
}

impl<A: MergeRequestApi, W: Write> Commenter<A, W> {
    /// Remote commenter. Merge request IDs not passed to [`post`](Self::post)
    /// are looked up in `env`.
    pub fn remote(api: A, env: EnvSnapshot) -> Self {
        Self {
            backend: Backend::Remote(api),
            env,
        }
    }

    /// Local commenter writing to `out`.
    pub fn local(out: W) -> Self {
        Self {
            backend: Backend::Local(out),
            env: EnvSnapshot::default(),
        }
    }

    /// Whether this commenter only writes locally.
    pub fn is_local(&self) -> bool {
        matches!(self.backend, Backend::Local(_))
    }

    /// Create or update the comment owned by `slot`.
    ///
    /// # Errors
    ///
    /// - [`CommentError::Config`] if the target cannot be resolved (no remote call is made)
    /// - [`CommentError::Remote`] if any remote call fails; the error is not retried
    /// - [`CommentError::Output`] if local output cannot be written
    pub fn post(
        &mut self,
        content: &str,
        target: &TargetSettings,
        slot: &CommentSlot,
    ) -> Result<PostOutcome, CommentError> {
        let api = match &mut self.backend {
            Backend::Local(out) => {
                write_local(out, content)?;
                return Ok(PostOutcome::Printed);
            }
            Backend::Remote(api) => api,
        };

        let target = target.resolve(&self.env)?;
        upsert(api, target, content, slot)
    }
}

impl<W: Write> Commenter<GitLabClient, W> {
    /// Commenter for the resolved connection: a [`GitLabClient`] in remote
    /// mode, or local output to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError::Config`] if the connection cannot be resolved.
    pub fn connect(
        settings: &ConnectionSettings,
        env: EnvSnapshot,
        out: W,
    ) -> Result<Self, CommentError> {
        let connection = settings.resolve(&env)?;
        Ok(Self::from_connection(&connection, env, out))
    }

    /// Commenter for an already resolved connection.
    pub fn from_connection(connection: &Connection, env: EnvSnapshot, out: W) -> Self {
        match connection {
            Connection::Remote(config) => Self::remote(GitLabClient::from_config(config), env),
            Connection::Local => Self::local(out),
        }
    }
}

/// Resolve the connection and post one comment, writing local output to stdout.
///
/// # Errors
///
/// See [`Commenter::connect`] and [`Commenter::post`].
pub fn post_comment(
    settings: &ConnectionSettings,
    env: EnvSnapshot,
    content: &str,
    target: &TargetSettings,
    slot: &CommentSlot,
) -> Result<PostOutcome, CommentError> {
    Commenter::connect(settings, env, io::stdout())?.post(content, target, slot)
}

/// Write the header and each content line. Content without lines writes nothing.
fn write_local(out: &mut impl Write, content: &str) -> io::Result<()> {
    let mut lines = content.lines().peekable();
    if lines.peek().is_none() {
        return Ok(());
    }
    writeln!(out, "{LOCAL_HEADER}")?;
    for line in lines {
        writeln!(out, "{LOCAL_LINE_PREFIX}{line}")?;
    }
    out.flush()
}

fn upsert<A: MergeRequestApi>(
    api: &A,
    target: Target,
    content: &str,
    slot: &CommentSlot,
) -> Result<PostOutcome, CommentError> {
    let marker = Marker::for_slot(slot);
    let body = render_body(content, &marker);

    let project = api.get_project(target.project_id)?;
    let mr = api.get_merge_request(&project, target.mr_iid)?;

    if let Some(note_id) = find_note(api, &mr, &marker)? {
        api.update_note(&mr, note_id, &body)?;
        info!("Updated note {} for slot {:?} on {}", note_id, slot.as_str(), target);
        return Ok(PostOutcome::Updated { note_id });
    }

    let note = api.create_note(&mr, &body)?;
    info!("Created note {} for slot {:?} on {}", note.id, slot.as_str(), target);
    Ok(PostOutcome::Created { note_id: note.id })
}

/// ID of the first note carrying `marker`. Stops reading at the first match.
fn find_note<A: MergeRequestApi>(
    api: &A,
    mr: &MergeRequest,
    marker: &Marker,
) -> Result<Option<u64>, RemoteError> {
    let mut scanned = 0usize;
    for note in api.list_notes(mr) {
        let note = note?;
        scanned += 1;
        if marker.is_in(&note.body) {
            debug!("Found marker in note {} after {} notes", note.id, scanned);
            return Ok(Some(note.id));
        }
    }
    debug!("No note carries the marker ({} scanned)", scanned);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use mrc_config::ConfigError;
    use mrc_notes::{MockGitLab, Operation, RemoteErrorKind};

    use super::*;
    use crate::marker::encode;

    const PROJECT: u64 = 123;
    const MR: u64 = 45;

    fn remote(mock: &MockGitLab) -> Commenter<&MockGitLab, io::Sink> {
        Commenter::remote(mock, EnvSnapshot::default())
    }

    fn target() -> TargetSettings {
        TargetSettings::explicit(PROJECT, MR)
    }

    fn bodies(mock: &MockGitLab) -> Vec<String> {
        mock.notes(PROJECT, MR).into_iter().map(|n| n.body).collect()
    }

    #[test]
    fn test_create_when_no_prior_comment() {
        let mock = MockGitLab::new().with_merge_request(PROJECT, MR);
        let slot = CommentSlot::new("release-notes");

        let outcome = remote(&mock)
            .post("## Changes\n- fixed bug", &target(), &slot)
            .unwrap();

        let notes = mock.notes(PROJECT, MR);
        assert_eq!(notes.len(), 1);
        assert_eq!(outcome, PostOutcome::Created { note_id: notes[0].id });
        assert_eq!(
            notes[0].body,
            "## Changes\n- fixed bug\n\n<!-- gitlab-mr-commenter id=\"release-notes\" -->"
        );
    }

    #[test]
    fn test_update_matching_comment() {
        let existing = render_body(
            "## Changes\n- fixed bug",
            &Marker::for_slot(&CommentSlot::new("release-notes")),
        );
        let mock = MockGitLab::new()
            .with_note(PROJECT, MR, "unrelated review comment")
            .with_note(PROJECT, MR, existing);
        let matching_id = mock.notes(PROJECT, MR)[1].id;
        let slot = CommentSlot::new("release-notes");

        let outcome = remote(&mock)
            .post("## Changes\n- fixed another bug", &target(), &slot)
            .unwrap();

        assert_eq!(outcome, PostOutcome::Updated { note_id: matching_id });
        assert_eq!(mock.calls().create_note, 0);
        assert_eq!(mock.calls().update_note, 1);
        assert_eq!(
            bodies(&mock),
            vec![
                "unrelated review comment".to_owned(),
                "## Changes\n- fixed another bug\n\n<!-- gitlab-mr-commenter id=\"release-notes\" -->"
                    .to_owned(),
            ]
        );
    }

    #[test]
    fn test_repeated_posts_converge_on_one_comment() {
        let mock = MockGitLab::new().with_merge_request(PROJECT, MR);
        let slot = CommentSlot::default();
        let mut commenter = remote(&mock);

        let first = commenter.post("first run", &target(), &slot).unwrap();
        let second = commenter.post("second run", &target(), &slot).unwrap();

        let PostOutcome::Created { note_id } = first else {
            panic!("expected create, got {first:?}");
        };
        assert_eq!(second, PostOutcome::Updated { note_id });
        assert_eq!(
            bodies(&mock),
            vec![format!("second run\n\n{}", encode("gitlab-mr-commenter"))]
        );
    }

    #[test]
    fn test_slots_are_isolated() {
        let mock = MockGitLab::new().with_merge_request(PROJECT, MR);
        let mut commenter = remote(&mock);
        let plan = CommentSlot::new("plan");
        let notes = CommentSlot::new("notes");

        commenter.post("plan v1", &target(), &plan).unwrap();
        commenter.post("notes v1", &target(), &notes).unwrap();
        commenter.post("plan v2", &target(), &plan).unwrap();

        let all = bodies(&mock);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], format!("plan v2\n\n{}", encode("plan")));
        assert_eq!(all[1], format!("notes v1\n\n{}", encode("notes")));
        assert!(!all[0].contains(&encode("notes")));
        assert!(!all[1].contains(&encode("plan")));
    }

    #[test]
    fn test_prefix_slot_does_not_match() {
        let mock = MockGitLab::new().with_note(
            PROJECT,
            MR,
            render_body("old", &Marker::for_slot(&CommentSlot::new("plan-extra"))),
        );

        let outcome = remote(&mock)
            .post("new", &target(), &CommentSlot::new("plan"))
            .unwrap();

        assert!(matches!(outcome, PostOutcome::Created { .. }));
        assert_eq!(mock.notes(PROJECT, MR).len(), 2);
    }

    #[test]
    fn test_first_match_wins() {
        let body = render_body("dup", &Marker::for_slot(&CommentSlot::default()));
        let mock = MockGitLab::new()
            .with_note(PROJECT, MR, body.clone())
            .with_note(PROJECT, MR, body);
        let first_id = mock.notes(PROJECT, MR)[0].id;

        let outcome = remote(&mock)
            .post("fresh", &target(), &CommentSlot::default())
            .unwrap();

        assert_eq!(outcome, PostOutcome::Updated { note_id: first_id });
        assert!(bodies(&mock)[1].starts_with("dup"));
    }

    #[test]
    fn test_scan_stops_at_first_match() {
        let slot = CommentSlot::new("plan");
        let mut mock = MockGitLab::new()
            .with_page_size(2)
            .with_note(PROJECT, MR, render_body("old", &Marker::for_slot(&slot)));
        for i in 0..9 {
            mock = mock.with_note(PROJECT, MR, format!("chatter {i}"));
        }

        remote(&mock).post("new", &target(), &slot).unwrap();

        assert_eq!(mock.calls().pages_fetched, 1);
    }

    #[test]
    fn test_scan_reads_every_page_without_match() {
        let mut mock = MockGitLab::new().with_page_size(2);
        for i in 0..5 {
            mock = mock.with_note(PROJECT, MR, format!("chatter {i}"));
        }

        remote(&mock)
            .post("new", &target(), &CommentSlot::new("plan"))
            .unwrap();

        assert_eq!(mock.calls().pages_fetched, 3);
        assert_eq!(mock.calls().create_note, 1);
    }

    #[test]
    fn test_match_on_later_page() {
        let slot = CommentSlot::new("plan");
        let mut mock = MockGitLab::new().with_page_size(2);
        for i in 0..3 {
            mock = mock.with_note(PROJECT, MR, format!("chatter {i}"));
        }
        mock = mock.with_note(PROJECT, MR, render_body("old", &Marker::for_slot(&slot)));
        let matching_id = mock.notes(PROJECT, MR)[3].id;

        let outcome = remote(&mock).post("new", &target(), &slot).unwrap();

        assert_eq!(outcome, PostOutcome::Updated { note_id: matching_id });
        assert_eq!(mock.calls().pages_fetched, 2);
    }

    #[test]
    fn test_local_mode_prints_every_line() {
        let mock = MockGitLab::new();
        let mut commenter: Commenter<&MockGitLab, Vec<u8>> = Commenter::local(Vec::new());
        assert!(commenter.is_local());

        let outcome = commenter
            .post(
                "## Changes\n- fixed bug\n",
                &TargetSettings::default(),
                &CommentSlot::default(),
            )
            .unwrap();

        assert_eq!(outcome, PostOutcome::Printed);
        let Backend::Local(out) = commenter.backend else {
            panic!("expected local backend");
        };
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "== Merge request output: ==\n## ## Changes\n## - fixed bug\n"
        );
        assert_eq!(mock.calls().requests(), 0);
    }

    #[test]
    fn test_local_mode_empty_content_writes_nothing() {
        let mut commenter: Commenter<&MockGitLab, Vec<u8>> = Commenter::local(Vec::new());

        let outcome = commenter
            .post("", &TargetSettings::default(), &CommentSlot::default())
            .unwrap();

        assert_eq!(outcome, PostOutcome::Printed);
        let Backend::Local(out) = commenter.backend else {
            panic!("expected local backend");
        };
        assert!(out.is_empty());
    }

    #[test]
    fn test_local_mode_ignores_missing_target() {
        let mut commenter: Commenter<&MockGitLab, Vec<u8>> = Commenter::local(Vec::new());
        let outcome = commenter
            .post("hi", &TargetSettings::default(), &CommentSlot::default())
            .unwrap();
        assert_eq!(outcome, PostOutcome::Printed);
    }

    #[test]
    fn test_missing_target_makes_no_remote_calls() {
        let mock = MockGitLab::new().with_merge_request(PROJECT, MR);
        let settings = TargetSettings {
            project_id: Some(PROJECT),
            mr_iid: None,
        };

        let err = remote(&mock)
            .post("content", &settings, &CommentSlot::default())
            .unwrap_err();

        assert!(matches!(
            err,
            CommentError::Config(ConfigError::MissingTarget { field: "mr_iid", .. })
        ));
        assert_eq!(mock.calls().requests(), 0);
    }

    #[test]
    fn test_invalid_env_target_makes_no_remote_calls() {
        let mock = MockGitLab::new().with_merge_request(PROJECT, MR);
        let env = EnvSnapshot::from_pairs([("CI_PROJECT_ID", "abc"), ("CI_MERGE_REQUEST_IID", "45")]);
        let mut commenter: Commenter<&MockGitLab, io::Sink> = Commenter::remote(&mock, env);

        let err = commenter
            .post("content", &TargetSettings::default(), &CommentSlot::default())
            .unwrap_err();

        assert!(matches!(err, CommentError::Config(ConfigError::InvalidId { .. })));
        assert_eq!(mock.calls().requests(), 0);
    }

    #[test]
    fn test_target_from_environment() {
        let mock = MockGitLab::new().with_merge_request(PROJECT, MR);
        let env = EnvSnapshot::from_pairs([("CI_PROJECT_ID", "123"), ("CI_MERGE_REQUEST_IID", "45")]);
        let mut commenter: Commenter<&MockGitLab, io::Sink> = Commenter::remote(&mock, env);

        commenter
            .post("content", &TargetSettings::default(), &CommentSlot::default())
            .unwrap();

        assert_eq!(mock.notes(PROJECT, MR).len(), 1);
    }

    #[test]
    fn test_missing_merge_request_propagates() {
        let mock = MockGitLab::new().with_merge_request(PROJECT, MR);

        let err = remote(&mock)
            .post("content", &TargetSettings::explicit(PROJECT, 99), &CommentSlot::default())
            .unwrap_err();

        let CommentError::Remote(remote_err) = err else {
            panic!("expected remote error");
        };
        assert_eq!(remote_err.kind, RemoteErrorKind::NotFound);
        assert_eq!(mock.calls().list_notes, 0);
        assert_eq!(mock.calls().create_note, 0);
    }

    #[test]
    fn test_list_failure_propagates_without_write() {
        let mock = MockGitLab::new()
            .with_merge_request(PROJECT, MR)
            .failing(Operation::ListNotes, RemoteErrorKind::Unavailable);

        let err = remote(&mock)
            .post("content", &target(), &CommentSlot::default())
            .unwrap_err();

        assert!(matches!(
            err,
            CommentError::Remote(ref e) if e.kind == RemoteErrorKind::Unavailable
        ));
        assert_eq!(mock.calls().pages_fetched, 1);
        assert_eq!(mock.calls().create_note, 0);
        assert_eq!(mock.calls().update_note, 0);
    }

    #[test]
    fn test_write_failure_is_not_retried() {
        let mock = MockGitLab::new()
            .with_merge_request(PROJECT, MR)
            .failing(Operation::CreateNote, RemoteErrorKind::PermissionDenied);

        let err = remote(&mock)
            .post("content", &target(), &CommentSlot::default())
            .unwrap_err();

        assert!(matches!(
            err,
            CommentError::Remote(ref e) if e.kind == RemoteErrorKind::PermissionDenied
        ));
        assert_eq!(mock.calls().create_note, 1);
    }

    #[test]
    fn test_update_failure_does_not_fall_back_to_create() {
        let slot = CommentSlot::new("plan");
        let existing = render_body("old plan", &Marker::for_slot(&slot));
        let mock = MockGitLab::new()
            .with_note(PROJECT, MR, existing.clone())
            .failing(Operation::UpdateNote, RemoteErrorKind::Unavailable);

        let err = remote(&mock)
            .post("new plan", &target(), &slot)
            .unwrap_err();

        assert!(matches!(
            err,
            CommentError::Remote(ref e) if e.kind == RemoteErrorKind::Unavailable
        ));
        assert_eq!(mock.calls().update_note, 1);
        assert_eq!(mock.calls().create_note, 0);
        assert_eq!(bodies(&mock), vec![existing]);
    }

    #[test]
    fn test_post_comment_local_fallback() {
        let settings = ConnectionSettings {
            local_fallback: true,
            ..ConnectionSettings::default()
        };

        let outcome = post_comment(
            &settings,
            EnvSnapshot::default(),
            "local only",
            &TargetSettings::default(),
            &CommentSlot::default(),
        )
        .unwrap();

        assert_eq!(outcome, PostOutcome::Printed);
    }

    #[test]
    fn test_post_comment_without_url_fails() {
        let err = post_comment(
            &ConnectionSettings::default(),
            EnvSnapshot::default(),
            "content",
            &TargetSettings::explicit(PROJECT, MR),
            &CommentSlot::default(),
        )
        .unwrap_err();

        assert!(matches!(err, CommentError::Config(ConfigError::MissingApiUrl)));
    }

    #[test]
    fn test_post_comment_missing_token_fails() {
        let env = EnvSnapshot::from_pairs([("CI_API_V4_URL", "https://gitlab.example.com/api/v4")]);

        let err = post_comment(
            &ConnectionSettings::default(),
            env,
            "content",
            &TargetSettings::explicit(PROJECT, MR),
            &CommentSlot::default(),
        )
        .unwrap_err();

        assert!(matches!(err, CommentError::Config(ConfigError::MissingToken)));
    }

    #[test]
    fn test_connect_without_url_or_fallback_fails() {
        let result = Commenter::connect(
            &ConnectionSettings::default(),
            EnvSnapshot::default(),
            io::sink(),
        );
        assert!(matches!(
            result,
            Err(CommentError::Config(ConfigError::MissingApiUrl))
        ));
    }

    #[test]
    fn test_connect_local_fallback() {
        let settings = ConnectionSettings {
            local_fallback: true,
            ..ConnectionSettings::default()
        };
        let commenter = Commenter::connect(&settings, EnvSnapshot::default(), io::sink()).unwrap();
        assert!(commenter.is_local());
    }

    #[test]
    fn test_connect_remote() {
        let env = EnvSnapshot::from_pairs([
            ("CI_API_V4_URL", "https://gitlab.example.com/api/v4"),
            ("GITLAB_MR_PLAN_TOKEN", "glpat-secret"),
        ]);
        let commenter = Commenter::connect(&ConnectionSettings::default(), env, io::sink()).unwrap();
        assert!(!commenter.is_local());
        let Backend::Remote(client) = &commenter.backend else {
            panic!("expected remote backend");
        };
        assert_eq!(client.base_url(), "https://gitlab.example.com");
    }
}
