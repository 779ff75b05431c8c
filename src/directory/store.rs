use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::{MAX_BIO_LEN, MAX_HANDLE_LEN, clean_handle, is_valid_handle};

use super::records::{
    AttemptSummary, ChangeEvent, Member, MemberEntry, NewMember, NewQuizAttempt, QuizAttempt,
    QuizQuestion, Table,
};
use super::seed::default_questions;

const GOLDEN_ANGLE_DEGREES: f32 = 137.507_76;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid directory file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("@{0} has already joined the circle")]
    DuplicateHandle(String),

    #[error("unknown member id {0}")]
    UnknownMember(String),

    #[error("directory store lock poisoned")]
    Poisoned,
}

/// Persistence and change notification for members and quiz data.
pub trait DirectoryStore: Send + Sync {
    /// Members ordered oldest first.
    fn list_members(&self) -> StoreResult<Vec<Member>>;

    fn insert_member(&self, fields: NewMember) -> StoreResult<Member>;

    fn subscribe_to_changes(&self, table: Table) -> Receiver<ChangeEvent>;

    fn list_quiz_questions(&self) -> StoreResult<Vec<QuizQuestion>>;

    fn record_quiz_attempt(&self, attempt: NewQuizAttempt) -> StoreResult<QuizAttempt>;

    fn latest_quiz_attempt(&self, member_id: &str) -> StoreResult<Option<AttemptSummary>>;

    fn directory_snapshot(&self) -> StoreResult<Vec<MemberEntry>> {
        self.list_members()?
            .into_iter()
            .map(|member| {
                let latest_attempt = self.latest_quiz_attempt(&member.id)?;
                Ok(MemberEntry {
                    member,
                    latest_attempt,
                })
            })
            .collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    quiz_questions: Vec<QuizQuestion>,
    #[serde(default)]
    quiz_attempts: Vec<QuizAttempt>,
}

/// Keeps the whole directory in one JSON document. Every call re-reads the
/// file so edits from another running instance are picked up on refresh.
pub struct FileStore {
    path: PathBuf,
    io_lock: Mutex<()>,
    subscribers: Mutex<Vec<(Table, Sender<ChangeEvent>)>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let store = Self {
            path,
            io_lock: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        };

        if !store.path.exists() {
            let parent = store
                .path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty());
            if let Some(parent) = parent {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }

            let seeded = DirectoryFile {
                quiz_questions: default_questions(),
                ..DirectoryFile::default()
            };
            store.write_file(&seeded)?;
            info!(path = %store.path.display(), "created directory file with default quiz");
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.io_lock.lock().map_err(|_| StoreError::Poisoned)
    }

    fn read_file(&self) -> StoreResult<DirectoryFile> {
        let raw = fs::read(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn write_file(&self, data: &DirectoryFile) -> StoreResult<()> {
        let encoded = serde_json::to_vec_pretty(data).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(|source| StoreError::Io {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn notify(&self, table: Table) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            warn!(?table, "change subscribers lock poisoned; dropping notification");
            return;
        };

        subscribers
            .retain(|(watched, tx)| *watched != table || tx.send(ChangeEvent { table }).is_ok());
        debug!(?table, subscribers = subscribers.len(), "notified directory change");
    }
}

/// Cleans the handle and bio and checks them against the join rules.
pub fn validate_new_member(fields: NewMember) -> StoreResult<NewMember> {
    let handle = clean_handle(&fields.handle);
    if handle.is_empty() {
        return Err(StoreError::Invalid("Please enter your X handle".to_owned()));
    }
    if !is_valid_handle(&handle) {
        return Err(StoreError::Invalid(format!(
            "Handles use up to {MAX_HANDLE_LEN} letters, digits or underscores"
        )));
    }

    let bio_text = fields.bio_text.trim().to_owned();
    if bio_text.is_empty() {
        return Err(StoreError::Invalid(
            "Tell the circle why privacy matters to you".to_owned(),
        ));
    }
    if bio_text.chars().count() > MAX_BIO_LEN {
        return Err(StoreError::Invalid(format!(
            "Keep your answer under {MAX_BIO_LEN} characters"
        )));
    }

    Ok(NewMember {
        handle,
        photo_url: fields.photo_url.filter(|url| !url.trim().is_empty()),
        bio_text,
    })
}

impl DirectoryStore for FileStore {
    fn list_members(&self) -> StoreResult<Vec<Member>> {
        let _guard = self.lock()?;
        let mut members = self.read_file()?.members;
        members.sort_by_key(|member| member.joined_at);
        Ok(members)
    }

    fn insert_member(&self, fields: NewMember) -> StoreResult<Member> {
        let fields = validate_new_member(fields)?;

        let member = {
            let _guard = self.lock()?;
            let mut data = self.read_file()?;

            if data
                .members
                .iter()
                .any(|member| member.handle.eq_ignore_ascii_case(&fields.handle))
            {
                return Err(StoreError::DuplicateHandle(fields.handle));
            }

            let member = Member {
                id: Uuid::new_v4().to_string(),
                handle: fields.handle,
                photo_url: fields.photo_url,
                bio_text: fields.bio_text,
                joined_at: Utc::now(),
                layout_seed_angle: (data.members.len() as f32 * GOLDEN_ANGLE_DEGREES)
                    .rem_euclid(360.0),
            };
            data.members.push(member.clone());
            self.write_file(&data)?;
            member
        };

        info!(member_id = %member.id, handle = %member.handle, "member joined");
        self.notify(Table::Members);
        Ok(member)
    }

    fn subscribe_to_changes(&self, table: Table) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push((table, tx)),
            Err(_) => warn!(?table, "change subscribers lock poisoned; subscription is inert"),
        }
        rx
    }

    fn list_quiz_questions(&self) -> StoreResult<Vec<QuizQuestion>> {
        let _guard = self.lock()?;
        let mut questions = self.read_file()?.quiz_questions;
        questions.sort_by_key(|question| question.order);
        Ok(questions)
    }

    fn record_quiz_attempt(&self, attempt: NewQuizAttempt) -> StoreResult<QuizAttempt> {
        let recorded = {
            let _guard = self.lock()?;
            let mut data = self.read_file()?;

            if !data
                .members
                .iter()
                .any(|member| member.id == attempt.member_id)
            {
                return Err(StoreError::UnknownMember(attempt.member_id));
            }

            let recorded = QuizAttempt {
                id: Uuid::new_v4().to_string(),
                member_id: attempt.member_id,
                score: attempt.score,
                total_questions: attempt.total_questions,
                answers: attempt.answers,
                created_at: Utc::now(),
            };
            data.quiz_attempts.push(recorded.clone());
            self.write_file(&data)?;
            recorded
        };

        info!(
            member_id = %recorded.member_id,
            score = recorded.score,
            total = recorded.total_questions,
            "recorded quiz attempt"
        );
        self.notify(Table::QuizAttempts);
        Ok(recorded)
    }

    /// One read of the file, so members and attempts always come from the
    /// same version of it.
    fn directory_snapshot(&self) -> StoreResult<Vec<MemberEntry>> {
        let DirectoryFile {
            mut members,
            quiz_attempts,
            ..
        } = {
            let _guard = self.lock()?;
            self.read_file()?
        };

        // Later entries win timestamp ties, matching latest_quiz_attempt.
        let mut latest = HashMap::<&str, &QuizAttempt>::new();
        for attempt in &quiz_attempts {
            match latest.entry(attempt.member_id.as_str()) {
                Entry::Occupied(mut slot) => {
                    if attempt.created_at >= slot.get().created_at {
                        slot.insert(attempt);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(attempt);
                }
            }
        }

        members.sort_by_key(|member| member.joined_at);
        Ok(members
            .into_iter()
            .map(|member| {
                let latest_attempt = latest
                    .get(member.id.as_str())
                    .map(|attempt| AttemptSummary::from(*attempt));
                MemberEntry {
                    member,
                    latest_attempt,
                }
            })
            .collect())
    }

    fn latest_quiz_attempt(&self, member_id: &str) -> StoreResult<Option<AttemptSummary>> {
        let _guard = self.lock()?;
        let data = self.read_file()?;
        Ok(data
            .quiz_attempts
            .iter()
            .enumerate()
            .filter(|(_, attempt)| attempt.member_id == member_id)
            .max_by(|(ia, a), (ib, b)| a.created_at.cmp(&b.created_at).then(ia.cmp(ib)))
            .map(|(_, attempt)| AttemptSummary::from(attempt)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::TryRecvError;

    use tempfile::TempDir;

    use super::*;

    fn open_store() -> (TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data").join("directory.json")).unwrap();
        (dir, store)
    }

    fn join(store: &FileStore, handle: &str) -> Member {
        store
            .insert_member(NewMember {
                handle: handle.to_owned(),
                photo_url: None,
                bio_text: "Because metadata tells everything.".to_owned(),
            })
            .unwrap()
    }

    #[test]
    fn new_file_is_seeded_with_ordered_questions() {
        let (_dir, store) = open_store();
        let questions = store.list_quiz_questions().unwrap();
        assert!(!questions.is_empty());
        assert!(questions.windows(2).all(|pair| pair[0].order <= pair[1].order));
        assert!(store.list_members().unwrap().is_empty());
    }

    #[test]
    fn members_come_back_oldest_first() {
        let (_dir, store) = open_store();
        let first = join(&store, "@first");
        let second = join(&store, "second");

        let members = store.list_members().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, first.id);
        assert_eq!(members[1].id, second.id);
        assert_eq!(members[0].handle, "first");
    }

    #[test]
    fn angles_follow_the_golden_sequence() {
        let (_dir, store) = open_store();
        let first = join(&store, "one");
        let second = join(&store, "two");

        assert_eq!(first.layout_seed_angle, 0.0);
        assert!((second.layout_seed_angle - GOLDEN_ANGLE_DEGREES).abs() < 1e-3);
    }

    #[test]
    fn insert_rejects_missing_fields_and_duplicates() {
        let (_dir, store) = open_store();
        let blank_handle = store.insert_member(NewMember {
            handle: "@".to_owned(),
            photo_url: None,
            bio_text: "x".to_owned(),
        });
        assert!(matches!(blank_handle, Err(StoreError::Invalid(_))));

        let blank_bio = store.insert_member(NewMember {
            handle: "dana".to_owned(),
            photo_url: None,
            bio_text: "   ".to_owned(),
        });
        assert!(matches!(blank_bio, Err(StoreError::Invalid(_))));

        join(&store, "dana");
        let duplicate = store.insert_member(NewMember {
            handle: "@Dana".to_owned(),
            photo_url: None,
            bio_text: "again".to_owned(),
        });
        assert!(matches!(duplicate, Err(StoreError::DuplicateHandle(_))));
    }

    #[test]
    fn subscribers_hear_only_their_table() {
        let (_dir, store) = open_store();
        let members_rx = store.subscribe_to_changes(Table::Members);
        let attempts_rx = store.subscribe_to_changes(Table::QuizAttempts);

        let member = join(&store, "eve");
        assert_eq!(
            members_rx.try_recv(),
            Ok(ChangeEvent {
                table: Table::Members
            })
        );
        assert_eq!(attempts_rx.try_recv(), Err(TryRecvError::Empty));

        store
            .record_quiz_attempt(NewQuizAttempt {
                member_id: member.id,
                score: 1,
                total_questions: 4,
                answers: vec![0, 0, 0, 0],
            })
            .unwrap();
        assert!(attempts_rx.try_recv().is_ok());
        assert_eq!(members_rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let (_dir, store) = open_store();
        drop(store.subscribe_to_changes(Table::Members));
        join(&store, "frank");
        assert!(store.subscribers.lock().unwrap().is_empty());
    }

    #[test]
    fn latest_attempt_wins_in_snapshot() {
        let (_dir, store) = open_store();
        let member = join(&store, "grace");
        let other = join(&store, "heidi");

        for score in [1, 3] {
            store
                .record_quiz_attempt(NewQuizAttempt {
                    member_id: member.id.clone(),
                    score,
                    total_questions: 4,
                    answers: vec![1, 0, 2, 1],
                })
                .unwrap();
        }

        assert_eq!(
            store.latest_quiz_attempt(&member.id).unwrap(),
            Some(AttemptSummary { score: 3, total: 4 })
        );

        let snapshot = store.directory_snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        for entry in &snapshot {
            assert_eq!(
                entry.latest_attempt,
                store.latest_quiz_attempt(&entry.member.id).unwrap()
            );
        }
        assert_eq!(
            snapshot[0].latest_attempt,
            Some(AttemptSummary { score: 3, total: 4 })
        );
        assert_eq!(snapshot[1].member.id, other.id);
        assert_eq!(snapshot[1].latest_attempt, None);
    }

    #[test]
    fn snapshot_breaks_timestamp_ties_by_file_order() {
        let (_dir, store) = open_store();
        let member = join(&store, "judy");
        let stamp = Utc::now();

        let mut data = store.read_file().unwrap();
        for (index, score) in [2, 4, 1].into_iter().enumerate() {
            data.quiz_attempts.push(QuizAttempt {
                id: format!("attempt-{index}"),
                member_id: member.id.clone(),
                score,
                total_questions: 4,
                answers: vec![0; 4],
                created_at: if index == 2 {
                    stamp - chrono::TimeDelta::seconds(5)
                } else {
                    stamp
                },
            });
        }
        store.write_file(&data).unwrap();

        let expected = Some(AttemptSummary { score: 4, total: 4 });
        assert_eq!(store.latest_quiz_attempt(&member.id).unwrap(), expected);
        let snapshot = store.directory_snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].latest_attempt, expected);
    }

    #[test]
    fn attempts_for_unknown_members_are_rejected() {
        let (_dir, store) = open_store();
        let result = store.record_quiz_attempt(NewQuizAttempt {
            member_id: "nobody".to_owned(),
            score: 0,
            total_questions: 0,
            answers: Vec::new(),
        });
        assert!(matches!(result, Err(StoreError::UnknownMember(_))));
    }

    #[test]
    fn reopening_keeps_existing_members() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        {
            let store = FileStore::open(&path).unwrap();
            join(&store, "ivan");
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(reopened.list_members().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_file_surfaces_as_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        fs::write(&path, b"{not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(store.list_members(), Err(StoreError::Json { .. })));
    }
}
