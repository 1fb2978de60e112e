//! Session directory layout.
//!
//! A recording database is organized as:
//!
//! ```text
//! <db_dir>/
//!     Sessions/<subject>/
//!         synced/        mother.mp4, baby.mp4, window.mp4, door.mp4
//!         processed/     <camera>_<phase>.mp4
//!         visualize/     mother-baby_<phase>.mp4, session_<phase>.mp4
//!         thumbnail.png
//!     Thumbnails/<subject>.png
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{clip_file_name, Camera, CutVideos, Phase, SubjectId};

/// Errors from inspecting the session database.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Sessions directory not found: {0}")]
    NoSessionsDir(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Paths of one subject's session within the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    db_dir: PathBuf,
    subject: SubjectId,
}

impl SessionLayout {
    pub fn new(db_dir: impl Into<PathBuf>, subject: SubjectId) -> Self {
        Self {
            db_dir: db_dir.into(),
            subject,
        }
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// `<db_dir>/Sessions/<subject>`
    pub fn session_dir(&self) -> PathBuf {
        sessions_dir(&self.db_dir).join(self.subject.as_str())
    }

    /// Directory holding the synced per-camera recordings.
    pub fn synced_dir(&self) -> PathBuf {
        self.session_dir().join("synced")
    }

    /// Directory receiving the per-phase clips.
    pub fn processed_dir(&self) -> PathBuf {
        self.session_dir().join("processed")
    }

    /// Directory receiving stacked composites.
    pub fn visualize_dir(&self) -> PathBuf {
        self.session_dir().join("visualize")
    }

    pub fn thumbnail_path(&self) -> PathBuf {
        self.session_dir().join("thumbnail.png")
    }

    /// Copy of the thumbnail in the database-wide overview folder.
    pub fn overview_thumbnail_path(&self) -> PathBuf {
        thumbnails_dir(&self.db_dir).join(format!("{}.png", self.subject))
    }
}

/// `<db_dir>/Sessions`
pub fn sessions_dir(db_dir: &Path) -> PathBuf {
    db_dir.join("Sessions")
}

/// `<db_dir>/Thumbnails`
pub fn thumbnails_dir(db_dir: &Path) -> PathBuf {
    db_dir.join("Thumbnails")
}

/// List subject IDs under `<db_dir>/Sessions`, sorted.
///
/// Entries that are not directories or not valid subject IDs are ignored.
pub fn list_subjects(db_dir: &Path) -> Result<Vec<SubjectId>, SessionError> {
    let root = sessions_dir(db_dir);
    if !root.is_dir() {
        return Err(SessionError::NoSessionsDir(root));
    }

    let entries = fs::read_dir(&root).map_err(|source| SessionError::Io {
        path: root.clone(),
        source,
    })?;

    let mut subjects = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SessionError::Io {
            path: root.clone(),
            source,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        match SubjectId::new(name) {
            Ok(id) => subjects.push(id),
            Err(e) => tracing::debug!("Ignoring session entry: {}", e),
        }
    }

    subjects.sort();
    Ok(subjects)
}

/// Rebuild the clip map from files already present in `processed_dir`.
pub fn find_cut_videos(processed_dir: &Path) -> CutVideos {
    let mut videos = CutVideos::new();

    for camera in Camera::ALL {
        for phase in Phase::ALL {
            let path = processed_dir.join(clip_file_name(camera, phase));
            if path.is_file() {
                videos.insert(camera, phase, path);
            } else {
                tracing::warn!("Cut video not found: {}", path.display());
            }
        }
    }

    videos
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn subject(id: &str) -> SubjectId {
        SubjectId::new(id).unwrap()
    }

    #[test]
    fn layout_paths() {
        let layout = SessionLayout::new("data/db", subject("686527"));
        assert_eq!(
            layout.synced_dir(),
            PathBuf::from("data/db/Sessions/686527/synced")
        );
        assert_eq!(
            layout.processed_dir(),
            PathBuf::from("data/db/Sessions/686527/processed")
        );
        assert_eq!(
            layout.visualize_dir(),
            PathBuf::from("data/db/Sessions/686527/visualize")
        );
        assert_eq!(
            layout.overview_thumbnail_path(),
            PathBuf::from("data/db/Thumbnails/686527.png")
        );
    }

    #[test]
    fn list_subjects_sorted_dirs_only() {
        let dir = tempdir().unwrap();
        let sessions = dir.path().join("Sessions");
        fs::create_dir_all(sessions.join("300")).unwrap();
        fs::create_dir_all(sessions.join("100")).unwrap();
        fs::write(sessions.join("notes.txt"), "x").unwrap();

        let subjects = list_subjects(dir.path()).unwrap();
        let names: Vec<_> = subjects.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["100", "300"]);
    }

    #[test]
    fn list_subjects_requires_sessions_dir() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            list_subjects(dir.path()),
            Err(SessionError::NoSessionsDir(_))
        ));
    }

    #[test]
    fn find_cut_videos_picks_existing_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("mother_play.mp4"), b"").unwrap();
        fs::write(dir.path().join("baby_play.mp4"), b"").unwrap();
        fs::write(dir.path().join("door_reunion.mp4"), b"").unwrap();
        fs::write(dir.path().join("unrelated.mp4"), b"").unwrap();

        let videos = find_cut_videos(dir.path());
        assert_eq!(videos.len(), 3);
        assert!(videos.get(Camera::Mother, Phase::Play).is_some());
        assert!(videos.get(Camera::Door, Phase::Reunion).is_some());
        assert!(videos.get(Camera::Window, Phase::Play).is_none());
    }
}
