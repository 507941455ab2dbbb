//! Archive service
//!
//! Exports a user's trackers and logs as a deflate-compressed zip archive
//! and imports such archives back as new trackers owned by a user.
//!
//! Export writes loose CSV and metadata files into the user's exports
//! workspace, packages them into `out.zip` and removes them. Import saves
//! the upload into the imports workspace, extracts it, parses every entry
//! and only then writes to the store, inside one transaction.

pub mod format;

use crate::config::{EXPORT_ARCHIVE_NAME, IMPORT_ARCHIVE_NAME, METADATA_ENTRY};
use crate::database::{Repository, User};
use crate::error::{ArchiveError, Result};
use crate::storage::Workspace;
use crate::validation::ensure_zip_filename;
use format::{Metadata, TrackerMetadata};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A packaged export
#[derive(Debug, Clone, Serialize)]
pub struct ExportedArchive {
    pub path: PathBuf,
    /// SHA-256 of the zip file, hex encoded
    pub checksum: String,
    pub trackers: usize,
    pub logs: usize,
}

/// Counts of what an import created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub trackers: usize,
    pub logs: usize,
}

/// Archive import/export service
#[derive(Clone)]
pub struct ArchiveService {
    repo: Repository,
    workspace: Workspace,
}

impl ArchiveService {
    pub fn new(repo: Repository, workspace: Workspace) -> Self {
        Self { repo, workspace }
    }

    /// Export every tracker of a user into `exports/out.zip`
    pub async fn export_data(&self, user: &User) -> Result<ExportedArchive> {
        tracing::info!("Exporting data for user: {}", user.id);

        let exports_dir = self.workspace.prepare_exports(user).await?;

        let trackers = self.repo.list_trackers(user.id).await?;
        let mut metadata = Metadata::new();
        let mut entries = Vec::with_capacity(trackers.len() + 1);
        let mut log_count = 0;

        for tracker in &trackers {
            let logs = self.repo.list_logs(tracker.id).await?;
            log_count += logs.len();

            let entry = format::entry_name(tracker);
            fs::write(exports_dir.join(&entry), format::encode_csv(&logs)).await?;
            tracing::debug!("Wrote {} ({} logs)", entry, logs.len());

            metadata.insert(tracker.id.to_string(), TrackerMetadata::for_tracker(tracker));
            entries.push(entry);
        }

        fs::write(
            exports_dir.join(METADATA_ENTRY),
            format::encode_metadata(&metadata)?,
        )
        .await?;
        entries.push(METADATA_ENTRY.to_string());

        // Package loose files, removing each once it is in the archive
        let zip_path = exports_dir.join(EXPORT_ARCHIVE_NAME);
        let zip_file = std::fs::File::create(&zip_path)?;
        let mut zip = ZipWriter::new(zip_file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &entries {
            let loose_path = exports_dir.join(entry);
            let data = fs::read(&loose_path).await?;

            zip.start_file(entry.as_str(), options)?;
            zip.write_all(&data)?;

            fs::remove_file(&loose_path).await?;
        }

        zip.finish()?;

        let checksum = calculate_checksum(&fs::read(&zip_path).await?);

        tracing::info!(
            "Export created: {:?} ({} trackers, {} logs, sha256 {})",
            zip_path,
            trackers.len(),
            log_count,
            checksum
        );

        Ok(ExportedArchive {
            path: zip_path,
            checksum,
            trackers: trackers.len(),
            logs: log_count,
        })
    }

    /// Import an uploaded archive as new trackers owned by `user`.
    ///
    /// Fails with `AppError::MalformedArchive` before any store write when
    /// the upload is not a zip, the metadata is missing or invalid, or any
    /// CSV entry cannot be parsed.
    pub async fn import_data(&self, user: &User, filename: &str, data: &[u8]) -> Result<ImportSummary> {
        ensure_zip_filename(filename)?;

        tracing::info!("Importing {} ({} bytes) for user: {}", filename, data.len(), user.id);

        let imports_dir = self.workspace.prepare_imports(user).await?;
        let zip_path = imports_dir.join(IMPORT_ARCHIVE_NAME);
        fs::write(&zip_path, data).await?;

        // Entry names are confined to the target directory by the zip crate
        {
            let zip_file = std::fs::File::open(&zip_path)?;
            let mut archive = ZipArchive::new(zip_file)
                .map_err(|e| ArchiveError::Unreadable(e.to_string()))?;
            archive
                .extract(&imports_dir)
                .map_err(|e| ArchiveError::Unreadable(e.to_string()))?;
        }

        let metadata_path = imports_dir.join(METADATA_ENTRY);
        if !fs::try_exists(&metadata_path).await? {
            return Err(ArchiveError::MissingMetadata.into());
        }
        let metadata_text = read_entry_text(&metadata_path, METADATA_ENTRY).await?;
        let metadata = format::decode_metadata(&metadata_text)?;

        let mut imported = Vec::new();
        for entry in self.workspace.list_files(&imports_dir).await? {
            if !format::is_csv_entry(&entry) {
                continue;
            }

            let body = read_entry_text(&imports_dir.join(&entry), &entry).await?;
            imported.push(format::decode_tracker(&entry, &body, &metadata)?);
        }

        let created = self.repo.import_trackers(user.id, &imported).await?;

        let summary = ImportSummary {
            trackers: created.len(),
            logs: imported.iter().map(|t| t.logs.len()).sum(),
        };

        tracing::info!(
            "Import complete for user {}: {} trackers, {} logs",
            user.id,
            summary.trackers,
            summary.logs
        );

        Ok(summary)
    }
}

/// Read an extracted entry, treating non UTF-8 content as an archive defect
async fn read_entry_text(path: &Path, entry: &str) -> Result<String> {
    let bytes = fs::read(path).await?;
    String::from_utf8(bytes).map_err(|_| {
        ArchiveError::NotUtf8 {
            entry: entry.to_string(),
        }
        .into()
    })
}

fn calculate_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, NewLog, NewTracker, TrackerType};
    use crate::error::AppError;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    async fn create_test_service() -> (ArchiveService, Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();
        let repo = Repository::new(pool);

        let workspace = Workspace::new(temp_dir.path().join("user_data"));
        workspace.initialize().await.unwrap();

        (ArchiveService::new(repo.clone(), workspace), repo, temp_dir)
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn read_entry(path: &std::path::Path, name: &str) -> String {
        let mut archive = ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        body
    }

    async fn seed(repo: &Repository, user: &User) {
        let weight = repo
            .create_tracker(
                user.id,
                &NewTracker {
                    name: "Weight".to_string(),
                    tracker_type: TrackerType::Quantitative,
                    settings: None,
                },
            )
            .await
            .unwrap();
        repo.create_log(
            weight.id,
            &NewLog {
                timestamp: "2024-01-01T08:00:00".to_string(),
                value: "70.5".to_string(),
                note: Some("after run, before breakfast".to_string()),
            },
        )
        .await
        .unwrap();

        repo.create_tracker(
            user.id,
            &NewTracker {
                name: "Mood".to_string(),
                tracker_type: TrackerType::Qualitative,
                settings: Some("low,mid,high".to_string()),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_export_layout() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();
        seed(&repo, &user).await;

        let export = service.export_data(&user).await.unwrap();

        assert!(export.path.ends_with("alice_1/exports/out.zip"));
        assert_eq!(export.trackers, 2);
        assert_eq!(export.logs, 1);
        assert_eq!(export.checksum.len(), 64);

        let archive = ZipArchive::new(std::fs::File::open(&export.path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["Mood_2.csv", "Weight_1.csv", "metadata.json"]);

        let weight = read_entry(&export.path, "Weight_1.csv");
        assert_eq!(
            weight,
            "timestamp, value, note\n2024-01-01T08:00:00,70.5,after run, before breakfast\n"
        );
        assert!(read_entry(&export.path, "Mood_2.csv").starts_with("timestamp, value, note\n"));

        // Loose files are gone, only the archive remains
        let remaining = service
            .workspace
            .list_files(export.path.parent().unwrap())
            .await
            .unwrap();
        assert_eq!(remaining, vec!["out.zip"]);
    }

    #[tokio::test]
    async fn test_metadata_matches_entries() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();
        seed(&repo, &user).await;

        let export = service.export_data(&user).await.unwrap();
        let metadata = format::decode_metadata(&read_entry(&export.path, METADATA_ENTRY)).unwrap();

        let archive = ZipArchive::new(std::fs::File::open(&export.path).unwrap()).unwrap();
        let mut ids: Vec<String> = archive
            .file_names()
            .filter(|n| format::is_csv_entry(n))
            .map(|n| format::parse_entry_name(n).unwrap().1)
            .collect();
        ids.sort();

        let keys: Vec<String> = metadata.keys().cloned().collect();
        assert_eq!(ids, keys);
        assert_eq!(metadata["2"].settings.as_deref(), Some("low,mid,high"));
    }

    #[tokio::test]
    async fn test_export_with_no_trackers() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let export = service.export_data(&user).await.unwrap();

        assert_eq!(read_entry(&export.path, METADATA_ENTRY), "{}");
    }

    #[tokio::test]
    async fn test_round_trip_into_fresh_user() {
        let (service, repo, _temp) = create_test_service().await;
        let alice = repo.create_user("alice", "hash").await.unwrap();
        seed(&repo, &alice).await;
        let export = service.export_data(&alice).await.unwrap();

        let bob = repo.create_user("bob", "hash").await.unwrap();
        let data = std::fs::read(&export.path).unwrap();
        let summary = service.import_data(&bob, "out.zip", &data).await.unwrap();

        assert_eq!(summary, ImportSummary { trackers: 2, logs: 1 });

        let trackers = repo.list_trackers(bob.id).await.unwrap();
        let weight = trackers.iter().find(|t| t.name == "Weight").unwrap();
        let mood = trackers.iter().find(|t| t.name == "Mood").unwrap();
        assert_eq!(weight.tracker_type, TrackerType::Quantitative);
        assert_eq!(weight.settings, None);
        assert_eq!(mood.settings.as_deref(), Some("low,mid,high"));

        let logs = repo.list_logs(weight.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].timestamp, "2024-01-01T08:00:00");
        assert_eq!(logs[0].value, "70.5");
        assert_eq!(logs[0].note.as_deref(), Some("after run, before breakfast"));
    }

    #[tokio::test]
    async fn test_import_rejects_non_zip_before_touching_disk() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let result = service.import_data(&user, "data.txt", b"anything").await;

        assert!(matches!(
            result,
            Err(AppError::MalformedArchive(ArchiveError::NotZip { .. }))
        ));
        assert!(!service.workspace.user_dir(&user).exists());
        assert_eq!(repo.count_trackers(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_fails_closed_on_missing_metadata_key() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let data = zip_bytes(&[
            ("Weight_7.csv", "timestamp, value, note\n2024-01-01T08:00:00,70,\n"),
            ("metadata.json", r#"{"8": {"type": "Quantitative", "settings": null}}"#),
        ]);

        let result = service.import_data(&user, "in.zip", &data).await;

        match result {
            Err(AppError::MalformedArchive(ArchiveError::MissingTrackerMetadata { id })) => {
                assert_eq!(id, "7")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(repo.count_trackers(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let data = zip_bytes(&[
            ("A_1.csv", "timestamp, value, note\n2024-01-01T08:00:00,1,\n"),
            ("B_2.csv", "timestamp, value, note\nbroken row\n"),
            (
                "metadata.json",
                r#"{"1": {"type": "Quantitative", "settings": null}, "2": {"type": "Quantitative", "settings": null}}"#,
            ),
        ]);

        let result = service.import_data(&user, "in.zip", &data).await;

        assert!(matches!(
            result,
            Err(AppError::MalformedArchive(ArchiveError::BadRow { line: 2, .. }))
        ));
        assert_eq!(repo.count_trackers(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_requires_metadata_document() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let data = zip_bytes(&[("A_1.csv", "timestamp, value, note\n")]);
        let result = service.import_data(&user, "in.zip", &data).await;

        assert!(matches!(
            result,
            Err(AppError::MalformedArchive(ArchiveError::MissingMetadata))
        ));
    }

    #[tokio::test]
    async fn test_import_rejects_garbage_zip() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let result = service.import_data(&user, "in.zip", b"not a zip at all").await;

        assert!(matches!(
            result,
            Err(AppError::MalformedArchive(ArchiveError::Unreadable(_)))
        ));
    }

    #[tokio::test]
    async fn test_import_legacy_archive_without_names() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let data = zip_bytes(&[
            (
                "Mood_12.csv",
                "timestamp, value, note\n2024-02-01T21:00:00,good,\n2024-02-02T21:00:00,bad,long day\n",
            ),
            ("metadata.json", r#"{"12": {"type": "Qualitative", "settings": "good,ok,bad"}}"#),
        ]);

        let summary = service.import_data(&user, "legacy.zip", &data).await.unwrap();
        assert_eq!(summary, ImportSummary { trackers: 1, logs: 2 });

        let trackers = repo.list_trackers(user.id).await.unwrap();
        assert_eq!(trackers[0].name, "Mood");
        assert_ne!(trackers[0].id, 12);

        let logs = repo.list_logs(trackers[0].id).await.unwrap();
        assert_eq!(logs[0].note, None);
        assert_eq!(logs[1].note.as_deref(), Some("long day"));
    }

    #[tokio::test]
    async fn test_second_import_does_not_reread_previous_files() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let first = zip_bytes(&[
            ("A_1.csv", "timestamp, value, note\n"),
            ("metadata.json", r#"{"1": {"type": "Quantitative", "settings": null}}"#),
        ]);
        let second = zip_bytes(&[
            ("B_2.csv", "timestamp, value, note\n"),
            ("metadata.json", r#"{"2": {"type": "Quantitative", "settings": null}}"#),
        ]);

        service.import_data(&user, "a.zip", &first).await.unwrap();
        let summary = service.import_data(&user, "b.zip", &second).await.unwrap();

        assert_eq!(summary.trackers, 1);
        assert_eq!(repo.count_trackers(user.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_import_rejects_non_utf8_entry() {
        let (service, repo, _temp) = create_test_service().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("A_1.csv", options).unwrap();
        zip.write_all(b"timestamp, value, note\n2024-01-01T08:00:00,\xff,\n")
            .unwrap();
        zip.start_file("metadata.json", options).unwrap();
        zip.write_all(br#"{"1": {"type": "Quantitative", "settings": null}}"#)
            .unwrap();
        let data = zip.finish().unwrap().into_inner();

        let result = service.import_data(&user, "in.zip", &data).await;

        match result {
            Err(AppError::MalformedArchive(ArchiveError::NotUtf8 { entry })) => {
                assert_eq!(entry, "A_1.csv")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(repo.count_trackers(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_names_with_separators_round_trip() {
        let (service, repo, _temp) = create_test_service().await;
        let alice = repo.create_user("alice", "hash").await.unwrap();

        for name in ["sleep_hours_3", "in/out"] {
            let tracker = repo
                .create_tracker(
                    alice.id,
                    &NewTracker {
                        name: name.to_string(),
                        tracker_type: TrackerType::Quantitative,
                        settings: None,
                    },
                )
                .await
                .unwrap();
            repo.create_log(
                tracker.id,
                &NewLog {
                    timestamp: "2024-03-01T22:00:00".to_string(),
                    value: "7".to_string(),
                    note: Some(" a, b ".to_string()),
                },
            )
            .await
            .unwrap();
        }

        let export = service.export_data(&alice).await.unwrap();
        let data = std::fs::read(&export.path).unwrap();

        let bob = repo.create_user("bob", "hash").await.unwrap();
        service.import_data(&bob, "out.zip", &data).await.unwrap();

        let trackers = repo.list_trackers(bob.id).await.unwrap();
        let mut names: Vec<&str> = trackers.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["in/out", "sleep_hours_3"]);

        for tracker in &trackers {
            let logs = repo.list_logs(tracker.id).await.unwrap();
            assert_eq!(logs.len(), 1);
            assert_eq!(logs[0].value, "7");
            assert_eq!(logs[0].note.as_deref(), Some(" a, b "));
        }
    }
}
