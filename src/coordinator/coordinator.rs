use crate::coordinator::error::{SyncError, SyncResult};
use crate::coordinator::state_machine::UpdateStateMachine;
use crate::coordinator::types::{
    Operation, RunOutcome, SyncReport, UpdateEvent, UpdateOptions,
};
use crate::diff::{DiffEngine, FileDiff, GroupDiff};
use crate::hash::HashService;
use crate::manifest::{
    FileEntry, GenerateOptions, Group, Manifest, ManifestGenerator, UpdatePolicy,
    MANIFEST_FILE_NAME,
};
use crate::transfer::{ClientConfig, RemoteClient, TransferExecutor};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of the name/version gate of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Proceed,
    SameVersion,
    Regression,
}

/// Why an unchanged-looking file gets fetched anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchReason {
    Changed,
    Missing,
    LocalDrift,
}

/// Drives generate, download, verify and update runs.
///
/// Transfers run one file at a time in manifest order. Cancellation is
/// checked before each file; once observed, no new transfer starts and the
/// run finishes without committing its manifest.
#[derive(Clone)]
pub struct SyncCoordinator {
    client: RemoteClient,
    executor: TransferExecutor,
    cancel: CancellationToken,
}

impl SyncCoordinator {
    pub fn new(config: &ClientConfig) -> SyncResult<Self> {
        let client = RemoteClient::new(config)?;
        let executor = TransferExecutor::new(client.clone());

        Ok(Self {
            client,
            executor,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Describe `dir` and write the manifest to `output`.
    pub async fn generate(
        &self,
        dir: &Path,
        output: &Path,
        options: &GenerateOptions,
    ) -> SyncResult<Manifest> {
        if !tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(SyncError::InvalidArgument(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }

        info!("Generating manifest for directory {}", dir.display());
        let manifest = ManifestGenerator::generate(dir, options).await?;
        manifest.save(output).await?;
        info!(
            "Manifest with {} files written to {}",
            manifest.file_count(),
            output.display()
        );

        Ok(manifest)
    }

    /// Initial fetch of a bundle into an untracked directory.
    ///
    /// Per-file failures are counted; the fetched manifest is persisted
    /// regardless unless the run was cancelled.
    pub async fn download(&self, dir: &Path, manifest_url: &str) -> SyncResult<SyncReport> {
        if tokio::fs::try_exists(dir.join(MANIFEST_FILE_NAME)).await? {
            return Err(SyncError::AlreadyInitialized(dir.display().to_string()));
        }
        tokio::fs::create_dir_all(dir).await?;

        let manifest = self.client.fetch_manifest(manifest_url).await?;
        info!(
            "Got manifest '{}' version {} ({})",
            manifest.name, manifest.version, manifest.version_label
        );

        let mut report = SyncReport::new(Operation::Download);

        'groups: for group in &manifest.groups {
            report.groups += 1;
            let group_dir = group.local_dir(dir);
            info!(
                "Downloading group '{}' from '{}' into directory '{}'",
                group.name,
                group.remote,
                group_dir.display()
            );

            for file in &group.files {
                if self.observe_cancel(&mut report) {
                    break 'groups;
                }
                report.files += 1;
                self.transfer_file(&mut report, group, &group_dir, file).await;
            }
        }

        let outcome = if self.cancel.is_cancelled() {
            RunOutcome::Held
        } else {
            manifest.save_to_dir(dir).await?;
            RunOutcome::Committed
        };

        info!(
            "Finished download of {} groups with {} files with {} errors",
            report.groups,
            report.files,
            report.error_count()
        );
        Ok(report.finish(outcome))
    }

    /// Re-hash every tracked file against the local manifest. No network.
    pub async fn verify(&self, dir: &Path) -> SyncResult<SyncReport> {
        let manifest = Manifest::load_from_dir(dir)
            .await?
            .ok_or_else(|| SyncError::NoLocalManifest(dir.display().to_string()))?;

        let mut report = SyncReport::new(Operation::Verify);

        'groups: for group in &manifest.groups {
            report.groups += 1;
            info!("Verifying group '{}'", group.name);

            let group_dir = group.local_dir(dir);
            if !is_dir(&group_dir).await {
                report.record_error(format!(
                    "Group directory '{}' can not be found at '{}'",
                    group.path,
                    group_dir.display()
                ));
                continue;
            }

            for file in &group.files {
                if self.observe_cancel(&mut report) {
                    break 'groups;
                }
                report.files += 1;
                debug!("Verifying file '{}'", file.path);

                let local = group.local_file(dir, file);
                if !is_file(&local).await {
                    report.record_error(format!(
                        "File '{}' in group '{}' can not be found at '{}'",
                        file.path,
                        group.name,
                        local.display()
                    ));
                    continue;
                }

                match HashService::verify_file(&file.hash, &local).await {
                    Ok(None) => report.up_to_date += 1,
                    Ok(Some(actual)) => report.record_error(format!(
                        "File '{}' hash is '{}' but expected '{}'",
                        file.path,
                        hex::encode_upper(actual),
                        file.hash.digest_hex()
                    )),
                    Err(e) => report.record_error(format!(
                        "File '{}' could not be hashed: {}",
                        file.path, e
                    )),
                }
            }
        }

        info!("Verification finished with {} errors", report.error_count());
        Ok(report.finish(RunOutcome::Checked))
    }

    /// Incremental resync of a tracked directory against a remote manifest.
    ///
    /// The new manifest is written only when every transfer succeeded; files
    /// already written by a failed run stay on disk.
    pub async fn update(
        &self,
        dir: &Path,
        manifest_url: &str,
        options: UpdateOptions,
    ) -> SyncResult<SyncReport> {
        let mut sm = UpdateStateMachine::new();
        let mut report = SyncReport::new(Operation::Update);

        let local = Manifest::load_from_dir(dir)
            .await?
            .ok_or_else(|| SyncError::NoLocalManifest(dir.display().to_string()))?;
        sm.transition(UpdateEvent::LocalLoaded)?;

        let remote = match self.client.fetch_manifest(manifest_url).await {
            Ok(remote) => remote,
            Err(e) => {
                sm.transition(UpdateEvent::Abort {
                    error: e.to_string(),
                })?;
                return Err(e.into());
            }
        };
        sm.transition(UpdateEvent::RemoteFetched)?;

        info!(
            "Local '{}' {}, remote '{}' {} ({})",
            local.name, local.version, remote.name, remote.version, remote.version_label
        );

        match gate(&local, &remote, options) {
            Ok(Gate::Proceed) => {
                sm.transition(UpdateEvent::GatePassed)?;
            }
            Ok(Gate::SameVersion) => {
                sm.transition(UpdateEvent::SameVersion)?;
                info!("Version {} is already installed", local.version);
                return Ok(report.finish(RunOutcome::UpToDate));
            }
            Ok(Gate::Regression) => {
                sm.transition(UpdateEvent::VersionRegression)?;
                warn!(
                    "Remote version {} is older than installed {}, not downgrading",
                    remote.version, local.version
                );
                return Ok(report.finish(RunOutcome::Refused));
            }
            Err(e) => {
                sm.transition(UpdateEvent::Abort {
                    error: e.to_string(),
                })?;
                return Err(e);
            }
        }

        let diff = DiffEngine::diff_manifests(&local, &remote);
        sm.transition(UpdateEvent::Diffed)?;

        for dropped in &diff.removed_groups {
            info!(
                "Group '{}' is no longer in the manifest; its files are left in place",
                dropped.name
            );
        }

        sm.transition(UpdateEvent::TransferStarted)?;

        // Removals run before any fetch and skip paths the new manifest lists.
        let claimed: HashSet<PathBuf> = remote
            .groups
            .iter()
            .flat_map(|g| g.files.iter().map(move |f| g.local_file(dir, f)))
            .collect();
        for group_diff in &diff.matched {
            if self.observe_cancel(&mut report) {
                break;
            }
            self.remove_dropped_files(&mut report, dir, group_diff, &claimed)
                .await;
        }

        for group in &diff.added_groups {
            report.groups += 1;
            let group_dir = group.local_dir(dir);
            info!("Downloading new group '{}'", group.name);

            for file in &group.files {
                if self.observe_cancel(&mut report) {
                    break;
                }
                report.files += 1;
                self.transfer_file(&mut report, group, &group_dir, file).await;
            }
        }

        for group_diff in &diff.matched {
            if self.observe_cancel(&mut report) {
                break;
            }
            report.groups += 1;
            self.apply_group_diff(&mut report, dir, group_diff, options).await;
        }

        let state = sm.transition(UpdateEvent::TransferFinished {
            failures: report.error_count(),
        })?;
        debug!("Update finished in state {:?}", state);

        let outcome = if report.is_clean() {
            remote.save_to_dir(dir).await?;
            info!("Committed manifest version {}", remote.version);
            RunOutcome::Committed
        } else {
            warn!(
                "{} files failed; keeping manifest version {}",
                report.error_count(),
                local.version
            );
            RunOutcome::Held
        };

        info!(
            "Update fetched {} files, {} up to date, {} removed, {} errors",
            report.fetched,
            report.up_to_date,
            report.removed,
            report.error_count()
        );
        Ok(report.finish(outcome))
    }

    async fn apply_group_diff(
        &self,
        report: &mut SyncReport,
        dir: &Path,
        diff: &GroupDiff,
        options: UpdateOptions,
    ) {
        let group = &diff.current;
        let group_dir = group.local_dir(dir);
        info!(
            "Updating group '{}': {} added, {} removed, {} matched",
            group.name,
            diff.added_files.len(),
            diff.removed_files.len(),
            diff.updated_files.len()
        );

        for file in &diff.added_files {
            if self.observe_cancel(report) {
                return;
            }
            report.files += 1;
            self.transfer_file(report, group, &group_dir, file).await;
        }

        for file_diff in &diff.updated_files {
            if self.observe_cancel(report) {
                return;
            }
            report.files += 1;

            let local = group.local_file(dir, &file_diff.current);
            match fetch_reason(file_diff, &local, options.quick).await {
                Some(reason) => {
                    debug!("Fetching '{}' ({:?})", file_diff.path(), reason);
                    self.transfer_file(report, group, &group_dir, &file_diff.current)
                        .await;
                }
                None => report.up_to_date += 1,
            }
        }
    }

    /// Delete files dropped from a matched group unless another entry of the
    /// new manifest resolves to the same location.
    async fn remove_dropped_files(
        &self,
        report: &mut SyncReport,
        dir: &Path,
        diff: &GroupDiff,
        claimed: &HashSet<PathBuf>,
    ) {
        for file in &diff.removed_files {
            let local = diff.previous.local_file(dir, file);
            if claimed.contains(&local) {
                debug!("Keeping '{}', still listed by the new manifest", local.display());
                continue;
            }
            match tokio::fs::remove_file(&local).await {
                Ok(()) => {
                    debug!("Removed '{}'", local.display());
                    report.removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove '{}': {}", local.display(), e),
            }
        }
    }

    /// Fetch one file, recording the outcome in `report`.
    async fn transfer_file(
        &self,
        report: &mut SyncReport,
        group: &Group,
        group_dir: &Path,
        file: &FileEntry,
    ) {
        match self
            .executor
            .fetch_and_verify(file, group_dir, &group.remote)
            .await
        {
            Ok(outcome) => {
                debug!("Fetched '{}' ({} bytes)", outcome.url, outcome.bytes);
                report.fetched += 1;
            }
            Err(e) => report.record_error(e.to_string()),
        }
    }

    /// Record cancellation once and report whether the run must stop.
    fn observe_cancel(&self, report: &mut SyncReport) -> bool {
        if !self.cancel.is_cancelled() {
            return false;
        }
        const CANCELLED: &str = "Run cancelled before all files were processed";
        if report.errors.last().map(String::as_str) != Some(CANCELLED) {
            report.record_error(CANCELLED);
        }
        true
    }
}

fn gate(local: &Manifest, remote: &Manifest, options: UpdateOptions) -> SyncResult<Gate> {
    if options.force {
        return Ok(Gate::Proceed);
    }

    if local.name != remote.name {
        return Err(SyncError::NameMismatch {
            local: local.name.clone(),
            remote: remote.name.clone(),
        });
    }

    match remote.version.cmp(&local.version) {
        Ordering::Equal => Ok(Gate::SameVersion),
        Ordering::Less if !options.allow_downgrade => Ok(Gate::Regression),
        _ => Ok(Gate::Proceed),
    }
}

/// Decide whether a file present in both manifests must be fetched.
async fn fetch_reason(diff: &FileDiff, local: &Path, quick: bool) -> Option<FetchReason> {
    let exists = is_file(local).await;

    if diff.current.update_policy == UpdatePolicy::NewOnly && exists {
        return None;
    }
    if !exists {
        return Some(FetchReason::Missing);
    }
    if diff.needs_update() {
        return Some(FetchReason::Changed);
    }
    if quick {
        return None;
    }

    match HashService::verify_file(&diff.current.hash, local).await {
        Ok(None) => None,
        Ok(Some(_)) => Some(FetchReason::LocalDrift),
        Err(e) => {
            debug!("Re-hash of '{}' failed: {}", local.display(), e);
            Some(FetchReason::LocalDrift)
        }
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashAlgorithm, HashDescriptor};
    use tempfile::TempDir;

    fn entry(path: &str, content: &[u8], policy: UpdatePolicy) -> FileEntry {
        FileEntry::new(
            path,
            content.len() as u64,
            policy,
            HashDescriptor::new(
                HashAlgorithm::Sha256,
                HashService::digest_bytes(HashAlgorithm::Sha256, content),
            ),
        )
    }

    fn manifest(name: &str, version: &str) -> Manifest {
        Manifest::new(name, semver::Version::parse(version).unwrap(), version, vec![])
    }

    #[test]
    fn test_gate_versions() {
        let local = manifest("app", "1.2.0");
        let opts = UpdateOptions::default();

        assert_eq!(gate(&local, &manifest("app", "1.3.0"), opts).unwrap(), Gate::Proceed);
        assert_eq!(gate(&local, &manifest("app", "1.2.0"), opts).unwrap(), Gate::SameVersion);
        assert_eq!(gate(&local, &manifest("app", "1.1.9"), opts).unwrap(), Gate::Regression);
        assert_eq!(
            gate(&local, &manifest("app", "1.2.0-rc.1"), opts).unwrap(),
            Gate::Regression
        );
    }

    #[test]
    fn test_gate_overrides() {
        let local = manifest("app", "2.0.0");
        let downgrade = UpdateOptions {
            allow_downgrade: true,
            ..Default::default()
        };
        let force = UpdateOptions {
            force: true,
            ..Default::default()
        };

        assert_eq!(gate(&local, &manifest("app", "1.0.0"), downgrade).unwrap(), Gate::Proceed);
        assert_eq!(gate(&local, &manifest("app", "2.0.0"), force).unwrap(), Gate::Proceed);
        assert_eq!(gate(&local, &manifest("other", "1.0.0"), force).unwrap(), Gate::Proceed);
    }

    #[test]
    fn test_gate_name_mismatch() {
        let result = gate(
            &manifest("app", "1.0.0"),
            &manifest("other", "2.0.0"),
            UpdateOptions::default(),
        );
        assert!(matches!(result, Err(SyncError::NameMismatch { .. })));
    }

    #[tokio::test]
    async fn test_fetch_reason() {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("a.txt");
        let same = FileDiff::new(
            entry("a.txt", b"hello", UpdatePolicy::Overwrite),
            entry("a.txt", b"hello", UpdatePolicy::Overwrite),
        );

        assert_eq!(fetch_reason(&same, &local, false).await, Some(FetchReason::Missing));

        tokio::fs::write(&local, b"hello").await.unwrap();
        assert_eq!(fetch_reason(&same, &local, false).await, None);

        tokio::fs::write(&local, b"jello").await.unwrap();
        assert_eq!(fetch_reason(&same, &local, false).await, Some(FetchReason::LocalDrift));
        assert_eq!(fetch_reason(&same, &local, true).await, None);

        let changed = FileDiff::new(
            entry("a.txt", b"hello", UpdatePolicy::Overwrite),
            entry("a.txt", b"hello!", UpdatePolicy::Overwrite),
        );
        assert_eq!(fetch_reason(&changed, &local, true).await, Some(FetchReason::Changed));
    }

    #[tokio::test]
    async fn test_new_only_keeps_existing_copy() {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("settings.ini");
        let diff = FileDiff::new(
            entry("settings.ini", b"a=1", UpdatePolicy::NewOnly),
            entry("settings.ini", b"a=2", UpdatePolicy::NewOnly),
        );

        assert_eq!(fetch_reason(&diff, &local, false).await, Some(FetchReason::Missing));

        tokio::fs::write(&local, b"user edited").await.unwrap();
        assert_eq!(fetch_reason(&diff, &local, false).await, None);
    }

    #[tokio::test]
    async fn test_verify_without_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let coordinator = SyncCoordinator::new(&ClientConfig::default()).unwrap();

        let result = coordinator.verify(temp_dir.path()).await;
        assert!(matches!(result, Err(SyncError::NoLocalManifest(_))));
        assert_eq!(result.unwrap_err().exit_code(), -1);
    }

    #[tokio::test]
    async fn test_verify_reports_each_problem() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let m = Manifest::new(
            "app",
            semver::Version::new(1, 0, 0),
            "1.0.0",
            vec![
                Group::new(
                    "assets",
                    "assets",
                    "http://unused/",
                    vec![
                        entry("ok.txt", b"ok", UpdatePolicy::Overwrite),
                        entry("bad.txt", b"good", UpdatePolicy::Overwrite),
                        entry("missing.txt", b"?", UpdatePolicy::Overwrite),
                    ],
                ),
                Group::new("plugins", "plugins", "http://unused/", vec![]),
            ],
        );
        m.save_to_dir(root).await.unwrap();
        tokio::fs::create_dir_all(root.join("assets")).await.unwrap();
        tokio::fs::write(root.join("assets/ok.txt"), b"ok").await.unwrap();
        tokio::fs::write(root.join("assets/bad.txt"), b"evil").await.unwrap();

        let coordinator = SyncCoordinator::new(&ClientConfig::default()).unwrap();
        let report = coordinator.verify(root).await.unwrap();

        assert_eq!(report.outcome, Some(RunOutcome::Checked));
        assert_eq!(report.groups, 2);
        assert_eq!(report.files, 3);
        assert_eq!(report.up_to_date, 1);
        assert_eq!(report.exit_code(), 3);
        assert!(report.errors.iter().any(|e| e.contains("bad.txt") && e.contains("hash")));
        assert!(report.errors.iter().any(|e| e.contains("missing.txt") && e.contains("can not be found")));
        assert!(report.errors.iter().any(|e| e.contains("Group directory 'plugins'")));
    }

    #[tokio::test]
    async fn test_generate_writes_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("build");
        tokio::fs::create_dir_all(&src).await.unwrap();
        tokio::fs::write(src.join("app.bin"), b"binary").await.unwrap();
        let output = temp_dir.path().join("out").join("manifest.json");

        let coordinator = SyncCoordinator::new(&ClientConfig::default()).unwrap();
        let options = GenerateOptions {
            name: "app".into(),
            remote: "http://host/files/".into(),
            ..Default::default()
        };
        let manifest = coordinator.generate(&src, &output, &options).await.unwrap();

        assert_eq!(manifest.file_count(), 1);
        let loaded = Manifest::load(&output).await.unwrap();
        assert_eq!(loaded, manifest);

        let not_a_dir = coordinator
            .generate(&src.join("app.bin"), &output, &options)
            .await;
        assert!(matches!(not_a_dir, Err(SyncError::InvalidArgument(_))));
    }
}
