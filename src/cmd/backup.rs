use crate::auth::AuthProvider;
use crate::config::expand_tilde;
use crate::sync::SyncEngine;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed(usize),
    MissingDirectory,
    Terminated,
}

/// Backs up `raw_path` under the remote folder `backup_root`. Credential
/// failures propagate as errors; a failed walk is reported here and returned
/// as `Outcome::Terminated`.
pub fn run<A: AuthProvider>(auth: &A, backup_root: &str, raw_path: &str) -> Result<Outcome> {
    let path = resolve_local_root(raw_path);
    if !path.is_dir() {
        println!("Error: Directory '{}' does not exist.", path.display());
        return Ok(Outcome::MissingDirectory);
    }

    let store = auth.connect()?;
    tracing::info!(path = %path.display(), backup_root, "backup started");
    println!("___Backup cron is started___\n");

    let mut engine = SyncEngine::new(store, backup_root);
    match engine.sync_tree(&path) {
        Ok(count) => {
            if count == 0 {
                println!("No new backups made today\n");
            } else {
                println!("\nTotal new backups made today: {count}\n");
            }
            println!("___Backup is completed!___");
            tracing::info!(count, "backup completed");
            Ok(Outcome::Completed(count))
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "backup terminated");
            println!("Error: {e:#}");
            println!("___Backup terminated due to an error___");
            Ok(Outcome::Terminated)
        }
    }
}

fn resolve_local_root(raw: &str) -> PathBuf {
    expand_tilde(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::FakeStore;
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::fs;

    struct FakeAuth<'a> {
        store: &'a FakeStore,
        connects: Cell<usize>,
        fail: bool,
    }

    impl<'a> FakeAuth<'a> {
        fn new(store: &'a FakeStore) -> Self {
            Self {
                store,
                connects: Cell::new(0),
                fail: false,
            }
        }
    }

    impl<'a> AuthProvider for FakeAuth<'a> {
        type Store = &'a FakeStore;

        fn connect(&self) -> Result<&'a FakeStore> {
            self.connects.set(self.connects.get() + 1);
            if self.fail {
                return Err(anyhow!("not logged in"));
            }
            Ok(self.store)
        }
    }

    #[test]
    fn missing_directory_stops_before_auth() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::new();
        let auth = FakeAuth::new(&store);
        let missing = dir.path().join("missing");

        let outcome = run(&auth, "Backup", &missing.to_string_lossy()).unwrap();

        assert_eq!(outcome, Outcome::MissingDirectory);
        assert_eq!(auth.connects.get(), 0);
        assert!(store.nodes().is_empty());
    }

    #[test]
    fn regular_file_path_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "p").unwrap();
        let store = FakeStore::new();

        let outcome = run(&FakeAuth::new(&store), "Backup", &file.to_string_lossy()).unwrap();
        assert_eq!(outcome, Outcome::MissingDirectory);
    }

    #[test]
    fn credential_failure_is_fatal_before_remote_work() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::new();
        let auth = FakeAuth {
            fail: true,
            ..FakeAuth::new(&store)
        };

        let err = run(&auth, "Backup", &dir.path().to_string_lossy()).unwrap_err();

        assert!(err.to_string().contains("not logged in"));
        assert_eq!(store.list_calls.get(), 0);
    }

    #[test]
    fn completed_run_reports_count_then_zero() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("A")).unwrap();
        fs::write(dir.path().join("A/x.txt"), "x").unwrap();
        fs::write(dir.path().join("A/y.txt"), "y").unwrap();
        let store = FakeStore::new();
        let auth = FakeAuth::new(&store);
        let path = dir.path().to_string_lossy().into_owned();

        assert_eq!(run(&auth, "Backup", &path).unwrap(), Outcome::Completed(2));
        assert_eq!(run(&auth, "Backup", &path).unwrap(), Outcome::Completed(0));
        assert_eq!(store.named("Backup").len(), 1);
    }

    #[test]
    fn backup_root_failure_terminates_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = FakeStore::new();
        store.fail_folder("Backup");
        fs::create_dir(dir.path().join("A")).unwrap();

        let outcome = run(&FakeAuth::new(&store), "Backup", &dir.path().to_string_lossy()).unwrap();
        assert_eq!(outcome, Outcome::Terminated);
    }

    #[test]
    fn tilde_path_is_expanded() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(resolve_local_root("~/backups"), home.join("backups"));
    }

    #[test]
    fn surrounding_spaces_are_part_of_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let spaced = dir.path().join(" padded ");
        fs::create_dir(&spaced).unwrap();
        fs::create_dir(spaced.join("A")).unwrap();
        fs::write(spaced.join("A/x.txt"), "x").unwrap();
        let store = FakeStore::new();

        assert_eq!(resolve_local_root(&spaced.to_string_lossy()), spaced);
        let outcome = run(&FakeAuth::new(&store), "Backup", &spaced.to_string_lossy()).unwrap();
        assert_eq!(outcome, Outcome::Completed(1));
    }
}
