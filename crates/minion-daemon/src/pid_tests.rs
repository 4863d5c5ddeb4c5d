
    use super::*;
    use tempfile::TempDir;

    fn temp_lock() -> (TempDir, PathBuf, PidLock) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.pid");
        (dir, path.clone(), PidLock::new(Some(path)))
    }

    #[test]
    fn test_lock_new() {
        let lock = PidLock::new(Some(PathBuf::from("/tmp/test.pid")));
        assert_eq!(lock.path(), Some(Path::new("/tmp/test.pid")));
        assert!(!lock.is_held());
    }

    #[test]
    fn test_acquire_without_path_is_noop() {
        let mut lock = PidLock::new(None);
        assert!(lock.acquire().is_ok());
        assert!(!lock.is_held());
        lock.release();
    }

    #[test]
    fn test_acquire_writes_current_pid() {
        let (_dir, path, mut lock) = temp_lock();
        lock.acquire().unwrap();

        assert!(lock.is_held());
        assert_eq!(
            PidLock::read_pid(&path).unwrap(),
            Some(std::process::id().to_string())
        );
    }

    #[test]
    fn test_second_acquire_reports_holder() {
        let (_dir, path, mut first) = temp_lock();
        first.acquire().unwrap();

        let mut second = PidLock::new(Some(path.clone()));
        match second.acquire() {
            Err(DaemonError::AlreadyRunning { path: p, pid }) => {
                assert_eq!(p, path);
                assert_eq!(pid, std::process::id().to_string());
            }
            other => panic!("expected AlreadyRunning, got {:?}", other),
        }
        assert!(!second.is_held());

        // The loser must not remove the winner's file
        drop(second);
        assert!(path.exists());
    }

    #[test]
    fn test_existing_foreign_file_is_refused() {
        let (_dir, path, mut lock) = temp_lock();
        fs::write(&path, "not-a-pid\n").unwrap();

        let err = lock.acquire().unwrap_err();
        assert!(matches!(err, DaemonError::AlreadyRunning { ref pid, .. } if pid == "not-a-pid"));
    }

    #[test]
    fn test_release_removes_file() {
        let (_dir, path, mut lock) = temp_lock();
        lock.acquire().unwrap();
        assert!(path.exists());

        lock.release();
        assert!(!path.exists());
        assert!(!lock.is_held());
    }

    #[test]
    fn test_release_tolerates_missing_file() {
        let (_dir, path, mut lock) = temp_lock();
        lock.acquire().unwrap();
        fs::remove_file(&path).unwrap();

        // Logged, not fatal
        lock.release();
        assert!(!lock.is_held());
    }

    #[test]
    fn test_invalid_path_rejected_before_touching_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad-dir").join("bad name.pid");
        let mut lock = PidLock::new(Some(path.clone()));

        let err = lock.acquire().unwrap_err();
        assert!(matches!(err, DaemonError::InvalidLockPath(_)));
        assert!(!dir.path().join("bad-dir").exists());
    }

    #[test]
    fn test_validate_character_set() {
        assert!(PidLock::validate(Path::new("/var/run/minion/worker.pid")).is_ok());
        assert!(PidLock::validate(Path::new("relative/worker_1.pid")).is_ok());
        assert!(PidLock::validate(Path::new("/tmp/worker-1.pid")).is_err());
        assert!(PidLock::validate(Path::new("/tmp/work er.pid")).is_err());
        assert!(PidLock::validate(Path::new("/tmp/$(id).pid")).is_err());
        assert!(PidLock::validate(Path::new("")).is_err());
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subdir").join("deep").join("test.pid");
        let mut lock = PidLock::new(Some(path.clone()));

        lock.acquire().unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_survive_umask() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let lock_dir = dir.path().join("run");
        let path = lock_dir.join("test.pid");
        let mut lock = PidLock::new(Some(path.clone()));
        lock.acquire().unwrap();

        let dir_mode = fs::metadata(&lock_dir).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o777);

        let file_mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o666);
    }

    #[test]
    fn test_read_pid_missing_file() {
        let (_dir, path, _lock) = temp_lock();
        assert!(PidLock::read_pid(&path).unwrap().is_none());
    }

    #[test]
    fn test_is_process_running_current() {
        assert!(PidLock::is_process_running(std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn test_other_users_process_is_running() {
        // init is owned by root; unprivileged callers get EPERM
        assert!(PidLock::is_process_running(1));
    }

    #[test]
    fn test_parse_pid_accepts_single_process_ids() {
        assert_eq!(PidLock::parse_pid("4242"), Some(4242));
        assert_eq!(PidLock::parse_pid(" 17\n"), Some(17));
        assert_eq!(PidLock::parse_pid("2147483647"), Some(i32::MAX as u32));
    }

    #[test]
    fn test_parse_pid_rejects_group_ids() {
        for raw in ["0", "-1", "-4242", "4294967295", "2147483648", "", "pid"] {
            assert_eq!(PidLock::parse_pid(raw), None, "{:?}", raw);
        }
    }

    #[test]
    fn test_group_ids_are_never_running() {
        assert!(!PidLock::is_process_running(0));
        assert!(!PidLock::is_process_running(u32::MAX));
        assert!(!PidLock::is_process_running(i32::MAX as u32 + 1));
    }

    #[test]
    fn test_drop_removes_held_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.pid");

        {
            let mut lock = PidLock::new(Some(path.clone()));
            lock.acquire().unwrap();
            assert!(path.exists());
        } // PidLock dropped here

        assert!(!path.exists());
    }
