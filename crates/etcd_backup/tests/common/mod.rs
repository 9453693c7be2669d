#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Stand-in for `etcdctl` that writes a member directory for `backup` and a
/// single file for `snapshot save`, checking the pinned API version first.
pub const FAKE_ETCDCTL: &str = r#"#!/bin/sh
case "$ETCDCTL_API" in
  2)
    while [ $# -gt 0 ]; do
      case "$1" in
        --backup-dir) dest="$2"; shift ;;
      esac
      shift
    done
    mkdir -p "$dest/member/snap" "$dest/member/wal"
    echo bolt > "$dest/member/snap/db"
    echo entries > "$dest/member/wal/0000000000000000-0000000000000000.wal"
    echo "backup written to $dest"
    ;;
  3)
    for last; do :; done
    echo snapshot > "$last"
    echo "Snapshot saved at $last"
    ;;
  *)
    echo "unexpected ETCDCTL_API=$ETCDCTL_API" >&2
    exit 9
    ;;
esac
"#;

pub const FAILING_ETCDCTL: &str = "#!/bin/sh\necho 'Error: data-dir does not exist' >&2\nexit 1\n";

#[cfg(unix)]
pub fn install_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("etcdctl");
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    entries
}
