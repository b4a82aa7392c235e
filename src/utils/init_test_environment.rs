use std::path::PathBuf;

/// a fresh image path under the system temp dir, removing any leftover from an earlier run
pub fn init_test_image(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("simplefs-{}-{name}", std::process::id()));
    if path.exists() {
        std::fs::remove_file(&path).expect("Failed to remove stale test image");
    }
    path
}
