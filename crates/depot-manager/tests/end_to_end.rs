//! End-to-end resolution against the local filesystem backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use depot_core::{AssetsConfig, StorageProvider};
use depot_manager::{AssetError, AssetsManager, AssetsManagerSettings, AssetVersion};
use depot_storage::{
    DriverSettings, LocalDriverSettings, LocalStorageDriver, StorageDriver,
};
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    _working: TempDir,
    scratch: TempDir,
    driver: Arc<LocalStorageDriver>,
    manager: AssetsManager,
}

const BUCKET: &str = "store";

fn fixture() -> Fixture {
    let root = TempDir::new().unwrap();
    let working = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    std::fs::create_dir(root.path().join(BUCKET)).unwrap();

    let driver = Arc::new(
        LocalStorageDriver::new(LocalDriverSettings {
            root: root.path().to_path_buf(),
            bucket: BUCKET.to_string(),
        })
        .unwrap(),
    );
    let manager = AssetsManager::new(
        driver.clone(),
        BUCKET,
        AssetsManagerSettings::new(working.path()),
    )
    .unwrap();

    Fixture {
        _root: root,
        _working: working,
        scratch,
        driver,
        manager,
    }
}

fn version(s: &str) -> AssetVersion {
    s.parse().unwrap()
}

impl Fixture {
    fn source(&self, content: &[u8]) -> PathBuf {
        let path = self.scratch.path().join(format!("src-{}", content.len()));
        std::fs::write(&path, content).unwrap();
        path
    }

    async fn push(&self, name: &str, v: &str, content: &[u8]) {
        self.manager
            .push(&self.source(content), name, &version(v))
            .await
            .unwrap();
    }
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn push_then_fetch_round_trips_bytes() {
    let fx = fixture();
    fx.push("models/x", "1.0", b"hello").await;

    assert!(fx.manager.exists("models/x", &version("1.0")).await.unwrap());

    let fetched = fx.manager.fetch("models/x:1.0").await.unwrap();
    assert_eq!(fetched.name, "models/x");
    assert_eq!(fetched.version.to_string(), "1.0");
    assert!(!fetched.from_cache);
    assert_eq!(read(&fetched.path), b"hello");
}

#[tokio::test]
async fn second_fetch_is_a_cache_hit() {
    let fx = fixture();
    fx.push("m", "1.0", b"payload").await;

    let first = fx.manager.fetch("m:1.0").await.unwrap();
    assert!(!first.from_cache);

    // Even with the remote object gone, the cache entry keeps serving.
    fx.manager.delete("m", &version("1.0")).await.unwrap();
    let second = fx.manager.fetch("m:1.0").await.unwrap();
    assert!(second.from_cache);
    assert_eq!(read(&second.path), b"payload");
}

#[tokio::test]
async fn resolves_latest_and_major_pinned_versions() {
    let fx = fixture();
    fx.push("m", "1.0", b"v1.0").await;
    fx.push("m", "1.3", b"v1.3").await;
    fx.push("m", "2.1", b"v2.1").await;

    assert_eq!(fx.manager.fetch("m").await.unwrap().version.to_string(), "2.1");
    assert_eq!(fx.manager.fetch("m:1").await.unwrap().version.to_string(), "1.3");
    assert_eq!(read(&fx.manager.fetch("m:1.0").await.unwrap().path), b"v1.0");

    let versions: Vec<String> = fx
        .manager
        .list_versions("m")
        .await
        .unwrap()
        .iter()
        .map(|v| v.to_string())
        .collect();
    assert_eq!(versions, vec!["2.1", "1.3", "1.0"]);
}

#[tokio::test]
async fn missing_versions_surface_no_version_found() {
    let fx = fixture();
    fx.push("m", "1.0", b"x").await;

    for reference in ["m:3", "m:1.7", "never-pushed"] {
        match fx.manager.fetch(reference).await {
            Err(AssetError::NoVersionFound { .. }) => {}
            other => panic!("`{reference}` resolved to {other:?}"),
        }
    }
}

#[tokio::test]
async fn malformed_reference_is_rejected_up_front() {
    let fx = fixture();
    assert!(matches!(
        fx.manager.fetch("Not-An-Asset!").await,
        Err(AssetError::InvalidSpec(_))
    ));
}

#[tokio::test]
async fn directory_assets_support_sub_part_selection() {
    let fx = fixture();
    let tokens = fx.source(b"tokens");
    let weights = fx.source(b"weights!");
    fx.driver
        .upload_object(&tokens, BUCKET, "assets-v3/pack/1.0/vocab/tokens.txt")
        .await
        .unwrap();
    fx.driver
        .upload_object(&weights, BUCKET, "assets-v3/pack/1.0/weights.bin")
        .await
        .unwrap();

    let fetched = fx.manager.fetch("pack[vocab/tokens.txt]").await.unwrap();
    assert_eq!(fetched.version.to_string(), "1.0");
    assert_eq!(read(&fetched.path), b"tokens");

    // The whole asset landed in the cache alongside the sub-part.
    let whole = fx.manager.fetch("pack:1.0").await.unwrap();
    assert!(whole.from_cache);
    assert_eq!(read(&whole.path.join("weights.bin")), b"weights!");

    assert!(matches!(
        fx.manager.fetch("pack[no/such/file]").await,
        Err(AssetError::SubPartNotFound { .. })
    ));
}

#[tokio::test]
async fn zero_timeout_fails_with_timeout_error() {
    let fx = fixture();
    fx.push("m", "1.0", b"x").await;

    let working = TempDir::new().unwrap();
    let mut settings = AssetsManagerSettings::new(working.path());
    settings.timeout = Duration::ZERO;
    let manager = AssetsManager::new(fx.driver.clone(), BUCKET, settings).unwrap();

    assert!(matches!(
        manager.fetch("m:1.0").await,
        Err(AssetError::Timeout { .. })
    ));
}

#[tokio::test]
async fn manager_wires_up_from_raw_configuration() {
    let root = TempDir::new().unwrap();
    let working = TempDir::new().unwrap();
    std::fs::create_dir(root.path().join("store")).unwrap();

    let config = AssetsConfig {
        storage_provider: Some(StorageProvider::Local),
        bucket: Some("store".to_string()),
        local_root: Some(root.path().to_path_buf()),
        working_dir: Some(working.path().to_path_buf()),
        ..AssetsConfig::default()
    };

    // The dispatch instantiated exactly the local settings payload.
    assert!(matches!(
        DriverSettings::from_config(&config).unwrap(),
        DriverSettings::Local(_)
    ));

    let manager = AssetsManager::from_config(&config).unwrap();
    assert_eq!(manager.provider(), StorageProvider::Local);

    let source = working.path().join("src");
    std::fs::write(&source, b"wired").unwrap();
    manager.push(&source, "m", &version("0.1")).await.unwrap();
    assert_eq!(read(&manager.fetch("m").await.unwrap().path), b"wired");
}

#[tokio::test]
async fn missing_working_dir_is_a_configuration_error() {
    let fx = fixture();
    let settings = AssetsManagerSettings::new("/definitely/not/a/dir");
    assert!(matches!(
        AssetsManager::new(fx.driver.clone(), BUCKET, settings),
        Err(AssetError::Config(_))
    ));
}
