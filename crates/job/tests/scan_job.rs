use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use subfetch_cache::region::RegionConfig;
use subfetch_core::language::{Language, LanguageSet};
use subfetch_core::types::SectionKind;
use subfetch_core::video::{Video, VideoInfo};
use subfetch_job::{JobError, JobParams, ScanJob};
use subfetch_mediaserver::{LibType, MediaItem, MediaLibrary, MediaServerError, Section};
use subfetch_providers::{
    MatchKind, ProviderError, ProviderRegistry, Subtitle, SubtitleProvider,
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    initialize: AtomicUsize,
    list: AtomicUsize,
    terminate: AtomicUsize,
}

struct FakeProvider {
    name: &'static str,
    languages: LanguageSet,
    fail_with: Option<fn() -> ProviderError>,
    counters: Arc<Counters>,
}

#[async_trait::async_trait]
impl SubtitleProvider for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn languages(&self) -> &LanguageSet {
        &self.languages
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        self.counters.initialize.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_subtitles(
        &self,
        video: &Video,
        languages: &LanguageSet,
    ) -> Result<Vec<Subtitle>, ProviderError> {
        self.counters.list.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = self.fail_with {
            return Err(make());
        }
        let identity = match video.info {
            VideoInfo::Movie(_) => vec![MatchKind::Title, MatchKind::Year],
            VideoInfo::Episode(_) => vec![MatchKind::Series, MatchKind::Season, MatchKind::Episode],
        };
        Ok(languages
            .iter()
            .map(|lang| {
                Subtitle::new(self.name, format!("{}-{}", video.file_name(), lang), *lang)
                    .with_matches(identity.iter().copied())
            })
            .collect())
    }

    async fn download_subtitle(&self, subtitle: &mut Subtitle) -> Result<(), ProviderError> {
        subtitle.content = Some(
            format!("1\n00:00:01,000 --> 00:00:02,000\n{}\n", subtitle.id).into_bytes(),
        );
        Ok(())
    }

    async fn terminate(&self) -> Result<(), ProviderError> {
        self.counters.terminate.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn register(
    registry: &mut ProviderRegistry,
    name: &'static str,
    fail_with: Option<fn() -> ProviderError>,
) -> Arc<Counters> {
    let counters = Arc::new(Counters::default());
    let shared = counters.clone();
    registry.register(name, move |_config| {
        Ok(Arc::new(FakeProvider {
            name,
            languages: ["eng", "fra", "deu"]
                .iter()
                .map(|c| Language::parse(c).unwrap())
                .collect(),
            fail_with,
            counters: shared.clone(),
        }) as Arc<dyn SubtitleProvider>)
    });
    counters
}

#[derive(Default)]
struct FakeLibrary {
    refreshed: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl MediaLibrary for FakeLibrary {
    async fn sections(&self) -> Result<Vec<Section>, MediaServerError> {
        Ok(vec![
            Section {
                key: "1".into(),
                title: "Movies".into(),
                kind: SectionKind::Movie,
            },
            Section {
                key: "2".into(),
                title: "Music".into(),
                kind: SectionKind::Other,
            },
        ])
    }

    async fn search(
        &self,
        _section: &Section,
        title: &str,
        year: Option<u16>,
        _kind: LibType,
    ) -> Result<Vec<MediaItem>, MediaServerError> {
        if title != "Inception" {
            return Ok(Vec::new());
        }
        Ok(vec![MediaItem {
            rating_key: "100".into(),
            title: title.into(),
            year,
            season: None,
            episode: None,
        }])
    }

    async fn episodes(&self, _show: &MediaItem) -> Result<Vec<MediaItem>, MediaServerError> {
        Ok(Vec::new())
    }

    async fn refresh(&self, item: &MediaItem) -> Result<(), MediaServerError> {
        self.refreshed.lock().push(item.rating_key.clone());
        Ok(())
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn cache_config() -> RegionConfig {
    RegionConfig::at(
        std::env::temp_dir().join(format!("subfetch-job-test-{}.db", std::process::id())),
    )
}

fn job(registry: ProviderRegistry) -> ScanJob {
    ScanJob::new(registry).with_cache(cache_config())
}

fn params(dir: &Path, languages: &[&str], providers: &[&str]) -> JobParams {
    JobParams {
        scan_path: dir.to_path_buf(),
        scan_age: 2,
        languages: languages.iter().map(|s| s.to_string()).collect(),
        encoding: "utf-8".into(),
        min_score: 50,
        providers: providers.iter().map(|s| s.to_string()).collect(),
        provider_configs: None,
        max_workers: 2,
        plex_url: None,
        plex_token: None,
    }
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

fn srt_count(dir: &Path) -> usize {
    files_in(dir)
        .iter()
        .filter(|p| p.extension().is_some_and(|e| e == "srt"))
        .count()
}

/// Write an executable that prints `stdout` the way ffprobe would.
#[cfg(unix)]
fn fake_ffprobe(dir: &Path, stdout: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffprobe");
    fs::write(&path, format!("#!/bin/sh\ncat <<'JSON'\n{stdout}\nJSON\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    // A concurrent fork can briefly hold the write handle open (ETXTBSY).
    for _ in 0..50 {
        match std::process::Command::new(&path).output() {
            Err(e) if e.raw_os_error() == Some(26) => {
                std::thread::sleep(Duration::from_millis(20))
            }
            _ => break,
        }
    }
    path
}

async fn wait_for(counter: &AtomicUsize, expected: usize) {
    for _ in 0..100 {
        if counter.load(Ordering::SeqCst) == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(counter.load(Ordering::SeqCst), expected);
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_parameters_fail_before_any_write() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();
    let before = files_in(tmp.path());

    let mut registry = ProviderRegistry::new();
    let counters = register(&mut registry, "fake", None);
    let job = job(registry);
    let ok = params(tmp.path(), &["eng"], &["fake"]);

    let mut cases: Vec<(JobParams, &str)> = Vec::new();
    let mut p = ok.clone();
    p.scan_path = tmp.path().join("missing");
    cases.push((p, "InvalidPath"));
    let mut p = ok.clone();
    p.scan_age = 0;
    cases.push((p, "InvalidArgument"));
    let mut p = ok.clone();
    p.languages.clear();
    cases.push((p, "InvalidArgument"));
    let mut p = ok.clone();
    p.providers.clear();
    cases.push((p, "InvalidArgument"));
    let mut p = ok.clone();
    p.max_workers = 0;
    cases.push((p, "InvalidArgument"));
    let mut p = ok.clone();
    p.encoding = "klingon-8".into();
    cases.push((p, "UnknownEncoding"));
    let mut p = ok.clone();
    p.encoding = "iso-2022-kr".into();
    cases.push((p, "UnknownEncoding"));
    let mut p = ok.clone();
    p.languages = vec!["eng".into(), "12345".into()];
    cases.push((p, "InvalidLanguage"));

    for (params, expected) in cases {
        let err = job.run(&params).await.unwrap_err();
        assert_eq!(err.type_name(), expected, "{err}");
    }

    assert_eq!(files_in(tmp.path()), before);
    assert_eq!(counters.list.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn one_movie_one_provider() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    let counters = register(&mut registry, "fake", None);
    let result = job(registry)
        .run(&params(tmp.path(), &["eng"], &["fake"]))
        .await
        .unwrap();

    assert_eq!(result.videos.collected, vec!["Inception.2010.mkv".to_string()]);
    assert_eq!(result.videos.ignored, 0);
    assert_eq!(
        result.subtitles.by_provider["fake"],
        vec!["Inception.2010.en.srt".to_string()]
    );
    assert_eq!(result.subtitles.total, 1);
    assert!(result.providers.discarded.is_empty());
    assert!(tmp.path().join("Inception.2010.en.srt").exists());

    assert_eq!(counters.initialize.load(Ordering::SeqCst), 1);
    assert_eq!(counters.terminate.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn episode_with_existing_sidecar_is_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Show.S01E02.mkv"), "x").unwrap();
    fs::write(tmp.path().join("Show.S01E02.en.srt"), "existing").unwrap();

    let mut registry = ProviderRegistry::new();
    let counters = register(&mut registry, "fake", None);
    let result = job(registry)
        .run(&params(tmp.path(), &["eng"], &["fake"]))
        .await
        .unwrap();

    assert!(result.videos.collected.is_empty());
    assert_eq!(result.videos.ignored, 1);
    assert_eq!(result.subtitles.total, 0);
    assert_eq!(counters.initialize.load(Ordering::SeqCst), 0);
    assert_eq!(
        fs::read_to_string(tmp.path().join("Show.S01E02.en.srt")).unwrap(),
        "existing"
    );
}

#[tokio::test]
async fn only_missing_languages_are_fetched() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Show.S01E02.mkv"), "x").unwrap();
    fs::write(tmp.path().join("Show.S01E02.en.srt"), "existing").unwrap();

    let mut registry = ProviderRegistry::new();
    register(&mut registry, "fake", None);
    let result = job(registry)
        .run(&params(tmp.path(), &["eng", "fra"], &["fake"]))
        .await
        .unwrap();

    assert_eq!(result.videos.collected, vec!["Show.S01E02.mkv".to_string()]);
    assert_eq!(
        result.subtitles.by_provider["fake"],
        vec!["Show.S01E02.fr.srt".to_string()]
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("Show.S01E02.en.srt")).unwrap(),
        "existing"
    );
}

#[tokio::test]
async fn total_matches_files_written() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();
    fs::write(tmp.path().join("The.Matrix.1999.mkv"), "x").unwrap();
    fs::write(tmp.path().join("Show.S01E02.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    register(&mut registry, "fake", None);
    let result = job(registry)
        .run(&params(tmp.path(), &["eng", "fra"], &["fake"]))
        .await
        .unwrap();

    assert_eq!(result.videos.collected.len(), 3);
    assert_eq!(result.subtitles.total, 6);
    assert_eq!(srt_count(tmp.path()), result.subtitles.total);
    let listed: usize = result.subtitles.by_provider.values().map(Vec::len).sum();
    assert_eq!(listed, result.subtitles.total);
}

#[tokio::test]
async fn fatal_provider_is_reported_as_discarded() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();
    fs::write(tmp.path().join("The.Matrix.1999.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    let locked = register(
        &mut registry,
        "locked",
        Some(|| ProviderError::Authentication("bad credentials".into())),
    );
    register(&mut registry, "fake", None);
    let result = job(registry)
        .run(&params(tmp.path(), &["eng"], &["locked", "fake"]))
        .await
        .unwrap();

    assert_eq!(result.providers.discarded, vec!["locked".to_string()]);
    assert_eq!(result.subtitles.total, 2);
    assert!(!result.subtitles.by_provider.contains_key("locked"));
    // Queried for the first video only.
    assert_eq!(locked.list.load(Ordering::SeqCst), 1);
    assert_eq!(locked.terminate.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_provider_fails_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();

    let err = job(ProviderRegistry::new())
        .run(&params(tmp.path(), &["eng"], &["nope"]))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Provider(ProviderError::UnknownProvider(_))));
}

#[tokio::test]
async fn pool_is_terminated_when_saving_fails() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();
    // A directory where the subtitle file should go makes the write fail.
    fs::create_dir(tmp.path().join("Inception.2010.en.srt")).unwrap();

    let mut registry = ProviderRegistry::new();
    let counters = register(&mut registry, "fake", None);
    let err = job(registry)
        .run(&params(tmp.path(), &["eng"], &["fake"]))
        .await
        .unwrap_err();

    assert_eq!(err.type_name(), "Io");
    assert_eq!(counters.terminate.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn media_server_refresh_and_failures() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();
    fs::write(tmp.path().join("The.Matrix.1999.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    register(&mut registry, "fake", None);
    let library = Arc::new(FakeLibrary::default());
    let connected = Arc::new(Mutex::new(Vec::new()));

    let job = {
        let library = library.clone();
        let connected = connected.clone();
        job(registry).with_media_connector(Arc::new(
            move |url: &str, token: &str| -> Result<Arc<dyn MediaLibrary>, MediaServerError> {
                connected.lock().push((url.to_string(), token.to_string()));
                Ok(library.clone() as Arc<dyn MediaLibrary>)
            },
        ))
    };

    let mut p = params(tmp.path(), &["eng"], &["fake"]);
    p.plex_url = Some("http://plex.local:32400".into());
    p.plex_token = Some("token".into());
    let result = job.run(&p).await.unwrap();

    assert_eq!(
        *connected.lock(),
        vec![("http://plex.local:32400".to_string(), "token".to_string())]
    );
    assert_eq!(
        result.media_server.refreshed,
        vec!["<MovieSection:1:Movies><Movie [Inception, 2010]>".to_string()]
    );
    assert_eq!(
        result.media_server.failed,
        vec!["<Movie [The Matrix, 1999]>".to_string()]
    );
    assert_eq!(*library.refreshed.lock(), vec!["100".to_string()]);
}

#[tokio::test]
async fn media_server_is_skipped_without_token() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    register(&mut registry, "fake", None);
    let job = job(registry).with_media_connector(Arc::new(
        |_url: &str, _token: &str| -> Result<Arc<dyn MediaLibrary>, MediaServerError> {
            panic!("media server must not be contacted")
        },
    ));

    let mut p = params(tmp.path(), &["eng"], &["fake"]);
    p.plex_url = Some("http://plex.local:32400".into());
    let result = job.run(&p).await.unwrap();

    assert!(result.media_server.refreshed.is_empty());
    assert!(result.media_server.failed.is_empty());
}

#[tokio::test]
async fn positional_arguments_with_extras() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    register(&mut registry, "fake", None);
    let args = json!([
        tmp.path().to_string_lossy(),
        2,
        "eng,fra",
        "latin-1",
        50,
        ["fake"],
        { "fake": { "username": "u", "password": "p" } },
        1,
        "",
        "",
        "ignored",
        { "also": "ignored" }
    ]);
    let result = job(registry)
        .run_with_args(args.as_array().unwrap())
        .await
        .unwrap();

    assert_eq!(result.subtitles.total, 2);
    assert!(ScanJob::succeeded_description(&result).ends_with("| downloaded: 2"));
}

#[cfg(unix)]
#[tokio::test]
async fn embedded_subtitle_track_counts_as_present() {
    let tmp = tempfile::tempdir().unwrap();
    let media = tmp.path().join("media");
    fs::create_dir(&media).unwrap();
    fs::write(media.join("Inception.2010.mkv"), "x").unwrap();
    let ffprobe = fake_ffprobe(
        tmp.path(),
        r#"{"streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "tags": {"language": "fra"}},
            {"index": 2, "codec_type": "subtitle", "codec_name": "subrip", "tags": {"language": "eng"}}
        ]}"#,
    );

    let mut registry = ProviderRegistry::new();
    let counters = register(&mut registry, "fake", None);
    let job = job(registry).with_ffprobe(Some(ffprobe));

    let result = job.run(&params(&media, &["eng"], &["fake"])).await.unwrap();
    assert!(result.videos.collected.is_empty());
    assert_eq!(result.videos.ignored, 1);
    assert_eq!(counters.list.load(Ordering::SeqCst), 0);
    assert_eq!(srt_count(&media), 0);

    // The audio language does not count, so French is still fetched.
    let result = job.run(&params(&media, &["eng", "fra"], &["fake"])).await.unwrap();
    assert_eq!(
        result.subtitles.by_provider["fake"],
        vec!["Inception.2010.fr.srt".to_string()]
    );
}

#[tokio::test]
async fn huge_min_score_downloads_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Show.S01E02.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    let counters = register(&mut registry, "fake", None);
    let mut p = params(tmp.path(), &["eng"], &["fake"]);
    p.min_score = 20_000_000;
    let result = job(registry).run(&p).await.unwrap();

    assert_eq!(result.videos.collected, vec!["Show.S01E02.mkv".to_string()]);
    assert_eq!(result.subtitles.total, 0);
    assert_eq!(srt_count(tmp.path()), 0);
    assert_eq!(counters.terminate.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn huge_scan_age_finds_old_videos() {
    let tmp = tempfile::tempdir().unwrap();
    let video = tmp.path().join("Inception.2010.mkv");
    fs::write(&video, "x").unwrap();
    let file = fs::File::options().write(true).open(&video).unwrap();
    file.set_modified(std::time::SystemTime::now() - Duration::from_secs(10 * 365 * 24 * 3600))
        .unwrap();

    let mut registry = ProviderRegistry::new();
    register(&mut registry, "fake", None);
    let job = job(registry);

    for scan_age in [1_i64 << 32, i64::MAX] {
        let mut p = params(tmp.path(), &["eng"], &["fake"]);
        p.scan_age = scan_age;
        let result = job.run(&p).await.unwrap();
        assert_eq!(result.videos.collected.len() + result.videos.ignored, 1, "{scan_age}");
    }
    assert!(tmp.path().join("Inception.2010.en.srt").exists());
}

#[tokio::test]
async fn utf16_encoding_writes_utf16() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    register(&mut registry, "fake", None);
    let mut p = params(tmp.path(), &["eng"], &["fake"]);
    p.encoding = "utf-16".into();
    let result = job(registry).run(&p).await.unwrap();

    assert_eq!(result.subtitles.total, 1);
    let bytes = fs::read(tmp.path().join("Inception.2010.en.srt")).unwrap();
    assert_eq!(&bytes[..4], &[0xFF, 0xFE, b'1', 0]);
}

#[tokio::test]
async fn unencodable_subtitle_fails_without_writing() {
    let tmp = tempfile::tempdir().unwrap();
    // The fake subtitle text carries the video file name.
    fs::write(tmp.path().join("Москва.2010.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    let counters = register(&mut registry, "fake", None);
    let mut p = params(tmp.path(), &["eng"], &["fake"]);
    p.encoding = "windows-1252".into();
    let err = job(registry).run(&p).await.unwrap_err();

    assert_eq!(err.type_name(), "Io");
    assert_eq!(srt_count(tmp.path()), 0);
    assert_eq!(counters.terminate.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_panic_still_terminates_pool() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("Inception.2010.mkv"), "x").unwrap();

    let mut registry = ProviderRegistry::new();
    let counters = register(&mut registry, "crashy", Some(|| panic!("provider crashed")));
    let job = job(registry);
    let p = params(tmp.path(), &["eng"], &["crashy"]);

    let outcome = tokio::spawn(async move { job.run(&p).await }).await;
    assert!(outcome.unwrap_err().is_panic());
    assert_eq!(counters.initialize.load(Ordering::SeqCst), 1);
    wait_for(&counters.terminate, 1).await;
}
