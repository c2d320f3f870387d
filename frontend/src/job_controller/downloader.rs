//! Result retrieval.
//!
//! Two strategies are offered for a finished job:
//!
//! - **direct**: point the browser at the download URL and let it handle the
//!   transfer natively;
//! - **streamed**: fetch the artifact into memory, expose it through an object
//!   URL, click a temporary anchor to save it, then revoke the object URL.
//!
//! The object URL is owned by an [`ObjectUrlGuard`] which revokes it when
//! dropped, so it is released exactly once whichever way the save goes.

use std::rc::Rc;
use std::sync::LazyLock;

use async_trait::async_trait;
use common::jobs::{DownloadMode, JobId};
use log::{info, warn};
use percent_encoding::percent_decode_str;
use regex::Regex;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlAnchorElement, Url};

use super::client::{Artifact, JobClient};
use super::error::JobError;
use super::timer::Timer;

const FALLBACK_EXTENSION: &str = "tgz";
const DEFAULT_MIME: &str = "application/gzip";

static EXTENDED_FILENAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)filename\*\s*=\s*[^']*'[^']*'([^;]+)").ok());
static QUOTED_FILENAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)filename\s*=\s*"([^"]*)""#).ok());
static BARE_FILENAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)filename\s*=\s*([^;\s]+)").ok());

#[async_trait(?Send)]
pub trait ArtifactSource {
    fn result_url(&self, id: &JobId, mode: DownloadMode) -> String;

    async fn fetch_artifact(&self, id: &JobId, mode: DownloadMode) -> Result<Artifact, JobError>;
}

#[async_trait(?Send)]
impl<T: Timer> ArtifactSource for JobClient<T> {
    fn result_url(&self, id: &JobId, mode: DownloadMode) -> String {
        JobClient::<T>::result_url(self, id, mode)
    }

    async fn fetch_artifact(&self, id: &JobId, mode: DownloadMode) -> Result<Artifact, JobError> {
        JobClient::<T>::fetch_artifact(self, id, mode).await
    }
}

/// Browser side effects needed to hand a file to the user.
pub trait SaveTarget {
    fn navigate(&self, url: &str) -> Result<(), JobError>;

    fn create_object_url(&self, artifact: &Artifact) -> Result<String, JobError>;

    /// Triggers the browser's save of `object_url` under `filename`.
    fn save(&self, object_url: &str, filename: &str) -> Result<(), JobError>;

    fn revoke_object_url(&self, object_url: &str);
}

/// Exclusive owner of an object URL. Revokes it on drop.
struct ObjectUrlGuard<'a, T: SaveTarget> {
    target: &'a T,
    url: String,
}

impl<'a, T: SaveTarget> ObjectUrlGuard<'a, T> {
    fn create(target: &'a T, artifact: &Artifact) -> Result<Self, JobError> {
        let url = target.create_object_url(artifact)?;
        Ok(Self { target, url })
    }
}

impl<T: SaveTarget> Drop for ObjectUrlGuard<'_, T> {
    fn drop(&mut self) {
        self.target.revoke_object_url(&self.url);
    }
}

pub struct ResultDownloader<A, T> {
    source: Rc<A>,
    target: T,
}

impl<A: ArtifactSource, T: SaveTarget> ResultDownloader<A, T> {
    pub fn new(source: Rc<A>, target: T) -> Self {
        Self { source, target }
    }

    pub fn download_direct(&self, id: &JobId, mode: DownloadMode) -> Result<(), JobError> {
        let url = self.source.result_url(id, mode);
        info!("downloading {} artifact of job {} via {}", mode.as_str(), id, url);
        self.target.navigate(&url)
    }

    /// Fetches, saves and releases the artifact. Returns the filename used.
    pub async fn download_streamed(&self, id: &JobId, mode: DownloadMode) -> Result<String, JobError> {
        let artifact = self
            .source
            .fetch_artifact(id, mode)
            .await
            .map_err(into_download_error)?;

        let filename = filename_from_disposition(artifact.content_disposition.as_deref())
            .unwrap_or_else(|| format!("{}.{}", id, FALLBACK_EXTENSION));

        let object_url = ObjectUrlGuard::create(&self.target, &artifact)?;
        self.target.save(&object_url.url, &filename)?;

        info!("saved {} ({} bytes) for job {}", filename, artifact.bytes.len(), id);
        Ok(filename)
    }
}

fn into_download_error(err: JobError) -> JobError {
    match err {
        JobError::Download(_) => err,
        other => JobError::Download(other.to_string()),
    }
}

/// Extracts the suggested filename from a `Content-Disposition` header.
///
/// Understands `filename*=UTF-8''...` (preferred when present), quoted and
/// bare `filename=` forms. Directory components are stripped.
pub fn filename_from_disposition(header: Option<&str>) -> Option<String> {
    let header = header?;

    let raw = if let Some(caps) = EXTENDED_FILENAME.as_ref()?.captures(header) {
        percent_decode_str(caps.get(1)?.as_str().trim())
            .decode_utf8()
            .ok()?
            .into_owned()
    } else if let Some(caps) = QUOTED_FILENAME.as_ref()?.captures(header) {
        caps.get(1)?.as_str().to_string()
    } else {
        BARE_FILENAME.as_ref()?.captures(header)?.get(1)?.as_str().to_string()
    };

    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

/// Real browser implementation of [`SaveTarget`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSaveTarget;

impl SaveTarget for BrowserSaveTarget {
    fn navigate(&self, url: &str) -> Result<(), JobError> {
        let window = web_sys::window().ok_or_else(|| JobError::Download("no window".into()))?;
        window.location().set_href(url).map_err(js_download_error)
    }

    fn create_object_url(&self, artifact: &Artifact) -> Result<String, JobError> {
        let mime = artifact.content_type.as_deref().unwrap_or(DEFAULT_MIME);
        let blob = gloo_file::Blob::new_with_options(artifact.bytes.as_slice(), Some(mime));
        let blob: web_sys::Blob = blob.into();
        Url::create_object_url_with_blob(&blob).map_err(js_download_error)
    }

    fn save(&self, object_url: &str, filename: &str) -> Result<(), JobError> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JobError::Download("no document".into()))?;
        let body = document
            .body()
            .ok_or_else(|| JobError::Download("no document body".into()))?;

        let anchor: HtmlAnchorElement = document
            .create_element("a")
            .map_err(js_download_error)?
            .dyn_into()
            .map_err(|_| JobError::Download("anchor element unavailable".into()))?;
        anchor.set_href(object_url);
        anchor.set_download(filename);

        body.append_child(&anchor).map_err(js_download_error)?;
        anchor.click();
        anchor.remove();
        Ok(())
    }

    fn revoke_object_url(&self, object_url: &str) {
        if let Err(err) = Url::revoke_object_url(object_url) {
            warn!("could not revoke {}: {:?}", object_url, err);
        }
    }
}

fn js_download_error(err: JsValue) -> JobError {
    JobError::Download(
        err.as_string()
            .unwrap_or_else(|| "browser API call failed".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use futures::executor::block_on;

    use super::*;

    struct FakeSource {
        artifact: Result<Artifact, JobError>,
    }

    impl FakeSource {
        fn serving(disposition: Option<&str>) -> Rc<Self> {
            Rc::new(FakeSource {
                artifact: Ok(Artifact {
                    bytes: vec![0x1f, 0x8b, 0x08, 0x00],
                    content_type: Some("application/gzip".into()),
                    content_disposition: disposition.map(str::to_string),
                }),
            })
        }
    }

    #[async_trait(?Send)]
    impl ArtifactSource for FakeSource {
        fn result_url(&self, id: &JobId, mode: DownloadMode) -> String {
            format!("/api/jobs/{}/download?mode={}", id, mode.as_str())
        }

        async fn fetch_artifact(&self, _id: &JobId, _mode: DownloadMode) -> Result<Artifact, JobError> {
            self.artifact.clone()
        }
    }

    #[derive(Default)]
    struct FakeTarget {
        fail_create: bool,
        fail_save: bool,
        created: Cell<usize>,
        saved: RefCell<Vec<(String, String)>>,
        revoked: RefCell<Vec<String>>,
        navigated: RefCell<Vec<String>>,
    }

    impl SaveTarget for FakeTarget {
        fn navigate(&self, url: &str) -> Result<(), JobError> {
            self.navigated.borrow_mut().push(url.to_string());
            Ok(())
        }

        fn create_object_url(&self, _artifact: &Artifact) -> Result<String, JobError> {
            if self.fail_create {
                return Err(JobError::Download("out of memory".into()));
            }
            self.created.set(self.created.get() + 1);
            Ok(format!("blob:local/{}", self.created.get()))
        }

        fn save(&self, object_url: &str, filename: &str) -> Result<(), JobError> {
            if self.fail_save {
                return Err(JobError::Download("anchor click blocked".into()));
            }
            self.saved
                .borrow_mut()
                .push((object_url.to_string(), filename.to_string()));
            Ok(())
        }

        fn revoke_object_url(&self, object_url: &str) {
            self.revoked.borrow_mut().push(object_url.to_string());
        }
    }

    fn id() -> JobId {
        JobId::from("9b1f0c2e")
    }

    #[test]
    fn streamed_download_uses_disposition_and_releases_once() {
        let downloader = ResultDownloader::new(
            FakeSource::serving(Some("attachment; filename=\"9b1f0c2e-lite.tgz\"")),
            FakeTarget::default(),
        );

        let filename = block_on(downloader.download_streamed(&id(), DownloadMode::Lite)).unwrap();

        assert_eq!(filename, "9b1f0c2e-lite.tgz");
        assert_eq!(
            *downloader.target.saved.borrow(),
            vec![("blob:local/1".to_string(), "9b1f0c2e-lite.tgz".to_string())]
        );
        assert_eq!(*downloader.target.revoked.borrow(), vec!["blob:local/1".to_string()]);
    }

    #[test]
    fn missing_or_unparsable_disposition_falls_back_and_still_releases() {
        for disposition in [None, Some("attachment"), Some("attachment; filename=\"\"")] {
            let downloader =
                ResultDownloader::new(FakeSource::serving(disposition), FakeTarget::default());

            let filename = block_on(downloader.download_streamed(&id(), DownloadMode::Full)).unwrap();

            assert_eq!(filename, "9b1f0c2e.tgz");
            assert_eq!(downloader.target.revoked.borrow().len(), 1);
        }
    }

    #[test]
    fn failed_save_still_releases_the_reference() {
        let target = FakeTarget {
            fail_save: true,
            ..FakeTarget::default()
        };
        let downloader = ResultDownloader::new(FakeSource::serving(None), target);

        let result = block_on(downloader.download_streamed(&id(), DownloadMode::Full));

        assert!(matches!(result, Err(JobError::Download(_))));
        assert_eq!(*downloader.target.revoked.borrow(), vec!["blob:local/1".to_string()]);
    }

    #[test]
    fn nothing_is_released_when_nothing_was_created() {
        let target = FakeTarget {
            fail_create: true,
            ..FakeTarget::default()
        };
        let downloader = ResultDownloader::new(FakeSource::serving(None), target);
        assert!(block_on(downloader.download_streamed(&id(), DownloadMode::Full)).is_err());
        assert!(downloader.target.revoked.borrow().is_empty());

        let source = Rc::new(FakeSource {
            artifact: Err(JobError::Transient("request timed out after 60000 ms".into())),
        });
        let downloader = ResultDownloader::new(source, FakeTarget::default());
        let result = block_on(downloader.download_streamed(&id(), DownloadMode::Full));
        assert!(matches!(result, Err(JobError::Download(_))));
        assert_eq!(downloader.target.created.get(), 0);
        assert!(downloader.target.revoked.borrow().is_empty());
    }

    #[test]
    fn direct_download_navigates_to_result_url() {
        let downloader = ResultDownloader::new(FakeSource::serving(None), FakeTarget::default());
        downloader.download_direct(&id(), DownloadMode::Lite).unwrap();
        assert_eq!(
            *downloader.target.navigated.borrow(),
            vec!["/api/jobs/9b1f0c2e/download?mode=lite".to_string()]
        );
    }

    #[test]
    fn disposition_variants() {
        assert_eq!(
            filename_from_disposition(Some("attachment; filename=out.tgz")),
            Some("out.tgz".to_string())
        );
        assert_eq!(
            filename_from_disposition(Some(
                "attachment; filename=\"fallback.tgz\"; filename*=UTF-8''my%20job.tgz"
            )),
            Some("my job.tgz".to_string())
        );
        assert_eq!(
            filename_from_disposition(Some("attachment; filename=\"../../etc/passwd\"")),
            Some("passwd".to_string())
        );
        assert_eq!(filename_from_disposition(Some("inline")), None);
        assert_eq!(filename_from_disposition(None), None);
    }

    #[test]
    fn extended_filenames_decode_utf8_and_trailing_escapes() {
        assert_eq!(
            filename_from_disposition(Some("attachment; filename*=UTF-8''caf%C3%A9%20run.tgz")),
            Some("café run.tgz".to_string())
        );
        assert_eq!(
            filename_from_disposition(Some("attachment; filename*=UTF-8''run.tg%7A")),
            Some("run.tgz".to_string())
        );
        assert_eq!(
            filename_from_disposition(Some("attachment; filename*=UTF-8''x%2Fresult%2Etgz")),
            Some("result.tgz".to_string())
        );
        assert_eq!(
            filename_from_disposition(Some("attachment; filename*=UTF-8''bad%FF.tgz")),
            None
        );
    }

    #[test]
    fn repeated_parsing_gives_the_same_answer() {
        let header = "attachment; filename=\"out.tgz\"";
        for _ in 0..3 {
            assert_eq!(filename_from_disposition(Some(header)), Some("out.tgz".to_string()));
        }
    }
}
