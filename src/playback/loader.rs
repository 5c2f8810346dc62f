//! Background loading: HTTP fetches and decoding off the frame loop.
//!
//! The controller hands jobs to a single worker thread and collects results
//! with `try_recv` once per tick. Every job carries a request id so the
//! controller can drop results it no longer wants.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::track::{parse_manifest, Track};
use crate::audio::{AudioSource, DecodedAudio};
use crate::error::{Result, VisualizerError};
use crate::params::PlaybackParams;

const USER_AGENT: &str = concat!("spectrascape/", env!("CARGO_PKG_VERSION"));

/// Source of remote bytes
pub trait Fetcher: Send + Sync {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;

    fn get_text(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url)?;
        String::from_utf8(bytes).map_err(|e| VisualizerError::network(url, e))
    }
}

/// Shared HTTP client with the configured timeouts
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(params: &PlaybackParams) -> Result<Self> {
        let inner = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(params.connect_timeout_secs))
            .timeout(Duration::from_secs(params.request_timeout_secs))
            .build()
            .map_err(|e| VisualizerError::network("<client>", e))?;
        Ok(Self { inner })
    }
}

impl Fetcher for HttpClient {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .inner
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| VisualizerError::network(url, e))?;
        let bytes = resp.bytes().map_err(|e| VisualizerError::network(url, e))?;
        Ok(bytes.to_vec())
    }
}

/// Where a track's audio comes from
#[derive(Debug, Clone)]
pub enum TrackOrigin {
    File(PathBuf),
    Url { name: String, url: String },
}

impl TrackOrigin {
    /// `None` for tracks that cannot be loaded as audio
    pub fn of(track: &Track) -> Option<Self> {
        match track {
            Track::LocalFile { path } => Some(Self::File(path.clone())),
            Track::Remote { name, url } => Some(Self::Url {
                name: name.clone(),
                url: url.clone(),
            }),
            Track::ExternalVideo { .. } => None,
        }
    }
}

#[derive(Debug)]
enum Job {
    Manifest { request: u64, url: String },
    Track { request: u64, origin: TrackOrigin },
}

/// Finished work, tagged with the request that asked for it
#[derive(Debug)]
pub enum Loaded {
    Manifest {
        request: u64,
        url: String,
        result: Result<Vec<Track>>,
    },
    Track {
        request: u64,
        source_name: String,
        result: Result<Arc<DecodedAudio>>,
    },
}

pub struct LoadWorker {
    jobs: Option<Sender<Job>>,
    results: Receiver<Loaded>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LoadWorker {
    pub fn spawn(fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let handle = thread::Builder::new()
            .name("spectrascape-loader".to_string())
            .spawn(move || {
                for job in job_rx {
                    let loaded = run_job(fetcher.as_ref(), job);
                    if result_tx.send(loaded).is_err() {
                        break;
                    }
                }
                debug!("Loader thread exiting");
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    pub fn fetch_manifest(&self, request: u64, url: String) {
        self.submit(Job::Manifest { request, url });
    }

    pub fn load_track(&self, request: u64, origin: TrackOrigin) {
        self.submit(Job::Track { request, origin });
    }

    fn submit(&self, job: Job) {
        if let Some(jobs) = &self.jobs {
            if jobs.send(job).is_err() {
                warn!("Loader thread is gone; job dropped");
            }
        }
    }

    /// Next finished job, if any (never blocks)
    pub fn try_next(&self) -> Option<Loaded> {
        match self.results.try_recv() {
            Ok(loaded) => Some(loaded),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for LoadWorker {
    fn drop(&mut self) {
        // closing the job channel ends the worker loop
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                // a fetch is in flight; its result send fails once we are gone
                debug!("Detaching busy loader thread");
            }
        }
    }
}

fn run_job(fetcher: &dyn Fetcher, job: Job) -> Loaded {
    match job {
        Job::Manifest { request, url } => {
            debug!("Fetching manifest {}", url);
            let result = fetcher
                .get_text(&url)
                .and_then(|text| parse_manifest(&text, Some(&url)));
            Loaded::Manifest {
                request,
                url,
                result,
            }
        }
        Job::Track { request, origin } => {
            let (source_name, result) = match origin {
                TrackOrigin::File(path) => {
                    let source = AudioSource::File(path);
                    (source.name(), source.decode().map(Arc::new))
                }
                TrackOrigin::Url { name, url } => {
                    debug!("Fetching track {}", url);
                    let result = fetcher.get_bytes(&url).and_then(|bytes| {
                        AudioSource::memory(file_name_hint(&name, &url), bytes)
                            .decode()
                            .map(Arc::new)
                    });
                    (name, result)
                }
            };
            Loaded::Track {
                request,
                source_name,
                result,
            }
        }
    }
}

/// Name for the decoder hint: the URL's last path segment carries the extension
fn file_name_hint(name: &str, url: &str) -> String {
    url.rsplit('/')
        .next()
        .and_then(|last| last.split(['?', '#']).next())
        .filter(|last| last.contains('.'))
        .map(str::to_string)
        .unwrap_or_else(|| name.to_string())
}
