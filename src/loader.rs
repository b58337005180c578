// src/loader.rs
//
// Makes sure the viewer library global exists before anything is drawn.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::page::resolve_url;
use log::{debug, warn};
use reqwest::Url;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptState {
    Loading,
    Complete,
    Failed,
}

/// A script reference already present in the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRef {
    pub id: usize,
    pub src: String,
    pub state: ScriptState,
}

/// Script-loader capability plus the readiness check for the library global.
#[allow(async_fn_in_trait)]
pub trait ScriptHost {
    fn library_present(&self) -> bool;
    fn base_url(&self) -> Option<Url>;
    fn scripts(&self) -> Vec<ScriptRef>;

    /// Resolves once a pending reference fires its load or error signal.
    async fn wait_for(&self, script: &ScriptRef) -> std::result::Result<(), String>;

    /// Appends one new reference to `src` and waits for its outcome.
    async fn append(&self, src: &str) -> std::result::Result<(), String>;
}

pub struct LibraryLoader<H> {
    host: H,
    sources: Vec<String>,
    timeout: Duration,
    poll_interval: Duration,
}

impl<H: ScriptHost> LibraryLoader<H> {
    pub fn new(host: H, config: &Config) -> Self {
        Self {
            host,
            sources: config.library_sources.clone(),
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub async fn ensure_ready_default(&self) -> Result<()> {
        self.ensure_ready(self.timeout, self.poll_interval).await
    }

    /// Resolves once the library global exists, trying every source first if
    /// it does not. Fails with [`Error::LibraryTimeout`] when `timeout`
    /// (counted from this call) passes without it appearing.
    pub async fn ensure_ready(&self, timeout: Duration, poll_interval: Duration) -> Result<()> {
        let start = Instant::now();

        if !self.host.library_present() {
            match self.load_first_available().await {
                Some(src) => debug!("3Dmol source loaded: {}", src),
                None => warn!("All 3Dmol sources failed, waiting for the library anyway"),
            }
        }

        loop {
            if self.host.library_present() {
                return Ok(());
            }
            let waited = start.elapsed();
            if waited > timeout {
                return Err(Error::LibraryTimeout { waited });
            }
            sleep(poll_interval).await;
        }
    }

    async fn load_first_available(&self) -> Option<&str> {
        for src in &self.sources {
            match self.load_script(src).await {
                Ok(()) => return Some(src.as_str()),
                Err(e) => warn!("{}", e),
            }
        }
        None
    }

    /// Loads `src` unless a matching reference already exists, in which case
    /// that one is awaited instead.
    pub async fn load_script(&self, src: &str) -> Result<()> {
        let resolved = resolve_url(src, self.host.base_url().as_ref());

        let existing = self
            .host
            .scripts()
            .into_iter()
            .find(|s| s.src == resolved || s.src == src || s.src.ends_with(src));

        let outcome = match existing {
            Some(script) => match script.state {
                ScriptState::Complete => Ok(()),
                ScriptState::Loading => self.host.wait_for(&script).await,
                ScriptState::Failed => Err("previous load failed".to_string()),
            },
            None => {
                debug!("injecting script {}", resolved);
                self.host.append(&resolved).await
            }
        };

        outcome.map_err(|reason| Error::ResourceLoad { src: src.to_string(), reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;

    /// Script host whose library appears once any of `working` loads.
    struct FakeHost {
        present: Cell<bool>,
        working: HashSet<String>,
        scripts: RefCell<Vec<ScriptRef>>,
        appended: RefCell<Vec<String>>,
        waited: Cell<usize>,
    }

    impl FakeHost {
        fn new(working: &[&str]) -> Self {
            Self {
                present: Cell::new(false),
                working: working.iter().map(|s| s.to_string()).collect(),
                scripts: RefCell::new(Vec::new()),
                appended: RefCell::new(Vec::new()),
                waited: Cell::new(0),
            }
        }
    }

    impl ScriptHost for FakeHost {
        fn library_present(&self) -> bool {
            self.present.get()
        }

        fn base_url(&self) -> Option<Url> {
            Url::parse("https://docs.example.org/guide/page/").ok()
        }

        fn scripts(&self) -> Vec<ScriptRef> {
            self.scripts.borrow().clone()
        }

        async fn wait_for(&self, _script: &ScriptRef) -> std::result::Result<(), String> {
            self.waited.set(self.waited.get() + 1);
            self.present.set(true);
            Ok(())
        }

        async fn append(&self, src: &str) -> std::result::Result<(), String> {
            self.appended.borrow_mut().push(src.to_string());
            let id = self.scripts.borrow().len();
            let ok = self.working.contains(src);
            self.scripts.borrow_mut().push(ScriptRef {
                id,
                src: src.to_string(),
                state: if ok { ScriptState::Complete } else { ScriptState::Failed },
            });
            if ok {
                self.present.set(true);
                Ok(())
            } else {
                Err("network error".to_string())
            }
        }
    }

    fn loader(host: FakeHost) -> LibraryLoader<FakeHost> {
        LibraryLoader::new(host, &Config::default())
    }

    #[tokio::test]
    async fn test_present_library_touches_nothing() {
        let host = FakeHost::new(&[]);
        host.present.set(true);
        let loader = loader(host);

        loader.ensure_ready_default().await.unwrap();
        assert!(loader.host().appended.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_local_copy_is_tried_first() {
        let loader = loader(FakeHost::new(&["https://docs.example.org/js/3Dmol-min.js"]));

        loader.ensure_ready_default().await.unwrap();
        assert_eq!(
            *loader.host().appended.borrow(),
            vec!["https://docs.example.org/js/3Dmol-min.js"]
        );
    }

    #[tokio::test]
    async fn test_falls_through_to_second_remote() {
        let loader = loader(FakeHost::new(&["https://unpkg.com/3dmol/build/3Dmol-min.js"]));

        loader.ensure_ready_default().await.unwrap();
        assert_eq!(
            *loader.host().appended.borrow(),
            vec![
                "https://docs.example.org/js/3Dmol-min.js",
                "https://3dmol.org/build/3Dmol-min.js",
                "https://unpkg.com/3dmol/build/3Dmol-min.js",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_nothing_loads() {
        let loader = loader(FakeHost::new(&[]));

        let err = loader
            .ensure_ready(Duration::from_millis(1000), Duration::from_millis(200))
            .await
            .unwrap_err();
        match err {
            Error::LibraryTimeout { waited } => assert!(waited > Duration::from_millis(1000)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(loader.host().appended.borrow().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_polling_after_every_source_fails() {
        let loader = loader(FakeHost::new(&[]));

        let appear_later = async {
            sleep(Duration::from_millis(700)).await;
            loader.host().present.set(true);
        };
        let (ready, ()) = tokio::join!(
            loader.ensure_ready(Duration::from_millis(2000), Duration::from_millis(200)),
            appear_later
        );

        ready.unwrap();
        assert_eq!(loader.host().appended.borrow().len(), 3);
        assert!(loader.host().scripts().iter().all(|s| s.state == ScriptState::Failed));
    }

    #[tokio::test]
    async fn test_existing_reference_is_reused() {
        let host = FakeHost::new(&[]);
        host.scripts.borrow_mut().push(ScriptRef {
            id: 0,
            src: "https://docs.example.org/js/3Dmol-min.js".to_string(),
            state: ScriptState::Complete,
        });
        let loader = loader(host);

        loader.load_script("/js/3Dmol-min.js").await.unwrap();
        loader.load_script("https://docs.example.org/js/3Dmol-min.js").await.unwrap();
        assert!(loader.host().appended.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_suffix_match_waits_for_pending_reference() {
        let host = FakeHost::new(&[]);
        host.scripts.borrow_mut().push(ScriptRef {
            id: 0,
            src: "https://cdn.example.net/vendor/3Dmol-min.js".to_string(),
            state: ScriptState::Loading,
        });
        let loader = loader(host);

        loader.load_script("3Dmol-min.js").await.unwrap();
        assert_eq!(loader.host().waited.get(), 1);
        assert!(loader.host().appended.borrow().is_empty());
        assert!(loader.host().library_present());
    }

    #[tokio::test]
    async fn test_failed_reference_is_a_load_error() {
        let host = FakeHost::new(&[]);
        host.scripts.borrow_mut().push(ScriptRef {
            id: 0,
            src: "https://3dmol.org/build/3Dmol-min.js".to_string(),
            state: ScriptState::Failed,
        });
        let loader = loader(host);

        let err = loader.load_script("https://3dmol.org/build/3Dmol-min.js").await.unwrap_err();
        assert!(matches!(err, Error::ResourceLoad { .. }));
    }
}
