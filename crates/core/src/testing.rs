//! Recording backend used by unit tests.

use crate::backend::{Backend, BackendFactory};
use crate::error::{ConversionError, Result};
use crate::task::DocumentFamily;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpyEvent {
    Start(DocumentFamily),
    Open(String),
    Save(String, i32),
    Close(String),
    Quit(DocumentFamily),
    Terminate(DocumentFamily),
}

/// Factory whose backends record every call and fail on demand.
#[derive(Debug, Clone, Default)]
pub struct SpyFactory {
    pub events: Arc<Mutex<Vec<SpyEvent>>>,
    pub fail_start: Option<DocumentFamily>,
    pub fail_hide: bool,
    pub fail_quit: Option<DocumentFamily>,
    pub fail_open: Option<String>,
    pub fail_save: Option<String>,
    pub fail_close: Option<String>,
    pub hang_on: Option<String>,
}

impl SpyFactory {
    fn record(&self, event: SpyEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<SpyEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&SpyEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn quits(&self, family: DocumentFamily) -> usize {
        self.count(|e| *e == SpyEvent::Quit(family))
    }
}

impl BackendFactory for SpyFactory {
    type Backend = SpyBackend;

    async fn start(&self, family: DocumentFamily) -> Result<SpyBackend> {
        if self.fail_start == Some(family) {
            return Err(ConversionError::BackendStartFailed {
                family,
                message: "spy refused to start".to_string(),
            });
        }
        self.record(SpyEvent::Start(family));
        Ok(SpyBackend {
            family,
            spy: self.clone(),
        })
    }
}

pub struct SpyBackend {
    family: DocumentFamily,
    spy: SpyFactory,
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Backend for SpyBackend {
    type Document = (String, PathBuf);

    fn hide(&self) -> Result<()> {
        if self.spy.fail_hide {
            return Err(ConversionError::InvalidConfig("no window state".to_string()));
        }
        Ok(())
    }

    async fn open(&self, path: &Path) -> Result<Self::Document> {
        let name = name_of(path);
        self.spy.record(SpyEvent::Open(name.clone()));
        if self.spy.fail_open.as_deref() == Some(name.as_str()) {
            return Err(ConversionError::ConversionFailed {
                path: path.to_path_buf(),
                message: "spy open failure".to_string(),
            });
        }
        Ok((name, path.to_path_buf()))
    }

    async fn save_as_pdf(
        &self,
        document: &Self::Document,
        output_path: &Path,
        format_code: i32,
    ) -> Result<()> {
        let (name, source) = document;
        self.spy.record(SpyEvent::Save(name.clone(), format_code));
        if self.spy.hang_on.as_deref() == Some(name.as_str()) {
            std::future::pending::<()>().await;
        }
        if self.spy.fail_save.as_deref() == Some(name.as_str()) {
            return Err(ConversionError::ConversionFailed {
                path: source.clone(),
                message: "spy save failure".to_string(),
            });
        }
        tokio::fs::write(output_path, b"%PDF-1.4 spy").await?;
        Ok(())
    }

    async fn close(&self, document: Self::Document) -> Result<()> {
        let (name, source) = document;
        self.spy.record(SpyEvent::Close(name.clone()));
        if self.spy.fail_close.as_deref() == Some(name.as_str()) {
            return Err(ConversionError::ConversionFailed {
                path: source,
                message: "spy close failure".to_string(),
            });
        }
        Ok(())
    }

    async fn quit(self) -> Result<()> {
        self.spy.record(SpyEvent::Quit(self.family));
        if self.spy.fail_quit == Some(self.family) {
            return Err(ConversionError::BackendShutdownFailed {
                family: self.family,
                message: "spy quit failure".to_string(),
            });
        }
        Ok(())
    }

    async fn terminate(self) {
        self.spy.record(SpyEvent::Terminate(self.family));
    }
}
