//! LibreOffice-backed implementation of [`Backend`].
//!
//! Each backend owns a private user profile, which LibreOffice needs in order
//! to run several instances side by side, and a staging directory where
//! `soffice --convert-to` writes before the PDF is moved to its final path.

use crate::backend::{Backend, BackendFactory};
use crate::config::BackendConfig;
use crate::error::{ConversionError, Result};
use crate::executor::staging_file;
use crate::task::{DocumentFamily, PRESENTATION_PDF_FORMAT, WORD_PDF_FORMAT};
use async_process::Command;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Profile settings that keep first-run dialogs and tips from appearing.
const QUIET_PROFILE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<oor:items xmlns:oor="http://openoffice.org/2001/registry" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<item oor:path="/org.openoffice.Setup/Office"><prop oor:name="ooSetupInstCompleted" oor:op="fuse"><value>true</value></prop></item>
<item oor:path="/org.openoffice.Office.Common/Misc"><prop oor:name="FirstRun" oor:op="fuse"><value>false</value></prop></item>
<item oor:path="/org.openoffice.Office.Common/Misc"><prop oor:name="ShowTipOfTheDay" oor:op="fuse"><value>false</value></prop></item>
</oor:items>
"#;

/// Map an application PDF save code to the LibreOffice export filter.
pub fn export_filter(format_code: i32) -> Option<&'static str> {
    match format_code {
        WORD_PDF_FORMAT => Some("pdf:writer_pdf_Export"),
        PRESENTATION_PDF_FORMAT => Some("pdf:impress_pdf_Export"),
        _ => None,
    }
}

/// Starts [`LibreOfficeBackend`]s.
#[derive(Debug, Clone)]
pub struct LibreOfficeFactory {
    config: BackendConfig,
}

impl LibreOfficeFactory {
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl BackendFactory for LibreOfficeFactory {
    type Backend = LibreOfficeBackend;

    async fn start(&self, family: DocumentFamily) -> Result<LibreOfficeBackend> {
        LibreOfficeBackend::start(family, &self.config)
    }
}

/// A document staged for conversion.
#[derive(Debug)]
pub struct OpenDocument {
    source: PathBuf,
    /// Per-document output directory handed to `--outdir`.
    staging: PathBuf,
}

/// One LibreOffice instance dedicated to a document family.
#[derive(Debug)]
pub struct LibreOfficeBackend {
    family: DocumentFamily,
    soffice_path: PathBuf,
    /// Unique user profile directory (required for parallel instances).
    profile_dir: TempDir,
    staging_dir: TempDir,
}

impl LibreOfficeBackend {
    /// Locate soffice and prepare the instance's private directories.
    pub fn start(family: DocumentFamily, config: &BackendConfig) -> Result<Self> {
        let soffice_path = Self::find_soffice(config)?;

        let slug = match family {
            DocumentFamily::Presentation => "presentation",
            DocumentFamily::WordProcessor => "word",
        };
        let profile_dir = make_temp_dir(&format!("lo-profile-{}-", slug), config)
            .map_err(|e| ConversionError::BackendStartFailed {
                family,
                message: format!("cannot create profile directory: {}", e),
            })?;
        let staging_dir = make_temp_dir("office-to-pdf-staging-", config).map_err(|e| {
            ConversionError::BackendStartFailed {
                family,
                message: format!("cannot create staging directory: {}", e),
            }
        })?;

        debug!(
            "{} backend profile at {:?}, staging at {:?}",
            family,
            profile_dir.path(),
            staging_dir.path()
        );

        Ok(Self {
            family,
            soffice_path,
            profile_dir,
            staging_dir,
        })
    }

    /// Find the soffice binary.
    pub fn find_soffice(config: &BackendConfig) -> Result<PathBuf> {
        // Check if explicit path is provided
        if let Some(ref path) = config.soffice_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(ConversionError::LibreOfficeNotFound);
        }

        let candidates = [
            // macOS
            "/Applications/LibreOffice.app/Contents/MacOS/soffice",
            // Linux
            "/usr/bin/soffice",
            "/usr/lib/libreoffice/program/soffice",
            "/opt/libreoffice/program/soffice",
            // Snap (Ubuntu)
            "/snap/bin/libreoffice.soffice",
            // Windows
            r"C:\Program Files\LibreOffice\program\soffice.exe",
        ];

        for candidate in candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(path);
            }
        }

        which::which("soffice")
            .or_else(|_| which::which("libreoffice"))
            .map_err(|_| ConversionError::LibreOfficeNotFound)
    }

    pub fn profile_path(&self) -> &Path {
        self.profile_dir.path()
    }
}

impl Backend for LibreOfficeBackend {
    type Document = OpenDocument;

    fn hide(&self) -> Result<()> {
        let user_dir = self.profile_dir.path().join("user");
        std::fs::create_dir_all(&user_dir)?;
        std::fs::write(user_dir.join("registrymodifications.xcu"), QUIET_PROFILE)?;
        Ok(())
    }

    async fn open(&self, path: &Path) -> Result<OpenDocument> {
        let file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConversionError::InputNotFound(path.to_path_buf()),
            _ => ConversionError::Io(e),
        })?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ConversionError::InputNotFound(path.to_path_buf()));
        }

        let staging = self.staging_dir.path().join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| ConversionError::OutputDirError {
                path: staging.clone(),
                message: e.to_string(),
            })?;

        Ok(OpenDocument {
            source: path.to_path_buf(),
            staging,
        })
    }

    async fn save_as_pdf(
        &self,
        document: &OpenDocument,
        output_path: &Path,
        format_code: i32,
    ) -> Result<()> {
        let filter =
            export_filter(format_code).ok_or(ConversionError::UnsupportedFormatCode(format_code))?;
        let start = Instant::now();
        let input_path = &document.source;

        let mut cmd = Command::new(&self.soffice_path);
        cmd.args([
            "--headless",
            "--invisible",
            "--nologo",
            "--nofirststartwizard",
            "--norestore",
        ]);
        cmd.arg(format!(
            "-env:UserInstallation=file://{}",
            self.profile_dir.path().display()
        ));
        cmd.args(["--convert-to", filter, "--outdir"]);
        cmd.arg(&document.staging);
        cmd.arg(input_path);
        // A timed-out task drops this future; the child must not outlive it.
        cmd.kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .map_err(|e| ConversionError::ConversionFailed {
                path: input_path.clone(),
                message: format!("failed to run soffice: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                "LibreOffice conversion failed for {:?}: {}",
                input_path, stderr
            );
            return Err(ConversionError::ConversionFailed {
                path: input_path.clone(),
                message: stderr.trim().to_string(),
            });
        }

        let produced =
            find_pdf(&document.staging, input_path).ok_or_else(|| ConversionError::ConversionFailed {
                path: input_path.clone(),
                message: "PDF output file not found".to_string(),
            })?;

        move_file(&produced, output_path)
            .await
            .map_err(|e| ConversionError::ConversionFailed {
                path: input_path.clone(),
                message: format!("cannot write {:?}: {}", output_path, e),
            })?;

        debug!(
            "{} backend converted {:?} in {:?}",
            self.family,
            input_path.file_name(),
            start.elapsed()
        );
        Ok(())
    }

    async fn close(&self, document: OpenDocument) -> Result<()> {
        match tokio::fs::remove_dir_all(&document.staging).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn quit(self) -> Result<()> {
        let family = self.family;
        let profile = self.profile_dir.close();
        let staging = self.staging_dir.close();
        profile
            .and(staging)
            .map_err(|e| ConversionError::BackendShutdownFailed {
                family,
                message: e.to_string(),
            })?;
        info!("{} backend stopped", family);
        Ok(())
    }

    async fn terminate(self) {
        warn!("Terminating {} backend", self.family);
        // Dropping the temp dirs removes them; any running soffice child was
        // killed when its conversion future was dropped.
        drop(self);
    }
}

fn make_temp_dir(prefix: &str, config: &BackendConfig) -> std::io::Result<TempDir> {
    match config.temp_dir {
        Some(ref dir) => tempfile::Builder::new().prefix(prefix).tempdir_in(dir),
        None => TempDir::with_prefix(prefix),
    }
}

/// Locate the PDF soffice wrote into `staging` for `source`.
fn find_pdf(staging: &Path, source: &Path) -> Option<PathBuf> {
    let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let expected = staging.join(format!("{}.pdf", stem));
    if expected.exists() {
        return Some(expected);
    }

    // LibreOffice might have created a file with slightly different name
    std::fs::read_dir(staging).ok().and_then(|entries| {
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
            })
    })
}

async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    // Staging may live on another filesystem.
    copy_staged(from, to).await?;
    tokio::fs::remove_file(from).await
}

/// Copy `from` to `to` through a temporary file beside `to`.
///
/// The copy is chunked, so dropping the future stops it; the temporary file
/// is removed with it and `to` never holds a partial PDF.
async fn copy_staged(from: &Path, to: &Path) -> std::io::Result<()> {
    let staged = staging_file(to)?;
    let mut reader = tokio::fs::File::open(from).await?;
    let mut writer = tokio::fs::File::from_std(staged.as_file().try_clone()?);
    tokio::io::copy(&mut reader, &mut writer).await?;
    writer.flush().await?;
    drop(writer);
    staged.persist(to).map_err(|e| e.error)?;
    Ok(())
}
