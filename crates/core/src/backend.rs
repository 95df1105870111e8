//! The contract between the converter and the external applications that
//! actually render documents to PDF.
//!
//! A backend wraps one running application instance for one
//! [`DocumentFamily`]. The converter only sequences calls into it:
//! open the source read-only and hidden, save it as PDF with the family's
//! format code, close it. Backends are started by a [`BackendFactory`] and
//! are owned by the [`BackendPool`](crate::pool::BackendPool) until they are
//! quit or terminated.

use crate::error::Result;
use crate::task::DocumentFamily;
use std::path::Path;

/// One running editing application used as an automation target.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Handle to a document opened by this backend.
    type Document;

    /// Cosmetic "run hidden" setting. Callers ignore failures.
    fn hide(&self) -> Result<()> {
        Ok(())
    }

    /// Open `path` read-only without showing a window.
    async fn open(&self, path: &Path) -> Result<Self::Document>;

    /// Save `document` as PDF at `output_path` using `format_code`.
    async fn save_as_pdf(
        &self,
        document: &Self::Document,
        output_path: &Path,
        format_code: i32,
    ) -> Result<()>;

    /// Close a document previously returned by [`Backend::open`].
    async fn close(&self, document: Self::Document) -> Result<()>;

    /// Orderly shutdown.
    async fn quit(self) -> Result<()>;

    /// Forced shutdown after a hung call. Must not fail.
    async fn terminate(self);
}

/// Starts backend instances.
#[allow(async_fn_in_trait)]
pub trait BackendFactory {
    type Backend: Backend;

    /// Start one instance for `family`.
    async fn start(&self, family: DocumentFamily) -> Result<Self::Backend>;
}
