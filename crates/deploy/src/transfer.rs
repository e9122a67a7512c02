//! Sequential file upload.

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::error::DeployError;
use crate::logger::DeployLogger;
use crate::remote_dir::RemoteDirectoryEnsurer;
use crate::session::RemoteSession;
use crate::types::{DeployEvent, FilePathPair};

/// Uploads `pairs` one after another.
///
/// The remote parent directory of each file is ensured first. The first
/// failure stops the loop; files already uploaded stay on the host.
pub async fn transfer_all<S>(
    session: &S,
    pairs: &[FilePathPair],
    logger: &DeployLogger,
    events: Option<&UnboundedSender<DeployEvent>>,
) -> Result<(), DeployError>
where
    S: RemoteSession + ?Sized,
{
    let mut dirs = RemoteDirectoryEnsurer::new();

    for pair in pairs {
        logger.log(&format!("Copying {}", pair.local.display()));

        dirs.ensure(session, pair.remote_dir()).await?;
        let bytes = session.upload(&pair.local, &pair.remote).await?;

        debug!(local = %pair.local.display(), remote = %pair.remote, bytes, "file uploaded");
        logger.log(&format!("File copied to: {}", pair.remote));

        if let Some(tx) = events {
            let _ = tx.send(DeployEvent::FileCopied {
                local: pair.local.clone(),
                remote: pair.remote.clone(),
            });
        }
    }

    Ok(())
}
