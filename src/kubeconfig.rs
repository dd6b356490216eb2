//! Kubeconfig persistence
//!
//! The provider streams kubeconfig content; this module drains the stream
//! to a local file chunk by chunk, never buffering the whole document in
//! memory. A stream or write failure aborts persistence with the error;
//! the partially-written file is left for the caller to inspect or remove.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::client::KubeconfigStream;
use crate::Result;

/// Where the kubeconfig landed and how big it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigOutcome {
    /// File the kubeconfig was written to
    pub path: PathBuf,
    /// Total bytes written
    pub bytes_written: u64,
}

/// Drain a kubeconfig stream into the file at `path`, creating or
/// truncating it.
pub async fn write_kubeconfig(
    mut stream: KubeconfigStream,
    path: &Path,
) -> Result<KubeconfigOutcome> {
    let mut file = File::create(path).await?;
    let mut bytes_written = 0u64;

    // Flush before propagating a stream error so chunks that arrived
    // earlier are on disk, not stuck in the file's write buffer
    let drained = drain(&mut stream, &mut file, &mut bytes_written).await;
    let flushed = file.flush().await;
    drained?;
    flushed?;

    info!(path = %path.display(), bytes = bytes_written, "kubeconfig written");
    Ok(KubeconfigOutcome {
        path: path.to_path_buf(),
        bytes_written,
    })
}

async fn drain(
    stream: &mut KubeconfigStream,
    file: &mut File,
    bytes_written: &mut u64,
) -> Result<()> {
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        *bytes_written += chunk.len() as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use bytes::Bytes;
    use futures::stream;

    fn chunked(parts: Vec<Result<Bytes>>) -> KubeconfigStream {
        stream::iter(parts).boxed()
    }

    #[tokio::test]
    async fn writes_all_chunks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubeconfig.yaml");

        let stream = chunked(vec![
            Ok(Bytes::from_static(b"apiVersion: v1\n")),
            Ok(Bytes::from_static(b"kind: Config\n")),
        ]);

        let outcome = write_kubeconfig(stream, &path).await.unwrap();
        assert_eq!(outcome.bytes_written, 28);
        assert_eq!(outcome.path, path);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "apiVersion: v1\nkind: Config\n");
    }

    #[tokio::test]
    async fn empty_stream_produces_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubeconfig.yaml");

        let outcome = write_kubeconfig(chunked(vec![]), &path).await.unwrap();
        assert_eq!(outcome.bytes_written, 0);
        assert!(std::fs::read(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_error_aborts_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubeconfig.yaml");

        let stream = chunked(vec![
            Ok(Bytes::from_static(b"apiVersion: v1\n")),
            Err(Error::provider("createKubeconfig", 502, "upstream reset")),
        ]);

        let err = write_kubeconfig(stream, &path).await.unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));

        // Whatever arrived before the failure is on disk for inspection
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "apiVersion: v1\n");
    }

    #[tokio::test]
    async fn unwritable_path_is_an_io_error() {
        let err = write_kubeconfig(
            chunked(vec![Ok(Bytes::from_static(b"x"))]),
            Path::new("/nonexistent-dir/kubeconfig.yaml"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
