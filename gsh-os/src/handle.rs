//! Module that defines a strongly typed filesystem handle.

use derivative::Derivative;
use futures::future::Future;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use std::borrow::Cow;
use std::fmt;
use std::future::IntoFuture;
use std::pin::Pin;
use std::sync::Arc;

use crate::filesystem::FilesystemWorker;
use crate::platform::{
    FilesystemPlatform, OpenOptions, Platform, PlatformDirStreamType, PlatformHandleType,
    PlatformPath, PlatformPathType,
};
use crate::{DirectoryEntry, OpenMode};

/// Size of the buffer used by [`FileHandle::read_to_end`].
const READ_BLOCK_SIZE: usize = 64 * 1024;

/// [`Handle`] to a file.
pub type FileHandle = Handle<FileKind>;
/// [`Handle`] to a directory listing.
pub type DirectoryHandle = Handle<DirectoryKind>;

/// Identifies a [`Handle`] in logs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

impl From<u64> for HandleId {
    fn from(val: u64) -> Self {
        HandleId(val)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// The kind of object a [`Handle`] references.
pub trait HandleKind: Send + 'static {
    /// Platform resource backing the handle.
    type Inner: fmt::Debug + Send + 'static;

    fn into_resource(inner: Self::Inner) -> Resource;
}

/// Type level marker for a handle to a file.
#[derive(Debug)]
pub struct FileKind {
    mode: OpenMode,
}

/// Type level marker for a handle to a directory listing.
#[derive(Debug)]
pub struct DirectoryKind;

impl HandleKind for FileKind {
    type Inner = PlatformHandleType;

    fn into_resource(inner: Self::Inner) -> Resource {
        Resource::File(inner)
    }
}

impl HandleKind for DirectoryKind {
    type Inner = PlatformDirStreamType;

    fn into_resource(inner: Self::Inner) -> Resource {
        Resource::Directory(inner)
    }
}

/// A platform resource that some [`Handle`] owned.
#[derive(Debug)]
pub enum Resource {
    File(PlatformHandleType),
    Directory(PlatformDirStreamType),
}

impl Resource {
    fn close(self) -> Result<(), crate::Error> {
        match self {
            Resource::File(handle) => FilesystemPlatform::close(handle),
            Resource::Directory(stream) => FilesystemPlatform::closedir(stream),
        }
    }
}

/// Opened handle to an object on the filesystem.
///
/// A [`Handle`] is owned by exactly one caller. Call [`Handle::close`] to release it and observe
/// errors; if it's dropped instead it gets closed in the background.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Handle<Kind: HandleKind> {
    /// Actual platform resource, a file descriptor or directory stream.
    ///
    /// Only `None` while an operation is running, or once the handle has been closed.
    pub(crate) inner: Option<Kind::Inner>,
    /// Permit from the [`Filesystem`] abstraction which rate limits resources.
    ///
    /// [`Filesystem`]: crate::filesystem::Filesystem
    #[derivative(Debug = "ignore")]
    pub(crate) permit: Option<OwnedSemaphorePermit>,
    /// Worker that runs I/O operations.
    #[derivative(Debug = "ignore")]
    pub(crate) worker: FilesystemWorker,
    /// Sending side of a queue to close dropped [`Handle`]s.
    #[derivative(Debug = "ignore")]
    pub(crate) drops_tx: crossbeam::channel::Sender<DroppedHandle>,
    pub(crate) id: HandleId,
    /// Path this handle was opened with.
    pub(crate) path: String,
    /// Reason this [`Handle`] was opened.
    pub(crate) diagnostics: Option<Cow<'static, str>>,

    /// What kind of object this handle references.
    pub(crate) kind: Kind,
}

impl<K: HandleKind> Handle<K> {
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Path this handle was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Attach some diagnostic information to a [`Handle`] for easier debugging.
    pub fn diagnostics<T: Into<Cow<'static, str>>>(&mut self, reason: T) {
        self.diagnostics = Some(reason.into());
    }

    /// Close the filesystem handle, releasing its resources.
    pub async fn close(mut self) -> Result<(), crate::Error> {
        let permit = self.permit.take();
        let inner = self.inner.take().ok_or(crate::Error::Closed)?;

        tracing::debug!(id = %self.id, path = %self.path, "closing handle");
        let resource = K::into_resource(inner);
        let result = self.worker.run(move || resource.close()).await;
        drop(permit);

        result?
    }

    /// Run `work` against the platform resource on the worker pool.
    ///
    /// The resource is moved to the worker and back. If the returned future is dropped early the
    /// resource is released on the worker and this handle reports [`crate::Error::Closed`] from
    /// then on.
    async fn with_inner<T, W>(&mut self, work: W) -> Result<T, crate::Error>
    where
        T: Send + 'static,
        W: FnOnce(&mut K::Inner) -> Result<T, crate::Error> + Send + 'static,
    {
        let inner = self.inner.take().ok_or(crate::Error::Closed)?;
        let mut in_flight = InFlight::<K>(Some(inner));
        let (mut in_flight, result) = self
            .worker
            .run(move || {
                let result = match in_flight.0.as_mut() {
                    Some(inner) => work(inner),
                    None => Err(crate::Error::Closed),
                };
                (in_flight, result)
            })
            .await?;
        self.inner = in_flight.0.take();
        result
    }
}

/// A platform resource on its way to or from the worker, released if nobody takes it back.
struct InFlight<K: HandleKind>(Option<K::Inner>);

impl<K: HandleKind> Drop for InFlight<K> {
    fn drop(&mut self) {
        if let Some(inner) = self.0.take() {
            if let Err(err) = K::into_resource(inner).close() {
                tracing::warn!(%err, "failed to close abandoned handle");
            }
        }
    }
}

impl Handle<DirectoryKind> {
    /// Returns the next entry of the listing, `None` once every entry has been returned.
    ///
    /// Entries come back in whatever order the platform lists them.
    pub async fn next_entry(&mut self) -> Result<Option<DirectoryEntry>, crate::Error> {
        self.with_inner(FilesystemPlatform::readdir).await
    }

    /// Returns all of the entries that haven't been returned yet.
    ///
    /// Entries with a name we can't represent are logged and skipped, use
    /// [`Handle::next_entry`] to see them as errors.
    pub async fn entries(&mut self) -> Result<Vec<DirectoryEntry>, crate::Error> {
        let entries = self
            .with_inner(|stream| collect_entries(|| FilesystemPlatform::readdir(stream)))
            .await?;
        tracing::debug!(id = %self.id, count = entries.len(), "listed directory");
        Ok(entries)
    }
}

/// Drain `next` until the listing is complete.
///
/// A bad name only fails its own entry, the listing has already moved past it.
fn collect_entries<F>(mut next: F) -> Result<Vec<DirectoryEntry>, crate::Error>
where
    F: FnMut() -> Result<Option<DirectoryEntry>, crate::Error>,
{
    let mut entries = Vec::new();
    loop {
        match next() {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => return Ok(entries),
            Err(crate::Error::InvalidName(err)) => {
                tracing::warn!(%err, "skipping directory entry");
            }
            Err(err) => return Err(err),
        }
    }
}

impl Handle<FileKind> {
    /// Mode this file was opened with.
    pub fn mode(&self) -> OpenMode {
        self.kind.mode
    }

    /// Read from the current position until the end of the file.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, crate::Error> {
        self.with_inner(|handle| {
            let mut data = Vec::new();
            let mut block = vec![0u8; READ_BLOCK_SIZE];
            loop {
                let read = FilesystemPlatform::read(handle, &mut block[..])?;
                if read == 0 {
                    return Ok(data);
                }
                data.extend_from_slice(&block[..read]);
            }
        })
        .await
    }

    /// Write all of `data`, at the end of the file when opened with [`OpenMode::Append`].
    pub async fn write_all(&mut self, data: Vec<u8>) -> Result<(), crate::Error> {
        self.with_inner(move |handle| {
            let mut remaining = &data[..];
            while !remaining.is_empty() {
                let written = FilesystemPlatform::write(handle, remaining)?;
                if written == 0 {
                    return Err(crate::Error::InvalidData("write made no progress".into()));
                }
                remaining = &remaining[written..];
            }
            Ok(())
        })
        .await
    }

    /// Flush any buffered state of this file out to disk.
    pub async fn fsync(&mut self) -> Result<(), crate::Error> {
        self.with_inner(|handle| FilesystemPlatform::fsync(handle)).await
    }
}

impl<K: HandleKind> Drop for Handle<K> {
    fn drop(&mut self) {
        let permit = self.permit.take();
        let Some(inner) = self.inner.take() else {
            // Already closed, or the resource was lost with a cancelled operation and released
            // on the worker.
            return;
        };

        let dropped_handle = DroppedHandle {
            id: self.id,
            inner: K::into_resource(inner),
            permit,
            diagnostics: self.diagnostics.take(),
        };
        if let Err(crossbeam::channel::SendError(dropped_handle)) =
            self.drops_tx.send(dropped_handle)
        {
            // The filesystem is gone, close the handle inline.
            dropped_handle.close();
        }
    }
}

#[derive(Debug)]
pub struct FileDetails {
    mode: OpenMode,
}

#[derive(Debug)]
pub struct DirectoryDetails;

#[derive(Debug)]
pub struct UnknownDetails;

/// Builder struct for a [`Handle`].
pub struct HandleBuilder<Details = UnknownDetails> {
    /// Worker that runs I/O operations.
    pub(crate) worker: FilesystemWorker,
    /// Sending side of a queue to close dropped [`Handle`]s.
    pub(crate) drops_tx: crossbeam::channel::Sender<DroppedHandle>,
    /// Global sempahore limiting all open filesystem handles.
    pub(crate) permits: Arc<Semaphore>,
    /// ID for the handle we're opening.
    pub(crate) id: HandleId,
    /// Reason this [`Handle`] was opened.
    pub(crate) diagnostics: Option<Cow<'static, str>>,

    /// Path we're opening.
    pub(crate) path: String,
    /// Details for opening a specific kind of handle.
    pub(crate) details: Details,
}

impl HandleBuilder<UnknownDetails> {
    pub(crate) fn new(
        worker: FilesystemWorker,
        drops_tx: crossbeam::channel::Sender<DroppedHandle>,
        permits: Arc<Semaphore>,
        id: HandleId,
        path: String,
    ) -> HandleBuilder<UnknownDetails> {
        HandleBuilder {
            worker,
            drops_tx,
            permits,
            id,
            diagnostics: None,
            path,
            details: UnknownDetails,
        }
    }
}

impl<D> HandleBuilder<D> {
    /// Tag this [`Handle`] with the reason we're opening it.
    pub fn diagnostics<T: Into<Cow<'static, str>>>(mut self, reason: T) -> Self {
        self.diagnostics = Some(reason.into());
        self
    }

    /// Open a file with this [`HandleBuilder`].
    pub fn as_file(self, mode: OpenMode) -> HandleBuilder<FileDetails> {
        self.with_details(FileDetails { mode })
    }

    /// List a directory with this [`HandleBuilder`].
    pub fn as_directory(self) -> HandleBuilder<DirectoryDetails> {
        self.with_details(DirectoryDetails)
    }

    fn with_details<N>(self, details: N) -> HandleBuilder<N> {
        HandleBuilder {
            worker: self.worker,
            drops_tx: self.drops_tx,
            permits: self.permits,
            id: self.id,
            diagnostics: self.diagnostics,
            path: self.path,
            details,
        }
    }

    /// Acquire a permit, then run `open` on the worker and wrap the result in a [`Handle`].
    async fn open_with<K, O>(self, kind: K, open: O) -> Result<Handle<K>, crate::Error>
    where
        K: HandleKind,
        O: FnOnce(PlatformPathType) -> Result<K::Inner, crate::Error> + Send + 'static,
    {
        let permit = Semaphore::acquire_owned(self.permits)
            .await
            .map_err(|_| crate::Error::ShuttingDown)?;

        let path = PlatformPathType::try_new(self.path.clone())?;
        let result = self.worker.run(move || open(path)).await?;
        let inner = match result {
            Ok(inner) => inner,
            Err(err) => {
                tracing::debug!(id = %self.id, path = %self.path, %err, "failed to open");
                return Err(err);
            }
        };
        tracing::debug!(
            id = %self.id,
            path = %self.path,
            diagnostics = ?self.diagnostics,
            "opened handle"
        );

        Ok(Handle {
            inner: Some(inner),
            permit: Some(permit),
            worker: self.worker,
            drops_tx: self.drops_tx,
            id: self.id,
            path: self.path,
            diagnostics: self.diagnostics,
            kind,
        })
    }
}

impl IntoFuture for HandleBuilder<FileDetails> {
    type Output = Result<Handle<FileKind>, crate::Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'static>>;

    fn into_future(self) -> Self::IntoFuture {
        let mode = self.details.mode;
        let kind = FileKind { mode };
        let options = OpenOptions::from(mode);
        Box::pin(self.open_with(kind, move |path| FilesystemPlatform::open(path, options)))
    }
}

impl IntoFuture for HandleBuilder<DirectoryDetails> {
    type Output = Result<Handle<DirectoryKind>, crate::Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'static>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.open_with(DirectoryKind, FilesystemPlatform::opendir))
    }
}

/// A [`Handle`] that has been [`Drop`]-ed but not yet closed.
pub(crate) struct DroppedHandle {
    pub(crate) id: HandleId,
    /// The platform specific resource.
    pub(crate) inner: Resource,
    /// Permit we keep open for the life of the handle for resource management.
    pub(crate) permit: Option<OwnedSemaphorePermit>,
    /// Diagnostics from the original handle.
    pub(crate) diagnostics: Option<Cow<'static, str>>,
}

impl DroppedHandle {
    pub(crate) fn close(self) {
        let DroppedHandle {
            id,
            inner,
            permit,
            diagnostics,
        } = self;

        let result = inner.close();
        drop(permit);

        match result {
            Ok(()) => tracing::debug!(%id, ?diagnostics, "async closed handle"),
            Err(err) => tracing::warn!(%id, ?diagnostics, %err, "failed to async close handle"),
        }
    }
}
