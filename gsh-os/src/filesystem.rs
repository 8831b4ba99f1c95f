use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use gsh_ore::id_gen::Gen;

use crate::config::{FilesystemConfig, PoolKind};
use crate::handle::{DirectoryHandle, DroppedHandle, FileHandle, HandleBuilder, HandleId};
use crate::platform::{FilesystemPlatform, Platform, PlatformPath, PlatformPathType};
use crate::{FileAttributes, OpenMode};

/// A safe Filesystem abstraction.
///
/// The goal of this type is to abstract over platform specific implementations for
/// filesystem operations, provide automatic cleanup and management of resources, as well
/// as helpers to attach debug information to filesystem [`Handle`]s.
///
/// [`Handle`]: crate::handle::Handle
#[derive(Clone)]
pub struct Filesystem {
    /// Pool to spawn blocking work on.
    worker: FilesystemWorker,
    /// The number of file system handles that are allowed to be open at once.
    permits: Arc<Semaphore>,
    /// Queue of handles that have been dropped but not yet closed.
    drops_tx: crossbeam::channel::Sender<DroppedHandle>,
    /// IDs for newly opened handles.
    ids: Arc<Gen<HandleId>>,
}

impl Filesystem {
    pub fn new(config: &FilesystemConfig) -> Result<Self, crate::Error> {
        config.validate()?;
        let max_handles = config.resolved_max_handles();
        tracing::info!(
            worker_threads = config.worker_threads,
            max_handles,
            pool = ?config.pool,
            "starting filesystem"
        );

        let (drops_tx, drops_rx) = crossbeam::channel::unbounded();
        Ok(Filesystem {
            worker: FilesystemWorker::new(config, drops_rx)?,
            permits: Arc::new(Semaphore::new(max_handles)),
            drops_tx,
            ids: Arc::new(Gen::from_start(1)),
        })
    }

    /// Number of handles that can be opened before callers start waiting.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Start opening the object at `path`, see [`HandleBuilder`].
    pub fn open<P: Into<String>>(&self, path: P) -> HandleBuilder {
        HandleBuilder::new(
            self.worker.clone(),
            self.drops_tx.clone(),
            Arc::clone(&self.permits),
            self.ids.next(),
            path.into(),
        )
    }

    /// Begin listing the directory at `path`.
    ///
    /// Fails if nothing exists at `path`, it's not a directory, or we're not allowed to read
    /// it. The returned [`DirectoryHandle`] is released when closed or dropped.
    pub async fn open_directory<P: Into<String>>(
        &self,
        path: P,
    ) -> Result<DirectoryHandle, crate::Error> {
        self.open(path).as_directory().await
    }

    /// Open the file at `path` with the provided [`OpenMode`].
    pub async fn open_file<P: Into<String>>(
        &self,
        path: P,
        mode: OpenMode,
    ) -> Result<FileHandle, crate::Error> {
        self.open(path).as_file(mode).await
    }

    /// Query the attributes of the entry at `path`.
    pub async fn attributes<P: Into<String>>(&self, path: P) -> Result<FileAttributes, crate::Error> {
        let path = PlatformPathType::try_new(path.into())?;
        let result = self
            .worker
            .run(move || FilesystemPlatform::attributes(path))
            .await??;
        Ok(result)
    }
}

impl fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filesystem")
            .field("worker", &self.worker)
            .field("available_permits", &self.available_permits())
            .finish()
    }
}

/// Worker for handling filesystem operations.
///
/// Most filesystem operations are not truly asynchronous, so instead we spawn a
/// thread-pool and run the blocking operations there.
#[derive(Clone)]
pub struct FilesystemWorker {
    /// Thread pool for spawning I/O.
    pool: Arc<WorkerPool>,
}

impl FilesystemWorker {
    fn new(
        config: &FilesystemConfig,
        drops_rx: crossbeam::channel::Receiver<DroppedHandle>,
    ) -> Result<Self, crate::Error> {
        let pool = match config.pool {
            PoolKind::Rayon => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(config.worker_threads)
                    .thread_name(|idx| format!("gsh-fs-{idx}"))
                    .build()
                    .map_err(|err| crate::Error::InvalidConfig(err.to_string()))?;
                std::thread::Builder::new()
                    .name("gsh-fs-drops".to_string())
                    .spawn(move || close_dropped(drops_rx))
                    .map_err(crate::Error::from)?;
                WorkerPool::Rayon { pool }
            }
            PoolKind::Tokio => {
                let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
                    crate::Error::InvalidConfig("the tokio pool requires a tokio runtime".into())
                })?;
                let _drop_task = runtime.spawn_blocking(move || close_dropped(drops_rx));
                WorkerPool::Tokio {
                    runtime,
                    running: Arc::new(Semaphore::new(config.worker_threads)),
                    _drop_task,
                }
            }
        };

        Ok(FilesystemWorker {
            pool: Arc::new(pool),
        })
    }

    /// Run `work` on the pool, resolving with its result.
    ///
    /// Errors with [`crate::Error::ShuttingDown`] if the pool went away before running `work`.
    pub fn run<T, W>(&self, work: W) -> impl Future<Output = Result<T, crate::Error>> + 'static
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
    {
        self.run_typed(work)
            .map(|result| result.map_err(|_| crate::Error::ShuttingDown))
    }

    /// Same as [`FilesystemWorker::run`] but returns a nameable type, so callers can store the
    /// pending work in a struct without boxing.
    pub fn run_typed<T, W>(&self, work: W) -> tokio::sync::oneshot::Receiver<T>
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        match &*self.pool {
            WorkerPool::Tokio {
                runtime, running, ..
            } => {
                let running = Arc::clone(running);
                let blocking = runtime.clone();
                runtime.spawn(async move {
                    let Ok(_permit) = running.acquire_owned().await else {
                        return;
                    };
                    if let Ok(result) = blocking.spawn_blocking(work).await {
                        // We don't care about the receiver going away.
                        let _ = tx.send(result);
                    }
                });
            }
            WorkerPool::Rayon { pool } => {
                pool.spawn(|| {
                    let result = work();
                    // We don't care about the receiver going away.
                    let _ = tx.send(result);
                });
            }
        }
        rx
    }
}

impl fmt::Debug for FilesystemWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &*self.pool {
            WorkerPool::Tokio { .. } => PoolKind::Tokio,
            WorkerPool::Rayon { .. } => PoolKind::Rayon,
        };
        f.debug_struct("FilesystemWorker").field("pool", &kind).finish()
    }
}

#[derive(Debug)]
enum WorkerPool {
    Tokio {
        runtime: tokio::runtime::Handle,
        /// Bounds how many operations run on the blocking pool at once.
        running: Arc<Semaphore>,
        /// Task that closes [`DroppedHandle`]s.
        _drop_task: tokio::task::JoinHandle<()>,
    },
    Rayon {
        pool: rayon::ThreadPool,
    },
}

/// Closes [`DroppedHandle`]s until every sender has gone away.
fn close_dropped(drops_rx: crossbeam::channel::Receiver<DroppedHandle>) {
    let mut handles = Vec::new();

    loop {
        // Block until there is a dropped handle.
        match drops_rx.recv() {
            Ok(dropped_handle) => handles.push(dropped_handle),
            Err(notice) => {
                tracing::debug!(?notice, "drops sender went away, shutting down");
                return;
            }
        }

        // Collect all of the currently queued handles, if any.
        handles.extend(drops_rx.try_iter());

        for dropped_handle in handles.drain(..) {
            dropped_handle.close();
        }
    }
}
