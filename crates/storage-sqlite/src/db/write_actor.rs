use super::DbPool;
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::{debug, info};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};
use vuka_core::errors::{DatabaseError, Error, Result};

// A job runs against the writer's connection and reports a core Result.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type BoxedReply = Result<Box<dyn Any + Send + 'static>>;

/// Transaction error for the writer loop. Keeps domain errors raised inside a
/// job intact so callers still see `Conflict`, `InsufficientFunds` and friends.
#[derive(Debug)]
enum TxError {
    Core(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Diesel(err)
    }
}

impl From<TxError> for Error {
    fn from(err: TxError) -> Self {
        match err {
            TxError::Core(e) => e,
            TxError::Diesel(e) => StorageError::QueryFailed(e).into(),
        }
    }
}

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    #[allow(clippy::type_complexity)]
    tx: mpsc::Sender<(Job<Box<dyn Any + Send + 'static>>, oneshot::Sender<BoxedReply>)>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// The job runs inside an `IMMEDIATE` transaction; returning an error
    /// rolls back everything it wrote.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| writer_gone("writer actor is not running"))?;

        let boxed = ret_rx
            .await
            .map_err(|_| writer_gone("writer actor dropped the reply"))??;

        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::Unexpected("writer actor returned an unexpected type".to_string()))
    }
}

fn writer_gone(message: &str) -> Error {
    Error::Database(DatabaseError::ConnectionFailed(message.to_string()))
}

/// Spawns a background Tokio task that acts as the single writer to the database.
///
/// The actor owns one pooled connection for its whole lifetime and processes
/// jobs serially. It stops when every [`WriteHandle`] has been dropped.
pub fn spawn_writer(pool: DbPool) -> Result<WriteHandle> {
    let mut conn = pool.get().map_err(StorageError::PoolError)?;

    let (tx, mut rx) = mpsc::channel::<(
        Job<Box<dyn Any + Send + 'static>>,
        oneshot::Sender<BoxedReply>,
    )>(1024);

    tokio::spawn(async move {
        while let Some((job, reply_tx)) = rx.recv().await {
            let result: BoxedReply = conn
                .immediate_transaction::<_, TxError, _>(|c| job(c).map_err(TxError::Core))
                .map_err(Error::from);

            if let Err(e) = &result {
                debug!("Write job rolled back: {}", e);
            }
            // The requester may have gone away (cancelled request).
            let _ = reply_tx.send(result);
        }
        info!("Writer actor stopped");
    });

    Ok(WriteHandle { tx })
}
