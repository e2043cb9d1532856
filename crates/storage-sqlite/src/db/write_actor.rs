//! Single-writer actor.
//!
//! All mutations are funneled through one dedicated thread, each job wrapped
//! in an immediate transaction. This serializes writes (SQLite allows one
//! writer) and makes every repository mutation, including the sync batch
//! merge, all-or-nothing on crash.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::error;
use tokio::sync::{mpsc, oneshot};

use mealtrack_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Transaction error carrier: either the job's own failure or a BEGIN/COMMIT
/// failure raised by diesel itself.
enum WriteTxError {
    App(Error),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for WriteTxError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Db(err)
    }
}

/// Cloneable handle submitting jobs to the writer thread.
#[derive(Clone)]
pub struct WriteHandle {
    sender: mpsc::UnboundedSender<WriteJob>,
}

impl WriteHandle {
    /// Run `job` inside an immediate transaction on the writer thread and
    /// await its result. A job error rolls the transaction back.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel::<Result<T>>();
        let wrapped: WriteJob = Box::new(move |conn| {
            let outcome = conn
                .immediate_transaction(|tx_conn| job(tx_conn).map_err(WriteTxError::App))
                .map_err(|err| match err {
                    WriteTxError::App(inner) => inner,
                    WriteTxError::Db(inner) => Error::from(StorageError::from(inner)),
                });
            let _ = result_tx.send(outcome);
        });

        self.sender.send(wrapped).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Write actor is not running".to_string(),
            ))
        })?;
        result_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Write actor dropped the job".to_string(),
            ))
        })?
    }
}

/// Spawn the writer thread over the given pool and return its handle.
pub fn spawn_writer(pool: Pool<ConnectionManager<SqliteConnection>>) -> WriteHandle {
    let (sender, mut receiver) = mpsc::unbounded_channel::<WriteJob>();

    std::thread::spawn(move || {
        while let Some(job) = receiver.blocking_recv() {
            match pool.get() {
                Ok(mut conn) => job(&mut conn),
                Err(err) => {
                    // Dropping the job drops its result channel; the caller
                    // observes the failure as a dropped-job error.
                    error!("Write actor could not acquire a connection: {}", err);
                }
            }
        }
    });

    WriteHandle { sender }
}
