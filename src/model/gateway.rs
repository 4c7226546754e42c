//! Serialized, time-bounded access to a loaded model.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use ndarray::ArrayD;

use crate::error::{Error, Result};
use crate::pipeline::Config;

use super::{Model, ModelCache, ModelTensor, ModelType, OnnxModel};

/// One queued inference and the channel its result goes back on.
struct Job {
    inputs: Vec<ModelTensor>,
    reply: SyncSender<Result<ArrayD<f32>>>,
    /// The caller stops waiting at this instant.
    deadline: Instant,
}

/// The inference boundary around one pretrained model.
///
/// The model lives on a dedicated worker thread and runs one job at a time,
/// in submission order, so runtimes that are not thread-safe are never
/// entered concurrently. The gateway itself is `Send + Sync` and is shared
/// between request threads behind an `Arc`.
///
/// Every call is checked against the model's signature before it is queued
/// and its output is checked before it is returned.
pub struct ModelGateway {
    model_type: ModelType,
    timeout: Duration,
    jobs: Sender<Job>,
}

impl ModelGateway {
    /// Start a worker thread serving `model`.
    ///
    /// `timeout` bounds how long [`infer`](Self::infer) waits for a result,
    /// measured from submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is zero or the thread cannot be spawned.
    pub fn spawn<M>(model_type: ModelType, model: M, timeout: Duration) -> Result<Self>
    where
        M: Model + 'static,
    {
        if timeout.is_zero() {
            return Err(Error::InvalidParameter {
                name: "inference_timeout".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let (jobs, queue) = mpsc::channel();

        thread::Builder::new()
            .name(format!("deepstego-{model_type}"))
            .spawn(move || serve(model_type, model, timeout, &queue))?;

        tracing::debug!("{model_type} inference worker started");

        Ok(Self {
            model_type,
            timeout,
            jobs,
        })
    }

    /// Load `model_type` from the cache and start serving it.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn load(cache: &ModelCache, model_type: ModelType, config: &Config) -> Result<Self> {
        let model = OnnxModel::load(cache, model_type, config.intra_threads)?;
        Self::spawn(model_type, model, config.inference_timeout)
    }

    #[must_use]
    pub const fn model_type(&self) -> ModelType {
        self.model_type
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the model on `inputs`.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the inputs do not match the model signature
    /// - [`Error::InferenceTimeout`] if no result arrives in time
    /// - [`Error::MalformedOutput`] if the output has the wrong shape
    /// - any error the model itself reports
    pub fn infer(&self, inputs: Vec<ModelTensor>) -> Result<ArrayD<f32>> {
        check_inputs(self.model_type, &inputs)?;

        let (reply, response) = mpsc::sync_channel(1);
        let started = Instant::now();

        self.jobs
            .send(Job {
                inputs,
                reply,
                deadline: started + self.timeout,
            })
            .map_err(|_| self.closed())?;

        let output = match response.recv_timeout(self.timeout) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("{} inference timed out after {:?}", self.model_type, self.timeout);
                return Err(Error::InferenceTimeout {
                    model: self.model_type.name(),
                    timeout: self.timeout,
                });
            }
            Err(RecvTimeoutError::Disconnected) => return Err(self.closed()),
        };

        tracing::debug!(
            "{} inference took {:?}, output {:?}",
            self.model_type,
            started.elapsed(),
            output.shape()
        );

        check_output(self.model_type, &output)?;
        Ok(output)
    }

    fn closed(&self) -> Error {
        Error::GatewayClosed {
            model: self.model_type.name(),
        }
    }
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("model_type", &self.model_type)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Worker loop. Ends when the gateway is dropped.
///
/// Jobs still queued when their caller's deadline passes are dropped unrun.
fn serve<M: Model>(
    model_type: ModelType,
    mut model: M,
    timeout: Duration,
    queue: &Receiver<Job>,
) {
    for job in queue {
        if Instant::now() >= job.deadline {
            tracing::debug!("Skipping expired {model_type} job");
            let _ = job.reply.send(Err(Error::InferenceTimeout {
                model: model_type.name(),
                timeout,
            }));
            continue;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| model.run(&job.inputs)))
            .unwrap_or_else(|payload| {
                let reason = panic_message(payload.as_ref());
                tracing::warn!("{model_type} model panicked: {reason}");
                Err(Error::InferenceFailed {
                    model: model_type.name(),
                    reason,
                })
            });

        // The caller is gone if it timed out; the late result is dropped.
        let _ = job.reply.send(result);
    }

    tracing::debug!("{model_type} inference worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "model panicked".to_string()
    }
}

fn check_inputs(model_type: ModelType, inputs: &[ModelTensor]) -> Result<()> {
    let expected = model_type.inputs();

    let matches = inputs.len() == expected.len()
        && inputs
            .iter()
            .zip(expected)
            .all(|(input, kind)| input.kind() == *kind && input.shape() == kind.shape());

    if matches {
        return Ok(());
    }

    Err(Error::ShapeMismatch {
        expected: format!(
            "{model_type} inputs {:?}",
            expected.iter().map(|k| k.shape()).collect::<Vec<_>>()
        ),
        actual: format!(
            "{:?}",
            inputs
                .iter()
                .map(|t| format!("{:?} {:?}", t.kind(), t.shape()))
                .collect::<Vec<_>>()
        ),
    })
}

fn check_output(model_type: ModelType, output: &ArrayD<f32>) -> Result<()> {
    let kind = model_type.output();
    if kind.accepts_output(output.shape()) {
        return Ok(());
    }

    Err(Error::MalformedOutput {
        model: model_type.name(),
        expected: format!("{kind:?} tensor"),
        actual: format!("{:?}", output.shape()),
    })
}
