//! Background spectrum runs.
//!
//! A [`SpectrumWorker`] owns the [`MaterialResolver`] for the duration of a
//! run, so no other thread can touch its cache. Progress arrives over an
//! unbounded channel; the worker never blocks on sending. [`SpectrumWorker::join`]
//! hands the resolver back together with the result.

use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use lamina_materials::MaterialResolver;

use crate::spectrum::{CancelToken, Spectrum, SpectrumCalculator, SpectrumError};
use crate::stack::LayerStack;
use crate::types::CalculationRequest;

/// Message from a running worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Percentage of wavelengths completed.
    Progress(u32),
    /// The run ended (successfully or not); `join` will not block.
    Finished,
}

type WorkerOutput = (MaterialResolver, Result<Spectrum, SpectrumError>);

/// Handle to a spectrum run on its own thread.
pub struct SpectrumWorker {
    handle: JoinHandle<WorkerOutput>,
    events: Receiver<WorkerEvent>,
    cancel: CancelToken,
}

impl SpectrumWorker {
    /// Start a run with the default calculator.
    pub fn spawn(
        stack: LayerStack,
        request: CalculationRequest,
        resolver: MaterialResolver,
    ) -> std::io::Result<Self> {
        Self::spawn_with(SpectrumCalculator::default(), stack, request, resolver)
    }

    pub fn spawn_with(
        calculator: SpectrumCalculator,
        stack: LayerStack,
        request: CalculationRequest,
        mut resolver: MaterialResolver,
    ) -> std::io::Result<Self> {
        let (sender, events) = mpsc::channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let handle = thread::Builder::new()
            .name("lamina-spectrum".into())
            .spawn(move || {
                // A dropped receiver only means nobody is listening.
                let mut on_progress = |percent: u32| {
                    let _ = sender.send(WorkerEvent::Progress(percent));
                };
                let result =
                    calculator.run_cancellable(&stack, &request, &mut resolver, &mut on_progress, &token);
                let _ = sender.send(WorkerEvent::Finished);
                (resolver, result)
            })?;

        Ok(Self {
            handle,
            events,
            cancel,
        })
    }

    /// Event stream; ends when the worker thread exits.
    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Ask the run to stop before its next wavelength.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run and take back the resolver.
    ///
    /// Fails only if the worker thread panicked.
    pub fn join(self) -> thread::Result<WorkerOutput> {
        self.handle.join()
    }
}
