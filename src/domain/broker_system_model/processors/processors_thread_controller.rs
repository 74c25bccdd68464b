use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::domain::broker_system_model::order::order_holders::OrderHolders;
use crate::domain::broker_system_model::processors::order_processor::{OrderProcessor, ProcessorWorker};

/// Starts one named thread per processor and stops them together.
pub struct ProcessorsThreadController {
    holders: Arc<OrderHolders>,
    processors: Vec<(Arc<dyn OrderProcessor>, Duration)>,
    shutdown: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ProcessorsThreadController {
    pub fn new(holders: Arc<OrderHolders>, processors: Vec<(Arc<dyn OrderProcessor>, Duration)>) -> Self {
        ProcessorsThreadController { holders, processors, shutdown: Arc::new(AtomicBool::new(false)), threads: Mutex::new(Vec::new()) }
    }

    pub fn is_running(&self) -> bool {
        !self.threads.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    pub fn start(&self) -> io::Result<()> {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        if !threads.is_empty() {
            log::warn!("Processors are already running");
            return Ok(());
        }

        self.shutdown.store(false, Ordering::Release);
        for (processor, interval) in &self.processors {
            let worker = ProcessorWorker::new(processor.clone(), self.holders.clone(), *interval, self.shutdown.clone());
            let handle = thread::Builder::new().name(worker.name().to_string()).spawn(move || worker.run())?;
            threads.push(handle);
        }

        log::info!("Started {} processor threads", threads.len());
        Ok(())
    }

    /// Signals every worker, wakes the idle ones and waits for all of them.
    pub fn stop(&self) {
        let threads: Vec<JoinHandle<()>> = self.threads.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect();
        if threads.is_empty() {
            return;
        }

        self.shutdown.store(true, Ordering::Release);
        self.holders.wake_all();

        for handle in threads {
            let name = handle.thread().name().unwrap_or("processor").to_string();
            if handle.join().is_err() {
                log::error!("{} terminated with a panic", name);
            }
        }
        log::info!("Processor threads stopped");
    }
}

impl Drop for ProcessorsThreadController {
    fn drop(&mut self) {
        self.stop();
    }
}
