//! A minimal agent runner: repeatedly drives an [`Agent`]'s `do_work` on a
//! dedicated thread, idling between ticks when there is nothing to do.
use crate::client_conductor::ClientConductor;
use crate::concurrent::AtomicBuffer;
use crate::error::Result;
use crate::idle_strategy::IdleStrategy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unit of background work driven by an [`AgentRunner`]
pub trait Agent: Send + Sync {
    /// Perform one unit of work, returning how much was done (0 if idle).
    /// A fatal `Err` stops the runner.
    fn do_work(&self) -> Result<i32>;

    /// Called once when the runner stops, whether from a fatal error or an
    /// explicit `close()`.
    fn on_close(&self) {}
}

impl<A> Agent for ClientConductor<A>
where
    A: AtomicBuffer + Send + 'static,
{
    fn do_work(&self) -> Result<i32> {
        ClientConductor::do_work(self)
    }

    fn on_close(&self) {
        if let Err(e) = ClientConductor::close(self) {
            log::warn!("error closing conductor: {}", e);
        }
    }
}

/// Drives an [`Agent`] in a loop, applying an [`IdleStrategy`] between ticks.
/// Intended to be run on its own thread via [`AgentRunner::run`].
pub struct AgentRunner {
    agent: Arc<dyn Agent>,
    idle_strategy: Arc<dyn IdleStrategy>,
    running: Arc<AtomicBool>,
}

impl AgentRunner {
    /// Build a runner over `agent`, idling per `idle_strategy` between ticks
    pub fn new(agent: Arc<dyn Agent>, idle_strategy: Arc<dyn IdleStrategy>) -> Self {
        AgentRunner {
            agent,
            idle_strategy,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Run the agent loop on the calling thread until `close` is called or
    /// `do_work` returns a fatal error
    pub fn run(&self) {
        while self.running.load(Ordering::Acquire) {
            match self.agent.do_work() {
                Ok(work_count) => self.idle_strategy.idle(work_count),
                Err(e) => {
                    log::error!("agent runner terminating: {}", e);
                    break;
                }
            }
        }
        self.agent.on_close();
    }

    /// Signal the run loop to stop after its current tick
    pub fn close(&self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    struct CountingAgent {
        calls: AtomicI32,
        stop_after: i32,
    }

    impl Agent for CountingAgent {
        fn do_work(&self) -> Result<i32> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.stop_after {
                Err(crate::error::AeronError::ClientClosed)
            } else {
                Ok(0)
            }
        }
    }

    #[test]
    fn stops_on_fatal_error() {
        let agent = Arc::new(CountingAgent {
            calls: AtomicI32::new(0),
            stop_after: 3,
        });
        let runner = AgentRunner::new(agent.clone(), Arc::new(crate::idle_strategy::BackoffIdleStrategy::new(1, 1, 1, 1)));
        runner.run();
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn close_stops_the_loop() {
        struct Forever;
        impl Agent for Forever {
            fn do_work(&self) -> Result<i32> {
                Ok(0)
            }
        }
        let agent = Arc::new(Forever);
        let runner = Arc::new(AgentRunner::new(agent, Arc::new(crate::idle_strategy::BackoffIdleStrategy::new(1, 1, 1, 1))));
        let runner_clone = runner.clone();
        let handle = std::thread::spawn(move || runner_clone.run());
        runner.close();
        handle.join().unwrap();
    }
}
