use std::future::Future;

use anyhow::Result;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use crate::host::HostMessage;

/// Consumer of browser messages. The tracker is the only real one, tests plug in others.
pub trait EventProcessor {
    fn process_next(&mut self, message: HostMessage) -> impl Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl Future<Output = Result<()>>;
}

/// Single consumer of the message queue. Handling one message at a time is what lets the
/// tracker mutate its session without locks.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<HostMessage>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<HostMessage>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    /// Runs until every sender is gone, then finalizes the processor and hands it back.
    pub async fn run(mut self) -> Result<P> {
        while let Some(message) = self.receiver.recv().await {
            debug!("Processing message {:?}", message);
            match self.processor.process_next(message.clone()).await {
                Ok(_) => {
                    info!("Processed message {:?}", message.event)
                }
                Err(e) => {
                    error!("Error processing message {:?}: {e:?}", message)
                }
            }
        }

        self.receiver.close();
        self.processor.finalize().await?;
        Ok(self.processor)
    }
}
