use tokio::sync::broadcast::error::RecvError;

/// In-process fan-out bus. Emitters are cheap to clone; every listener sees
/// every event published after it subscribed.
pub struct EventBus<T> {
    tx: tokio::sync::broadcast::Sender<T>,
}

pub struct EventListener<T> {
    rx: tokio::sync::broadcast::Receiver<T>,
}

#[derive(Clone)]
pub struct EventEmitter<T> {
    tx: tokio::sync::broadcast::Sender<T>,
}

impl<T: Clone + std::fmt::Debug> EventBus<T> {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn subscribe(&self) -> EventListener<T> {
        EventListener {
            rx: self.tx.subscribe(),
        }
    }

    pub fn emitter(&self) -> EventEmitter<T> {
        EventEmitter { tx: self.tx.clone() }
    }
}

impl<T: Clone> EventListener<T> {
    pub fn new(rx: tokio::sync::broadcast::Receiver<T>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Closed) => {
                    tracing::error!(
                        "Event channel of {} closed, no more events",
                        std::any::type_name::<T>()
                    );
                    return None;
                }
                Err(RecvError::Lagged(count)) => {
                    tracing::warn!(
                        "Listener of {} lagged, {} events dropped",
                        std::any::type_name::<T>(),
                        count
                    );
                    continue;
                }
            }
        }
    }
}

impl<T: Clone + std::fmt::Debug> EventEmitter<T> {
    pub fn send(&self, event: T) {
        //a send without any active listener is fine, the frontend may simply
        //not be attached
        if self.tx.send(event).is_err() {
            tracing::debug!("No listener for event of {}", std::any::type_name::<T>());
        }
    }
}
